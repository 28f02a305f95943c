use zeroize::Zeroize;

use crate::error::{Error, XmssResult};
use crate::hash::{hash_f, prf, to_byte};
use crate::hash_address::{set_chain_addr, set_hash_addr};
use crate::params::{HashFunction, WotsParams};

/// Expands an n-byte seed into a len*n byte private key.
/// Each chain seed is `PRF(seed, toByte(i, 32))`.
fn expand_seed(
    func: HashFunction,
    outseeds: &mut [u8],
    inseed: &[u8],
    params: &WotsParams,
) -> XmssResult<()> {
    let n = params.n as usize;
    let mut ctr = [0u8; 32];

    for i in 0..params.len as usize {
        to_byte(&mut ctr, i as u64);
        prf(func, &mut outseeds[i * n..(i + 1) * n], &ctr, inseed)?;
    }
    Ok(())
}

/// Computes the chaining function.
/// Interprets `input` as the start-th value of the chain.
fn gen_chain(
    func: HashFunction,
    out: &mut [u8],
    input: &[u8],
    start: u32,
    steps: u32,
    params: &WotsParams,
    pub_seed: &[u8],
    addr: &mut [u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;

    out[..n].copy_from_slice(&input[..n]);

    let mut i = start;
    while i < start + steps && i < params.w {
        set_hash_addr(addr, i);
        let mut tmp = vec![0u8; n];
        tmp.copy_from_slice(&out[..n]);
        hash_f(func, out, &tmp, pub_seed, addr, n)?;
        i += 1;
    }
    Ok(())
}

/// Interprets `input` as `out_len` integers in base `w`, MSB first.
///
/// Only `output[..out_len]` is written; the remaining output and the input
/// are left untouched.
pub fn calc_base_w(params: &WotsParams, output: &mut [u8], out_len: usize, input: &[u8]) {
    let mut in_idx = 0;
    let mut total: u8 = 0;
    let mut bits: u32 = 0;

    // w <= 256, so (w - 1) fits in u8.
    #[allow(clippy::cast_possible_truncation)]
    let mask = (params.w - 1) as u8;

    for out_val in output.iter_mut().take(out_len) {
        if bits == 0 {
            total = input[in_idx];
            in_idx += 1;
            bits = 8;
        }
        bits -= params.log_w;
        *out_val = (total >> bits) & mask;
    }
}

/// Computes the WOTS+ checksum over a message (in base w).
fn wots_checksum(params: &WotsParams, csum_base_w: &mut [u8], msg_base_w: &[u8]) {
    let mut csum: u32 = 0;

    for &val in msg_base_w.iter().take(params.len_1 as usize) {
        csum += params.w - 1 - u32::from(val);
    }

    csum <<= 8 - ((params.len_2 * params.log_w) % 8);
    let csum_bytes_len = (params.len_2 * params.log_w).div_ceil(8) as usize;
    let mut csum_bytes = vec![0u8; csum_bytes_len];
    to_byte(&mut csum_bytes, u64::from(csum));
    calc_base_w(params, csum_base_w, params.len_2 as usize, &csum_bytes);
}

/// Takes a message and derives the matching chain lengths.
fn chain_lengths(params: &WotsParams, lengths: &mut [u8], msg: &[u8]) {
    let len_1 = params.len_1 as usize;
    calc_base_w(params, lengths, len_1, msg);
    let (msg_part, csum_part) = lengths.split_at_mut(len_1);
    wots_checksum(params, csum_part, msg_part);
}

/// WOTS+ key generation. Expands the seed to a full private key and runs
/// every chain to its end to produce the public key.
pub(crate) fn wots_pkgen(
    func: HashFunction,
    pk: &mut [u8],
    seed: &[u8],
    params: &WotsParams,
    pub_seed: &[u8],
    addr: &mut [u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;

    expand_seed(func, pk, seed, params)?;

    for i in 0..params.len as usize {
        #[allow(clippy::cast_possible_truncation)]
        set_chain_addr(addr, i as u32);
        let mut tmp = vec![0u8; n];
        tmp.copy_from_slice(&pk[i * n..(i + 1) * n]);
        gen_chain(
            func,
            &mut pk[i * n..],
            &tmp,
            0,
            params.w - 1,
            params,
            pub_seed,
            addr,
        )?;
        tmp.zeroize();
    }
    Ok(())
}

/// Signs an n-byte message digest, writing `len * n` bytes into `sig`.
///
/// # Errors
///
/// Fails when `addr` does not hold exactly 8 words.
pub fn wots_sign(
    func: HashFunction,
    sig: &mut [u8],
    msg: &[u8],
    seed: &[u8],
    params: &WotsParams,
    pub_seed: &[u8],
    addr: &mut [u32],
) -> XmssResult<()> {
    let addr: &mut [u32; 8] = addr.try_into().map_err(|_| Error::InvalidAddrSize)?;
    let n = params.n as usize;
    let mut lengths = vec![0u8; params.len as usize];

    chain_lengths(params, &mut lengths, msg);

    expand_seed(func, sig, seed, params)?;

    for i in 0..params.len as usize {
        #[allow(clippy::cast_possible_truncation)]
        set_chain_addr(addr, i as u32);
        let mut tmp = vec![0u8; n];
        tmp.copy_from_slice(&sig[i * n..(i + 1) * n]);
        gen_chain(
            func,
            &mut sig[i * n..],
            &tmp,
            0,
            u32::from(lengths[i]),
            params,
            pub_seed,
            addr,
        )?;
        tmp.zeroize();
    }
    Ok(())
}

/// Recovers a WOTS+ public key from a signature and the signed digest.
pub(crate) fn wots_pk_from_sig(
    func: HashFunction,
    pk: &mut [u8],
    sig: &[u8],
    msg: &[u8],
    params: &WotsParams,
    pub_seed: &[u8],
    addr: &mut [u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;
    let mut lengths = vec![0u8; params.len as usize];

    chain_lengths(params, &mut lengths, msg);

    for i in 0..params.len as usize {
        #[allow(clippy::cast_possible_truncation)]
        set_chain_addr(addr, i as u32);
        gen_chain(
            func,
            &mut pk[i * n..],
            &sig[i * n..],
            u32::from(lengths[i]),
            params.w - 1 - u32::from(lengths[i]),
            params,
            pub_seed,
            addr,
        )?;
    }
    Ok(())
}
