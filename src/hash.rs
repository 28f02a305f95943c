use sha2::{Digest, Sha256};
use sha3::{
    Shake128, Shake256,
    digest::{ExtendableOutput, Update, XofReader},
};
use zeroize::Zeroize;

use crate::error::{Error, XmssResult};
use crate::hash_address::set_key_and_mask;
use crate::params::HashFunction;

const HASH_TAG_F: u64 = 0;
const HASH_TAG_H: u64 = 1;
const HASH_TAG_HASH: u64 = 2;
const HASH_TAG_PRF: u64 = 3;

/// Writes `val` into `out` as a big-endian integer padded to the field
/// width, the `toByte(x, y)` primitive of the hash network.
pub(crate) fn to_byte(out: &mut [u8], val: u64) {
    for (i, b) in out.iter_mut().rev().enumerate() {
        *b = if i < 8 { (val >> (8 * i)) as u8 } else { 0 };
    }
}

/// Serializes a hash address into 32 big-endian bytes.
pub(crate) fn addr_to_bytes(bytes: &mut [u8; 32], addr: &[u32; 8]) {
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(addr) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
}

/// Emits `out.len()` bytes of SHAKE-256 over `input`.
pub(crate) fn shake256(out: &mut [u8], input: &[u8]) {
    let mut hasher = Shake256::default();
    hasher.update(input);
    let mut reader = hasher.finalize_xof();
    reader.read(out);
}

/// Hashes `toByte(tag, n) || key || input` down to `n` bytes with the
/// selected family.
fn core_hash(
    func: HashFunction,
    out: &mut [u8],
    tag: u64,
    key: &[u8],
    input: &[u8],
    n: usize,
) -> XmssResult<()> {
    let mut buf = vec![0u8; n + key.len() + input.len()];
    to_byte(&mut buf[..n], tag);
    buf[n..n + key.len()].copy_from_slice(key);
    buf[n + key.len()..].copy_from_slice(input);

    match func {
        HashFunction::Sha2_256 if n <= 32 => {
            let digest = Sha256::digest(&buf);
            out[..n].copy_from_slice(&digest[..n]);
        }
        HashFunction::Shake128 => {
            let mut hasher = Shake128::default();
            hasher.update(&buf);
            let mut reader = hasher.finalize_xof();
            reader.read(&mut out[..n]);
        }
        HashFunction::Shake256 => {
            let mut hasher = Shake256::default();
            hasher.update(&buf);
            let mut reader = hasher.finalize_xof();
            reader.read(&mut out[..n]);
        }
        HashFunction::Sha2_256 => {
            buf.zeroize();
            return Err(Error::Hash {
                n: n as u32,
                func: func as u32,
            });
        }
    }
    buf.zeroize();
    Ok(())
}

/// Computes PRF(key, in) for a key of `key.len()` bytes and a 32-byte input.
pub(crate) fn prf(
    func: HashFunction,
    out: &mut [u8],
    input: &[u8; 32],
    key: &[u8],
) -> XmssResult<()> {
    core_hash(func, out, HASH_TAG_PRF, key, input, key.len())
}

/// Computes the randomized message hash over `input`, keyed by
/// `R || root || toByte(idx, n)`.
///
/// # Errors
///
/// Fails unless the key is exactly `3n` bytes long.
pub fn h_msg(
    func: HashFunction,
    out: &mut [u8],
    input: &[u8],
    key: &[u8],
    n: usize,
) -> XmssResult<()> {
    if key.len() != 3 * n {
        return Err(Error::InvalidHashKeyLength {
            n,
            expected: 3 * n,
            got: key.len(),
        });
    }
    core_hash(func, out, HASH_TAG_HASH, key, input, n)
}

/// Chaining function for WOTS+ (single n-byte input).
/// Key and bitmask are derived from `pub_seed` and the address.
pub(crate) fn hash_f(
    func: HashFunction,
    out: &mut [u8],
    input: &[u8],
    pub_seed: &[u8],
    addr: &mut [u32; 8],
    n: usize,
) -> XmssResult<()> {
    let mut buf = vec![0u8; n];
    let mut key = vec![0u8; n];
    let mut bitmask = vec![0u8; n];
    let mut addr_as_bytes = [0u8; 32];

    set_key_and_mask(addr, 0);
    addr_to_bytes(&mut addr_as_bytes, addr);
    prf(func, &mut key, &addr_as_bytes, pub_seed)?;

    set_key_and_mask(addr, 1);
    addr_to_bytes(&mut addr_as_bytes, addr);
    prf(func, &mut bitmask, &addr_as_bytes, pub_seed)?;

    for i in 0..n {
        buf[i] = input[i] ^ bitmask[i];
    }

    core_hash(func, out, HASH_TAG_F, &key, &buf, n)
}

/// Tree hash function for internal nodes (two n-byte inputs).
pub(crate) fn hash_h(
    func: HashFunction,
    out: &mut [u8],
    input: &[u8],
    pub_seed: &[u8],
    addr: &mut [u32; 8],
    n: usize,
) -> XmssResult<()> {
    let mut buf = vec![0u8; 2 * n];
    let mut key = vec![0u8; n];
    let mut bitmask = vec![0u8; 2 * n];
    let mut addr_as_bytes = [0u8; 32];

    set_key_and_mask(addr, 0);
    addr_to_bytes(&mut addr_as_bytes, addr);
    prf(func, &mut key, &addr_as_bytes, pub_seed)?;

    set_key_and_mask(addr, 1);
    addr_to_bytes(&mut addr_as_bytes, addr);
    prf(func, &mut bitmask[..n], &addr_as_bytes, pub_seed)?;

    set_key_and_mask(addr, 2);
    addr_to_bytes(&mut addr_as_bytes, addr);
    prf(func, &mut bitmask[n..2 * n], &addr_as_bytes, pub_seed)?;

    for i in 0..2 * n {
        buf[i] = input[i] ^ bitmask[i];
    }

    core_hash(func, out, HASH_TAG_H, &key, &buf, n)
}
