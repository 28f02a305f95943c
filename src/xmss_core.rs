use zeroize::Zeroize;

use crate::bds::{BdsState, bds_round, bds_treehash_update, treehash_setup};
use crate::descriptor::SEED_SIZE;
use crate::error::{Error, XmssResult};
use crate::hash::{h_msg, prf, shake256, to_byte};
use crate::hash_address::{XMSS_ADDR_TYPE_OTS, set_ots_addr, set_type};
use crate::params::{HashFunction, XmssParams};
use crate::wots::wots_sign;
use crate::xmss_commons::get_seed;

/// Derives a key pair from a 48-byte seed and runs the initial tree build.
///
/// The seed is expanded with SHAKE-256 into `SK_SEED || SK_PRF || PUB_SEED`.
/// Format sk: `[idx(4) || SK_SEED || SK_PRF || PUB_SEED || root]`.
/// Format pk: `[root || PUB_SEED]`.
pub(crate) fn xmss_fast_gen_keypair(
    func: HashFunction,
    params: &XmssParams,
    pk: &mut [u8],
    sk: &mut [u8],
    state: &mut BdsState,
    seed: &[u8; SEED_SIZE],
) -> XmssResult<()> {
    let n = params.n as usize;

    sk[..4].fill(0);

    let mut randombits = vec![0u8; 3 * n];
    shake256(&mut randombits, seed);
    sk[4..4 + 3 * n].copy_from_slice(&randombits);
    randombits.zeroize();

    pk[n..2 * n].copy_from_slice(&sk[4 + 2 * n..4 + 3 * n]);

    let mut sk_seed = sk[4..4 + n].to_vec();
    let pub_seed = sk[4 + 2 * n..4 + 3 * n].to_vec();
    let addr = [0u32; 8];
    let result = treehash_setup(
        func,
        params,
        &mut pk[..n],
        state,
        &sk_seed,
        &pub_seed,
        &addr,
    );
    sk_seed.zeroize();
    result?;

    sk[4 + 3 * n..4 + 4 * n].copy_from_slice(&pk[..n]);
    Ok(())
}

/// Signs a message, advancing the one-time key index and the BDS state.
/// Returns `idx(4) || R || WOTS+ signature || authentication path`.
pub(crate) fn xmss_fast_sign(
    func: HashFunction,
    params: &XmssParams,
    sk: &mut [u8],
    state: &mut BdsState,
    message: &[u8],
) -> XmssResult<Vec<u8>> {
    let n = params.n as usize;
    let h = params.h;
    let key_size = params.wots_params.key_size as usize;

    let idx = u32::from_be_bytes([sk[0], sk[1], sk[2], sk[3]]);
    let num_leaves = 1u64 << h;
    if u64::from(idx) >= num_leaves {
        return Err(Error::KeyExhausted);
    }

    let mut sk_seed = sk[4..4 + n].to_vec();
    let mut sk_prf = sk[4 + n..4 + 2 * n].to_vec();
    let pub_seed = sk[4 + 2 * n..4 + 3 * n].to_vec();
    let pub_root = sk[4 + 3 * n..4 + 4 * n].to_vec();

    let sig_len = 4 + n + key_size + h as usize * n;
    let mut sig = vec![0u8; sig_len];
    sig[..4].copy_from_slice(&sk[..4]);

    // Randomness for the message hash.
    let mut idx_bytes_32 = [0u8; 32];
    to_byte(&mut idx_bytes_32, u64::from(idx));
    prf(func, &mut sig[4..4 + n], &idx_bytes_32, &sk_prf)?;

    // Message digest keyed by R || root || toByte(idx, n).
    let mut hash_key = vec![0u8; 3 * n];
    hash_key[..n].copy_from_slice(&sig[4..4 + n]);
    hash_key[n..2 * n].copy_from_slice(&pub_root);
    to_byte(&mut hash_key[2 * n..3 * n], u64::from(idx));
    let mut msg_hash = vec![0u8; n];
    h_msg(func, &mut msg_hash, message, &hash_key, n)?;

    let mut ots_addr = [0u32; 8];
    set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);
    set_ots_addr(&mut ots_addr, idx);

    let mut ots_seed = vec![0u8; n];
    get_seed(func, &mut ots_seed, &sk_seed, &mut ots_addr)?;
    wots_sign(
        func,
        &mut sig[4 + n..4 + n + key_size],
        &msg_hash,
        &ots_seed,
        &params.wots_params,
        &pub_seed,
        ots_addr.as_mut_slice(),
    )?;
    ots_seed.zeroize();

    // The auth path was already computed during the previous round.
    sig[4 + n + key_size..].copy_from_slice(&state.auth[..h as usize * n]);

    sk[..4].copy_from_slice(&(idx + 1).to_be_bytes());

    if u64::from(idx) < num_leaves - 1 {
        let addr = [0u32; 8];
        bds_round(func, params, state, idx, &sk_seed, &pub_seed, &addr)?;
        bds_treehash_update(func, params, state, (h - params.k) >> 1, &sk_seed, &pub_seed, &addr)?;
    }
    state.next_leaf += 1;

    sk_seed.zeroize();
    sk_prf.zeroize();

    Ok(sig)
}

/// Fast-forwards the key to `new_idx` by replaying the BDS traversal.
/// This is the restore path after a tree has been rebuilt from its seed.
pub(crate) fn xmss_fast_update(
    func: HashFunction,
    params: &XmssParams,
    sk: &mut [u8],
    state: &mut BdsState,
    new_idx: u32,
) -> XmssResult<()> {
    let n = params.n as usize;
    let num_leaves = 1u64 << params.h;

    let idx = u32::from_be_bytes([sk[0], sk[1], sk[2], sk[3]]);

    if u64::from(new_idx) >= num_leaves {
        return Err(Error::IndexOutOfRange {
            index: new_idx,
            max: num_leaves,
        });
    }
    if new_idx < idx {
        return Err(Error::IndexRewind {
            index: new_idx,
            current: idx,
        });
    }

    let mut sk_seed = sk[4..4 + n].to_vec();
    let pub_seed = sk[4 + 2 * n..4 + 3 * n].to_vec();
    let addr = [0u32; 8];

    for j in idx..new_idx {
        let result = bds_round(func, params, state, j, &sk_seed, &pub_seed, &addr).and_then(|()| {
            bds_treehash_update(
                func,
                params,
                state,
                (params.h - params.k) >> 1,
                &sk_seed,
                &pub_seed,
                &addr,
            )
        });
        if let Err(e) = result {
            sk_seed.zeroize();
            return Err(e);
        }
    }
    sk_seed.zeroize();

    sk[..4].copy_from_slice(&new_idx.to_be_bytes());
    Ok(())
}
