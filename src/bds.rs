use crate::error::{Error, XmssResult};
use crate::hash::hash_h;
use crate::hash_address::*;
use crate::params::{HashFunction, XmssParams};
use crate::xmss_commons::gen_leaf_wots;

/// One treehash instance growing the next subtree root at its level.
///
/// When `completed` is set, `node` holds the subtree root that will be
/// slotted into the authentication path once the traversal crosses it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TreeHashInst {
    pub(crate) h: u32,
    pub(crate) next_idx: u32,
    pub(crate) stack_usage: u32,
    pub(crate) completed: bool,
    pub(crate) node: Vec<u8>,
}

/// BDS traversal state: the shared stack, the current authentication path,
/// saved left nodes, per-level treehash instances and the retained
/// right nodes of the top `k` levels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BdsState {
    pub(crate) stack: Vec<u8>,
    pub(crate) stack_offset: u32,
    pub(crate) stack_levels: Vec<u8>,
    pub(crate) auth: Vec<u8>,
    pub(crate) keep: Vec<u8>,
    pub(crate) treehash: Vec<TreeHashInst>,
    pub(crate) retain: Vec<u8>,
    pub(crate) next_leaf: u32,
}

impl BdsState {
    /// Allocates an empty state for a tree of the given height.
    pub(crate) fn new(height: u32, n: u32, k: u32) -> Self {
        let h = height as usize;
        let n = n as usize;
        let k = k as usize;
        Self {
            stack: vec![0u8; (h + 1) * n],
            stack_offset: 0,
            stack_levels: vec![0u8; h + 1],
            auth: vec![0u8; h * n],
            keep: vec![0u8; (h >> 1) * n],
            treehash: (0..height.saturating_sub(k as u32))
                .map(|i| TreeHashInst {
                    h: i,
                    next_idx: 0,
                    stack_usage: 0,
                    completed: true,
                    node: vec![0u8; n],
                })
                .collect(),
            retain: vec![0u8; ((1usize << k) - k - 1) * n],
            next_leaf: 0,
        }
    }
}

/// Base offset of the retain rows for `level >= h - k`; the row index within
/// a level is derived from the node index by the caller.
fn retain_base(h: u32, level: u32) -> usize {
    (1usize << (h - 1 - level)) + level as usize - h as usize
}

/// Builds the full tree for leaf 0, populating the authentication path,
/// the treehash instance nodes and the retained top-level nodes along the
/// way. Writes the root into `node`.
pub(crate) fn treehash_setup(
    func: HashFunction,
    params: &XmssParams,
    node: &mut [u8],
    state: &mut BdsState,
    sk_seed: &[u8],
    pub_seed: &[u8],
    addr: &[u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;
    let h = params.h;
    let k = params.k;

    let mut ots_addr = [0u32; 8];
    let mut ltree_addr = [0u32; 8];
    let mut node_addr = [0u32; 8];
    copy_subtree_addr(&mut ots_addr, addr);
    set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);
    copy_subtree_addr(&mut ltree_addr, addr);
    set_type(&mut ltree_addr, XMSS_ADDR_TYPE_LTREE);
    copy_subtree_addr(&mut node_addr, addr);
    set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

    let mut stack = vec![0u8; (h as usize + 1) * n];
    let mut stack_levels = vec![0u32; h as usize + 1];
    let mut offset: usize = 0;

    for inst in state.treehash.iter_mut() {
        inst.completed = true;
        inst.stack_usage = 0;
    }

    let last_node = 1u32 << h;
    for idx in 0..last_node {
        set_ltree_addr(&mut ltree_addr, idx);
        set_ots_addr(&mut ots_addr, idx);
        gen_leaf_wots(
            func,
            &mut stack[offset * n..(offset + 1) * n],
            sk_seed,
            params,
            pub_seed,
            &mut ltree_addr,
            &mut ots_addr,
        )?;
        stack_levels[offset] = 0;
        offset += 1;

        while offset >= 2 && stack_levels[offset - 1] == stack_levels[offset - 2] {
            let node_h = stack_levels[offset - 1];
            let top = &stack[(offset - 1) * n..offset * n];

            // The completed right node at this level is routed into the
            // authentication path (node index 1), a treehash instance
            // (node index 3 below the retain zone) or the retain area.
            if idx >> node_h == 1 {
                let dst = node_h as usize * n;
                state.auth[dst..dst + n].copy_from_slice(top);
            } else if node_h < h - k && idx >> node_h == 3 {
                state.treehash[node_h as usize].node.copy_from_slice(top);
            } else if node_h >= h - k {
                let row = (((idx >> node_h) as usize) - 3) >> 1;
                let dst = (retain_base(h, node_h) + row) * n;
                state.retain[dst..dst + n].copy_from_slice(top);
            }

            set_tree_height(&mut node_addr, node_h);
            set_tree_index(&mut node_addr, idx >> (node_h + 1));
            let tmp = stack[(offset - 2) * n..offset * n].to_vec();
            hash_h(
                func,
                &mut stack[(offset - 2) * n..(offset - 1) * n],
                &tmp,
                pub_seed,
                &mut node_addr,
                n,
            )?;
            stack_levels[offset - 2] += 1;
            offset -= 1;
        }
    }

    node[..n].copy_from_slice(&stack[..n]);
    Ok(())
}

/// Smallest node level currently parked on the shared stack by the given
/// instance, or `h` when its share of the stack is empty.
fn treehash_min_height_on_stack(
    state: &BdsState,
    params: &XmssParams,
    inst: &TreeHashInst,
) -> u32 {
    let mut r = params.h;
    for i in 0..inst.stack_usage {
        let level = state.stack_levels[(state.stack_offset - i - 1) as usize];
        r = r.min(u32::from(level));
    }
    r
}

/// Performs one update step on the given treehash instance: generates its
/// next leaf and collapses the shared stack as far as possible.
fn treehash_update(
    func: HashFunction,
    params: &XmssParams,
    inst_idx: usize,
    state: &mut BdsState,
    sk_seed: &[u8],
    pub_seed: &[u8],
    addr: &[u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;

    let mut ots_addr = [0u32; 8];
    let mut ltree_addr = [0u32; 8];
    let mut node_addr = [0u32; 8];
    copy_subtree_addr(&mut ots_addr, addr);
    set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);
    copy_subtree_addr(&mut ltree_addr, addr);
    set_type(&mut ltree_addr, XMSS_ADDR_TYPE_LTREE);
    copy_subtree_addr(&mut node_addr, addr);
    set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

    let next_idx = state.treehash[inst_idx].next_idx;
    set_ltree_addr(&mut ltree_addr, next_idx);
    set_ots_addr(&mut ots_addr, next_idx);

    let mut node_buffer = vec![0u8; 2 * n];
    let mut node_height: u32 = 0;
    gen_leaf_wots(
        func,
        &mut node_buffer[..n],
        sk_seed,
        params,
        pub_seed,
        &mut ltree_addr,
        &mut ots_addr,
    )?;

    loop {
        if state.treehash[inst_idx].stack_usage == 0 {
            break;
        }
        if state.stack_offset == 0 {
            return Err(Error::Internal("treehash stack underflow"));
        }
        if u32::from(state.stack_levels[state.stack_offset as usize - 1]) != node_height {
            break;
        }
        let top = (state.stack_offset as usize - 1) * n;
        node_buffer.copy_within(..n, n);
        node_buffer[..n].copy_from_slice(&state.stack[top..top + n]);

        set_tree_height(&mut node_addr, node_height);
        set_tree_index(&mut node_addr, next_idx >> (node_height + 1));
        let tmp = node_buffer.clone();
        hash_h(func, &mut node_buffer[..n], &tmp, pub_seed, &mut node_addr, n)?;
        node_height += 1;
        state.treehash[inst_idx].stack_usage -= 1;
        state.stack_offset -= 1;
    }

    if node_height == state.treehash[inst_idx].h {
        // The root of this subtree is known.
        state.treehash[inst_idx].node.copy_from_slice(&node_buffer[..n]);
        state.treehash[inst_idx].completed = true;
    } else {
        let off = state.stack_offset as usize;
        if off >= state.stack_levels.len() {
            return Err(Error::Internal("treehash stack overflow"));
        }
        state.stack[off * n..(off + 1) * n].copy_from_slice(&node_buffer[..n]);
        #[allow(clippy::cast_possible_truncation)]
        {
            state.stack_levels[off] = node_height as u8;
        }
        state.stack_offset += 1;
        state.treehash[inst_idx].stack_usage += 1;
        state.treehash[inst_idx].next_idx += 1;
    }
    Ok(())
}

/// Advances the state after the authentication path for `leaf_idx` has been
/// emitted, so that `auth` describes leaf `leaf_idx + 1`. Restarts the
/// treehash instances whose subtrees fall due.
pub(crate) fn bds_round(
    func: HashFunction,
    params: &XmssParams,
    state: &mut BdsState,
    leaf_idx: u32,
    sk_seed: &[u8],
    pub_seed: &[u8],
    addr: &[u32; 8],
) -> XmssResult<()> {
    let n = params.n as usize;
    let h = params.h;
    let k = params.k;

    let mut tau = h;
    for i in 0..h {
        if (leaf_idx >> i) & 1 == 0 {
            tau = i;
            break;
        }
    }
    if tau == h {
        return Err(Error::Internal("no zero bit in leaf index"));
    }

    let mut ots_addr = [0u32; 8];
    let mut ltree_addr = [0u32; 8];
    let mut node_addr = [0u32; 8];
    copy_subtree_addr(&mut ots_addr, addr);
    set_type(&mut ots_addr, XMSS_ADDR_TYPE_OTS);
    copy_subtree_addr(&mut ltree_addr, addr);
    set_type(&mut ltree_addr, XMSS_ADDR_TYPE_LTREE);
    copy_subtree_addr(&mut node_addr, addr);
    set_type(&mut node_addr, XMSS_ADDR_TYPE_HASHTREE);

    // Buffer the node pair below tau before keep is refreshed.
    let mut buf = vec![0u8; 2 * n];
    if tau > 0 {
        let a = (tau as usize - 1) * n;
        buf[..n].copy_from_slice(&state.auth[a..a + n]);
        let kp = ((tau as usize - 1) >> 1) * n;
        buf[n..2 * n].copy_from_slice(&state.keep[kp..kp + n]);
    }
    if (leaf_idx >> (tau + 1)) & 1 == 0 && tau < h - 1 {
        let kp = (tau as usize >> 1) * n;
        let ap = tau as usize * n;
        let (keep, auth) = (&mut state.keep, &state.auth);
        keep[kp..kp + n].copy_from_slice(&auth[ap..ap + n]);
    }

    if tau == 0 {
        set_ltree_addr(&mut ltree_addr, leaf_idx);
        set_ots_addr(&mut ots_addr, leaf_idx);
        gen_leaf_wots(
            func,
            &mut state.auth[..n],
            sk_seed,
            params,
            pub_seed,
            &mut ltree_addr,
            &mut ots_addr,
        )?;
    } else {
        set_tree_height(&mut node_addr, tau - 1);
        set_tree_index(&mut node_addr, leaf_idx >> tau);
        {
            let dst = tau as usize * n;
            let mut parent = vec![0u8; n];
            hash_h(func, &mut parent, &buf, pub_seed, &mut node_addr, n)?;
            state.auth[dst..dst + n].copy_from_slice(&parent);
        }

        for i in 0..tau {
            let dst = i as usize * n;
            if i < h - k {
                let (auth, treehash) = (&mut state.auth, &state.treehash);
                auth[dst..dst + n].copy_from_slice(&treehash[i as usize].node);
            } else {
                let row = (((leaf_idx >> i) as usize) - 1) >> 1;
                let src = (retain_base(h, i) + row) * n;
                let (auth, retain) = (&mut state.auth, &state.retain);
                auth[dst..dst + n].copy_from_slice(&retain[src..src + n]);
            }
        }

        for i in 0..tau.min(h - k) {
            let start_idx = leaf_idx + 1 + 3 * (1 << i);
            if start_idx < 1 << h {
                let inst = &mut state.treehash[i as usize];
                inst.h = i;
                inst.next_idx = start_idx;
                inst.completed = false;
                inst.stack_usage = 0;
            }
        }
    }
    Ok(())
}

/// Performs up to `updates` treehash update steps, each on the incomplete
/// instance with the lowest pending work: an instance scores its own level
/// when its share of the stack is empty and the minimum stacked level
/// otherwise, with the lowest instance winning ties. Returns the number of
/// unused updates.
pub(crate) fn bds_treehash_update(
    func: HashFunction,
    params: &XmssParams,
    state: &mut BdsState,
    updates: u32,
    sk_seed: &[u8],
    pub_seed: &[u8],
    addr: &[u32; 8],
) -> XmssResult<u32> {
    let h = params.h;
    let k = params.k;
    let mut used = 0;

    for _ in 0..updates {
        let mut l_min = h;
        let mut level = h - k;
        for i in 0..h - k {
            let inst = &state.treehash[i as usize];
            let low = if inst.completed {
                h
            } else if inst.stack_usage == 0 {
                i
            } else {
                treehash_min_height_on_stack(state, params, inst)
            };
            if low < l_min {
                level = i;
                l_min = low;
            }
        }
        if level == h - k {
            break;
        }
        treehash_update(func, params, level as usize, state, sk_seed, pub_seed, addr)?;
        used += 1;
    }
    Ok(h - k - used)
}
