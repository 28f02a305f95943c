use crate::error::{Error, XmssResult};

/// Hash output length used by every QRL tree, in bytes.
pub const WOTS_PARAM_N: u32 = 32;
/// Winternitz parameter used by every QRL tree.
pub const WOTS_PARAM_W: u32 = 16;
/// BDS traversal parameter used by every QRL tree.
pub const BDS_PARAM_K: u32 = 2;

/// Hash families selectable through the QRL descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashFunction {
    /// SHA-256.
    Sha2_256 = 0,
    /// SHAKE-128 extendable-output function.
    Shake128 = 1,
    /// SHAKE-256 extendable-output function.
    Shake256 = 2,
}

impl TryFrom<u8> for HashFunction {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sha2_256),
            1 => Ok(Self::Shake128),
            2 => Ok(Self::Shake256),
            other => Err(Error::UnknownHashFunction(other)),
        }
    }
}

/// WOTS+ parameter set derived from `(n, w)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WotsParams {
    pub(crate) n: u32,
    pub(crate) w: u32,
    pub(crate) log_w: u32,
    pub(crate) len_1: u32,
    pub(crate) len_2: u32,
    pub(crate) len: u32,
    pub(crate) key_size: u32,
}

impl WotsParams {
    /// Derives the WOTS+ parameter set for an `n`-byte hash and Winternitz
    /// parameter `w`.
    pub fn new(n: u32, w: u32) -> XmssResult<Self> {
        if n == 0 || w < 2 {
            return Err(Error::InvalidParams { n, w });
        }
        let log_w = w.ilog2();
        let len_1 = (8 * n) / log_w;
        if len_1 == 0 {
            return Err(Error::InvalidParams { n, w });
        }
        let len_2 = (len_1 * (w - 1)).ilog2() / log_w + 1;
        let len = len_1 + len_2;
        Ok(Self {
            n,
            w,
            log_w,
            len_1,
            len_2,
            len,
            key_size: len * n,
        })
    }

    /// Size of a WOTS+ key or signature in bytes (`len * n`).
    pub fn key_size(&self) -> u32 {
        self.key_size
    }
}

/// XMSS parameter set: WOTS+ parameters plus tree height and BDS parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct XmssParams {
    pub(crate) wots_params: WotsParams,
    pub(crate) n: u32,
    pub(crate) h: u32,
    pub(crate) k: u32,
}

impl XmssParams {
    /// Builds an XMSS parameter set.
    ///
    /// # Errors
    ///
    /// Fails unless `k < h <= 30` and `h - k` is even, which the BDS
    /// traversal and the descriptor height field require.
    pub fn new(n: u32, h: u32, w: u32, k: u32) -> XmssResult<Self> {
        if h > 30 || k >= h || (h - k) % 2 != 0 {
            return Err(Error::InvalidBdsParams { height: h, k });
        }
        Ok(Self {
            wots_params: WotsParams::new(n, w)?,
            n,
            h,
            k,
        })
    }

    /// The hash output length in bytes.
    pub fn n(&self) -> u32 {
        self.n
    }

    /// The tree height.
    pub fn height(&self) -> u32 {
        self.h
    }

    /// The BDS traversal parameter.
    pub fn bds_k(&self) -> u32 {
        self.k
    }

    /// The WOTS+ parameter set.
    pub fn wots_params(&self) -> &WotsParams {
        &self.wots_params
    }

    /// Size of a full signature in bytes:
    /// `index || R || WOTS+ signature || authentication path`.
    pub fn signature_size(&self) -> u32 {
        calculate_signature_base_size(self.wots_params.key_size) + self.h * 32
    }
}

/// Size in bytes of everything in a signature except the authentication
/// path: a 4-byte index, 32 bytes of message-hash randomness, and the WOTS+
/// signature itself.
pub fn calculate_signature_base_size(key_size: u32) -> u32 {
    key_size + 4 + 32
}
