/// Errors used throughout this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The WOTS+ parameters are malformed.
    #[error("Invalid WOTS+ parameters: n={n}, w={w}")]
    InvalidParams {
        /// The hash output length parameter.
        n: u32,
        /// The Winternitz parameter.
        w: u32,
    },
    /// The height / BDS parameter pairing is invalid.
    #[error("Invalid BDS parameters: height={height}, k={k}; k < height with height - k even is required")]
    InvalidBdsParams {
        /// The tree height.
        height: u32,
        /// The BDS traversal parameter.
        k: u32,
    },
    /// A caller-supplied hash address has the wrong number of words.
    #[error("addr should be an array of size 8")]
    InvalidAddrSize,
    /// The keyed message hash was given a key of the wrong length.
    #[error("h_msg requires a key of 3n = {expected} bytes for n = {n}, got {got}")]
    InvalidHashKeyLength {
        /// The hash output length parameter.
        n: usize,
        /// Expected key length in bytes (3n).
        expected: usize,
        /// Actual key length in bytes.
        got: usize,
    },
    /// All one-time signatures have been used.
    #[error("Key exhausted: all one-time signatures have been used")]
    KeyExhausted,
    /// The provided seed has an incorrect length.
    #[error("Invalid seed length: expected {expected}, got {got}")]
    InvalidSeedLength {
        /// Expected seed length in bytes.
        expected: usize,
        /// Actual seed length in bytes.
        got: usize,
    },
    /// The provided key has an incorrect length.
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength {
        /// Expected key length in bytes.
        expected: usize,
        /// Actual key length in bytes.
        got: usize,
    },
    /// The provided signature has an implausible length.
    #[error("Invalid signature length: {got} bytes")]
    InvalidSignatureLength {
        /// Actual signature length in bytes.
        got: usize,
    },
    /// The requested one-time key index lies outside the tree.
    #[error("Index {index} is out of range for a tree with {max} leaves")]
    IndexOutOfRange {
        /// The requested index.
        index: u32,
        /// Number of leaves in the tree.
        max: u64,
    },
    /// The requested one-time key index lies behind the current one.
    #[error("Index {index} would rewind the current index {current}")]
    IndexRewind {
        /// The requested index.
        index: u32,
        /// The current index.
        current: u32,
    },
    /// The descriptor selects an address format this crate cannot derive.
    #[error("Address format type not supported")]
    AddressFormatNotSupported,
    /// The descriptor selects a signature scheme other than XMSS.
    #[error("Unsupported signature type: {0}")]
    UnsupportedSignatureType(u8),
    /// The descriptor hash-function nibble is not a known family.
    #[error("Unknown hash function: {0}")]
    UnknownHashFunction(u8),
    /// The hash dispatch configuration is not supported.
    #[error("Hash function error: unsupported n={n} with func={func}")]
    Hash {
        /// The hash output length parameter.
        n: u32,
        /// The hash function identifier.
        func: u32,
    },
    /// Signature verification failed.
    #[error("Signature verification failed")]
    VerificationFailed,
    /// An unreachable-in-theory state was reached; indicates a bug.
    #[error("Internal invariant violated: {0}")]
    Internal(&'static str),
}

/// Result type used by this crate.
pub type XmssResult<T> = Result<T, Error>;
