use rand::CryptoRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::bds::BdsState;
use crate::descriptor::{
    ADDR_FORMAT_SHA256_2X, ADDRESS_SIZE, DESCRIPTOR_SIZE, EXTENDED_PK_SIZE, EXTENDED_SEED_SIZE,
    QrlDescriptor, SEED_SIZE, SIGNATURE_TYPE_XMSS,
};
use crate::error::{Error, XmssResult};
use crate::params::{
    BDS_PARAM_K, HashFunction, WOTS_PARAM_N, WOTS_PARAM_W, WotsParams, XmssParams,
    calculate_signature_base_size,
};
use crate::xmss_commons::xmss_verify_sig;
use crate::xmss_core;

/// Length of the packed secret key in bytes:
/// `idx(4) || SK_SEED(32) || SK_PRF(32) || PUB_SEED(32) || root(32)`.
pub const SECRET_KEY_SIZE: usize = 4 + 4 * 32;

// ---------------------------------------------------------------------------
// Xmss
// ---------------------------------------------------------------------------

/// A stateful XMSS tree: signing key, seed and BDS traversal state.
///
/// Signing is stateful; every signature consumes one one-time key and the
/// index must never be reused. Callers persisting a tree store its
/// [extended seed](Self::extended_seed) and restore with
/// [`Xmss::from_extended_seed`] followed by [`Xmss::set_index`].
#[derive(Clone)]
pub struct Xmss {
    params: XmssParams,
    hash_function: HashFunction,
    desc: QrlDescriptor,
    sk: [u8; SECRET_KEY_SIZE],
    seed: [u8; SEED_SIZE],
    pub(crate) bds: BdsState,
}

impl core::fmt::Debug for Xmss {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Xmss")
            .field("desc", &self.desc)
            .field("index", &self.index())
            .field("sk", &"[REDACTED]")
            .field("seed", &"[REDACTED]")
            .finish()
    }
}

impl Drop for Xmss {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for Xmss {
    fn zeroize(&mut self) {
        self.sk.zeroize();
        self.seed.zeroize();
    }
}

impl Xmss {
    /// Builds a tree from a descriptor and a 48-byte seed, running the full
    /// initial tree build.
    pub fn initialize_tree(desc: QrlDescriptor, seed: &[u8]) -> XmssResult<Self> {
        let seed: &[u8; SEED_SIZE] = seed.try_into().map_err(|_| Error::InvalidSeedLength {
            expected: SEED_SIZE,
            got: seed.len(),
        })?;
        let hash_function = HashFunction::try_from(desc.hash_function())?;
        let height = u32::from(desc.height());
        let params = XmssParams::new(WOTS_PARAM_N, height, WOTS_PARAM_W, BDS_PARAM_K)?;

        let mut bds = BdsState::new(height, WOTS_PARAM_N, BDS_PARAM_K);
        let mut sk = [0u8; SECRET_KEY_SIZE];
        let mut pk = [0u8; 64];
        xmss_core::xmss_fast_gen_keypair(hash_function, &params, &mut pk, &mut sk, &mut bds, seed)?;

        Ok(Self {
            params,
            hash_function,
            desc,
            sk,
            seed: *seed,
            bds,
        })
    }

    /// Builds a tree from a 48-byte seed with a freshly framed XMSS
    /// descriptor.
    pub fn from_seed(
        seed: &[u8],
        height: u8,
        hash_function: HashFunction,
        addr_format_type: u8,
    ) -> XmssResult<Self> {
        let desc = QrlDescriptor::new(hash_function, height, addr_format_type);
        Self::initialize_tree(desc, seed)
    }

    /// Builds a tree from a 51-byte extended seed, reading the descriptor
    /// from its first three bytes.
    pub fn from_extended_seed(extended_seed: &[u8]) -> XmssResult<Self> {
        let extended_seed: &[u8; EXTENDED_SEED_SIZE] =
            extended_seed.try_into().map_err(|_| Error::InvalidSeedLength {
                expected: EXTENDED_SEED_SIZE,
                got: extended_seed.len(),
            })?;
        let desc = QrlDescriptor::from_extended_seed(extended_seed);
        Self::initialize_tree(desc, &extended_seed[DESCRIPTOR_SIZE..])
    }

    /// Builds a tree at the given height from injected randomness, using the
    /// SHA-256 address format.
    pub fn from_height<R: CryptoRng>(
        height: u8,
        hash_function: HashFunction,
        rng: &mut R,
    ) -> XmssResult<Self> {
        let mut seed = [0u8; SEED_SIZE];
        rng.fill_bytes(&mut seed);
        let result = Self::from_seed(&seed, height, hash_function, ADDR_FORMAT_SHA256_2X);
        seed.zeroize();
        result
    }

    /// Signs a message, consuming one one-time key.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::KeyExhausted`] once all `2^h` one-time keys have
    /// been used.
    pub fn sign(&mut self, message: &[u8]) -> XmssResult<XmssSignature> {
        let bytes = xmss_core::xmss_fast_sign(
            self.hash_function,
            &self.params,
            &mut self.sk,
            &mut self.bds,
            message,
        )?;
        Ok(XmssSignature {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Fast-forwards the one-time key index, replaying the BDS traversal.
    /// The index can only move forward.
    pub fn set_index(&mut self, new_index: u32) -> XmssResult<()> {
        xmss_core::xmss_fast_update(
            self.hash_function,
            &self.params,
            &mut self.sk,
            &mut self.bds,
            new_index,
        )
    }

    /// The next one-time key index to be used.
    pub fn index(&self) -> u32 {
        u32::from_be_bytes([self.sk[0], self.sk[1], self.sk[2], self.sk[3]])
    }

    /// The tree height.
    pub fn height(&self) -> u8 {
        self.desc.height()
    }

    /// The hash family this tree operates with.
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// The QRL descriptor of this tree.
    pub fn descriptor(&self) -> &QrlDescriptor {
        &self.desc
    }

    /// The 48-byte seed this tree was derived from.
    pub fn seed(&self) -> &[u8; SEED_SIZE] {
        &self.seed
    }

    /// The 51-byte extended seed: `descriptor || seed`.
    pub fn extended_seed(&self) -> [u8; EXTENDED_SEED_SIZE] {
        let mut out = [0u8; EXTENDED_SEED_SIZE];
        out[..DESCRIPTOR_SIZE].copy_from_slice(&self.desc.to_bytes());
        out[DESCRIPTOR_SIZE..].copy_from_slice(&self.seed);
        out
    }

    /// The packed 132-byte secret key, including the current index.
    pub fn sk_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.sk
    }

    /// The 67-byte extended public key: `descriptor || root || pub_seed`.
    pub fn extended_pk(&self) -> ExtendedPublicKey {
        let mut bytes = [0u8; EXTENDED_PK_SIZE];
        bytes[..DESCRIPTOR_SIZE].copy_from_slice(&self.desc.to_bytes());
        // root
        bytes[DESCRIPTOR_SIZE..DESCRIPTOR_SIZE + 32].copy_from_slice(&self.sk[100..132]);
        // pub_seed
        bytes[DESCRIPTOR_SIZE + 32..].copy_from_slice(&self.sk[68..100]);
        ExtendedPublicKey { bytes }
    }

    /// The 20-byte QRL address of this tree.
    pub fn address(&self) -> XmssResult<[u8; ADDRESS_SIZE]> {
        self.extended_pk().address()
    }

    /// Size of a signature produced by this tree, in bytes.
    pub fn signature_size(&self) -> u32 {
        self.params.signature_size()
    }

    /// Number of one-time keys not yet consumed.
    pub fn remaining_signatures(&self) -> u64 {
        (1u64 << self.params.h) - u64::from(self.index())
    }
}

impl signature::SignerMut<XmssSignature> for Xmss {
    fn try_sign(&mut self, msg: &[u8]) -> Result<XmssSignature, signature::Error> {
        self.sign(msg).map_err(|_| signature::Error::new())
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies a signature against a 67-byte extended public key, using the
/// default QRL Winternitz parameter.
pub fn verify(message: &[u8], signature: &[u8], extended_pk: &[u8]) -> XmssResult<()> {
    verify_with_custom_w(message, signature, extended_pk, WOTS_PARAM_W)
}

/// Verifies a signature against an extended public key whose chains were
/// built with a caller-chosen Winternitz parameter. The descriptor does not
/// carry `w`, so non-default chains need it supplied out of band.
pub fn verify_with_custom_w(
    message: &[u8],
    signature: &[u8],
    extended_pk: &[u8],
    w: u32,
) -> XmssResult<()> {
    let desc = QrlDescriptor::from_extended_pk(extended_pk)?;
    if desc.signature_type() != SIGNATURE_TYPE_XMSS {
        return Err(Error::UnsupportedSignatureType(desc.signature_type()));
    }
    let hash_function = HashFunction::try_from(desc.hash_function())?;

    let wots_params = WotsParams::new(WOTS_PARAM_N, w)?;
    let base_size = calculate_signature_base_size(wots_params.key_size) as usize;
    let sig_len = signature.len();
    if sig_len <= base_size || (sig_len - 4) % 32 != 0 {
        return Err(Error::InvalidSignatureLength { got: sig_len });
    }
    #[allow(clippy::cast_possible_truncation)]
    let height = ((sig_len - base_size) / 32) as u32;
    if height != u32::from(desc.height()) {
        return Err(Error::VerificationFailed);
    }

    xmss_verify_sig(
        hash_function,
        &wots_params,
        message,
        signature,
        &extended_pk[DESCRIPTOR_SIZE..],
        height,
    )
}

/// Derives the 20-byte QRL address from a 67-byte extended public key:
/// the re-encoded descriptor followed by the last 17 bytes of a double
/// SHA-256 over the key (the `SHA256_2X` address format).
///
/// # Errors
///
/// Fails unless the descriptor's address format is `SHA256_2X`.
pub fn address_from_extended_pk(extended_pk: &[u8]) -> XmssResult<[u8; ADDRESS_SIZE]> {
    let desc = QrlDescriptor::from_extended_pk(extended_pk)?;
    if desc.addr_format_type() != ADDR_FORMAT_SHA256_2X {
        return Err(Error::AddressFormatNotSupported);
    }

    let mut address = [0u8; ADDRESS_SIZE];
    address[..DESCRIPTOR_SIZE].copy_from_slice(&desc.to_bytes());
    let hashed = Sha256::digest(Sha256::digest(extended_pk));
    address[DESCRIPTOR_SIZE..]
        .copy_from_slice(&hashed[hashed.len() - (ADDRESS_SIZE - DESCRIPTOR_SIZE)..]);
    Ok(address)
}

// ---------------------------------------------------------------------------
// ExtendedPublicKey
// ---------------------------------------------------------------------------

/// A 67-byte QRL extended public key: `descriptor || root || pub_seed`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExtendedPublicKey {
    bytes: [u8; EXTENDED_PK_SIZE],
}

impl AsRef<[u8]> for ExtendedPublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for ExtendedPublicKey {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; EXTENDED_PK_SIZE] =
            value.try_into().map_err(|_| Error::InvalidKeyLength {
                expected: EXTENDED_PK_SIZE,
                got: value.len(),
            })?;
        Ok(Self { bytes })
    }
}

impl TryFrom<Vec<u8>> for ExtendedPublicKey {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        ExtendedPublicKey::try_from(value.as_slice())
    }
}

impl ExtendedPublicKey {
    /// The descriptor carried in the first three bytes.
    pub fn descriptor(&self) -> QrlDescriptor {
        let mut desc = [0u8; DESCRIPTOR_SIZE];
        desc.copy_from_slice(&self.bytes[..DESCRIPTOR_SIZE]);
        QrlDescriptor::from_bytes(&desc)
    }

    /// The tree root.
    pub fn root(&self) -> &[u8] {
        &self.bytes[DESCRIPTOR_SIZE..DESCRIPTOR_SIZE + 32]
    }

    /// The public seed.
    pub fn pub_seed(&self) -> &[u8] {
        &self.bytes[DESCRIPTOR_SIZE + 32..]
    }

    /// Derives the 20-byte QRL address for this key.
    pub fn address(&self) -> XmssResult<[u8; ADDRESS_SIZE]> {
        address_from_extended_pk(&self.bytes)
    }

    /// Verifies a message / signature pair against this key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> XmssResult<()> {
        verify(message, signature, &self.bytes)
    }
}

impl signature::Verifier<XmssSignature> for ExtendedPublicKey {
    fn verify(&self, msg: &[u8], signature: &XmssSignature) -> Result<(), signature::Error> {
        verify(msg, signature.as_ref(), &self.bytes).map_err(|_| signature::Error::new())
    }
}

#[cfg(feature = "serde")]
impl serdect::serde::Serialize for ExtendedPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serdect::serde::Serializer,
    {
        serdect::slice::serialize_hex_lower_or_bin(&self.bytes, serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serdect::serde::Deserialize<'de> for ExtendedPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serdect::serde::Deserializer<'de>,
    {
        let bytes = serdect::slice::deserialize_hex_or_bin_vec(deserializer)?;
        Self::try_from(bytes).map_err(serdect::serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// XmssSignature
// ---------------------------------------------------------------------------

/// An XMSS signature: `idx(4) || R || WOTS+ signature || auth path`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct XmssSignature {
    bytes: Box<[u8]>,
}

impl AsRef<[u8]> for XmssSignature {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for XmssSignature {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(XmssSignature {
            bytes: value.into(),
        })
    }
}

impl TryFrom<Vec<u8>> for XmssSignature {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(XmssSignature {
            bytes: value.into_boxed_slice(),
        })
    }
}

impl From<XmssSignature> for Vec<u8> {
    fn from(sig: XmssSignature) -> Vec<u8> {
        sig.bytes.into_vec()
    }
}

impl From<XmssSignature> for Box<[u8]> {
    fn from(sig: XmssSignature) -> Box<[u8]> {
        sig.bytes
    }
}

impl signature::SignatureEncoding for XmssSignature {
    type Repr = Box<[u8]>;
}

#[cfg(feature = "serde")]
impl serdect::serde::Serialize for XmssSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serdect::serde::Serializer,
    {
        serdect::slice::serialize_hex_lower_or_bin(&self.bytes, serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serdect::serde::Deserialize<'de> for XmssSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serdect::serde::Deserializer<'de>,
    {
        let bytes = serdect::slice::deserialize_hex_or_bin_vec(deserializer)?;
        Self::try_from(bytes).map_err(serdect::serde::de::Error::custom)
    }
}
