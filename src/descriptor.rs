use crate::error::{Error, XmssResult};
use crate::params::HashFunction;

/// Length of the packed QRL descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 3;
/// Length of a key-generation seed in bytes.
pub const SEED_SIZE: usize = 48;
/// Length of an extended seed (`descriptor || seed`) in bytes.
pub const EXTENDED_SEED_SIZE: usize = DESCRIPTOR_SIZE + SEED_SIZE;
/// Length of an extended public key (`descriptor || root || pub_seed`)
/// in bytes.
pub const EXTENDED_PK_SIZE: usize = DESCRIPTOR_SIZE + 64;
/// Length of a QRL address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Descriptor signature-type nibble identifying XMSS.
pub const SIGNATURE_TYPE_XMSS: u8 = 0;
/// Descriptor address-format nibble for SHA-256 derived addresses.
pub const ADDR_FORMAT_SHA256_2X: u8 = 0;

/// The QRL 3-byte extended descriptor.
///
/// Selects the hash family, signature scheme, tree height and address
/// format of a key. Field values are stored raw; nibbles outside the
/// known enumerations round-trip unchanged through [`QrlDescriptor::to_bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QrlDescriptor {
    hash_function: u8,
    signature_type: u8,
    height: u8,
    addr_format_type: u8,
}

impl QrlDescriptor {
    /// Frames a descriptor for a new XMSS tree.
    pub fn new(hash_function: HashFunction, height: u8, addr_format_type: u8) -> Self {
        Self {
            hash_function: hash_function as u8,
            signature_type: SIGNATURE_TYPE_XMSS,
            height,
            addr_format_type,
        }
    }

    /// Decodes a descriptor from its packed form.
    ///
    /// Byte 2 is reserved: heights are always even, so the height is
    /// recovered from byte 1 alone.
    pub fn from_bytes(bytes: &[u8; DESCRIPTOR_SIZE]) -> Self {
        Self {
            hash_function: bytes[0] & 0x0f,
            signature_type: (bytes[0] >> 4) & 0x0f,
            height: (bytes[1] & 0x0f) << 1,
            addr_format_type: (bytes[1] >> 4) & 0x0f,
        }
    }

    /// Reads the descriptor prefix of an extended seed.
    pub fn from_extended_seed(extended_seed: &[u8; EXTENDED_SEED_SIZE]) -> Self {
        let mut desc = [0u8; DESCRIPTOR_SIZE];
        desc.copy_from_slice(&extended_seed[..DESCRIPTOR_SIZE]);
        Self::from_bytes(&desc)
    }

    /// Reads the descriptor prefix of an extended public key.
    pub fn from_extended_pk(extended_pk: &[u8]) -> XmssResult<Self> {
        if extended_pk.len() != EXTENDED_PK_SIZE {
            return Err(Error::InvalidKeyLength {
                expected: EXTENDED_PK_SIZE,
                got: extended_pk.len(),
            });
        }
        let mut desc = [0u8; DESCRIPTOR_SIZE];
        desc.copy_from_slice(&extended_pk[..DESCRIPTOR_SIZE]);
        Ok(Self::from_bytes(&desc))
    }

    /// Packs the descriptor into its 3-byte wire form.
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_SIZE] {
        [
            (self.signature_type << 4) | (self.hash_function & 0x0f),
            (self.addr_format_type << 4) | ((self.height >> 1) & 0x0f),
            self.height & 1,
        ]
    }

    /// The raw hash-function nibble.
    pub fn hash_function(&self) -> u8 {
        self.hash_function
    }

    /// The raw signature-type nibble.
    pub fn signature_type(&self) -> u8 {
        self.signature_type
    }

    /// The tree height.
    pub fn height(&self) -> u8 {
        self.height
    }

    /// The raw address-format nibble.
    pub fn addr_format_type(&self) -> u8 {
        self.addr_format_type
    }
}
