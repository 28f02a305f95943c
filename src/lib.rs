//! XMSS (eXtended Merkle Signature Scheme) implementation in Rust, tailored
//! to the QRL (Quantum Resistant Ledger) descriptor and address format.
//!
//! Keys are derived from a 48-byte seed, signing uses the BDS traversal
//! algorithm to amortise authentication-path computation across signatures,
//! and the 3-byte QRL descriptor selects the hash family, tree height and
//! address format.

mod bds;
mod descriptor;
mod error;
mod hash;
mod hash_address;
mod params;
mod wots;
mod xmss;
mod xmss_commons;
mod xmss_core;

pub use descriptor::{
    ADDR_FORMAT_SHA256_2X, ADDRESS_SIZE, DESCRIPTOR_SIZE, EXTENDED_PK_SIZE, EXTENDED_SEED_SIZE,
    QrlDescriptor, SEED_SIZE, SIGNATURE_TYPE_XMSS,
};
pub use error::{Error, XmssResult};
pub use hash::h_msg;
pub use params::{
    BDS_PARAM_K, HashFunction, WOTS_PARAM_N, WOTS_PARAM_W, WotsParams, XmssParams,
    calculate_signature_base_size,
};
pub use wots::{calc_base_w, wots_sign};
pub use xmss::{
    ExtendedPublicKey, SECRET_KEY_SIZE, Xmss, XmssSignature, address_from_extended_pk, verify,
    verify_with_custom_w,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_seed() -> [u8; SEED_SIZE] {
        [0u8; SEED_SIZE]
    }

    fn pattern_seed() -> Vec<u8> {
        (0u8..48).collect()
    }

    #[test]
    fn test_signature_base_size_vectors() {
        assert_eq!(calculate_signature_base_size(65), 101);
        assert_eq!(calculate_signature_base_size(399), 435);
        assert_eq!(calculate_signature_base_size(1064), 1100);
    }

    #[test]
    fn test_signature_size_vectors() {
        assert_eq!(XmssParams::new(2, 4, 6, 2).unwrap().signature_size(), 186);
        assert_eq!(XmssParams::new(13, 7, 9, 3).unwrap().signature_size(), 741);
        assert_eq!(
            XmssParams::new(25, 13, 12, 9).unwrap().signature_size(),
            2202
        );
    }

    #[test]
    fn test_wots_params_derivation() {
        let params = WotsParams::new(32, 16).unwrap();
        assert_eq!(params.log_w, 4);
        assert_eq!(params.len_1, 64);
        assert_eq!(params.len_2, 3);
        assert_eq!(params.len, 67);
        assert_eq!(params.key_size(), 2144);

        // Equal inputs give value-equal parameter sets.
        assert_eq!(params, WotsParams::new(32, 16).unwrap());
    }

    #[test]
    fn test_wots_params_rejects_degenerate_w() {
        assert!(WotsParams::new(32, 0).is_err());
        assert!(WotsParams::new(32, 1).is_err());
        assert!(WotsParams::new(0, 16).is_err());
    }

    #[test]
    fn test_xmss_params_rejects_bad_bds_pairing() {
        // k must be smaller than the height.
        assert!(XmssParams::new(32, 2, 16, 2).is_err());
        // h - k must be even.
        assert!(XmssParams::new(32, 5, 16, 2).is_err());
        assert!(XmssParams::new(32, 10, 16, 2).is_ok());
    }

    #[test]
    fn test_base_w_non_power_of_two() {
        let params = WotsParams::new(13, 6).unwrap();
        assert_eq!(params.len, 57);

        let input: [u8; 29] = [
            74, 74, 32, 65, 66, 67, 1, 2, 3, 255, 254, 253, 100, 101, 102, 200, 201, 202, 10, 20,
            30, 40, 50, 60, 70, 80, 90, 11, 75,
        ];
        let expected: [u8; 57] = [
            1, 4, 0, 0, 1, 4, 0, 0, 0, 0, 0, 0, 1, 4, 0, 1, 1, 4, 0, 0, 1, 4, 0, 1, 0, 0, 0, 1,
            0, 0, 0, 0, 0, 0, 0, 1, 1, 5, 5, 5, 1, 5, 5, 4, 1, 5, 5, 5, 1, 4, 1, 4, 1, 4, 1, 5, 1,
        ];

        let mut output = [0xaau8; 64];
        calc_base_w(&params, &mut output, 57, &input);
        assert_eq!(output[..57], expected);
        // Output past out_len keeps the caller's initialisation.
        assert!(output[57..].iter().all(|&b| b == 0xaa));
    }

    #[test]
    fn test_base_w_w256_is_byte_identity() {
        let params = WotsParams::new(11, 256).unwrap();
        let input: [u8; 11] = [159, 202, 211, 84, 72, 119, 20, 240, 87, 221, 150];

        let mut output = [0u8; 13];
        calc_base_w(&params, &mut output, 11, &input);
        assert_eq!(
            output,
            [159, 202, 211, 84, 72, 119, 20, 240, 87, 221, 150, 0, 0]
        );
    }

    #[test]
    fn test_h_msg_key_length_boundary() {
        let mut out = [0u8; 32];
        assert!(h_msg(HashFunction::Shake256, &mut out, b"message", &[0u8; 96], 32).is_ok());

        let err = h_msg(HashFunction::Shake256, &mut out, b"message", &[0u8; 80], 32).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("32"), "missing n in: {text}");
        assert!(text.contains("80"), "missing key length in: {text}");
    }

    #[test]
    fn test_wots_sign_rejects_short_addr() {
        let params = WotsParams::new(32, 16).unwrap();
        let mut sig = vec![0u8; params.key_size() as usize];
        let mut addr = [0u32; 7];

        let err = wots_sign(
            HashFunction::Shake256,
            &mut sig,
            &[0u8; 32],
            &[1u8; 32],
            &params,
            &[2u8; 32],
            &mut addr,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "addr should be an array of size 8");
    }

    #[test]
    fn test_wots_pk_from_sig_matches_pkgen() {
        let func = HashFunction::Shake128;
        let params = WotsParams::new(32, 16).unwrap();
        let seed = [7u8; 32];
        let pub_seed = [9u8; 32];
        let msg = [3u8; 32];
        let key_size = params.key_size() as usize;

        let mut pk = vec![0u8; key_size];
        let mut addr = [0u32; 8];
        wots::wots_pkgen(func, &mut pk, &seed, &params, &pub_seed, &mut addr).unwrap();

        let mut sig = vec![0u8; key_size];
        let mut addr = [0u32; 8];
        wots_sign(func, &mut sig, &msg, &seed, &params, &pub_seed, &mut addr).unwrap();

        let mut recovered = vec![0u8; key_size];
        let mut addr = [0u32; 8];
        wots::wots_pk_from_sig(
            func,
            &mut recovered,
            &sig,
            &msg,
            &params,
            &pub_seed,
            &mut addr,
        )
        .unwrap();

        assert_eq!(pk, recovered);
    }

    #[test]
    fn test_descriptor_decodes_exotic_nibbles() {
        let desc = QrlDescriptor::from_bytes(&[5, 146, 0]);
        assert_eq!(desc.hash_function(), 5);
        assert_eq!(desc.signature_type(), 0);
        assert_eq!(desc.height(), 4);
        assert_eq!(desc.addr_format_type(), 9);
        assert_eq!(desc.to_bytes(), [5, 146, 0]);

        // Raw nibbles outside the known enumerations survive a round-trip;
        // descriptor byte 2 is reserved and re-encodes as the height parity.
        let desc = QrlDescriptor::from_bytes(&[222, 0, 123]);
        assert_eq!(desc.hash_function(), 14);
        assert_eq!(desc.signature_type(), 13);
        assert_eq!(desc.height(), 0);
        assert_eq!(desc.addr_format_type(), 0);
        assert_eq!(desc.to_bytes(), [222, 0, 0]);
    }

    #[test]
    fn test_descriptor_encoding() {
        let desc = QrlDescriptor::new(HashFunction::Shake128, 10, ADDR_FORMAT_SHA256_2X);
        assert_eq!(desc.to_bytes(), [1, 5, 0]);
        assert_eq!(QrlDescriptor::from_bytes(&desc.to_bytes()), desc);

        // Odd heights mark the parity bit.
        let desc = QrlDescriptor::new(HashFunction::Sha2_256, 5, ADDR_FORMAT_SHA256_2X);
        assert_eq!(desc.to_bytes(), [0, 2, 1]);
    }

    #[test]
    fn test_tree_from_zero_seed_matches_reference_prefix() {
        // SHAKE-256, height 4, address format 9.
        let desc = QrlDescriptor::from_bytes(&[2, 146, 0]);
        let tree = Xmss::initialize_tree(desc, &zero_seed()).unwrap();

        assert_eq!(tree.index(), 0);
        assert_eq!(tree.height(), 4);
        assert_eq!(tree.hash_function(), HashFunction::Shake256);
        assert_eq!(
            tree.sk_bytes()[..11],
            [0, 0, 0, 0, 237, 163, 19, 201, 85, 145, 160]
        );
    }

    #[test]
    fn test_extended_seed_roundtrip() {
        let mut extended = [0u8; EXTENDED_SEED_SIZE];
        extended[..3].copy_from_slice(&[2, 2, 0]); // SHAKE-256, height 4
        let tree = Xmss::from_extended_seed(&extended).unwrap();
        assert_eq!(tree.extended_seed(), extended);
        assert_eq!(tree.height(), 4);

        assert!(matches!(
            Xmss::from_extended_seed(&extended[..50]),
            Err(Error::InvalidSeedLength { expected: 51, got: 50 })
        ));
    }

    #[test]
    fn test_address_vector() {
        // SHA256_2X: the descriptor is re-encoded (byte 2 of the input is
        // dropped, giving the 222, 0, 0 prefix), then the last 17 bytes of
        // SHA-256 applied twice over the full 67-byte key are appended.
        let mut epk = vec![222u8, 0, 123];
        epk.extend(0u8..64);
        let address = address_from_extended_pk(&epk).unwrap();
        assert_eq!(address[..3], [222, 0, 0]);
        assert_eq!(
            address,
            [
                222, 0, 0, 181, 103, 32, 225, 190, 153, 175, 214, 221, 17, 69, 201, 229, 42, 92,
                145, 114
            ]
        );
    }

    #[test]
    fn test_address_format_not_supported() {
        let mut epk = vec![222u8, 16, 123];
        epk.extend(0u8..64);
        let err = address_from_extended_pk(&epk).unwrap_err();
        assert_eq!(err.to_string(), "Address format type not supported");
    }

    #[test]
    fn test_sign_verify_all_families() {
        for func in [
            HashFunction::Sha2_256,
            HashFunction::Shake128,
            HashFunction::Shake256,
        ] {
            let mut tree =
                Xmss::from_seed(&pattern_seed(), 4, func, ADDR_FORMAT_SHA256_2X).unwrap();
            let epk = tree.extended_pk();

            for i in 0..3 {
                let msg = format!("message {i}");
                let sig = tree.sign(msg.as_bytes()).unwrap();
                verify(msg.as_bytes(), sig.as_ref(), epk.as_ref()).unwrap();
                assert!(verify(b"wrong message", sig.as_ref(), epk.as_ref()).is_err());
            }
        }
    }

    #[test]
    fn test_sign_advances_index_and_next_leaf() {
        let mut tree =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        assert_eq!(tree.index(), 0);
        assert_eq!(tree.bds.next_leaf, 0);

        tree.sign(b"one").unwrap();
        assert_eq!(tree.index(), 1);
        assert_eq!(tree.bds.next_leaf, 1);

        tree.sign(b"two").unwrap();
        assert_eq!(tree.index(), 2);
        assert_eq!(tree.bds.next_leaf, 2);
    }

    #[test]
    fn test_all_indices_verify_then_key_exhausts() {
        let mut tree =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Sha2_256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        let epk = tree.extended_pk();
        assert_eq!(tree.remaining_signatures(), 16);

        for i in 0..16u32 {
            assert_eq!(tree.index(), i);
            let msg = format!("leaf {i}");
            let sig = tree.sign(msg.as_bytes()).unwrap();
            assert_eq!(sig.as_ref().len(), tree.signature_size() as usize);
            verify(msg.as_bytes(), sig.as_ref(), epk.as_ref()).unwrap();
        }

        assert_eq!(tree.remaining_signatures(), 0);
        assert!(matches!(tree.sign(b"one more"), Err(Error::KeyExhausted)));
    }

    #[test]
    fn test_corrupted_signatures_rejected() {
        let mut tree =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        let epk = tree.extended_pk();
        let sig = tree.sign(b"test message").unwrap();
        let sig_bytes = sig.as_ref();

        // Index, randomness, WOTS chains and auth path each break verification.
        for position in [3usize, 20, 100, sig_bytes.len() - 1] {
            let mut bad = sig_bytes.to_vec();
            bad[position] ^= 0xff;
            assert!(verify(b"test message", &bad, epk.as_ref()).is_err());
        }

        // Truncated signatures are rejected outright.
        assert!(verify(b"test message", &sig_bytes[..sig_bytes.len() / 2], epk.as_ref()).is_err());
    }

    #[test]
    fn test_verify_rejects_foreign_key() {
        let mut tree =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        let sig = tree.sign(b"hello").unwrap();

        let other =
            Xmss::from_seed(&zero_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        assert!(verify(b"hello", sig.as_ref(), other.extended_pk().as_ref()).is_err());
    }

    #[test]
    fn test_deterministic_keygen() {
        let tree1 =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake128, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        let mut tree2 =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake128, ADDR_FORMAT_SHA256_2X)
                .unwrap();

        assert_eq!(tree1.extended_pk(), tree2.extended_pk());
        assert_eq!(tree1.sk_bytes(), tree2.sk_bytes());
        assert_eq!(tree1.address().unwrap(), tree2.address().unwrap());

        let sig = tree2.sign(b"deterministic").unwrap();
        verify(b"deterministic", sig.as_ref(), tree1.extended_pk().as_ref()).unwrap();
    }

    #[test]
    fn test_set_index_fast_forward() {
        let seed = pattern_seed();
        let mut signed =
            Xmss::from_seed(&seed, 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X).unwrap();
        let mut jumped =
            Xmss::from_seed(&seed, 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X).unwrap();

        for i in 0..5 {
            signed.sign(format!("burn {i}").as_bytes()).unwrap();
        }
        jumped.set_index(5).unwrap();
        assert_eq!(jumped.index(), 5);

        // Both trees now produce the identical signature for leaf 5.
        let a = signed.sign(b"after the jump").unwrap();
        let b = jumped.sign(b"after the jump").unwrap();
        assert_eq!(a, b);
        verify(b"after the jump", b.as_ref(), jumped.extended_pk().as_ref()).unwrap();
    }

    #[test]
    fn test_set_index_bounds() {
        let mut tree =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        assert!(matches!(
            tree.set_index(16),
            Err(Error::IndexOutOfRange { index: 16, max: 16 })
        ));

        tree.sign(b"advance").unwrap();
        assert!(matches!(
            tree.set_index(0),
            Err(Error::IndexRewind { index: 0, current: 1 })
        ));

        // The last leaf is still reachable.
        tree.set_index(15).unwrap();
        let sig = tree.sign(b"last leaf").unwrap();
        verify(b"last leaf", sig.as_ref(), tree.extended_pk().as_ref()).unwrap();
        assert!(tree.sign(b"exhausted").is_err());
    }

    #[test]
    fn test_from_height_uses_injected_randomness() {
        let mut rng = rand::rng();
        let mut tree = Xmss::from_height(4, HashFunction::Sha2_256, &mut rng).unwrap();

        let address = tree.address().unwrap();
        assert_eq!(address[..3], tree.descriptor().to_bytes());

        let sig = tree.sign(b"random tree").unwrap();
        verify(b"random tree", sig.as_ref(), tree.extended_pk().as_ref()).unwrap();
    }

    #[test]
    fn test_initialize_tree_rejects_invalid_inputs() {
        // Heights whose BDS pairing is invalid (k = 2).
        for height in [0u8, 2, 3, 5] {
            let desc = QrlDescriptor::new(HashFunction::Shake256, height, ADDR_FORMAT_SHA256_2X);
            assert!(Xmss::initialize_tree(desc, &zero_seed()).is_err());
        }

        // Unknown hash-function nibble.
        let desc = QrlDescriptor::from_bytes(&[5, 146, 0]);
        assert!(matches!(
            Xmss::initialize_tree(desc, &zero_seed()),
            Err(Error::UnknownHashFunction(5))
        ));

        // Wrong seed length.
        let desc = QrlDescriptor::new(HashFunction::Shake256, 4, ADDR_FORMAT_SHA256_2X);
        assert!(matches!(
            Xmss::initialize_tree(desc, &[0u8; 47]),
            Err(Error::InvalidSeedLength { expected: 48, got: 47 })
        ));
    }

    #[test]
    fn test_signature_trait_impls() {
        use signature::{SignerMut, Verifier};

        let mut tree =
            Xmss::from_seed(&pattern_seed(), 4, HashFunction::Sha2_256, ADDR_FORMAT_SHA256_2X)
                .unwrap();
        let epk = tree.extended_pk();

        let sig = tree.try_sign(b"trait based").unwrap();
        Verifier::verify(&epk, b"trait based", &sig).unwrap();
        assert!(Verifier::verify(&epk, b"other message", &sig).is_err());
    }

    #[cfg(feature = "serde")]
    mod serde_tests {
        use super::*;

        #[test]
        fn test_extended_pk_serde_json_roundtrip() {
            let tree =
                Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                    .unwrap();
            let epk = tree.extended_pk();

            let json = serde_json::to_string(&epk).unwrap();
            let epk2: ExtendedPublicKey = serde_json::from_str(&json).unwrap();
            assert_eq!(epk, epk2);
        }

        #[test]
        fn test_signature_serde_json_roundtrip() {
            let mut tree =
                Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                    .unwrap();
            let sig = tree.sign(b"serde test").unwrap();

            let json = serde_json::to_string(&sig).unwrap();
            let sig2: XmssSignature = serde_json::from_str(&json).unwrap();
            assert_eq!(sig, sig2);
        }

        #[test]
        fn test_signature_postcard_roundtrip() {
            let mut tree =
                Xmss::from_seed(&pattern_seed(), 4, HashFunction::Shake256, ADDR_FORMAT_SHA256_2X)
                    .unwrap();
            let sig = tree.sign(b"postcard test").unwrap();

            let bytes = postcard::to_allocvec(&sig).unwrap();
            let sig2: XmssSignature = postcard::from_bytes(&bytes).unwrap();
            assert_eq!(sig, sig2);
        }
    }
}
