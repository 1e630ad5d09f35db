//! Synthetic certificate chains for testing.
//!
//! There are three key pairs: a root key standing in for the European
//! root, a member state CA key, and a card key. Keys are generated from
//! fixed seeds once per test run.

use std::sync::{Arc, OnceLock};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::RsaPrivateKey;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use sha1::{Digest, Sha1};
use super::{CaReference, RootKeys, RsaPublicKey};


/// The reference of the root key.
pub const ROOT_REF: [u8; 8] = *b"\xFDEC \x01\xFF\xFF\x01";

/// The reference of the CA key.
pub const CA_REF: [u8; 8] = *b"\x0DD  \x04\x00\x01\x01";

/// The holder reference of the card certificate.
pub const CARD_REF: [u8; 8] = *b"\x0DD  \x11\x22\x33\x44";

/// The DER encoding of a SHA-1 DigestInfo minus the digest.
pub const SHA1_INFO: &[u8] =
    b"\x30\x21\x30\x09\x06\x05\x2B\x0E\x03\x02\x1A\x05\x00\x04\x14";

/// The same for SHA-256.
pub const SHA256_INFO: &[u8] =
    b"\x30\x31\x30\x0D\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01\x05\x00\
      \x04\x20";


//------------ KeyPair -------------------------------------------------------

pub struct KeyPair {
    public: RsaPublicKey,
    modulus: BigUint,
    private: BigUint,
}

impl KeyPair {
    fn generate(seed: u64) -> Self {
        let key = RsaPrivateKey::new(
            &mut StdRng::seed_from_u64(seed), 1024
        ).unwrap();
        let modulus = key.n().to_bytes_be();
        let exponent = key.e().to_bytes_be();
        KeyPair {
            public: RsaPublicKey::from_octets(&modulus, &exponent),
            modulus: BigUint::from_bytes_be(&modulus),
            private: BigUint::from_bytes_be(&key.d().to_bytes_be()),
        }
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Applies the private key to a 128 octet message.
    pub fn sign_raw(&self, message: &[u8]) -> Vec<u8> {
        let res = BigUint::from_bytes_be(message).modpow(
            &self.private, &self.modulus
        ).to_bytes_be();
        pad(&res, 128)
    }

    fn modulus_octets(&self) -> Vec<u8> {
        pad(&self.modulus.to_bytes_be(), 128)
    }

    fn exponent_octets(&self) -> Vec<u8> {
        pad(&self.public.exponent().to_bytes_be(), 8)
    }
}

fn pad(data: &[u8], len: usize) -> Vec<u8> {
    let mut res = vec![0; len - data.len()];
    res.extend_from_slice(data);
    res
}

fn keys() -> &'static [KeyPair] {
    static KEYS: OnceLock<Vec<KeyPair>> = OnceLock::new();
    KEYS.get_or_init(|| {
        (1..=3).map(KeyPair::generate).collect()
    })
}

pub fn root() -> &'static KeyPair {
    &keys()[0]
}

pub fn ca() -> &'static KeyPair {
    &keys()[1]
}

pub fn card() -> &'static KeyPair {
    &keys()[2]
}

/// Returns a root key table containing only the test root.
pub fn root_keys() -> Arc<RootKeys> {
    let mut res = RootKeys::new();
    res.insert(CaReference::from_octets(ROOT_REF), root().public().clone());
    Arc::new(res)
}


//------------ Certificates and Signatures -----------------------------------

/// Creates an encoded certificate for `holder`.
pub fn certificate(
    issuer: &KeyPair, issuer_ref: [u8; 8],
    holder: &KeyPair, holder_ref: [u8; 8],
    expiry: Option<DateTime<Utc>>,
) -> Vec<u8> {
    let mut content = Vec::with_capacity(164);
    content.push(1);
    content.extend_from_slice(&issuer_ref);
    content.extend_from_slice(b"\xFF\xD7\x01\x00\x00\x00\x00");
    content.extend_from_slice(
        &expiry.map(|t| t.timestamp() as u32).unwrap_or(u32::MAX)
            .to_be_bytes()
    );
    content.extend_from_slice(&holder_ref);
    content.extend_from_slice(&holder.modulus_octets());
    content.extend_from_slice(&holder.exponent_octets());
    assert_eq!(content.len(), 164);

    let mut message = vec![0x6A];
    message.extend_from_slice(&content[..106]);
    message.extend_from_slice(&Sha1::digest(&content));
    message.push(0xBC);

    let mut res = issuer.sign_raw(&message);
    res.extend_from_slice(&content[106..]);
    res.extend_from_slice(&issuer_ref);
    res
}

/// Creates the CA certificate issued by the root.
pub fn ca_certificate(expiry: Option<DateTime<Utc>>) -> Vec<u8> {
    certificate(root(), ROOT_REF, ca(), CA_REF, expiry)
}

/// Creates the card certificate issued by the CA.
pub fn card_certificate(expiry: Option<DateTime<Utc>>) -> Vec<u8> {
    certificate(ca(), CA_REF, card(), CARD_REF, expiry)
}

/// Creates a signature from a DigestInfo.
pub fn sign_digest_info(signer: &KeyPair, info: &[u8]) -> Vec<u8> {
    let mut message = vec![0x00, 0x01];
    message.resize(128 - 1 - info.len(), 0xFF);
    message.push(0);
    message.extend_from_slice(info);
    signer.sign_raw(&message)
}

/// Creates a SHA-1 signature over some data.
pub fn signature(signer: &KeyPair, data: &[u8]) -> Vec<u8> {
    let mut info = SHA1_INFO.to_vec();
    info.extend_from_slice(&Sha1::digest(data));
    sign_digest_info(signer, &info)
}
