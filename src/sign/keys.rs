//! The table of trusted root keys.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use crate::error::SignatureError;
use super::cert::{CaReference, RsaPublicKey};


/// The European root key table embedded at build time.
static EUROPEAN: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/EC_PK.bin"));


//------------ RootKeys ------------------------------------------------------

/// The public keys that CA certificates may be issued by.
#[derive(Clone, Debug, Default)]
pub struct RootKeys {
    keys: HashMap<CaReference, RsaPublicKey>,
}

impl RootKeys {
    /// The length of a key record: reference, modulus, and exponent.
    const RECORD_LEN: usize = CaReference::LEN + 128 + 8;

    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a table in the format of the ERCA key file.
    ///
    /// The file is a sequence of records, each consisting of the eight
    /// octet reference, the 128 octet modulus and the eight octet public
    /// exponent. A record with a zero modulus makes the table invalid.
    pub fn parse(data: &[u8]) -> Result<Self, SignatureError> {
        if data.len() % Self::RECORD_LEN != 0 {
            return Err(SignatureError::MalformedRootKeys)
        }
        let mut res = Self::new();
        for record in data.chunks_exact(Self::RECORD_LEN) {
            let (reference, key) = record.split_at(CaReference::LEN);
            let (modulus, exponent) = key.split_at(128);
            let key = RsaPublicKey::from_octets(modulus, exponent);
            if key.modulus_len() == 0 {
                return Err(SignatureError::MalformedRootKeys)
            }
            res.insert(
                CaReference::from_slice(reference).ok_or(
                    SignatureError::MalformedRootKeys
                )?,
                key
            );
        }
        Ok(res)
    }

    /// Returns the embedded European root key table.
    ///
    /// The table is parsed on first use and shared afterwards. If it can’t
    /// be parsed, an error is logged and the table is empty.
    pub fn european() -> Arc<Self> {
        static KEYS: OnceLock<Arc<RootKeys>> = OnceLock::new();
        KEYS.get_or_init(|| {
            match Self::parse(EUROPEAN) {
                Ok(keys) => {
                    tracing::debug!(
                        "loaded {} embedded root keys", keys.len()
                    );
                    Arc::new(keys)
                }
                Err(err) => {
                    tracing::error!("embedded root keys: {}", err);
                    Arc::new(Self::new())
                }
            }
        }).clone()
    }

    /// Adds a key to the table.
    ///
    /// Returns the key previously stored under the reference if any.
    pub fn insert(
        &mut self, reference: CaReference, key: RsaPublicKey
    ) -> Option<RsaPublicKey> {
        self.keys.insert(reference, key)
    }

    pub fn get(&self, reference: &CaReference) -> Option<&RsaPublicKey> {
        self.keys.get(reference)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}


//============ Tests =========================================================
