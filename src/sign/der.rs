//! The DigestInfo of a signature message.
//!
//! This is a private module. The signature message of a Gen1 signature
//! ends in a DER encoded DigestInfo:
//!
//! ```text
//! DigestInfo ::= SEQUENCE {
//!     digestAlgorithm  SEQUENCE {
//!         algorithm   OBJECT IDENTIFIER,
//!         parameters  NULL OPTIONAL },
//!     digest           OCTET STRING }
//! ```

use bcder::{ConstOid, Mode, OctetString, Oid};
use bcder::decode::{self, Constructed, DecodeError};
use sha1::{Digest, Sha1};
use crate::error::SignatureError;


//------------ Constants -----------------------------------------------------

/// SHA-1, 1.3.14.3.2.26.
pub const SHA1: ConstOid = Oid(&[43, 14, 3, 2, 26]);


//------------ DigestInfo ----------------------------------------------------

/// A digest and the algorithm that produced it.
#[derive(Clone, Debug)]
pub struct DigestInfo {
    algorithm: Oid,
    digest: OctetString,
}

impl DigestInfo {
    /// Parses a DER encoded DigestInfo.
    pub fn from_der(data: &[u8]) -> Result<Self, SignatureError> {
        Constructed::decode(data, Mode::Der, Self::take_from).map_err(|err| {
            SignatureError::MalformedDigestInfo(err.to_string())
        })
    }

    /// Takes a DigestInfo from the beginning of a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let algorithm = cons.take_sequence(|cons| {
                let oid = Oid::take_from(cons)?;
                cons.take_opt_null()?;
                Ok(oid)
            })?;
            Ok(DigestInfo {
                algorithm,
                digest: OctetString::take_from(cons)?,
            })
        })
    }

    pub fn algorithm(&self) -> &Oid {
        &self.algorithm
    }

    pub fn digest(&self) -> &OctetString {
        &self.digest
    }

    /// Checks that the digest matches the data.
    ///
    /// Only SHA-1 is supported.
    pub fn verify(&self, data: &[u8]) -> Result<(), SignatureError> {
        if self.algorithm != SHA1 {
            return Err(SignatureError::UnknownDigestAlgorithm(
                self.algorithm.to_string()
            ))
        }
        if self.digest.to_bytes().as_ref() == Sha1::digest(data).as_slice() {
            Ok(())
        }
        else {
            Err(SignatureError::DigestMismatch)
        }
    }
}


//============ Tests =========================================================
