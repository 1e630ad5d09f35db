//! Error Handling.
//!
//! This is a private module. Its public content is being re-exported by the
//! crate root.

use std::borrow::Cow;
use std::io;
use chrono::{DateTime, Utc};
use crate::schema::Magic;
use crate::sign::{CaReference, CertificateRole};
use crate::source::Pos;


//------------ DecodeError ---------------------------------------------------

/// An error happened while decoding a data file.
///
/// Apart from [`DecodeError::UnexpectedEndOfData`] inside a collection,
/// which only truncates that collection, all of these abort the decoding
/// of the whole file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The source ended before a value was complete.
    #[error("unexpected end of data at {pos}")]
    UnexpectedEndOfData { pos: Pos },

    /// A field did not contain what its type demands.
    #[error("malformed field at {pos}: {msg}")]
    MalformedField { pos: Pos, msg: Cow<'static, str> },

    /// A pointer into a cyclic buffer points outside of the buffer.
    #[error("pointer out of bounds at {pos}: {msg}")]
    OutOfBoundsPointer { pos: Pos, msg: Cow<'static, str> },

    /// A cyclic buffer would have to wrap around a second time.
    #[error("cyclic buffer wrapped twice at {pos}")]
    CyclicBufferOverrun { pos: Pos },

    /// No schema region matches the magic (strict mode only).
    #[error("unrecognized magic {magic} at {pos}")]
    UnrecognizedMagic { magic: Magic, pos: Pos },

    /// Signature validation failed.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// Signatures were still queued when the file ended.
    #[error("{0} signatures left unvalidated")]
    UnvalidatedSignaturesRemaining(usize),

    /// The source does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Reading from the underlying source failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DecodeError {
    pub fn end_of_data(pos: impl Into<Pos>) -> Self {
        DecodeError::UnexpectedEndOfData { pos: pos.into() }
    }

    pub fn malformed(
        pos: impl Into<Pos>, msg: impl Into<Cow<'static, str>>
    ) -> Self {
        DecodeError::MalformedField { pos: pos.into(), msg: msg.into() }
    }

    pub fn out_of_bounds(
        pos: impl Into<Pos>, msg: impl Into<Cow<'static, str>>
    ) -> Self {
        DecodeError::OutOfBoundsPointer { pos: pos.into(), msg: msg.into() }
    }

    /// Returns whether this is a premature end of data.
    ///
    /// Collections catch this one to keep what they have decoded so far.
    pub fn is_end_of_data(&self) -> bool {
        matches!(*self, DecodeError::UnexpectedEndOfData { .. })
    }

    /// Returns the signature error if this is one.
    pub fn signature_error(&self) -> Option<&SignatureError> {
        match *self {
            DecodeError::InvalidSignature(ref err) => Some(err),
            _ => None
        }
    }
}


//------------ SignatureError ------------------------------------------------

/// Validation of a signature or certificate failed.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// A certificate expired before the newest time observed in the file.
    #[error(
        "certificate has expired: data time {observed} is after end of \
         validity {expiry}"
    )]
    ExpiredCertificate {
        expiry: DateTime<Utc>,
        observed: DateTime<Utc>,
    },

    /// The CA certificate was issued by a key we don’t know.
    #[error("CA certificate is signed by unknown key {0}")]
    UnknownSigner(CaReference),

    /// The digest in the signature doesn’t match the signed data.
    #[error("signature doesn’t match signed data")]
    DigestMismatch,

    /// The recovered certificate message is broken.
    #[error("invalid certificate message")]
    MalformedCertificateMessage,

    /// The recovered signature message is broken.
    #[error("invalid signature message")]
    MalformedSignatureMessage,

    /// The DigestInfo inside the signature message is broken.
    #[error("invalid DigestInfo: {0}")]
    MalformedDigestInfo(String),

    /// The signature uses a digest algorithm other than SHA-1.
    #[error("unknown digest algorithm {0}")]
    UnknownDigestAlgorithm(String),

    /// A recovered certificate has the wrong profile.
    #[error("invalid certificate profile {profile}")]
    InvalidCertificate { profile: u8 },

    /// A certificate needed for validation was never seen.
    #[error("{0} is not set")]
    MissingCertificate(CertificateRole),

    /// The decoded certificate lacks a field.
    #[error("certificate lacks field {0}")]
    MalformedCertificateField(&'static str),

    /// A root key table isn’t a sequence of complete key records.
    #[error("malformed root key table")]
    MalformedRootKeys,

    /// A signed elementary file isn’t followed by its signature.
    #[error("no signature present for {0}")]
    MissingSignature(String),
}
