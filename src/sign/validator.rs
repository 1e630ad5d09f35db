//! Validating signatures.

use std::mem;
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crate::error::{DecodeError, SignatureError};
use super::cert::{CertificateRole, EncryptedCertificate, RsaPublicKey};
use super::der::DigestInfo;
use super::keys::RootKeys;


//------------ ValidatorState ------------------------------------------------

/// How far the validator is from being able to validate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValidatorState {
    /// No certificate has been seen yet.
    Idle,

    /// One of the two certificates has been seen.
    PartiallyReady,

    /// Both certificates are there.
    Ready,
}


//------------ Validator -----------------------------------------------------

/// Validates signatures in a data file.
///
/// Signatures are checked against a chain of two certificates: the CA
/// certificate, issued by one of the root keys, and the subject
/// certificate issued by the CA. Both certificates come from the data file
/// itself and may appear after the data they are needed for. Signatures
/// submitted via [`validate`][Self::validate] are therefore queued until
/// both certificates are known.
///
/// A disabled validator accepts everything.
#[derive(Clone, Debug)]
pub struct Validator {
    enabled: bool,
    root_keys: Arc<RootKeys>,
    ca: Option<EncryptedCertificate>,
    subject: Option<EncryptedCertificate>,
    pending: Vec<Pending>,
}

#[derive(Clone, Debug)]
struct Pending {
    data: Bytes,
    signature: Bytes,
}

impl Validator {
    pub fn new(enabled: bool, root_keys: Arc<RootKeys>) -> Self {
        Validator {
            enabled,
            root_keys,
            ca: None,
            subject: None,
            pending: Vec::new(),
        }
    }

    /// Creates a validator that accepts everything.
    pub fn disabled() -> Self {
        Self::new(false, Arc::new(RootKeys::new()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> ValidatorState {
        match (self.ca.is_some(), self.subject.is_some()) {
            (true, true) => ValidatorState::Ready,
            (false, false) => ValidatorState::Idle,
            _ => ValidatorState::PartiallyReady,
        }
    }

    /// Returns the number of signatures waiting for certificates.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Sets one of the two certificates.
    ///
    /// If this completes the chain, all queued signatures are validated.
    pub fn set_certificate(
        &mut self,
        role: CertificateRole,
        cert: EncryptedCertificate,
        observed: Option<DateTime<Utc>>,
    ) -> Result<(), SignatureError> {
        if !self.enabled {
            return Ok(())
        }
        tracing::debug!("registered {} issued by {}", role, cert.authority());
        match role {
            CertificateRole::Ca => self.ca = Some(cert),
            CertificateRole::Subject => self.subject = Some(cert),
        }
        self.drain(observed)
    }

    /// Submits a signature over some data.
    ///
    /// If both certificates are known, the signature and everything queued
    /// before it are validated right away. Otherwise it is queued.
    pub fn validate(
        &mut self,
        data: Bytes,
        signature: Bytes,
        observed: Option<DateTime<Utc>>,
    ) -> Result<(), SignatureError> {
        if !self.enabled {
            return Ok(())
        }
        self.pending.push(Pending { data, signature });
        self.drain(observed)
    }

    /// Validates all queued signatures if both certificates are known.
    pub fn drain(
        &mut self, observed: Option<DateTime<Utc>>
    ) -> Result<(), SignatureError> {
        if self.state() != ValidatorState::Ready || self.pending.is_empty() {
            return Ok(())
        }
        for item in mem::take(&mut self.pending) {
            self.verify(&item.data, &item.signature, observed)?;
        }
        Ok(())
    }

    /// Finishes validation at the end of a file.
    ///
    /// Signatures that are still queued now will never be validated, which
    /// is an error.
    pub fn finish(
        &mut self, observed: Option<DateTime<Utc>>
    ) -> Result<(), DecodeError> {
        if !self.enabled {
            return Ok(())
        }
        self.drain(observed)?;
        if self.pending.is_empty() {
            Ok(())
        }
        else {
            Err(DecodeError::UnvalidatedSignaturesRemaining(
                self.pending.len()
            ))
        }
    }

    /// Validates a single signature right now.
    ///
    /// `observed` is the newest plausible time seen in the data. No
    /// certificate in the chain may have expired before it.
    pub fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        observed: Option<DateTime<Utc>>,
    ) -> Result<(), SignatureError> {
        let ca = self.ca.as_ref().ok_or(
            SignatureError::MissingCertificate(CertificateRole::Ca)
        )?;
        let subject = self.subject.as_ref().ok_or(
            SignatureError::MissingCertificate(CertificateRole::Subject)
        )?;

        let root = self.root_keys.get(ca.authority()).ok_or(
            SignatureError::UnknownSigner(*ca.authority())
        )?;
        let ca = ca.recover(root)?;
        ca.check(observed)?;
        let subject = subject.recover(&ca.key)?;
        subject.check(observed)?;
        verify_signature(&subject.key, data, signature)?;
        tracing::debug!("valid signature over {} octets", data.len());
        Ok(())
    }
}


//------------ Helper Functions ----------------------------------------------

/// Checks a PKCS#1 v1.5 signature with a SHA-1 digest.
fn verify_signature(
    key: &RsaPublicKey, data: &[u8], signature: &[u8]
) -> Result<(), SignatureError> {
    let mut message = key.recover(signature);

    // The leading zero octet is lost in the conversion, but some signers
    // drop it already. Either way, 127 octets means it is missing.
    if message.len() == 127 {
        message.insert(0, 0)
    }
    DigestInfo::from_der(strip_padding(&message)?)?.verify(data)
}

/// Removes the `00 01 FF .. FF 00` padding from a signature message.
fn strip_padding(message: &[u8]) -> Result<&[u8], SignatureError> {
    let rest = message.strip_prefix(b"\x00\x01").ok_or(
        SignatureError::MalformedSignatureMessage
    )?;
    let padding = rest.iter().take_while(|&&octet| octet == 0xFF).count();
    if padding == 0 {
        return Err(SignatureError::MalformedSignatureMessage)
    }
    rest[padding..].strip_prefix(b"\x00").ok_or(
        SignatureError::MalformedSignatureMessage
    )
}


//============ Tests =========================================================
