//! The state shared by all nodes while decoding a file.

use std::collections::HashMap;
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crate::error::{DecodeError, SignatureError};
use crate::mode::Config;
use crate::sign::{CertificateRole, EncryptedCertificate, Validator};
use crate::value::Value;


//------------ Session -------------------------------------------------------

/// Everything a decode of a single file accumulates along the way.
///
/// A new session is created for every file so nothing carries over from
/// one file to the next.
#[derive(Debug)]
pub struct Session {
    /// The string values published by global nodes.
    globals: HashMap<Arc<str>, String>,

    /// The absolute start of the data protected by the next signature.
    signed_start: u64,

    /// The absolute end of the data protected by the next signature.
    signed_end: u64,

    /// The newest plausible time seen so far.
    latest_time: Option<DateTime<Utc>>,

    /// Times after this aren’t plausible.
    reference_time: DateTime<Utc>,

    validator: Validator,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Session {
            globals: HashMap::new(),
            signed_start: 0,
            signed_end: 0,
            latest_time: None,
            reference_time: config.get_reference_time().unwrap_or_else(
                Utc::now
            ),
            validator: Validator::new(
                config.get_validate_signatures(),
                config.get_root_keys().clone()
            ),
        }
    }

    /// Publishes the value of a global node.
    pub fn publish(&mut self, name: Arc<str>, value: String) {
        self.globals.insert(name, value);
    }

    /// Returns the value published under the given name.
    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    /// Takes note of a time found in the data.
    ///
    /// Times after the reference time are ignored as implausible.
    pub fn observe_time(&mut self, time: DateTime<Utc>) {
        if time > self.reference_time {
            return
        }
        if self.latest_time.map(|latest| time > latest).unwrap_or(true) {
            self.latest_time = Some(time)
        }
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.latest_time
    }

    pub fn set_signed_start(&mut self, pos: u64) {
        self.signed_start = pos
    }

    pub fn set_signed_end(&mut self, pos: u64) {
        self.signed_end = pos
    }

    /// Returns the start and end of the currently signed range.
    pub fn signed_range(&self) -> (u64, u64) {
        (self.signed_start, self.signed_end)
    }

    pub fn validates(&self) -> bool {
        self.validator.is_enabled()
    }

    /// Registers a decoded certificate.
    pub fn register_certificate(
        &mut self, role: CertificateRole, value: &Value
    ) -> Result<(), SignatureError> {
        if !self.validator.is_enabled() {
            return Ok(())
        }
        let cert = EncryptedCertificate::from_value(value)?;
        self.validator.set_certificate(role, cert, self.latest_time)
    }

    /// Submits a signature over some data.
    pub fn validate(
        &mut self, data: Bytes, signature: Bytes
    ) -> Result<(), SignatureError> {
        self.validator.validate(data, signature, self.latest_time)
    }

    /// Validates what is left at the end of the file.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        self.validator.finish(self.latest_time)
    }
}


//============ Tests =========================================================
