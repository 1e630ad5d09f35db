//! Processing modes and configuration.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use crate::sign::RootKeys;


//------------ Mode ----------------------------------------------------------

/// How strictly a data file is processed.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Tolerate what real-world files get wrong.
    ///
    /// Unknown regions are skipped, leftover octets in a region are
    /// ignored, and a stray octet at the end of the file is fine. This is
    /// the default.
    #[default]
    Lenient,

    /// Fail on anything that isn’t exactly right.
    ///
    /// In addition to turning all the tolerances of lenient mode into
    /// errors, region lengths are checked to exactly match what their
    /// content consumed.
    Strict,
}

impl Mode {
    pub fn is_strict(self) -> bool {
        matches!(self, Mode::Strict)
    }
}


//------------ Config --------------------------------------------------------

/// Configuration for decoding data files.
#[derive(Clone, Debug)]
pub struct Config {
    mode: Mode,
    validate_signatures: bool,
    reference_time: Option<DateTime<Utc>>,
    root_keys: Arc<RootKeys>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::Lenient,
            validate_signatures: false,
            reference_time: None,
            root_keys: RootKeys::european(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the processing mode.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Switches strict processing on or off.
    pub fn strict(self, strict: bool) -> Self {
        self.mode(if strict { Mode::Strict } else { Mode::Lenient })
    }

    /// Switches signature validation on or off.
    pub fn validate_signatures(mut self, validate: bool) -> Self {
        self.validate_signatures = validate;
        self
    }

    /// Sets the time against which timestamps in a file are judged.
    ///
    /// Timestamps after this time are considered implausible and don’t
    /// count for certificate expiry. If not set, the current time at the
    /// start of decoding is used.
    pub fn reference_time(mut self, time: DateTime<Utc>) -> Self {
        self.reference_time = Some(time);
        self
    }

    /// Sets the table of trusted root keys.
    pub fn root_keys(mut self, keys: Arc<RootKeys>) -> Self {
        self.root_keys = keys;
        self
    }

    pub fn get_mode(&self) -> Mode {
        self.mode
    }

    pub fn get_validate_signatures(&self) -> bool {
        self.validate_signatures
    }

    pub fn get_reference_time(&self) -> Option<DateTime<Utc>> {
        self.reference_time
    }

    pub fn get_root_keys(&self) -> &Arc<RootKeys> {
        &self.root_keys
    }
}
