//! Validating the signatures in data files.
//!
//! Data files of the first generation protect their content with RSA
//! signatures over SHA-1 digests. The keys for checking them come with the
//! file in the form of two certificates: a certificate of the member
//! state’s certification authority issued by the European root key, and
//! the certificate of the card or vehicle unit issued by the member state.
//!
//! The [`Validator`] collects these certificates while a file is decoded
//! and checks every signature as soon as both are known. The trusted root
//! keys are kept in [`RootKeys`].

pub use self::cert::{
    CaReference, Certificate, CertificateRole, EncryptedCertificate,
    RsaPublicKey,
};
pub use self::keys::RootKeys;
pub use self::validator::{Validator, ValidatorState};

mod cert;
mod der;
mod keys;
mod validator;

#[cfg(test)]
pub(crate) mod fixture;
