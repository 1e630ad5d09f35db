//! Gen1 certificates.
//!
//! A first generation certificate travels in encrypted form: the first
//! 106 octets of the certificate plus their SHA-1 digest are packed into
//! a message that is “encrypted” with the private key of the issuer. The
//! remaining 58 octets follow in the clear, and so does the reference to
//! the issuer’s key needed to recover the message.

use std::fmt;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use sha1::{Digest, Sha1};
use crate::error::SignatureError;
use crate::value::Value;


//------------ CaReference ---------------------------------------------------

/// The reference to a certification authority’s key.
///
/// This is what certificates use to name their issuer and how the root key
/// table is indexed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CaReference {
    pub nation: u8,
    pub nation_code: [u8; 3],
    pub serial_number: u8,
    pub additional_info: u16,
    pub ca_identifier: u8,
}

impl CaReference {
    /// The length of an encoded reference in octets.
    pub const LEN: usize = 8;

    pub fn from_octets(octets: [u8; 8]) -> Self {
        CaReference {
            nation: octets[0],
            nation_code: [octets[1], octets[2], octets[3]],
            serial_number: octets[4],
            additional_info: u16::from_be_bytes([octets[5], octets[6]]),
            ca_identifier: octets[7],
        }
    }

    /// Creates a reference from the first eight octets of a slice.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let octets: [u8; 8] = slice.get(..Self::LEN)?.try_into().ok()?;
        Some(Self::from_octets(octets))
    }

    /// Reconstructs the reference from its decoded value.
    ///
    /// The value needs the children `Nation`, `NationCode`,
    /// `SerialNumber`, `AdditionalInfo`, and `CaIdentifier`.
    pub fn from_value(value: &Value) -> Result<Self, SignatureError> {
        fn number(value: &Value, name: &'static str) -> Result<u64, SignatureError> {
            value.child(name).and_then(Value::to_u64).ok_or(
                SignatureError::MalformedCertificateField(name)
            )
        }

        let nation_code = value.child("NationCode").and_then(
            Value::to_bytes
        ).and_then(|code| {
            <[u8; 3]>::try_from(code.as_ref()).ok()
        }).ok_or(
            SignatureError::MalformedCertificateField("NationCode")
        )?;

        Ok(CaReference {
            nation: number(value, "Nation")? as u8,
            nation_code,
            serial_number: number(value, "SerialNumber")? as u8,
            additional_info: number(value, "AdditionalInfo")? as u16,
            ca_identifier: number(value, "CaIdentifier")? as u8,
        })
    }

    pub fn to_octets(&self) -> [u8; 8] {
        let info = self.additional_info.to_be_bytes();
        [
            self.nation,
            self.nation_code[0], self.nation_code[1], self.nation_code[2],
            self.serial_number, info[0], info[1], self.ca_identifier
        ]
    }
}

impl fmt::Display for CaReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.to_octets()))
    }
}


//------------ CertificateRole -----------------------------------------------

/// The part a certificate plays in validating a signature.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CertificateRole {
    /// The certificate of the member state authority.
    ///
    /// It is issued by a root key and issues the subject certificate.
    Ca,

    /// The certificate of the card or vehicle unit that signed the data.
    Subject,
}

impl CertificateRole {
    /// Returns the role of a certificate with the given schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CACertificate" | "MemberStateCertificate" => {
                Some(CertificateRole::Ca)
            }
            "CardCertificate" | "VuCertificate" => {
                Some(CertificateRole::Subject)
            }
            _ => None
        }
    }
}

impl fmt::Display for CertificateRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            CertificateRole::Ca => "CA certificate",
            CertificateRole::Subject => "subject certificate",
        })
    }
}


//------------ RsaPublicKey --------------------------------------------------

/// An RSA public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RsaPublicKey {
    modulus: BigUint,
    exponent: BigUint,
}

impl RsaPublicKey {
    /// Creates a key from the big-endian octets of modulus and exponent.
    pub fn from_octets(modulus: &[u8], exponent: &[u8]) -> Self {
        RsaPublicKey {
            modulus: BigUint::from_bytes_be(modulus),
            exponent: BigUint::from_bytes_be(exponent),
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    /// Returns the length of the modulus in octets.
    pub fn modulus_len(&self) -> usize {
        ((self.modulus.bits() + 7) / 8) as usize
    }

    /// Applies the public key to some data.
    ///
    /// The result is the minimal big-endian representation of the
    /// resulting number, so it may be shorter than the modulus if it has
    /// leading zeros. A key with a zero modulus recovers nothing.
    pub fn recover(&self, data: &[u8]) -> Vec<u8> {
        if self.modulus.bits() == 0 {
            return Vec::new()
        }
        BigUint::from_bytes_be(data).modpow(
            &self.exponent, &self.modulus
        ).to_bytes_be()
    }
}


//------------ EncryptedCertificate ------------------------------------------

/// A certificate as it appears in a data file.
#[derive(Clone, Debug)]
pub struct EncryptedCertificate {
    signature: Bytes,
    remainder: Bytes,
    authority: CaReference,
}

impl EncryptedCertificate {
    /// The length of the encrypted part.
    pub const SIGNATURE_LEN: usize = 128;

    /// The length of the part in the clear.
    pub const REMAINDER_LEN: usize = 58;

    /// The length of the encoded certificate.
    pub const LEN: usize =
        Self::SIGNATURE_LEN + Self::REMAINDER_LEN + CaReference::LEN;

    /// Splits up an encoded certificate.
    pub fn from_octets(octets: &[u8]) -> Result<Self, SignatureError> {
        if octets.len() != Self::LEN {
            return Err(SignatureError::MalformedCertificateMessage)
        }
        let (signature, rest) = octets.split_at(Self::SIGNATURE_LEN);
        let (remainder, authority) = rest.split_at(Self::REMAINDER_LEN);
        Ok(EncryptedCertificate {
            signature: Bytes::copy_from_slice(signature),
            remainder: Bytes::copy_from_slice(remainder),
            authority: CaReference::from_slice(authority).ok_or(
                SignatureError::MalformedCertificateMessage
            )?,
        })
    }

    /// Takes the certificate from its decoded value.
    pub fn from_value(value: &Value) -> Result<Self, SignatureError> {
        let signature = value.child("Signature").and_then(
            Value::to_bytes
        ).ok_or(SignatureError::MalformedCertificateField("Signature"))?;
        let remainder = value.child("PublicKeyRemainder").and_then(
            Value::to_bytes
        ).ok_or(
            SignatureError::MalformedCertificateField("PublicKeyRemainder")
        )?;
        let authority = value.child(
            "CertificationAuthorityReference"
        ).ok_or(SignatureError::MalformedCertificateField(
            "CertificationAuthorityReference"
        ))?;
        Ok(EncryptedCertificate {
            signature: signature.clone(),
            remainder: remainder.clone(),
            authority: CaReference::from_value(authority)?,
        })
    }

    /// Returns the reference to the key that issued the certificate.
    pub fn authority(&self) -> &CaReference {
        &self.authority
    }

    /// Recovers the certificate using the issuer’s key.
    pub fn recover(
        &self, key: &RsaPublicKey
    ) -> Result<Certificate, SignatureError> {
        let message = key.recover(&self.signature);
        if message.len() != 128
            || message[0] != 0x6A || message[127] != 0xBC
        {
            return Err(SignatureError::MalformedCertificateMessage)
        }
        let mut content = Vec::with_capacity(Certificate::LEN);
        content.extend_from_slice(&message[1..107]);
        content.extend_from_slice(&self.remainder);
        if Sha1::digest(&content).as_slice() != &message[107..127] {
            return Err(SignatureError::DigestMismatch)
        }
        Certificate::from_octets(&content)
    }
}


//------------ Certificate ---------------------------------------------------

/// A recovered certificate.
#[derive(Clone, Debug)]
pub struct Certificate {
    pub profile: u8,
    pub authority: CaReference,
    pub holder_authorisation: [u8; 7],

    /// The end of validity or `None` if the certificate doesn’t expire.
    pub expiry: Option<DateTime<Utc>>,
    pub holder_reference: [u8; 8],
    pub key: RsaPublicKey,
}

impl Certificate {
    /// The length of the certificate content.
    pub const LEN: usize = 164;

    /// The only supported profile.
    pub const PROFILE: u8 = 1;

    pub fn from_octets(octets: &[u8]) -> Result<Self, SignatureError> {
        if octets.len() != Self::LEN {
            return Err(SignatureError::MalformedCertificateMessage)
        }
        let expiry = u32::from_be_bytes([
            octets[16], octets[17], octets[18], octets[19]
        ]);
        let expiry = if expiry == u32::MAX {
            None
        }
        else {
            Some(
                DateTime::from_timestamp(i64::from(expiry), 0).ok_or(
                    SignatureError::MalformedCertificateMessage
                )?
            )
        };
        let mut holder_authorisation = [0; 7];
        holder_authorisation.copy_from_slice(&octets[9..16]);
        let mut holder_reference = [0; 8];
        holder_reference.copy_from_slice(&octets[20..28]);
        Ok(Certificate {
            profile: octets[0],
            authority: CaReference::from_slice(&octets[1..9]).ok_or(
                SignatureError::MalformedCertificateMessage
            )?,
            holder_authorisation,
            expiry,
            holder_reference,
            key: RsaPublicKey::from_octets(
                &octets[28..156], &octets[156..164]
            ),
        })
    }

    /// Checks the profile and the validity period.
    ///
    /// The certificate must not have expired before `observed`, the newest
    /// plausible time seen in the data. Without such a time, expiry can’t
    /// be checked and is let through with a warning.
    pub fn check(
        &self, observed: Option<DateTime<Utc>>
    ) -> Result<(), SignatureError> {
        if self.profile != Self::PROFILE {
            return Err(SignatureError::InvalidCertificate {
                profile: self.profile
            })
        }
        if let Some(expiry) = self.expiry {
            match observed {
                Some(observed) if expiry < observed => {
                    return Err(SignatureError::ExpiredCertificate {
                        expiry, observed
                    })
                }
                Some(_) => { }
                None => {
                    tracing::warn!(
                        "no time observed in data, cannot check expiry \
                         of certificate {}",
                        hex::encode_upper(self.holder_reference)
                    );
                }
            }
        }
        Ok(())
    }
}


//============ Tests =========================================================
