//! Enumerated values used by tachograph data.
//!
//! This module contains the nation table, the code pages used by
//! international strings, and the equipment types of full card numbers.

use std::borrow::Cow;
use std::fmt;
use encoding_rs::Encoding;


//------------ Nations -------------------------------------------------------

/// The names of the nations by their numeric code.
const NATIONS: [&str; 52] = [
    "No information available",
    "Austria", "Albania", "Andorra", "Armenia", "Azerbaijan", "Belgium",
    "Bulgaria", "Bosnia and Herzegovina", "Belarus", "Switzerland",
    "Cyprus", "Czech Republic", "Germany", "Denmark", "Spain", "Estonia",
    "France", "Finland", "Liechtenstein", "Faeroe Islands",
    "United Kingdom", "Georgia", "Greece", "Hungary", "Croatia", "Italy",
    "Ireland", "Iceland", "Kazakhstan", "Luxembourg", "Lithuania",
    "Latvia", "Malta", "Monaco", "Republic of Moldova", "Macedonia",
    "Norway", "Netherlands", "Portugal", "Poland", "Romania",
    "San Marino", "Russian Federation", "Sweden", "Slovakia", "Slovenia",
    "Turkmenistan", "Turkey", "Ukraine", "Vatican City", "Yugoslavia",
];

/// Returns the name of a nation given its numeric code.
pub fn nation_name(code: u8) -> &'static str {
    match code {
        0xFD => "European Community",
        0xFE => "Europe",
        0xFF => "World",
        code => NATIONS.get(usize::from(code)).copied().unwrap_or("UNKNOWN")
    }
}


//------------ Charset -------------------------------------------------------

/// A character set used by code page strings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Charset {
    Ascii,
    Latin1,
    Encoded(&'static Encoding),
}

impl Charset {
    /// Returns the character set for a code page octet.
    ///
    /// Returns `None` if the code page is unknown.
    pub fn from_code_page(code_page: u8) -> Option<Self> {
        let encoding = match code_page {
            0 => return Some(Charset::Ascii),
            1 => return Some(Charset::Latin1),
            2 => encoding_rs::ISO_8859_2,
            3 => encoding_rs::ISO_8859_3,
            5 => encoding_rs::ISO_8859_5,
            7 => encoding_rs::ISO_8859_7,
            // ISO 8859-9 is a subset of windows-1254.
            9 => encoding_rs::WINDOWS_1254,
            13 => encoding_rs::ISO_8859_13,
            15 => encoding_rs::ISO_8859_15,
            16 => encoding_rs::ISO_8859_16,
            80 => encoding_rs::KOI8_R,
            85 => encoding_rs::KOI8_U,
            _ => return None
        };
        Some(Charset::Encoded(encoding))
    }

    /// Decodes octets into a string.
    ///
    /// Octets that are not ASCII are replaced by a question mark under the
    /// ASCII charset.
    pub fn decode(self, data: &[u8]) -> Cow<str> {
        match self {
            Charset::Ascii => {
                if data.is_ascii() {
                    String::from_utf8_lossy(data)
                }
                else {
                    data.iter().map(|&ch| {
                        if ch.is_ascii() { char::from(ch) } else { '?' }
                    }).collect::<String>().into()
                }
            }
            Charset::Latin1 => encoding_rs::mem::decode_latin1(data),
            Charset::Encoded(encoding) => {
                encoding.decode_without_bom_handling(data).0
            }
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Charset::Ascii => f.write_str("ASCII"),
            Charset::Latin1 => f.write_str("ISO-8859-1"),
            Charset::Encoded(encoding) => f.write_str(encoding.name()),
        }
    }
}


//------------ EquipmentType -------------------------------------------------

/// Returns the name of the equipment type of a full card number.
pub fn equipment_type_name(code: u8) -> Cow<'static, str> {
    match code {
        1 => "DriverCard".into(),
        2 => "WorkshopCard".into(),
        3 => "ControlCard".into(),
        4 => "CompanyCard".into(),
        5 => "ManufacturingCard".into(),
        6 => "VehicleUnit".into(),
        7 => "MotionSensor".into(),
        code => code.to_string().into(),
    }
}


//============ Tests =========================================================
