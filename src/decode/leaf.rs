//! Decoding of leaf nodes.
//!
//! Each function here takes a single value of its kind from the source
//! and returns it labelled with the node’s name. None of them touch the
//! session. Where a leaf has something to tell the session, such as the
//! time of a `TimeReal`, it is returned alongside the value.

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use crate::activity::ActivityChange;
use crate::error::DecodeError;
use crate::schema::{LogLevel, SchemaNode};
use crate::source::Source;
use crate::tables::{equipment_type_name, nation_name, Charset};
use crate::value::{Scalar, Value};


/// The length of the text of a `Name`.
pub const NAME_LEN: usize = 35;

/// The length of the driver identification of a card number.
const CARD_NUMBER_LEN: usize = 14;


pub fn padding(
    node: &SchemaNode, size: usize, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    source.take_bytes(size)?;
    let mut res = Value::new(node.name_arc().clone());
    res.push_attribute("Size", size.to_string());
    Ok(res)
}

pub fn bcd_string(
    node: &SchemaNode, size: usize, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    Ok(unsigned(node, source.take_bcd(size)?))
}

pub fn country(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let code = source.take_u8()?;
    let mut res = unsigned(node, code);
    res.push_attribute("Name", nation_name(code));
    Ok(res)
}

pub fn flag(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    Ok(Value::with_scalar(
        node.name_arc().clone(), Scalar::Bool(source.take_u8()? > 0)
    ))
}

pub fn uint8(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    Ok(unsigned(node, source.take_u8()?))
}

pub fn uint16(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    Ok(unsigned(node, source.take_u16()?))
}

pub fn uint24(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    Ok(unsigned(node, source.take_u24()?))
}

/// Takes a `TimeReal`.
///
/// Returns the time separately so it can be observed by the session.
pub fn time_real(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<(Value, DateTime<Utc>), DecodeError> {
    let time = source.take_timestamp()?;
    let mut res = Value::with_scalar(
        node.name_arc().clone(), Scalar::Time(time)
    );
    res.push_attribute("DateTime", format_time(time));
    Ok((res, time))
}

/// Takes a `Datef`: BCD year in two octets, then month and day.
///
/// All zeros means the date isn’t set.
pub fn datef(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let pos = source.abs_pos();
    let year = source.take_bcd(2)?;
    let month = source.take_bcd(1)?;
    let day = source.take_bcd(1)?;
    let date = if year == 0 && month == 0 && day == 0 {
        None
    }
    else {
        Some(
            NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| {
                DecodeError::malformed(
                    pos,
                    format!("invalid date {:04}-{:02}-{:02}", year, month, day)
                )
            })?
        )
    };
    let scalar = Scalar::Date(date);
    let mut res = Value::new(node.name_arc().clone());
    if date.is_some() {
        res.push_attribute("Datef", scalar.to_string());
    }
    res.set_scalar(scalar);
    Ok(res)
}

pub fn simple_string(
    node: &SchemaNode, length: usize, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let text = source.take_fixed_string(length, Charset::Ascii)?;
    Ok(Value::with_scalar(node.name_arc().clone(), Scalar::Text(text)))
}

/// Takes a string prefixed with its code page.
///
/// An unknown code page is logged and the string read as ASCII.
pub fn code_page_string(
    node: &SchemaNode, length: usize, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let code_page = source.take_u8()?;
    let charset = match Charset::from_code_page(code_page) {
        Some(charset) => charset,
        None => {
            if node.logs(LogLevel::Warn) {
                tracing::warn!(
                    region = node.name(), "unknown code page {} at {:#06X}",
                    code_page, source.abs_pos() - 1
                );
            }
            Charset::Ascii
        }
    };
    let text = source.take_fixed_string(length, charset)?;
    Ok(Value::with_scalar(node.name_arc().clone(), Scalar::Text(text)))
}

pub fn hex_value(
    node: &SchemaNode, length: usize, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    Ok(hex_octets(node, source.take_bytes(length)?))
}

/// Creates the value of a hex node from its octets.
pub fn hex_octets(node: &SchemaNode, octets: Bytes) -> Value {
    let scalar = Scalar::Bytes(octets);
    let mut res = Value::new(node.name_arc().clone());
    res.push_attribute("Value", scalar.to_string());
    res.set_scalar(scalar);
    res
}

/// Takes an extended serial number.
///
/// That’s a four octet serial number, month and year as two octets of
/// BCD, an equipment type, and a manufacturer code.
pub fn extended_serial_number(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let serial = source.take_u32()?;
    let month_year = source.take_bcd(2)?;
    let kind = source.take_u8()?;
    let manufacturer = source.take_u8()?;
    let mut res = unsigned(node, serial);
    res.push_attribute("Month", (month_year / 100).to_string());
    res.push_attribute("Year", (month_year % 100).to_string());
    res.push_attribute("Type", kind.to_string());
    res.push_attribute("ManufacturerCode", manufacturer.to_string());
    Ok(res)
}

pub fn card_number(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let mut res = Value::new(node.name_arc().clone());
    take_card_number(&mut res, source)?;
    Ok(res)
}

/// Takes a card number preceded by equipment type and issuing nation.
pub fn full_card_number(
    node: &SchemaNode, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let kind = source.take_u8()?;
    let nation = source.take_u8()?;
    let mut res = Value::new(node.name_arc().clone());
    res.push_attribute("Type", equipment_type_name(kind));
    res.push_attribute("IssuingMemberState", nation.to_string());
    take_card_number(&mut res, source)?;
    Ok(res)
}

fn take_card_number(
    value: &mut Value, source: &mut dyn Source
) -> Result<(), DecodeError> {
    let identification = source.take_fixed_string(
        CARD_NUMBER_LEN, Charset::Ascii
    )?;
    value.push_attribute("ReplacementIndex", source.take_u8()?.to_string());
    value.push_attribute("RenewalIndex", source.take_u8()?.to_string());
    value.set_scalar(Scalar::Text(identification));
    Ok(())
}

/// Takes an activity change.
///
/// If `verbose` is set, the offset in the file right after the record is
/// included.
pub fn activity_change(
    label: &std::sync::Arc<str>, verbose: bool, source: &mut dyn Source
) -> Result<Value, DecodeError> {
    let mut octets = [0u8; 2];
    source.read_exact(&mut octets)?;
    let change = ActivityChange::from_octets(octets);
    let mut res = Value::new(label.clone());
    if verbose {
        res.push_attribute("FileOffset", format!("0x{:04X}", source.abs_pos()));
    }
    res.push_attribute("Slot", change.slot.to_string());
    res.push_attribute("Status", change.status.to_string());
    res.push_attribute("Inserted", change.inserted.to_string());
    res.push_attribute("Activity", change.activity.to_string());
    res.push_attribute("Time", change.time());
    Ok(res)
}


//------------ Helpers -------------------------------------------------------

fn unsigned(node: &SchemaNode, value: impl Into<u64>) -> Value {
    Value::with_scalar(node.name_arc().clone(), Scalar::Unsigned(value.into()))
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%SZ").to_string()
}


//============ Tests =========================================================
