//! Decoding data files.
//!
//! A data file is decoded by a [`Decoder`] according to a [`Schema`]. The
//! decoder reads the file region by region. It looks up the node of each
//! region by the region’s magic and walks down the node’s tree, taking the
//! values of all leaves from the file. The result is a [`DecodedFile`]
//! holding one [`Value`] for every region that was recognized.
//!
//! While decoding, the decoder keeps track of what the signatures in the
//! file protect and hands them to the signature validator if that has
//! been enabled in the [`Config`].
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use tachograph::{schema, Config, Decoder};
//!
//! let schema = schema::driver_card();
//! let decoder = Decoder::new(&schema, Config::new().strict(true));
//! let file = decoder.decode(File::open("card.ddd")?)?;
//! for region in file.regions() {
//!     println!("{}", region.label());
//! }
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

use std::io::{Read, Seek};
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crate::cyclic::CyclicSource;
use crate::error::{DecodeError, SignatureError};
use crate::mode::{Config, Mode};
use crate::schema::{
    Count, LogLevel, Magic, NodeKind, Schema, SchemaNode, SizeAllocation,
};
use crate::sign::CertificateRole;
use crate::source::{Cursor, Source};
use crate::value::{Scalar, Value};
use self::session::Session;

mod leaf;
mod session;

#[cfg(test)]
mod test;


//------------ node_event! ---------------------------------------------------

/// Logs an event about a node if the node’s log level allows it.
macro_rules! node_event {
    (@emit Debug, $($arg:tt)+) => { tracing::debug!($($arg)+) };
    (@emit Info, $($arg:tt)+) => { tracing::info!($($arg)+) };
    (@emit Warn, $($arg:tt)+) => { tracing::warn!($($arg)+) };
    (@emit Error, $($arg:tt)+) => { tracing::error!($($arg)+) };
    ($node:expr, $level:ident, $($arg:tt)+) => {
        if $node.logs(LogLevel::$level) {
            node_event!(@emit $level, region = $node.name(), $($arg)+)
        }
    };
}


//------------ Decoder -------------------------------------------------------

/// Decodes data files with a schema.
///
/// A decoder can be used for any number of files. Each file starts from a
/// clean slate.
#[derive(Clone, Debug)]
pub struct Decoder<'s> {
    schema: &'s Schema,
    config: Config,
}

impl<'s> Decoder<'s> {
    pub fn new(schema: &'s Schema, config: Config) -> Self {
        Decoder { schema, config }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Decodes a data file from a reader.
    pub fn decode<R: Read + Seek>(
        &self, reader: R
    ) -> Result<DecodedFile, DecodeError> {
        self.decode_source(&mut Cursor::new(reader)?)
    }

    /// Decodes a data file held in memory.
    pub fn decode_slice(&self, data: &[u8]) -> Result<DecodedFile, DecodeError> {
        self.decode_source(&mut Cursor::from_slice(data))
    }

    /// Decodes a data file from a source.
    ///
    /// The source must be positioned at the start of the file and must be
    /// able to seek.
    pub fn decode_source(
        &self, source: &mut dyn Source
    ) -> Result<DecodedFile, DecodeError> {
        let mut session = Session::new(&self.config);
        Engine {
            mode: self.config.get_mode(),
            session: &mut session,
        }.file(self.schema, source)
    }
}


//------------ DecodedFile ---------------------------------------------------

/// The result of decoding a data file.
#[derive(Clone, Debug)]
pub struct DecodedFile {
    name: Arc<str>,
    regions: Vec<Value>,
    unmatched_regions: usize,
    consumed: u64,
    length: u64,
    latest_time: Option<DateTime<Utc>>,
}

impl DecodedFile {
    /// Returns the name of the schema the file was decoded with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the values of all recognized regions in file order.
    ///
    /// This includes the signature blocks of elementary files. They are
    /// marked as suppressed.
    pub fn regions(&self) -> &[Value] {
        &self.regions
    }

    /// Returns the number of regions with an unknown magic.
    pub fn unmatched_regions(&self) -> usize {
        self.unmatched_regions
    }

    /// Returns the number of octets that were read.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the length of the file.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Returns the newest plausible time found in the file.
    pub fn latest_observed_time(&self) -> Option<DateTime<Utc>> {
        self.latest_time
    }

    /// Returns the whole file as a single value.
    ///
    /// The value is labelled with the schema name and has the regions as
    /// its children.
    pub fn to_value(&self) -> Value {
        let mut res = Value::new(self.name.clone());
        res.extend_children(self.regions.iter().cloned());
        res
    }
}


//------------ Engine --------------------------------------------------------

/// Walks the schema over a source.
struct Engine<'a> {
    mode: Mode,
    session: &'a mut Session,
}

impl<'a> Engine<'a> {
    /// Decodes a complete file.
    fn file(
        mut self, schema: &Schema, source: &mut dyn Source
    ) -> Result<DecodedFile, DecodeError> {
        let length = source.len();
        let mut regions = Vec::new();
        let mut nodes = Vec::new();
        let mut unmatched = 0usize;

        loop {
            let pos = source.abs_pos();
            let mut magic = [0u8; 2];
            match source.read_up_to(&mut magic)? {
                0 => break,
                1 => {
                    if self.mode.is_strict() {
                        return Err(DecodeError::end_of_data(pos))
                    }
                    tracing::debug!("ignoring stray octet at {:#06X}", pos);
                    break
                }
                _ => { }
            }
            let magic = Magic::from_octets(magic);

            if let Some(node) = schema.find_region(magic) {
                tracing::debug!(
                    "region {} with magic {} at {:#06X}",
                    node.name(), magic, pos
                );
                regions.push(self.node(node, source, 0)?);
                nodes.push(node);
                continue
            }

            if self.mode.is_strict() {
                return Err(DecodeError::UnrecognizedMagic {
                    magic, pos: pos.into()
                })
            }
            if unmatched == 0 {
                tracing::warn!(
                    "unrecognized region with magic {} at {:#06X}", magic, pos
                );
            }
            else {
                tracing::debug!(
                    "unrecognized region with magic {} at {:#06X}", magic, pos
                );
            }
            unmatched += 1;
            if !self.skip_unmatched(source)? {
                break
            }
        }

        if unmatched > 0 {
            tracing::warn!(
                "there were {} unmatched regions in the file", unmatched
            );
        }
        if self.session.validates() {
            check_signatures_present(&nodes, &regions)?;
        }
        self.session.finish()?;

        Ok(DecodedFile {
            name: schema.name().into(),
            regions,
            unmatched_regions: unmatched,
            consumed: source.pos(),
            length,
            latest_time: self.session.latest_time(),
        })
    }

    /// Skips over a region with an unknown magic.
    ///
    /// Assumes the region has the type and length of an elementary file.
    /// Returns whether decoding can continue.
    fn skip_unmatched(
        &mut self, source: &mut dyn Source
    ) -> Result<bool, DecodeError> {
        let mut kind = [0u8];
        if source.read_up_to(&mut kind)? == 0 {
            return Ok(false)
        }
        let mut len = [0u8; 2];
        if source.read_up_to(&mut len)? != 2 {
            return Ok(false)
        }
        let len = u64::from(u16::from_be_bytes(len));
        tracing::debug!(
            "skipping {} octets of type {} at {:#06X}",
            len, kind[0], source.abs_pos()
        );
        source.skip(len.min(source.remaining()))?;
        Ok(true)
    }

    /// Decodes a single node.
    ///
    /// `region_len` is the length of the innermost region that declared
    /// one. Cyclic activity nodes need it.
    fn node(
        &mut self,
        node: &SchemaNode,
        source: &mut dyn Source,
        region_len: u64,
    ) -> Result<Value, DecodeError> {
        let start = source.abs_pos();
        let value = match *node.kind() {
            NodeKind::Padding { size } => leaf::padding(node, size, source)?,
            NodeKind::Container { ref children } => {
                self.container(node, children, source, region_len)?
            }
            NodeKind::IdentifiedObject { ref children, .. } => {
                self.identified(node, children, source, region_len)?
            }
            NodeKind::ElementaryFile { ref children, .. } => {
                self.elementary_file(node, children, source)?
            }
            NodeKind::Collection { size_allocation, ref children } => {
                let count = match size_allocation {
                    SizeAllocation::Byte => u32::from(source.take_u8()?),
                    SizeAllocation::Word => u32::from(source.take_u16()?),
                };
                self.repeated(node, children, count, source, region_len)?
            }
            NodeKind::Repeat { ref count, ref children } => {
                let count = self.resolve_count(node, count, source)?;
                self.repeated(node, children, count, source, region_len)?
            }
            NodeKind::CyclicActivity { ref children } => {
                self.cyclic(node, children, source, region_len)?
            }
            NodeKind::DailyActivity => self.daily_activity(node, source)?,
            NodeKind::ActivityChange => {
                leaf::activity_change(
                    node.name_arc(), node.log_level().is_verbose(), source
                )?
            }
            NodeKind::BcdString { size } => {
                leaf::bcd_string(node, size, source)?
            }
            NodeKind::Country => leaf::country(node, source)?,
            NodeKind::Flag => leaf::flag(node, source)?,
            NodeKind::UInt8 => leaf::uint8(node, source)?,
            NodeKind::UInt16 => leaf::uint16(node, source)?,
            NodeKind::UInt24 => leaf::uint24(node, source)?,
            NodeKind::TimeReal => {
                let (value, time) = leaf::time_real(node, source)?;
                self.session.observe_time(time);
                value
            }
            NodeKind::Datef => leaf::datef(node, source)?,
            NodeKind::SimpleString { length } => {
                leaf::simple_string(node, length, source)?
            }
            NodeKind::CodePageString { length } => {
                leaf::code_page_string(node, length, source)?
            }
            NodeKind::Name => {
                leaf::code_page_string(node, leaf::NAME_LEN, source)?
            }
            NodeKind::HexValue { length } => {
                leaf::hex_value(node, length, source)?
            }
            NodeKind::ExtendedSerialNumber => {
                leaf::extended_serial_number(node, source)?
            }
            NodeKind::CardNumber => leaf::card_number(node, source)?,
            NodeKind::FullCardNumber => {
                leaf::full_card_number(node, source)?
            }
            NodeKind::Signature { length } => {
                self.signature(node, length, source)?
            }
        };
        node_event!(
            node, Debug, "{:#06X}..{:#06X}: {}",
            start, source.abs_pos(), value
        );
        if node.is_global() {
            self.session.publish(node.name_arc().clone(), value.to_string());
        }
        Ok(value)
    }

    /// Decodes a sequence of nodes into the children of `value`.
    fn children(
        &mut self,
        value: &mut Value,
        children: &[SchemaNode],
        source: &mut dyn Source,
        region_len: u64,
    ) -> Result<(), DecodeError> {
        for child in children {
            value.push_child(self.node(child, source, region_len)?);
        }
        Ok(())
    }

    /// Decodes a container.
    ///
    /// A container that is a certificate is registered with the validator.
    /// If it is the certificate of the signer, the signed data starts right
    /// after it.
    fn container(
        &mut self,
        node: &SchemaNode,
        children: &[SchemaNode],
        source: &mut dyn Source,
        region_len: u64,
    ) -> Result<Value, DecodeError> {
        let mut res = Value::new(node.name_arc().clone());
        self.children(&mut res, children, source, region_len)?;
        if let Some(role) = CertificateRole::from_name(node.name()) {
            self.session.register_certificate(role, &res)?;
            if role == CertificateRole::Subject {
                self.session.set_signed_start(source.abs_pos());
            }
        }
        Ok(res)
    }

    /// Decodes an identified object.
    ///
    /// The content of the object is what a signature inside or after it
    /// protects.
    fn identified(
        &mut self,
        node: &SchemaNode,
        children: &[SchemaNode],
        source: &mut dyn Source,
        region_len: u64,
    ) -> Result<Value, DecodeError> {
        self.session.set_signed_start(source.abs_pos());
        let mut res = Value::new(node.name_arc().clone());
        self.children(&mut res, children, source, region_len)?;
        self.session.set_signed_end(source.abs_pos());
        Ok(res)
    }

    /// Decodes an elementary file.
    ///
    /// An elementary file starts with a type octet and a two octet length.
    /// Type 1 means the content is the signature of the file before.
    fn elementary_file(
        &mut self,
        node: &SchemaNode,
        children: &[SchemaNode],
        source: &mut dyn Source,
    ) -> Result<Value, DecodeError> {
        let kind = source.take_u8()?;
        let len = u64::from(source.take_u16()?);
        let start = source.abs_pos();
        let mut res = Value::new(node.name_arc().clone());

        if kind == 1 {
            let signature = source.take_bytes(len as usize)?;
            let data = self.signed_data(source)?;
            self.session.validate(data, signature.clone())?;
            res.set_scalar(Scalar::Bytes(signature));
            res.suppress();
            return Ok(res)
        }

        self.session.set_signed_start(start);
        self.children(&mut res, children, source, len)?;
        self.session.set_signed_end(source.abs_pos());
        if let Some(role) = CertificateRole::from_name(node.name()) {
            self.session.register_certificate(role, &res)?;
        }

        let consumed = source.abs_pos() - start;
        if consumed > len {
            if self.mode.is_strict() {
                return Err(DecodeError::malformed(
                    start,
                    format!(
                        "content of {} octets exceeds length {}",
                        consumed, len
                    )
                ))
            }
            node_event!(
                node, Warn, "read {} octets past the end of the region",
                consumed - len
            );
        }
        else if consumed < len {
            let left = len - consumed;
            if self.mode.is_strict() {
                return Err(DecodeError::malformed(
                    start, format!("{} octets left over in region", left)
                ))
            }
            node_event!(node, Warn, "skipping {} octets left over", left);
            source.skip(left.min(source.remaining()))?;
        }
        Ok(res)
    }

    /// Decodes the children of a node `count` times.
    ///
    /// If the data ends during one of the repetitions, the values decoded
    /// so far are kept and decoding continues after the node.
    fn repeated(
        &mut self,
        node: &SchemaNode,
        children: &[SchemaNode],
        count: u32,
        source: &mut dyn Source,
        region_len: u64,
    ) -> Result<Value, DecodeError> {
        node_event!(
            node, Debug, "{} repetitions at {:#06X}", count, source.abs_pos()
        );
        let mut res = Value::new(node.name_arc().clone());
        for i in 0..count {
            match self.children(&mut res, children, source, region_len) {
                Ok(()) => { }
                Err(err) if err.is_end_of_data() => {
                    node_event!(
                        node, Error, "truncated after {} of {} repetitions: {}",
                        i, count, err
                    );
                    break
                }
                Err(err) => return Err(err)
            }
        }
        Ok(res)
    }

    /// Determines the number of repetitions of a repeat node.
    fn resolve_count(
        &self, node: &SchemaNode, count: &Count, source: &dyn Source
    ) -> Result<u32, DecodeError> {
        let name = match *count {
            Count::Fixed(count) => return Ok(count),
            Count::Ref(ref name) => name,
        };
        match self.session.global(name) {
            Some(value) => value.parse().map_err(|_| {
                DecodeError::malformed(
                    source.abs_pos(),
                    format!("count {} is not a number: '{}'", name, value)
                )
            }),
            None => {
                node_event!(node, Warn, "count reference {} not found", name);
                Ok(0)
            }
        }
    }

    /// Decodes the records of a cyclic buffer.
    ///
    /// The region starts with the offsets of the oldest and newest record
    /// in the buffer that makes up the rest of the region. The records are
    /// decoded from oldest to newest, possibly wrapping around the end of
    /// the buffer once. Afterwards, the source is positioned at the end of
    /// the region.
    fn cyclic(
        &mut self,
        node: &SchemaNode,
        children: &[SchemaNode],
        source: &mut dyn Source,
        region_len: u64,
    ) -> Result<Value, DecodeError> {
        let mut res = Value::new(node.name_arc().clone());
        if region_len <= 4 {
            node_event!(node, Warn, "cyclic buffer is empty");
            return Ok(res)
        }
        let oldest = u64::from(source.take_u16()?);
        let newest = u64::from(source.take_u16()?);
        let len = region_len - 4;
        let start = source.pos();

        if start + len > source.len() {
            if self.mode.is_strict() {
                return Err(DecodeError::out_of_bounds(
                    source.abs_pos(),
                    format!(
                        "cyclic buffer of {} octets exceeds the data", len
                    )
                ))
            }
            node_event!(
                node, Warn,
                "cyclic buffer at {:#06X} of {} octets exceeds data of {}",
                source.abs_pos(), len, source.len()
            );
            return Ok(res)
        }
        node_event!(
            node, Debug, "oldest {:#06X} (offset {:#06X}), newest {:#06X} \
                          (offset {:#06X})",
            source.abs_pos() + oldest, oldest,
            source.abs_pos() + newest, newest
        );
        if oldest == 0 && newest == 0 {
            source.seek(start + len)?;
            return Ok(res)
        }
        if oldest >= len || newest >= len {
            return Err(DecodeError::out_of_bounds(
                source.abs_pos(),
                format!(
                    "record pointers {} and {} outside of buffer of {}",
                    oldest, newest, len
                )
            ))
        }

        let wrapped = {
            let mut buffer = CyclicSource::new(
                &mut *source, start, len, oldest
            )?;
            loop {
                let before = (buffer.pos(), buffer.wrapped());
                let last = before.0 % len == newest;
                self.children(&mut res, children, &mut buffer, region_len)?;
                if (buffer.pos(), buffer.wrapped()) == before {
                    return Err(DecodeError::malformed(
                        buffer.abs_pos(), "cyclic record without content"
                    ))
                }
                if last {
                    break
                }
            }
            buffer.wrapped()
        };
        source.seek(start + len)?;
        res.push_child(Value::with_scalar(
            "DataBufferIsWrapped".into(), Scalar::Bool(wrapped)
        ));
        Ok(res)
    }

    /// Decodes a driver card’s record of a day’s activities.
    fn daily_activity(
        &mut self, node: &SchemaNode, source: &mut dyn Source
    ) -> Result<Value, DecodeError> {
        let pos = source.abs_pos();
        let _previous_len = source.take_u16()?;
        let current_len = source.take_u16()?;
        let time = source.take_timestamp()?;
        self.session.observe_time(time);
        let presence = source.take_bcd(2)?;
        let distance = source.take_u16()?;
        if current_len < 12 {
            return Err(DecodeError::malformed(
                pos,
                format!("daily activity record length {}", current_len)
            ))
        }
        let count = (current_len - 12) / 2;
        node_event!(node, Debug, "reading {} activity changes", count);

        let mut res = Value::new(node.name_arc().clone());
        res.push_attribute("DateTime", leaf::format_time(time));
        res.push_attribute("DailyPresenceCounter", presence.to_string());
        res.push_attribute("Distance", distance.to_string());
        let label: Arc<str> = "ActivityChangeInfo".into();
        let verbose = node.log_level().is_verbose();
        for _ in 0..count {
            res.push_child(leaf::activity_change(&label, verbose, source)?);
        }
        Ok(res)
    }

    /// Decodes a signature inside an identified object.
    ///
    /// The signature protects everything from the start of the signed
    /// range up to the signature itself.
    fn signature(
        &mut self,
        node: &SchemaNode,
        length: usize,
        source: &mut dyn Source,
    ) -> Result<Value, DecodeError> {
        self.session.set_signed_end(source.abs_pos());
        let signature = source.take_bytes(length)?;
        let data = self.signed_data(source)?;
        self.session.validate(data, signature.clone())?;
        Ok(leaf::hex_octets(node, signature))
    }

    /// Reads the data of the current signed range.
    ///
    /// Leaves the source where it was. If signatures aren’t validated,
    /// nothing is read.
    fn signed_data(
        &self, source: &mut dyn Source
    ) -> Result<Bytes, DecodeError> {
        if !self.session.validates() {
            return Ok(Bytes::new())
        }
        let (start, end) = self.session.signed_range();
        let here = source.pos();
        source.seek(start)?;
        let data = source.take_bytes(end.saturating_sub(start) as usize);
        source.seek(here)?;
        data
    }
}


//------------ Helper Functions ----------------------------------------------

/// Checks that every signed elementary file is followed by its signature.
fn check_signatures_present(
    nodes: &[&SchemaNode], regions: &[Value]
) -> Result<(), SignatureError> {
    let mut items = nodes.iter().zip(regions).peekable();
    while let Some((node, value)) = items.next() {
        let unsigned = match *node.kind() {
            NodeKind::ElementaryFile { unsigned, .. } => unsigned,
            _ => continue
        };
        if unsigned {
            continue
        }
        if let Some((next, next_value)) = items.peek() {
            if next.name() == node.name() && next_value.is_suppressed() {
                items.next();
                continue
            }
        }
        return Err(SignatureError::MissingSignature(value.label().into()))
    }
    Ok(())
}
