//! The schema tree.
//!
//! A [`Schema`] describes the structure of a data file as a tree of
//! [`SchemaNode`]s. Each node has a name, which becomes the label of the
//! decoded value, and a [`NodeKind`] that determines how it is decoded.
//!
//! Schemas are immutable once built and can be shared by any number of
//! decoders. Loading a schema from some external description is not the
//! business of this crate; the two schemas needed for driver cards and
//! vehicle units are built in code by [`driver_card`] and
//! [`vehicle_unit`].

pub use self::driver_card::driver_card;
pub use self::vehicle_unit::vehicle_unit;

use std::{fmt, str};
use std::sync::Arc;

mod driver_card;
mod vehicle_unit;


//------------ Schema --------------------------------------------------------

/// The schema of a whole data file.
///
/// A data file is a sequence of regions, each of them introduced by a
/// two octet magic value. The schema contains the identified nodes that
/// can decode these regions.
#[derive(Clone, Debug)]
pub struct Schema {
    name: Arc<str>,
    regions: Vec<SchemaNode>,
}

impl Schema {
    /// Creates a new schema from its top-level regions.
    ///
    /// Regions that aren’t identified objects or elementary files will
    /// never match anything.
    pub fn new(name: impl Into<Arc<str>>, regions: Vec<SchemaNode>) -> Self {
        Schema { name: name.into(), regions }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn regions(&self) -> &[SchemaNode] {
        &self.regions
    }

    /// Returns the first top-level region that matches the magic.
    pub fn find_region(&self, magic: Magic) -> Option<&SchemaNode> {
        self.regions.iter().find(|node| node.matches(magic))
    }
}


//------------ SchemaNode ----------------------------------------------------

/// A node of the schema tree.
#[derive(Clone, Debug)]
pub struct SchemaNode {
    /// The name of the node and label of its decoded value.
    name: Arc<str>,

    /// What the node is and how to decode it.
    kind: NodeKind,

    /// The minimum level of messages to log for this node.
    log_level: LogLevel,

    /// Whether the value is published under the node’s name.
    global: bool,
}

impl SchemaNode {
    pub fn new(name: impl Into<Arc<str>>, kind: NodeKind) -> Self {
        SchemaNode {
            name: name.into(),
            kind,
            log_level: LogLevel::default(),
            global: false,
        }
    }

    /// Marks the node as global.
    ///
    /// The string representation of a global node’s value can be referred
    /// to by later [`Count::Ref`]s.
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    /// Sets the log level of the node.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    /// Returns whether messages of the given level should be logged.
    pub fn logs(&self, level: LogLevel) -> bool {
        level >= self.log_level
    }

    /// Returns the identifier of an identified node.
    pub fn identifier(&self) -> Option<Identifier> {
        match self.kind {
            NodeKind::IdentifiedObject { identifier, .. } => Some(identifier),
            NodeKind::ElementaryFile { identifier, .. } => Some(identifier),
            _ => None
        }
    }

    /// Returns whether this node decodes the region with the given magic.
    ///
    /// Only identified objects and elementary files match. If their
    /// identifier is empty, they match everything.
    pub fn matches(&self, magic: Magic) -> bool {
        match self.identifier() {
            Some(Identifier::Any) => true,
            Some(Identifier::Magic(value)) => value == magic,
            None => false,
        }
    }

    /// Returns the child nodes.
    ///
    /// Leaf kinds have none.
    pub fn children(&self) -> &[SchemaNode] {
        match self.kind {
            NodeKind::Container { ref children }
            | NodeKind::IdentifiedObject { ref children, .. }
            | NodeKind::ElementaryFile { ref children, .. }
            | NodeKind::Collection { ref children, .. }
            | NodeKind::Repeat { ref children, .. }
            | NodeKind::CyclicActivity { ref children } => children,
            _ => &[]
        }
    }
}

/// # Convenience Constructors
///
impl SchemaNode {
    pub fn padding(name: impl Into<Arc<str>>, size: usize) -> Self {
        Self::new(name, NodeKind::Padding { size })
    }

    pub fn object(
        name: impl Into<Arc<str>>, children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::Container { children })
    }

    pub fn identified(
        name: impl Into<Arc<str>>,
        identifier: impl Into<Identifier>,
        children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::IdentifiedObject {
            identifier: identifier.into(), children
        })
    }

    /// Creates an elementary file that is followed by its signature.
    pub fn elementary_file(
        name: impl Into<Arc<str>>,
        identifier: impl Into<Identifier>,
        children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::ElementaryFile {
            identifier: identifier.into(), unsigned: false, children
        })
    }

    /// Creates an elementary file that doesn’t have a signature.
    pub fn unsigned_file(
        name: impl Into<Arc<str>>,
        identifier: impl Into<Identifier>,
        children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::ElementaryFile {
            identifier: identifier.into(), unsigned: true, children
        })
    }

    pub fn collection(
        name: impl Into<Arc<str>>,
        size_allocation: SizeAllocation,
        children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::Collection { size_allocation, children })
    }

    pub fn repeat(
        name: impl Into<Arc<str>>,
        count: impl Into<Count>,
        children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::Repeat { count: count.into(), children })
    }

    pub fn cyclic_activity(
        name: impl Into<Arc<str>>, children: Vec<SchemaNode>
    ) -> Self {
        Self::new(name, NodeKind::CyclicActivity { children })
    }

    pub fn daily_activity(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::DailyActivity)
    }

    pub fn activity_change(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::ActivityChange)
    }

    pub fn bcd_string(name: impl Into<Arc<str>>, size: usize) -> Self {
        Self::new(name, NodeKind::BcdString { size })
    }

    pub fn country(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::Country)
    }

    pub fn flag(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::Flag)
    }

    pub fn uint8(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::UInt8)
    }

    pub fn uint16(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::UInt16)
    }

    pub fn uint24(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::UInt24)
    }

    pub fn time_real(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::TimeReal)
    }

    pub fn datef(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::Datef)
    }

    pub fn simple_string(name: impl Into<Arc<str>>, length: usize) -> Self {
        Self::new(name, NodeKind::SimpleString { length })
    }

    pub fn code_page_string(
        name: impl Into<Arc<str>>, length: usize
    ) -> Self {
        Self::new(name, NodeKind::CodePageString { length })
    }

    pub fn name_string(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::Name)
    }

    pub fn hex_value(name: impl Into<Arc<str>>, length: usize) -> Self {
        Self::new(name, NodeKind::HexValue { length })
    }

    pub fn extended_serial_number(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::ExtendedSerialNumber)
    }

    pub fn card_number(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::CardNumber)
    }

    pub fn full_card_number(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, NodeKind::FullCardNumber)
    }

    pub fn signature(name: impl Into<Arc<str>>, length: usize) -> Self {
        Self::new(name, NodeKind::Signature { length })
    }

    /// A Gen1 certificate: signature, public key remainder, CA reference.
    pub fn certificate(name: impl Into<Arc<str>>) -> Self {
        Self::object(name, Self::certificate_fields())
    }

    /// The fields of a Gen1 certificate.
    pub fn certificate_fields() -> Vec<Self> {
        vec![
            Self::hex_value("Signature", 128),
            Self::hex_value("PublicKeyRemainder", 58),
            Self::object("CertificationAuthorityReference", vec![
                Self::country("Nation"),
                Self::hex_value("NationCode", 3),
                Self::uint8("SerialNumber"),
                Self::uint16("AdditionalInfo"),
                Self::uint8("CaIdentifier"),
            ]),
        ]
    }

    /// A vehicle’s registering nation and registration number.
    pub fn vehicle_registration(name: impl Into<Arc<str>>) -> Self {
        Self::object(name, vec![
            Self::country("VehicleRegistrationNation"),
            Self::code_page_string("VehicleRegistrationNumber", 13),
        ])
    }
}


//------------ NodeKind ------------------------------------------------------

/// The kinds of schema nodes.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Octets to skip.
    Padding { size: usize },

    /// A sequence of nodes.
    Container { children: Vec<SchemaNode> },

    /// A top-level region selected by its magic.
    ///
    /// Records the range of octets covered by its children as the data
    /// protected by a following signature.
    IdentifiedObject {
        identifier: Identifier,
        children: Vec<SchemaNode>,
    },

    /// A top-level region with a type octet and a length.
    ///
    /// If the type is 1, the region is the signature of the preceding
    /// elementary file of the same name.
    ElementaryFile {
        identifier: Identifier,
        unsigned: bool,
        children: Vec<SchemaNode>,
    },

    /// The children repeated as often as a count prefix says.
    Collection {
        size_allocation: SizeAllocation,
        children: Vec<SchemaNode>,
    },

    /// The children repeated a given or referenced number of times.
    Repeat {
        count: Count,
        children: Vec<SchemaNode>,
    },

    /// Records stored in a cyclic buffer behind two pointers.
    CyclicActivity { children: Vec<SchemaNode> },

    /// A driver card’s daily activity record.
    DailyActivity,

    /// A packed activity change.
    ActivityChange,

    /// An unsigned integer in up to four octets of packed BCD.
    BcdString { size: usize },

    /// A nation code.
    Country,

    /// A boolean octet.
    Flag,

    /// Big-endian unsigned integers.
    UInt8,
    UInt16,
    UInt24,

    /// Seconds since the Unix epoch.
    TimeReal,

    /// A date as BCD year, month, and day.
    Datef,

    /// An ASCII string of fixed length.
    SimpleString { length: usize },

    /// A string of fixed length prefixed by its code page.
    CodePageString { length: usize },

    /// A code page string of 35 characters.
    Name,

    /// Raw octets shown as hex.
    HexValue { length: usize },

    /// An extended serial number.
    ExtendedSerialNumber,

    /// A card number.
    CardNumber,

    /// A card number with equipment type and issuing nation.
    FullCardNumber,

    /// A signature over the data since the last signed range start.
    Signature { length: usize },
}


//------------ Identifier ----------------------------------------------------

/// The identifier of an identified node.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Identifier {
    /// Matches any magic.
    ///
    /// This is only really useful during development.
    Any,

    /// Matches exactly this magic.
    Magic(Magic),
}

impl From<Magic> for Identifier {
    fn from(magic: Magic) -> Self {
        Identifier::Magic(magic)
    }
}

impl From<u16> for Identifier {
    fn from(magic: u16) -> Self {
        Identifier::Magic(Magic(magic))
    }
}

impl str::FromStr for Identifier {
    type Err = ParseMagicError;

    /// Parses an identifier.
    ///
    /// The empty string is [`Identifier::Any`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Ok(Identifier::Any)
        }
        else {
            s.parse().map(Identifier::Magic)
        }
    }
}


//------------ Magic ---------------------------------------------------------

/// The two octets introducing a top-level region.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Magic(pub u16);

impl Magic {
    pub fn from_octets(octets: [u8; 2]) -> Self {
        Magic(u16::from_be_bytes(octets))
    }
}

impl str::FromStr for Magic {
    type Err = ParseMagicError;

    /// Parses a magic from its `0x` prefixed hex form, e.g., `0x0501`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(ParseMagicError)?;
        if hex.len() != 4 {
            return Err(ParseMagicError)
        }
        u16::from_str_radix(hex, 16).map(Magic).map_err(|_| ParseMagicError)
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}


//------------ ParseMagicError -----------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid magic")]
pub struct ParseMagicError;


//------------ SizeAllocation ------------------------------------------------

/// The size of the count prefix of a collection.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SizeAllocation {
    #[default]
    Byte,
    Word,
}


//------------ Count ---------------------------------------------------------

/// The number of repetitions of a repeat node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Count {
    /// A fixed number.
    Fixed(u32),

    /// The value published by an earlier global node of this name.
    Ref(Arc<str>),
}

impl From<u32> for Count {
    fn from(count: u32) -> Self {
        Count::Fixed(count)
    }
}

impl<'a> From<&'a str> for Count {
    /// Creates a reference.
    ///
    /// A leading `$` is dropped.
    fn from(name: &'a str) -> Self {
        Count::Ref(name.strip_prefix('$').unwrap_or(name).into())
    }
}


//------------ LogLevel ------------------------------------------------------

/// The verbosity of a node.
///
/// Messages about a node are logged if their level is at or above the
/// node’s level.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LogLevel {
    None,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns whether this level asks for verbose output.
    pub fn is_verbose(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Info)
    }
}


//============ Tests =========================================================
