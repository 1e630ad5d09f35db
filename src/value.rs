//! The decoded value tree.
//!
//! Decoding a schema node produces a [`Value`]: a label, an optional
//! [`Scalar`], a list of named attributes, and the values of any child
//! nodes. Values are created fresh for every decode and never change
//! afterwards.
//!
//! Turning the tree into some output format is left to the user. The
//! labels and attribute names follow the data dictionary of the tachograph
//! regulation, so a straightforward rendering produces a familiar document.

use std::fmt;
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use smallvec::SmallVec;


//------------ Value ---------------------------------------------------------

/// The decoded value of a schema node.
#[derive(Clone, Debug)]
pub struct Value {
    label: Arc<str>,
    scalar: Option<Scalar>,
    attributes: SmallVec<[Attribute; 4]>,
    children: Vec<Value>,
    suppressed: bool,
}

impl Value {
    /// Creates a new, empty value.
    pub fn new(label: Arc<str>) -> Self {
        Value {
            label,
            scalar: None,
            attributes: SmallVec::new(),
            children: Vec::new(),
            suppressed: false,
        }
    }

    /// Creates a value with only a scalar.
    pub fn with_scalar(label: Arc<str>, scalar: Scalar) -> Self {
        let mut res = Self::new(label);
        res.scalar = Some(scalar);
        res
    }

    pub(crate) fn set_scalar(&mut self, scalar: Scalar) {
        self.scalar = Some(scalar)
    }

    pub(crate) fn push_attribute(
        &mut self, name: &'static str, value: impl Into<String>
    ) {
        self.attributes.push(Attribute { name, value: value.into() })
    }

    pub(crate) fn push_child(&mut self, child: Value) {
        self.children.push(child)
    }

    pub(crate) fn extend_children(
        &mut self, children: impl IntoIterator<Item = Value>
    ) {
        self.children.extend(children)
    }

    pub(crate) fn suppress(&mut self) {
        self.suppressed = true
    }
}

/// # Access
///
impl Value {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        self.scalar.as_ref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the value of the attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|attr| attr.name == name).map(|attr| {
            attr.value.as_str()
        })
    }

    pub fn children(&self) -> &[Value] {
        &self.children
    }

    /// Returns the first direct child with the given label.
    pub fn child(&self, label: &str) -> Option<&Value> {
        self.children.iter().find(|child| child.label() == label)
    }

    /// Returns the first descendant with the given label.
    ///
    /// The search is depth first and includes `self`.
    pub fn find(&self, label: &str) -> Option<&Value> {
        if self.label() == label {
            return Some(self)
        }
        self.children.iter().find_map(|child| child.find(label))
    }

    /// Returns whether the value should be left out of any output.
    ///
    /// This is true for the signature blocks of elementary files.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Returns the scalar as an unsigned integer if it is one.
    pub fn to_u64(&self) -> Option<u64> {
        match self.scalar {
            Some(Scalar::Unsigned(value)) => Some(value),
            _ => None
        }
    }

    /// Returns the scalar as octets if it is some.
    pub fn to_bytes(&self) -> Option<&Bytes> {
        match self.scalar {
            Some(Scalar::Bytes(ref value)) => Some(value),
            _ => None
        }
    }

    /// Returns the scalar as text if it is some.
    pub fn to_text(&self) -> Option<&str> {
        match self.scalar {
            Some(Scalar::Text(ref value)) => Some(value),
            _ => None
        }
    }
}


//--- Display

impl fmt::Display for Value {
    /// Formats the scalar value.
    ///
    /// This is the representation published for global values. A value
    /// without a scalar is the empty string.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.scalar {
            Some(ref scalar) => scalar.fmt(f),
            None => Ok(())
        }
    }
}


//------------ Scalar --------------------------------------------------------

/// The primitive value of a node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Scalar {
    Unsigned(u64),
    Bool(bool),
    Text(String),
    Bytes(Bytes),
    Time(DateTime<Utc>),

    /// A date that may not be set.
    Date(Option<NaiveDate>),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Scalar::Unsigned(value) => value.fmt(f),
            Scalar::Bool(value) => value.fmt(f),
            Scalar::Text(ref value) => f.write_str(value),
            Scalar::Bytes(ref value) => {
                write!(f, "0x{}", hex::encode_upper(value))
            }
            Scalar::Time(ref value) => {
                write!(f, "{}", value.format("%Y-%m-%d %H:%M:%SZ"))
            }
            Scalar::Date(Some(ref value)) => {
                write!(f, "{}", value.format("%Y-%m-%d"))
            }
            Scalar::Date(None) => f.write_str("unset"),
        }
    }
}


//------------ Attribute -----------------------------------------------------

/// A named attribute of a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    name: &'static str,
    value: String,
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}


//============ Tests =========================================================
