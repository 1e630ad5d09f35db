//! Decoding and validating tachograph data files.
//!
//! Digital tachographs record what drivers and vehicles did and make
//! these records available as data files downloaded either from a driver
//! card or from a vehicle unit. This crate decodes first generation files
//! of both kinds into a tree of [`Value`]s and, if asked to, checks the
//! RSA signatures protecting their content.
//!
//! The structure of a file is described by a [`Schema`]. The schemas for
//! driver cards and vehicle units are provided by the [`schema`] module. A
//! [`Decoder`] applies a schema to a file in either of two [`Mode`]s:
//! lenient, which skips over what it doesn’t understand, or strict, which
//! refuses anything out of the ordinary.
//!
//! Signature validation is configured via [`Config`]. The trusted root
//! keys live in [`sign::RootKeys`].

pub use self::activity::{Activity, ActivityChange};
pub use self::cyclic::CyclicSource;
pub use self::decode::{DecodedFile, Decoder};
pub use self::error::{DecodeError, SignatureError};
pub use self::mode::{Config, Mode};
pub use self::schema::{Schema, SchemaNode};
pub use self::source::{Cursor, Pos, Source};
pub use self::value::{Attribute, Scalar, Value};

pub mod decode;
pub mod schema;
pub mod sign;
pub mod tables;

mod activity;
mod cyclic;
mod error;
mod mode;
mod source;
mod value;
