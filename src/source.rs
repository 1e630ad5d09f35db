//! The byte cursor.
//!
//! Tachograph files are read through the [`Source`] trait. It provides the
//! fixed-width primitives all regions are built from on top of a small set
//! of required methods. The trait is object safe since the decoder switches
//! between the plain [`Cursor`] and the [`CyclicSource`] in the middle of
//! a file.
//!
//! [`CyclicSource`]: crate::cyclic::CyclicSource

use std::{fmt, io};
use std::io::{Read, Seek, SeekFrom};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crate::error::DecodeError;
use crate::tables::Charset;


//------------ Source --------------------------------------------------------

/// A sequential source of octets that knows where it is.
pub trait Source {
    //--- Required methods

    /// Returns the logical position of the source.
    fn pos(&self) -> u64;

    /// Returns the position in the underlying data.
    ///
    /// This is what diagnostics and file offsets should use.
    fn abs_pos(&self) -> u64;

    /// Returns the total length of the source in logical octets.
    fn len(&self) -> u64;

    /// Reads up to `buf.len()` octets.
    ///
    /// Returns the number of octets read. Zero means the source has been
    /// exhausted.
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError>;

    /// Moves to the given logical position.
    fn seek(&mut self, pos: u64) -> Result<(), DecodeError>;


    //--- Provided methods

    /// Returns the number of octets left in the source.
    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.pos())
    }

    /// Reads as many octets as possible into `buf`.
    ///
    /// Stops short only at the end of the source.
    fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut done = 0;
        while done < buf.len() {
            match self.read_some(&mut buf[done..])? {
                0 => break,
                n => done += n,
            }
        }
        Ok(done)
    }

    /// Fills all of `buf` or fails with an end of data error.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        let pos = self.abs_pos();
        if self.read_up_to(buf)? < buf.len() {
            Err(DecodeError::end_of_data(pos))
        }
        else {
            Ok(())
        }
    }

    /// Moves forward by `len` octets.
    fn skip(&mut self, len: u64) -> Result<(), DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::end_of_data(self.abs_pos()))
        }
        let pos = self.pos() + len;
        self.seek(pos)
    }

    /// Returns the next octet without consuming it.
    ///
    /// Returns `Ok(None)` at the end of the source. This needs a source
    /// that can seek.
    fn peek_u8(&mut self) -> Result<Option<u8>, DecodeError> {
        let pos = self.pos();
        let mut buf = [0u8];
        let read = self.read_up_to(&mut buf)?;
        self.seek(pos)?;
        Ok(if read == 0 { None } else { Some(buf[0]) })
    }

    /// Takes a single octet from the source.
    fn take_u8(&mut self) -> Result<u8, DecodeError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Takes a big-endian 16 bit unsigned integer.
    fn take_u16(&mut self) -> Result<u16, DecodeError> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Takes a big-endian 24 bit unsigned integer.
    fn take_u24(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf[1..])?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Takes a big-endian 32 bit unsigned integer.
    fn take_u32(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Takes exactly `len` octets.
    fn take_bytes(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf.into())
    }

    /// Takes a fixed length string in the given character set.
    ///
    /// The string ends at the first NUL octet if there is one. Surrounding
    /// white space is removed.
    fn take_fixed_string(
        &mut self, len: usize, charset: Charset
    ) -> Result<String, DecodeError> {
        let data = self.take_bytes(len)?;
        let data = match data.iter().position(|&ch| ch == 0) {
            Some(nul) => &data[..nul],
            None => data.as_ref(),
        };
        Ok(charset.decode(data).trim().to_string())
    }

    /// Takes an unsigned integer encoded as `len` octets of packed BCD.
    ///
    /// Each octet carries two decimal digits, the high nibble first. At
    /// most four octets are allowed since the result has to fit a `u32`.
    fn take_bcd(&mut self, len: usize) -> Result<u32, DecodeError> {
        let pos = self.abs_pos();
        if len > 4 {
            return Err(DecodeError::malformed(
                pos, format!("BCD string of {} octets is too long", len)
            ))
        }
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf[..len])?;
        let mut res = 0u32;
        for &octet in &buf[..len] {
            let (high, low) = (octet >> 4, octet & 0x0F);
            if high > 9 || low > 9 {
                return Err(DecodeError::malformed(
                    pos, format!("invalid BCD octet 0x{:02X}", octet)
                ))
            }
            res = res * 100 + u32::from(high) * 10 + u32::from(low);
        }
        Ok(res)
    }

    /// Takes a `TimeReal`: seconds since 1970-01-01T00:00:00Z.
    fn take_timestamp(&mut self) -> Result<DateTime<Utc>, DecodeError> {
        let pos = self.abs_pos();
        let secs = self.take_u32()?;
        DateTime::from_timestamp(i64::from(secs), 0).ok_or_else(|| {
            DecodeError::malformed(pos, "timestamp out of range")
        })
    }

    /// Returns an end of data error at the current position.
    fn end_of_data(&self) -> DecodeError {
        DecodeError::end_of_data(self.abs_pos())
    }
}

impl<'a, S: Source + ?Sized> Source for &'a mut S {
    fn pos(&self) -> u64 {
        (**self).pos()
    }

    fn abs_pos(&self) -> u64 {
        (**self).abs_pos()
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        (**self).read_some(buf)
    }

    fn seek(&mut self, pos: u64) -> Result<(), DecodeError> {
        (**self).seek(pos)
    }
}


//------------ Cursor --------------------------------------------------------

/// A source atop anything that can be read and seeked.
///
/// Positions of the cursor are absolute offsets into the reader, so the
/// logical and absolute positions are always the same.
pub struct Cursor<R> {
    reader: R,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> Cursor<R> {
    /// Creates a new cursor at the start of the reader.
    pub fn new(mut reader: R) -> Result<Self, DecodeError> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Cursor { reader, pos: 0, len })
    }
}

impl<'a> Cursor<io::Cursor<&'a [u8]>> {
    /// Creates a cursor over a slice.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Cursor { reader: io::Cursor::new(data), pos: 0, len: data.len() as u64 }
    }
}

impl<R: Read + Seek> Source for Cursor<R> {
    fn pos(&self) -> u64 {
        self.pos
    }

    fn abs_pos(&self) -> u64 {
        self.pos
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let read = loop {
            match self.reader.read(buf) {
                Ok(read) => break read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => return Err(err.into())
            }
        };
        self.pos += read as u64;
        Ok(read)
    }

    fn seek(&mut self, pos: u64) -> Result<(), DecodeError> {
        self.pos = self.reader.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}


//------------ Pos -----------------------------------------------------------

/// An absolute position within a source.
///
/// Values of this type are only used for diagnostics, which is why we use
/// a newtype.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Pos(u64);

impl Pos {
    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Pos {
    fn from(pos: u64) -> Pos {
        Pos(pos)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}


//============ Tests =========================================================
