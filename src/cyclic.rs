//! The cyclic buffer stream.
//!
//! Driver cards keep their activity records in a ring buffer. The
//! [`CyclicSource`] presents a window of an underlying source as such a
//! ring: reading past the end of the window continues at its start. A
//! traversal may wrap around only once.

use crate::error::DecodeError;
use crate::source::Source;


//------------ CyclicSource --------------------------------------------------

/// A window of a source read as a ring buffer.
///
/// The window covers the octets `start..start + len` of the underlying
/// source. Logical positions are relative to the start of the window.
/// The source cannot be seeked.
pub struct CyclicSource<'a> {
    /// The underlying source.
    source: &'a mut dyn Source,

    /// The start of the window in the underlying source.
    start: u64,

    /// The length of the window.
    len: u64,

    /// Whether reading has wrapped around the end of the window.
    wrapped: bool,
}

impl<'a> CyclicSource<'a> {
    /// Creates a new cyclic source positioned at `offset` into the window.
    ///
    /// Returns an error if `offset` is not within the window.
    pub fn new(
        source: &'a mut dyn Source, start: u64, len: u64, offset: u64
    ) -> Result<Self, DecodeError> {
        if offset >= len {
            return Err(DecodeError::out_of_bounds(
                start,
                format!("offset {} outside of cyclic buffer of {}", offset, len)
            ))
        }
        source.seek(start + offset)?;
        Ok(CyclicSource { source, start, len, wrapped: false })
    }

    /// Returns whether reading has wrapped around.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }
}

impl<'a> Source for CyclicSource<'a> {
    fn pos(&self) -> u64 {
        self.source.pos().saturating_sub(self.start)
    }

    fn abs_pos(&self) -> u64 {
        self.source.abs_pos()
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let pos = self.pos();
        if pos > self.len {
            return Err(self.end_of_data())
        }
        let avail = self.len - pos;
        if buf.len() as u64 <= avail {
            self.source.read_exact(buf)?;
            return Ok(buf.len())
        }
        if self.wrapped {
            return Err(DecodeError::CyclicBufferOverrun {
                pos: self.abs_pos().into()
            })
        }
        self.wrapped = true;

        // avail is less than buf.len() here, so it fits a usize.
        let (head, tail) = buf.split_at_mut(avail as usize);
        self.source.read_exact(head)?;
        self.source.seek(self.start)?;
        Ok(head.len() + self.read_some(tail)?)
    }

    fn seek(&mut self, _pos: u64) -> Result<(), DecodeError> {
        Err(DecodeError::Unsupported("seeking within a cyclic buffer"))
    }
}


//============ Tests =========================================================
