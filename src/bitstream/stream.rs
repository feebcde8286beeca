//! Byte streams: the lowest layer of the codec.
//!
//! A [`Stream`] reads and writes single bytes. End of input is `None`, which can never be
//! confused with a data byte. Seeking is optional; streams that can't seek return
//! [`Error::NotSeekable`].
//!
//! NOTE: `read`/`read_byte` and `write`/`write_byte` are defined in terms of each other.
//! An implementation must override at least one of each pair it supports.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Size of the internal buffers used by the std::io adapters.
const BUFFER_SIZE: usize = 64 * 1024;

/// A byte-oriented source and/or sink.
pub trait Stream {
    /// Read one byte, or `None` at the end of the stream.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0_u8];
        match self.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    /// Best-effort read into `buf`. Returns the number of bytes actually read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut count = 0;
        while count < buf.len() {
            match self.read_byte()? {
                Some(byte) => buf[count] = byte,
                None => break,
            }
            count += 1;
        }
        Ok(count)
    }

    /// Append one byte.
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte]).map(|_| ())
    }

    /// Append all of `buf`, returning its length.
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        for &byte in buf {
            self.write_byte(byte)?;
        }
        Ok(buf.len())
    }

    /// Move to an absolute byte position.
    fn seek(&mut self, _pos: u64) -> Result<()> {
        Err(Error::NotSeekable)
    }

    /// Current absolute byte position.
    fn tell(&self) -> Result<u64> {
        Err(Error::NotSeekable)
    }

    /// Total length of the stream, when it is known up front.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Push any buffered output to its destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Stream + ?Sized> Stream for &mut S {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }
    fn seek(&mut self, pos: u64) -> Result<()> {
        (**self).seek(pos)
    }
    fn tell(&self) -> Result<u64> {
        (**self).tell()
    }
    fn size(&self) -> Option<u64> {
        (**self).size()
    }
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

pub(crate) fn read_only() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Unsupported, "stream is read-only"))
}

pub(crate) fn write_only() -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Unsupported, "stream is write-only"))
}

/// Read-only, seekable stream over borrowed bytes. Its size is always known.
#[derive(Debug)]
pub struct SliceStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}

impl Stream for SliceStream<'_> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.remaining();
        let count = buf.len().min(available.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.pos += count;
        Ok(count)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(read_only())
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = usize::try_from(pos).unwrap_or(usize::MAX);
        Ok(())
    }

    fn tell(&self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

/// Owned in-memory stream. Either grows on demand, or holds exactly a fixed number of bytes.
#[derive(Debug, Default)]
pub struct BufferStream {
    buffer: Vec<u8>,
    pos: usize,
    /// Exact final length for fixed-size buffers.
    limit: Option<usize>,
}

impl BufferStream {
    /// An empty buffer that grows as it is written.
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer that must end up holding exactly `size` bytes.
    /// Only a bounded amount is reserved up front; the rest is allocated as it is written.
    pub fn fixed(size: u64) -> Self {
        let limit = usize::try_from(size).unwrap_or(usize::MAX);
        Self {
            buffer: Vec::with_capacity(limit.min(BUFFER_SIZE * 16)),
            pos: 0,
            limit: Some(limit),
        }
    }

    /// A readable (and writable) stream over existing data, positioned at the start.
    pub fn from_vec(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            pos: 0,
            limit: None,
        }
    }

    /// Bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the stream and return the buffer. A fixed-size buffer that was not completely
    /// filled is a [`Error::SizeMismatch`].
    pub fn into_inner(self) -> Result<Vec<u8>> {
        match self.limit {
            Some(limit) if limit != self.buffer.len() => Err(Error::SizeMismatch {
                expected: limit as u64,
                actual: self.buffer.len() as u64,
            }),
            _ => Ok(self.buffer),
        }
    }
}

impl Stream for BufferStream {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.buffer.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.pos < self.buffer.len() {
            self.buffer[self.pos] = byte;
        } else {
            if let Some(limit) = self.limit {
                if self.pos >= limit {
                    return Err(Error::SizeMismatch {
                        expected: limit as u64,
                        actual: self.pos as u64 + 1,
                    });
                }
            }
            // Seeking past the end leaves a gap of zeros, as a zero-filled buffer would.
            self.buffer.resize(self.pos, 0);
            self.buffer.push(byte);
        }
        self.pos += 1;
        Ok(())
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = usize::try_from(pos).unwrap_or(usize::MAX);
        Ok(())
    }

    fn tell(&self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.buffer.len() as u64)
    }
}

/// Non-seekable stream reading from any `std::io::Read`.
pub struct ReadStream<R> {
    source: R,
    buffer: Vec<u8>,
    cursor: usize,
    size: Option<u64>,
}

impl<R: Read> ReadStream<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            cursor: 0,
            size: None,
        }
    }

    /// Declare the total number of bytes the source will produce.
    pub fn with_size(source: R, size: u64) -> Self {
        Self {
            size: Some(size),
            ..Self::new(source)
        }
    }

    /// Refill the buffer when it is used up. Returns false when the source is exhausted.
    fn have_data(&mut self) -> Result<bool> {
        if self.cursor == self.buffer.len() {
            self.buffer.resize(BUFFER_SIZE, 0);
            let size = loop {
                match self.source.read(&mut self.buffer) {
                    Ok(size) => break size,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            self.buffer.truncate(size);
            self.cursor = 0;
            if size == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<R: Read> Stream for ReadStream<R> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if !self.have_data()? {
            return Ok(None);
        }
        let byte = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(Some(byte))
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(read_only())
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Non-seekable stream writing to any `std::io::Write`. Output is buffered until
/// [`Stream::flush`] or until the buffer fills; dropping an unflushed stream loses the tail.
pub struct WriteStream<W: Write> {
    sink: W,
    buffer: Vec<u8>,
}

impl<W: Write> WriteStream<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buffer: Vec::with_capacity(BUFFER_SIZE),
        }
    }

    /// Flush and return the wrapped writer.
    pub fn into_inner(mut self) -> Result<W> {
        Stream::flush(&mut self)?;
        Ok(self.sink)
    }
}

impl<W: Write> Stream for WriteStream<W> {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(write_only())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.buffer.push(byte);
        if self.buffer.len() >= BUFFER_SIZE {
            self.sink.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.sink.write_all(&self.buffer)?;
        self.buffer.clear();
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{BufferStream, ReadStream, SliceStream, Stream, WriteStream};
    use crate::error::Error;

    #[test]
    fn slice_stream_test() {
        let mut s = SliceStream::new(b"abc");
        assert_eq!(s.size(), Some(3));
        assert_eq!(s.read_byte().unwrap(), Some(b'a'));
        let mut buf = [0_u8; 8];
        assert_eq!(s.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"bc");
        assert_eq!(s.read_byte().unwrap(), None);
        s.seek(1).unwrap();
        assert_eq!(s.tell().unwrap(), 1);
        assert_eq!(s.read_byte().unwrap(), Some(b'b'));
        assert!(s.write_byte(0).is_err());
    }

    #[test]
    fn growable_buffer_test() {
        let mut s = BufferStream::new();
        s.write(b"hello").unwrap();
        s.seek(0).unwrap();
        s.write_byte(b'j').unwrap();
        assert_eq!(s.into_inner().unwrap(), b"jello");
    }

    #[test]
    fn fixed_buffer_overflow_test() {
        let mut s = BufferStream::fixed(2);
        s.write_byte(1).unwrap();
        s.write_byte(2).unwrap();
        assert!(matches!(
            s.write_byte(3),
            Err(Error::SizeMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn fixed_buffer_underfill_test() {
        let mut s = BufferStream::fixed(4);
        s.write_byte(1).unwrap();
        assert!(matches!(
            s.into_inner(),
            Err(Error::SizeMismatch {
                expected: 4,
                actual: 1
            })
        ));
    }

    #[test]
    fn io_adapters_test() {
        let mut reader = ReadStream::new(&b"xyz"[..]);
        assert_eq!(reader.size(), None);
        assert!(matches!(reader.tell(), Err(Error::NotSeekable)));
        let mut writer = WriteStream::new(Vec::new());
        while let Some(byte) = reader.read_byte().unwrap() {
            writer.write_byte(byte).unwrap();
        }
        assert_eq!(writer.into_inner().unwrap(), b"xyz");
    }

    #[test]
    fn borrowed_stream_test() {
        fn drain(mut s: impl Stream) -> usize {
            let mut n = 0;
            while s.read_byte().unwrap().is_some() {
                n += 1;
            }
            n
        }
        let mut s = SliceStream::new(b"abcd");
        s.read_byte().unwrap();
        assert_eq!(drain(&mut s), 3);
        assert_eq!(s.tell().unwrap(), 4);
    }
}
