//! Small helpers shared by the codecs: bit widths, the size prefix, and stream headers.

use log::error;

use crate::bitstream::stream::{BufferStream, Stream};
use crate::error::{Error, Result};

/// Position of the highest set bit, counting from 1. `fls(0) == 0`.
pub fn fls(v: u64) -> u32 {
    u64::BITS - v.leading_zeros()
}

/// Encode `n` as big-endian groups of 7 bits. The last byte has its top bit set.
pub fn encode_unsigned_number(mut n: u64) -> Vec<u8> {
    let mut bytes = vec![(n & 0x7f) as u8 | 0x80];
    n >>= 7;
    while n != 0 {
        bytes.push((n & 0x7f) as u8);
        n >>= 7;
    }
    bytes.reverse();
    bytes
}

pub fn write_unsigned_number<S: Stream + ?Sized>(output: &mut S, n: u64) -> Result<()> {
    output.write(&encode_unsigned_number(n))?;
    Ok(())
}

pub fn read_unsigned_number<S: Stream + ?Sized>(input: &mut S) -> Result<u64> {
    let mut n = 0_u64;
    loop {
        let c = input
            .read_byte()?
            .ok_or_else(|| Error::FormatError("truncated size prefix".into()))?;
        n = n
            .checked_mul(0x80)
            .and_then(|n| n.checked_add(u64::from(c & 0x7f)))
            .ok_or_else(|| Error::FormatError("size prefix overflows 64 bits".into()))?;
        if c & 0x80 != 0 {
            return Ok(n);
        }
    }
}

/// The size prefix stores `size + 1`, with 0 meaning "unknown".
pub fn size_prefix(declared: Option<u64>) -> u64 {
    declared.map_or(0, |n| n + 1)
}

pub fn declared_size(prefix: u64) -> Option<u64> {
    prefix.checked_sub(1)
}

/// Check the four magic bytes at the start of a stream.
pub fn check_magic<S: Stream + ?Sized>(input: &mut S, magic: &[u8; 4]) -> Result<()> {
    let mut found = [0_u8; 4];
    let count = input.read(&mut found)?;
    if count != 4 || &found != magic {
        error!(
            "Expected magic {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&found[..count])
        );
        return Err(Error::FormatError(format!(
            "bad magic, expected {:?}",
            String::from_utf8_lossy(magic)
        )));
    }
    Ok(())
}

/// Read magic and size prefix. Returns the declared size, `None` when unknown.
pub fn read_header<S: Stream + ?Sized>(input: &mut S, magic: &[u8; 4]) -> Result<Option<u64>> {
    check_magic(input, magic)?;
    Ok(declared_size(read_unsigned_number(input)?))
}

/// An output buffer for a stream of the given declared size: exact when known, growable when not.
pub fn coerce_output(declared: Option<u64>) -> BufferStream {
    match declared {
        Some(size) => BufferStream::fixed(size),
        None => BufferStream::new(),
    }
}
