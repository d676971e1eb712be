//! Helpers shared by the hand-written `binrw` codecs.

use binrw::{
    io::{Cursor, Read, Seek, SeekFrom},
    prelude::*,
};

use crate::{DtypError, Result};

/// Builds the error every codec returns for malformed input.
///
/// `pos` is the absolute offset of the structure, `structure` its name.
pub fn format_error(pos: u64, structure: &str, message: impl std::fmt::Display) -> binrw::Error {
    binrw::Error::AssertFail {
        pos,
        message: format!("{structure}: {message}"),
    }
}

/// Fails unless at least `len` bytes are available from `start`.
///
/// The stream position is restored before returning.
pub fn ensure_available<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    len: u64,
    structure: &str,
) -> BinResult<()> {
    let current = reader.stream_position()?;
    let end = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(current))?;
    if start.saturating_add(len) > end {
        return Err(format_error(
            start,
            structure,
            format_args!(
                "declared size {len} exceeds the {} remaining bytes",
                end.saturating_sub(start)
            ),
        ));
    }
    Ok(())
}

/// Reads exactly `len` bytes, failing with a format error when the input is shorter.
pub fn read_exact_vec<R: Read + Seek>(
    reader: &mut R,
    len: u64,
    start: u64,
    structure: &str,
) -> BinResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    ensure_available(reader, pos, len, structure).map_err(|_| {
        format_error(start, structure, format_args!("truncated, {len} more bytes expected at {pos}"))
    })?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Decoding from and encoding to a standalone little-endian byte buffer.
///
/// Implemented for every type whose `binrw` arguments are `()`.
pub trait WireFormat: Sized {
    fn from_wire(bytes: &[u8]) -> Result<Self>;
    fn to_wire(&self) -> Result<Vec<u8>>;
}

impl<T> WireFormat for T
where
    T: for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()>,
{
    fn from_wire(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        T::read_le(&mut cursor).map_err(|e| match crate::error::root_cause(e) {
            binrw::Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                DtypError::Format {
                    offset: bytes.len() as u64,
                    message: format!("unexpected end of input ({io})"),
                }
            }
            other => other.into(),
        })
    }

    fn to_wire(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_le(&mut cursor)?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_available() {
        let mut cursor = Cursor::new(vec![0u8; 12]);
        cursor.set_position(4);
        assert!(ensure_available(&mut cursor, 4, 8, "test").is_ok());
        assert_eq!(cursor.position(), 4);

        let err = ensure_available(&mut cursor, 4, 9, "test").unwrap_err();
        match err {
            binrw::Error::AssertFail { pos, message } => {
                assert_eq!(pos, 4);
                assert!(message.starts_with("test:"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_read_exact_vec_truncated() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(read_exact_vec(&mut cursor, 2, 0, "test").unwrap(), vec![1, 2]);
        assert!(read_exact_vec(&mut cursor, 2, 0, "test").is_err());
    }
}
