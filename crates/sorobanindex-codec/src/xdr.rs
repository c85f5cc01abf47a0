//! Minimal XDR (RFC 4506) primitives: big-endian, 4-byte aligned.

use crate::error::DecodeError;

/// Upper bound on any variable-length item, guarding allocations on
/// hostile length prefixes.
pub const MAX_VAR_LEN: usize = 16 * 1024 * 1024;

fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Cursor over an XDR byte buffer.
pub struct XdrReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(DecodeError::InvalidDiscriminant {
                what: "bool",
                value: v.into(),
            }),
        }
    }

    /// `opaque[N]`
    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let out = self.array::<N>()?;
        self.skip_padding(N)?;
        Ok(out)
    }

    /// `opaque<>`: length-prefixed, padded to 4 bytes.
    pub fn read_var_opaque(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len()?;
        let out = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(out)
    }

    /// Length prefix of a variable array or opaque.
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_u32()? as usize;
        if len > MAX_VAR_LEN {
            return Err(DecodeError::LengthExceeded {
                len,
                limit: MAX_VAR_LEN,
            });
        }
        Ok(len)
    }

    fn skip_padding(&mut self, len: usize) -> Result<(), DecodeError> {
        if self.take(padding(len))?.iter().any(|b| *b != 0) {
            return Err(DecodeError::NonZeroPadding);
        }
        Ok(())
    }

    /// Fail if anything is left over.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(DecodeError::TrailingBytes { count }),
        }
    }
}

/// Growable XDR output buffer.
#[derive(Default)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u32(v as u32);
    }

    pub fn write_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    pub fn write_var_opaque(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_fixed(bytes);
    }

    fn pad(&mut self, len: usize) {
        self.buf.extend(std::iter::repeat(0u8).take(padding(len)));
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_opaque_is_padded() {
        let mut w = XdrWriter::new();
        w.write_var_opaque(b"abcde");
        let bytes = w.into_bytes();
        assert_eq!(bytes, [0, 0, 0, 5, b'a', b'b', b'c', b'd', b'e', 0, 0, 0]);

        let mut r = XdrReader::new(&bytes);
        assert_eq!(r.read_var_opaque().unwrap(), b"abcde");
        r.finish().unwrap();
    }

    #[test]
    fn short_input_is_eof() {
        let mut r = XdrReader::new(&[0, 0, 1]);
        assert_eq!(
            r.read_u32(),
            Err(DecodeError::UnexpectedEof { needed: 4, remaining: 3 })
        );
    }

    #[test]
    fn dirty_padding_rejected() {
        let bytes = [0, 0, 0, 1, b'x', 0, 1, 0];
        let mut r = XdrReader::new(&bytes);
        assert_eq!(r.read_var_opaque(), Err(DecodeError::NonZeroPadding));
    }

    #[test]
    fn oversized_length_rejected() {
        let bytes = u32::MAX.to_be_bytes();
        let mut r = XdrReader::new(&bytes);
        assert!(matches!(r.read_var_opaque(), Err(DecodeError::LengthExceeded { .. })));
    }

    #[test]
    fn trailing_bytes_reported() {
        let r = XdrReader::new(&[0, 0]);
        assert_eq!(r.finish(), Err(DecodeError::TrailingBytes { count: 2 }));
    }

    #[test]
    fn bool_must_be_zero_or_one() {
        let mut r = XdrReader::new(&[0, 0, 0, 2]);
        assert!(r.read_bool().is_err());
    }
}
