use flate2::{Decompress, FlushDecompress, Status};

/// Upper bound for a single inflated block. Real saves sit well below this.
pub const MAX_INFLATED_LEN: usize = 1 << 30;

const INFLATE_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected end of data at offset {offset}: need {need} bytes, have {have}")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("seek to {target} outside buffer of {len} bytes")]
    SeekOutOfRange { target: i128, len: usize },

    #[error("negative {what} {value} at offset {offset}")]
    NegativeLength {
        what: &'static str,
        value: i32,
        offset: usize,
    },

    #[error("{what} {count} at offset {offset} exceeds limit {max}")]
    CountTooLarge {
        what: &'static str,
        count: usize,
        max: usize,
        offset: usize,
    },

    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("zlib inflate failed: {0}")]
    Inflate(String),
}

pub type Result<T> = std::result::Result<T, ReadError>;

/// Little-endian cursor over a borrowed save buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    pub fn remaining_slice(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    pub fn seek_to(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(ReadError::SeekOutOfRange {
                target: pos as i128,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn seek_relative(&mut self, delta: isize) -> Result<()> {
        let target = self.pos as i128 + delta as i128;
        if target < 0 || target > self.data.len() as i128 {
            return Err(ReadError::SeekOutOfRange {
                target,
                len: self.data.len(),
            });
        }
        self.pos = target as usize;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array_bytes::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array_bytes()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array_bytes()?))
    }

    /// Read an int32 length that must not be negative.
    pub fn read_len(&mut self, what: &'static str) -> Result<usize> {
        let offset = self.pos;
        let value = self.read_i32()?;
        if value < 0 {
            self.pos = offset;
            return Err(ReadError::NegativeLength {
                what,
                value,
                offset,
            });
        }
        Ok(value as usize)
    }

    /// Length-prefixed (int32) UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_len("string length")?;
        let bytes = self.read_bytes(len).inspect_err(|_| self.pos = start)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => {
                self.pos = start;
                Err(ReadError::InvalidUtf8 { offset: start + 4 })
            }
        }
    }

    /// Like [`read_string`](Self::read_string) but replaces invalid UTF-8.
    pub fn read_string_lossy(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_len("string length")?;
        let bytes = self.read_bytes(len).inspect_err(|_| self.pos = start)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn read_array<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.read_len("array count")?;
        let mut out = Vec::with_capacity(self.capacity_for::<T>(count));
        for _ in 0..count {
            out.push(element(self)?);
        }
        Ok(out)
    }

    /// [`read_array`](Self::read_array) for lists that may be cut short. A
    /// count above `max` is an error; the first element that fails to decode
    /// ends the list, and the cursor is left where that element began.
    pub fn read_array_prefix<T>(
        &mut self,
        max: usize,
        mut element: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let offset = self.pos;
        let count = self.read_len("array count")?;
        if count > max {
            self.pos = offset;
            return Err(ReadError::CountTooLarge {
                what: "array count",
                count,
                max,
                offset,
            });
        }
        let mut out = Vec::with_capacity(self.capacity_for::<T>(count));
        for _ in 0..count {
            let start = self.pos;
            match element(self) {
                Ok(value) => out.push(value),
                Err(_) => {
                    self.pos = start;
                    break;
                }
            }
        }
        Ok(out)
    }

    pub fn read_key_value_pairs<K, V>(
        &mut self,
        mut key: impl FnMut(&mut Self) -> Result<K>,
        mut value: impl FnMut(&mut Self) -> Result<V>,
    ) -> Result<Vec<(K, V)>> {
        let count = self.read_len("pair count")?;
        let mut out = Vec::with_capacity(self.capacity_for::<(K, V)>(count));
        for _ in 0..count {
            let k = key(self)?;
            let v = value(self)?;
            out.push((k, v));
        }
        Ok(out)
    }

    /// Inflate the next `compressed_len` bytes, or everything left when `None`.
    pub fn inflate(&mut self, compressed_len: Option<usize>) -> Result<InflatedBlock> {
        let start = self.pos;
        let input = match compressed_len {
            Some(n) => self.read_bytes(n)?,
            None => {
                let rest = self.remaining_slice();
                self.pos = self.data.len();
                rest
            }
        };
        match inflate_zlib(input) {
            Ok(bytes) => Ok(InflatedBlock { bytes }),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    /// Preallocation for `count` elements, capped by how many values of `T`
    /// the remaining bytes could possibly hold.
    fn capacity_for<T>(&self, count: usize) -> usize {
        count.min(self.remaining() / size_of::<T>().max(1))
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(ReadError::UnexpectedEof {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }

    fn read_array_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

/// Owned output of a zlib inflate; hands out fresh cursors over itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflatedBlock {
    bytes: Vec<u8>,
}

impl InflatedBlock {
    pub fn cursor(&self) -> ByteCursor<'_> {
        ByteCursor::new(&self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Inflate one complete zlib stream from the start of `input`.
///
/// Bytes after the stream's end marker are ignored. A stream that runs out of
/// input before its end marker is an error.
pub fn inflate_zlib(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = Decompress::new(true);
    let mut out: Vec<u8> = Vec::with_capacity(input.len().saturating_mul(2).min(INFLATE_CHUNK));

    loop {
        if out.len() == out.capacity() {
            if out.len() >= MAX_INFLATED_LEN {
                return Err(ReadError::Inflate(format!(
                    "inflated size exceeds {MAX_INFLATED_LEN} bytes"
                )));
            }
            out.reserve(out.capacity().clamp(INFLATE_CHUNK, MAX_INFLATED_LEN));
        }

        let consumed = decoder.total_in() as usize;
        let produced = out.len();
        let status = decoder
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| ReadError::Inflate(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let made_progress =
                    decoder.total_in() as usize != consumed || out.len() != produced;
                if !made_progress && out.len() < out.capacity() {
                    return Err(ReadError::Inflate("truncated zlib stream".to_string()));
                }
            }
        }
    }
}
