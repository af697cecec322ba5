use std::io::{self, Read};

use crate::error::{Result, TrxError};

/// Number of bytes staged at a time when reading a string.
pub const STRING_CHUNK: usize = 1024;

/// The byte order of the values in a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// The byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::Big
        } else {
            Self::Little
        }
    }

    pub const fn swapped(self) -> Self {
        match self {
            Self::Little => Self::Big,
            Self::Big => Self::Little,
        }
    }

    /// Whether values in this byte order must be reversed before the host can use them.
    pub fn needs_swap(self) -> bool {
        self != Self::native()
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Little => write!(f, "little-endian"),
            Self::Big => write!(f, "big-endian"),
        }
    }
}

/// The number of bytes used to store each real in a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Single = 4,
    Double = 8,
}

impl Precision {
    pub const fn nbytes(self) -> usize {
        self as usize
    }
}

impl TryFrom<i32> for Precision {
    type Error = TrxError;

    fn try_from(nbytes: i32) -> Result<Self> {
        match nbytes {
            4 => Ok(Self::Single),
            8 => Ok(Self::Double),
            other => Err(TrxError::UnsupportedPrecision(other)),
        }
    }
}

/// Reverse the byte order of each `width`-byte element in `buf`, in place.
///
/// Trailing bytes that do not make up a whole element are left alone.
pub fn swap_bytes(buf: &mut [u8], width: usize) {
    debug_assert!(matches!(width, 2 | 4 | 8), "unexpected element width {width}");
    buf.chunks_exact_mut(width).for_each(|element| element.reverse());
}

/// Read until `buf` is full or the reader runs dry, and return the number of bytes read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Reads the primitive fields of a trajectory in a fixed byte order.
///
/// Keeps track of the absolute byte offset of its cursor, such that short reads can be reported
/// with the position where they occurred.
pub struct FieldReader<'r, R> {
    reader: &'r mut R,
    order: Endianness,
    offset: u64,
}

impl<'r, R: Read> FieldReader<'r, R> {
    /// Create a [`FieldReader`] for `reader`, whose cursor sits at byte `offset`.
    pub fn new(reader: &'r mut R, order: Endianness, offset: u64) -> Self {
        Self {
            reader,
            order,
            offset,
        }
    }

    pub fn order(&self) -> Endianness {
        self.order
    }

    pub(crate) fn set_order(&mut self, order: Endianness) {
        self.order = order;
    }

    /// The absolute byte offset of the cursor.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Fill `buf` completely, or fail with [`TrxError::TruncatedRead`].
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = read_full(self.reader, buf)?;
        if n < buf.len() {
            return Err(TrxError::TruncatedRead {
                offset: self.offset,
                expected: buf.len(),
                actual: n,
            });
        }
        self.offset += n as u64;
        Ok(())
    }

    /// Read four bytes without interpreting their byte order.
    pub(crate) fn read_raw_i32(&mut self) -> Result<[u8; 4]> {
        let mut buf = [0; 4];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    pub fn read_int(&mut self) -> Result<i32> {
        let mut buf = self.read_raw_i32()?;
        if self.order.needs_swap() {
            swap_bytes(&mut buf, 4);
        }
        Ok(i32::from_ne_bytes(buf))
    }

    /// Read a real of the given `precision`, widened to an `f64`.
    pub fn read_real(&mut self, precision: Precision) -> Result<f64> {
        match precision {
            Precision::Single => {
                let mut buf = [0; 4];
                self.read_bytes(&mut buf)?;
                if self.order.needs_swap() {
                    swap_bytes(&mut buf, 4);
                }
                Ok(f32::from_ne_bytes(buf) as f64)
            }
            Precision::Double => {
                let mut buf = [0; 8];
                self.read_bytes(&mut buf)?;
                if self.order.needs_swap() {
                    swap_bytes(&mut buf, 8);
                }
                Ok(f64::from_ne_bytes(buf))
            }
        }
    }

    /// Read `out.len()` reals as a single block, multiplying each by `scale`.
    ///
    /// The raw block is staged in `scratch`, which is resized as needed.
    pub fn read_reals(
        &mut self,
        precision: Precision,
        out: &mut [f64],
        scratch: &mut Vec<u8>,
        scale: f64,
    ) -> Result<()> {
        let width = precision.nbytes();
        scratch.resize(out.len() * width, 0);
        self.read_bytes(scratch)?;
        if self.order.needs_swap() {
            swap_bytes(scratch, width);
        }
        match precision {
            Precision::Single => {
                for (value, bytes) in out.iter_mut().zip(scratch.chunks_exact(4)) {
                    let v = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                    *value = v as f64 * scale;
                }
            }
            Precision::Double => {
                for (value, bytes) in out.iter_mut().zip(scratch.chunks_exact(8)) {
                    let mut raw = [0; 8];
                    raw.copy_from_slice(bytes);
                    *value = f64::from_ne_bytes(raw) * scale;
                }
            }
        }
        Ok(())
    }

    /// Read a string that is preceded by its length in bytes.
    ///
    /// The bytes are staged in chunks of at most [`STRING_CHUNK`] bytes. Within each chunk,
    /// everything from the first NUL byte onwards is dropped.
    pub fn read_string(&mut self) -> Result<String> {
        let size = self.read_int()?;
        let size: usize = size
            .try_into()
            .map_err(|_| TrxError::NegativeSize {
                field: "string",
                size,
            })?;

        let mut chunk = [0u8; STRING_CHUNK];
        let mut bytes = Vec::with_capacity(usize::min(size, STRING_CHUNK));
        let mut left = size;
        while left > 0 {
            let n = usize::min(left, STRING_CHUNK);
            let chunk = &mut chunk[..n];
            self.read_bytes(chunk)?;
            let end = chunk.iter().position(|&b| b == 0).unwrap_or(n);
            bytes.extend_from_slice(&chunk[..end]);
            left -= n;
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
