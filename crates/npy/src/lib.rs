//! NPY: NumPy array files, format version 1.0.
//!
//! - Little-endian, C-order (`fortran_order: False`) arrays only.
//! - Element types: `u8` (`|u1`), `f32` (`<f4`).
//! - `NpyWriter` streams a stacked array whose leading dimension is declared
//!   before the first item is written.
//!
//! File layout:
//!   00  : [u8;6]  magic = b"\x93NUMPY"
//!   06  : u8      major version = 1
//!   07  : u8      minor version = 0
//!   08  : u16     header_len (little-endian)
//!   0A  : [u8]    header: ASCII python dict literal
//!                 "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }"
//!                 padded with b' ' and terminated by b'\n' so that
//!                 10 + header_len is a multiple of 64
//!   ..  : [u8]    raw element data, product(shape) * itemsize bytes

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::marker::PhantomData;
use std::path::Path;

pub const NPY_MAGIC: [u8; 6] = *b"\x93NUMPY";
pub const NPY_VERSION: (u8, u8) = (1, 0);

/// Data offset alignment required by numpy.
const HEADER_ALIGN: usize = 64;

/// Fixed preamble: magic + version + header_len.
const PREAMBLE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    U8,
    F32,
}

impl Dtype {
    /// The numpy `descr` string for this dtype.
    pub fn descr(self) -> &'static str {
        match self {
            Dtype::U8 => "|u1",
            Dtype::F32 => "<f4",
        }
    }

    pub fn item_size(self) -> usize {
        match self {
            Dtype::U8 => 1,
            Dtype::F32 => 4,
        }
    }

    fn from_descr(descr: &str) -> io::Result<Self> {
        match descr {
            "|u1" | "<u1" => Ok(Dtype::U8),
            "<f4" => Ok(Dtype::F32),
            other => Err(bad(&format!("unsupported NPY descr {other:?}"))),
        }
    }
}

/// Element types that can be stored in an NPY array.
pub trait Element: bytemuck::Pod {
    const DTYPE: Dtype;

    /// Append the little-endian bytes of `self` to `out`.
    fn put_le(self, out: &mut Vec<u8>);
}

impl Element for u8 {
    const DTYPE: Dtype = Dtype::U8;

    #[inline]
    fn put_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Element for f32 {
    const DTYPE: Dtype = Dtype::F32;

    #[inline]
    fn put_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub dtype: Dtype,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    pub fn new(dtype: Dtype, shape: &[usize]) -> Self {
        Self {
            dtype,
            fortran_order: false,
            shape: shape.to_vec(),
        }
    }

    /// Number of elements described by `shape` (1 for a 0-d array).
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of the data block following the header.
    pub fn data_len(&self) -> io::Result<usize> {
        self.shape
            .iter()
            .try_fold(self.dtype.item_size(), |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| bad("NPY shape overflows usize"))
    }
}

/// A parsed NPY array: header plus raw little-endian data bytes.
#[derive(Debug, Clone)]
pub struct NpyArray {
    pub header: NpyHeader,
    pub data: Vec<u8>,
}

impl NpyArray {
    pub fn shape(&self) -> &[usize] {
        &self.header.shape
    }

    /// Reinterpret the data block as elements of `T`.
    pub fn to_vec<T: Element>(&self) -> io::Result<Vec<T>> {
        if self.header.dtype != T::DTYPE {
            return Err(bad(&format!(
                "NPY dtype mismatch: file has {}, requested {}",
                self.header.dtype.descr(),
                T::DTYPE.descr()
            )));
        }

        #[cfg(target_endian = "little")]
        {
            Ok(bytemuck::pod_collect_to_vec(&self.data))
        }

        #[cfg(not(target_endian = "little"))]
        {
            Err(bad("NPY decode is only implemented for little-endian hosts"))
        }
    }
}

#[cold]
fn bad(msg: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, msg)
}

#[inline(always)]
fn take<'a>(buf: &mut &'a [u8], n: usize) -> io::Result<&'a [u8]> {
    if buf.len() < n {
        return Err(io::Error::new(ErrorKind::UnexpectedEof, "truncated NPY"));
    }
    let (head, tail) = buf.split_at(n);
    *buf = tail;
    Ok(head)
}

/// Render the header dict, padded so the data block starts on a 64-byte boundary.
pub fn encode_header(header: &NpyHeader) -> io::Result<Vec<u8>> {
    let shape = match header.shape.as_slice() {
        [] => "()".to_owned(),
        [single] => format!("({single},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    };

    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
        header.dtype.descr(),
        if header.fortran_order { "True" } else { "False" },
        shape
    );

    // Pad with spaces, leaving room for the terminating newline.
    let unpadded = PREAMBLE_LEN + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');

    let header_len = u16::try_from(dict.len()).map_err(|_| bad("NPY header too long"))?;

    let mut out = Vec::with_capacity(PREAMBLE_LEN + dict.len());
    out.extend_from_slice(&NPY_MAGIC);
    out.push(NPY_VERSION.0);
    out.push(NPY_VERSION.1);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(dict.as_bytes());

    Ok(out)
}

/// Extract the raw text of `'key': <value>` from a header dict.
fn dict_value<'a>(dict: &'a str, key: &str) -> io::Result<&'a str> {
    let needle = format!("'{key}':");
    let start = dict
        .find(&needle)
        .ok_or_else(|| bad(&format!("NPY header has no {key:?} entry")))?
        + needle.len();
    let rest = dict[start..].trim_start();

    // Tuples may contain commas, so the value ends at the closing paren.
    let end = if rest.starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find([',', '}'])
    }
    .ok_or_else(|| bad(&format!("unterminated NPY header entry {key:?}")))?;

    Ok(rest[..end].trim())
}

fn parse_shape(text: &str) -> io::Result<Vec<usize>> {
    let inner = text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| bad("NPY shape is not a tuple"))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| bad(&format!("bad NPY shape dimension {t:?}")))
        })
        .collect()
}

/// Parse the preamble and header dict. Returns the header and the remaining bytes.
pub fn parse_header(mut p: &[u8]) -> io::Result<(NpyHeader, &[u8])> {
    if take(&mut p, 6)? != NPY_MAGIC {
        return Err(bad("bad NPY magic"));
    }

    let version = take(&mut p, 2)?;
    let header_len = match version {
        [1, 0] => {
            let b = take(&mut p, 2)?;
            u16::from_le_bytes([b[0], b[1]]) as usize
        }
        [2, 0] | [3, 0] => {
            let b = take(&mut p, 4)?;
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize
        }
        _ => return Err(bad("unsupported NPY version")),
    };

    let dict = std::str::from_utf8(take(&mut p, header_len)?)
        .map_err(|_| bad("NPY header is not valid text"))?;

    let descr = dict_value(dict, "descr")?.trim_matches(|c| c == '\'' || c == '"');
    let fortran_order = match dict_value(dict, "fortran_order")? {
        "False" => false,
        "True" => true,
        other => return Err(bad(&format!("bad NPY fortran_order {other:?}"))),
    };
    let shape = parse_shape(dict_value(dict, "shape")?)?;

    let header = NpyHeader {
        dtype: Dtype::from_descr(descr)?,
        fortran_order,
        shape,
    };

    Ok((header, p))
}

/// Parse a complete NPY file from a byte slice.
pub fn parse_npy_bytes(bytes: &[u8]) -> io::Result<NpyArray> {
    let (header, mut p) = parse_header(bytes)?;

    if header.fortran_order {
        return Err(bad("fortran-order NPY arrays are not supported"));
    }

    let data = take(&mut p, header.data_len()?)?.to_vec();

    Ok(NpyArray { header, data })
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<NpyArray> {
    let file = File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    parse_npy_bytes(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<NpyArray> {
    let bytes = std::fs::read(path)?;
    parse_npy_bytes(&bytes)
}

fn write_elements<W: Write, T: Element>(w: &mut W, data: &[T]) -> io::Result<()> {
    #[cfg(target_endian = "little")]
    {
        w.write_all(bytemuck::cast_slice(data))
    }

    #[cfg(not(target_endian = "little"))]
    {
        let mut buf = Vec::with_capacity(data.len() * T::DTYPE.item_size());
        for &v in data {
            v.put_le(&mut buf);
        }
        w.write_all(&buf)
    }
}

/// Write a whole array in one call. `data.len()` must equal the product of `shape`.
pub fn write_file<P: AsRef<Path>, T: Element>(
    path: P,
    shape: &[usize],
    data: &[T],
) -> io::Result<()> {
    let header = NpyHeader::new(T::DTYPE, shape);
    if header.len() != data.len() {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!(
                "NPY shape {:?} needs {} elements, got {}",
                shape,
                header.len(),
                data.len()
            ),
        ));
    }

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(&encode_header(&header)?)?;
    write_elements(&mut file, data)?;
    file.flush()?;

    Ok(())
}

/// Streams a stacked array `shape = [count, item_shape..]` one item at a time.
///
/// The header is written up front, so `count` must be known before the first
/// item. `finish` fails unless exactly `count` items were written.
pub struct NpyWriter<W: Write, T: Element> {
    inner: W,
    item_len: usize,
    expected: usize,
    written: usize,
    _elem: PhantomData<T>,
}

impl<T: Element> NpyWriter<BufWriter<File>, T> {
    pub fn create<P: AsRef<Path>>(path: P, shape: &[usize]) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?), shape)
    }
}

impl<W: Write, T: Element> NpyWriter<W, T> {
    pub fn new(mut inner: W, shape: &[usize]) -> io::Result<Self> {
        let (&expected, item_shape) = shape
            .split_first()
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "stacked NPY needs a leading dimension"))?;

        let header = NpyHeader::new(T::DTYPE, shape);
        inner.write_all(&encode_header(&header)?)?;

        Ok(Self {
            inner,
            item_len: item_shape.iter().product(),
            expected,
            written: 0,
            _elem: PhantomData,
        })
    }

    pub fn write_item(&mut self, item: &[T]) -> io::Result<()> {
        if item.len() != self.item_len {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("NPY item has {} elements, expected {}", item.len(), self.item_len),
            ));
        }
        if self.written == self.expected {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("NPY stack already holds {} items", self.expected),
            ));
        }

        write_elements(&mut self.inner, item)?;
        self.written += 1;

        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.written != self.expected {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("NPY stack declared {} items, wrote {}", self.expected, self.written),
            ));
        }

        self.inner.flush()?;
        Ok(self.inner)
    }
}
