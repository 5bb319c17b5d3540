//! Int8 weight archive for mobile deployment.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "MQ8\0" | u32 version | u32 tensor count
//! per tensor: u32 name len | name | u32 ndim | ndim x u32 dims | f32 scale | numel x i8
//! ```

use crate::error::{ExportError, Result};
use bytemuck::cast_slice;
use memmap2::MmapOptions;
use ndarray::{ArrayD, IxDyn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const MAGIC: [u8; 4] = *b"MQ8\0";
pub const VERSION: u32 = 1;

/// Symmetric quantization of a tensor to 8-bit integers with a scale factor.
///
/// The stored scale is `max / 127`; a scale of zero (all-zero tensor, or an
/// underflow) becomes 1.
fn quantize_tensor(name: &str, t: &ArrayD<f32>) -> Result<(Vec<i8>, f32)> {
    if t.iter().any(|v| !v.is_finite()) {
        return Err(ExportError::NonFinite { name: name.to_string() });
    }
    let max = t.iter().fold(0.0_f32, |m, &v| m.max(v.abs()));
    let scale = max / 127.0;
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let data = t.iter().map(|&v| (v / scale).round() as i8).collect();
    Ok((data, scale))
}

fn to_u32(name: &str, v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| ExportError::TooLarge { name: name.to_string() })
}

/// A single quantized tensor.
#[derive(Clone, Debug)]
pub struct QTensor {
    name: String,
    shape: Vec<usize>,
    scale: f32,
    weight: Vec<i8>,
}

impl QTensor {
    /// Quantize `t`; tensors holding NaN or infinity are rejected.
    pub fn from_array(name: &str, t: &ArrayD<f32>) -> Result<Self> {
        let (weight, scale) = quantize_tensor(name, t)?;
        Ok(Self {
            name: name.to_string(),
            shape: t.shape().to_vec(),
            scale,
            weight,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Multiplier turning a stored integer back into a weight.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn weight(&self) -> &[i8] {
        &self.weight
    }

    pub fn dequantize(&self) -> Result<ArrayD<f32>> {
        let data = self.weight.iter().map(|&q| q as f32 * self.scale).collect();
        ArrayD::from_shape_vec(IxDyn(&self.shape), data)
            .map_err(|e| ExportError::Malformed(format!("{}: {e}", self.name)))
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let name = self.name.as_bytes();
        w.write_all(&to_u32(&self.name, name.len())?.to_le_bytes())?;
        w.write_all(name)?;
        w.write_all(&to_u32(&self.name, self.shape.len())?.to_le_bytes())?;
        for &d in &self.shape {
            w.write_all(&to_u32(&self.name, d)?.to_le_bytes())?;
        }
        w.write_all(&self.scale.to_le_bytes())?;
        w.write_all(cast_slice(&self.weight))?;
        Ok(())
    }

    fn read_from(r: &mut Cursor<'_>) -> Result<Self> {
        let name_len = r.u32()? as usize;
        let name = std::str::from_utf8(r.take(name_len)?)
            .map_err(|_| ExportError::Malformed("tensor name is not UTF-8".into()))?
            .to_string();
        let ndim = r.u32()? as usize;
        let mut shape = Vec::with_capacity(ndim.min(8));
        for _ in 0..ndim {
            shape.push(r.u32()? as usize);
        }
        let numel = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| ExportError::Malformed(format!("{name}: shape overflows")))?;
        let scale = r.f32()?;
        let weight = cast_slice::<u8, i8>(r.take(numel)?).to_vec();
        Ok(Self { name, shape, scale, weight })
    }
}

/// Bounds checked reader over a byte buffer.
struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                ExportError::Malformed(format!("truncated at byte {} (wanted {n} more)", self.offset))
            })?;
        let bytes = &self.buf[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }
}

/// Write quantized tensors to `path`, replacing any existing file.
pub fn write_q8(path: &Path, tensors: &[QTensor]) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    f.write_all(&MAGIC)?;
    f.write_all(&VERSION.to_le_bytes())?;
    f.write_all(&to_u32("<archive>", tensors.len())?.to_le_bytes())?;
    for t in tensors {
        t.write_to(&mut f)?;
    }
    f.flush()?;
    Ok(())
}

/// Parsed q8 artifact.
#[derive(Clone, Debug)]
pub struct Q8Archive {
    tensors: Vec<QTensor>,
}

impl Q8Archive {
    /// Memory-map and parse an artifact.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(ExportError::Malformed("empty file".into()));
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Self::parse(&mmap[..])
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = Cursor { buf: bytes, offset: 0 };
        if r.array::<4>()? != MAGIC {
            return Err(ExportError::Malformed("bad magic".into()));
        }
        let version = r.u32()?;
        if version != VERSION {
            return Err(ExportError::Malformed(format!("unsupported version {version}")));
        }
        let count = r.u32()? as usize;
        let mut tensors = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            tensors.push(QTensor::read_from(&mut r)?);
        }
        if r.offset != bytes.len() {
            return Err(ExportError::Malformed(format!(
                "{} trailing bytes",
                bytes.len() - r.offset
            )));
        }
        Ok(Self { tensors })
    }

    pub fn tensors(&self) -> &[QTensor] {
        &self.tensors
    }

    pub fn get(&self, name: &str) -> Option<&QTensor> {
        self.tensors.iter().find(|t| t.name == name)
    }
}
