use std::cmp::Ordering;
use std::marker::PhantomData;

use byteorder::ByteOrder;

use crate::{PlyError, ScalarBuffer, ScalarType};

/// Random access to the scalars of one record source.
///
/// Positions are byte offsets for binary data and token indices for ASCII
/// data; `width` tells how many positions a scalar of a given type occupies.
pub(crate) trait ScalarReader {
    fn width(&self, ty: ScalarType) -> usize;

    /// Reads the scalar of type `ty` at `pos`, widened to `f64`.
    fn read_scalar(&self, ty: ScalarType, pos: usize) -> Result<f64, PlyError>;

    /// Appends `n` consecutive scalars of type `ty` starting at `pos` to `out`,
    /// casting to the type of `out` when it differs.
    fn read_into(
        &self,
        ty: ScalarType,
        pos: usize,
        n: usize,
        out: &mut ScalarBuffer,
    ) -> Result<(), PlyError>;

    /// Checks a record walk that stopped at `end` against the available data.
    fn check_end(&self, end: usize) -> Result<(), PlyError>;

    /// Error for a position past the end of the record source.
    fn out_of_range(&self) -> PlyError;

    fn read_count(&self, ty: ScalarType, pos: usize) -> Result<usize, PlyError> {
        to_count(self.read_scalar(ty, pos)?)
    }
}

pub(crate) struct BinValReader<'a, E: ByteOrder> {
    bytes: &'a [u8],
    element: &'a str,
    _endian: PhantomData<E>,
}

impl<'a, E: ByteOrder> BinValReader<'a, E> {
    pub(crate) fn new(bytes: &'a [u8], element: &'a str) -> Self {
        Self {
            bytes,
            element,
            _endian: PhantomData,
        }
    }

    fn field(&self, pos: usize, len: usize) -> Result<&'a [u8], PlyError> {
        pos.checked_add(len)
            .and_then(|end| self.bytes.get(pos..end))
            .ok_or_else(|| self.out_of_range())
    }
}

impl<E: ByteOrder> ScalarReader for BinValReader<'_, E> {
    fn width(&self, ty: ScalarType) -> usize {
        ty.size_bytes()
    }

    fn read_scalar(&self, ty: ScalarType, pos: usize) -> Result<f64, PlyError> {
        Ok(decode_scalar::<E>(ty, self.field(pos, ty.size_bytes())?))
    }

    fn read_into(
        &self,
        ty: ScalarType,
        pos: usize,
        n: usize,
        out: &mut ScalarBuffer,
    ) -> Result<(), PlyError> {
        let size = ty.size_bytes();
        let len = n.checked_mul(size).ok_or_else(|| self.out_of_range())?;
        let bytes = self.field(pos, len)?;
        if out.scalar_type() == ty {
            extend_encoded::<E>(out, bytes);
        } else {
            for chunk in bytes.chunks_exact(size) {
                out.push_f64(decode_scalar::<E>(ty, chunk));
            }
        }
        Ok(())
    }

    fn check_end(&self, end: usize) -> Result<(), PlyError> {
        if end > self.bytes.len() {
            return Err(self.out_of_range());
        }
        Ok(())
    }

    fn out_of_range(&self) -> PlyError {
        PlyError::BinaryParse(self.element.to_string())
    }
}

/// Whitespace separated tokens of one ASCII record line.
pub(crate) struct AsciiValReader<'a> {
    tokens: &'a [&'a str],
    element: &'a str,
}

impl<'a> AsciiValReader<'a> {
    pub(crate) fn new(tokens: &'a [&'a str], element: &'a str) -> Self {
        Self { tokens, element }
    }
}

impl ScalarReader for AsciiValReader<'_> {
    fn width(&self, _ty: ScalarType) -> usize {
        1
    }

    fn read_scalar(&self, ty: ScalarType, pos: usize) -> Result<f64, PlyError> {
        let token = self.tokens.get(pos).ok_or(PlyError::NoPropertyFound)?;
        parse_token(ty, token)
    }

    fn read_into(
        &self,
        ty: ScalarType,
        pos: usize,
        n: usize,
        out: &mut ScalarBuffer,
    ) -> Result<(), PlyError> {
        let end = pos.checked_add(n).ok_or_else(|| self.out_of_range())?;
        for idx in pos..end {
            out.push_f64(self.read_scalar(ty, idx)?);
        }
        Ok(())
    }

    fn check_end(&self, end: usize) -> Result<(), PlyError> {
        match end.cmp(&self.tokens.len()) {
            Ordering::Equal => Ok(()),
            Ordering::Greater => Err(self.out_of_range()),
            Ordering::Less => Err(PlyError::TooManyValues(self.element.to_string())),
        }
    }

    fn out_of_range(&self) -> PlyError {
        PlyError::NoPropertyFound
    }
}

/// Parses a token as the declared type of its property.
pub(crate) fn parse_token(ty: ScalarType, token: &str) -> Result<f64, PlyError> {
    Ok(match ty {
        ScalarType::I8 => token.parse::<i8>()? as f64,
        ScalarType::U8 => token.parse::<u8>()? as f64,
        ScalarType::I16 => token.parse::<i16>()? as f64,
        ScalarType::U16 => token.parse::<u16>()? as f64,
        ScalarType::I32 => token.parse::<i32>()? as f64,
        ScalarType::U32 => token.parse::<u32>()? as f64,
        ScalarType::F32 => token.parse::<f32>()? as f64,
        ScalarType::F64 => token.parse::<f64>()?,
    })
}

/// Decodes one scalar. `bytes` must hold exactly `ty.size_bytes()` bytes.
pub(crate) fn decode_scalar<E: ByteOrder>(ty: ScalarType, bytes: &[u8]) -> f64 {
    match ty {
        ScalarType::I8 => bytes[0] as i8 as f64,
        ScalarType::U8 => bytes[0] as f64,
        ScalarType::I16 => E::read_i16(bytes) as f64,
        ScalarType::U16 => E::read_u16(bytes) as f64,
        ScalarType::I32 => E::read_i32(bytes) as f64,
        ScalarType::U32 => E::read_u32(bytes) as f64,
        ScalarType::F32 => E::read_f32(bytes) as f64,
        ScalarType::F64 => E::read_f64(bytes),
    }
}

/// Appends encoded scalars of the buffer's own type, swapping bytes from `E`
/// to host order. Trailing bytes that do not form a whole scalar are ignored.
pub(crate) fn extend_encoded<E: ByteOrder>(out: &mut ScalarBuffer, bytes: &[u8]) {
    match out {
        ScalarBuffer::I8(values) => values.extend(bytes.iter().map(|&b| b as i8)),
        ScalarBuffer::U8(values) => values.extend_from_slice(bytes),
        ScalarBuffer::I16(values) => extend_with(values, bytes, E::read_i16_into),
        ScalarBuffer::U16(values) => extend_with(values, bytes, E::read_u16_into),
        ScalarBuffer::I32(values) => extend_with(values, bytes, E::read_i32_into),
        ScalarBuffer::U32(values) => extend_with(values, bytes, E::read_u32_into),
        ScalarBuffer::F32(values) => extend_with(values, bytes, E::read_f32_into),
        ScalarBuffer::F64(values) => extend_with(values, bytes, E::read_f64_into),
    }
}

fn extend_with<T: Copy + Default>(
    values: &mut Vec<T>,
    bytes: &[u8],
    read_into: fn(&[u8], &mut [T]),
) {
    let n = bytes.len() / std::mem::size_of::<T>();
    let start = values.len();
    values.resize(start + n, T::default());
    read_into(&bytes[..n * std::mem::size_of::<T>()], &mut values[start..]);
}

/// List counts must be non-negative integers no larger than `u32::MAX`, even
/// when declared as floats.
pub(crate) fn to_count(value: f64) -> Result<usize, PlyError> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(PlyError::InvalidListCount(value));
    }
    Ok(value as usize)
}
