use std::io::Write;
use std::marker::PhantomData;

use byteorder::ByteOrder;
use byteorder::WriteBytesExt;

use crate::buffer::dispatch;
use crate::{PlyError, ScalarBuffer, ScalarType};

pub struct BinValWriter<W: Write, E: ByteOrder> {
    writer: W,
    _endian: PhantomData<E>,
}

impl<W: Write, E: ByteOrder> BinValWriter<W, E> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            _endian: PhantomData,
        }
    }
}

pub struct AsciiValWriter<W: Write> {
    writer: W,
}

impl<W: Write> AsciiValWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }
}

pub trait ScalarWriter {
    fn write_i8(&mut self, val: i8) -> Result<(), PlyError>;
    fn write_u8(&mut self, val: u8) -> Result<(), PlyError>;
    fn write_i16(&mut self, val: i16) -> Result<(), PlyError>;
    fn write_u16(&mut self, val: u16) -> Result<(), PlyError>;
    fn write_i32(&mut self, val: i32) -> Result<(), PlyError>;
    fn write_u32(&mut self, val: u32) -> Result<(), PlyError>;
    fn write_f32(&mut self, val: f32) -> Result<(), PlyError>;
    fn write_f64(&mut self, val: f64) -> Result<(), PlyError>;

    fn write_row_end(&mut self) -> Result<(), PlyError>;

    /// Writes a list length as the count prefix type `ty`.
    fn write_count(&mut self, ty: ScalarType, count: usize) -> Result<(), PlyError> {
        let overflow = || PlyError::InvalidListCount(count as f64);
        match ty {
            ScalarType::I8 => self.write_i8(i8::try_from(count).map_err(|_| overflow())?),
            ScalarType::U8 => self.write_u8(u8::try_from(count).map_err(|_| overflow())?),
            ScalarType::I16 => self.write_i16(i16::try_from(count).map_err(|_| overflow())?),
            ScalarType::U16 => self.write_u16(u16::try_from(count).map_err(|_| overflow())?),
            ScalarType::I32 => self.write_i32(i32::try_from(count).map_err(|_| overflow())?),
            ScalarType::U32 => self.write_u32(u32::try_from(count).map_err(|_| overflow())?),
            ScalarType::F32 | ScalarType::F64 => Err(PlyError::InvalidListType(ty)),
        }
    }
}

impl<W: Write, E: ByteOrder> ScalarWriter for BinValWriter<W, E> {
    fn write_i8(&mut self, val: i8) -> Result<(), PlyError> {
        Ok(self.writer.write_i8(val)?)
    }

    fn write_u8(&mut self, val: u8) -> Result<(), PlyError> {
        Ok(self.writer.write_u8(val)?)
    }

    fn write_i16(&mut self, val: i16) -> Result<(), PlyError> {
        Ok(self.writer.write_i16::<E>(val)?)
    }

    fn write_u16(&mut self, val: u16) -> Result<(), PlyError> {
        Ok(self.writer.write_u16::<E>(val)?)
    }

    fn write_i32(&mut self, val: i32) -> Result<(), PlyError> {
        Ok(self.writer.write_i32::<E>(val)?)
    }

    fn write_u32(&mut self, val: u32) -> Result<(), PlyError> {
        Ok(self.writer.write_u32::<E>(val)?)
    }

    fn write_f32(&mut self, val: f32) -> Result<(), PlyError> {
        Ok(self.writer.write_f32::<E>(val)?)
    }

    fn write_f64(&mut self, val: f64) -> Result<(), PlyError> {
        Ok(self.writer.write_f64::<E>(val)?)
    }

    fn write_row_end(&mut self) -> Result<(), PlyError> {
        Ok(())
    }
}

impl<W: Write> ScalarWriter for AsciiValWriter<W> {
    fn write_i8(&mut self, val: i8) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_u8(&mut self, val: u8) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_i16(&mut self, val: i16) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_u16(&mut self, val: u16) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_i32(&mut self, val: i32) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_u32(&mut self, val: u32) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_f32(&mut self, val: f32) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_f64(&mut self, val: f64) -> Result<(), PlyError> {
        write!(self.writer, "{} ", val)?;
        Ok(())
    }

    fn write_row_end(&mut self) -> Result<(), PlyError> {
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Scalars that know which [`ScalarWriter`] method encodes them.
pub(crate) trait WriteScalar: Copy {
    fn write_with<S: ScalarWriter + ?Sized>(self, out: &mut S) -> Result<(), PlyError>;
}

macro_rules! impl_write_scalar {
    ($t:ty, $method:ident) => {
        impl WriteScalar for $t {
            fn write_with<S: ScalarWriter + ?Sized>(self, out: &mut S) -> Result<(), PlyError> {
                out.$method(self)
            }
        }
    };
}

impl_write_scalar!(i8, write_i8);
impl_write_scalar!(u8, write_u8);
impl_write_scalar!(i16, write_i16);
impl_write_scalar!(u16, write_u16);
impl_write_scalar!(i32, write_i32);
impl_write_scalar!(u32, write_u32);
impl_write_scalar!(f32, write_f32);
impl_write_scalar!(f64, write_f64);

/// Writes `count` values of `buffer` starting at `start`, in the buffer's own
/// type.
pub(crate) fn write_values<S: ScalarWriter + ?Sized>(
    out: &mut S,
    buffer: &ScalarBuffer,
    start: usize,
    count: usize,
) -> Result<(), PlyError> {
    dispatch!(buffer, values => {
        let values = values
            .get(start..start + count)
            .ok_or(PlyError::InvalidListCount(count as f64))?;
        values.iter().try_for_each(|value| value.write_with(out))
    })
}
