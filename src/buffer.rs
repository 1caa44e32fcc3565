use std::fmt;

use crate::ScalarType;

/// Rust scalar types that can be stored in a PLY property.
pub trait PlyScalar: Copy + PartialEq + fmt::Debug + 'static {
    const TYPE: ScalarType;

    /// Casts from the double precision intermediate used for type conversion.
    /// Out of range values saturate, NaN becomes zero for integer types.
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    fn wrap(values: Vec<Self>) -> ScalarBuffer;
    fn slice(buffer: &ScalarBuffer) -> Option<&[Self]>;
    fn unwrap(buffer: ScalarBuffer) -> Result<Vec<Self>, ScalarBuffer>;
}

macro_rules! impl_ply_scalar {
    ($t:ty, $variant:ident) => {
        impl PlyScalar for $t {
            const TYPE: ScalarType = ScalarType::$variant;

            fn from_f64(value: f64) -> Self {
                value as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn wrap(values: Vec<Self>) -> ScalarBuffer {
                ScalarBuffer::$variant(values)
            }

            fn slice(buffer: &ScalarBuffer) -> Option<&[Self]> {
                match buffer {
                    ScalarBuffer::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn unwrap(buffer: ScalarBuffer) -> Result<Vec<Self>, ScalarBuffer> {
                match buffer {
                    ScalarBuffer::$variant(values) => Ok(values),
                    other => Err(other),
                }
            }
        }
    };
}

impl_ply_scalar!(i8, I8);
impl_ply_scalar!(u8, U8);
impl_ply_scalar!(i16, I16);
impl_ply_scalar!(u16, U16);
impl_ply_scalar!(i32, I32);
impl_ply_scalar!(u32, U32);
impl_ply_scalar!(f32, F32);
impl_ply_scalar!(f64, F64);

/// A flat, typed buffer of scalars.
///
/// Used both for the data handed to the writer and for the data produced by
/// the reader. Records are laid out one after another, and within a record the
/// properties appear in the order of the descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarBuffer {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            ScalarBuffer::I8($values) => $body,
            ScalarBuffer::U8($values) => $body,
            ScalarBuffer::I16($values) => $body,
            ScalarBuffer::U16($values) => $body,
            ScalarBuffer::I32($values) => $body,
            ScalarBuffer::U32($values) => $body,
            ScalarBuffer::F32($values) => $body,
            ScalarBuffer::F64($values) => $body,
        }
    };
}
pub(crate) use dispatch;

impl ScalarBuffer {
    pub fn new(ty: ScalarType) -> Self {
        Self::with_capacity(ty, 0)
    }

    pub fn with_capacity(ty: ScalarType, capacity: usize) -> Self {
        match ty {
            ScalarType::I8 => ScalarBuffer::I8(Vec::with_capacity(capacity)),
            ScalarType::U8 => ScalarBuffer::U8(Vec::with_capacity(capacity)),
            ScalarType::I16 => ScalarBuffer::I16(Vec::with_capacity(capacity)),
            ScalarType::U16 => ScalarBuffer::U16(Vec::with_capacity(capacity)),
            ScalarType::I32 => ScalarBuffer::I32(Vec::with_capacity(capacity)),
            ScalarType::U32 => ScalarBuffer::U32(Vec::with_capacity(capacity)),
            ScalarType::F32 => ScalarBuffer::F32(Vec::with_capacity(capacity)),
            ScalarType::F64 => ScalarBuffer::F64(Vec::with_capacity(capacity)),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ScalarBuffer::I8(_) => ScalarType::I8,
            ScalarBuffer::U8(_) => ScalarType::U8,
            ScalarBuffer::I16(_) => ScalarType::I16,
            ScalarBuffer::U16(_) => ScalarType::U16,
            ScalarBuffer::I32(_) => ScalarType::I32,
            ScalarBuffer::U32(_) => ScalarType::U32,
            ScalarBuffer::F32(_) => ScalarType::F32,
            ScalarBuffer::F64(_) => ScalarType::F64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index` widened to `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        dispatch!(self, values => values.get(index).map(|v| PlyScalar::to_f64(*v)))
    }

    /// Appends `value`, cast to the type of this buffer.
    pub fn push_f64(&mut self, value: f64) {
        dispatch!(self, values => values.push(PlyScalar::from_f64(value)))
    }

    pub fn as_slice<T: PlyScalar>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Unwraps the underlying vector, handing the buffer back if `T` is not
    /// its element type.
    pub fn into_vec<T: PlyScalar>(self) -> Result<Vec<T>, Self> {
        T::unwrap(self)
    }
}

impl<T: PlyScalar> From<Vec<T>> for ScalarBuffer {
    fn from(values: Vec<T>) -> Self {
        T::wrap(values)
    }
}

/// Output of decoding one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    /// Requested property values, record after record, in descriptor order.
    pub data: ScalarBuffer,
    /// One count per record and requested list property, present when the
    /// descriptor requested at least one list property.
    pub list_counts: Option<ScalarBuffer>,
    /// Number of records in the element.
    pub count: usize,
}

impl DecodedBuffer {
    pub fn as_slice<T: PlyScalar>(&self) -> Option<&[T]> {
        self.data.as_slice()
    }

    pub fn list_counts_as<T: PlyScalar>(&self) -> Option<&[T]> {
        self.list_counts.as_ref()?.as_slice()
    }

    pub fn into_vec<T: PlyScalar>(self) -> Option<Vec<T>> {
        self.data.into_vec().ok()
    }
}
