// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{pad_to_alignment, ByteOrder};

/// Fixed-width numeric type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl NumericType {
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }
}

/// One element of a declarative record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSpec {
    Field { name: &'static str, ty: NumericType },
    Padding(usize),
}

impl FieldSpec {
    pub const fn field(name: &'static str, ty: NumericType) -> Self {
        Self::Field { name, ty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("no field named {0:?} in record layout")]
    UnknownField(&'static str),

    #[error("field {name:?} has type {ty:?}, which can't be accessed as {wanted}")]
    TypeMismatch {
        name: &'static str,
        ty: NumericType,
        wanted: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldPosition {
    name: &'static str,
    ty: NumericType,
    offset: usize,
}

/// Fixed-stride record layout computed from a list of [FieldSpec]s.
///
/// Fields are laid out back to back in declaration order; the stride
/// is optionally rounded up to an alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    fields: Vec<FieldPosition>,
    stride: usize,
    byte_order: ByteOrder,
}

impl RecordLayout {
    pub fn new(specs: &[FieldSpec], byte_order: ByteOrder, alignment: Option<usize>) -> Self {
        let mut fields = Vec::with_capacity(specs.len());
        let mut offset = 0;

        for spec in specs {
            match *spec {
                FieldSpec::Field { name, ty } => {
                    fields.push(FieldPosition { name, ty, offset });
                    offset += ty.width();
                }
                FieldSpec::Padding(n) => offset += n,
            }
        }

        let stride = match alignment {
            Some(a) => pad_to_alignment(offset, a),
            None => offset,
        };

        Self {
            fields,
            stride,
            byte_order,
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Returns the number of whole records in a section of `len` bytes.
    #[inline]
    pub fn count(&self, len: usize) -> usize {
        if self.stride == 0 {
            0
        } else {
            len / self.stride
        }
    }

    /// Returns the byte offset of a field within a record.
    pub fn offset(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.offset)
    }

    fn position(&self, name: &'static str) -> Result<FieldPosition, LayoutError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .copied()
            .ok_or(LayoutError::UnknownField(name))
    }

    fn column<T>(
        &self,
        name: &'static str,
        wanted: &'static str,
        pick: fn(NumericType, ByteOrder) -> Option<fn(&[u8]) -> T>,
    ) -> Result<Column<T>, LayoutError> {
        let pos = self.position(name)?;
        let read = pick(pos.ty, self.byte_order).ok_or(LayoutError::TypeMismatch {
            name,
            ty: pos.ty,
            wanted,
        })?;
        Ok(Column {
            offset: pos.offset,
            stride: self.stride,
            read,
        })
    }

    /// Creates a reader of an unsigned integer field, widened to u64.
    pub fn unsigned(&self, name: &'static str) -> Result<Column<u64>, LayoutError> {
        self.column(name, "unsigned", unsigned_reader)
    }

    /// Creates a reader of a signed integer field, widened to i64.
    pub fn signed(&self, name: &'static str) -> Result<Column<i64>, LayoutError> {
        self.column(name, "signed", signed_reader)
    }

    /// Creates a reader of a floating-point field, widened to f64.
    pub fn float(&self, name: &'static str) -> Result<Column<f64>, LayoutError> {
        self.column(name, "float", float_reader)
    }

    /// Creates a writer of any field.
    pub fn writer(&self, name: &'static str) -> Result<FieldWriter, LayoutError> {
        let pos = self.position(name)?;
        Ok(FieldWriter {
            name,
            ty: pos.ty,
            offset: pos.offset,
            stride: self.stride,
            byte_order: self.byte_order,
        })
    }
}

/// Strided reader of a single record field.
///
/// The decoding function is resolved once, when the column is created,
/// for the field's concrete type and byte order.
/// Reads past the end of the section panic; callers must stay within
/// the section's record count.
pub struct Column<T> {
    offset: usize,
    stride: usize,
    read: fn(&[u8]) -> T,
}

impl<T> Column<T> {
    #[inline]
    pub fn get(&self, data: &[u8], index: usize) -> T {
        (self.read)(&data[index * self.stride + self.offset..])
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> std::fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("offset", &self.offset)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

/// Strided writer of a single record field. Values are converted
/// to the field's type with `as` casts.
#[derive(Debug, Clone, Copy)]
pub struct FieldWriter {
    name: &'static str,
    ty: NumericType,
    offset: usize,
    stride: usize,
    byte_order: ByteOrder,
}

impl FieldWriter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn put_unsigned(&self, data: &mut [u8], index: usize, value: u64) {
        self.put(data, index, Value::Unsigned(value))
    }

    pub fn put_signed(&self, data: &mut [u8], index: usize, value: i64) {
        self.put(data, index, Value::Signed(value))
    }

    pub fn put_float(&self, data: &mut [u8], index: usize, value: f64) {
        self.put(data, index, Value::Float(value))
    }

    fn put(&self, data: &mut [u8], index: usize, value: Value) {
        let at = index * self.stride + self.offset;
        let o = self.byte_order;
        match self.ty {
            NumericType::U8 => data[at] = value.as_u64() as u8,
            NumericType::I8 => data[at] = value.as_i64() as i8 as u8,
            NumericType::U16 => o.put_u16(data, at, value.as_u64() as u16),
            NumericType::U32 => o.put_u32(data, at, value.as_u64() as u32),
            NumericType::U64 => o.put_u64(data, at, value.as_u64()),
            NumericType::I16 => o.put_i16(data, at, value.as_i64() as i16),
            NumericType::I32 => o.put_i32(data, at, value.as_i64() as i32),
            NumericType::I64 => o.put_i64(data, at, value.as_i64()),
            NumericType::F32 => o.put_f32(data, at, value.as_f64() as f32),
            NumericType::F64 => o.put_f64(data, at, value.as_f64()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl Value {
    fn as_u64(self) -> u64 {
        match self {
            Self::Unsigned(v) => v,
            Self::Signed(v) => v as u64,
            Self::Float(v) => v as u64,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Self::Unsigned(v) => v as i64,
            Self::Signed(v) => v,
            Self::Float(v) => v as i64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Unsigned(v) => v as f64,
            Self::Signed(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

macro_rules! reader {
    ($t:ty, $n:expr, $from:ident, $out:ty) => {
        (|b: &[u8]| {
            let mut bytes = [0u8; $n];
            bytes.copy_from_slice(&b[..$n]);
            <$t>::$from(bytes) as $out
        }) as fn(&[u8]) -> $out
    };
}

fn unsigned_reader(ty: NumericType, order: ByteOrder) -> Option<fn(&[u8]) -> u64> {
    use ByteOrder::*;
    Some(match (ty, order) {
        (NumericType::U8, _) => (|b: &[u8]| b[0] as u64) as fn(&[u8]) -> u64,
        (NumericType::U16, LittleEndian) => reader!(u16, 2, from_le_bytes, u64),
        (NumericType::U16, BigEndian) => reader!(u16, 2, from_be_bytes, u64),
        (NumericType::U32, LittleEndian) => reader!(u32, 4, from_le_bytes, u64),
        (NumericType::U32, BigEndian) => reader!(u32, 4, from_be_bytes, u64),
        (NumericType::U64, LittleEndian) => reader!(u64, 8, from_le_bytes, u64),
        (NumericType::U64, BigEndian) => reader!(u64, 8, from_be_bytes, u64),
        _ => return None,
    })
}

fn signed_reader(ty: NumericType, order: ByteOrder) -> Option<fn(&[u8]) -> i64> {
    use ByteOrder::*;
    Some(match (ty, order) {
        (NumericType::I8, _) => (|b: &[u8]| b[0] as i8 as i64) as fn(&[u8]) -> i64,
        (NumericType::I16, LittleEndian) => reader!(i16, 2, from_le_bytes, i64),
        (NumericType::I16, BigEndian) => reader!(i16, 2, from_be_bytes, i64),
        (NumericType::I32, LittleEndian) => reader!(i32, 4, from_le_bytes, i64),
        (NumericType::I32, BigEndian) => reader!(i32, 4, from_be_bytes, i64),
        (NumericType::I64, LittleEndian) => reader!(i64, 8, from_le_bytes, i64),
        (NumericType::I64, BigEndian) => reader!(i64, 8, from_be_bytes, i64),
        _ => return None,
    })
}

fn float_reader(ty: NumericType, order: ByteOrder) -> Option<fn(&[u8]) -> f64> {
    use ByteOrder::*;
    Some(match (ty, order) {
        (NumericType::F32, LittleEndian) => reader!(f32, 4, from_le_bytes, f64),
        (NumericType::F32, BigEndian) => reader!(f32, 4, from_be_bytes, f64),
        (NumericType::F64, LittleEndian) => reader!(f64, 8, from_le_bytes, f64),
        (NumericType::F64, BigEndian) => reader!(f64, 8, from_be_bytes, f64),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[FieldSpec] = &[
        FieldSpec::field("count", NumericType::U16),
        FieldSpec::Padding(2),
        FieldSpec::field("length", NumericType::F32),
        FieldSpec::field("id", NumericType::I64),
        FieldSpec::field("flag", NumericType::U8),
    ];

    #[test]
    fn offsets_and_stride() {
        let layout = RecordLayout::new(SPECS, ByteOrder::LittleEndian, Some(8));
        assert_eq!(layout.offset("count"), Some(0));
        assert_eq!(layout.offset("length"), Some(4));
        assert_eq!(layout.offset("id"), Some(8));
        assert_eq!(layout.offset("flag"), Some(16));
        assert_eq!(layout.offset("nope"), None);
        assert_eq!(layout.stride(), 24);

        let unpadded = RecordLayout::new(SPECS, ByteOrder::LittleEndian, None);
        assert_eq!(unpadded.stride(), 17);
    }

    #[test]
    fn write_then_read() {
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let layout = RecordLayout::new(SPECS, order, Some(8));
            let mut data = vec![0u8; layout.stride() * 3];

            for i in 0..3 {
                layout.writer("count").unwrap().put_unsigned(&mut data, i, 100 + i as u64);
                layout.writer("length").unwrap().put_float(&mut data, i, 1.5 * i as f64);
                layout.writer("id").unwrap().put_signed(&mut data, i, -(i as i64) - 1);
                layout.writer("flag").unwrap().put_unsigned(&mut data, i, 1);
            }

            let count = layout.unsigned("count").unwrap();
            let length = layout.float("length").unwrap();
            let id = layout.signed("id").unwrap();

            assert_eq!(layout.count(data.len()), 3);
            for i in 0..3 {
                assert_eq!(count.get(&data, i), 100 + i as u64);
                assert_eq!(length.get(&data, i), 1.5 * i as f64);
                assert_eq!(id.get(&data, i), -(i as i64) - 1);
            }
        }
    }

    #[test]
    fn columns_are_copied() {
        let layout = RecordLayout::new(SPECS, ByteOrder::LittleEndian, Some(8));
        let mut data = vec![0u8; layout.stride() * 2];
        layout.writer("id").unwrap().put_signed(&mut data, 1, 42);

        let id = layout.signed("id").unwrap();
        let copy = id;
        assert_eq!(id.get(&data, 1), copy.get(&data, 1));
        assert!(format!("{:?}", copy).starts_with("Column { offset: 8, stride: 24"));
    }

    #[test]
    fn big_endian_bytes() {
        let layout = RecordLayout::new(SPECS, ByteOrder::BigEndian, Some(8));
        let mut data = vec![0u8; layout.stride()];
        layout.writer("count").unwrap().put_unsigned(&mut data, 0, 0x0102);
        assert_eq!(&data[0..2], &[1, 2]);
    }

    #[test]
    fn accessor_errors() {
        let layout = RecordLayout::new(SPECS, ByteOrder::LittleEndian, Some(8));
        assert_eq!(
            layout.unsigned("missing").unwrap_err(),
            LayoutError::UnknownField("missing"),
        );
        assert!(matches!(
            layout.float("count"),
            Err(LayoutError::TypeMismatch { name: "count", .. }),
        ));
    }
}
