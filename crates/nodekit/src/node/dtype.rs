use serde::{Deserialize, Serialize};

/// Closed set of element kinds a leaf (or interior node) can carry.
///
/// `Empty` is a node with no data, `Object` and `List` are interior kinds and
/// carry no numeric layout. Every other kind describes fixed-width elements.
#[repr(u8)]
#[derive(Debug, Eq, Hash, Copy, Clone, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataTypeId {
    Empty,
    Object,
    List,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Char8,
}

impl DataTypeId {
    pub fn name(&self) -> &'static str {
        use DataTypeId::*;
        match self {
            Empty => "empty",
            Object => "object",
            List => "list",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            UInt8 => "uint8",
            UInt16 => "uint16",
            UInt32 => "uint32",
            UInt64 => "uint64",
            Float32 => "float32",
            Float64 => "float64",
            Char8 => "char8",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use DataTypeId::*;
        Some(match name {
            "empty" => Empty,
            "object" => Object,
            "list" => List,
            "int8" => Int8,
            "int16" => Int16,
            "int32" => Int32,
            "int64" => Int64,
            "uint8" => UInt8,
            "uint16" => UInt16,
            "uint32" => UInt32,
            "uint64" => UInt64,
            "float32" => Float32,
            "float64" => Float64,
            "char8" => Char8,
            _ => return None,
        })
    }

    /// Width in bytes of one element; 0 for the non-leaf kinds.
    pub fn default_bytes(&self) -> usize {
        use DataTypeId::*;
        match self {
            Empty | Object | List => 0,
            Int8 | UInt8 | Char8 => 1,
            Int16 | UInt16 => 2,
            Int32 | UInt32 | Float32 => 4,
            Int64 | UInt64 | Float64 => 8,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DataTypeId::Empty)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, DataTypeId::Object)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, DataTypeId::List)
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, DataTypeId::Empty | DataTypeId::Object | DataTypeId::List)
    }

    pub fn is_signed_integer(&self) -> bool {
        use DataTypeId::*;
        matches!(self, Int8 | Int16 | Int32 | Int64)
    }

    pub fn is_unsigned_integer(&self) -> bool {
        use DataTypeId::*;
        matches!(self, UInt8 | UInt16 | UInt32 | UInt64)
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, DataTypeId::Float32 | DataTypeId::Float64)
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_floating_point()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataTypeId::Char8)
    }
}

/// Byte order of a leaf buffer. Recorded for collaborators; buffers are
/// always interpreted native-endian in memory.
#[derive(Debug, Eq, Hash, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn native() -> Self {
        #[cfg(target_endian = "little")]
        {
            Endianness::Little
        }
        #[cfg(target_endian = "big")]
        {
            Endianness::Big
        }
    }
}

impl Default for Endianness {
    fn default() -> Self {
        Self::native()
    }
}

/// Layout description of a single leaf: kind, element count, byte offset,
/// byte stride and per-element width. Pure description; owns nothing.
#[derive(Debug, Eq, Hash, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    id: DataTypeId,
    num_elements: usize,
    offset: usize,
    stride: usize,
    element_bytes: usize,
    endianness: Endianness,
}

impl DataType {
    pub fn new(
        id: DataTypeId,
        num_elements: usize,
        offset: usize,
        stride: usize,
        element_bytes: usize,
        endianness: Endianness,
    ) -> Self {
        if id.is_leaf() && stride < element_bytes {
            crate::fatal!(
                "invalid {} layout: stride ({stride}) is smaller than element width ({element_bytes})",
                id.name()
            );
        }
        Self {
            id,
            num_elements,
            offset,
            stride,
            element_bytes,
            endianness,
        }
    }

    /// Contiguous layout of `num_elements` elements of `id`, starting at 0.
    pub fn contiguous(id: DataTypeId, num_elements: usize) -> Self {
        let bytes = id.default_bytes();
        Self::new(id, num_elements, 0, bytes, bytes, Endianness::native())
    }

    /// Contiguous layout placed at `offset` with an explicit `stride`.
    pub fn with_layout(id: DataTypeId, num_elements: usize, offset: usize, stride: usize) -> Self {
        Self::new(
            id,
            num_elements,
            offset,
            stride,
            id.default_bytes(),
            Endianness::native(),
        )
    }

    pub fn empty() -> Self {
        Self {
            id: DataTypeId::Empty,
            num_elements: 0,
            offset: 0,
            stride: 0,
            element_bytes: 0,
            endianness: Endianness::native(),
        }
    }

    pub fn object() -> Self {
        Self {
            id: DataTypeId::Object,
            ..Self::empty()
        }
    }

    pub fn list() -> Self {
        Self {
            id: DataTypeId::List,
            ..Self::empty()
        }
    }

    pub fn int8(n: usize) -> Self {
        Self::contiguous(DataTypeId::Int8, n)
    }
    pub fn int16(n: usize) -> Self {
        Self::contiguous(DataTypeId::Int16, n)
    }
    pub fn int32(n: usize) -> Self {
        Self::contiguous(DataTypeId::Int32, n)
    }
    pub fn int64(n: usize) -> Self {
        Self::contiguous(DataTypeId::Int64, n)
    }
    pub fn uint8(n: usize) -> Self {
        Self::contiguous(DataTypeId::UInt8, n)
    }
    pub fn uint16(n: usize) -> Self {
        Self::contiguous(DataTypeId::UInt16, n)
    }
    pub fn uint32(n: usize) -> Self {
        Self::contiguous(DataTypeId::UInt32, n)
    }
    pub fn uint64(n: usize) -> Self {
        Self::contiguous(DataTypeId::UInt64, n)
    }
    pub fn float32(n: usize) -> Self {
        Self::contiguous(DataTypeId::Float32, n)
    }
    pub fn float64(n: usize) -> Self {
        Self::contiguous(DataTypeId::Float64, n)
    }
    pub fn char8(n: usize) -> Self {
        Self::contiguous(DataTypeId::Char8, n)
    }

    pub fn id(&self) -> DataTypeId {
        self.id
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn element_bytes(&self) -> usize {
        self.element_bytes
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Byte position of element `i` relative to the buffer start.
    pub fn element_index(&self, i: usize) -> usize {
        self.offset + i * self.stride
    }

    /// Bytes spanned by the elements alone, stride gaps included.
    pub fn strided_bytes(&self) -> usize {
        if self.num_elements == 0 {
            0
        } else {
            (self.num_elements - 1) * self.stride + self.element_bytes
        }
    }

    /// Bytes spanned from the buffer start through the last element.
    pub fn spanned_bytes(&self) -> usize {
        if self.num_elements == 0 {
            0
        } else {
            self.offset + self.strided_bytes()
        }
    }

    pub fn is_compact(&self) -> bool {
        !self.id.is_leaf() || self.stride == self.element_bytes
    }

    /// The same kind and count, laid out gaplessly at offset 0.
    pub fn compacted(&self) -> Self {
        if self.id.is_leaf() {
            Self::contiguous(self.id, self.num_elements)
        } else {
            *self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
    pub fn is_object(&self) -> bool {
        self.id.is_object()
    }
    pub fn is_list(&self) -> bool {
        self.id.is_list()
    }
    pub fn is_number(&self) -> bool {
        self.id.is_number()
    }
    pub fn is_integer(&self) -> bool {
        self.id.is_integer()
    }
    pub fn is_floating_point(&self) -> bool {
        self.id.is_floating_point()
    }
    pub fn is_string(&self) -> bool {
        self.id.is_string()
    }
}

impl Default for DataType {
    fn default() -> Self {
        Self::empty()
    }
}

/// Widest integer kind among `ids`, preferring signedness of the widest
/// operand; `Int32` when no integer kind is present.
pub fn widest_integer_id<I: IntoIterator<Item = DataTypeId>>(ids: I) -> DataTypeId {
    let mut widest = None;
    for id in ids {
        if !id.is_integer() {
            continue;
        }
        widest = match widest {
            None => Some(id),
            Some(cur) if id.default_bytes() > cur.default_bytes() => Some(id),
            Some(cur) => Some(cur),
        };
    }
    widest.unwrap_or(DataTypeId::Int32)
}

/// Widest floating kind among `ids`; `Float64` when none is present.
pub fn widest_float_id<I: IntoIterator<Item = DataTypeId>>(ids: I) -> DataTypeId {
    let mut widest = None;
    for id in ids {
        if !id.is_floating_point() {
            continue;
        }
        widest = match widest {
            None => Some(id),
            Some(cur) if id.default_bytes() > cur.default_bytes() => Some(id),
            Some(cur) => Some(cur),
        };
    }
    widest.unwrap_or(DataTypeId::Float64)
}

/// A Rust scalar type that can live in a leaf.
///
/// Conversion runs through one of two channels: an exact `i128` channel for
/// integer targets (narrowing truncates, signed/unsigned reinterprets the bit
/// pattern) and an `f64` channel for float targets (round to nearest).
pub trait LeafValue: Copy + PartialEq + std::fmt::Debug + 'static {
    const ID: DataTypeId;
    const IS_FLOAT: bool;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
    fn to_i128(self) -> i128;
    fn from_i128(v: i128) -> Self;
}

macro_rules! impl_leaf_int {
    ($t:ty, $id:expr) => {
        impl LeafValue for $t {
            const ID: DataTypeId = $id;
            const IS_FLOAT: bool = false;

            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as Self
            }
            fn to_i128(self) -> i128 {
                self as i128
            }
            fn from_i128(v: i128) -> Self {
                v as Self
            }
        }
    };
}

macro_rules! impl_leaf_float {
    ($t:ty, $id:expr) => {
        impl LeafValue for $t {
            const ID: DataTypeId = $id;
            const IS_FLOAT: bool = true;

            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as Self
            }
            fn to_i128(self) -> i128 {
                self.round() as i128
            }
            fn from_i128(v: i128) -> Self {
                v as Self
            }
        }
    };
}

impl_leaf_int!(i8, DataTypeId::Int8);
impl_leaf_int!(i16, DataTypeId::Int16);
impl_leaf_int!(i32, DataTypeId::Int32);
impl_leaf_int!(i64, DataTypeId::Int64);
impl_leaf_int!(u8, DataTypeId::UInt8);
impl_leaf_int!(u16, DataTypeId::UInt16);
impl_leaf_int!(u32, DataTypeId::UInt32);
impl_leaf_int!(u64, DataTypeId::UInt64);
impl_leaf_float!(f32, DataTypeId::Float32);
impl_leaf_float!(f64, DataTypeId::Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrip() {
        use DataTypeId::*;
        for id in [
            Empty, Object, List, Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64,
            Float32, Float64, Char8,
        ] {
            assert_eq!(DataTypeId::from_name(id.name()), Some(id));
        }
        assert_eq!(DataTypeId::from_name("int128"), None);
    }

    #[test]
    fn layout_math() {
        let dt = DataType::with_layout(DataTypeId::Int32, 4, 8, 12);
        assert_eq!(dt.element_index(0), 8);
        assert_eq!(dt.element_index(3), 8 + 3 * 12);
        assert_eq!(dt.strided_bytes(), 3 * 12 + 4);
        assert_eq!(dt.spanned_bytes(), 8 + 3 * 12 + 4);
        assert!(!dt.is_compact());
        assert_eq!(dt.compacted(), DataType::int32(4));
    }

    #[test]
    fn empty_leaf_is_permitted() {
        let dt = DataType::float64(0);
        assert_eq!(dt.num_elements(), 0);
        assert_eq!(dt.strided_bytes(), 0);
        assert_eq!(dt.spanned_bytes(), 0);
    }

    #[test]
    #[should_panic]
    fn stride_below_element_width_is_fatal() {
        let _ = DataType::new(
            DataTypeId::Int32,
            2,
            0,
            2,
            4,
            Endianness::native(),
        );
    }

    #[test]
    fn widest_helpers() {
        use DataTypeId::*;
        assert_eq!(widest_integer_id([Int16, UInt32, Int8]), UInt32);
        assert_eq!(widest_integer_id([Float32]), Int32);
        assert_eq!(widest_float_id([Float32, Float64]), Float64);
        assert_eq!(widest_float_id([Int8]), Float64);
    }
}
