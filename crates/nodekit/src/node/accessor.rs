use std::marker::PhantomData;

use derive_where::derive_where;

use super::dtype::{DataType, DataTypeId, LeafValue};

/// Converts between leaf scalar types.
///
/// Float targets go through `f64` (round to nearest on integer sources);
/// integer targets go through `i128`, which is exact for every integer kind,
/// truncates on narrowing and reinterprets the bit pattern across
/// signed/unsigned pairs of equal width.
pub(crate) fn convert<S: LeafValue, T: LeafValue>(v: S) -> T {
    if T::IS_FLOAT {
        T::from_f64(v.to_f64())
    } else {
        T::from_i128(v.to_i128())
    }
}

/// Non-owning strided view over a numeric leaf that coerces each element to
/// `T` on read.
#[derive_where(Clone, Copy, Debug)]
pub struct Accessor<'a, T: LeafValue> {
    base: *const u8,
    dtype: DataType,
    _marker: PhantomData<&'a [T]>,
}

impl<'a, T: LeafValue> Accessor<'a, T> {
    /// # Safety
    ///
    /// `base` must point to a buffer that holds the layout described by
    /// `dtype` and outlives `'a`.
    pub(crate) unsafe fn new(base: *const u8, dtype: DataType) -> Self {
        if !dtype.id().is_number() && !dtype.id().is_string() {
            crate::fatal!("cannot build a typed accessor over a {} node", dtype.id().name());
        }
        Self {
            base,
            dtype,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.dtype.num_elements()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn get(&self, i: usize) -> T {
        if i >= self.len() {
            crate::fatal!(
                "accessor index {i} out of range for {} elements of {}",
                self.len(),
                self.dtype.id().name()
            );
        }
        let at = self.dtype.element_index(i);
        unsafe { self.read_at(at) }
    }

    unsafe fn read_at(&self, at: usize) -> T {
        let p = unsafe { self.base.add(at) };
        use DataTypeId::*;
        unsafe {
            match self.dtype.id() {
                Int8 => convert(p.cast::<i8>().read_unaligned()),
                Int16 => convert(p.cast::<i16>().read_unaligned()),
                Int32 => convert(p.cast::<i32>().read_unaligned()),
                Int64 => convert(p.cast::<i64>().read_unaligned()),
                UInt8 | Char8 => convert(p.cast::<u8>().read_unaligned()),
                UInt16 => convert(p.cast::<u16>().read_unaligned()),
                UInt32 => convert(p.cast::<u32>().read_unaligned()),
                UInt64 => convert(p.cast::<u64>().read_unaligned()),
                Float32 => convert(p.cast::<f32>().read_unaligned()),
                Float64 => convert(p.cast::<f64>().read_unaligned()),
                Empty | Object | List => unreachable!(),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(|i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn scalar_reads_back_in_every_type() {
        let mut n = Node::new();
        n.set(10i8);
        assert_eq!(n.as_accessor::<i8>().get(0), 10i8);
        assert_eq!(n.as_accessor::<i16>().get(0), 10i16);
        assert_eq!(n.as_accessor::<i32>().get(0), 10i32);
        assert_eq!(n.as_accessor::<i64>().get(0), 10i64);
        assert_eq!(n.as_accessor::<u8>().get(0), 10u8);
        assert_eq!(n.as_accessor::<u16>().get(0), 10u16);
        assert_eq!(n.as_accessor::<u32>().get(0), 10u32);
        assert_eq!(n.as_accessor::<u64>().get(0), 10u64);
        assert_eq!(n.as_accessor::<f32>().get(0), 10.0f32);
        assert_eq!(n.as_accessor::<f64>().get(0), 10.0f64);
    }

    #[test]
    fn narrowing_truncates_and_sign_reinterprets() {
        let mut n = Node::new();
        n.set(300i16);
        assert_eq!(n.as_accessor::<u8>().get(0), 44u8);
        n.set(-1i8);
        assert_eq!(n.as_accessor::<u8>().get(0), 255u8);
    }

    #[test]
    fn float_to_int_rounds() {
        let mut n = Node::new();
        n.set(2.6f64);
        assert_eq!(n.as_accessor::<i32>().get(0), 3);
        n.set(-2.6f32);
        assert_eq!(n.as_accessor::<i64>().get(0), -3);
    }

    #[test]
    #[should_panic]
    fn out_of_range_is_fatal() {
        let mut n = Node::new();
        n.set_slice(&[1i32, 2, 3]);
        let acc = n.as_accessor::<i32>();
        let _ = acc.get(3);
    }
}
