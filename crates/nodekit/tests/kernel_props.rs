//! Property tests over the container kernel: accessor coercion, set/get
//! round-trips and diff laws.

use nodekit::{DataTypeId, Node};
use proptest::prelude::*;

proptest! {
    #[test]
    fn small_scalars_read_back_in_every_arithmetic_type(v in 0i8..=100) {
        let mut n = Node::new();
        n.set(v);
        prop_assert_eq!(n.as_accessor::<i8>().get(0), v);
        prop_assert_eq!(n.as_accessor::<i16>().get(0), i16::from(v));
        prop_assert_eq!(n.as_accessor::<i32>().get(0), i32::from(v));
        prop_assert_eq!(n.as_accessor::<i64>().get(0), i64::from(v));
        prop_assert_eq!(n.as_accessor::<u8>().get(0), v as u8);
        prop_assert_eq!(n.as_accessor::<u16>().get(0), v as u16);
        prop_assert_eq!(n.as_accessor::<u32>().get(0), v as u32);
        prop_assert_eq!(n.as_accessor::<u64>().get(0), v as u64);
        prop_assert_eq!(n.as_accessor::<f32>().get(0), f32::from(v));
        prop_assert_eq!(n.as_accessor::<f64>().get(0), f64::from(v));
    }

    #[test]
    fn slice_roundtrip_is_exact(vals in proptest::collection::vec(any::<i64>(), 0..64)) {
        let mut n = Node::new();
        n.set_slice(&vals);
        prop_assert_eq!(n.as_slice::<i64>(), &vals[..]);
        prop_assert_eq!(n.to_vec::<i64>(), vals);
    }

    #[test]
    fn float_roundtrip_is_exact(vals in proptest::collection::vec(-1e12f64..1e12, 0..64)) {
        let mut n = Node::new();
        n.set_slice(&vals);
        prop_assert_eq!(n.as_slice::<f64>(), &vals[..]);
    }

    #[test]
    fn diff_of_a_tree_with_itself_is_false(vals in proptest::collection::vec(any::<i32>(), 1..32)) {
        let mut a = Node::new();
        a.fetch_mut("data").set_slice(&vals);
        a.fetch_mut("meta/name").set_string("field");
        let b = a.clone();
        let mut info = Node::new();
        prop_assert!(!a.diff(&b, &mut info, 0.0));
    }

    #[test]
    fn diff_is_symmetric(
        left in proptest::collection::vec(-1e6f64..1e6, 1..16),
        right in proptest::collection::vec(-1e6f64..1e6, 1..16),
    ) {
        let mut a = Node::new();
        a.fetch_mut("v").set_slice(&left);
        let mut b = Node::new();
        b.fetch_mut("v").set_slice(&right);
        let mut info = Node::new();
        prop_assert_eq!(a.diff(&b, &mut info, 1e-3), b.diff(&a, &mut info, 1e-3));
    }

    #[test]
    fn conversion_widening_preserves_values(vals in proptest::collection::vec(any::<i16>(), 1..32)) {
        let mut n = Node::new();
        n.set_slice(&vals);
        let wide = n.to_data_type(DataTypeId::Int64);
        let back: Vec<i64> = wide.to_vec();
        prop_assert_eq!(back, vals.iter().map(|&v| i64::from(v)).collect::<Vec<_>>());
    }

    #[test]
    fn text_roundtrip_preserves_arrays(vals in proptest::collection::vec(any::<i32>(), 0..32)) {
        let mut n = Node::new();
        n.fetch_mut("a").set_slice(&vals);
        let back = Node::parse(&n.to_json(), "json").unwrap();
        prop_assert_eq!(n, back);
    }
}
