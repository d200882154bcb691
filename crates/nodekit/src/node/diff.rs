use itertools::Itertools;

use super::core::Node;
use super::dtype::DataTypeId;

fn add_error(info: &mut Node, msg: &str) {
    info.fetch_mut("errors").append().set_string(msg);
}

fn mark(info: &mut Node, differ: bool) -> bool {
    info.fetch_mut("valid")
        .set_string(if differ { "false" } else { "true" });
    differ
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Kind {
    Empty,
    Object,
    List,
    Number,
    String,
}

fn kind_of(n: &Node) -> Kind {
    let id = n.dtype().id();
    match id {
        DataTypeId::Object => Kind::Object,
        DataTypeId::List => Kind::List,
        DataTypeId::Char8 => Kind::String,
        DataTypeId::Empty => Kind::Empty,
        _ => Kind::Number,
    }
}

impl Node {
    /// Compares two trees; `true` when they differ. Structural differences
    /// (missing children, kind or count mismatch) are unconditional; numeric
    /// leaves are compared element-wise with absolute tolerance `tol` after
    /// conversion to a common widest representation. `info` receives a
    /// parallel tree pinpointing each discrepancy.
    pub fn diff(&self, other: &Node, info: &mut Node, tol: f64) -> bool {
        diff_inner(self, other, info, tol, false)
    }

    /// As [`Node::diff`], with `tol` interpreted relative to the larger
    /// magnitude of each element pair.
    pub fn diff_relative(&self, other: &Node, info: &mut Node, tol: f64) -> bool {
        diff_inner(self, other, info, tol, true)
    }
}

fn diff_inner(a: &Node, b: &Node, info: &mut Node, tol: f64, relative: bool) -> bool {
    *info = Node::new();
    let (ka, kb) = (kind_of(a), kind_of(b));
    if ka != kb {
        // Signed/unsigned/float mixes all land in Number and are compared by
        // value below; everything else is a structural mismatch.
        add_error(
            info,
            &format!(
                "kind mismatch: {} vs {}",
                a.dtype().id().name(),
                b.dtype().id().name()
            ),
        );
        return mark(info, true);
    }
    let differ = match ka {
        Kind::Empty => false,
        Kind::Number => diff_numeric(a, b, info, tol, relative),
        Kind::String => {
            let (sa, sb) = (a.as_string(), b.as_string());
            if sa != sb {
                add_error(info, &format!("string mismatch: {sa:?} vs {sb:?}"));
                true
            } else {
                false
            }
        }
        Kind::Object => diff_object(a, b, info, tol, relative),
        Kind::List => diff_list(a, b, info, tol, relative),
    };
    mark(info, differ)
}

fn diff_numeric(a: &Node, b: &Node, info: &mut Node, tol: f64, relative: bool) -> bool {
    let (na, nb) = (a.number_of_elements(), b.number_of_elements());
    if na != nb {
        add_error(info, &format!("element count mismatch: {na} vs {nb}"));
        return true;
    }
    let both_integer = a.is_integer() && b.is_integer();
    let mut mismatches = 0usize;
    let mut first = None;
    for i in 0..na {
        let delta = if both_integer {
            let (va, vb) = (a.as_accessor::<i64>().get(i), b.as_accessor::<i64>().get(i));
            (va as f64 - vb as f64).abs()
        } else {
            let (va, vb) = (a.as_accessor::<f64>().get(i), b.as_accessor::<f64>().get(i));
            (va - vb).abs()
        };
        let bound = if relative {
            let (va, vb) = (a.as_accessor::<f64>().get(i), b.as_accessor::<f64>().get(i));
            tol * va.abs().max(vb.abs())
        } else {
            tol
        };
        if delta > bound {
            mismatches += 1;
            first.get_or_insert(i);
        }
    }
    if mismatches > 0 {
        add_error(
            info,
            &format!(
                "{mismatches} of {na} elements differ (first at index {})",
                first.unwrap()
            ),
        );
        return true;
    }
    false
}

fn diff_object(a: &Node, b: &Node, info: &mut Node, tol: f64, relative: bool) -> bool {
    let mut differ = false;
    let names: Vec<String> = a
        .child_names()
        .into_iter()
        .chain(b.child_names())
        .map(str::to_string)
        .unique()
        .collect();
    for name in &names {
        match (a.child(name), b.child(name)) {
            (Some(ca), Some(cb)) => {
                let child_info = info.fetch_mut("children").add_child(name);
                differ |= diff_inner(ca, cb, child_info, tol, relative);
            }
            (Some(_), None) => {
                add_error(info, &format!("child {name:?} missing from one side"));
                differ = true;
            }
            (None, Some(_)) => {
                add_error(info, &format!("child {name:?} missing from one side"));
                differ = true;
            }
            (None, None) => unreachable!(),
        }
    }
    differ
}

fn diff_list(a: &Node, b: &Node, info: &mut Node, tol: f64, relative: bool) -> bool {
    let (na, nb) = (a.number_of_children(), b.number_of_children());
    let mut differ = false;
    if na != nb {
        add_error(info, &format!("child count mismatch: {na} vs {nb}"));
        differ = true;
    }
    for i in 0..na.min(nb) {
        let child_info = info.fetch_mut("children").append();
        differ |= diff_inner(
            a.child_at(i).unwrap(),
            b.child_at(i).unwrap(),
            child_info,
            tol,
            relative,
        );
    }
    differ
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut n = Node::new();
        n.fetch_mut("a").set_slice(&[1i32, 2, 3]);
        n.fetch_mut("b/c").set_slice(&[1.0f64, 2.0]);
        n.fetch_mut("name").set_string("mesh");
        n
    }

    #[test]
    fn equal_trees_do_not_differ() {
        let a = sample();
        let b = sample();
        let mut info = Node::new();
        assert!(!a.diff(&b, &mut info, 0.0));
        assert_eq!(info["valid"].as_string(), "true");
    }

    #[test]
    fn diff_is_symmetric() {
        let a = sample();
        let mut b = sample();
        b.fetch_mut("b/c").set_slice(&[1.0f64, 2.5]);
        let mut info = Node::new();
        assert_eq!(a.diff(&b, &mut info, 0.0), b.diff(&a, &mut info, 0.0));
        let mut c = sample();
        c.remove_child("a");
        assert_eq!(a.diff(&c, &mut info, 0.0), c.diff(&a, &mut info, 0.0));
    }

    #[test]
    fn tolerance_masks_small_deviations() {
        let a = sample();
        let mut b = sample();
        b.fetch_mut("b/c").set_slice(&[1.0f64, 2.0 + 1e-9]);
        let mut info = Node::new();
        assert!(!a.diff(&b, &mut info, 1e-6));
        assert!(a.diff(&b, &mut info, 1e-12));
    }

    #[test]
    fn signed_unsigned_compare_by_value() {
        let mut a = Node::new();
        a.set_slice(&[1i32, 2, 3]);
        let mut b = Node::new();
        b.set_slice(&[1u8, 2, 3]);
        let mut info = Node::new();
        assert!(!a.diff(&b, &mut info, 0.0));
        b.set_slice(&[1u8, 2, 4]);
        assert!(a.diff(&b, &mut info, 0.0));
    }

    #[test]
    fn structural_difference_is_unconditional() {
        let a = sample();
        let mut b = sample();
        b.fetch_mut("extra").set(0u8);
        let mut info = Node::new();
        assert!(a.diff(&b, &mut info, f64::INFINITY));
        assert_eq!(info["valid"].as_string(), "false");
    }

    #[test]
    fn info_pinpoints_the_discrepancy() {
        let a = sample();
        let mut b = sample();
        b.fetch_mut("a").set_slice(&[1i32, 9, 3]);
        let mut info = Node::new();
        assert!(a.diff(&b, &mut info, 0.0));
        assert_eq!(info["children/a/valid"].as_string(), "false");
        assert_eq!(info["children/b/valid"].as_string(), "true");
    }

    #[test]
    fn relative_tolerance_scales_with_magnitude() {
        let mut a = Node::new();
        a.set(1000.0f64);
        let mut b = Node::new();
        b.set(1000.5f64);
        let mut info = Node::new();
        assert!(!a.diff_relative(&b, &mut info, 1e-3));
        assert!(a.diff_relative(&b, &mut info, 1e-7));
    }
}
