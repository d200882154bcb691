use crate::Node;
use crate::blueprint::check::{
    log_error, log_result, require_enum, require_string, verify_mcarray,
};

pub const ASSOCIATIONS: &[&str] = &["vertex", "element"];

/// Values live either directly on a topology (`values`) or per-material on
/// a matset (`matset_values`); the association is the entity the values
/// attach to, or a named basis.
pub fn verify(field: &Node, info: &mut Node) -> bool {
    let proto = "field";
    let mut res = true;

    let on_topology = field.has_child("topology");
    let on_matset = field.has_child("matset");
    if !on_topology && !on_matset {
        log_error(info, proto, "references neither a topology nor a matset");
        return log_result(info, false);
    }

    let has_association = field.has_child("association");
    let has_basis = field.has_child("basis");
    if has_association == has_basis {
        log_error(
            info,
            proto,
            "expected exactly one of \"association\" and \"basis\"",
        );
        res = false;
    } else if has_association {
        res &= require_enum(field, info, proto, "association", ASSOCIATIONS);
    } else {
        res &= require_string(field, info, proto, "basis");
    }

    if on_topology {
        res &= require_string(field, info, proto, "topology");
        res &= verify_values(field, info, proto, "values");
    }
    if on_matset {
        res &= require_string(field, info, proto, "matset");
        res &= verify_values(field, info, proto, "matset_values");
    }
    log_result(info, res)
}

/// A numeric array or an mcarray of components.
fn verify_values(field: &Node, info: &mut Node, proto: &str, name: &str) -> bool {
    match field.try_fetch(name) {
        Some(v) if v.is_number() => true,
        Some(v) if v.is_object() => verify_mcarray(v, info, proto),
        Some(_) => {
            log_error(info, proto, &format!("{name:?} is neither numeric nor an mcarray"));
            false
        }
        None => {
            log_error(info, proto, &format!("missing child {name:?}"));
            false
        }
    }
}
