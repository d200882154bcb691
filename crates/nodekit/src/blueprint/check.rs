//! Shared building blocks of the per-entity `verify` functions: structured
//! message logging into the caller's info tree plus field-presence and
//! field-kind checks.

use crate::Node;

pub(crate) fn log_error(info: &mut Node, protocol: &str, msg: &str) {
    info.fetch_mut("errors")
        .append()
        .set_string(&format!("{protocol}: {msg}"));
}

pub(crate) fn log_info(info: &mut Node, protocol: &str, msg: &str) {
    info.fetch_mut("info")
        .append()
        .set_string(&format!("{protocol}: {msg}"));
}

/// Records the verdict at this info level and passes it through.
pub(crate) fn log_result(info: &mut Node, valid: bool) -> bool {
    info.fetch_mut("valid")
        .set_string(if valid { "true" } else { "false" });
    valid
}

pub(crate) fn require_string(node: &Node, info: &mut Node, protocol: &str, field: &str) -> bool {
    match node.try_fetch(field) {
        Some(c) if c.is_string() => true,
        Some(_) => {
            log_error(info, protocol, &format!("{field:?} is not a string"));
            false
        }
        None => {
            log_error(info, protocol, &format!("missing child {field:?}"));
            false
        }
    }
}

pub(crate) fn require_number(node: &Node, info: &mut Node, protocol: &str, field: &str) -> bool {
    match node.try_fetch(field) {
        Some(c) if c.is_number() => true,
        Some(_) => {
            log_error(info, protocol, &format!("{field:?} is not numeric"));
            false
        }
        None => {
            log_error(info, protocol, &format!("missing child {field:?}"));
            false
        }
    }
}

pub(crate) fn require_integer(node: &Node, info: &mut Node, protocol: &str, field: &str) -> bool {
    match node.try_fetch(field) {
        Some(c) if c.is_integer() => true,
        Some(_) => {
            log_error(info, protocol, &format!("{field:?} is not an integer array"));
            false
        }
        None => {
            log_error(info, protocol, &format!("missing child {field:?}"));
            false
        }
    }
}

pub(crate) fn require_object(node: &Node, info: &mut Node, protocol: &str, field: &str) -> bool {
    match node.try_fetch(field) {
        Some(c) if c.is_object() && c.number_of_children() > 0 => true,
        Some(_) => {
            log_error(info, protocol, &format!("{field:?} is not a non-empty object"));
            false
        }
        None => {
            log_error(info, protocol, &format!("missing child {field:?}"));
            false
        }
    }
}

/// A string field whose value must come from `allowed`.
pub(crate) fn require_enum(
    node: &Node,
    info: &mut Node,
    protocol: &str,
    field: &str,
    allowed: &[&str],
) -> bool {
    if !require_string(node, info, protocol, field) {
        return false;
    }
    let value = node.fetch(field).as_string();
    if allowed.contains(&value.as_str()) {
        true
    } else {
        log_error(
            info,
            protocol,
            &format!("{field:?} has unknown value {value:?} (expected one of {allowed:?})"),
        );
        false
    }
}

/// A multi-component array: sibling numeric leaves of equal length.
pub(crate) fn verify_mcarray(node: &Node, info: &mut Node, protocol: &str) -> bool {
    if !node.is_object() || node.number_of_children() == 0 {
        log_error(info, protocol, "mcarray is not a non-empty object");
        return false;
    }
    let mut length = None;
    for (name, comp) in node.object_iter() {
        if !comp.is_number() {
            log_error(info, protocol, &format!("component {name:?} is not numeric"));
            return false;
        }
        let n = comp.number_of_elements();
        match length {
            None => length = Some(n),
            Some(expected) if expected != n => {
                log_error(
                    info,
                    protocol,
                    &format!("component {name:?} has {n} elements, expected {expected}"),
                );
                return false;
            }
            Some(_) => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcarray_requires_equal_lengths() {
        let mut values = Node::new();
        values.fetch_mut("x").set_slice(&[0.0f64, 1.0]);
        values.fetch_mut("y").set_slice(&[2.0f64, 3.0]);
        let mut info = Node::new();
        assert!(verify_mcarray(&values, &mut info, "mcarray"));
        values.fetch_mut("y").set_slice(&[2.0f64]);
        assert!(!verify_mcarray(&values, &mut info, "mcarray"));
    }

    #[test]
    fn enum_check_reports_unknown_values() {
        let mut n = Node::new();
        n.fetch_mut("type").set_string("uniform");
        let mut info = Node::new();
        assert!(require_enum(&n, &mut info, "coordset", "type", &["uniform", "explicit"]));
        assert!(!require_enum(&n, &mut info, "coordset", "type", &["explicit"]));
        assert!(info.has_path("errors"));
    }
}
