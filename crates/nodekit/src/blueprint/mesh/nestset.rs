use crate::Node;
use crate::blueprint::check::{
    log_error, log_result, require_enum, require_integer, require_object, require_string,
};

use super::field::ASSOCIATIONS;

pub const DOMAIN_TYPES: &[&str] = &["parent", "child"];

/// AMR parent/child window descriptors between two domains at different
/// refinement levels.
pub fn verify(nestset: &Node, info: &mut Node) -> bool {
    let proto = "nestset";
    let mut res = require_string(nestset, info, proto, "topology");
    res &= require_enum(nestset, info, proto, "association", ASSOCIATIONS);
    if !require_object(nestset, info, proto, "windows") {
        return log_result(info, false);
    }
    for (name, window) in nestset.fetch("windows").object_iter() {
        if !window.is_object() {
            log_error(info, proto, &format!("window {name:?} is not an object"));
            res = false;
            continue;
        }
        res &= require_integer(window, info, proto, "domain_id");
        res &= require_enum(window, info, proto, "domain_type", DOMAIN_TYPES);
        for logical in ["ratio", "origin", "dims"] {
            if logical == "ratio" || window.has_child(logical) {
                if require_object(window, info, proto, logical) {
                    for axis in ["i", "j", "k"] {
                        if window.fetch(logical).has_child(axis) {
                            res &= require_integer(window.fetch(logical), info, proto, axis);
                        }
                    }
                } else {
                    res = false;
                }
            }
        }
    }
    log_result(info, res)
}
