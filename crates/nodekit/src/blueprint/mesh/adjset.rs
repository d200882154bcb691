use crate::Node;
use crate::blueprint::check::{
    log_error, log_result, require_enum, require_integer, require_object, require_string,
};

use super::field::ASSOCIATIONS;

/// Per-domain groups naming the neighboring domains and the shared
/// vertices or elements, in pairwise or max-share canonical form.
pub fn verify(adjset: &Node, info: &mut Node) -> bool {
    let proto = "adjset";
    let mut res = require_string(adjset, info, proto, "topology");
    res &= require_enum(adjset, info, proto, "association", ASSOCIATIONS);
    if !require_object(adjset, info, proto, "groups") {
        return log_result(info, false);
    }
    for (name, group) in adjset.fetch("groups").object_iter() {
        if !group.is_object() {
            log_error(info, proto, &format!("group {name:?} is not an object"));
            res = false;
            continue;
        }
        res &= require_integer(group, info, proto, "neighbors");
        if group.has_child("values") {
            res &= require_integer(group, info, proto, "values");
        } else if group.has_child("windows") {
            // Structured adjsets carry shared windows instead of id lists.
            res &= require_object(group, info, proto, "windows");
        } else {
            log_error(
                info,
                proto,
                &format!("group {name:?} carries neither \"values\" nor \"windows\""),
            );
            res = false;
        }
    }
    log_result(info, res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairwise_groups_verify() {
        let mut a = Node::new();
        a.fetch_mut("topology").set_string("mesh");
        a.fetch_mut("association").set_string("vertex");
        a.fetch_mut("groups/group_0_1/neighbors").set_slice(&[1i64]);
        a.fetch_mut("groups/group_0_1/values").set_slice(&[3i64, 7, 11]);
        let mut info = Node::new();
        assert!(verify(&a, &mut info));
    }

    #[test]
    fn groups_without_shared_ids_fail() {
        let mut a = Node::new();
        a.fetch_mut("topology").set_string("mesh");
        a.fetch_mut("association").set_string("element");
        a.fetch_mut("groups/g/neighbors").set_slice(&[2i64]);
        let mut info = Node::new();
        assert!(!verify(&a, &mut info));
        assert_eq!(info["valid"].as_string(), "false");
    }
}
