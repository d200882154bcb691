use crate::Node;
use crate::blueprint::check::{log_error, log_result, require_object, require_string};

/// Per-material species fractions layered over a matset.
pub fn verify(specset: &Node, info: &mut Node) -> bool {
    let proto = "specset";
    let mut res = require_string(specset, info, proto, "matset");
    if !require_object(specset, info, proto, "matset_values") {
        return log_result(info, false);
    }
    for (material, species) in specset.fetch("matset_values").object_iter() {
        if !species.is_object() || species.number_of_children() == 0 {
            log_error(
                info,
                proto,
                &format!("material {material:?} names no species"),
            );
            res = false;
            continue;
        }
        for (name, fractions) in species.object_iter() {
            if !fractions.is_number() {
                log_error(
                    info,
                    proto,
                    &format!("species {material:?}/{name:?} is not numeric"),
                );
                res = false;
            }
        }
    }
    log_result(info, res)
}
