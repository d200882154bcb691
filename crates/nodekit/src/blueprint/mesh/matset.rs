use crate::Node;
use crate::blueprint::check::{log_error, log_result, require_string};

/// Per-element material volume fractions. Two buffer layouts are accepted:
///
/// * *uni-buffer*: `volume_fractions` is one numeric array plus a
///   `material_map` naming each material's integer id; sparse forms add
///   `material_ids` (+ `sizes`/`offsets` one-to-many arrays), and either
///   element- or material-dominant ordering is permitted.
/// * *multi-buffer*: `volume_fractions` is an object with one numeric array
///   per material.
pub fn verify(matset: &Node, info: &mut Node) -> bool {
    let proto = "matset";
    let mut res = require_string(matset, info, proto, "topology");

    match matset.try_fetch("volume_fractions") {
        Some(vf) if vf.is_number() => {
            // Uni-buffer needs the material id mapping.
            match matset.try_fetch("material_map") {
                Some(map) if map.is_object() && map.number_of_children() > 0 => {
                    for (name, id) in map.object_iter() {
                        if !id.is_integer() {
                            log_error(
                                info,
                                proto,
                                &format!("material_map entry {name:?} is not an integer"),
                            );
                            res = false;
                        }
                    }
                }
                _ => {
                    log_error(info, proto, "uni-buffer form is missing \"material_map\"");
                    res = false;
                }
            }
            if matset.has_child("material_ids") && !matset.fetch("material_ids").is_integer() {
                log_error(info, proto, "\"material_ids\" is not an integer array");
                res = false;
            }
        }
        Some(vf) if vf.is_object() && vf.number_of_children() > 0 => {
            for (name, fractions) in vf.object_iter() {
                let per_material_ok = if fractions.is_number() {
                    true
                } else {
                    // Material-dominant sparse form: values plus element ids.
                    fractions.has_child("values")
                        && fractions.fetch("values").is_number()
                        && fractions.has_child("element_ids")
                        && fractions.fetch("element_ids").is_integer()
                };
                if !per_material_ok {
                    log_error(
                        info,
                        proto,
                        &format!("material {name:?} carries no usable fractions"),
                    );
                    res = false;
                }
            }
        }
        Some(_) => {
            log_error(info, proto, "\"volume_fractions\" is neither numeric nor an object");
            res = false;
        }
        None => {
            log_error(info, proto, "missing child \"volume_fractions\"");
            res = false;
        }
    }
    log_result(info, res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_buffer_form_verifies() {
        let mut m = Node::new();
        m.fetch_mut("topology").set_string("mesh");
        m.fetch_mut("volume_fractions/steel").set_slice(&[1.0f64, 0.5]);
        m.fetch_mut("volume_fractions/air").set_slice(&[0.0f64, 0.5]);
        let mut info = Node::new();
        assert!(verify(&m, &mut info));
    }

    #[test]
    fn uni_buffer_form_needs_material_map() {
        let mut m = Node::new();
        m.fetch_mut("topology").set_string("mesh");
        m.fetch_mut("volume_fractions").set_slice(&[1.0f64, 0.5, 0.5]);
        let mut info = Node::new();
        assert!(!verify(&m, &mut info));
        m.fetch_mut("material_map/steel").set(0i64);
        m.fetch_mut("material_map/air").set(1i64);
        assert!(verify(&m, &mut info));
    }

    #[test]
    fn material_dominant_sparse_form_verifies() {
        let mut m = Node::new();
        m.fetch_mut("topology").set_string("mesh");
        m.fetch_mut("volume_fractions/steel/values").set_slice(&[0.4f64, 0.6]);
        m.fetch_mut("volume_fractions/steel/element_ids").set_slice(&[0i64, 3]);
        let mut info = Node::new();
        assert!(verify(&m, &mut info));
    }
}
