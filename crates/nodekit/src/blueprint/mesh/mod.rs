//! The mesh protocol: per-entity verification, conversion between coordset
//! and topology flavors, derived-topology generation and partitioning.

pub mod adjset;
pub mod coordset;
pub mod field;
pub mod generate;
pub mod index;
pub mod matset;
pub mod nestset;
pub mod partition;
pub mod shape;
pub mod specset;
pub mod topology;
pub mod topology_metadata;

pub use shape::ShapeType;
pub use topology_metadata::TopologyMetadata;

use crate::Node;
use crate::blueprint::check::{log_error, log_info, log_result};

/// Whether a tree is a multi-domain parent: an object or list whose
/// children are each single-domain meshes.
pub fn is_multi_domain(mesh: &Node) -> bool {
    (mesh.is_object() || mesh.is_list())
        && mesh.number_of_children() > 0
        && !mesh.has_child("coordsets")
        && mesh.children().all(|c| c.has_child("coordsets"))
}

/// Domains of a single- or multi-domain tree, in order.
pub fn domains(mesh: &Node) -> Vec<&Node> {
    if is_multi_domain(mesh) {
        mesh.children().collect()
    } else if mesh.is_empty() {
        Vec::new()
    } else {
        vec![mesh]
    }
}

pub fn domains_mut(mesh: &mut Node) -> Vec<&mut Node> {
    if is_multi_domain(mesh) {
        mesh.children_mut().collect()
    } else if mesh.is_empty() {
        Vec::new()
    } else {
        vec![mesh]
    }
}

/// Verifies a single- or multi-domain mesh. An empty tree is a valid
/// (empty) mesh.
pub fn verify(mesh: &Node, info: &mut Node) -> bool {
    let proto = "mesh";
    if mesh.is_empty() {
        log_info(info, proto, "tree is an empty mesh");
        return log_result(info, true);
    }
    if is_multi_domain(mesh) {
        let mut res = true;
        let named: Vec<(String, &Node)> = if mesh.is_object() {
            mesh.object_iter()
                .map(|(n, c)| (n.to_string(), c))
                .collect()
        } else {
            mesh.children()
                .enumerate()
                .map(|(i, c)| (i.to_string(), c))
                .collect()
        };
        for (name, domain) in named {
            let domain_info = info.fetch_mut("domains").add_child(&name);
            res &= verify_single_domain(domain, domain_info);
        }
        return log_result(info, res);
    }
    let res = verify_single_domain(mesh, info);
    log_result(info, res)
}

/// Verifies one domain: entity subtrees plus the references between them.
pub fn verify_single_domain(mesh: &Node, info: &mut Node) -> bool {
    let proto = "mesh";
    let mut res = true;

    if !mesh.has_child("coordsets") || mesh.fetch("coordsets").number_of_children() == 0 {
        log_error(info, proto, "missing non-empty child \"coordsets\"");
        res = false;
    } else {
        for (name, cset) in mesh.fetch("coordsets").object_iter() {
            let child_info = info.fetch_mut("coordsets").add_child(name);
            res &= coordset::verify(cset, child_info);
        }
    }

    if !mesh.has_child("topologies") || mesh.fetch("topologies").number_of_children() == 0 {
        log_error(info, proto, "missing non-empty child \"topologies\"");
        res = false;
    } else {
        for (name, topo) in mesh.fetch("topologies").object_iter() {
            let child_info = info.fetch_mut("topologies").add_child(name);
            let mut ok = topology::verify(topo, child_info);
            if ok {
                let cset_name = topo.fetch("coordset").as_string();
                if !mesh.has_path(&format!("coordsets/{cset_name}")) {
                    log_error(
                        info,
                        proto,
                        &format!("topology {name:?} references unknown coordset {cset_name:?}"),
                    );
                    ok = false;
                }
            }
            res &= ok;
        }
    }

    res &= verify_referencing_entities(mesh, info, "matsets", matset::verify, "topology", "topologies");
    res &= verify_referencing_entities(mesh, info, "specsets", specset::verify, "matset", "matsets");
    res &= verify_referencing_entities(mesh, info, "adjsets", adjset::verify, "topology", "topologies");
    res &= verify_referencing_entities(mesh, info, "nestsets", nestset::verify, "topology", "topologies");

    if let Some(fields) = mesh.try_fetch("fields") {
        for (name, f) in fields.object_iter() {
            let child_info = info.fetch_mut("fields").add_child(name);
            let mut ok = field::verify(f, child_info);
            if ok {
                if let Some(t) = f.try_fetch("topology") {
                    let t = t.as_string();
                    if !mesh.has_path(&format!("topologies/{t}")) {
                        log_error(
                            info,
                            proto,
                            &format!("field {name:?} references unknown topology {t:?}"),
                        );
                        ok = false;
                    }
                }
                if let Some(m) = f.try_fetch("matset") {
                    let m = m.as_string();
                    if !mesh.has_path(&format!("matsets/{m}")) {
                        log_error(
                            info,
                            proto,
                            &format!("field {name:?} references unknown matset {m:?}"),
                        );
                        ok = false;
                    }
                }
            }
            res &= ok;
        }
    }

    res
}

fn verify_referencing_entities(
    mesh: &Node,
    info: &mut Node,
    group: &str,
    entity_verify: fn(&Node, &mut Node) -> bool,
    reference: &str,
    reference_group: &str,
) -> bool {
    let Some(entities) = mesh.try_fetch(group) else {
        return true;
    };
    let mut res = true;
    for (name, entity) in entities.object_iter() {
        let child_info = info.fetch_mut(group).add_child(name);
        let mut ok = entity_verify(entity, child_info);
        if ok {
            let target = entity.fetch(reference).as_string();
            if !mesh.has_path(&format!("{reference_group}/{target}")) {
                log_error(
                    info,
                    "mesh",
                    &format!("{group}/{name} references unknown {reference} {target:?}"),
                );
                ok = false;
            }
        }
        res &= ok;
    }
    res
}
