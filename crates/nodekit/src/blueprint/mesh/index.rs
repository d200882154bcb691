//! The per-entity summary blocks an I/O collaborator consumes to locate a
//! mesh inside a file set, and their `verify` rules.

use crate::Node;
use crate::blueprint::check::{
    log_error, log_result, require_enum, require_integer, require_string,
};

use super::field::ASSOCIATIONS;

pub fn verify_coordset(idx: &Node, info: &mut Node) -> bool {
    let proto = "coordset/index";
    let mut res = require_enum(idx, info, proto, "type", super::coordset::TYPES);
    res &= require_string(idx, info, proto, "coord_system");
    res &= require_string(idx, info, proto, "path");
    log_result(info, res)
}

pub fn verify_topology(idx: &Node, info: &mut Node) -> bool {
    let proto = "topology/index";
    let mut res = require_enum(idx, info, proto, "type", super::topology::TYPES);
    res &= require_string(idx, info, proto, "coordset");
    res &= require_string(idx, info, proto, "path");
    log_result(info, res)
}

pub fn verify_matset(idx: &Node, info: &mut Node) -> bool {
    let proto = "matset/index";
    let mut res = require_string(idx, info, proto, "topology");
    res &= require_string(idx, info, proto, "path");
    if !idx.has_child("materials") {
        log_error(info, proto, "missing child \"materials\"");
        res = false;
    }
    log_result(info, res)
}

pub fn verify_specset(idx: &Node, info: &mut Node) -> bool {
    let proto = "specset/index";
    let mut res = require_string(idx, info, proto, "matset");
    res &= require_string(idx, info, proto, "path");
    if !idx.has_child("species") {
        log_error(info, proto, "missing child \"species\"");
        res = false;
    }
    log_result(info, res)
}

pub fn verify_field(idx: &Node, info: &mut Node) -> bool {
    let proto = "field/index";
    let mut res = require_string(idx, info, proto, "path");
    if !idx.has_child("topology") && !idx.has_child("matset") {
        log_error(info, proto, "references neither a topology nor a matset");
        res = false;
    }
    if idx.has_child("topology") {
        res &= require_string(idx, info, proto, "topology");
    }
    if idx.has_child("matset") {
        res &= require_string(idx, info, proto, "matset");
    }
    if idx.has_child("association") {
        res &= require_enum(idx, info, proto, "association", ASSOCIATIONS);
    } else {
        res &= require_string(idx, info, proto, "basis");
    }
    res &= require_integer(idx, info, proto, "number_of_components");
    log_result(info, res)
}

pub fn verify_adjset(idx: &Node, info: &mut Node) -> bool {
    let proto = "adjset/index";
    let mut res = require_string(idx, info, proto, "topology");
    res &= require_enum(idx, info, proto, "association", ASSOCIATIONS);
    res &= require_string(idx, info, proto, "path");
    log_result(info, res)
}

pub fn verify_nestset(idx: &Node, info: &mut Node) -> bool {
    let proto = "nestset/index";
    let mut res = require_string(idx, info, proto, "topology");
    res &= require_enum(idx, info, proto, "association", ASSOCIATIONS);
    res &= require_string(idx, info, proto, "path");
    log_result(info, res)
}

/// A whole-mesh index: domain count plus one summary block per entity.
pub fn verify(idx: &Node, info: &mut Node) -> bool {
    let proto = "index";
    let mut res = require_integer(idx, info, proto, "state/number_of_domains");

    let groups: [(&str, fn(&Node, &mut Node) -> bool); 7] = [
        ("coordsets", verify_coordset),
        ("topologies", verify_topology),
        ("matsets", verify_matset),
        ("specsets", verify_specset),
        ("fields", verify_field),
        ("adjsets", verify_adjset),
        ("nestsets", verify_nestset),
    ];
    for (group, entity_verify) in groups {
        let Some(entities) = idx.try_fetch(group) else {
            if matches!(group, "coordsets" | "topologies") {
                log_error(info, proto, &format!("missing child {group:?}"));
                res = false;
            }
            continue;
        };
        for (name, entity) in entities.object_iter() {
            let child_info = info.fetch_mut(group).add_child(name);
            res &= entity_verify(entity, child_info);
        }
    }
    log_result(info, res)
}

/// Builds the index for a single-domain mesh rooted at `ref_path`.
pub fn generate(mesh: &Node, number_of_domains: usize, ref_path: &str) -> Node {
    use crate::node::path::join_path;

    let mut idx = Node::new();
    idx.fetch_mut("state/number_of_domains")
        .set(number_of_domains as i64);
    if let Some(csets) = mesh.try_fetch("coordsets") {
        for (name, cset) in csets.object_iter() {
            let e = idx.fetch_mut("coordsets").add_child(name);
            e.fetch_mut("type")
                .set_string(&cset.fetch("type").as_string());
            let system = super::coordset::axes(cset)
                .first()
                .map_or("cartesian", |a| match a.as_str() {
                    "r" => "cylindrical",
                    _ => "cartesian",
                })
                .to_string();
            e.fetch_mut("coord_system").set_string(&system);
            e.fetch_mut("path")
                .set_string(&join_path(ref_path, &format!("coordsets/{name}")));
        }
    }
    if let Some(topos) = mesh.try_fetch("topologies") {
        for (name, topo) in topos.object_iter() {
            let e = idx.fetch_mut("topologies").add_child(name);
            e.fetch_mut("type")
                .set_string(&topo.fetch("type").as_string());
            e.fetch_mut("coordset")
                .set_string(&topo.fetch("coordset").as_string());
            e.fetch_mut("path")
                .set_string(&join_path(ref_path, &format!("topologies/{name}")));
        }
    }
    if let Some(fields) = mesh.try_fetch("fields") {
        for (name, f) in fields.object_iter() {
            let e = idx.fetch_mut("fields").add_child(name);
            for reference in ["topology", "matset"] {
                if let Some(t) = f.try_fetch(reference) {
                    e.fetch_mut(reference).set_string(&t.as_string());
                }
            }
            if let Some(a) = f.try_fetch("association") {
                e.fetch_mut("association").set_string(&a.as_string());
            } else if let Some(b) = f.try_fetch("basis") {
                e.fetch_mut("basis").set_string(&b.as_string());
            }
            let components = match f.try_fetch("values") {
                Some(v) if v.is_object() => v.number_of_children(),
                _ => 1,
            };
            e.fetch_mut("number_of_components").set(components as i64);
            e.fetch_mut("path")
                .set_string(&join_path(ref_path, &format!("fields/{name}")));
        }
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_examples;

    #[test]
    fn generated_index_verifies() {
        let mesh = mesh_examples::basic("quads", 3, 3, 0);
        let idx = generate(&mesh, 1, "domain_000000");
        let mut info = Node::new();
        assert!(verify(&idx, &mut info), "{}", info.to_json());
        assert_eq!(
            idx["topologies/mesh/path"].as_string(),
            "domain_000000/topologies/mesh"
        );
    }

    #[test]
    fn index_without_topologies_fails() {
        let mut idx = Node::new();
        idx.fetch_mut("state/number_of_domains").set(1i64);
        let mut info = Node::new();
        assert!(!verify(&idx, &mut info));
    }
}
