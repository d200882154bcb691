//! Conventions layer: what shape a [`Node`](crate::Node) tree must have to
//! describe a computational mesh, plus the algorithms defined over
//! conforming trees.

pub mod mesh;

pub(crate) mod check;

use crate::Node;

/// Closed set of protocol names [`verify`] understands.
pub const PROTOCOLS: &[&str] = &[
    "mesh",
    "coordset",
    "topology",
    "matset",
    "specset",
    "field",
    "adjset",
    "nestset",
    "index",
    "coordset/index",
    "topology/index",
    "matset/index",
    "specset/index",
    "field/index",
    "adjset/index",
    "nestset/index",
];

/// Dispatches over the closed protocol set. Unknown protocol names are
/// fatal; invalid *input* never is.
pub fn verify(protocol: &str, node: &Node, info: &mut Node) -> bool {
    match protocol {
        "mesh" => mesh::verify(node, info),
        "coordset" => mesh::coordset::verify(node, info),
        "topology" => mesh::topology::verify(node, info),
        "matset" => mesh::matset::verify(node, info),
        "specset" => mesh::specset::verify(node, info),
        "field" => mesh::field::verify(node, info),
        "adjset" => mesh::adjset::verify(node, info),
        "nestset" => mesh::nestset::verify(node, info),
        "index" => mesh::index::verify(node, info),
        "coordset/index" => mesh::index::verify_coordset(node, info),
        "topology/index" => mesh::index::verify_topology(node, info),
        "matset/index" => mesh::index::verify_matset(node, info),
        "specset/index" => mesh::index::verify_specset(node, info),
        "field/index" => mesh::index::verify_field(node, info),
        "adjset/index" => mesh::index::verify_adjset(node, info),
        "nestset/index" => mesh::index::verify_nestset(node, info),
        other => crate::fatal!("unknown blueprint protocol {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_examples;

    #[test]
    fn dispatch_covers_the_closed_set() {
        let mesh = mesh_examples::basic("uniform", 3, 3, 0);
        let mut info = Node::new();
        assert!(verify("mesh", &mesh, &mut info));
        assert!(verify(
            "coordset",
            mesh.fetch("coordsets/coords"),
            &mut info
        ));
        assert!(verify(
            "topology",
            mesh.fetch("topologies/mesh"),
            &mut info
        ));
    }

    #[test]
    #[should_panic]
    fn unknown_protocol_is_fatal() {
        let mut info = Node::new();
        verify("meshes", &Node::new(), &mut info);
    }
}
