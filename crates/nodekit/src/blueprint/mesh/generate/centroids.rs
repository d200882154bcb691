use ndarray as nd;

use super::{Generated, coords_to_coordset, identity_map};
use crate::Node;
use crate::blueprint::mesh::TopologyMetadata;

/// One point per source cell, placed at the mean of the cell's unique
/// vertex coordinates. The derived topology references a fresh explicit
/// coordset named `<source coordset>_centroid`; both maps are identity.
pub fn generate_centroids(topo: &Node, cset: &Node) -> Generated {
    let meta = TopologyMetadata::new(topo, cset);
    let d = meta.dimension();
    let ncells = meta.entity_count(d);
    let d_space = meta.coords().ncols();

    let mut centers = nd::Array2::zeros((ncells, d_space));
    for c in 0..ncells {
        let centroid = meta.entity_centroid(d, c);
        for a in 0..d_space {
            centers[[c, a]] = centroid[a];
        }
    }

    let id = meta.index_id();
    let mut topology = Node::new();
    topology.fetch_mut("type").set_string("unstructured");
    topology
        .fetch_mut("coordset")
        .set_string(&format!("{}_centroid", meta.coordset_name()));
    topology.fetch_mut("elements/shape").set_string("point");
    let conn: Vec<i64> = (0..ncells as i64).collect();
    topology.fetch_mut("elements/connectivity").set_slice(&conn);
    let conn_typed = topology.fetch("elements/connectivity").to_data_type(id);
    *topology.fetch_mut("elements/connectivity") = conn_typed;

    Generated {
        topology,
        coordset: Some(coords_to_coordset(&centers, cset)),
        s2d: identity_map(ncells, id),
        d2s: identity_map(ncells, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_examples;
    use crate::o2m::O2MRelation;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quad_centroids_are_cell_centers() {
        let mesh = mesh_examples::basic("quads", 3, 3, 0);
        let out = generate_centroids(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        let cset = out.coordset.unwrap();
        let xs: Vec<f64> = cset["values/x"].to_vec();
        let ys: Vec<f64> = cset["values/y"].to_vec();
        assert_eq!(xs.len(), 4);
        assert_abs_diff_eq!(xs[0], 0.5);
        assert_abs_diff_eq!(ys[0], 0.5);
        assert_abs_diff_eq!(xs[3], 1.5);
        assert_abs_diff_eq!(ys[3], 1.5);
        assert_eq!(
            out.topology["coordset"].as_string(),
            "coords_centroid"
        );
    }

    #[test]
    fn maps_are_identity() {
        let mesh = mesh_examples::basic("hexs", 2, 2, 2);
        let out = generate_centroids(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        let s2d = O2MRelation::from_node(&out.s2d);
        let d2s = O2MRelation::from_node(&out.d2s);
        assert_eq!(s2d.len(), 1);
        assert_eq!(s2d.group(0), [0]);
        assert_eq!(d2s.group(0), [0]);
    }

    #[test]
    fn polyhedral_centroids_recurse_through_faces() {
        let mesh = mesh_examples::basic("polyhedra", 2, 2, 2);
        let out = generate_centroids(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        let cset = out.coordset.unwrap();
        assert_abs_diff_eq!(cset["values/x"].to_vec::<f64>()[0], 0.5);
        assert_abs_diff_eq!(cset["values/z"].to_vec::<f64>()[0], 0.5);
    }
}
