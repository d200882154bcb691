//! Derived-topology generators: each emits a new topology (and, when new
//! vertices are introduced, a new coordset) plus bidirectional one-to-many
//! maps between source and derived elements.

mod centroids;
mod corners;
mod sides;

pub use centroids::generate_centroids;
pub use corners::generate_corners;
pub use sides::{SidesOptions, generate_sides, generate_sides_with_fields};

use ndarray as nd;

use super::TopologyMetadata;
use super::coordset;
use crate::o2m::O2MRelation;
use crate::{DataTypeId, Node};

/// Output of a generator: the derived topology, a fresh coordset when the
/// generator introduces vertices, and the source/derived element maps as
/// one-to-many relations (`s2d`: derived element to source elements,
/// `d2s`: source element to derived elements).
pub struct Generated {
    pub topology: Node,
    pub coordset: Option<Node>,
    pub s2d: Node,
    pub d2s: Node,
}

/// The k-entity pass-through generators share this body.
fn generate_dim(topo: &Node, cset: &Node, dim: usize, what: &str) -> Generated {
    let meta = TopologyMetadata::new(topo, cset);
    if meta.dimension() < dim {
        crate::fatal!(
            "cannot generate {what} from a {}-dimensional topology",
            meta.dimension()
        );
    }
    let id = meta.index_id();
    Generated {
        topology: meta.topology(dim).clone(),
        coordset: None,
        s2d: meta.association_o2m(dim, meta.dimension()).to_node(id),
        d2s: meta.association_o2m(meta.dimension(), dim).to_node(id),
    }
}

/// The deduplicated point topology of the input.
pub fn generate_points(topo: &Node, cset: &Node) -> Generated {
    generate_dim(topo, cset, 0, "points")
}

/// The deduplicated line topology of the input.
pub fn generate_lines(topo: &Node, cset: &Node) -> Generated {
    generate_dim(topo, cset, 1, "lines")
}

/// The deduplicated face topology of the input.
pub fn generate_faces(topo: &Node, cset: &Node) -> Generated {
    generate_dim(topo, cset, 2, "faces")
}

/// Builds an explicit coordset from an `(n, d)` coordinate matrix, reusing
/// the axis names of `like`.
pub(crate) fn coords_to_coordset(coords: &nd::Array2<f64>, like: &Node) -> Node {
    let axes = coordset::axes(like);
    let mut out = Node::new();
    out.fetch_mut("type").set_string("explicit");
    for (a, name) in axes.iter().enumerate() {
        let column: Vec<f64> = coords.column(a).to_vec();
        out.fetch_mut(&format!("values/{name}")).set_slice(&column);
    }
    out
}

pub(crate) fn identity_map(n: usize, id: DataTypeId) -> Node {
    let mut rel = O2MRelation::new();
    for i in 0..n {
        rel.push(&[i]);
    }
    rel.to_node(id)
}
