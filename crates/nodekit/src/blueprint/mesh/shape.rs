use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

/// Element shapes an unstructured topology can carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeType {
    Point,
    Line,
    Tri,
    Quad,
    Tet,
    Hex,
    Polygonal,
    Polyhedral,
}

static NAMES: Lazy<FxHashMap<&'static str, ShapeType>> = Lazy::new(|| {
    use ShapeType::*;
    [
        ("point", Point),
        ("line", Line),
        ("tri", Tri),
        ("quad", Quad),
        ("tet", Tet),
        ("hex", Hex),
        ("polygonal", Polygonal),
        ("polyhedral", Polyhedral),
    ]
    .into_iter()
    .collect()
});

/// Edges of the 2D shapes, wound counter-clockwise.
const TRI_EDGES: &[&[usize]] = &[&[0, 1], &[1, 2], &[2, 0]];
const QUAD_EDGES: &[&[usize]] = &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]];

/// Faces of the 3D shapes, wound so normals point outward.
const TET_FACES: &[&[usize]] = &[&[0, 2, 1], &[0, 1, 3], &[0, 3, 2], &[1, 2, 3]];
const HEX_FACES: &[&[usize]] = &[
    &[0, 3, 2, 1],
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[3, 0, 4, 7],
    &[4, 5, 6, 7],
];

const LINE_ENDS: &[&[usize]] = &[&[0], &[1]];

impl ShapeType {
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.get(name).copied()
    }

    pub fn name(&self) -> &'static str {
        use ShapeType::*;
        match self {
            Point => "point",
            Line => "line",
            Tri => "tri",
            Quad => "quad",
            Tet => "tet",
            Hex => "hex",
            Polygonal => "polygonal",
            Polyhedral => "polyhedral",
        }
    }

    pub fn dimension(&self) -> usize {
        use ShapeType::*;
        match self {
            Point => 0,
            Line => 1,
            Tri | Quad | Polygonal => 2,
            Tet | Hex | Polyhedral => 3,
        }
    }

    /// Vertex count of the fixed-arity shapes; `None` for the poly forms.
    pub fn num_vertices(&self) -> Option<usize> {
        use ShapeType::*;
        match self {
            Point => Some(1),
            Line => Some(2),
            Tri => Some(3),
            Quad => Some(4),
            Tet => Some(4),
            Hex => Some(8),
            Polygonal | Polyhedral => None,
        }
    }

    pub fn is_poly(&self) -> bool {
        matches!(self, ShapeType::Polygonal | ShapeType::Polyhedral)
    }

    /// Shape of the (d-1)-dimensional boundary entities.
    pub fn face_shape(&self) -> Option<ShapeType> {
        use ShapeType::*;
        match self {
            Point => None,
            Line => Some(Point),
            Tri | Quad | Polygonal => Some(Line),
            Tet => Some(Tri),
            Hex => Some(Quad),
            Polyhedral => Some(Polygonal),
        }
    }

    /// Local vertex index lists of the boundary entities, in the shape's
    /// orientation. Poly shapes enumerate per element, not per table.
    pub fn faces(&self) -> &'static [&'static [usize]] {
        use ShapeType::*;
        match self {
            Line => LINE_ENDS,
            Tri => TRI_EDGES,
            Quad => QUAD_EDGES,
            Tet => TET_FACES,
            Hex => HEX_FACES,
            Point | Polygonal | Polyhedral => &[],
        }
    }

    /// The implicit grid cell shape for a given element dimension.
    pub fn grid_shape(dim: usize) -> ShapeType {
        match dim {
            0 => ShapeType::Point,
            1 => ShapeType::Line,
            2 => ShapeType::Quad,
            3 => ShapeType::Hex,
            d => crate::fatal!("no grid cell shape for dimension {d}"),
        }
    }
}

/// Boundary vertex lists of one polygon: its edges in winding order.
pub fn polygon_edges(verts: &[usize]) -> Vec<Vec<usize>> {
    let k = verts.len();
    (0..k).map(|i| vec![verts[i], verts[(i + 1) % k]]).collect()
}
