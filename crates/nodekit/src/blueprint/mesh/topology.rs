use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::coordset;
use super::shape::ShapeType;
use crate::blueprint::check::{
    log_error, log_result, require_enum, require_integer, require_object, require_string,
};
use crate::o2m::O2MRelation;
use crate::{DataTypeId, Node, widest_integer_id};

pub const TYPES: &[&str] = &["points", "uniform", "rectilinear", "structured", "unstructured"];

/// Shape of an unstructured topology's elements.
pub fn shape_of(topo: &Node) -> ShapeType {
    let name = topo.fetch("elements/shape").as_string();
    match ShapeType::from_name(&name) {
        Some(s) => s,
        None => crate::fatal!("unknown element shape {name:?}"),
    }
}

/// Per-element id lists of an unstructured topology: vertex ids for the
/// fixed and polygonal shapes, face ids for polyhedral elements.
pub fn elements(topo: &Node) -> O2MRelation {
    let elements = topo.fetch("elements");
    let conn: Vec<i64> = elements.fetch("connectivity").to_vec();
    let shape = shape_of(topo);
    let mut rel = O2MRelation::new();
    match shape.num_vertices() {
        Some(arity) => {
            for chunk in conn.chunks(arity) {
                let group: Vec<usize> = chunk.iter().map(|&v| v as usize).collect();
                rel.push(&group);
            }
        }
        None => {
            let sizes: Vec<i64> = elements.fetch("sizes").to_vec();
            let mut at = 0usize;
            if let Some(offsets) = elements.try_fetch("offsets") {
                let offsets: Vec<i64> = offsets.to_vec();
                for (s, o) in sizes.iter().zip(&offsets) {
                    let group: Vec<usize> = conn[*o as usize..(*o + *s) as usize]
                        .iter()
                        .map(|&v| v as usize)
                        .collect();
                    rel.push(&group);
                }
            } else {
                for &s in &sizes {
                    let group: Vec<usize> =
                        conn[at..at + s as usize].iter().map(|&v| v as usize).collect();
                    rel.push(&group);
                    at += s as usize;
                }
            }
        }
    }
    rel
}

/// Face vertex lists of a polyhedral topology's `subelements` block.
pub fn subelements(topo: &Node) -> O2MRelation {
    let sub = topo.fetch("subelements");
    let conn: Vec<i64> = sub.fetch("connectivity").to_vec();
    let sizes: Vec<i64> = sub.fetch("sizes").to_vec();
    let mut rel = O2MRelation::new();
    let mut at = 0usize;
    for &s in &sizes {
        let group: Vec<usize> = conn[at..at + s as usize].iter().map(|&v| v as usize).collect();
        rel.push(&group);
        at += s as usize;
    }
    rel
}

/// Resolved per-element vertex lists. Polyhedral elements collect the
/// vertices of their faces in first-occurrence order.
pub fn element_vertices(topo: &Node) -> Vec<Vec<usize>> {
    let rel = elements(topo);
    if shape_of(topo) != ShapeType::Polyhedral {
        return rel.iter().map(<[usize]>::to_vec).collect();
    }
    let faces = subelements(topo);
    rel.iter()
        .map(|face_ids| {
            let mut verts = Vec::new();
            for &f in face_ids {
                for &v in faces.group(f) {
                    if !verts.contains(&v) {
                        verts.push(v);
                    }
                }
            }
            verts
        })
        .collect()
}

/// Number of elements, for any topology flavor.
pub fn length(topo: &Node, cset: &Node) -> usize {
    match topo.fetch("type").as_string().as_str() {
        "points" => coordset::length(cset),
        "uniform" | "rectilinear" | "structured" => {
            element_dims(topo, cset).iter().product()
        }
        "unstructured" => elements(topo).len(),
        other => crate::fatal!("unknown topology type {other:?}"),
    }
}

/// Per-axis element counts of the implicit topology flavors.
pub fn element_dims(topo: &Node, cset: &Node) -> Vec<usize> {
    match topo.fetch("type").as_string().as_str() {
        "structured" => {
            let d = topo.fetch("elements/dims");
            ["i", "j", "k"]
                .iter()
                .filter_map(|name| d.child(name))
                .map(|c| c.to_i64() as usize)
                .collect()
        }
        "uniform" | "rectilinear" => coordset::dims(cset)
            .iter()
            .map(|&v| v.saturating_sub(1))
            .collect(),
        other => crate::fatal!("topology type {other:?} has no element dims"),
    }
}

/// Integer kind for derived connectivity arrays: the widest integer kind
/// found anywhere in the source topology and coordset.
pub(crate) fn index_dtype(topo: &Node, cset: &Node) -> DataTypeId {
    fn leaf_ids(n: &Node, out: &mut Vec<DataTypeId>) {
        if n.is_leaf() {
            out.push(n.dtype().id());
        }
        for c in n.children() {
            leaf_ids(c, out);
        }
    }
    let mut ids = Vec::new();
    leaf_ids(topo, &mut ids);
    leaf_ids(cset, &mut ids);
    widest_integer_id(ids)
}

fn set_index_slice(dst: &mut Node, values: &[i64], id: DataTypeId) {
    dst.set_slice(values);
    if id != DataTypeId::Int64 {
        *dst = dst.to_data_type(id);
    }
}

pub mod uniform {
    use super::*;

    /// Converts the referenced coordset in lockstep and re-types the
    /// topology; returns `(topology, coordset)`.
    pub fn to_rectilinear(topo: &Node, cset: &Node) -> (Node, Node) {
        let mut out = Node::new();
        out.fetch_mut("type").set_string("rectilinear");
        out.fetch_mut("coordset")
            .set_string(&topo.fetch("coordset").as_string());
        (out, coordset::uniform::to_rectilinear(cset))
    }

    pub fn to_structured(topo: &Node, cset: &Node) -> (Node, Node) {
        let mut out = Node::new();
        out.fetch_mut("type").set_string("structured");
        out.fetch_mut("coordset")
            .set_string(&topo.fetch("coordset").as_string());
        let edims: Vec<usize> = coordset::dims(cset).iter().map(|&v| v - 1).collect();
        for (name, &v) in ["i", "j", "k"].iter().zip(&edims) {
            out.fetch_mut(&format!("elements/dims/{name}")).set(v as i64);
        }
        (out, coordset::to_explicit(cset))
    }

    pub fn to_unstructured(topo: &Node, cset: &Node) -> (Node, Node) {
        let (structured, explicit) = to_structured(topo, cset);
        super::structured::to_unstructured_over(&structured, cset, explicit)
    }
}

pub mod rectilinear {
    use super::*;

    pub fn to_structured(topo: &Node, cset: &Node) -> (Node, Node) {
        super::uniform::to_structured(topo, cset)
    }

    pub fn to_unstructured(topo: &Node, cset: &Node) -> (Node, Node) {
        super::uniform::to_unstructured(topo, cset)
    }
}

pub mod structured {
    use super::*;

    /// Emits explicit `quad`/`hex` connectivity from the regular grid using
    /// the canonical vertex-of-cell ordering.
    pub fn to_unstructured(topo: &Node, cset: &Node) -> (Node, Node) {
        to_unstructured_over(topo, cset, coordset::to_explicit(cset))
    }

    pub(super) fn to_unstructured_over(
        topo: &Node,
        cset: &Node,
        explicit_cset: Node,
    ) -> (Node, Node) {
        let edims = super::element_dims(topo, cset);
        let d = edims.len();
        let vdims: Vec<usize> = edims.iter().map(|&e| e + 1).collect();
        let shape = ShapeType::grid_shape(d);
        let arity = shape.num_vertices().unwrap();

        // Vertex index stride along each logical axis.
        let mut strides = vec![1usize; d];
        for a in 1..d {
            strides[a] = strides[a - 1] * vdims[a - 1];
        }

        let ncells: usize = edims.iter().product();
        let mut conn: Vec<i64> = Vec::with_capacity(ncells * arity);
        let mut cell = vec![0usize; d];
        for _ in 0..ncells {
            let base: usize = cell.iter().zip(&strides).map(|(c, s)| c * s).sum();
            let first = conn.len();
            for bits in 0..(1usize << d) {
                let mut v = base;
                for (a, stride) in strides.iter().enumerate() {
                    if bits & (1 << a) != 0 {
                        v += stride;
                    }
                }
                conn.push(v as i64);
            }
            // Swap the final two vertices of each face-quad to wind it
            // counter-clockwise.
            if d >= 2 {
                for quad in conn[first..].chunks_mut(4) {
                    quad.swap(2, 3);
                }
            }
            // Advance the cell index, first axis fastest.
            for a in 0..d {
                cell[a] += 1;
                if cell[a] < edims[a] {
                    break;
                }
                cell[a] = 0;
            }
        }

        let mut out = Node::new();
        out.fetch_mut("type").set_string("unstructured");
        out.fetch_mut("coordset")
            .set_string(&topo.fetch("coordset").as_string());
        out.fetch_mut("elements/shape").set_string(shape.name());
        let id = super::index_dtype(topo, cset);
        set_index_slice(out.fetch_mut("elements/connectivity"), &conn, id);
        (out, explicit_cset)
    }
}

pub mod unstructured {
    use super::*;

    /// Fills in the explicit `offsets` arrays the poly shapes may omit.
    pub fn generate_offsets(topo: &mut Node) {
        for block in ["elements", "subelements"] {
            let Some(b) = topo.try_fetch(block) else {
                continue;
            };
            if !b.has_child("sizes") || b.has_child("offsets") {
                continue;
            }
            let sizes: Vec<i64> = b.fetch("sizes").to_vec();
            let mut acc = 0i64;
            let offsets: Vec<i64> = sizes
                .iter()
                .map(|&s| {
                    let at = acc;
                    acc += s;
                    at
                })
                .collect();
            let id = b.fetch("sizes").dtype().id();
            set_index_slice(topo.fetch_mut(&format!("{block}/offsets")), &offsets, id);
        }
    }

    /// Rewrites a fixed 2D shape as `polygonal` with explicit sizes.
    pub fn to_polygonal(topo: &Node) -> Node {
        let shape = super::shape_of(topo);
        if shape.dimension() != 2 || shape.is_poly() {
            crate::fatal!("cannot rewrite {} elements as polygons", shape.name());
        }
        let arity = shape.num_vertices().unwrap() as i64;
        let n = super::elements(topo).len();
        let mut out = topo.clone();
        out.fetch_mut("elements/shape").set_string("polygonal");
        let id = out.fetch("elements/connectivity").dtype().id();
        let sizes = vec![arity; n];
        set_index_slice(out.fetch_mut("elements/sizes"), &sizes, id);
        generate_offsets(&mut out);
        out
    }

    /// Factors each 3D cell into its faces, deduplicates face vertex-sets
    /// across cells, and emits a `polyhedral` topology whose `subelements`
    /// hold the unique polygonal faces.
    pub fn to_polyhedral(topo: &Node) -> Node {
        let shape = super::shape_of(topo);
        if shape.dimension() != 3 || shape.is_poly() {
            crate::fatal!("cannot factor {} elements into polyhedra", shape.name());
        }
        let cells = super::elements(topo);
        let face_table = shape.faces();

        let mut seen: FxHashMap<SmallVec<[usize; 8]>, usize> = FxHashMap::default();
        let mut face_conn: Vec<i64> = Vec::new();
        let mut face_sizes: Vec<i64> = Vec::new();
        let mut cell_faces: Vec<i64> = Vec::new();
        let mut cell_sizes: Vec<i64> = Vec::new();
        for cell in cells.iter() {
            cell_sizes.push(face_table.len() as i64);
            for face in face_table {
                let verts: Vec<usize> = face.iter().map(|&l| cell[l]).collect();
                let mut key: SmallVec<[usize; 8]> = verts.iter().copied().collect();
                key.sort_unstable();
                let next = seen.len();
                let fid = *seen.entry(key).or_insert_with(|| {
                    face_sizes.push(verts.len() as i64);
                    face_conn.extend(verts.iter().map(|&v| v as i64));
                    next
                });
                cell_faces.push(fid as i64);
            }
        }

        let mut out = Node::new();
        out.fetch_mut("type").set_string("unstructured");
        out.fetch_mut("coordset")
            .set_string(&topo.fetch("coordset").as_string());
        let id = topo.fetch("elements/connectivity").dtype().id();
        out.fetch_mut("elements/shape").set_string("polyhedral");
        set_index_slice(out.fetch_mut("elements/connectivity"), &cell_faces, id);
        set_index_slice(out.fetch_mut("elements/sizes"), &cell_sizes, id);
        out.fetch_mut("subelements/shape").set_string("polygonal");
        set_index_slice(out.fetch_mut("subelements/connectivity"), &face_conn, id);
        set_index_slice(out.fetch_mut("subelements/sizes"), &face_sizes, id);
        generate_offsets(&mut out);
        out
    }
}

pub fn verify(topo: &Node, info: &mut Node) -> bool {
    let proto = "topology";
    let mut res = require_enum(topo, info, proto, "type", TYPES);
    res &= require_string(topo, info, proto, "coordset");
    if res {
        match topo.fetch("type").as_string().as_str() {
            "points" | "uniform" | "rectilinear" => {}
            "structured" => {
                res &= require_object(topo, info, proto, "elements")
                    && require_object(topo.fetch("elements"), info, proto, "dims");
            }
            "unstructured" => res &= verify_unstructured(topo, info),
            _ => unreachable!(),
        }
    }
    log_result(info, res)
}

fn verify_unstructured(topo: &Node, info: &mut Node) -> bool {
    let proto = "topology::unstructured";
    if !require_object(topo, info, proto, "elements") {
        return false;
    }
    let elements = topo.fetch("elements");
    if !elements.has_child("shape") {
        // Mixed-shape construction: named sub-blocks, each with its own
        // fixed shape and connectivity.
        let mut res = elements.number_of_children() > 0;
        for (name, block) in elements.object_iter() {
            if !block.is_object() {
                log_error(info, proto, &format!("mixed block {name:?} is not an object"));
                res = false;
                continue;
            }
            res &= require_enum(
                block,
                info,
                proto,
                "shape",
                &["point", "line", "tri", "quad", "tet", "hex"],
            );
            res &= require_integer(block, info, proto, "connectivity");
        }
        return res;
    }
    const SHAPES: &[&str] = &[
        "point", "line", "tri", "quad", "tet", "hex", "polygonal", "polyhedral",
    ];
    let mut res = require_enum(elements, info, proto, "shape", SHAPES);
    res &= require_integer(elements, info, proto, "connectivity");
    if !res {
        return false;
    }
    let shape = shape_of(topo);
    if shape.is_poly() {
        res &= require_integer(elements, info, proto, "sizes");
        if elements.has_child("offsets") {
            res &= require_integer(elements, info, proto, "offsets");
        }
    }
    if shape == ShapeType::Polyhedral {
        if require_object(topo, info, proto, "subelements") {
            let sub = topo.fetch("subelements");
            res &= require_enum(sub, info, proto, "shape", &["polygonal"]);
            res &= require_integer(sub, info, proto, "connectivity");
            res &= require_integer(sub, info, proto, "sizes");
        } else {
            res = false;
        }
    }
    res
}
