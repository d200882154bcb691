use ndarray as nd;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::{Generated, coords_to_coordset};
use crate::blueprint::mesh::TopologyMetadata;
use crate::blueprint::mesh::topology;
use crate::o2m::O2MRelation;
use crate::{DataTypeId, Node};

/// The median dual: one polygonal (2D) or polyhedral (3D) cell per
/// (source-cell, source-vertex) pair, whose quad faces pass through edge
/// midpoints, face centers and cell centers. Faces are deduplicated by
/// vertex-set across corners.
pub fn generate_corners(topo: &Node, cset: &Node) -> Generated {
    let meta = TopologyMetadata::new(topo, cset);
    match meta.dimension() {
        2 => generate_2d(&meta, cset),
        3 => generate_3d(&meta, cset),
        d => crate::fatal!("corners require a 2- or 3-dimensional topology, not {d}"),
    }
}

fn corner_coords(meta: &TopologyMetadata, segments: &[usize]) -> nd::Array2<f64> {
    let nverts = meta.coords().nrows();
    let d_space = meta.coords().ncols();
    let extra: usize = segments.iter().map(|&d| meta.entity_count(d)).sum();
    let mut coords = nd::Array2::zeros((nverts + extra, d_space));
    for v in 0..nverts {
        for a in 0..d_space {
            coords[[v, a]] = meta.coords()[[v, a]];
        }
    }
    let mut at = nverts;
    for &dim in segments {
        for e in 0..meta.entity_count(dim) {
            let c = meta.entity_centroid(dim, e);
            for a in 0..d_space {
                coords[[at, a]] = c[a];
            }
            at += 1;
        }
    }
    coords
}

fn finish(
    meta: &TopologyMetadata,
    cset: &Node,
    topology: Node,
    coords: nd::Array2<f64>,
    parents: Vec<usize>,
) -> Generated {
    let id = meta.index_id();
    let mut s2d = O2MRelation::new();
    for &p in &parents {
        s2d.push(&[p]);
    }
    let ncells = meta.entity_count(meta.dimension());
    let mut by_parent: Vec<Vec<usize>> = vec![Vec::new(); ncells];
    for (corner, &p) in parents.iter().enumerate() {
        by_parent[p].push(corner);
    }
    let mut d2s = O2MRelation::new();
    for corners in &by_parent {
        d2s.push(corners);
    }
    Generated {
        topology,
        coordset: Some(coords_to_coordset(&coords, cset)),
        s2d: s2d.to_node(id),
        d2s: d2s.to_node(id),
    }
}

fn set_index(dst: &mut Node, values: &[i64], id: DataTypeId) {
    dst.set_slice(values);
    if id != DataTypeId::Int64 {
        *dst = dst.to_data_type(id);
    }
}

fn generate_2d(meta: &TopologyMetadata, cset: &Node) -> Generated {
    let nverts = meta.coords().nrows();
    let nedges = meta.entity_count(1);
    let ncells = meta.entity_count(2);
    let coords = corner_coords(meta, &[1, 2]);
    let mid = |e: usize| nverts + e;
    let center = |c: usize| nverts + nedges + c;

    let mut conn: Vec<i64> = Vec::new();
    let mut sizes: Vec<i64> = Vec::new();
    let mut parents = Vec::new();
    for cell in 0..ncells {
        let verts = meta.local_entity_vertices(2, cell).to_vec();
        let k = verts.len();
        for i in 0..k {
            let v = verts[i];
            let next = verts[(i + 1) % k];
            let prev = verts[(i + k - 1) % k];
            let e_next = meta.entity_id(1, &[v, next]).unwrap();
            let e_prev = meta.entity_id(1, &[prev, v]).unwrap();
            conn.extend(
                [v, mid(e_next), center(cell), mid(e_prev)]
                    .into_iter()
                    .map(|x| x as i64),
            );
            sizes.push(4);
            parents.push(cell);
        }
    }

    let id = meta.index_id();
    let mut out = Node::new();
    out.fetch_mut("type").set_string("unstructured");
    out.fetch_mut("coordset")
        .set_string(&format!("{}_corners", meta.coordset_name()));
    out.fetch_mut("elements/shape").set_string("polygonal");
    set_index(out.fetch_mut("elements/connectivity"), &conn, id);
    set_index(out.fetch_mut("elements/sizes"), &sizes, id);
    topology::unstructured::generate_offsets(&mut out);
    finish(meta, cset, out, coords, parents)
}

fn generate_3d(meta: &TopologyMetadata, cset: &Node) -> Generated {
    let nverts = meta.coords().nrows();
    let nedges = meta.entity_count(1);
    let nfaces = meta.entity_count(2);
    let ncells = meta.entity_count(3);
    let coords = corner_coords(meta, &[1, 2, 3]);
    let mid = |e: usize| nverts + e;
    let face_center = |f: usize| nverts + nedges + f;
    let cell_center = |c: usize| nverts + nedges + nfaces + c;

    // Corner faces deduplicate across corners by unordered vertex set.
    let mut face_dedup: FxHashMap<SmallVec<[usize; 4]>, usize> = FxHashMap::default();
    let mut face_conn: Vec<i64> = Vec::new();
    let mut face_sizes: Vec<i64> = Vec::new();
    let mut corner_faces: Vec<i64> = Vec::new();
    let mut corner_sizes: Vec<i64> = Vec::new();
    let mut parents = Vec::new();

    let add_face = |quad: [usize; 4],
                        face_dedup: &mut FxHashMap<SmallVec<[usize; 4]>, usize>,
                        face_conn: &mut Vec<i64>,
                        face_sizes: &mut Vec<i64>|
     -> usize {
        let mut key: SmallVec<[usize; 4]> = quad.iter().copied().collect();
        key.sort_unstable();
        match face_dedup.get(&key) {
            Some(&f) => f,
            None => {
                let f = face_sizes.len();
                face_dedup.insert(key, f);
                face_conn.extend(quad.iter().map(|&v| v as i64));
                face_sizes.push(4);
                f
            }
        }
    };

    for cell in 0..ncells {
        let cell_verts = meta.local_entity_vertices(3, cell).to_vec();
        let local_faces: Vec<usize> = meta.local_association(cell, 3, 2).to_vec();
        let local_edges: Vec<usize> = meta.local_association(cell, 3, 1).to_vec();
        for &v in &cell_verts {
            let mut faces_of_corner: Vec<i64> = Vec::new();
            // One quad per incident cell face: vertex, the two adjacent
            // edge midpoints and the face center.
            for &fl in &local_faces {
                let fv = meta.local_entity_vertices(2, fl).to_vec();
                let Some(i) = fv.iter().position(|&x| x == v) else {
                    continue;
                };
                let m = fv.len();
                let next = fv[(i + 1) % m];
                let prev = fv[(i + m - 1) % m];
                let e_next = meta.entity_id(1, &[v, next]).unwrap();
                let e_prev = meta.entity_id(1, &[prev, v]).unwrap();
                let fg = meta.le2ge(2)[fl];
                let f = add_face(
                    [v, mid(e_next), face_center(fg), mid(e_prev)],
                    &mut face_dedup,
                    &mut face_conn,
                    &mut face_sizes,
                );
                faces_of_corner.push(f as i64);
            }
            // One quad per incident cell edge: edge midpoint, the two face
            // centers sharing the edge and the cell center.
            for &el in &local_edges {
                let ev = meta.local_entity_vertices(1, el);
                if !ev.contains(&v) {
                    continue;
                }
                let (a, b) = (ev[0], ev[1]);
                let eg = meta.le2ge(1)[el];
                let sharing: Vec<usize> = local_faces
                    .iter()
                    .filter(|&&fl| {
                        let fv = meta.local_entity_vertices(2, fl);
                        fv.contains(&a) && fv.contains(&b)
                    })
                    .map(|&fl| meta.le2ge(2)[fl])
                    .collect();
                if sharing.len() != 2 {
                    crate::fatal!(
                        "cell edge shared by {} cell faces, expected 2",
                        sharing.len()
                    );
                }
                let f = add_face(
                    [mid(eg), face_center(sharing[0]), cell_center(cell), face_center(sharing[1])],
                    &mut face_dedup,
                    &mut face_conn,
                    &mut face_sizes,
                );
                faces_of_corner.push(f as i64);
            }
            corner_sizes.push(faces_of_corner.len() as i64);
            corner_faces.extend(faces_of_corner);
            parents.push(cell);
        }
    }

    let id = meta.index_id();
    let mut out = Node::new();
    out.fetch_mut("type").set_string("unstructured");
    out.fetch_mut("coordset")
        .set_string(&format!("{}_corners", meta.coordset_name()));
    out.fetch_mut("elements/shape").set_string("polyhedral");
    set_index(out.fetch_mut("elements/connectivity"), &corner_faces, id);
    set_index(out.fetch_mut("elements/sizes"), &corner_sizes, id);
    out.fetch_mut("subelements/shape").set_string("polygonal");
    set_index(out.fetch_mut("subelements/connectivity"), &face_conn, id);
    set_index(out.fetch_mut("subelements/sizes"), &face_sizes, id);
    topology::unstructured::generate_offsets(&mut out);
    finish(meta, cset, out, coords, parents)
}
