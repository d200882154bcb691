use arrayvec::ArrayVec;
use nalgebra as na;
use ndarray as nd;

use super::{Generated, coords_to_coordset};
use crate::blueprint::mesh::TopologyMetadata;
use crate::o2m::O2MRelation;
use crate::{DataTypeId, Node};

/// Field-mapping controls for [`generate_sides_with_fields`].
pub struct SidesOptions<'a> {
    /// Fields to map; `None` maps every field on the source topology.
    pub field_names: Option<&'a [&'a str]>,
    /// Element fields whose values scale with cell volume.
    pub volume_dependent: &'a [&'a str],
    /// Topology name the mapped fields reference.
    pub topology_name: &'a str,
}

impl Default for SidesOptions<'_> {
    fn default() -> Self {
        Self {
            field_names: None,
            volume_dependent: &[],
            topology_name: "sides",
        }
    }
}

/// The simplicial subdivision and everything field mapping needs from it.
struct SidesBuild {
    dim: usize,
    nverts: usize,
    index_id: DataTypeId,
    coords_out: nd::Array2<f64>,
    /// Per side: simplex vertex ids into the derived coordset.
    conn: Vec<ArrayVec<usize, 4>>,
    /// Per side: the source cell it subdivides.
    parents: Vec<usize>,
    volumes: Vec<f64>,
    parent_volumes: Vec<f64>,
    coordset_name: String,
}

fn tri_area(coords: &nd::Array2<f64>, v: &[usize]) -> f64 {
    let p = |i: usize| {
        let mut x = na::Vector3::zeros();
        for a in 0..coords.ncols().min(3) {
            x[a] = coords[[v[i], a]];
        }
        x
    };
    let (a, b, c) = (p(0), p(1), p(2));
    (b - a).cross(&(c - a)).norm() / 2.0
}

fn tet_volume(coords: &nd::Array2<f64>, v: &[usize]) -> f64 {
    let p = |i: usize| {
        na::Vector3::new(coords[[v[i], 0]], coords[[v[i], 1]], coords[[v[i], 2]])
    };
    let (a, b, c, d) = (p(0), p(1), p(2), p(3));
    ((b - a).cross(&(c - a)).dot(&(d - a)) / 6.0).abs()
}

fn build(topo: &Node, cset: &Node) -> SidesBuild {
    let meta = TopologyMetadata::new(topo, cset);
    let dim = meta.dimension();
    if dim < 2 {
        crate::fatal!("sides require a 2- or 3-dimensional topology");
    }
    let nverts = meta.coords().nrows();
    let ncells = meta.entity_count(dim);
    let nfaces = if dim == 3 { meta.entity_count(2) } else { 0 };
    let d_space = meta.coords().ncols();

    // Derived coordset: originals, then face centers (3D), then cell
    // centers.
    let mut coords_out = nd::Array2::zeros((nverts + nfaces + ncells, d_space));
    for v in 0..nverts {
        for a in 0..d_space {
            coords_out[[v, a]] = meta.coords()[[v, a]];
        }
    }
    for f in 0..nfaces {
        let c = meta.entity_centroid(2, f);
        for a in 0..d_space {
            coords_out[[nverts + f, a]] = c[a];
        }
    }
    for cell in 0..ncells {
        let c = meta.entity_centroid(dim, cell);
        for a in 0..d_space {
            coords_out[[nverts + nfaces + cell, a]] = c[a];
        }
    }

    let mut conn: Vec<ArrayVec<usize, 4>> = Vec::new();
    let mut parents = Vec::new();
    for cell in 0..ncells {
        let cell_center = nverts + nfaces + cell;
        if dim == 2 {
            for &edge in meta.local_association(cell, 2, 1) {
                let e = meta.local_entity_vertices(1, edge);
                conn.push([e[0], e[1], cell_center].into_iter().collect());
                parents.push(cell);
            }
        } else {
            for &face in meta.local_association(cell, 3, 2) {
                let face_center = nverts + meta.le2ge(2)[face];
                for &edge in meta.local_association(face, 2, 1) {
                    let e = meta.local_entity_vertices(1, edge);
                    conn.push([e[0], e[1], face_center, cell_center].into_iter().collect());
                    parents.push(cell);
                }
            }
        }
    }

    let volumes: Vec<f64> = conn
        .iter()
        .map(|side| {
            if dim == 2 {
                tri_area(&coords_out, side)
            } else {
                tet_volume(&coords_out, side)
            }
        })
        .collect();
    let mut parent_volumes = vec![0.0; ncells];
    for (side, &parent) in parents.iter().enumerate() {
        parent_volumes[parent] += volumes[side];
    }

    SidesBuild {
        dim,
        nverts,
        index_id: meta.index_id(),
        coords_out,
        conn,
        parents,
        volumes,
        parent_volumes,
        coordset_name: format!("{}_sides", meta.coordset_name()),
    }
}

fn emit(build: &SidesBuild, cset: &Node) -> Generated {
    let shape = if build.dim == 2 { "tri" } else { "tet" };
    let mut topology = Node::new();
    topology.fetch_mut("type").set_string("unstructured");
    topology.fetch_mut("coordset").set_string(&build.coordset_name);
    topology.fetch_mut("elements/shape").set_string(shape);
    let flat: Vec<i64> = build
        .conn
        .iter()
        .flat_map(|s| s.iter().map(|&v| v as i64))
        .collect();
    topology.fetch_mut("elements/connectivity").set_slice(&flat);
    if build.index_id != DataTypeId::Int64 {
        let typed = topology
            .fetch("elements/connectivity")
            .to_data_type(build.index_id);
        *topology.fetch_mut("elements/connectivity") = typed;
    }

    let mut s2d = O2MRelation::new();
    for &parent in &build.parents {
        s2d.push(&[parent]);
    }
    let ncells = build.parent_volumes.len();
    let mut by_parent: Vec<Vec<usize>> = vec![Vec::new(); ncells];
    for (side, &parent) in build.parents.iter().enumerate() {
        by_parent[parent].push(side);
    }
    let mut d2s = O2MRelation::new();
    for sides in &by_parent {
        d2s.push(sides);
    }

    Generated {
        topology,
        coordset: Some(coords_to_coordset(&build.coords_out, cset)),
        s2d: s2d.to_node(build.index_id),
        d2s: d2s.to_node(build.index_id),
    }
}

/// Partitions every cell into triangles (2D) or tetrahedra (3D), keeping
/// the source orientation; each simplex runs face-line-start,
/// face-line-end, [face-center,] cell-center.
pub fn generate_sides(topo: &Node, cset: &Node) -> Generated {
    let b = build(topo, cset);
    emit(&b, cset)
}

/// As [`generate_sides`], additionally mapping the selected fields onto the
/// side topology and emitting the auxiliary
/// `original_element_ids` / `original_vertex_ids` (and, when any
/// volume-dependent field is processed, `volume`) fields.
pub fn generate_sides_with_fields(
    topo: &Node,
    cset: &Node,
    fields: &Node,
    options: &SidesOptions,
) -> (Generated, Node) {
    let b = build(topo, cset);
    let generated = emit(&b, cset);

    // New vertices inherit the mean of the original vertices they share a
    // side with.
    let nverts_out = b.coords_out.nrows();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); nverts_out - b.nverts];
    for side in &b.conn {
        for &w in side {
            if w < b.nverts {
                continue;
            }
            let bucket = &mut neighbors[w - b.nverts];
            for &v in side {
                if v < b.nverts && !bucket.contains(&v) {
                    bucket.push(v);
                }
            }
        }
    }

    let mut out = Node::new();
    let mut any_volume_dependent = false;
    for (name, field) in fields.object_iter() {
        if let Some(selected) = options.field_names {
            if !selected.contains(&name) {
                continue;
            }
        }
        let volume_dependent = options.volume_dependent.contains(&name);
        let association = field.fetch("association").as_string();
        if association == "vertex" && volume_dependent {
            crate::fatal!("vertex-associated field {name:?} cannot be volume-dependent");
        }
        any_volume_dependent |= volume_dependent;

        let mapped = out.add_child(name);
        mapped.fetch_mut("association").set_string(&association);
        mapped
            .fetch_mut("topology")
            .set_string(options.topology_name);
        let values = field.fetch("values");
        if values.is_object() {
            for (comp, column) in values.object_iter() {
                let mapped_column = map_component(
                    &b,
                    &neighbors,
                    &column.to_vec::<f64>(),
                    &association,
                    volume_dependent,
                );
                mapped
                    .fetch_mut(&format!("values/{comp}"))
                    .set_slice(&mapped_column);
            }
        } else {
            let mapped_column = map_component(
                &b,
                &neighbors,
                &values.to_vec::<f64>(),
                &association,
                volume_dependent,
            );
            mapped.fetch_mut("values").set_slice(&mapped_column);
        }
    }

    let element_ids = out.fetch_mut("original_element_ids");
    element_ids.fetch_mut("association").set_string("element");
    element_ids
        .fetch_mut("topology")
        .set_string(options.topology_name);
    let parents: Vec<i64> = b.parents.iter().map(|&p| p as i64).collect();
    element_ids.fetch_mut("values").set_slice(&parents);

    let vertex_ids = out.fetch_mut("original_vertex_ids");
    vertex_ids.fetch_mut("association").set_string("vertex");
    vertex_ids
        .fetch_mut("topology")
        .set_string(options.topology_name);
    let originals: Vec<i64> = (0..nverts_out)
        .map(|v| if v < b.nverts { v as i64 } else { -1 })
        .collect();
    vertex_ids.fetch_mut("values").set_slice(&originals);

    if any_volume_dependent {
        let volume = out.fetch_mut("volume");
        volume.fetch_mut("association").set_string("element");
        volume.fetch_mut("topology").set_string(options.topology_name);
        volume.fetch_mut("values").set_slice(&b.volumes);
    }

    (generated, out)
}

fn map_component(
    b: &SidesBuild,
    neighbors: &[Vec<usize>],
    values: &[f64],
    association: &str,
    volume_dependent: bool,
) -> Vec<f64> {
    match association {
        "element" => b
            .parents
            .iter()
            .enumerate()
            .map(|(side, &parent)| {
                if volume_dependent {
                    values[parent] * b.volumes[side] / b.parent_volumes[parent]
                } else {
                    values[parent]
                }
            })
            .collect(),
        "vertex" => {
            let mut out = Vec::with_capacity(b.coords_out.nrows());
            out.extend(values.iter().take(b.nverts).copied());
            for bucket in neighbors {
                if bucket.is_empty() {
                    out.push(0.0);
                } else {
                    out.push(bucket.iter().map(|&v| values[v]).sum::<f64>() / bucket.len() as f64);
                }
            }
            out
        }
        other => crate::fatal!("cannot map a field with association {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_examples;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quad_grid_subdivides_into_triangles() {
        let mesh = mesh_examples::basic("quads", 3, 3, 0);
        let out = generate_sides(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        assert_eq!(out.topology["elements/shape"].as_string(), "tri");
        assert_eq!(
            out.topology["elements/connectivity"].number_of_elements(),
            16 * 3
        );
        let s2d = O2MRelation::from_node(&out.s2d);
        assert_eq!(s2d.len(), 16);
        assert_eq!(s2d.group(4), [1]);
        let d2s = O2MRelation::from_node(&out.d2s);
        assert_eq!(d2s.group(0), [0, 1, 2, 3]);
    }

    #[test]
    fn hex_subdivides_into_twenty_four_tets() {
        let mesh = mesh_examples::basic("hexs", 2, 2, 2);
        let out = generate_sides(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        assert_eq!(out.topology["elements/shape"].as_string(), "tet");
        let s2d = O2MRelation::from_node(&out.s2d);
        assert_eq!(s2d.len(), 24);
        // 8 corners + 6 face centers + 1 cell center.
        let cset = out.coordset.unwrap();
        assert_eq!(cset["values/x"].number_of_elements(), 15);
    }

    #[test]
    fn vertex_fields_average_onto_new_vertices() {
        let mut mesh = mesh_examples::basic("quads", 3, 3, 0);
        let f = mesh.fetch_mut("fields/f");
        f.fetch_mut("association").set_string("vertex");
        f.fetch_mut("topology").set_string("mesh");
        f.fetch_mut("values")
            .set_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let (_, fields) = generate_sides_with_fields(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
            mesh.fetch("fields"),
            &SidesOptions::default(),
        );
        let ids: Vec<i64> = fields["original_vertex_ids/values"].to_vec();
        assert_eq!(&ids[..9], &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&ids[9..], &[-1, -1, -1, -1]);
        let mapped: Vec<f64> = fields["f/values"].to_vec();
        assert_eq!(&mapped[..9], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        // First cell center averages its four corners 0, 1, 4, 3.
        assert_abs_diff_eq!(mapped[9], (1.0 + 2.0 + 5.0 + 4.0) / 4.0);
    }

    #[test]
    fn volume_dependent_fields_are_conserved() {
        let mut mesh = mesh_examples::basic("quads", 3, 3, 0);
        let f = mesh.fetch_mut("fields/mass");
        f.fetch_mut("association").set_string("element");
        f.fetch_mut("topology").set_string("mesh");
        f.fetch_mut("values").set_slice(&[8.0f64, 4.0, 2.0, 1.0]);
        let (out, fields) = generate_sides_with_fields(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
            mesh.fetch("fields"),
            &SidesOptions {
                volume_dependent: &["mass"],
                ..SidesOptions::default()
            },
        );
        let mapped: Vec<f64> = fields["mass/values"].to_vec();
        let s2d = O2MRelation::from_node(&out.s2d);
        let mut per_cell = [0.0f64; 4];
        for (side, group) in s2d.iter().enumerate() {
            per_cell[group[0]] += mapped[side];
        }
        for (cell, &expected) in [8.0, 4.0, 2.0, 1.0].iter().enumerate() {
            assert_abs_diff_eq!(per_cell[cell], expected, epsilon = 1e-9);
        }
        assert!(fields.has_child("volume"));
        let vols: Vec<f64> = fields["volume/values"].to_vec();
        assert_abs_diff_eq!(vols.iter().sum::<f64>(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn element_fields_copy_to_every_side() {
        let mut mesh = mesh_examples::basic("quads", 3, 3, 0);
        let f = mesh.fetch_mut("fields/region");
        f.fetch_mut("association").set_string("element");
        f.fetch_mut("topology").set_string("mesh");
        f.fetch_mut("values").set_slice(&[10.0f64, 20.0, 30.0, 40.0]);
        let (out, fields) = generate_sides_with_fields(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
            mesh.fetch("fields"),
            &SidesOptions::default(),
        );
        let mapped: Vec<f64> = fields["region/values"].to_vec();
        let s2d = O2MRelation::from_node(&out.s2d);
        for (side, group) in s2d.iter().enumerate() {
            assert_eq!(mapped[side], [10.0, 20.0, 30.0, 40.0][group[0]]);
        }
    }

    #[test]
    #[should_panic]
    fn volume_dependent_vertex_fields_are_fatal() {
        let mut mesh = mesh_examples::basic("quads", 3, 3, 0);
        let f = mesh.fetch_mut("fields/f");
        f.fetch_mut("association").set_string("vertex");
        f.fetch_mut("topology").set_string("mesh");
        f.fetch_mut("values").set_slice(&[0.0f64; 9]);
        let _ = generate_sides_with_fields(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
            mesh.fetch("fields"),
            &SidesOptions {
                volume_dependent: &["f"],
                ..SidesOptions::default()
            },
        );
    }
}
