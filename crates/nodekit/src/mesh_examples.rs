//! Canned conforming meshes used by tests and examples: every coordset and
//! topology flavor the conversion lattice covers, with a vertex and an
//! element field attached.

use crate::Node;
use crate::blueprint::mesh::{coordset, topology};

fn uniform_coordset(nx: usize, ny: usize, nz: usize) -> Node {
    let mut c = Node::new();
    c.fetch_mut("type").set_string("uniform");
    c.fetch_mut("dims/i").set(nx as i64);
    c.fetch_mut("dims/j").set(ny as i64);
    c.fetch_mut("origin/x").set(0.0f64);
    c.fetch_mut("origin/y").set(0.0f64);
    c.fetch_mut("spacing/dx").set(1.0f64);
    c.fetch_mut("spacing/dy").set(1.0f64);
    if nz > 0 {
        c.fetch_mut("dims/k").set(nz as i64);
        c.fetch_mut("origin/z").set(0.0f64);
        c.fetch_mut("spacing/dz").set(1.0f64);
    }
    c
}

/// Builds a single-domain mesh of the requested flavor over an
/// `nx` x `ny` (x `nz`) vertex grid with unit spacing. `nz == 0` builds a
/// 2D mesh. Recognized kinds: `uniform`, `rectilinear`, `structured`,
/// `quads`, `tris`, `hexs`, `tets`, `polygons`, `polyhedra`.
pub fn basic(kind: &str, nx: usize, ny: usize, nz: usize) -> Node {
    let mut mesh = Node::new();
    let uniform = uniform_coordset(nx, ny, nz);

    let (cset, topo) = match kind {
        "uniform" => {
            let mut topo = Node::new();
            topo.fetch_mut("type").set_string("uniform");
            topo.fetch_mut("coordset").set_string("coords");
            (uniform, topo)
        }
        "rectilinear" => {
            let mut topo = Node::new();
            topo.fetch_mut("type").set_string("rectilinear");
            topo.fetch_mut("coordset").set_string("coords");
            (coordset::uniform::to_rectilinear(&uniform), topo)
        }
        "structured" => {
            let mut topo = Node::new();
            topo.fetch_mut("type").set_string("structured");
            topo.fetch_mut("coordset").set_string("coords");
            topo.fetch_mut("elements/dims/i").set(nx as i64 - 1);
            topo.fetch_mut("elements/dims/j").set(ny as i64 - 1);
            if nz > 0 {
                topo.fetch_mut("elements/dims/k").set(nz as i64 - 1);
            }
            (coordset::uniform::to_explicit(&uniform), topo)
        }
        "quads" | "hexs" => {
            let mut implicit = Node::new();
            implicit.fetch_mut("type").set_string("uniform");
            implicit.fetch_mut("coordset").set_string("coords");
            let (topo, cset) = topology::uniform::to_unstructured(&implicit, &uniform);
            (cset, topo)
        }
        "tris" => {
            let (cset, quads) = {
                let mut implicit = Node::new();
                implicit.fetch_mut("type").set_string("uniform");
                implicit.fetch_mut("coordset").set_string("coords");
                let (topo, cset) = topology::uniform::to_unstructured(&implicit, &uniform);
                (cset, topo)
            };
            let conn: Vec<i64> = quads.fetch("elements/connectivity").to_vec();
            let mut tris: Vec<i64> = Vec::with_capacity(conn.len() / 4 * 6);
            for q in conn.chunks(4) {
                tris.extend([q[0], q[1], q[2], q[0], q[2], q[3]]);
            }
            let mut topo = Node::new();
            topo.fetch_mut("type").set_string("unstructured");
            topo.fetch_mut("coordset").set_string("coords");
            topo.fetch_mut("elements/shape").set_string("tri");
            topo.fetch_mut("elements/connectivity").set_slice(&tris);
            (cset, topo)
        }
        "tets" => {
            let (cset, hexs) = {
                let mut implicit = Node::new();
                implicit.fetch_mut("type").set_string("uniform");
                implicit.fetch_mut("coordset").set_string("coords");
                let (topo, cset) = topology::uniform::to_unstructured(&implicit, &uniform);
                (cset, topo)
            };
            let conn: Vec<i64> = hexs.fetch("elements/connectivity").to_vec();
            let mut tets: Vec<i64> = Vec::with_capacity(conn.len() / 8 * 24);
            // Six tets sharing the 0-6 diagonal of each hex.
            for h in conn.chunks(8) {
                for t in [
                    [0, 1, 2, 6],
                    [0, 2, 3, 6],
                    [0, 3, 7, 6],
                    [0, 7, 4, 6],
                    [0, 4, 5, 6],
                    [0, 5, 1, 6],
                ] {
                    tets.extend(t.iter().map(|&i| h[i]));
                }
            }
            let mut topo = Node::new();
            topo.fetch_mut("type").set_string("unstructured");
            topo.fetch_mut("coordset").set_string("coords");
            topo.fetch_mut("elements/shape").set_string("tet");
            topo.fetch_mut("elements/connectivity").set_slice(&tets);
            (cset, topo)
        }
        "polygons" => {
            let quads = basic("quads", nx, ny, 0);
            let topo = topology::unstructured::to_polygonal(quads.fetch("topologies/mesh"));
            (quads.fetch("coordsets/coords").clone(), topo)
        }
        "polyhedra" => {
            let hexs = basic("hexs", nx, ny, nz.max(2));
            let topo = topology::unstructured::to_polyhedral(hexs.fetch("topologies/mesh"));
            (hexs.fetch("coordsets/coords").clone(), topo)
        }
        other => crate::fatal!("unknown example mesh kind {other:?}"),
    };

    mesh.set_child("coordsets", {
        let mut c = Node::new();
        c.set_child("coords", cset);
        c
    });
    mesh.set_child("topologies", {
        let mut t = Node::new();
        t.set_child("mesh", topo);
        t
    });
    attach_fields(&mut mesh);
    mesh
}

/// Distance-from-origin vertex field and an index-valued element field.
fn attach_fields(mesh: &mut Node) {
    let (nverts, ncells, coords) = {
        let cset = mesh.fetch("coordsets/coords");
        let topo = mesh.fetch("topologies/mesh");
        let coords = crate::blueprint::mesh::topology_metadata::explicit_coords(cset);
        (coords.nrows(), topology::length(topo, cset), coords)
    };

    let dist: Vec<f64> = (0..nverts)
        .map(|v| coords.row(v).iter().map(|x| x * x).sum::<f64>().sqrt())
        .collect();
    let f = mesh.fetch_mut("fields/dist");
    f.fetch_mut("association").set_string("vertex");
    f.fetch_mut("topology").set_string("mesh");
    f.fetch_mut("values").set_slice(&dist);

    let ids: Vec<f64> = (0..ncells).map(|c| c as f64).collect();
    let f = mesh.fetch_mut("fields/cell_id");
    f.fetch_mut("association").set_string("element");
    f.fetch_mut("topology").set_string("mesh");
    f.fetch_mut("values").set_slice(&ids);
}

/// A multi-domain mesh: `n` uniform 2D domains laid side by side along x.
pub fn multi_domain(n: usize, nx: usize, ny: usize) -> Node {
    let mut mesh = Node::new();
    for d in 0..n {
        let name = format!("domain_{d:06}");
        let domain = mesh.add_child(&name);
        domain.fetch_mut("state/domain_id").set(d as i64);
        let cset = domain.fetch_mut("coordsets/coords");
        cset.fetch_mut("type").set_string("uniform");
        cset.fetch_mut("dims/i").set(nx as i64);
        cset.fetch_mut("dims/j").set(ny as i64);
        cset.fetch_mut("origin/x").set((d * (nx - 1)) as f64);
        cset.fetch_mut("origin/y").set(0.0f64);
        cset.fetch_mut("spacing/dx").set(1.0f64);
        cset.fetch_mut("spacing/dy").set(1.0f64);
        let topo = domain.fetch_mut("topologies/mesh");
        topo.fetch_mut("type").set_string("uniform");
        topo.fetch_mut("coordset").set_string("coords");
        attach_fields(domain);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint;

    #[test]
    fn every_kind_builds_and_verifies() {
        let mut info = Node::new();
        for (kind, nz) in [
            ("uniform", 0),
            ("rectilinear", 0),
            ("structured", 0),
            ("quads", 0),
            ("tris", 0),
            ("polygons", 0),
            ("hexs", 3),
            ("tets", 3),
            ("polyhedra", 3),
        ] {
            let mesh = basic(kind, 3, 3, nz);
            assert!(
                blueprint::verify("mesh", &mesh, &mut info),
                "{kind}: {}",
                info.to_json()
            );
        }
    }

    #[test]
    fn fields_are_sized_to_the_grid() {
        let mesh = basic("quads", 4, 3, 0);
        assert_eq!(mesh["fields/dist/values"].number_of_elements(), 12);
        assert_eq!(mesh["fields/cell_id/values"].number_of_elements(), 6);
    }

    #[test]
    fn multi_domain_domains_abut() {
        let mesh = multi_domain(2, 3, 3);
        assert_eq!(mesh.number_of_children(), 2);
        let o0: f64 = mesh["domain_000000/coordsets/coords/origin/x"].to_f64();
        let o1: f64 = mesh["domain_000001/coordsets/coords/origin/x"].to_f64();
        assert_eq!(o0, 0.0);
        assert_eq!(o1, 2.0);
    }
}
