//! End-to-end conformance of the conversion lattice and the generators:
//! every derived tree must itself verify against its protocol.

use nodekit::blueprint::mesh::{coordset, generate, topology};
use nodekit::{Node, blueprint, mesh_examples};

#[test]
fn coordset_conversion_lattice_conforms() {
    let mesh = mesh_examples::basic("uniform", 4, 3, 0);
    let u = mesh.fetch("coordsets/coords");
    let mut info = Node::new();

    let r = coordset::uniform::to_rectilinear(u);
    assert!(blueprint::verify("coordset", &r, &mut info));
    let e = coordset::rectilinear::to_explicit(&r);
    assert!(blueprint::verify("coordset", &e, &mut info));
    let e2 = coordset::uniform::to_explicit(u);
    assert!(!e.diff(&e2, &mut info, 0.0));
}

#[test]
fn uniform_to_explicit_coordinate_fidelity() {
    let mut u = Node::new();
    u.fetch_mut("type").set_string("uniform");
    u.fetch_mut("dims/i").set(4i64);
    u.fetch_mut("dims/j").set(3i64);
    u.fetch_mut("dims/k").set(2i64);
    u.fetch_mut("origin/x").set(-1.5f64);
    u.fetch_mut("origin/y").set(2.0f64);
    u.fetch_mut("origin/z").set(0.25f64);
    u.fetch_mut("spacing/dx").set(0.5f64);
    u.fetch_mut("spacing/dy").set(0.125f64);
    u.fetch_mut("spacing/dz").set(2.0f64);

    let e = coordset::uniform::to_explicit(&u);
    let xs: Vec<f64> = e["values/x"].to_vec();
    let ys: Vec<f64> = e["values/y"].to_vec();
    let zs: Vec<f64> = e["values/z"].to_vec();
    assert_eq!(xs.len(), 4 * 3 * 2);
    for k in 0..2 {
        for j in 0..3 {
            for i in 0..4 {
                let at = i + 4 * j + 12 * k;
                let expect_x = -1.5 + i as f64 * 0.5;
                let expect_y = 2.0 + j as f64 * 0.125;
                let expect_z = 0.25 + k as f64 * 2.0;
                assert!((xs[at] - expect_x).abs() <= 1e-12 * expect_x.abs().max(1.0));
                assert!((ys[at] - expect_y).abs() <= 1e-12 * expect_y.abs().max(1.0));
                assert!((zs[at] - expect_z).abs() <= 1e-12 * expect_z.abs().max(1.0));
            }
        }
    }
}

#[test]
fn topology_conversion_lattice_conforms() {
    let mut info = Node::new();
    for kind in ["uniform", "rectilinear"] {
        let mesh = mesh_examples::basic(kind, 3, 4, 0);
        let topo = mesh.fetch("topologies/mesh");
        let cset = mesh.fetch("coordsets/coords");

        let (s_topo, s_cset) = topology::uniform::to_structured(topo, cset);
        assert!(blueprint::verify("topology", &s_topo, &mut info));
        assert!(blueprint::verify("coordset", &s_cset, &mut info));

        let (u_topo, u_cset) = topology::structured::to_unstructured(&s_topo, &s_cset);
        assert!(blueprint::verify("topology", &u_topo, &mut info));
        assert!(blueprint::verify("coordset", &u_cset, &mut info));
        assert_eq!(u_topo["elements/shape"].as_string(), "quad");
        assert_eq!(topology::length(&u_topo, &u_cset), 6);
    }
}

#[test]
fn polyhedral_lattice_conforms() {
    let mesh = mesh_examples::basic("hexs", 3, 3, 2);
    let topo = mesh.fetch("topologies/mesh");
    let mut info = Node::new();

    let poly = topology::unstructured::to_polyhedral(topo);
    assert!(blueprint::verify("topology", &poly, &mut info));
    // Every face referenced by a cell exists in the subelements block.
    let nfaces = poly["subelements/sizes"].number_of_elements() as i64;
    for f in poly["elements/connectivity"].to_vec::<i64>() {
        assert!(f >= 0 && f < nfaces);
    }
}

#[test]
fn generated_topologies_conform_and_reference_their_coordsets() {
    let mesh = mesh_examples::basic("quads", 3, 3, 0);
    let topo = mesh.fetch("topologies/mesh");
    let cset = mesh.fetch("coordsets/coords");
    let mut info = Node::new();

    let sides = generate::generate_sides(topo, cset);
    assert!(blueprint::verify("topology", &sides.topology, &mut info));
    assert!(blueprint::verify("coordset", sides.coordset.as_ref().unwrap(), &mut info));
    assert_eq!(sides.topology["coordset"].as_string(), "coords_sides");

    let corners = generate::generate_corners(topo, cset);
    assert!(blueprint::verify("topology", &corners.topology, &mut info));
    assert!(blueprint::verify(
        "coordset",
        corners.coordset.as_ref().unwrap(),
        &mut info
    ));

    let centroids = generate::generate_centroids(topo, cset);
    assert!(blueprint::verify("topology", &centroids.topology, &mut info));
    assert!(blueprint::verify(
        "coordset",
        centroids.coordset.as_ref().unwrap(),
        &mut info
    ));
}

#[test]
fn assembled_mesh_with_generated_sides_verifies_whole() {
    let mut mesh = mesh_examples::basic("quads", 3, 3, 0);
    let (sides, fields) = {
        let topo = mesh.fetch("topologies/mesh");
        let cset = mesh.fetch("coordsets/coords");
        generate::generate_sides_with_fields(
            topo,
            cset,
            mesh.fetch("fields"),
            &generate::SidesOptions {
                topology_name: "sides",
                ..generate::SidesOptions::default()
            },
        )
    };
    mesh.fetch_mut("coordsets")
        .set_child("coords_sides", sides.coordset.unwrap());
    mesh.fetch_mut("topologies").set_child("sides", sides.topology);
    for (name, field) in fields.object_iter() {
        mesh.fetch_mut("fields").set_child(name, field.clone());
    }
    let mut info = Node::new();
    assert!(blueprint::verify("mesh", &mesh, &mut info), "{}", info.to_json());
}

#[test]
fn canonical_text_roundtrips_a_whole_mesh() {
    let mesh = mesh_examples::basic("polyhedra", 2, 2, 2);
    let back = Node::parse(&mesh.to_json(), "json").unwrap();
    assert_eq!(mesh, back);
    let mut info = Node::new();
    assert!(blueprint::verify("mesh", &back, &mut info));
    let back_yaml = Node::parse(&mesh.to_yaml(), "yaml").unwrap();
    assert_eq!(mesh, back_yaml);
}
