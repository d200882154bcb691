use crate::Node;
use crate::blueprint::check::{log_result, require_enum, require_object, verify_mcarray};
use crate::blueprint::check::{log_error, require_number};

pub const TYPES: &[&str] = &["uniform", "rectilinear", "explicit"];

/// Recognized coordinate systems, in logical axis order.
pub const COORD_SYSTEMS: &[(&str, &[&str])] = &[
    ("cartesian", &["x", "y", "z"]),
    ("cylindrical", &["r", "z"]),
    ("spherical", &["r", "theta", "phi"]),
];

const LOGICAL_DIMS: &[&str] = &["i", "j", "k"];

/// Orders `names` per the coordinate system that contains them all;
/// falls back to the given order when none matches.
fn order_axes(names: &[String]) -> Vec<String> {
    for (_, axes) in COORD_SYSTEMS {
        if names.iter().all(|n| axes.contains(&n.as_str())) {
            return axes
                .iter()
                .filter(|a| names.iter().any(|n| n == *a))
                .map(|a| (*a).to_string())
                .collect();
        }
    }
    names.to_vec()
}

/// Logical axis names of a coordset, in coordinate-system order.
pub fn axes(coordset: &Node) -> Vec<String> {
    let kind = coordset.fetch("type").as_string();
    match kind.as_str() {
        "uniform" => {
            let d = coordset.fetch("dims").number_of_children();
            if let Some(origin) = coordset.try_fetch("origin") {
                let names: Vec<String> =
                    origin.child_names().iter().map(|s| s.to_string()).collect();
                return order_axes(&names);
            }
            ["x", "y", "z"][..d].iter().map(|s| s.to_string()).collect()
        }
        "rectilinear" | "explicit" => {
            let names: Vec<String> = coordset
                .fetch("values")
                .child_names()
                .iter()
                .map(|s| s.to_string())
                .collect();
            order_axes(&names)
        }
        other => crate::fatal!("unknown coordset type {other:?}"),
    }
}

pub fn dimension(coordset: &Node) -> usize {
    axes(coordset).len()
}

/// Per-axis vertex counts; a single flat count for explicit coordsets.
pub fn dims(coordset: &Node) -> Vec<usize> {
    let kind = coordset.fetch("type").as_string();
    match kind.as_str() {
        "uniform" => {
            let d = coordset.fetch("dims");
            LOGICAL_DIMS
                .iter()
                .filter_map(|name| d.child(name))
                .map(|c| c.to_i64() as usize)
                .collect()
        }
        "rectilinear" => {
            let values = coordset.fetch("values");
            axes(coordset)
                .iter()
                .map(|a| values.fetch(a).number_of_elements())
                .collect()
        }
        "explicit" => {
            let values = coordset.fetch("values");
            let first = values.child_at(0).map_or(0, Node::number_of_elements);
            vec![first]
        }
        other => crate::fatal!("unknown coordset type {other:?}"),
    }
}

/// Total vertex count.
pub fn length(coordset: &Node) -> usize {
    dims(coordset).iter().product()
}

/// Per-axis origin of a uniform coordset (0 where unspecified).
pub fn origin(coordset: &Node) -> Vec<f64> {
    let names = axes(coordset);
    names
        .iter()
        .map(|a| {
            coordset
                .try_fetch(&format!("origin/{a}"))
                .map_or(0.0, Node::to_f64)
        })
        .collect()
}

/// Per-axis spacing of a uniform coordset (1 where unspecified).
pub fn spacing(coordset: &Node) -> Vec<f64> {
    let names = axes(coordset);
    names
        .iter()
        .map(|a| {
            coordset
                .try_fetch(&format!("spacing/d{a}"))
                .map_or(1.0, Node::to_f64)
        })
        .collect()
}

/// Dispatching conversion to the explicit flavor.
pub fn to_explicit(coordset: &Node) -> Node {
    match coordset.fetch("type").as_string().as_str() {
        "uniform" => uniform::to_explicit(coordset),
        "rectilinear" => rectilinear::to_explicit(coordset),
        "explicit" => coordset.clone(),
        other => crate::fatal!("unknown coordset type {other:?}"),
    }
}

pub mod uniform {
    use super::*;

    /// Materializes per-axis value arrays `v[i] = origin + i * spacing`.
    pub fn to_rectilinear(coordset: &Node) -> Node {
        let names = super::axes(coordset);
        let counts = super::dims(coordset);
        let origin = super::origin(coordset);
        let spacing = super::spacing(coordset);
        let mut out = Node::new();
        out.fetch_mut("type").set_string("rectilinear");
        for (a, name) in names.iter().enumerate() {
            let vals: Vec<f64> = (0..counts[a])
                .map(|i| origin[a] + i as f64 * spacing[a])
                .collect();
            out.fetch_mut(&format!("values/{name}")).set_slice(&vals);
        }
        out
    }

    pub fn to_explicit(coordset: &Node) -> Node {
        rectilinear::to_explicit(&to_rectilinear(coordset))
    }
}

pub mod rectilinear {
    use super::*;

    /// Emits the Cartesian product of the axis values, first axis fastest,
    /// one coordinate tuple per vertex.
    pub fn to_explicit(coordset: &Node) -> Node {
        let names = super::axes(coordset);
        let values = coordset.fetch("values");
        let per_axis: Vec<Vec<f64>> = names.iter().map(|a| values.fetch(a).to_vec()).collect();
        let total: usize = per_axis.iter().map(Vec::len).product();

        let mut out = Node::new();
        out.fetch_mut("type").set_string("explicit");
        let mut repeat = 1;
        for (a, name) in names.iter().enumerate() {
            let axis_vals = &per_axis[a];
            let mut column = Vec::with_capacity(total);
            while column.len() < total {
                for &v in axis_vals {
                    for _ in 0..repeat {
                        column.push(v);
                    }
                }
            }
            out.fetch_mut(&format!("values/{name}")).set_slice(&column);
            repeat *= axis_vals.len();
        }
        out
    }
}

pub fn verify(coordset: &Node, info: &mut Node) -> bool {
    let proto = "coordset";
    let mut res = require_enum(coordset, info, proto, "type", TYPES);
    if res {
        match coordset.fetch("type").as_string().as_str() {
            "uniform" => res &= verify_uniform(coordset, info),
            "rectilinear" => res &= verify_rectilinear(coordset, info),
            "explicit" => {
                res &= require_object(coordset, info, proto, "values")
                    && verify_mcarray(coordset.fetch("values"), info, proto);
            }
            _ => unreachable!(),
        }
    }
    log_result(info, res)
}

fn verify_uniform(coordset: &Node, info: &mut Node) -> bool {
    let proto = "coordset::uniform";
    let mut res = require_object(coordset, info, proto, "dims");
    if !res {
        return false;
    }
    let d = coordset.fetch("dims");
    let rank = d.number_of_children();
    if rank == 0 || rank > 3 {
        log_error(info, proto, &format!("dims names {rank} axes"));
        return false;
    }
    for name in LOGICAL_DIMS.iter().take(rank) {
        res &= require_number(d, info, proto, name);
    }
    let names = axes(coordset);
    if names.len() != rank {
        log_error(
            info,
            proto,
            &format!("{} axis names for {rank} logical dims", names.len()),
        );
        res = false;
    }
    if let Some(origin) = coordset.try_fetch("origin") {
        for a in &names {
            if origin.has_child(a) {
                res &= require_number(origin, info, proto, a);
            }
        }
    }
    if let Some(spacing) = coordset.try_fetch("spacing") {
        for a in &names {
            let da = format!("d{a}");
            if spacing.has_child(&da) {
                res &= require_number(spacing, info, proto, &da);
            }
        }
    }
    res
}

fn verify_rectilinear(coordset: &Node, info: &mut Node) -> bool {
    let proto = "coordset::rectilinear";
    if !require_object(coordset, info, proto, "values") {
        return false;
    }
    let values = coordset.fetch("values");
    let mut res = true;
    if values.number_of_children() > 3 {
        log_error(info, proto, "more than 3 axis arrays");
        res = false;
    }
    for (name, axis) in values.object_iter() {
        if !axis.is_number() {
            log_error(info, proto, &format!("axis {name:?} is not numeric"));
            res = false;
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_examples;

    fn uniform_2d() -> Node {
        let mut c = Node::new();
        c.fetch_mut("type").set_string("uniform");
        c.fetch_mut("dims/i").set(3i64);
        c.fetch_mut("dims/j").set(2i64);
        c.fetch_mut("origin/x").set(0.0f64);
        c.fetch_mut("origin/y").set(0.0f64);
        c.fetch_mut("spacing/dx").set(1.0f64);
        c.fetch_mut("spacing/dy").set(2.0f64);
        c
    }

    #[test]
    fn uniform_to_explicit_is_column_major() {
        let e = uniform::to_explicit(&uniform_2d());
        assert_eq!(e["type"].as_string(), "explicit");
        assert_eq!(e["values/x"].to_vec::<f64>(), [0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(e["values/y"].to_vec::<f64>(), [0.0, 0.0, 0.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn uniform_to_rectilinear_materializes_axis_values() {
        let r = uniform::to_rectilinear(&uniform_2d());
        assert_eq!(r["values/x"].to_vec::<f64>(), [0.0, 1.0, 2.0]);
        assert_eq!(r["values/y"].to_vec::<f64>(), [0.0, 2.0]);
        let mut info = Node::new();
        assert!(verify(&r, &mut info));
    }

    #[test]
    fn conversions_conform() {
        let u = uniform_2d();
        let mut info = Node::new();
        assert!(verify(&u, &mut info));
        assert!(verify(&uniform::to_rectilinear(&u), &mut info));
        assert!(verify(&uniform::to_explicit(&u), &mut info));
    }

    #[test]
    fn axes_follow_coordinate_system_order() {
        let mut c = Node::new();
        c.fetch_mut("type").set_string("rectilinear");
        c.fetch_mut("values/z").set_slice(&[0.0f64, 1.0]);
        c.fetch_mut("values/r").set_slice(&[0.0f64, 1.0, 2.0]);
        assert_eq!(axes(&c), ["r", "z"]);
        assert_eq!(dims(&c), [3, 2]);
    }

    #[test]
    fn invalid_coordsets_are_reported_not_raised() {
        let mut c = Node::new();
        c.fetch_mut("type").set_string("spherical");
        let mut info = Node::new();
        assert!(!verify(&c, &mut info));
        assert_eq!(info["valid"].as_string(), "false");

        let mut c = uniform_2d();
        c.remove_child("dims");
        assert!(!verify(&c, &mut info));
    }

    #[test]
    fn example_coordsets_verify() {
        let mut info = Node::new();
        // The structured example carries the explicit coordset flavor.
        for kind in ["uniform", "rectilinear", "structured"] {
            let mesh = mesh_examples::basic(kind, 3, 3, 0);
            assert!(verify(mesh.fetch("coordsets/coords"), &mut info), "{kind}");
        }
    }
}
