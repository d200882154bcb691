//! Distributed element partitioning: converts local mesh domains into the
//! flat `{eldist, eptr, eind}` arrays an external graph partitioner
//! consumes, invokes it across the transport, and writes the per-element
//! partition assignment back as a field on every domain.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use rustc_hash::FxHashMap;

use super::{coordset, topology};
use crate::{DataTypeId, Node};

/// Index width of the external partitioner, selected at compile time.
#[cfg(not(feature = "idx32"))]
pub type Idx = i64;
#[cfg(feature = "idx32")]
pub type Idx = i32;

/// Weight width of the external partitioner.
#[cfg(not(feature = "idx32"))]
pub type Real = f64;
#[cfg(feature = "idx32")]
pub type Real = f32;

#[cfg(not(feature = "idx32"))]
pub(crate) const IDX_DTYPE: DataTypeId = DataTypeId::Int64;
#[cfg(feature = "idx32")]
pub(crate) const IDX_DTYPE: DataTypeId = DataTypeId::Int32;

/// The parallel transport the driver suspends on: rank/size queries plus
/// one collective, element-wise max reduction over an integer vector.
pub trait Transport {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn max_reduce(&self, values: &mut [i64]);
}

/// Single-process transport: one rank, reductions are identities.
pub struct SelfTransport;

impl Transport for SelfTransport {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn max_reduce(&self, _values: &mut [i64]) {}
}

/// The external graph partitioner, consuming the distributed element
/// arrays: `eldist[0..=W]` per-worker element offsets, `eptr`/`eind` the
/// local element-to-global-vertex lists, `ncommon` the shared-vertex
/// adjacency threshold. Returns one partition id per local element, in
/// `[0, nparts)`.
pub trait ElementPartitioner {
    fn partition(
        &self,
        eldist: &[Idx],
        eptr: &[Idx],
        eind: &[Idx],
        ncommon: Idx,
        nparts: Idx,
        rank: usize,
    ) -> Vec<Idx>;
}

/// Deterministic stand-in sized for multi-rank runs: elements are assigned
/// by their global id into equal contiguous blocks.
pub struct BlockPartitioner;

impl ElementPartitioner for BlockPartitioner {
    fn partition(
        &self,
        eldist: &[Idx],
        eptr: &[Idx],
        _eind: &[Idx],
        _ncommon: Idx,
        nparts: Idx,
        rank: usize,
    ) -> Vec<Idx> {
        let base = eldist[rank];
        let total = *eldist.last().unwrap();
        (0..eptr.len() as Idx - 1)
            .map(|e| ((base + e) * nparts / total).min(nparts - 1))
            .collect()
    }
}

/// Reference in-process partitioner: builds the element adjacency graph
/// (elements sharing at least `ncommon` vertices) and grows `nparts`
/// regions of near-equal size by breadth-first search. Serves the
/// single-rank transport only.
pub struct RegionGrowPartitioner;

impl ElementPartitioner for RegionGrowPartitioner {
    fn partition(
        &self,
        eldist: &[Idx],
        eptr: &[Idx],
        eind: &[Idx],
        ncommon: Idx,
        nparts: Idx,
        _rank: usize,
    ) -> Vec<Idx> {
        if eldist.len() > 2 && eldist[eldist.len() - 1] != eldist[1] {
            crate::fatal!("the region-grow partitioner only serves single-rank runs");
        }
        let n = eptr.len() - 1;
        let mut graph: UnGraph<usize, ()> = UnGraph::default();
        let nodes: Vec<NodeIndex> = (0..n).map(|e| graph.add_node(e)).collect();

        let mut by_vertex: FxHashMap<Idx, Vec<usize>> = FxHashMap::default();
        for e in 0..n {
            for &v in &eind[eptr[e] as usize..eptr[e + 1] as usize] {
                by_vertex.entry(v).or_default().push(e);
            }
        }
        let mut shared: FxHashMap<(usize, usize), Idx> = FxHashMap::default();
        for elems in by_vertex.values() {
            for (i, &a) in elems.iter().enumerate() {
                for &b in &elems[i + 1..] {
                    *shared.entry((a.min(b), a.max(b))).or_insert(0) += 1;
                }
            }
        }
        for (&(a, b), &count) in &shared {
            if count >= ncommon {
                graph.add_edge(nodes[a], nodes[b], ());
            }
        }

        let target = n.div_ceil(nparts as usize);
        let mut part: Vec<Idx> = vec![-1; n];
        let mut assigned = 0usize;
        let mut current: Idx = 0;
        while assigned < n {
            let seed = (0..n).find(|&e| part[e] == -1).unwrap();
            let mut bfs = Bfs::new(&graph, nodes[seed]);
            let mut grown = 0usize;
            while let Some(nx) = bfs.next(&graph) {
                let e = graph[nx];
                if part[e] != -1 {
                    continue;
                }
                part[e] = current;
                assigned += 1;
                grown += 1;
                if grown >= target {
                    break;
                }
            }
            if current + 1 < nparts {
                current += 1;
            }
        }
        part
    }
}

#[derive(Debug, Default)]
struct Options {
    topology: Option<String>,
    field_prefix: String,
    partitions: Option<usize>,
    ncommon: Option<usize>,
}

/// Recognized keys: `topology`, `field_prefix`, `partitions`,
/// `parmetis_ncommonnodes`. The `parmetis_ncommonnodes` default is the
/// coordset dimensionality, 1-D topologies included (the partitioner
/// accepts a threshold of 1 there, with limited usefulness).
fn parse_options(options: &Node) -> Options {
    let mut out = Options::default();
    if let Some(t) = options.try_fetch("topology") {
        out.topology = Some(t.as_string());
    }
    if let Some(p) = options.try_fetch("field_prefix") {
        out.field_prefix = p.as_string();
    }
    if let Some(p) = options.try_fetch("partitions") {
        out.partitions = Some(p.to_i64() as usize);
    }
    if let Some(p) = options.try_fetch("parmetis_ncommonnodes") {
        out.ncommon = Some(p.to_i64() as usize);
    }
    out
}

struct DomainPlan {
    nelems: usize,
    nverts: usize,
    /// Per element: global vertex ids (domain-local until rebased).
    element_verts: Vec<Vec<usize>>,
    dim: usize,
}

fn plan_domain(domain: &Node, topo_name: &str) -> Option<DomainPlan> {
    let topo = domain.try_fetch(&format!("topologies/{topo_name}"))?;
    let cset_name = topo.fetch("coordset").as_string();
    let cset = domain.fetch(&format!("coordsets/{cset_name}"));
    let dim = coordset::dimension(cset);
    let nverts = coordset::length(cset);

    let element_verts = match topo.fetch("type").as_string().as_str() {
        "unstructured" => topology::element_vertices(topo),
        "uniform" | "rectilinear" => {
            let (utopo, _) = topology::uniform::to_unstructured(topo, cset);
            topology::element_vertices(&utopo)
        }
        "structured" => {
            let (utopo, _) = topology::structured::to_unstructured(topo, cset);
            topology::element_vertices(&utopo)
        }
        "points" => (0..nverts).map(|v| vec![v]).collect(),
        other => crate::fatal!("cannot partition a {other:?} topology"),
    };
    Some(DomainPlan {
        nelems: element_verts.len(),
        nverts,
        element_verts,
        dim,
    })
}

/// Assigns every element of the chosen topology, across all domains on all
/// workers, to one of `partitions` parts, and records the result as the
/// integer element field `{prefix}parmetis_result` on each domain (along
/// with `{prefix}global_vertex_ids` and `{prefix}global_element_ids`).
///
/// A run with zero domains on every worker returns silently; a topology
/// name found on no worker is fatal.
pub fn generate_partition_field<T: Transport, P: ElementPartitioner>(
    mesh: &mut Node,
    options: &Node,
    comm: &T,
    partitioner: &P,
) {
    let opts = parse_options(options);
    let rank = comm.rank();
    let size = comm.size();

    let topo_name = {
        let local_domains = super::domains(mesh);
        opts.topology.clone().unwrap_or_else(|| {
            local_domains
                .first()
                .and_then(|d| d.try_fetch("topologies"))
                .and_then(|t| t.child_names().first().map(|s| s.to_string()))
                .unwrap_or_default()
        })
    };

    // One reduction resolves presence, element/vertex totals and domain
    // counts for every worker.
    let (plans, ndomains_local) = {
        let local_domains = super::domains(mesh);
        let plans: Vec<Option<DomainPlan>> = local_domains
            .iter()
            .map(|d| plan_domain(d, &topo_name))
            .collect();
        let n = local_domains.len();
        (plans, n)
    };
    let nelems_local: usize = plans.iter().flatten().map(|p| p.nelems).sum();
    let nverts_local: usize = plans.iter().flatten().map(|p| p.nverts).sum();
    let found_local = plans.iter().any(Option::is_some);

    let mut totals = vec![0i64; 3 * size + 2];
    totals[rank] = nelems_local as i64;
    totals[size + rank] = nverts_local as i64;
    totals[2 * size + rank] = ndomains_local as i64;
    totals[3 * size] = i64::from(found_local);
    totals[3 * size + 1] = plans.iter().flatten().map(|p| p.dim).max().unwrap_or(0) as i64;
    comm.max_reduce(&mut totals);

    let global_domains: i64 = totals[2 * size..3 * size].iter().sum();
    if global_domains == 0 {
        return;
    }
    if totals[3 * size] == 0 {
        crate::fatal!("topology {topo_name:?} is present on no worker");
    }

    let element_base: i64 = totals[..rank].iter().sum();
    let vertex_base: i64 = totals[size..size + rank].iter().sum();
    let nparts = opts.partitions.unwrap_or(global_domains as usize) as Idx;
    let ncommon = opts.ncommon.unwrap_or(totals[3 * size + 1] as usize).max(1) as Idx;

    // eldist is the exclusive prefix sum of per-worker element counts.
    let mut eldist: Vec<Idx> = Vec::with_capacity(size + 1);
    let mut acc = 0i64;
    eldist.push(0);
    for w in 0..size {
        acc += totals[w];
        eldist.push(acc as Idx);
    }

    let mut eptr: Vec<Idx> = vec![0];
    let mut eind: Vec<Idx> = Vec::new();
    let mut vbase = vertex_base;
    for plan in plans.iter().flatten() {
        for verts in &plan.element_verts {
            for &v in verts {
                eind.push((vbase + v as i64) as Idx);
            }
            eptr.push(eind.len() as Idx);
        }
        vbase += plan.nverts as i64;
    }

    let part = partitioner.partition(&eldist, &eptr, &eind, ncommon, nparts, rank);
    if part.len() != nelems_local {
        crate::fatal!(
            "partitioner returned {} assignments for {nelems_local} local elements",
            part.len()
        );
    }

    // Writeback: global id fields plus the partition result per domain.
    let prefix = opts.field_prefix.clone();
    let mut ebase = element_base;
    let mut vbase = vertex_base;
    let mut at = 0usize;
    let domains = super::domains_mut(mesh);
    for (domain, plan) in domains.into_iter().zip(plans.iter()) {
        let Some(plan) = plan else { continue };
        let evals: Vec<i64> = (ebase..ebase + plan.nelems as i64).collect();
        let vvals: Vec<i64> = (vbase..vbase + plan.nverts as i64).collect();
        let pvals: Vec<i64> = part[at..at + plan.nelems]
            .iter()
            .map(|&p| p as i64)
            .collect();

        for (name, association, values) in [
            ("global_element_ids", "element", &evals),
            ("global_vertex_ids", "vertex", &vvals),
            ("parmetis_result", "element", &pvals),
        ] {
            let field = domain.fetch_mut(&format!("fields/{prefix}{name}"));
            field.fetch_mut("association").set_string(association);
            field.fetch_mut("topology").set_string(&topo_name);
            field.fetch_mut("values").set_slice(values);
            if IDX_DTYPE != DataTypeId::Int64 {
                let typed = field.fetch("values").to_data_type(IDX_DTYPE);
                *field.fetch_mut("values") = typed;
            }
        }

        ebase += plan.nelems as i64;
        vbase += plan.nverts as i64;
        at += plan.nelems;
    }
}
