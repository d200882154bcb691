use ndarray as nd;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::shape::{ShapeType, polygon_edges};
use super::{coordset, topology};
use crate::o2m::O2MRelation;
use crate::{DataTypeId, Node};

type VertKey = SmallVec<[usize; 8]>;

/// Per-dimension entity store built while walking the cascade.
#[derive(Debug, Default)]
struct DimData {
    dedup: FxHashMap<VertKey, usize>,
    /// Global entities: vertex ids in first-seen orientation.
    entities: Vec<Vec<usize>>,
    /// Local entities: one per occurrence, orientation retained.
    local_verts: Vec<Vec<usize>>,
    le2ge: Vec<usize>,
    /// Per local entity: ordered local ids of its (dim-1) children.
    children: Vec<Vec<usize>>,
    shape: Option<ShapeType>,
}

impl DimData {
    fn add(&mut self, verts: &[usize], shape: ShapeType) -> (usize, usize) {
        let lid = self.local_verts.len();
        self.local_verts.push(verts.to_vec());
        self.children.push(Vec::new());
        let mut key: VertKey = verts.iter().copied().collect();
        key.sort_unstable();
        let gid = match self.dedup.get(&key) {
            Some(&g) => g,
            None => {
                let g = self.entities.len();
                self.dedup.insert(key, g);
                self.entities.push(verts.to_vec());
                g
            }
        };
        self.le2ge.push(gid);
        match self.shape {
            None => self.shape = Some(shape),
            Some(prev) if prev != shape => self.shape = Some(mixed_shape(prev)),
            Some(_) => {}
        }
        (lid, gid)
    }
}

fn mixed_shape(any: ShapeType) -> ShapeType {
    match any.dimension() {
        2 => ShapeType::Polygonal,
        3 => ShapeType::Polyhedral,
        _ => any,
    }
}

/// Boundary entities of one occurrence, in the parent's orientation.
fn children_of(shape: ShapeType, verts: &[usize]) -> Vec<(ShapeType, Vec<usize>)> {
    match shape {
        ShapeType::Point => Vec::new(),
        ShapeType::Polygonal => polygon_edges(verts)
            .into_iter()
            .map(|e| (ShapeType::Line, e))
            .collect(),
        ShapeType::Polyhedral => {
            crate::fatal!("polyhedral entities expand through their face lists")
        }
        _ => {
            let child_shape = shape.face_shape().unwrap();
            shape
                .faces()
                .iter()
                .map(|face| (child_shape, face.iter().map(|&l| verts[l]).collect()))
                .collect()
        }
    }
}

/// Derived cache over one unstructured topology: for every dimension k up to
/// the topology's, the deduplicated k-entity topology, local and global
/// adjacency tables for every dimension pair, and local-to-global id maps.
pub struct TopologyMetadata {
    topo_dim: usize,
    coordset_name: String,
    index_id: DataTypeId,
    coords: nd::Array2<f64>,
    dims: Vec<DimData>,
    dim_topos: Vec<Node>,
    local_assoc: FxHashMap<(usize, usize), Vec<Vec<usize>>>,
    global_assoc: FxHashMap<(usize, usize), Vec<Vec<usize>>>,
}

impl TopologyMetadata {
    pub fn new(topo: &Node, cset: &Node) -> Self {
        if topo.fetch("type").as_string() != "unstructured" {
            crate::fatal!("topology metadata requires an unstructured topology");
        }
        let cell_shape = topology::shape_of(topo);
        let topo_dim = cell_shape.dimension();
        let coords = explicit_coords(cset);

        let mut dims: Vec<DimData> = (0..=topo_dim).map(|_| DimData::default()).collect();

        if cell_shape == ShapeType::Polyhedral {
            let cells = topology::elements(topo);
            let faces = topology::subelements(topo);
            let cell_verts = topology::element_vertices(topo);
            for (c, face_ids) in cells.iter().enumerate() {
                let (lid, _) = dims[topo_dim].add(&cell_verts[c], ShapeType::Polyhedral);
                for &f in face_ids {
                    let clid = expand(&mut dims, ShapeType::Polygonal, faces.group(f));
                    dims[topo_dim].children[lid].push(clid);
                }
            }
        } else {
            for cell in topology::elements(topo).iter() {
                expand(&mut dims, cell_shape, cell);
            }
        }

        let mut meta = TopologyMetadata {
            topo_dim,
            coordset_name: topo.fetch("coordset").as_string(),
            index_id: topology::index_dtype(topo, cset),
            coords,
            dims,
            dim_topos: Vec::new(),
            local_assoc: FxHashMap::default(),
            global_assoc: FxHashMap::default(),
        };
        meta.build_associations();
        meta.build_dim_topos();
        if cell_shape == ShapeType::Polyhedral {
            // The vertex-list rendering loses the face factoring; the top
            // dimension keeps the source encoding.
            meta.dim_topos[topo_dim] = topo.clone();
        }
        meta
    }

    fn build_associations(&mut self) {
        let d = self.topo_dim;
        // Identity pairs.
        for s in 0..=d {
            let n_local = self.dims[s].local_verts.len();
            self.local_assoc
                .insert((s, s), (0..n_local).map(|i| vec![i]).collect());
            let n_global = self.dims[s].entities.len();
            self.global_assoc
                .insert((s, s), (0..n_global).map(|i| vec![i]).collect());
        }
        // Downward: children composed across the cascade, deduplicated by
        // global identity while keeping first-seen (oriented) order.
        for s in 1..=d {
            let direct: Vec<Vec<usize>> = self.dims[s].children.clone();
            self.local_assoc.insert((s, s - 1), direct);
            for t in (0..s.saturating_sub(1)).rev() {
                let upper = self.local_assoc[&(s, t + 1)].clone();
                let step = self.local_assoc[&(t + 1, t)].clone();
                let composed: Vec<Vec<usize>> = upper
                    .iter()
                    .map(|mids| {
                        let mut seen: SmallVec<[usize; 16]> = SmallVec::new();
                        let mut out = Vec::new();
                        for &m in mids {
                            for &c in &step[m] {
                                let g = self.dims[t].le2ge[c];
                                if !seen.contains(&g) {
                                    seen.push(g);
                                    out.push(c);
                                }
                            }
                        }
                        out
                    })
                    .collect();
                self.local_assoc.insert((s, t), composed);
            }
        }
        // Downward global tables: first local occurrence of each global
        // entity defines its association list.
        for s in 1..=d {
            for t in 0..s {
                let n_global = self.dims[s].entities.len();
                let mut table: Vec<Option<Vec<usize>>> = vec![None; n_global];
                let local = &self.local_assoc[&(s, t)];
                for (lid, list) in local.iter().enumerate() {
                    let gid = self.dims[s].le2ge[lid];
                    if table[gid].is_none() {
                        table[gid] =
                            Some(list.iter().map(|&c| self.dims[t].le2ge[c]).collect());
                    }
                }
                self.global_assoc
                    .insert((s, t), table.into_iter().map(Option::unwrap).collect());
            }
        }
        // Upward tables are the inversions.
        for s in 1..=d {
            for t in 0..s {
                let down = &self.global_assoc[&(s, t)];
                let mut up: Vec<Vec<usize>> = vec![Vec::new(); self.dims[t].entities.len()];
                for (sid, list) in down.iter().enumerate() {
                    for &tid in list {
                        up[tid].push(sid);
                    }
                }
                self.global_assoc.insert((t, s), up);

                let down_local = &self.local_assoc[&(s, t)];
                let mut up_local: Vec<Vec<usize>> =
                    vec![Vec::new(); self.dims[t].local_verts.len()];
                for (sid, list) in down_local.iter().enumerate() {
                    for &tid in list {
                        up_local[tid].push(sid);
                    }
                }
                self.local_assoc.insert((t, s), up_local);
            }
        }
    }

    fn build_dim_topos(&mut self) {
        for k in 0..=self.topo_dim {
            let shape = self.dims[k].shape.unwrap_or(ShapeType::Point);
            let mut topo = Node::new();
            topo.fetch_mut("type").set_string("unstructured");
            topo.fetch_mut("coordset").set_string(&self.coordset_name);
            topo.fetch_mut("elements/shape").set_string(shape.name());
            let mut conn: Vec<i64> = Vec::new();
            let mut sizes: Vec<i64> = Vec::new();
            for verts in &self.dims[k].entities {
                conn.extend(verts.iter().map(|&v| v as i64));
                sizes.push(verts.len() as i64);
            }
            set_index(topo.fetch_mut("elements/connectivity"), &conn, self.index_id);
            if shape.is_poly() {
                set_index(topo.fetch_mut("elements/sizes"), &sizes, self.index_id);
                topology::unstructured::generate_offsets(&mut topo);
            }
            self.dim_topos.push(topo);
        }
    }

    pub fn dimension(&self) -> usize {
        self.topo_dim
    }

    pub fn coords(&self) -> &nd::Array2<f64> {
        &self.coords
    }

    pub fn coordset_name(&self) -> &str {
        &self.coordset_name
    }

    pub(crate) fn index_id(&self) -> DataTypeId {
        self.index_id
    }

    /// Deduplicated count of k-dimensional entities.
    pub fn entity_count(&self, dim: usize) -> usize {
        self.dims[dim].entities.len()
    }

    pub fn local_entity_count(&self, dim: usize) -> usize {
        self.dims[dim].local_verts.len()
    }

    /// The deduplicated k-entity topology.
    pub fn topology(&self, dim: usize) -> &Node {
        &self.dim_topos[dim]
    }

    pub fn le2ge(&self, dim: usize) -> &[usize] {
        &self.dims[dim].le2ge
    }

    /// Vertex ids of a global entity, in first-seen orientation.
    pub fn entity_vertices(&self, dim: usize, gid: usize) -> &[usize] {
        &self.dims[dim].entities[gid]
    }

    /// Global id of the entity with this unordered vertex set, if present.
    pub fn entity_id(&self, dim: usize, verts: &[usize]) -> Option<usize> {
        let mut key: VertKey = verts.iter().copied().collect();
        key.sort_unstable();
        self.dims[dim].dedup.get(&key).copied()
    }

    /// Vertex ids of a local occurrence, in its parent's orientation.
    pub fn local_entity_vertices(&self, dim: usize, lid: usize) -> &[usize] {
        &self.dims[dim].local_verts[lid]
    }

    /// Global ids of dimension `t` associated with global entity `gid` of
    /// dimension `s`.
    pub fn global_association(&self, gid: usize, s: usize, t: usize) -> &[usize] {
        &self.global_assoc[&(s, t)][gid]
    }

    /// Local ids of dimension `t` associated with local occurrence `lid` of
    /// dimension `s`, in the occurrence's orientation.
    pub fn local_association(&self, lid: usize, s: usize, t: usize) -> &[usize] {
        &self.local_assoc[&(s, t)][lid]
    }

    /// The `(s, t)` global table as a one-to-many relation.
    pub fn association_o2m(&self, s: usize, t: usize) -> O2MRelation {
        let mut rel = O2MRelation::new();
        for list in &self.global_assoc[&(s, t)] {
            rel.push(list);
        }
        rel
    }

    /// Centroid of a global entity: mean of its unique vertex coordinates.
    pub fn entity_centroid(&self, dim: usize, gid: usize) -> Vec<f64> {
        let verts = &self.dims[dim].entities[gid];
        let mut unique: SmallVec<[usize; 16]> = SmallVec::new();
        for &v in verts {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }
        let d_space = self.coords.ncols();
        let mut c = vec![0.0; d_space];
        for &v in &unique {
            for a in 0..d_space {
                c[a] += self.coords[[v, a]];
            }
        }
        for v in &mut c {
            *v /= unique.len() as f64;
        }
        c
    }
}

fn expand(dims: &mut [DimData], shape: ShapeType, verts: &[usize]) -> usize {
    let dim = shape.dimension();
    let (lid, _) = dims[dim].add(verts, shape);
    for (child_shape, child_verts) in children_of(shape, verts) {
        let clid = expand(dims, child_shape, &child_verts);
        dims[dim].children[lid].push(clid);
    }
    lid
}

fn set_index(dst: &mut Node, values: &[i64], id: DataTypeId) {
    dst.set_slice(values);
    if id != DataTypeId::Int64 {
        *dst = dst.to_data_type(id);
    }
}

/// Vertex coordinates of any coordset flavor as an `(n, d)` matrix.
pub fn explicit_coords(cset: &Node) -> nd::Array2<f64> {
    let explicit = coordset::to_explicit(cset);
    let axes = coordset::axes(&explicit);
    let values = explicit.fetch("values");
    let n = values.child_at(0).map_or(0, Node::number_of_elements);
    let mut coords = nd::Array2::zeros((n, axes.len()));
    for (a, name) in axes.iter().enumerate() {
        for (i, v) in values.fetch(name).to_vec::<f64>().into_iter().enumerate() {
            coords[[i, a]] = v;
        }
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_examples;

    fn quad_grid_metadata() -> TopologyMetadata {
        let mesh = mesh_examples::basic("quads", 3, 3, 0);
        TopologyMetadata::new(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        )
    }

    #[test]
    fn quad_grid_cascade_counts() {
        let meta = quad_grid_metadata();
        assert_eq!(meta.dimension(), 2);
        assert_eq!(meta.entity_count(2), 4);
        assert_eq!(meta.entity_count(1), 12);
        assert_eq!(meta.entity_count(0), 9);
        assert_eq!(meta.local_entity_count(2), 4);
        assert_eq!(meta.local_entity_count(1), 16);
    }

    #[test]
    fn entities_are_deduplicated() {
        let meta = quad_grid_metadata();
        for k in 0..=meta.dimension() {
            let mut keys: Vec<Vec<usize>> = (0..meta.entity_count(k))
                .map(|g| {
                    let mut v = meta.entity_vertices(k, g).to_vec();
                    v.sort_unstable();
                    v
                })
                .collect();
            let before = keys.len();
            keys.sort();
            keys.dedup();
            assert_eq!(keys.len(), before, "dim {k} holds duplicates");
        }
    }

    #[test]
    fn global_tables_follow_le2ge() {
        let meta = quad_grid_metadata();
        for lid in 0..meta.local_entity_count(2) {
            let gid = meta.le2ge(2)[lid];
            let local_mapped: Vec<usize> = meta
                .local_association(lid, 2, 0)
                .iter()
                .map(|&c| meta.le2ge(0)[c])
                .collect();
            assert_eq!(local_mapped, meta.global_association(gid, 2, 0));
        }
    }

    #[test]
    fn cell_to_vertex_association_is_oriented() {
        let meta = quad_grid_metadata();
        // First cell of the 2x2 grid keeps its winding.
        assert_eq!(meta.global_association(0, 2, 0), [0, 1, 4, 3]);
        assert_eq!(meta.global_association(0, 2, 1).len(), 4);
    }

    #[test]
    fn upward_association_inverts_downward() {
        let meta = quad_grid_metadata();
        // Point entities number in first-seen order, so the center vertex
        // (id 4, third corner of the first cell) is entity 2. It touches
        // all four cells.
        assert_eq!(meta.entity_vertices(0, 2), [4]);
        assert_eq!(meta.global_association(2, 0, 2), [0, 1, 2, 3]);
        // An interior edge touches exactly two cells.
        let interior: Vec<usize> = (0..meta.entity_count(1))
            .filter(|&e| meta.global_association(e, 1, 2).len() == 2)
            .collect();
        assert_eq!(interior.len(), 4);
    }

    #[test]
    fn hex_cascade_counts() {
        let mesh = mesh_examples::basic("hexs", 3, 3, 3);
        let meta = TopologyMetadata::new(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        assert_eq!(meta.dimension(), 3);
        assert_eq!(meta.entity_count(3), 8);
        assert_eq!(meta.entity_count(2), 36);
        assert_eq!(meta.entity_count(1), 54);
        assert_eq!(meta.entity_count(0), 27);
    }

    #[test]
    fn dim_topos_conform() {
        let meta = quad_grid_metadata();
        let mut info = Node::new();
        for k in 0..=meta.dimension() {
            assert!(topology::verify(meta.topology(k), &mut info));
        }
        assert_eq!(meta.topology(1).fetch("elements/shape").as_string(), "line");
        assert_eq!(
            meta.topology(0)
                .fetch("elements/connectivity")
                .number_of_elements(),
            9
        );
    }

    #[test]
    fn polyhedral_input_expands_through_faces() {
        let mesh = mesh_examples::basic("polyhedra", 2, 2, 2);
        let meta = TopologyMetadata::new(
            mesh.fetch("topologies/mesh"),
            mesh.fetch("coordsets/coords"),
        );
        assert_eq!(meta.dimension(), 3);
        assert_eq!(meta.entity_count(3), 1);
        assert_eq!(meta.entity_count(2), 6);
        assert_eq!(meta.entity_count(1), 12);
        assert_eq!(meta.entity_count(0), 8);
    }
}
