use crate::node::{DataTypeId, Node};

/// One-to-many relation: for each of N "ones", a variable-length list of
/// "manys", encoded as the flat arrays `{values, sizes, offsets}`.
///
/// The in-memory form keeps `usize` indices; [`O2MRelation::to_node`] and
/// [`O2MRelation::from_node`] move between it and the tree encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct O2MRelation {
    values: Vec<usize>,
    sizes: Vec<usize>,
    offsets: Vec<usize>,
}

impl O2MRelation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(ones: usize, manys: usize) -> Self {
        Self {
            values: Vec::with_capacity(manys),
            sizes: Vec::with_capacity(ones),
            offsets: Vec::with_capacity(ones),
        }
    }

    /// Number of "ones".
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Total number of "manys" across all groups.
    pub fn total_values(&self) -> usize {
        self.values.len()
    }

    pub fn push(&mut self, group: &[usize]) {
        self.offsets.push(self.values.len());
        self.sizes.push(group.len());
        self.values.extend_from_slice(group);
    }

    pub fn group(&self, i: usize) -> &[usize] {
        let start = self.offsets[i];
        &self.values[start..start + self.sizes[i]]
    }

    pub fn iter(&self) -> O2MIter<'_> {
        O2MIter { rel: self, at: 0 }
    }

    pub fn values(&self) -> &[usize] {
        &self.values
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Inverts the relation: `many -> [ones containing it]`, with `domain`
    /// the number of distinct "manys".
    pub fn inverted(&self, domain: usize) -> O2MRelation {
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); domain];
        for (one, group) in self.iter().enumerate() {
            for &many in group {
                buckets[many].push(one);
            }
        }
        let mut out = O2MRelation::new();
        for bucket in &buckets {
            out.push(bucket);
        }
        out
    }

    /// Encodes as a `{values, sizes, offsets}` subtree with `id`-kind
    /// integer arrays.
    pub fn to_node(&self, id: DataTypeId) -> Node {
        if !id.is_integer() {
            crate::fatal!("one-to-many arrays must be integer, not {}", id.name());
        }
        let mut n = Node::new();
        let as_i64 = |v: &[usize]| v.iter().map(|&x| x as i64).collect::<Vec<_>>();
        n.fetch_mut("values").set_slice(&as_i64(&self.values));
        n.fetch_mut("sizes").set_slice(&as_i64(&self.sizes));
        n.fetch_mut("offsets").set_slice(&as_i64(&self.offsets));
        if id != DataTypeId::Int64 {
            return n.to_data_type(id);
        }
        n
    }

    pub fn from_node(n: &Node) -> O2MRelation {
        let values = n.fetch("values").to_vec::<i64>();
        let sizes = n.fetch("sizes").to_vec::<i64>();
        let offsets = if n.has_child("offsets") {
            n.fetch("offsets").to_vec::<i64>()
        } else {
            // Rebuild implicit offsets from the sizes prefix sum.
            let mut acc = 0i64;
            sizes
                .iter()
                .map(|&s| {
                    let at = acc;
                    acc += s;
                    at
                })
                .collect()
        };
        O2MRelation {
            values: values.into_iter().map(|v| v as usize).collect(),
            sizes: sizes.into_iter().map(|v| v as usize).collect(),
            offsets: offsets.into_iter().map(|v| v as usize).collect(),
        }
    }

    /// Whether a node looks like a one-to-many encoding.
    pub fn conforms(n: &Node) -> bool {
        n.has_child("values")
            && n.has_child("sizes")
            && n.fetch("values").is_integer()
            && n.fetch("sizes").is_integer()
    }
}

pub struct O2MIter<'a> {
    rel: &'a O2MRelation,
    at: usize,
}

impl<'a> Iterator for O2MIter<'a> {
    type Item = &'a [usize];

    fn next(&mut self) -> Option<Self::Item> {
        if self.at >= self.rel.len() {
            return None;
        }
        let group = self.rel.group(self.at);
        self.at += 1;
        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.rel.len() - self.at;
        (left, Some(left))
    }
}

impl<'a> IntoIterator for &'a O2MRelation {
    type Item = &'a [usize];
    type IntoIter = O2MIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_iterate() {
        let mut rel = O2MRelation::new();
        rel.push(&[0, 1, 2]);
        rel.push(&[3]);
        rel.push(&[4, 5]);
        assert_eq!(rel.len(), 3);
        assert_eq!(rel.total_values(), 6);
        let groups: Vec<&[usize]> = rel.iter().collect();
        assert_eq!(groups, [&[0usize, 1, 2][..], &[3][..], &[4, 5][..]]);
        assert_eq!(rel.offsets(), [0, 3, 4]);
    }

    #[test]
    fn node_roundtrip() {
        let mut rel = O2MRelation::new();
        rel.push(&[5, 6]);
        rel.push(&[7, 8, 9]);
        let n = rel.to_node(DataTypeId::Int32);
        assert_eq!(n["values"].dtype().id(), DataTypeId::Int32);
        assert_eq!(O2MRelation::from_node(&n), rel);
    }

    #[test]
    fn implicit_offsets_rebuild() {
        let mut n = Node::new();
        n.fetch_mut("values").set_slice(&[1i64, 2, 3, 4]);
        n.fetch_mut("sizes").set_slice(&[3i64, 1]);
        let rel = O2MRelation::from_node(&n);
        assert_eq!(rel.group(1), [4]);
    }

    #[test]
    fn inversion() {
        let mut rel = O2MRelation::new();
        rel.push(&[0, 1]);
        rel.push(&[1, 2]);
        let inv = rel.inverted(3);
        assert_eq!(inv.group(0), [0]);
        assert_eq!(inv.group(1), [0, 1]);
        assert_eq!(inv.group(2), [1]);
    }
}
