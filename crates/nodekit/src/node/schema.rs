use serde_json::{Map, Value, json};

use super::dtype::{DataType, DataTypeId};
use super::named::NamedSeq;
use super::path;

/// Describes the shape of a [`super::Node`] tree: interior nodes are ordered
/// key/child maps or child sequences, leaves carry a [`DataType`]. A schema
/// also totals the byte extent one contiguous buffer needs to back it.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    dtype: DataType,
    children: SchemaChildren,
}

#[derive(Debug, Clone, PartialEq)]
enum SchemaChildren {
    None,
    Object(NamedSeq<Schema>),
    List(Vec<Schema>),
}

impl Schema {
    pub fn empty() -> Self {
        Self {
            dtype: DataType::empty(),
            children: SchemaChildren::None,
        }
    }

    pub fn leaf(dtype: DataType) -> Self {
        if !dtype.id().is_leaf() {
            crate::fatal!("schema leaf built from non-leaf kind {}", dtype.id().name());
        }
        Self {
            dtype,
            children: SchemaChildren::None,
        }
    }

    pub fn object() -> Self {
        Self {
            dtype: DataType::object(),
            children: SchemaChildren::Object(NamedSeq::new()),
        }
    }

    pub fn list() -> Self {
        Self {
            dtype: DataType::list(),
            children: SchemaChildren::List(Vec::new()),
        }
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn is_empty(&self) -> bool {
        self.dtype.is_empty()
    }

    pub fn is_object(&self) -> bool {
        self.dtype.is_object()
    }

    pub fn is_list(&self) -> bool {
        self.dtype.is_list()
    }

    pub fn is_leaf(&self) -> bool {
        self.dtype.id().is_leaf()
    }

    pub fn number_of_children(&self) -> usize {
        match &self.children {
            SchemaChildren::None => 0,
            SchemaChildren::Object(seq) => seq.len(),
            SchemaChildren::List(items) => items.len(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Schema> {
        match &self.children {
            SchemaChildren::Object(seq) => seq.get(name),
            _ => None,
        }
    }

    pub fn child_at(&self, i: usize) -> Option<&Schema> {
        match &self.children {
            SchemaChildren::Object(seq) => seq.at(i),
            SchemaChildren::List(items) => items.get(i),
            SchemaChildren::None => None,
        }
    }

    pub fn child_names(&self) -> Vec<&str> {
        match &self.children {
            SchemaChildren::Object(seq) => seq.names().collect(),
            _ => Vec::new(),
        }
    }

    pub fn children(&self) -> impl Iterator<Item = &Schema> {
        let (obj, list): (Option<&NamedSeq<Schema>>, Option<&Vec<Schema>>) = match &self.children {
            SchemaChildren::Object(seq) => (Some(seq), None),
            SchemaChildren::List(items) => (None, Some(items)),
            SchemaChildren::None => (None, None),
        };
        obj.into_iter()
            .flat_map(NamedSeq::items)
            .chain(list.into_iter().flatten())
    }

    pub fn fetch(&self, p: &str) -> Option<&Schema> {
        let mut cur = self;
        for seg in path::split_path(p) {
            cur = cur.child(seg)?;
        }
        Some(cur)
    }

    /// Descends `p`, turning empty nodes into objects along the way.
    pub fn fetch_or_create(&mut self, p: &str) -> &mut Schema {
        let mut cur = self;
        for seg in path::split_path(p) {
            cur = cur.add_child(seg);
        }
        cur
    }

    /// Returns the named child, creating an empty one (and converting this
    /// node to an object) when missing.
    pub fn add_child(&mut self, name: &str) -> &mut Schema {
        if matches!(self.children, SchemaChildren::None) {
            if self.is_leaf() {
                crate::fatal!("cannot add child {name:?} to a {} leaf", self.dtype.id().name());
            }
            self.dtype = DataType::object();
            self.children = SchemaChildren::Object(NamedSeq::new());
        }
        match &mut self.children {
            SchemaChildren::Object(seq) => seq.get_or_insert_with(name, Schema::empty),
            SchemaChildren::List(_) => {
                crate::fatal!("cannot fetch child {name:?} of a list schema by name")
            }
            SchemaChildren::None => unreachable!(),
        }
    }

    /// Appends a nameless child, converting an empty node to a list.
    pub fn append(&mut self) -> &mut Schema {
        if matches!(self.children, SchemaChildren::None) {
            if self.is_leaf() {
                crate::fatal!("cannot append to a {} leaf", self.dtype.id().name());
            }
            self.dtype = DataType::list();
            self.children = SchemaChildren::List(Vec::new());
        }
        match &mut self.children {
            SchemaChildren::List(items) => {
                items.push(Schema::empty());
                items.last_mut().unwrap()
            }
            _ => crate::fatal!("cannot append to an object schema"),
        }
    }

    pub fn set_child(&mut self, name: &str, child: Schema) {
        *self.add_child(name) = child;
    }

    pub fn remove_child(&mut self, name: &str) -> Option<Schema> {
        match &mut self.children {
            SchemaChildren::Object(seq) => seq.remove(name),
            _ => None,
        }
    }

    /// Byte extent of one contiguous buffer backing the whole tree: the
    /// maximum end position over all leaves.
    pub fn total_strided_bytes(&self) -> usize {
        if self.is_leaf() {
            return self.dtype.spanned_bytes();
        }
        self.children
            .iter_all()
            .map(Schema::total_strided_bytes)
            .max()
            .unwrap_or(0)
    }

    /// An equivalent schema re-laid-out gaplessly: leaves are assigned
    /// sequential offsets in walk order with compact strides.
    pub fn compacted(&self) -> Schema {
        let mut offset = 0;
        self.compact_from(&mut offset)
    }

    fn compact_from(&self, offset: &mut usize) -> Schema {
        if self.is_leaf() {
            let id = self.dtype.id();
            let n = self.dtype.num_elements();
            let compact =
                DataType::with_layout(id, n, *offset, id.default_bytes());
            *offset += n * id.default_bytes();
            return Schema::leaf(compact);
        }
        match &self.children {
            SchemaChildren::None => Schema::empty(),
            SchemaChildren::Object(seq) => {
                let mut out = Schema::object();
                for (name, child) in seq.iter() {
                    out.set_child(name, child.compact_from(offset));
                }
                out
            }
            SchemaChildren::List(items) => {
                let mut out = Schema::list();
                for child in items {
                    *out.append() = child.compact_from(offset);
                }
                out
            }
        }
    }

    pub fn to_json_value(&self) -> Value {
        if self.is_leaf() {
            let dt = self.dtype;
            return json!({
                "dtype": dt.id().name(),
                "number_of_elements": dt.num_elements(),
                "offset": dt.offset(),
                "stride": dt.stride(),
                "element_bytes": dt.element_bytes(),
            });
        }
        match &self.children {
            SchemaChildren::None => Value::Null,
            SchemaChildren::Object(seq) => {
                let mut map = Map::new();
                for (name, child) in seq.iter() {
                    map.insert(name.to_string(), child.to_json_value());
                }
                Value::Object(map)
            }
            SchemaChildren::List(items) => {
                Value::Array(items.iter().map(Schema::to_json_value).collect())
            }
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap()
    }

    pub fn from_json_value(value: &Value) -> Result<Schema, Box<dyn std::error::Error>> {
        match value {
            Value::Null => Ok(Schema::empty()),
            Value::Array(items) => {
                let mut out = Schema::list();
                for item in items {
                    *out.append() = Schema::from_json_value(item)?;
                }
                Ok(out)
            }
            Value::Object(map) => {
                if let Some(Value::String(kind)) = map.get("dtype") {
                    let id = DataTypeId::from_name(kind)
                        .ok_or_else(|| format!("unknown dtype name {kind:?}"))?;
                    let n = map
                        .get("number_of_elements")
                        .and_then(Value::as_u64)
                        .unwrap_or(0) as usize;
                    let offset =
                        map.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
                    let stride = map
                        .get("stride")
                        .and_then(Value::as_u64)
                        .map_or(id.default_bytes(), |v| v as usize);
                    return Ok(Schema::leaf(DataType::with_layout(id, n, offset, stride)));
                }
                let mut out = Schema::object();
                for (name, child) in map {
                    out.set_child(name, Schema::from_json_value(child)?);
                }
                Ok(out)
            }
            other => Err(format!("schema text holds a bare literal: {other}").into()),
        }
    }

    pub fn parse_json(text: &str) -> Result<Schema, Box<dyn std::error::Error>> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }
}

impl SchemaChildren {
    fn iter_all(&self) -> Box<dyn Iterator<Item = &Schema> + '_> {
        match self {
            SchemaChildren::None => Box::new(std::iter::empty()),
            SchemaChildren::Object(seq) => Box::new(seq.items()),
            SchemaChildren::List(items) => Box::new(items.iter()),
        }
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        let mut s = Schema::object();
        s.set_child("a", Schema::leaf(DataType::int32(4)));
        s.set_child("b", Schema::leaf(DataType::float64(2)));
        let c = s.fetch_or_create("nested/deep");
        *c = Schema::leaf(DataType::uint8(3));
        s
    }

    #[test]
    fn path_fetch_descends() {
        let s = sample();
        let leaf = s.fetch("nested/deep").unwrap();
        assert_eq!(leaf.dtype().id(), DataTypeId::UInt8);
        assert!(s.fetch("nested/missing").is_none());
    }

    #[test]
    fn compacted_layout_is_gapless() {
        let s = sample().compacted();
        assert_eq!(s.fetch("a").unwrap().dtype().offset(), 0);
        assert_eq!(s.fetch("b").unwrap().dtype().offset(), 16);
        assert_eq!(s.fetch("nested/deep").unwrap().dtype().offset(), 32);
        assert_eq!(s.total_strided_bytes(), 35);
    }

    #[test]
    fn total_is_max_child_end() {
        let mut s = Schema::object();
        s.set_child(
            "x",
            Schema::leaf(DataType::with_layout(DataTypeId::Int16, 2, 8, 2)),
        );
        s.set_child(
            "y",
            Schema::leaf(DataType::with_layout(DataTypeId::Int16, 2, 0, 2)),
        );
        assert_eq!(s.total_strided_bytes(), 12);
    }

    #[test]
    fn json_roundtrip() {
        let s = sample();
        let back = Schema::parse_json(&s.to_json_string()).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn list_children_keep_order() {
        let mut s = Schema::list();
        *s.append() = Schema::leaf(DataType::int8(1));
        *s.append() = Schema::leaf(DataType::int16(1));
        assert_eq!(s.number_of_children(), 2);
        assert_eq!(s.child_at(1).unwrap().dtype().id(), DataTypeId::Int16);
    }
}
