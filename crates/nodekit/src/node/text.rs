use serde_json::{Map, Number, Value, json};

use super::core::Node;
use super::dtype::DataTypeId;

/// Canonical textual form.
///
/// Leaves render as `{"dtype": <kind>, "value": <literal or array>}`,
/// objects and lists nest directly. Round-trip preserves structure, names,
/// element kinds and values exactly; offset/stride packing normalizes to
/// compact.
impl Node {
    pub fn to_json_value(&self) -> Value {
        if self.is_leaf() {
            let id = self.dtype().id();
            let value = if id.is_string() {
                Value::String(self.as_string())
            } else {
                leaf_values(self)
            };
            return json!({ "dtype": id.name(), "value": value });
        }
        if self.is_object() {
            let mut map = Map::new();
            for (name, child) in self.object_iter() {
                map.insert(name.to_string(), child.to_json_value());
            }
            return Value::Object(map);
        }
        if self.is_list() {
            return Value::Array(self.children().map(Node::to_json_value).collect());
        }
        Value::Null
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap()
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.to_json_value()).unwrap()
    }

    pub fn from_json_value(value: &Value) -> Result<Node, Box<dyn std::error::Error>> {
        let mut n = Node::new();
        read_value(value, &mut n)?;
        Ok(n)
    }

    /// Parses canonical text; `protocol` is `"json"` or `"yaml"`.
    pub fn parse(text: &str, protocol: &str) -> Result<Node, Box<dyn std::error::Error>> {
        let value: Value = match protocol {
            "json" => serde_json::from_str(text)?,
            "yaml" => serde_yaml::from_str(text)?,
            other => return Err(format!("unknown text protocol {other:?}").into()),
        };
        Self::from_json_value(&value)
    }
}

fn leaf_values(n: &Node) -> Value {
    let id = n.dtype().id();
    let count = n.number_of_elements();
    let scalars: Vec<Value> = if id.is_floating_point() {
        n.to_vec::<f64>()
            .into_iter()
            .map(|v| Number::from_f64(v).map_or(Value::Null, Value::Number))
            .collect()
    } else if id.is_unsigned_integer() {
        n.to_vec::<u64>().into_iter().map(|v| json!(v)).collect()
    } else {
        n.to_vec::<i64>().into_iter().map(|v| json!(v)).collect()
    };
    if count == 1 {
        scalars.into_iter().next().unwrap()
    } else {
        Value::Array(scalars)
    }
}

fn is_leaf_form(map: &Map<String, Value>) -> bool {
    map.len() == 2
        && map.contains_key("value")
        && matches!(
            map.get("dtype"),
            Some(Value::String(s)) if DataTypeId::from_name(s).is_some_and(|id| id.is_leaf())
        )
}

fn read_value(value: &Value, out: &mut Node) -> Result<(), Box<dyn std::error::Error>> {
    match value {
        Value::Null => {}
        Value::Object(map) if is_leaf_form(map) => {
            let Some(Value::String(kind)) = map.get("dtype") else {
                unreachable!()
            };
            let id = DataTypeId::from_name(kind).unwrap();
            read_leaf(id, &map["value"], out)?;
        }
        Value::Object(map) => {
            out.init_object();
            for (name, child) in map {
                read_value(child, out.add_child(name))?;
            }
        }
        Value::Array(items) => {
            out.init_list();
            for item in items {
                read_value(item, out.append())?;
            }
        }
        other => return Err(format!("bare literal {other} outside a leaf form").into()),
    }
    Ok(())
}

fn read_leaf(
    id: DataTypeId,
    value: &Value,
    out: &mut Node,
) -> Result<(), Box<dyn std::error::Error>> {
    if id.is_string() {
        let Value::String(s) = value else {
            return Err(format!("char8 leaf holds a non-string literal: {value}").into());
        };
        out.set_string(s);
        return Ok(());
    }
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        scalar => vec![scalar],
    };
    macro_rules! read_numeric {
        ($t:ty, $get:ident) => {{
            let mut vals: Vec<$t> = Vec::with_capacity(items.len());
            for item in &items {
                let v = item
                    .$get()
                    .ok_or_else(|| format!("non-numeric literal {item} in {} leaf", id.name()))?;
                vals.push(v as $t);
            }
            out.set_slice(&vals);
        }};
    }
    use DataTypeId::*;
    match id {
        Int8 => read_numeric!(i8, as_i64),
        Int16 => read_numeric!(i16, as_i64),
        Int32 => read_numeric!(i32, as_i64),
        Int64 => read_numeric!(i64, as_i64),
        UInt8 => read_numeric!(u8, as_u64),
        UInt16 => read_numeric!(u16, as_u64),
        UInt32 => read_numeric!(u32, as_u64),
        UInt64 => read_numeric!(u64, as_u64),
        Float32 => read_numeric!(f32, as_f64),
        Float64 => read_numeric!(f64, as_f64),
        _ => unreachable!(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut n = Node::new();
        n.fetch_mut("coords/x").set_slice(&[0.0f64, 1.0, 2.5]);
        n.fetch_mut("coords/y").set_slice(&[0.0f32, 2.0]);
        n.fetch_mut("conn").set_slice(&[0i32, 1, 4, 3]);
        n.fetch_mut("wide").set_slice(&[u64::MAX, 0]);
        n.fetch_mut("shape").set_string("quad");
        n.fetch_mut("scalar").set(7i64);
        let list = n.fetch_mut("domains");
        list.append().fetch_mut("id").set(0i32);
        list.append().fetch_mut("id").set(1i32);
        n
    }

    #[test]
    fn json_roundtrip_is_exact() {
        let n = sample();
        let back = Node::parse(&n.to_json(), "json").unwrap();
        assert_eq!(n, back);
        let mut info = Node::new();
        assert!(!n.diff(&back, &mut info, 0.0));
    }

    #[test]
    fn yaml_roundtrip_is_exact() {
        let n = sample();
        let back = Node::parse(&n.to_yaml(), "yaml").unwrap();
        assert_eq!(n, back);
    }

    #[test]
    fn roundtrip_preserves_kinds_and_order() {
        let n = sample();
        let back = Node::parse(&n.to_json(), "json").unwrap();
        assert_eq!(back["coords/y"].dtype().id(), DataTypeId::Float32);
        assert_eq!(back["wide"].dtype().id(), DataTypeId::UInt64);
        assert_eq!(back.child_names(), n.child_names());
        assert_eq!(back["domains"].number_of_children(), 2);
    }

    #[test]
    fn roundtrip_normalizes_packing_but_not_values() {
        let mut strided = [0u8; 32];
        for (i, v) in [3i32, 5, 7, 9].iter().enumerate() {
            strided[i * 8..i * 8 + 4].copy_from_slice(&v.to_ne_bytes());
        }
        let mut n = Node::new();
        unsafe {
            n.fetch_mut("gappy").set_external_with_dtype(
                strided.as_mut_ptr(),
                strided.len(),
                crate::node::DataType::with_layout(DataTypeId::Int32, 4, 0, 8),
            );
        }
        let back = Node::parse(&n.to_json(), "json").unwrap();
        assert_eq!(back["gappy"].to_vec::<i32>(), [3, 5, 7, 9]);
        assert!(back["gappy"].dtype().is_compact());
    }

    #[test]
    fn unknown_protocol_is_an_error() {
        assert!(Node::parse("{}", "toml").is_err());
    }
}
