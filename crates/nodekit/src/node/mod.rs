mod accessor;
mod core;
mod diff;
mod dtype;
pub(crate) mod named;
pub mod path;
mod schema;
mod text;

pub use self::accessor::Accessor;
pub use self::core::{DataState, Node};
pub use self::dtype::{
    DataType, DataTypeId, Endianness, LeafValue, widest_float_id, widest_integer_id,
};
pub use self::schema::Schema;
