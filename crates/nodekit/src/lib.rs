//! Self-describing hierarchical data containers and mesh blueprint
//! algorithms for scientific computing.
//!
//! The [`Node`] kernel is a typed tree whose leaves are strided numeric
//! arrays that can own their buffer or alias external memory. The
//! [`blueprint`] layer defines what shape such a tree must have to describe
//! a computational mesh, and provides verification, conversion between mesh
//! flavors, derived-topology generation and a distributed partitioning
//! driver on top of it.

pub mod error;
mod node;
pub mod o2m;

pub mod blueprint;
pub mod mesh_examples;

pub use crate::error::{ErrorHandler, error_handler, reset_error_handler, set_error_handler};
pub use crate::node::{
    Accessor, DataState, DataType, DataTypeId, Endianness, LeafValue, Node, Schema,
    widest_float_id, widest_integer_id,
};
pub use crate::o2m::O2MRelation;
