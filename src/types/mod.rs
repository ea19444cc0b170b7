//! Typed values, data types and rows.

mod row;
mod value;

pub use row::Row;
pub use value::{DataType, Value};
