//! Types that represent tabular data as it moves between CSV files, the SQLite store and the
//! summary computation.
mod table;
mod value;

pub use table::{Column, Head, Table};
pub use value::{ColumnType, Value};
