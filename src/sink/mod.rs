pub mod error;
pub mod sql;
pub mod table_sink;
