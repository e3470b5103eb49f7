pub mod error;
pub mod flattener;
pub mod walk;
