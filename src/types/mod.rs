pub mod cell_value;
pub mod flat_row;
pub mod forecast_schema;
pub mod row_set;
