pub mod error;
pub mod forecast_frame;
