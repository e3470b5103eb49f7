pub mod error;
pub mod request;
pub mod weather_client;
