use crate::client::error::{ClientError, RequestError};
use crate::config::ConfigError;
use crate::flatten::error::FlattenError;
use crate::frames::error::FrameError;
use crate::sink::error::SinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}
