use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum DatalensError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),
}
