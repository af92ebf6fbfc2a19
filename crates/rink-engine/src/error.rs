use rink_contracts::params::ParamsError;

use crate::providers::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("{0}")]
    Config(String),
    #[error("A design is already being generated; wait for it to finish.")]
    Busy,
    #[error(transparent)]
    InvalidParams(#[from] ParamsError),
    #[error("{0}")]
    Service(String),
    #[error("No image data returned from the API.")]
    NoImage { detail: Option<String> },
}

impl GenerateError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerateError::Config(_) => "config",
            GenerateError::Busy => "busy",
            GenerateError::InvalidParams(_) => "invalid_params",
            GenerateError::Service(_) => "service",
            GenerateError::NoImage { .. } => "no_image",
        }
    }
}

impl From<ProviderError> for GenerateError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::MissingCredential(message) => GenerateError::Config(message),
            ProviderError::Service { message } if message.trim().is_empty() => {
                GenerateError::Service("An unexpected error occurred".to_string())
            }
            ProviderError::Service { message } => GenerateError::Service(message),
        }
    }
}
