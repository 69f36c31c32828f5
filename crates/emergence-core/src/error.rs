//! Error types for the emergence network

use crate::types::AppId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot link app to itself: {0}")]
    SelfLink(AppId),

    #[error("app not found: {0}")]
    UnknownApp(AppId),

    #[error("app was merged away: {0}")]
    RetiredApp(AppId),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Structurally invalid requests: the caller referenced an app it should
    /// not have, or asked for an edge the graph cannot hold.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Self::SelfLink(_) | Self::UnknownApp(_) | Self::RetiredApp(_)
        )
    }

    /// The app this error refers to, if any.
    pub fn app(&self) -> Option<AppId> {
        match self {
            Self::SelfLink(id) | Self::UnknownApp(id) | Self::RetiredApp(id) => Some(*id),
            _ => None,
        }
    }
}
