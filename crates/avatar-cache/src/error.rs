//! Error types for the avatar cache

use std::fmt;

#[derive(Debug)]
pub enum AvatarCacheError {
    /// Local directory, file or metadata I/O failed
    Storage(Box<std::io::Error>),
    /// Remote record or blob fetch failed (including non-success status)
    Transport(String),
    /// HTTP client error while talking to a remote collaborator
    Http(Box<reqwest::Error>),
    /// The entity has no remote asset
    NotFound(String),
    /// Persisted metadata could not be encoded or decoded
    Serialization(String),
}

impl AvatarCacheError {
    /// True for failures that a caller may recover from by serving the cache
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AvatarCacheError::Transport(_) | AvatarCacheError::Http(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AvatarCacheError::NotFound(_))
    }
}

impl fmt::Display for AvatarCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvatarCacheError::Storage(err) => write!(f, "Storage error: {}", err),
            AvatarCacheError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AvatarCacheError::Http(err) => write!(f, "HTTP error: {}", err),
            AvatarCacheError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AvatarCacheError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for AvatarCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvatarCacheError::Storage(err) => Some(err.as_ref()),
            AvatarCacheError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AvatarCacheError {
    fn from(err: std::io::Error) -> Self {
        AvatarCacheError::Storage(Box::new(err))
    }
}

impl From<reqwest::Error> for AvatarCacheError {
    fn from(err: reqwest::Error) -> Self {
        AvatarCacheError::Http(Box::new(err))
    }
}

impl From<serde_json::Error> for AvatarCacheError {
    fn from(err: serde_json::Error) -> Self {
        AvatarCacheError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AvatarCacheError>;
