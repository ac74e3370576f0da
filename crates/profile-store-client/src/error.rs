//! Error types for the profile store client

use avatar_cache::AvatarCacheError;
use std::fmt;

/// Errors that can occur when talking to the profile store
#[derive(Debug)]
pub enum ProfileStoreError {
    /// HTTP request failed
    Http(Box<reqwest::Error>),
    /// The store answered with a non-success status
    Status { status: u16, body: String },
    /// No profile row for the requested entity
    NotFound(String),
    /// Failed to parse a JSON response
    Json(serde_json::Error),
}

impl fmt::Display for ProfileStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Profile store HTTP error: {}", e),
            Self::Status { status, body } => {
                write!(f, "Profile store returned status {}: {}", status, body)
            }
            Self::NotFound(id) => write!(f, "Profile not found: {}", id),
            Self::Json(e) => write!(f, "Profile store JSON parse error: {}", e),
        }
    }
}

impl std::error::Error for ProfileStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e.as_ref()),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProfileStoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Box::new(e))
    }
}

impl From<serde_json::Error> for ProfileStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ProfileStoreError> for AvatarCacheError {
    fn from(e: ProfileStoreError) -> Self {
        match e {
            ProfileStoreError::Http(err) => AvatarCacheError::Http(err),
            ProfileStoreError::NotFound(id) => AvatarCacheError::NotFound(id),
            other => AvatarCacheError::Transport(other.to_string()),
        }
    }
}

/// Result type for profile store operations
pub type Result<T> = std::result::Result<T, ProfileStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = ProfileStoreError::Status {
            status: 401,
            body: "JWT expired".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Profile store returned status 401: JWT expired"
        );
    }

    #[test]
    fn test_not_found_maps_to_cache_not_found() {
        let err: AvatarCacheError = ProfileStoreError::NotFound("u1".to_string()).into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_maps_to_transport() {
        let err: AvatarCacheError = ProfileStoreError::Status {
            status: 503,
            body: String::new(),
        }
        .into();
        assert!(err.is_transport());
        assert!(err.to_string().contains("503"));
    }
}
