//! Error types for the avatar-sync binary

use std::fmt;

#[derive(Debug)]
pub enum AvatarSyncError {
    Cache(avatar_cache::AvatarCacheError),
    ProfileStore(profile_store_client::ProfileStoreError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for AvatarSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvatarSyncError::Cache(err) => write!(f, "Cache error: {}", err),
            AvatarSyncError::ProfileStore(err) => write!(f, "Profile store error: {}", err),
            AvatarSyncError::Io(err) => write!(f, "IO error: {}", err),
            AvatarSyncError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for AvatarSyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvatarSyncError::Cache(err) => Some(err),
            AvatarSyncError::ProfileStore(err) => Some(err),
            AvatarSyncError::Io(err) => Some(err.as_ref()),
            AvatarSyncError::Config(_) => None,
        }
    }
}

impl From<avatar_cache::AvatarCacheError> for AvatarSyncError {
    fn from(err: avatar_cache::AvatarCacheError) -> Self {
        AvatarSyncError::Cache(err)
    }
}

impl From<profile_store_client::ProfileStoreError> for AvatarSyncError {
    fn from(err: profile_store_client::ProfileStoreError) -> Self {
        AvatarSyncError::ProfileStore(err)
    }
}

impl From<std::io::Error> for AvatarSyncError {
    fn from(err: std::io::Error) -> Self {
        AvatarSyncError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for AvatarSyncError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        AvatarSyncError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AvatarSyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AvatarSyncError::Config("invalid HTTP_TIMEOUT_SECS".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: invalid HTTP_TIMEOUT_SECS"
        );
    }

    #[test]
    fn test_cache_error_display() {
        let err = AvatarSyncError::from(avatar_cache::AvatarCacheError::NotFound(
            "no remote avatar for u1".to_string(),
        ));
        assert!(format!("{}", err).contains("no remote avatar for u1"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = AvatarSyncError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
