//! Profile store wire types and configuration

use avatar_cache::{parse_timestamp, RemoteRecord};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Connection settings for the profile store
#[derive(Debug, Clone)]
pub struct ProfileStoreConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Table holding one row per entity
    pub table: String,
    /// Object storage bucket for uploaded avatars
    pub bucket: String,
    pub timeout: Duration,
}

impl Default for ProfileStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: None,
            table: "profiles".to_string(),
            bucket: "avatars".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Columns selected from a profile row
#[derive(Debug, Deserialize)]
pub struct ProfileRow {
    pub avatar_url: Option<String>,
    pub updated_at: Option<String>,
}

impl ProfileRow {
    pub fn into_record(self) -> RemoteRecord {
        RemoteRecord {
            asset_url: self.avatar_url.filter(|url| !url.is_empty()),
            updated_at: self.updated_at.as_deref().and_then(parse_updated_at),
        }
    }
}

/// Parse a row timestamp. Columns without a zone are taken as UTC.
pub fn parse_updated_at(s: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(s).or_else(|| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_default_config() {
        let config = ProfileStoreConfig::default();
        assert_eq!(config.table, "profiles");
        assert_eq!(config.bucket, "avatars");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_row_deserialization() {
        let json = r#"[{"avatar_url":"https://x/a.jpg","updated_at":"2024-01-01T00:00:00.123456+00:00"}]"#;
        let rows: Vec<ProfileRow> = serde_json::from_str(json).unwrap();
        let record = rows.into_iter().next().unwrap().into_record();

        assert_eq!(record.asset_url.as_deref(), Some("https://x/a.jpg"));
        let updated = record.updated_at.unwrap();
        assert_eq!(updated.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_row_with_nulls() {
        let json = r#"{"avatar_url":null,"updated_at":null}"#;
        let record = serde_json::from_str::<ProfileRow>(json)
            .unwrap()
            .into_record();
        assert_eq!(record, RemoteRecord::default());
    }

    #[test]
    fn test_empty_avatar_url_is_absent() {
        let row = ProfileRow {
            avatar_url: Some(String::new()),
            updated_at: None,
        };
        assert!(row.into_record().asset_url.is_none());
    }

    #[test]
    fn test_parse_updated_at_without_zone() {
        assert_eq!(
            parse_updated_at("2024-01-15T12:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_updated_at_invalid() {
        assert!(parse_updated_at("").is_none());
        assert!(parse_updated_at("garbage").is_none());
    }
}
