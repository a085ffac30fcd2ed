// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-lines user export as a candidate source.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dealmail_core::{Candidate, CandidateSource, DealmailError};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// One line of the user export.
#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    last_updated_at: DateTime<Utc>,
    #[serde(default)]
    registration: Option<Registration>,
    #[serde(default)]
    has_app_store_payment: bool,
    #[serde(default)]
    has_play_store_payment: bool,
    #[serde(default)]
    locale: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Registration {
    #[serde(default)]
    registered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    first_name: Option<String>,
}

impl From<UserRecord> for Candidate {
    fn from(record: UserRecord) -> Self {
        let (registered_at, display_name) = match record.registration {
            Some(r) => (r.registered_at, r.first_name.filter(|n| !n.trim().is_empty())),
            None => (None, None),
        };
        Candidate {
            identity: record.id,
            last_updated_at: record.last_updated_at,
            registered_at,
            has_app_store_payment: record.has_app_store_payment,
            has_play_store_payment: record.has_play_store_payment,
            locale: record.locale.filter(|l| !l.trim().is_empty()),
            display_name,
        }
    }
}

/// Parse a JSON-lines export, skipping blank and malformed lines.
pub fn parse_candidates(content: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<UserRecord>(line) {
            Ok(record) => candidates.push(record.into()),
            Err(e) => warn!(line = index + 1, error = %e, "skipping malformed user record"),
        }
    }
    candidates
}

/// Candidate source backed by a JSON-lines file, read once on first use.
pub struct JsonlCandidateSource {
    path: PathBuf,
    loaded: OnceCell<Vec<Candidate>>,
}

impl JsonlCandidateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: OnceCell::new(),
        }
    }

    async fn candidates(&self) -> Result<&[Candidate], DealmailError> {
        let candidates = self
            .loaded
            .get_or_try_init(|| async {
                let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                    DealmailError::Input {
                        message: format!("cannot read user feed {}: {e}", self.path.display()),
                        source: Some(Box::new(e)),
                    }
                })?;
                let candidates = parse_candidates(&content);
                debug!(path = %self.path.display(), count = candidates.len(), "user feed loaded");
                Ok::<_, DealmailError>(candidates)
            })
            .await?;
        Ok(candidates)
    }
}

#[async_trait]
impl CandidateSource for JsonlCandidateSource {
    async fn all(&self) -> Result<Vec<Candidate>, DealmailError> {
        Ok(self.candidates().await?.to_vec())
    }

    async fn find(&self, identity: &str) -> Result<Option<Candidate>, DealmailError> {
        Ok(self
            .candidates()
            .await?
            .iter()
            .find(|c| c.identity == identity)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::TimeZone;

    use super::*;

    const FEED: &str = r#"
{"id":"maija@example.com","last_updated_at":"2026-05-01T10:00:00Z","registration":{"registered_at":"2024-01-01T00:00:00Z","first_name":"Maija"},"has_app_store_payment":true,"locale":"fi-FI"}
{"id":"broken@example.com","last_updated_at":
{"id":"anon@example.com","last_updated_at":"2026-05-02T10:00:00Z","has_play_store_payment":true,"locale":""}
"#;

    #[test]
    fn parses_records_and_skips_malformed_lines() {
        let candidates = parse_candidates(FEED);
        assert_eq!(candidates.len(), 2);

        let maija = &candidates[0];
        assert_eq!(maija.identity, "maija@example.com");
        assert_eq!(maija.display_name.as_deref(), Some("Maija"));
        assert_eq!(
            maija.registered_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(maija.has_app_store_payment);
        assert!(!maija.has_play_store_payment);

        let anon = &candidates[1];
        assert!(anon.registered_at.is_none());
        assert!(anon.locale.is_none(), "blank locale is treated as absent");
        assert!(anon.display_name.is_none());
    }

    #[tracing_test::traced_test]
    #[test]
    fn malformed_line_is_logged_with_its_number() {
        parse_candidates(FEED);
        assert!(logs_contain("skipping malformed user record"));
        assert!(logs_contain("line=3"));
    }

    #[tokio::test]
    async fn file_source_finds_by_identity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FEED.as_bytes()).unwrap();

        let source = JsonlCandidateSource::new(file.path());
        assert_eq!(source.all().await.unwrap().len(), 2);
        assert!(source.find("anon@example.com").await.unwrap().is_some());
        assert!(source.find("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_an_input_error() {
        let source = JsonlCandidateSource::new("/nonexistent/users.jsonl");
        let err = source.all().await.unwrap_err();
        assert!(matches!(err, DealmailError::Input { .. }));
    }
}
