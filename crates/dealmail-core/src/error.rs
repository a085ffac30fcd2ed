// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Dealmail campaign job.

use thiserror::Error;

/// The primary error type used across all Dealmail collaborators and jobs.
#[derive(Debug, Error)]
pub enum DealmailError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Queue or sent-ledger store errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Mail transport errors (connection failure, timeout, malformed response).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No provider template is configured for the key and resolved language.
    #[error("no template `{template_key}` for locale `{locale}`")]
    Template { template_key: String, locale: String },

    /// The checkout link could not be built for a recipient.
    #[error("checkout link error: {0}")]
    LinkBuilder(String),

    /// An external input (candidate feed, banned list) could not be read.
    #[error("input error: {message}")]
    Input {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A dispatch batch finished with unconfirmed sends.
    #[error("partial delivery: {confirmed} of {attempted} sends confirmed")]
    PartialDelivery { confirmed: usize, attempted: usize },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DealmailError {
    /// Whether the failure is worth retrying around a single store or transport call.
    ///
    /// Storage errors are transient when SQLite reports the database as busy or
    /// locked. Transport errors are transient for connection resets, refused
    /// connections, and timeouts.
    pub fn is_transient(&self) -> bool {
        match self {
            DealmailError::Storage { source } => {
                let msg = source.to_string().to_lowercase();
                msg.contains("database is locked") || msg.contains("database is busy")
            }
            DealmailError::Transport { message, source } => {
                let mut msg = message.to_lowercase();
                if let Some(source) = source {
                    msg.push(' ');
                    msg.push_str(&source.to_string().to_lowercase());
                }
                msg.contains("connection reset")
                    || msg.contains("connection refused")
                    || msg.contains("connection closed")
                    || msg.contains("timed out")
                    || msg.contains("timeout")
            }
            _ => false,
        }
    }

    /// Shorthand for a storage error from any boxed-compatible source.
    pub fn storage<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DealmailError::Storage {
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_database_is_transient() {
        let err = DealmailError::storage("database is locked");
        assert!(err.is_transient());
    }

    #[test]
    fn missing_table_is_not_transient() {
        let err = DealmailError::storage("no such table: queue_entries");
        assert!(!err.is_transient());
    }

    #[test]
    fn connection_reset_is_transient() {
        let err = DealmailError::Transport {
            message: "HTTP request failed".into(),
            source: Some(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn template_and_link_errors_are_not_transient() {
        let template = DealmailError::Template {
            template_key: "yearlyDeal".into(),
            locale: "de".into(),
        };
        let link = DealmailError::LinkBuilder("missing price".into());
        assert!(!template.is_transient());
        assert!(!link.is_transient());
    }

    #[test]
    fn partial_delivery_message_names_counts() {
        let err = DealmailError::PartialDelivery {
            confirmed: 3,
            attempted: 5,
        };
        assert_eq!(err.to_string(), "partial delivery: 3 of 5 sends confirmed");
    }
}
