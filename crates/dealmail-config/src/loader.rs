// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./dealmail.toml` > `~/.config/dealmail/dealmail.toml` >
//! `/etc/dealmail/dealmail.toml` with environment variable overrides via `DEALMAIL_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::debug;

use crate::model::DealmailConfig;

/// Top-level sections addressable from the environment.
const ENV_SECTIONS: &[&str] = &[
    "job", "storage", "retry", "dispatch", "mail", "checkout", "banned", "input",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/dealmail/dealmail.toml`
/// 3. `~/.config/dealmail/dealmail.toml`
/// 4. `./dealmail.toml`
/// 5. `DEALMAIL_*` environment variables
pub fn load_config() -> Result<DealmailConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DealmailConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DealmailConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DealmailConfig, figment::Error> {
    debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(DealmailConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DealmailConfig::default()))
        .merge(Toml::file("/etc/dealmail/dealmail.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("dealmail/dealmail.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("dealmail.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that
/// `DEALMAIL_MAIL_API_KEY` maps to `mail.api_key`, not `mail.api.key`.
/// Figment hands the key over uppercased with the prefix stripped.
/// Campaigns are an array of tables and are not addressable from the environment.
fn env_provider() -> Env {
    Env::prefixed("DEALMAIL_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            let mapped = format!("{section}.{rest}");
            debug!(key = %mapped, "environment override");
            return mapped;
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_first_segment_to_section() {
        assert_eq!(map_env_key("mail_api_key"), "mail.api_key");
        assert_eq!(map_env_key("job_send_hour"), "job.send_hour");
        assert_eq!(map_env_key("dispatch_batch_limit"), "dispatch.batch_limit");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
    }

    #[test]
    fn uppercase_env_keys_are_mapped() {
        assert_eq!(map_env_key("DISPATCH_BATCH_LIMIT"), "dispatch.batch_limit");
        assert_eq!(map_env_key("MAIL_API_KEY"), "mail.api_key");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("campaigns"), "campaigns");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [dispatch]
                batch_limit = 20
                "#,
            )?;
            jail.set_env("DEALMAIL_DISPATCH_BATCH_LIMIT", "40");
            jail.set_env("DEALMAIL_MAIL_API_KEY", "SG.secret");

            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert_eq!(config.dispatch.batch_limit, 40);
            assert_eq!(config.mail.api_key.as_deref(), Some("SG.secret"));
            Ok(())
        });
    }
}
