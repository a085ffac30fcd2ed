// SPDX-FileCopyrightText: 2026 Dealmail Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reader for delimited identity lists (banned addresses, exclusions).

use std::collections::HashSet;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use dealmail_core::DealmailError;
use tracing::debug;

/// Read a comma- and newline-delimited list of identities.
///
/// Fields are trimmed and empty fields dropped. A missing file is an error.
pub fn load_identity_list(path: &Path) -> Result<HashSet<String>, DealmailError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| input_error(path, e))?;

    let mut identities = HashSet::new();
    for record in reader.records() {
        let record = record.map_err(|e| input_error(path, e))?;
        identities.extend(
            record
                .iter()
                .filter(|field| !field.is_empty())
                .map(str::to_string),
        );
    }

    debug!(path = %path.display(), count = identities.len(), "identity list loaded");
    Ok(identities)
}

/// Read the list at `path` if one is configured, otherwise an empty set.
pub fn load_optional(path: Option<&str>) -> Result<HashSet<String>, DealmailError> {
    match path {
        Some(path) => load_identity_list(Path::new(path)),
        None => Ok(HashSet::new()),
    }
}

fn input_error(path: &Path, e: csv::Error) -> DealmailError {
    DealmailError::Input {
        message: format!("cannot read identity list {}: {e}", path.display()),
        source: Some(Box::new(e)),
    }
}
