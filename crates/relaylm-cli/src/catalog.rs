//! Static model catalog loading.
//!
//! The catalog file is either a JSON array of names or plain text with one
//! name per line (`#` starts a comment line).

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read models file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Models file {path} is not a JSON array of strings: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read the catalog file at `path`.
pub fn load_models_file(path: &Path) -> Result<Vec<String>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text).map_err(|source| CatalogError::InvalidJson {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Flag-supplied names first, then the file's. The config builder drops
/// blanks and duplicates.
pub fn merge(flag_models: &[String], file_models: Vec<String>) -> Vec<String> {
    flag_models.iter().cloned().chain(file_models).collect()
}
