//! Definition loading: reads data files and builds the core registry.
//!
//! Provides format detection (RON/JSON/TOML) and deserialization helpers,
//! plus the name-resolution step that turns schema entries into registry
//! ids.

use crate::schema::Definitions;
use beltline_core::registry::{Registry, RegistryBuilder, RegistryError, RecipeEntry};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A recipe entry names an item the document never defines.
    #[error("unknown item '{name}' referenced in {file}")]
    UnknownItem { file: PathBuf, name: String },

    /// Registry construction rejected the resolved definitions.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from
/// the extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(&content).map_err(|e| DataError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

// ===========================================================================
// Registry construction
// ===========================================================================

/// Load a definitions file and build the immutable registry from it.
pub fn load_definitions(path: &Path) -> Result<Registry, DataError> {
    let definitions: Definitions = deserialize_file(path)?;
    build_registry(&definitions, path)
}

/// Resolve a parsed definitions document into a registry. Items register
/// first so recipe entries can resolve their names.
pub fn build_registry(definitions: &Definitions, source: &Path) -> Result<Registry, DataError> {
    let mut builder = RegistryBuilder::new();
    for item in &definitions.items {
        builder.register_item(&item.name)?;
    }
    for recipe in &definitions.recipes {
        let inputs = resolve_entries(&builder, &recipe.inputs, source)?;
        let outputs = resolve_entries(&builder, &recipe.outputs, source)?;
        builder.register_recipe(&recipe.name, inputs, outputs, recipe.duration)?;
    }
    Ok(builder.build()?)
}

fn resolve_entries(
    builder: &RegistryBuilder,
    entries: &[(String, u32)],
    source: &Path,
) -> Result<Vec<RecipeEntry>, DataError> {
    entries
        .iter()
        .map(|(name, quantity)| {
            let item = builder.item_id(name).ok_or_else(|| DataError::UnknownItem {
                file: source.to_path_buf(),
                name: name.clone(),
            })?;
            Ok(RecipeEntry {
                item,
                quantity: *quantity,
            })
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
