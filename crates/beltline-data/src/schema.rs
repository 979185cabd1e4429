//! Serde data file structs for item and recipe definitions.
//!
//! These structs define the on-disk format deserialized from RON, JSON,
//! or TOML data files and then resolved into registry types by the loader.

use serde::Deserialize;

/// A complete definitions document: items, then the recipes that
/// reference them by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
}

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
}

/// A recipe definition in a data file. Inputs and outputs are
/// `(item_name, quantity)` pairs; an empty input list describes an
/// extractor that produces on an interval.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<(String, u32)>,
    pub outputs: Vec<(String, u32)>,
    pub duration: u64,
}
