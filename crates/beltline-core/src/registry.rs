//! Item and recipe registries.
//!
//! Explicitly constructed, context-passed services owned by the simulation.
//! Built once through [`RegistryBuilder`], immutable afterwards.

use crate::fixed::Ticks;
use crate::id::{ItemTypeId, RecipeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An item type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
}

/// A recipe input or output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub item: ItemTypeId,
    pub quantity: u32,
}

/// A production recipe. Empty inputs describe an extractor that produces
/// from nothing on an interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub inputs: Vec<RecipeEntry>,
    pub outputs: Vec<RecipeEntry>,
    pub duration: Ticks,
}

/// Errors from registry construction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("name registered twice: {0}")]
    Duplicate(String),
    #[error("recipe references unknown item {0:?}")]
    InvalidItemRef(ItemTypeId),
}

/// Builder for the immutable [`Registry`]: register, then build.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<Recipe>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item type. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> Result<ItemTypeId, RegistryError> {
        if self.item_name_to_id.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(ItemDef {
            name: name.to_string(),
        });
        self.item_name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a recipe. Returns its ID.
    pub fn register_recipe(
        &mut self,
        name: &str,
        inputs: Vec<RecipeEntry>,
        outputs: Vec<RecipeEntry>,
        duration: Ticks,
    ) -> Result<RecipeId, RegistryError> {
        if self.recipe_name_to_id.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(Recipe {
            name: name.to_string(),
            inputs,
            outputs,
            duration,
        });
        self.recipe_name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Lookup item type ID by name.
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable registry. Validates that every
    /// recipe entry references a registered item.
    pub fn build(self) -> Result<Registry, RegistryError> {
        for recipe in &self.recipes {
            for entry in recipe.inputs.iter().chain(recipe.outputs.iter()) {
                if entry.item.0 as usize >= self.items.len() {
                    return Err(RegistryError::InvalidItemRef(entry.item));
                }
            }
        }
        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
        })
    }
}

/// Immutable registry of item types and recipes. Frozen after build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    recipes: Vec<Recipe>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl Registry {
    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn item_name(&self, id: ItemTypeId) -> Option<&str> {
        self.items.get(id.0 as usize).map(|d| d.name.as_str())
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(id.0 as usize)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_items() {
        let mut builder = RegistryBuilder::new();
        let ore = builder.register_item("copper_ore").unwrap();
        let bar = builder.register_item("copper_bar").unwrap();
        let registry = builder.build().unwrap();

        assert_eq!(registry.item_id("copper_ore"), Some(ore));
        assert_eq!(registry.item_name(bar), Some("copper_bar"));
        assert_eq!(registry.item_id("iron_ore"), None);
        assert_eq!(registry.item_count(), 2);
    }

    #[test]
    fn duplicate_item_name_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register_item("copper_ore").unwrap();
        assert_eq!(
            builder.register_item("copper_ore"),
            Err(RegistryError::Duplicate("copper_ore".to_string()))
        );
    }

    #[test]
    fn recipe_round_trip() {
        let mut builder = RegistryBuilder::new();
        let ore = builder.register_item("copper_ore").unwrap();
        let bar = builder.register_item("copper_bar").unwrap();
        let smelt = builder
            .register_recipe(
                "smelt_copper",
                vec![RecipeEntry {
                    item: ore,
                    quantity: 2,
                }],
                vec![RecipeEntry {
                    item: bar,
                    quantity: 1,
                }],
                20,
            )
            .unwrap();
        let registry = builder.build().unwrap();

        let recipe = registry.recipe(smelt).unwrap();
        assert_eq!(recipe.inputs.len(), 1);
        assert_eq!(recipe.outputs[0].item, bar);
        assert_eq!(recipe.duration, 20);
        assert_eq!(registry.recipe_id("smelt_copper"), Some(smelt));
    }

    #[test]
    fn build_rejects_dangling_item_reference() {
        let mut builder = RegistryBuilder::new();
        let ore = builder.register_item("copper_ore").unwrap();
        builder
            .register_recipe(
                "bad",
                vec![],
                vec![RecipeEntry {
                    item: ItemTypeId(99),
                    quantity: 1,
                }],
                10,
            )
            .unwrap();
        let _ = ore;
        assert_eq!(
            builder.build().unwrap_err(),
            RegistryError::InvalidItemRef(ItemTypeId(99))
        );
    }

    #[test]
    fn extractor_recipe_has_no_inputs() {
        let mut builder = RegistryBuilder::new();
        let ore = builder.register_item("copper_ore").unwrap();
        let mine = builder
            .register_recipe(
                "mine_copper",
                vec![],
                vec![RecipeEntry {
                    item: ore,
                    quantity: 1,
                }],
                30,
            )
            .unwrap();
        let registry = builder.build().unwrap();
        assert!(registry.recipe(mine).unwrap().inputs.is_empty());
    }
}
