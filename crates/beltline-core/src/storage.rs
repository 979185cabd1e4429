//! Storage chests and the launch pad sink.

use crate::id::ItemTypeId;
use crate::item::ItemContainer;
use serde::{Deserialize, Serialize};

/// Stack slots in a storage chest.
pub const STORAGE_STACKS: u32 = 16;

/// Items per storage stack.
pub const STORAGE_STACK_SIZE: u32 = 256;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// A chest: one container with the unique-stacks policy, so each item type
/// claims at most one stack slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub container: ItemContainer,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            container: ItemContainer::with_unique_stacks(STORAGE_STACKS, STORAGE_STACK_SIZE),
        }
    }

    /// Accept one item, subject to capacity and the uniqueness policy.
    pub fn accept(&mut self, item_type: ItemTypeId) -> bool {
        self.container.try_add(item_type)
    }

    /// Remove one item of whatever type is stored first.
    pub fn take_any(&mut self) -> Option<ItemTypeId> {
        self.container.take_any()
    }

    pub fn item_count(&self) -> u32 {
        self.container.total()
    }
}

// ---------------------------------------------------------------------------
// Launch pad
// ---------------------------------------------------------------------------

/// A terminal sink. Swallows every item offered and keeps per-type tallies
/// sorted by item type, so iteration order is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPad {
    pub launched: Vec<(ItemTypeId, u64)>,
}

impl LaunchPad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swallow an item. Never refuses.
    pub fn accept(&mut self, item_type: ItemTypeId) {
        match self.launched.binary_search_by_key(&item_type, |&(t, _)| t) {
            Ok(index) => self.launched[index].1 += 1,
            Err(index) => self.launched.insert(index, (item_type, 1)),
        }
    }

    /// Items launched of one type.
    pub fn launched_of(&self, item_type: ItemTypeId) -> u64 {
        self.launched
            .binary_search_by_key(&item_type, |&(t, _)| t)
            .map(|index| self.launched[index].1)
            .unwrap_or(0)
    }

    /// Items launched across all types.
    pub fn launched_total(&self) -> u64 {
        self.launched.iter().map(|&(_, count)| count).sum()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ore() -> ItemTypeId {
        ItemTypeId(0)
    }

    fn bar() -> ItemTypeId {
        ItemTypeId(1)
    }

    // -----------------------------------------------------------------------
    // Test 1: Storage accepts until its single stack per type fills
    // -----------------------------------------------------------------------
    #[test]
    fn storage_fills_one_stack_per_type() {
        let mut storage = Storage::new();
        for _ in 0..STORAGE_STACK_SIZE {
            assert!(storage.accept(ore()));
        }
        assert!(!storage.accept(ore()));
        assert!(storage.accept(bar()));
        assert_eq!(storage.item_count(), STORAGE_STACK_SIZE + 1);
    }

    // -----------------------------------------------------------------------
    // Test 2: Take-any drains storage
    // -----------------------------------------------------------------------
    #[test]
    fn storage_take_any_round_trips() {
        let mut storage = Storage::new();
        assert!(storage.accept(ore()));
        assert_eq!(storage.take_any(), Some(ore()));
        assert_eq!(storage.take_any(), None);
    }

    // -----------------------------------------------------------------------
    // Test 3: The launch pad never refuses and tallies per type
    // -----------------------------------------------------------------------
    #[test]
    fn launch_pad_counts_everything() {
        let mut pad = LaunchPad::new();
        pad.accept(bar());
        pad.accept(ore());
        pad.accept(bar());

        assert_eq!(pad.launched_of(ore()), 1);
        assert_eq!(pad.launched_of(bar()), 2);
        assert_eq!(pad.launched_of(ItemTypeId(9)), 0);
        assert_eq!(pad.launched_total(), 3);
    }

    // -----------------------------------------------------------------------
    // Test 4: Tallies stay sorted by item type
    // -----------------------------------------------------------------------
    #[test]
    fn launch_pad_tallies_sorted() {
        let mut pad = LaunchPad::new();
        pad.accept(ItemTypeId(5));
        pad.accept(ItemTypeId(1));
        pad.accept(ItemTypeId(3));

        let types: Vec<u32> = pad.launched.iter().map(|&(t, _)| t.0).collect();
        assert_eq!(types, vec![1, 3, 5]);
    }
}
