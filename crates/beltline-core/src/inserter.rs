//! Inserter arm state.
//!
//! An inserter bridges the cell behind it to the cell ahead of it. The
//! swing itself is resolved in the standalone phase, where the world can
//! reach both neighbors; this module tracks what the arm holds and the
//! recovery time after a completed hand-over.

use crate::fixed::Ticks;
use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// Ticks an inserter rests after delivering an item.
pub const INSERTER_COOLDOWN_TICKS: Ticks = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inserter {
    pub held: Option<ItemTypeId>,
    pub cooldown: Ticks,
}

impl Inserter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the arm may pick up an item this tick.
    pub fn can_pick_up(&self) -> bool {
        self.held.is_none() && self.cooldown == 0
    }

    /// Count down the rest period by one tick.
    pub fn tick_cooldown(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
    }

    /// Grab an item off the source entity.
    pub fn pick_up(&mut self, item_type: ItemTypeId) {
        debug_assert!(self.can_pick_up());
        self.held = Some(item_type);
    }

    /// Drop the held item after the target took it, starting the cooldown.
    pub fn deliver(&mut self) -> Option<ItemTypeId> {
        let item = self.held.take();
        if item.is_some() {
            self.cooldown = INSERTER_COOLDOWN_TICKS;
        }
        item
    }

    pub fn item_count(&self) -> u32 {
        self.held.is_some() as u32
    }
}

// ===========================================================================
// Tests
// ===========================================================================
