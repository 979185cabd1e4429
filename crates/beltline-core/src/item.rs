use crate::fixed::{Fixed32, Ticks, fixed32_ratio};
use crate::id::ItemTypeId;
use serde::{Deserialize, Serialize};

/// A single item traveling through the transport network.
///
/// Progress is relative to the current slot: it resets to zero whenever the
/// item enters a slot and the item may advance once it reaches the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_type: ItemTypeId,
    pub progress_tick: Ticks,
    pub target_tick: Ticks,
}

impl Item {
    pub fn new(item_type: ItemTypeId, target_tick: Ticks) -> Self {
        Self {
            item_type,
            progress_tick: 0,
            target_tick,
        }
    }

    /// Whether the item has dwelled long enough to advance one slot.
    pub fn is_eligible(&self) -> bool {
        self.progress_tick >= self.target_tick
    }

    /// Advance the dwell counter by one tick.
    pub fn age(&mut self) {
        self.progress_tick = self.progress_tick.saturating_add(1);
    }

    /// Reset the progress pair on entry into a new slot.
    pub fn restart(&mut self, target_tick: Ticks) {
        self.progress_tick = 0;
        self.target_tick = target_tick;
    }

    /// Dwell progress in [0, 1] for render interpolation.
    pub fn progress_fraction(&self) -> Fixed32 {
        fixed32_ratio(self.progress_tick, self.target_tick)
    }
}

/// A stack of fungible items of one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }
}

/// A bounded collection of item stacks: a fixed number of stacks, each with
/// a fixed size limit, and an optional uniqueness policy allowing at most
/// one stack per item type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContainer {
    pub stacks: Vec<ItemStack>,
    pub stack_capacity: u32,
    pub max_stack_size: u32,
    pub unique_stacks: bool,
}

impl ItemContainer {
    pub fn new(stack_capacity: u32, max_stack_size: u32) -> Self {
        Self {
            stacks: Vec::new(),
            stack_capacity,
            max_stack_size,
            unique_stacks: false,
        }
    }

    pub fn with_unique_stacks(stack_capacity: u32, max_stack_size: u32) -> Self {
        Self {
            unique_stacks: true,
            ..Self::new(stack_capacity, max_stack_size)
        }
    }

    /// Whether one more item of `item_type` would fit.
    pub fn has_space_for(&self, item_type: ItemTypeId) -> bool {
        if self
            .stacks
            .iter()
            .any(|s| s.item_type == item_type && s.quantity < self.max_stack_size)
        {
            return true;
        }
        if self.unique_stacks && self.stacks.iter().any(|s| s.item_type == item_type) {
            // The only allowed stack for this type is full.
            return false;
        }
        (self.stacks.len() as u32) < self.stack_capacity
    }

    /// How many more items of `item_type` would fit, counting headroom in
    /// existing stacks and stacks not yet opened.
    pub fn capacity_for(&self, item_type: ItemTypeId) -> u32 {
        let headroom: u32 = self
            .stacks
            .iter()
            .filter(|s| s.item_type == item_type)
            .map(|s| self.max_stack_size - s.quantity)
            .sum();
        let type_present = self.stacks.iter().any(|s| s.item_type == item_type);
        let free_slots = self.stack_capacity.saturating_sub(self.stacks.len() as u32);
        let openable = if self.unique_stacks {
            if type_present { 0 } else { free_slots.min(1) }
        } else {
            free_slots
        };
        headroom + openable * self.max_stack_size
    }

    /// Add a single item. Returns `false` when capacity or the uniqueness
    /// policy refuses it, leaving the container unchanged.
    pub fn try_add(&mut self, item_type: ItemTypeId) -> bool {
        if let Some(stack) = self
            .stacks
            .iter_mut()
            .find(|s| s.item_type == item_type && s.quantity < self.max_stack_size)
        {
            stack.quantity += 1;
            return true;
        }
        if self.unique_stacks && self.stacks.iter().any(|s| s.item_type == item_type) {
            return false;
        }
        if (self.stacks.len() as u32) < self.stack_capacity {
            self.stacks.push(ItemStack::new(item_type, 1));
            return true;
        }
        false
    }

    /// Add `quantity` items. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn add(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let mut remaining = quantity;
        while remaining > 0 {
            if !self.try_add(item_type) {
                break;
            }
            remaining -= 1;
        }
        remaining
    }

    /// Remove `quantity` items. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let mut removed = 0;
        for stack in self
            .stacks
            .iter_mut()
            .filter(|s| s.item_type == item_type)
        {
            let take = (quantity - removed).min(stack.quantity);
            stack.quantity -= take;
            removed += take;
            if removed == quantity {
                break;
            }
        }
        self.stacks.retain(|s| s.quantity > 0);
        removed
    }

    /// Take one item from the first non-empty stack.
    pub fn take_any(&mut self) -> Option<ItemTypeId> {
        let stack = self.stacks.first_mut()?;
        let item_type = stack.item_type;
        stack.quantity -= 1;
        if stack.quantity == 0 {
            self.stacks.remove(0);
        }
        Some(item_type)
    }

    /// Quantity of a specific item type.
    pub fn quantity(&self, item_type: ItemTypeId) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.item_type == item_type)
            .map(|s| s.quantity)
            .sum()
    }

    /// Total items across all stacks.
    pub fn total(&self) -> u32 {
        self.stacks.iter().map(|s| s.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }
}
