//! Recipe-driven producers.
//!
//! A producer runs one recipe: extractors use a recipe with no inputs and
//! pull items out of nothing on a fixed cadence, smelters and the like
//! consume from an input container that fills through the insertion
//! capability. Crafting is a small state machine:
//!
//! - `Idle` - waiting to start the next cycle.
//! - `Working` - a cycle in flight, `progress` counting up to the recipe
//!   duration.
//! - `Stalled` - cannot start, with the reason recorded so callers can
//!   surface it.
//!
//! Output space is reserved before inputs are consumed, so a completed
//! cycle always has room to emit and inputs are never lost to a full
//! buffer. Finished items queue in the output container; the standalone
//! phase of the tick pushes them into whatever entity sits one cell ahead.

use crate::fixed::Ticks;
use crate::id::{ItemTypeId, RecipeId};
use crate::item::ItemContainer;
use crate::registry::{Recipe, Registry};
use serde::{Deserialize, Serialize};

/// Stack slots in a producer's input and output containers.
pub const PRODUCER_STACKS: u32 = 4;

/// Items per stack in a producer's containers.
pub const PRODUCER_STACK_SIZE: u32 = 64;

// ---------------------------------------------------------------------------
// Crafting state
// ---------------------------------------------------------------------------

/// Why a producer cannot make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallReason {
    MissingInputs,
    OutputFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProducerState {
    Idle,
    Working { progress: Ticks },
    Stalled { reason: StallReason },
}

/// What a single producer tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerResult {
    /// A crafting cycle completed and its outputs were emitted.
    pub crafted: bool,
    pub state_changed: bool,
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub recipe: RecipeId,
    pub input: ItemContainer,
    pub output: ItemContainer,
    pub state: ProducerState,
}

impl Producer {
    pub fn new(recipe: RecipeId) -> Self {
        Self {
            recipe,
            input: ItemContainer::new(PRODUCER_STACKS, PRODUCER_STACK_SIZE),
            output: ItemContainer::new(PRODUCER_STACKS, PRODUCER_STACK_SIZE),
            state: ProducerState::Idle,
        }
    }

    /// Accept an item into the input container. Only types the recipe
    /// actually consumes are taken.
    pub fn accept_input(&mut self, registry: &Registry, item_type: ItemTypeId) -> bool {
        let Some(recipe) = registry.recipe(self.recipe) else {
            return false;
        };
        if !recipe.inputs.iter().any(|entry| entry.item == item_type) {
            return false;
        }
        self.input.try_add(item_type)
    }

    /// The next output item waiting to be pushed downstream.
    pub fn peek_output(&self) -> Option<ItemTypeId> {
        self.output.stacks.first().map(|stack| stack.item_type)
    }

    /// Remove one emitted item after it was handed downstream.
    pub fn consume_output(&mut self, item_type: ItemTypeId) {
        let removed = self.output.remove(item_type, 1);
        debug_assert_eq!(removed, 1);
    }

    /// Lift one item straight out of the output buffer.
    pub fn take_output(&mut self) -> Option<ItemTypeId> {
        self.output.take_any()
    }

    /// Items buffered on this producer, input and output together.
    pub fn item_count(&self) -> u32 {
        self.input.total() + self.output.total()
    }

    /// Advance the crafting state machine by one tick.
    pub fn tick(&mut self, registry: &Registry) -> ProducerResult {
        let Some(recipe) = registry.recipe(self.recipe) else {
            return ProducerResult::default();
        };
        let mut result = ProducerResult::default();

        match &mut self.state {
            ProducerState::Idle | ProducerState::Stalled { .. } => {
                // Reserve output space before touching inputs.
                let room = recipe
                    .outputs
                    .iter()
                    .all(|entry| self.output.capacity_for(entry.item) >= entry.quantity);
                if !room {
                    let new_state = ProducerState::Stalled {
                        reason: StallReason::OutputFull,
                    };
                    if self.state != new_state {
                        self.state = new_state;
                        result.state_changed = true;
                    }
                    return result;
                }

                let satisfied = recipe
                    .inputs
                    .iter()
                    .all(|entry| self.input.quantity(entry.item) >= entry.quantity);
                if !satisfied {
                    let new_state = ProducerState::Stalled {
                        reason: StallReason::MissingInputs,
                    };
                    if self.state != new_state {
                        self.state = new_state;
                        result.state_changed = true;
                    }
                    return result;
                }

                for entry in &recipe.inputs {
                    let removed = self.input.remove(entry.item, entry.quantity);
                    debug_assert_eq!(removed, entry.quantity);
                }

                if recipe.duration <= 1 {
                    emit_outputs(&mut self.output, recipe);
                    result.crafted = true;
                    self.state = ProducerState::Idle;
                } else {
                    self.state = ProducerState::Working { progress: 1 };
                }
                result.state_changed = true;
            }

            ProducerState::Working { progress } => {
                *progress += 1;
                if *progress >= recipe.duration {
                    emit_outputs(&mut self.output, recipe);
                    result.crafted = true;
                    self.state = ProducerState::Idle;
                    result.state_changed = true;
                }
            }
        }

        result
    }
}

fn emit_outputs(output: &mut ItemContainer, recipe: &Recipe) {
    for entry in &recipe.outputs {
        let overflow = output.add(entry.item, entry.quantity);
        debug_assert_eq!(overflow, 0);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
