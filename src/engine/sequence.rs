// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Running an ordered list of shards.
//!
//! Shared by wires and by shards that own nested shard lists (`Repeat`).
//! Each shard's output is the next shard's input. The run stops early when
//! a shard suspends, changes the flow state, fails, or the activation budget
//! runs out.

use crate::engine::context::{Context, FlowState};
use crate::engine::slot::ShardSlot;
use crate::errors::ActivationError;
use crate::types::{ClonedVar, Var};

#[derive(Debug)]
pub enum SequenceOutcome {
    /// Every shard ran; the last output.
    Completed(ClonedVar),
    /// The budget ran out before shard `next`, which gets `input`.
    Yielded { next: usize, input: ClonedVar },
    /// Shard `index` asked to be re-activated with `input` after `seconds`.
    Suspended {
        index: usize,
        input: ClonedVar,
        seconds: f64,
    },
    /// Shard `index` changed the flow. `output` is what the wire should report.
    Flow {
        state: FlowState,
        index: usize,
        output: ClonedVar,
    },
    Failed {
        index: usize,
        error: ActivationError,
    },
}

/// Warm up every cold slot in order. On failure the slots warmed by this
/// call are cleaned up again in reverse order.
pub fn warmup_all(
    slots: &mut [ShardSlot],
    ctx: &mut Context,
) -> Result<(), (usize, ActivationError)> {
    let mut warmed_now = Vec::new();
    for index in 0..slots.len() {
        if slots[index].warmed {
            continue;
        }
        match slots[index].with(|shard| shard.warmup(ctx)) {
            Ok(()) => {
                slots[index].warmed = true;
                warmed_now.push(index);
            }
            Err(error) => {
                for &undo in warmed_now.iter().rev() {
                    let undo_slot = &mut slots[undo];
                    undo_slot.with(|shard| shard.cleanup(ctx));
                    undo_slot.warmed = false;
                }
                return Err((index, error));
            }
        }
    }
    Ok(())
}

/// Clean up warmed slots in reverse order.
pub fn cleanup_all(slots: &mut [ShardSlot], ctx: &mut Context) {
    for slot in slots.iter_mut().rev() {
        if slot.warmed {
            slot.with(|shard| shard.cleanup(ctx));
            slot.warmed = false;
        }
    }
}

/// Activate slots starting at `from`.
///
/// `budget` caps the number of activations; `None` runs to the end. When
/// `ctx` is resuming, only the first activation sees it.
pub fn run(
    slots: &mut [ShardSlot],
    from: usize,
    input: &Var,
    ctx: &mut Context,
    budget: Option<usize>,
) -> SequenceOutcome {
    let mut current = *input;
    let mut activations = 0usize;

    for index in from..slots.len() {
        if budget.is_some_and(|limit| activations >= limit) {
            return SequenceOutcome::Yielded {
                next: index,
                input: ClonedVar::new(&current),
            };
        }

        let shard_input = current;
        let result = slots[index].with(|shard| shard.activate(ctx, &shard_input));
        activations += 1;
        ctx.set_resuming(false);

        if let Some(error) = ctx.take_abort() {
            return SequenceOutcome::Failed { index, error };
        }
        let output = match result {
            Ok(output) => output,
            Err(error) => return SequenceOutcome::Failed { index, error },
        };
        if let Some(seconds) = ctx.take_suspend() {
            return SequenceOutcome::Suspended {
                index,
                input: ClonedVar::new(&shard_input),
                seconds,
            };
        }
        match ctx.take_flow() {
            FlowState::Continue => current = output,
            FlowState::Return => {
                return SequenceOutcome::Flow {
                    state: FlowState::Return,
                    index,
                    output: ClonedVar::new(&shard_input),
                }
            }
            state => {
                return SequenceOutcome::Flow {
                    state,
                    index,
                    output: ClonedVar::new(&output),
                }
            }
        }
    }

    SequenceOutcome::Completed(ClonedVar::new(&current))
}
