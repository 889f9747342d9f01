// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shards that change the flow of the running wire.

use crate::engine::{Context, FlowState};
use crate::errors::ActivationError;
use crate::traits::Shard;
use crate::types::{TypeInfo, Types, Var};

pub struct FlowShard {
    state: FlowState,
}

impl FlowShard {
    /// Ends the wire; its input becomes the wire's final output.
    pub fn stop() -> Self {
        Self {
            state: FlowState::Stop,
        }
    }

    /// Ends the current iteration early.
    pub fn return_() -> Self {
        Self {
            state: FlowState::Return,
        }
    }

    /// Starts the wire over from its first shard on the next quantum.
    pub fn restart() -> Self {
        Self {
            state: FlowState::Restart,
        }
    }
}

impl Shard for FlowShard {
    fn name(&self) -> &str {
        match self.state {
            FlowState::Stop => "Stop",
            FlowState::Return => "Return",
            FlowState::Restart => "Restart",
            FlowState::Continue => "Pass",
        }
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        match self.state {
            FlowState::Stop => ctx.stop_flow(),
            FlowState::Return => ctx.return_flow(),
            FlowState::Restart => ctx.restart_flow(),
            FlowState::Continue => {}
        }
        Ok(input.borrowed())
    }
}
