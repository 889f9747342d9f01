// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `Repeat`: run a nested shard list several times on the same input.
//!
//! The nested shards are owned by the `Repeat` instance. When one of them
//! suspends, `Repeat` remembers the iteration and the inner position and
//! suspends the outer wire at its own index; on resume it continues from
//! exactly there.

use crate::engine::sequence::{self, SequenceOutcome};
use crate::engine::{compose_shards, Context, FlowState, ShardSlot, VariableRef};
use crate::errors::{ActivationError, CompositionError, ParamError};
use crate::traits::{InstanceData, Shard};
use crate::types::{
    ClonedVar, ExposedTypeInfo, ExposedTypes, ParameterInfo, Parameters, TypeInfo, Types, Var,
    VarKind,
};

struct Cursor {
    iteration: i64,
    index: usize,
    input: ClonedVar,
}

pub struct RepeatShard {
    action: Vec<ShardSlot>,
    times: i64,
    times_variable: Option<String>,
    times_ref: Option<VariableRef>,
    forever: bool,
    exposed: ExposedTypes,
    cursor: Option<Cursor>,
    output: ClonedVar,
}

impl Default for RepeatShard {
    fn default() -> Self {
        Self {
            action: Vec::new(),
            times: 0,
            times_variable: None,
            times_ref: None,
            forever: false,
            exposed: Vec::new(),
            cursor: None,
            output: ClonedVar::default(),
        }
    }
}

impl RepeatShard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give the action shards directly (Rust hosts).
    pub fn with_action(mut self, shards: Vec<Box<dyn Shard>>, times: i64) -> Self {
        self.replace_action(shards);
        self.times = times;
        self
    }

    fn replace_action(&mut self, shards: Vec<Box<dyn Shard>>) {
        for slot in self.action.drain(..) {
            slot.dispose();
        }
        self.action = shards.into_iter().map(ShardSlot::owned).collect();
        self.exposed.clear();
    }

    fn shard_refs(&self, value: &Var) -> Result<Vec<*mut Box<dyn Shard>>, ParamError> {
        let items: Vec<Var> = match value.kind {
            VarKind::None => Vec::new(),
            VarKind::ShardRef => vec![*value],
            VarKind::Seq => value.as_seq().to_vec(),
            _ => Vec::new(),
        };
        items
            .iter()
            .map(|item| {
                let ptr = if item.kind == VarKind::ShardRef {
                    item.as_reference() as *mut Box<dyn Shard>
                } else {
                    std::ptr::null_mut()
                };
                if ptr.is_null() {
                    Err(ParamError::Rejected {
                        shard: self.name().to_string(),
                        parameter: "Action".to_string(),
                        reason: "expected shard references".to_string(),
                    })
                } else {
                    Ok(ptr)
                }
            })
            .collect()
    }

    fn repeats(&self) -> i64 {
        match &self.times_ref {
            // SAFETY: held from warmup to cleanup.
            Some(reference) => {
                let value = unsafe { reference.get() };
                if value.kind == VarKind::Int {
                    value.as_int()
                } else {
                    0
                }
            }
            None => self.times,
        }
    }
}

impl Shard for RepeatShard {
    fn name(&self) -> &str {
        "Repeat"
    }

    fn help(&self) -> &str {
        "Repeats the Action shards on the same input; outputs the input."
    }

    fn input_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn output_types(&self) -> Types {
        vec![TypeInfo::Any]
    }

    fn parameters(&self) -> Parameters {
        vec![
            ParameterInfo::new(
                "Action",
                "The shards to repeat.",
                vec![
                    TypeInfo::ShardRef,
                    TypeInfo::seq_of(TypeInfo::ShardRef),
                    TypeInfo::None,
                ],
            ),
            ParameterInfo::new(
                "Times",
                "How many times to repeat, a number or an Int variable.",
                vec![TypeInfo::Int, TypeInfo::context_var_of(vec![TypeInfo::Int])],
            ),
            ParameterInfo::new("Forever", "Repeat until the flow changes.", vec![TypeInfo::Bool]),
        ]
    }

    /// `Action` takes ownership of the referenced shards once every element
    /// has been validated; on error nothing is taken.
    fn set_param(&mut self, index: usize, value: &Var) -> Result<(), ParamError> {
        match index {
            0 => {
                let refs = self.shard_refs(value)?;
                let shards = refs
                    .into_iter()
                    // SAFETY: shard handles are `Box::into_raw(Box<Box<dyn Shard>>)`
                    // and ownership passes to us exactly once.
                    .map(|ptr| *unsafe { Box::from_raw(ptr) })
                    .collect();
                self.replace_action(shards);
            }
            1 if value.kind == VarKind::Int => {
                self.times = value.as_int();
                self.times_variable = None;
            }
            1 => self.times_variable = Some(value.as_str().to_string()),
            2 => self.forever = value.as_bool(),
            _ => {
                return Err(ParamError::IndexOutOfRange {
                    shard: self.name().to_string(),
                    index,
                    count: 3,
                })
            }
        }
        Ok(())
    }

    /// `Action` reads back as the names of the nested shards.
    fn get_param(&self, index: usize) -> Result<ClonedVar, ParamError> {
        match index {
            0 => {
                let names: Vec<ClonedVar> = self
                    .action
                    .iter()
                    .map(|slot| slot.peek(|shard| ClonedVar::from(shard.name())))
                    .collect();
                let views: Vec<Var> = names.iter().map(|n| *n.var()).collect();
                Ok(ClonedVar::adopt(Var::new_seq(&views)))
            }
            1 => Ok(match &self.times_variable {
                Some(name) => ClonedVar::adopt(Var::new_context_var(name)),
                None => ClonedVar::from(self.times),
            }),
            2 => Ok(ClonedVar::from(self.forever)),
            _ => Err(ParamError::IndexOutOfRange {
                shard: self.name().to_string(),
                index,
                count: 3,
            }),
        }
    }

    fn exposed_variables(&self) -> ExposedTypes {
        self.exposed.clone()
    }

    /// Requirements of the nested shards not met inside the action itself.
    fn required_variables(&self) -> ExposedTypes {
        let mut required = Vec::new();
        if let Some(name) = &self.times_variable {
            required.push(ExposedTypeInfo::new(name.clone(), TypeInfo::Int));
        }
        let mut inner_exposed: Vec<String> = Vec::new();
        for slot in &self.action {
            for wanted in slot.peek(|shard| shard.required_variables()) {
                let satisfied = inner_exposed.contains(&wanted.name)
                    || required.iter().any(|r: &ExposedTypeInfo| r.name == wanted.name);
                if !satisfied {
                    required.push(wanted);
                }
            }
            inner_exposed.extend(
                slot.peek(|shard| shard.exposed_variables())
                    .into_iter()
                    .map(|e| e.name),
            );
        }
        required
    }

    fn compose(&mut self, data: &InstanceData) -> Result<TypeInfo, CompositionError> {
        let result = compose_shards(
            &mut self.action,
            data.wire_name,
            data.input_type,
            data.shared,
        )?;
        self.exposed = result.exposed;
        Ok(data.input_type.clone())
    }

    fn warmup(&mut self, ctx: &mut Context) -> Result<(), ActivationError> {
        if let Some(name) = &self.times_variable {
            self.times_ref = Some(ctx.reference_variable(name));
        }
        let result = sequence::warmup_all(&mut self.action, ctx);
        if result.is_err() {
            if let Some(reference) = self.times_ref.take() {
                ctx.release_variable(reference);
            }
        }
        result.map_err(|(_, error)| error)
    }

    fn activate(&mut self, ctx: &mut Context, input: &Var) -> Result<Var, ActivationError> {
        let resumed = if ctx.is_resuming() {
            self.cursor.take()
        } else {
            self.cursor = None;
            None
        };
        let (mut iteration, mut pending) = match resumed {
            Some(cursor) => (cursor.iteration, Some((cursor.index, cursor.input))),
            None => (0, None),
        };

        while self.forever || iteration < self.repeats() {
            let outcome = match &pending {
                Some((index, inner_input)) => {
                    sequence::run(&mut self.action, *index, inner_input.var(), ctx, None)
                }
                None => sequence::run(&mut self.action, 0, input, ctx, None),
            };
            pending = None;

            match outcome {
                SequenceOutcome::Completed(_) | SequenceOutcome::Yielded { .. } => {
                    iteration += 1;
                }
                SequenceOutcome::Suspended {
                    index,
                    input: inner_input,
                    seconds,
                } => {
                    self.cursor = Some(Cursor {
                        iteration,
                        index,
                        input: inner_input,
                    });
                    ctx.suspend(seconds);
                    return Ok(input.borrowed());
                }
                SequenceOutcome::Flow { state, output, .. } => {
                    match state {
                        FlowState::Stop => ctx.stop_flow(),
                        FlowState::Return => ctx.return_flow(),
                        FlowState::Restart => ctx.restart_flow(),
                        FlowState::Continue => {}
                    }
                    self.output = output;
                    return Ok(self.output.borrowed());
                }
                SequenceOutcome::Failed { error, .. } => return Err(error),
            }
        }
        Ok(input.borrowed())
    }

    fn cleanup(&mut self, ctx: &mut Context) {
        sequence::cleanup_all(&mut self.action, ctx);
        if let Some(reference) = self.times_ref.take() {
            ctx.release_variable(reference);
        }
        self.cursor = None;
    }

    fn destroy(&mut self) {
        for slot in self.action.drain(..) {
            slot.dispose();
        }
    }
}
