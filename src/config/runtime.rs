// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::abi::{from_shard_handle, into_shard_handle, ShardHandle};
use crate::config::values::{param_value, to_var, ParamValue};
use crate::config::{Config, ShardConfig, WireConfig};
use crate::core::Core;
use crate::engine::{Mesh, Wire, WireRef};
use crate::errors::{BuildError, ParamError};
use crate::traits::{set_param_by_name, Shard};
use crate::types::{ClonedVar, TypeInfo, Var, VarKind};

/// Mesh runtime builder - turns a validated configuration into scheduled wires.
///
/// Shards come from the registry of the given [`Core`], so foreign shards
/// registered before building can be used by name like builtins.
///
/// # Examples
///
/// ```
/// use shardmesh::config::{parse_config, ConfigFormat, RuntimeBuilder};
/// use shardmesh::core::Core;
///
/// let yaml = r#"
/// wires:
///   - name: main
///     shards:
///       - shard: Const
///         params: { Value: 2 }
///       - shard: Math.Multiply
///         params: { Operand: 21 }
/// "#;
/// let config = parse_config(yaml, ConfigFormat::Yaml).unwrap();
/// let core = Core::new();
/// let (mut mesh, wires) = RuntimeBuilder::from_config(&core, &config).unwrap();
///
/// mesh.tick();
/// let info = shardmesh::engine::lock_wire(&wires[0]).info();
/// assert_eq!(info.output.as_int(), 42);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build every wire and schedule it on a new mesh, in config order.
    ///
    /// Scheduling composes each wire, so type errors surface here as
    /// [`BuildError::Wire`].
    pub fn from_config(core: &Core, cfg: &Config) -> Result<(Mesh, Vec<WireRef>), BuildError> {
        let mut mesh = Mesh::new(cfg.mesh.clone());
        let mut wires = Vec::with_capacity(cfg.wires.len());
        for wire_cfg in &cfg.wires {
            let wire = Self::build_wire(core, wire_cfg)?.into_ref();
            mesh.schedule(&wire)?;
            wires.push(wire);
        }
        Ok((mesh, wires))
    }

    /// Build one wire without scheduling it.
    pub fn build_wire(core: &Core, cfg: &WireConfig) -> Result<Wire, BuildError> {
        let mut wire = Wire::new(cfg.name.clone());
        wire.set_looped(cfg.looped);
        wire.set_unsafe(cfg.unsafe_loop);
        if let Some(input) = &cfg.input {
            let value = to_var(input).map_err(|reason| BuildError::Value {
                context: format!("{}.input", cfg.name),
                reason,
            })?;
            wire.set_input(&value);
        }
        for (index, entry) in cfg.shards.iter().enumerate() {
            let shard = Self::build_shard(core, entry, &format!("{}.{}", cfg.name, index))?;
            wire.add_shard(shard)?;
        }
        Ok(wire)
    }

    /// Create a shard and apply its parameters. `context` names the shard in
    /// error messages.
    pub fn build_shard(core: &Core, entry: &ShardConfig, context: &str) -> Result<Box<dyn Shard>, BuildError> {
        let mut shard = core.create_shard(&entry.shard)?;
        for (name, value) in &entry.params {
            let param_context = format!("{}.{}", context, name);
            let applied = match param_value(value) {
                Ok(ParamValue::Value(value)) => {
                    set_param_by_name(shard.as_mut(), name, &value).map_err(BuildError::from)
                }
                Ok(ParamValue::Shards(entries)) => {
                    Self::set_shards_param(core, shard.as_mut(), name, &entries, &param_context)
                }
                Err(reason) => Err(BuildError::Value {
                    context: param_context,
                    reason,
                }),
            };
            if let Err(error) = applied {
                shard.destroy();
                return Err(error);
            }
        }
        Ok(shard)
    }

    /// Hand nested shards to a `ShardRef` parameter. On failure every nested
    /// shard is destroyed again.
    fn set_shards_param(
        core: &Core,
        shard: &mut dyn Shard,
        name: &str,
        entries: &[ShardConfig],
        context: &str,
    ) -> Result<(), BuildError> {
        let parameters = shard.parameters();
        let info = parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ParamError::UnknownName {
                shard: shard.name().to_string(),
                parameter: name.to_string(),
            })?;
        if !info.types.iter().any(accepts_shards) {
            return Err(BuildError::Value {
                context: context.to_string(),
                reason: format!("parameter {} of {} does not take shards", name, shard.name()),
            });
        }

        let mut handles: Vec<*mut ShardHandle> = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            match Self::build_shard(core, entry, &format!("{}.{}", context, index)) {
                Ok(nested) => handles.push(into_shard_handle(nested)),
                Err(error) => {
                    release_handles(handles);
                    return Err(error);
                }
            }
        }

        let refs: Vec<Var> = handles
            .iter()
            .map(|handle| Var::reference(VarKind::ShardRef, handle.cast()))
            .collect();
        let value = ClonedVar::adopt(Var::new_seq(&refs));
        if let Err(error) = set_param_by_name(shard, name, &value) {
            release_handles(handles);
            return Err(error.into());
        }
        Ok(())
    }
}

fn accepts_shards(declared: &TypeInfo) -> bool {
    match declared {
        TypeInfo::ShardRef => true,
        TypeInfo::Seq(inner) => inner.iter().any(|t| matches!(t, TypeInfo::ShardRef)),
        _ => false,
    }
}

fn release_handles(handles: Vec<*mut ShardHandle>) {
    for handle in handles {
        // SAFETY: each handle came from into_shard_handle and was not taken.
        if let Some(mut shard) = unsafe { from_shard_handle(handle) } {
            shard.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_config, ConfigFormat};
    use crate::engine::lock_wire;

    fn config(yaml: &str) -> Config {
        parse_config(yaml, ConfigFormat::Yaml).unwrap()
    }

    #[test]
    fn wires_are_built_and_scheduled_in_order() {
        let cfg = config(
            r#"
wires:
  - name: first
    looped: true
    shards: [{ shard: Const, params: { Value: 1 } }]
  - name: second
    input: 4
    shards: [{ shard: Math.Add, params: { Operand: 1 } }]
"#,
        );
        let (mesh, wires) = RuntimeBuilder::from_config(&Core::new(), &cfg).unwrap();
        assert_eq!(mesh.wires().len(), 2);
        assert_eq!(lock_wire(&wires[0]).name(), "first");
        assert!(lock_wire(&wires[0]).is_looped());
        assert!(lock_wire(&wires[1]).is_scheduled());
    }

    #[test]
    fn unknown_parameters_fail_the_build() {
        let entry = ShardConfig {
            shard: "Const".to_string(),
            params: [("Nope".to_string(), serde_yaml::Value::Bool(true))].into_iter().collect(),
        };
        let result = RuntimeBuilder::build_shard(&Core::new(), &entry, "w.0");
        assert!(matches!(
            result,
            Err(BuildError::Param(ParamError::UnknownName { .. }))
        ));
    }

    #[test]
    fn shard_lists_only_go_to_shard_parameters() {
        let cfg = config(
            r#"
wires:
  - name: main
    shards:
      - shard: Math.Add
        params:
          Operand:
            - shard: Log
"#,
        );
        match RuntimeBuilder::from_config(&Core::new(), &cfg) {
            Err(BuildError::Value { context, .. }) => assert_eq!(context, "main.0.Operand"),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("shards accepted by a value parameter"),
        }
    }

    #[test]
    fn nested_shards_are_handed_to_repeat() {
        let cfg = config(
            r#"
wires:
  - name: main
    shards:
      - shard: Repeat
        params:
          Times: 2
          Action:
            - shard: Log
            - shard: Log
"#,
        );
        let wire = RuntimeBuilder::build_wire(&Core::new(), &cfg.wires[0]).unwrap();
        assert_eq!(wire.len(), 1);
    }

    #[test]
    fn bad_values_name_their_location() {
        let cfg = config(
            r#"
wires:
  - name: main
    input: { bytes: "!!!" }
    shards: [{ shard: Log }]
"#,
        );
        match RuntimeBuilder::build_wire(&Core::new(), &cfg.wires[0]) {
            Err(BuildError::Value { context, .. }) => assert_eq!(context, "main.input"),
            _ => panic!("expected a value error"),
        }
    }
}
