// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use crate::config::{load_and_validate_config, load_config, RuntimeBuilder};
    use crate::core::Core;
    use crate::engine::{lock_wire, run_until_idle, RunOptions, WireState};
    use crate::errors::{ConfigError, ValidationError};
    use std::io::Write;

    /// The shipped counter config loads, validates and counts to five.
    #[tokio::test]
    async fn test_counter_yaml_runs_to_completion() {
        let core = Core::new();
        let config = load_and_validate_config("configs/counter.yaml", &core).unwrap();
        assert_eq!(config.wires.len(), 1);
        assert_eq!(config.wires[0].shards.len(), 6);

        let (mut mesh, wires) = RuntimeBuilder::from_config(&core, &config).unwrap();
        let summary = run_until_idle(&mut mesh, &RunOptions::from_config(&config.mesh)).await;

        assert!(summary.healthy);
        assert!(summary.idle);
        assert_eq!(summary.ticks, 1);
        let wire = lock_wire(&wires[0]);
        assert_eq!(wire.state(), WireState::Ended);
        assert_eq!(wire.info().output.as_int(), 5);
    }

    /// Two wires share a mesh; the paused one resumes on the third tick while
    /// the looped one keeps counting until the tick limit.
    #[tokio::test]
    async fn test_pause_yaml_interleaves_wires() {
        let core = Core::new();
        let config = load_and_validate_config("configs/pause.yaml", &core).unwrap();
        assert_eq!(config.mesh.max_ticks, Some(6));

        let (mut mesh, wires) = RuntimeBuilder::from_config(&core, &config).unwrap();
        let options = RunOptions {
            tick_interval: std::time::Duration::ZERO,
            ..RunOptions::from_config(&config.mesh)
        };
        let summary = run_until_idle(&mut mesh, &options).await;

        assert_eq!(summary.ticks, 6);
        assert!(summary.healthy);
        assert!(!summary.idle);

        let sleeper = lock_wire(&wires[0]);
        assert_eq!(sleeper.state(), WireState::Ended);
        assert_eq!(sleeper.info().output.as_str(), "woke up");
        drop(sleeper);

        let ticker = lock_wire(&wires[1]);
        assert_eq!(ticker.iterations(), 6);
        assert_eq!(ticker.info().output.as_int(), 6);
    }

    /// TOML configs go through the same pipeline.
    #[test]
    fn test_values_toml_loading() {
        let core = Core::new();
        let config = load_and_validate_config("configs/values.toml", &core).unwrap();
        assert_eq!(config.mesh.time_step, 0.5);
        assert_eq!(config.wires[0].name, "vectors");

        let (mut mesh, wires) = RuntimeBuilder::from_config(&core, &config).unwrap();
        assert!(mesh.tick());
        assert_eq!(lock_wire(&wires[0]).info().output.as_int2(), [6, 40]);
    }

    /// Validation problems are reported together when loading from disk.
    #[test]
    fn test_invalid_config_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "wires:\n  - {{ name: a, shards: [{{ shard: Missing }}] }}\n  - {{ name: a, shards: [] }}"
        )
        .unwrap();

        match load_and_validate_config(file.path(), &Core::new()) {
            Err(ConfigError::Invalid(errors)) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.contains(&ValidationError::EmptyWire {
                    wire: "a".to_string()
                }));
            }
            other => panic!("expected validation errors, got {:?}", other.map(|_| ())),
        }
    }

    /// Shards registered on the core after creation are visible to validation.
    #[test]
    fn test_validation_uses_the_given_core() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "wires: [{{ name: main, shards: [{{ shard: Custom.Echo }}] }}]").unwrap();

        let core = Core::new();
        assert!(load_and_validate_config(file.path(), &core).is_err());
        assert!(core
            .register_shard("Custom.Echo", || Box::new(crate::backends::builtin::LogShard::new()))
            .is_ok());
        assert!(load_and_validate_config(file.path(), &core).is_ok());
    }

    #[test]
    fn test_unknown_extension_is_rejected_before_reading() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    /// Composition errors surface from the builder, not from validation.
    #[test]
    fn test_type_errors_surface_when_building() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "wires:\n  - name: main\n    shards:\n      - {{ shard: Const, params: {{ Value: text }} }}\n      - {{ shard: Math.Add, params: {{ Operand: 1 }} }}"
        )
        .unwrap();

        let core = Core::new();
        let config = load_and_validate_config(file.path(), &core).unwrap();
        let result = RuntimeBuilder::from_config(&core, &config);
        assert!(matches!(
            result,
            Err(crate::errors::BuildError::Wire(
                crate::errors::WireError::Composition { .. }
            ))
        ));
    }
}
