// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The shard registry and the entry point for foreign code.
//!
//! A [`Core`] maps shard names to constructors, native or foreign, and owns
//! the [`CoreInterface`] table handed across the C boundary. It is always
//! held in an `Arc` so the table can point back at it.

use crate::abi::{CoreInterface, CURRENT_ABI};
use crate::backends::builtin::{BuiltinShards, ShardConstructor};
use crate::backends::foreign::{ForeignConstructor, ForeignShard};
use crate::errors::{AbiError, RegistryError};
use crate::observability::messages::abi::{AbiVersionRejected, ShardRegistered};
use crate::observability::messages::shard::ShardCreated;
use crate::observability::messages::StructuredLog;
use crate::traits::Shard;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

#[derive(Clone, Copy)]
enum ShardSource {
    Native(ShardConstructor),
    Foreign(ForeignConstructor),
}

pub struct Core {
    registry: RwLock<BTreeMap<String, ShardSource>>,
    interface: OnceLock<CoreInterface>,
}

impl Core {
    /// A core with every built-in shard registered.
    pub fn new() -> Arc<Core> {
        let core = Self::empty();
        for (name, constructor) in BuiltinShards::constructors() {
            // Builtin names are unique, so this cannot collide.
            let _ = core.register_shard(name, constructor);
        }
        core
    }

    /// A core with nothing registered.
    pub fn empty() -> Arc<Core> {
        Arc::new(Core {
            registry: RwLock::new(BTreeMap::new()),
            interface: OnceLock::new(),
        })
    }

    pub fn register_shard(&self, name: &str, constructor: ShardConstructor) -> Result<(), RegistryError> {
        self.insert(name, ShardSource::Native(constructor))
    }

    pub fn register_foreign_shard(
        &self,
        name: &str,
        constructor: ForeignConstructor,
    ) -> Result<(), RegistryError> {
        self.insert(name, ShardSource::Foreign(constructor))
    }

    fn insert(&self, name: &str, source: ShardSource) -> Result<(), RegistryError> {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if registry.contains_key(name) {
            return Err(RegistryError::DuplicateShard(name.to_string()));
        }
        registry.insert(name.to_string(), source);
        ShardRegistered {
            shard: name,
            foreign: matches!(source, ShardSource::Foreign(_)),
        }
        .log();
        Ok(())
    }

    /// Instantiate a registered shard.
    pub fn create_shard(&self, name: &str) -> Result<Box<dyn Shard>, RegistryError> {
        // The lock is released before constructing: foreign constructors may
        // call back into the registry.
        let source = self
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownShard(name.to_string()))?;

        let shard: Box<dyn Shard> = match source {
            ShardSource::Native(constructor) => constructor(),
            ShardSource::Foreign(constructor) => {
                let raw = constructor(self.interface_table());
                // SAFETY: the constructor hands over a fresh instance.
                match unsafe { ForeignShard::from_raw(raw) } {
                    Some(shard) => Box::new(shard),
                    None => {
                        return Err(AbiError::NullShard {
                            name: name.to_string(),
                        }
                        .into())
                    }
                }
            }
        };
        ShardCreated {
            shard: name,
            foreign: matches!(source, ShardSource::Foreign(_)),
        }
        .log();
        Ok(shard)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn shard_names(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// The C interface table, provided the caller speaks [`CURRENT_ABI`].
    pub fn interface(&self, abi_version: u32) -> Result<&CoreInterface, AbiError> {
        if abi_version != CURRENT_ABI {
            AbiVersionRejected {
                expected: CURRENT_ABI,
                requested: abi_version,
            }
            .log();
            return Err(AbiError::VersionMismatch {
                expected: CURRENT_ABI,
                found: abi_version,
            });
        }
        Ok(self.interface_table())
    }

    fn interface_table(&self) -> &CoreInterface {
        self.interface
            .get_or_init(|| CoreInterface::new(self as *const Core))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::builtin::ConstShard;

    #[test]
    fn builtins_are_registered() {
        let core = Core::new();
        for name in BuiltinShards::list_available() {
            assert!(core.is_registered(name), "{} missing", name);
        }
        let names = core.shard_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let core = Core::empty();
        core.register_shard("Custom", || Box::new(ConstShard::new()))
            .expect("first registration");
        let error = core
            .register_shard("Custom", || Box::new(ConstShard::new()))
            .unwrap_err();
        assert_eq!(error, RegistryError::DuplicateShard("Custom".to_string()));
    }

    #[test]
    fn unknown_names_fail() {
        let core = Core::empty();
        match core.create_shard("Const") {
            Err(RegistryError::UnknownShard(name)) => assert_eq!(name, "Const"),
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("empty core created a shard"),
        }
    }

    #[test]
    fn wrong_abi_version_is_refused() {
        let core = Core::new();
        assert_eq!(
            core.interface(1).err(),
            Some(AbiError::VersionMismatch {
                expected: CURRENT_ABI,
                found: 1,
            })
        );
        let table = core.interface(CURRENT_ABI).expect("interface");
        assert_eq!(table.abi_version, CURRENT_ABI);
        assert!(std::ptr::eq(table.core, Arc::as_ptr(&core)));
    }

    extern "C" fn null_constructor(_core: *const CoreInterface) -> *mut crate::backends::foreign::ShardVTable {
        std::ptr::null_mut()
    }

    #[test]
    fn null_foreign_instances_are_reported() {
        let core = Core::empty();
        core.register_foreign_shard("Broken", null_constructor)
            .expect("registration");
        match core.create_shard("Broken") {
            Err(RegistryError::Abi(AbiError::NullShard { name })) => assert_eq!(name, "Broken"),
            _ => panic!("expected a null shard error"),
        }
    }
}
