// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Table payload helpers. A table owns a deep copy of every value stored in it.

use crate::types::ops::{clone_var, destroy_var};
use crate::types::var::Var;
use std::collections::BTreeMap;

/// Backing store of a `Table` value. Keys iterate in sorted order.
pub type TableMap = BTreeMap<String, Var>;

/// Store a deep copy of `value` under `key`, destroying any previous value.
pub fn table_set(table: &mut Var, key: &str, value: &Var) {
    let map = table.as_table_mut();
    let slot = map.entry(key.to_string()).or_default();
    clone_var(slot, value);
}

pub fn table_get<'a>(table: &'a Var, key: &str) -> Option<&'a Var> {
    table.as_table().get(key)
}

pub fn table_get_mut<'a>(table: &'a mut Var, key: &str) -> Option<&'a mut Var> {
    table.as_table_mut().get_mut(key)
}

/// Remove and destroy the value under `key`. Returns whether it existed.
pub fn table_remove(table: &mut Var, key: &str) -> bool {
    match table.as_table_mut().remove(key) {
        Some(mut value) => {
            destroy_var(&mut value);
            true
        }
        None => false,
    }
}

pub fn table_len(table: &Var) -> usize {
    table.as_table().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::alloc::live_allocations;

    #[test]
    fn set_get_remove_round_trip() {
        let before = live_allocations();
        let mut table = Var::new_table();
        table_set(&mut table, "name", &Var::from("shard"));
        table_set(&mut table, "count", &Var::from(3i64));
        assert_eq!(table_len(&table), 2);
        assert_eq!(table_get(&table, "name").map(|v| v.as_str()), Some("shard"));
        assert!(table_get(&table, "name").map(|v| v.is_owned()).unwrap_or(false));

        table_set(&mut table, "name", &Var::from("mesh"));
        assert_eq!(table_get(&table, "name").map(|v| v.as_str()), Some("mesh"));

        assert!(table_remove(&mut table, "name"));
        assert!(!table_remove(&mut table, "name"));
        assert_eq!(table_len(&table), 1);

        destroy_var(&mut table);
        assert_eq!(live_allocations(), before);
    }
}
