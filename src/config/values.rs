// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Conversion of configuration values into runtime values.
//!
//! | YAML                         | Value                      |
//! |------------------------------|----------------------------|
//! | `null`                       | None                       |
//! | `true`, `3`, `1.5`, `"text"` | Bool, Int, Float, String   |
//! | `[a, b]`                     | Seq                        |
//! | `{a: 1}`                     | Table                      |
//! | `{bytes: "AQID"}`            | Bytes (base64)             |
//! | `{var: name}`                | ContextVar                 |
//! | `{path: "a/b"}`              | Path                       |
//! | `{int2: [1, 2]}` etc.        | Int2..Int4, Float2..Float4 |
//! | `{color: [r, g, b, a]}`      | Color                      |
//! | `[{shard: ..}, ..]`          | shard list                 |

use crate::config::consts::{PARAMS_KEY, SHARD_KEY};
use crate::config::ShardConfig;
use crate::types::table::table_set;
use crate::types::{destroy_var, ClonedVar, Var};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_yaml::{Mapping, Value};

/// A parameter value as written in a config file.
pub enum ParamValue {
    Value(ClonedVar),
    /// Nested shards, created and handed over as `ShardRef` values.
    Shards(Vec<ShardConfig>),
}

fn is_shard_entry(mapping: &Mapping) -> bool {
    mapping.contains_key(SHARD_KEY)
        && mapping
            .keys()
            .all(|key| key.as_str().is_some_and(|k| k == SHARD_KEY || k == PARAMS_KEY))
}

/// The nested shard entries of `value`, when it is a shard list (or a
/// single shard entry).
pub fn shard_list(value: &Value) -> Option<Vec<ShardConfig>> {
    match value {
        Value::Mapping(mapping) if is_shard_entry(mapping) => {
            serde_yaml::from_value(value.clone()).ok().map(|entry| vec![entry])
        }
        Value::Sequence(items)
            if !items.is_empty()
                && items
                    .iter()
                    .all(|item| matches!(item, Value::Mapping(m) if is_shard_entry(m))) =>
        {
            serde_yaml::from_value(value.clone()).ok()
        }
        Value::Tagged(tagged) => shard_list(&tagged.value),
        _ => None,
    }
}

pub fn param_value(value: &Value) -> Result<ParamValue, String> {
    match shard_list(value) {
        Some(shards) => Ok(ParamValue::Shards(shards)),
        None => to_var(value).map(ParamValue::Value),
    }
}

fn numbers(value: &Value, count: usize, tag: &str) -> Result<Vec<f64>, String> {
    let items = match value {
        Value::Sequence(items) if items.len() == count => items,
        _ => return Err(format!("{} expects a list of {} numbers", tag, count)),
    };
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| format!("{} expects numbers, found {:?}", tag, item))
        })
        .collect()
}

fn integers(value: &Value, count: usize, tag: &str) -> Result<Vec<i64>, String> {
    let items = match value {
        Value::Sequence(items) if items.len() == count => items,
        _ => return Err(format!("{} expects a list of {} integers", tag, count)),
    };
    items
        .iter()
        .map(|item| {
            item.as_i64()
                .ok_or_else(|| format!("{} expects integers, found {:?}", tag, item))
        })
        .collect()
}

fn text<'a>(value: &'a Value, tag: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} expects a string", tag))
}

/// A single-key mapping with a recognized tag.
fn tagged(tag: &str, value: &Value) -> Option<Result<Var, String>> {
    let result = match tag {
        "bytes" => text(value, tag).and_then(|encoded| {
            STANDARD
                .decode(encoded)
                .map(|bytes| Var::new_bytes(&bytes))
                .map_err(|e| format!("bytes is not valid base64: {}", e))
        }),
        "var" => text(value, tag).map(Var::new_context_var),
        "path" => text(value, tag).map(Var::new_path),
        "int2" => integers(value, 2, tag).map(|v| Var::int2(v[0], v[1])),
        "int3" => integers(value, 3, tag).map(|v| Var::int3(v[0] as i32, v[1] as i32, v[2] as i32)),
        "int4" => integers(value, 4, tag)
            .map(|v| Var::int4(v[0] as i32, v[1] as i32, v[2] as i32, v[3] as i32)),
        "float2" => numbers(value, 2, tag).map(|v| Var::float2(v[0], v[1])),
        "float3" => numbers(value, 3, tag).map(|v| Var::float3(v[0] as f32, v[1] as f32, v[2] as f32)),
        "float4" => numbers(value, 4, tag)
            .map(|v| Var::float4(v[0] as f32, v[1] as f32, v[2] as f32, v[3] as f32)),
        "color" => integers(value, 4, tag).and_then(|v| {
            let channel = |c: i64| u8::try_from(c).map_err(|_| format!("color channel {} out of range", c));
            Ok(Var::color(channel(v[0])?, channel(v[1])?, channel(v[2])?, channel(v[3])?))
        }),
        _ => return None,
    };
    Some(result)
}

/// Convert a plain (non-shard) config value.
pub fn to_var(value: &Value) -> Result<ClonedVar, String> {
    match value {
        Value::Null => Ok(ClonedVar::default()),
        Value::Bool(b) => Ok(ClonedVar::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(ClonedVar::from(i)),
            None => n
                .as_f64()
                .map(ClonedVar::from)
                .ok_or_else(|| format!("number {} is out of range", n)),
        },
        Value::String(s) => Ok(ClonedVar::from(s.as_str())),
        Value::Sequence(items) => {
            let converted = items.iter().map(to_var).collect::<Result<Vec<_>, _>>()?;
            let views: Vec<Var> = converted.iter().map(|item| *item.var()).collect();
            Ok(ClonedVar::adopt(Var::new_seq(&views)))
        }
        Value::Mapping(mapping) => {
            if mapping.len() == 1 {
                if let Some((Value::String(tag), inner)) = mapping.iter().next() {
                    if let Some(result) = tagged(tag, inner) {
                        return result.map(ClonedVar::adopt);
                    }
                }
            }
            let mut table = Var::new_table();
            for (key, item) in mapping {
                let entry = key
                    .as_str()
                    .ok_or_else(|| format!("table keys must be strings, found {:?}", key))
                    .and_then(|key| to_var(item).map(|item| (key, item)));
                match entry {
                    Ok((key, item)) => table_set(&mut table, key, item.var()),
                    Err(error) => {
                        destroy_var(&mut table);
                        return Err(error);
                    }
                }
            }
            Ok(ClonedVar::adopt(table))
        }
        Value::Tagged(tagged) => to_var(&tagged.value),
    }
}
