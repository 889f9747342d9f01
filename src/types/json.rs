// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! JSON rendering of values for reports and the command line.
//!
//! Scalars map to JSON scalars, vectors to arrays, tables to objects. Kinds
//! with no JSON counterpart become tagged objects such as
//! `{"bytes": "<base64>"}` or `{"var": "name"}`, matching the config syntax.

use crate::types::{Var, VarKind};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Value};

fn float(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

pub fn to_json(var: &Var) -> Value {
    match var.kind {
        VarKind::None | VarKind::Any | VarKind::EndOfBlittableTypes => Value::Null,
        VarKind::Bool => Value::Bool(var.as_bool()),
        VarKind::Int => json!(var.as_int()),
        VarKind::Int2 => json!(var.as_int2()),
        VarKind::Int3 => json!(var.as_int3()),
        VarKind::Int4 => json!(var.as_int4()),
        VarKind::Float => float(var.as_float()),
        VarKind::Float2 => Value::Array(var.as_float2().iter().map(|v| float(*v)).collect()),
        VarKind::Float3 => Value::Array(var.as_float3().iter().map(|v| float(*v as f64)).collect()),
        VarKind::Float4 => Value::Array(var.as_float4().iter().map(|v| float(*v as f64)).collect()),
        VarKind::Color => json!({ "color": var.as_color() }),
        VarKind::Enum => {
            let e = var.as_enum();
            json!({ "enum": e.value, "vendor_id": e.vendor_id, "type_id": e.type_id })
        }
        VarKind::String => Value::String(var.as_str().to_string()),
        VarKind::Path => json!({ "path": var.as_str() }),
        VarKind::ContextVar => json!({ "var": var.as_str() }),
        VarKind::Bytes => json!({ "bytes": STANDARD.encode(var.as_bytes()) }),
        VarKind::Image => {
            let image = var.as_image();
            json!({ "image": { "width": image.width, "height": image.height, "channels": image.channels } })
        }
        VarKind::Seq => Value::Array(var.as_seq().iter().map(to_json).collect()),
        VarKind::Array => Value::Array(var.array_elements().iter().map(to_json).collect()),
        VarKind::Table => {
            let map: Map<String, Value> = var
                .as_table()
                .iter()
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect();
            Value::Object(map)
        }
        VarKind::Wire | VarKind::ShardRef | VarKind::Object => {
            json!({ "reference": var.kind.name() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::table::table_set;
    use crate::types::ClonedVar;

    #[test]
    fn scalars_render_as_plain_json() {
        assert_eq!(to_json(&Var::from(5i64)), json!(5));
        assert_eq!(to_json(&Var::from(true)), json!(true));
        assert_eq!(to_json(&Var::from(1.5)), json!(1.5));
        assert_eq!(to_json(&Var::NONE), Value::Null);
        assert_eq!(to_json(&Var::from(f64::NAN)), Value::Null);
        assert_eq!(to_json(&Var::int2(1, -2)), json!([1, -2]));
    }

    #[test]
    fn containers_render_recursively() {
        let text = ClonedVar::from("hi");
        let seq = ClonedVar::adopt(Var::new_seq(&[Var::from(1i64), *text.var()]));
        assert_eq!(to_json(&seq), json!([1, "hi"]));

        let mut raw = Var::new_table();
        table_set(&mut raw, "speed", &Var::from(2.0));
        table_set(&mut raw, "items", seq.var());
        let table = ClonedVar::adopt(raw);
        assert_eq!(to_json(&table), json!({ "items": [1, "hi"], "speed": 2.0 }));
    }

    #[test]
    fn bytes_render_as_base64() {
        let bytes = ClonedVar::adopt(Var::new_bytes(&[1, 2, 3]));
        assert_eq!(to_json(&bytes), json!({ "bytes": "AQID" }));
    }
}
