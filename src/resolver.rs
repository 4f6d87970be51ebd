//! Parameter Resolver (§4.3): assembles a typed RPC argument vector from
//! the request's path variables, query string, interceptor-set context,
//! and JSON body, honoring the fixed source precedence and the per-type
//! Converter override.

use serde_json::Value;

use crate::context::GatewayRequest;
use crate::error::GatewayError;
use crate::idl::{IdlField, IdlFieldType, IdlScalar};
use crate::registry::ComponentRegistry;

/// Resolve every argument of an RPC method's field layout against one
/// request, in declared field order.
pub fn resolve_args(
    fields: &[IdlField],
    req: &GatewayRequest,
    registry: &ComponentRegistry,
) -> Result<Vec<Value>, GatewayError> {
    fields.iter().map(|f| resolve_field(f, req, registry)).collect()
}

fn resolve_field(field: &IdlField, req: &GatewayRequest, registry: &ComponentRegistry) -> Result<Value, GatewayError> {
    match &field.ty {
        IdlFieldType::Struct { type_name } => resolve_struct_field(field, type_name, req, registry),
        IdlFieldType::Scalar(scalar) => resolve_scalar_field(field, *scalar, req),
    }
}

fn resolve_struct_field(
    field: &IdlField,
    type_name: &str,
    req: &GatewayRequest,
    registry: &ComponentRegistry,
) -> Result<Value, GatewayError> {
    // Source 1: a type-keyed Converter supersedes everything else.
    if let Some(converter) = registry.converter_for(type_name) {
        return Ok(converter.convert(req));
    }

    // Source 5: a top-level JSON key matching the field name, or else the
    // whole body bound to the struct. `req.body` is only ever populated
    // for a POST/PUT with an `application/json` content type (§6) — the
    // HTTP layer gates it before the resolver ever sees it.
    if let Some(Value::Object(map)) = &req.body {
        if let Some(v) = map.iter().find(|(k, _)| k.eq_ignore_ascii_case(&field.name)) {
            return Ok(v.1.clone());
        }
        return Ok(Value::Object(map.clone()));
    }

    // Source 6: zero value.
    Ok(Value::Object(Default::default()))
}

fn resolve_scalar_field(field: &IdlField, scalar: IdlScalar, req: &GatewayRequest) -> Result<Value, GatewayError> {
    let raw = req
        .path_param(&field.name)
        .or_else(|| req.query_param(&field.name))
        .or_else(|| req.context_value(&field.name))
        .map(str::to_string)
        .or_else(|| {
            req.body.as_ref().and_then(|body| match body {
                Value::Object(map) => map
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(&field.name))
                    .map(|(_, v)| json_value_as_raw(v)),
                _ => None,
            })
        });

    let Some(raw) = raw else {
        return Ok(zero_value(scalar));
    };

    parse_scalar(&field.name, scalar, &raw)
}

fn json_value_as_raw(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn zero_value(scalar: IdlScalar) -> Value {
    match scalar {
        IdlScalar::Int32 | IdlScalar::Int64 => Value::from(0_i64),
        IdlScalar::Float64 => Value::from(0.0_f64),
        IdlScalar::Bool => Value::from(false),
        IdlScalar::String => Value::from(""),
    }
}

fn parse_scalar(field_name: &str, scalar: IdlScalar, raw: &str) -> Result<Value, GatewayError> {
    match scalar {
        IdlScalar::String => Ok(Value::from(raw)),
        IdlScalar::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::from(true)),
            "false" | "0" => Ok(Value::from(false)),
            _ => Err(GatewayError::binding(format!(
                "field {field_name}: {raw:?} is not a valid boolean"
            ))),
        },
        IdlScalar::Int32 => raw
            .parse::<i32>()
            .map(Value::from)
            .map_err(|_| GatewayError::binding(format!("field {field_name}: {raw:?} is not a valid int32"))),
        IdlScalar::Int64 => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| GatewayError::binding(format!("field {field_name}: {raw:?} is not a valid int64"))),
        IdlScalar::Float64 => raw
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| GatewayError::binding(format!("field {field_name}: {raw:?} is not a valid float"))),
    }
}
