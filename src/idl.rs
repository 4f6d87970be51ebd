//! Description types for an RPC method's argument layout.
//!
//! The concrete Protocol Buffers/Thrift parser and code generator that
//! produce a dispatch "switcher" are external collaborators (§1); this
//! module only carries the shape the Parameter Resolver needs to know to
//! bind HTTP sources onto a method's arguments — field names, their scalar
//! or struct-typed nature, and the struct's own type name for Converter
//! lookup.

use serde::{Deserialize, Serialize};

/// Scalar field kinds the Parameter Resolver knows how to parse from a
/// raw HTTP-sourced string (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlScalar {
    Int32,
    Int64,
    Float64,
    Bool,
    String,
}

/// A field's type: either a scalar the resolver parses itself, or a named
/// struct whose value comes from a registered Converter or a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdlFieldType {
    Scalar(IdlScalar),
    Struct { type_name: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    pub ty: IdlFieldType,
}

impl IdlField {
    pub fn scalar(name: impl Into<String>, ty: IdlScalar) -> Self {
        IdlField {
            name: name.into(),
            ty: IdlFieldType::Scalar(ty),
        }
    }

    pub fn strct(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        IdlField {
            name: name.into(),
            ty: IdlFieldType::Struct {
                type_name: type_name.into(),
            },
        }
    }
}

/// The argument layout for one RPC method, as an IDL-generated switcher
/// would describe it to the core.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdlMethod {
    pub name: String,
    pub args: Vec<IdlField>,
}

/// The subset of RPC kind validation the external CLI generator relies on
/// (§6): `create`/`generate` accept only these two transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcKind {
    Grpc,
    Thrift,
}

impl std::str::FromStr for RpcKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grpc" => Ok(RpcKind::Grpc),
            "thrift" => Ok(RpcKind::Thrift),
            other => Err(format!("invalid value for -r, should be grpc or thrift, got {other}")),
        }
    }
}

/// CamelCase validation for a generated service name, mirroring the
/// external generator's `create <package> <ServiceName>` rule (§6).
pub fn is_camel_case(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_kind_parses_known_values() {
        assert_eq!("grpc".parse::<RpcKind>().unwrap(), RpcKind::Grpc);
        assert_eq!("thrift".parse::<RpcKind>().unwrap(), RpcKind::Thrift);
        assert!("soap".parse::<RpcKind>().is_err());
    }

    #[test]
    fn camel_case_validation() {
        assert!(is_camel_case("HelloService"));
        assert!(!is_camel_case("helloService"));
        assert!(!is_camel_case("Hello_Service"));
        assert!(!is_camel_case(""));
    }
}
