//! Parsing and validation of the declarative service descriptor (§6): a
//! human-authored YAML file with a `config:` block plus the URL mapping
//! and component-attachment lists. Parsed leniently per §9.3 — unknown
//! keys are ignored, and `http_port` accepts either a YAML string or an
//! integer.

use std::collections::HashMap;

use http::Method;
use serde::Deserialize;

/// The `config:` block. Every field besides `http_port` is read as a
/// plain string; absent fields default to empty, matching a
/// human-authored file that may only populate what a given deployment
/// needs (gRPC xor Thrift target, for instance).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default, deserialize_with = "string_or_int")]
    pub http_port: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub turbo_log_path: String,
    #[serde(default)]
    pub grpc_service_name: String,
    #[serde(default)]
    pub grpc_service_host: String,
    #[serde(default)]
    pub grpc_service_port: String,
    #[serde(default)]
    pub thrift_service_name: String,
    #[serde(default)]
    pub thrift_service_host: String,
    #[serde(default)]
    pub thrift_service_port: String,
    #[serde(default)]
    pub service_root_path: String,
}

fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(i64),
    }
    Ok(match Option::<StringOrInt>::deserialize(deserializer)? {
        Some(StringOrInt::String(s)) => s,
        Some(StringOrInt::Int(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Raw descriptor shape as it comes off the wire; `urlmapping` et al. are
/// lists of whitespace-separated directive lines (§6), kept as strings
/// here and parsed into typed records by [`Descriptor::parse`].
#[derive(Debug, Clone, Default, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    config: ServiceConfig,
    #[serde(default)]
    urlmapping: Vec<String>,
    #[serde(default)]
    interceptor: Vec<String>,
    #[serde(default)]
    preprocessor: Vec<String>,
    #[serde(default)]
    postprocessor: Vec<String>,
    #[serde(default)]
    hijacker: Vec<String>,
    #[serde(default)]
    convertor: Vec<String>,
    #[serde(default)]
    errorhandler: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UrlMapping {
    pub methods: Vec<Method>,
    pub path_pattern: String,
    pub rpc_method: String,
}

/// A `METHODS /path Name[,Name...]` attachment line, shared by the
/// interceptor/preprocessor/postprocessor/hijacker lists.
#[derive(Debug, Clone)]
pub struct AttachmentSpec {
    pub methods: Vec<Method>,
    pub path: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConvertorSpec {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    pub config: ServiceConfig,
    pub urlmapping: Vec<UrlMapping>,
    pub interceptor: Vec<AttachmentSpec>,
    pub preprocessor: Vec<AttachmentSpec>,
    pub postprocessor: Vec<AttachmentSpec>,
    pub hijacker: Vec<AttachmentSpec>,
    pub convertor: Vec<ConvertorSpec>,
    pub errorhandler: Option<String>,
}

impl Descriptor {
    pub fn parse(yaml: &str) -> anyhow::Result<Self> {
        let raw: RawDescriptor = serde_yaml::from_str(yaml)?;

        let urlmapping = raw
            .urlmapping
            .iter()
            .map(|line| parse_urlmapping(line))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let interceptor = raw
            .interceptor
            .iter()
            .map(|line| parse_attachment(line))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let preprocessor = raw
            .preprocessor
            .iter()
            .map(|line| parse_attachment(line))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let postprocessor = raw
            .postprocessor
            .iter()
            .map(|line| parse_attachment(line))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let hijacker = raw
            .hijacker
            .iter()
            .map(|line| parse_attachment(line))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let convertor = raw
            .convertor
            .iter()
            .map(|line| parse_convertor(line))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let descriptor = Descriptor {
            config: raw.config,
            urlmapping,
            interceptor,
            preprocessor,
            postprocessor,
            hijacker,
            convertor,
            errorhandler: raw.errorhandler,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Every referenced name must exist among the registered components,
    /// and every endpoint must carry an RPC method name (§4.7).
    pub fn validate_against(&self, known_names: &HashMap<String, ()>) -> anyhow::Result<()> {
        for spec in self
            .interceptor
            .iter()
            .chain(self.preprocessor.iter())
            .chain(self.postprocessor.iter())
            .chain(self.hijacker.iter())
        {
            for name in &spec.names {
                anyhow::ensure!(known_names.contains_key(name), "unknown component name: {name}");
            }
        }
        for c in &self.convertor {
            anyhow::ensure!(known_names.contains_key(&c.name), "unknown component name: {}", c.name);
        }
        if let Some(name) = &self.errorhandler {
            anyhow::ensure!(known_names.contains_key(name), "unknown component name: {name}");
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        for mapping in &self.urlmapping {
            anyhow::ensure!(!mapping.rpc_method.is_empty(), "urlmapping entry omits an RPC method name");
            anyhow::ensure!(!mapping.methods.is_empty(), "urlmapping entry omits an HTTP method");
        }
        Ok(())
    }
}

/// `*` denotes "all methods" (§3 Attachments) — the descriptor's
/// whitespace-separated line format has no way to spell an empty token.
fn parse_methods(token: &str) -> anyhow::Result<Vec<Method>> {
    if token.is_empty() || token == "*" {
        return Ok(Vec::new());
    }
    token
        .split(',')
        .map(|m| m.trim().parse::<Method>().map_err(|e| anyhow::anyhow!("invalid HTTP method {m:?}: {e}")))
        .collect()
}

fn parse_urlmapping(line: &str) -> anyhow::Result<UrlMapping> {
    let mut parts = line.split_whitespace();
    let methods_tok = parts.next().ok_or_else(|| anyhow::anyhow!("empty urlmapping line"))?;
    let path = parts.next().ok_or_else(|| anyhow::anyhow!("urlmapping missing path: {line}"))?;
    let rpc_method = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("urlmapping missing RPC method name: {line}"))?;
    Ok(UrlMapping {
        methods: parse_methods(methods_tok)?,
        path_pattern: path.to_string(),
        rpc_method: rpc_method.to_string(),
    })
}

fn parse_attachment(line: &str) -> anyhow::Result<AttachmentSpec> {
    let mut parts = line.split_whitespace();
    let methods_tok = parts.next().ok_or_else(|| anyhow::anyhow!("empty attachment line"))?;
    let path = parts.next().ok_or_else(|| anyhow::anyhow!("attachment missing path: {line}"))?;
    let names_tok = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("attachment missing component name: {line}"))?;
    Ok(AttachmentSpec {
        methods: parse_methods(methods_tok)?,
        path: path.to_string(),
        names: names_tok.split(',').map(|s| s.trim().to_string()).collect(),
    })
}

fn parse_convertor(line: &str) -> anyhow::Result<ConvertorSpec> {
    let mut parts = line.split_whitespace();
    let type_name = parts.next().ok_or_else(|| anyhow::anyhow!("empty convertor line"))?;
    let name = parts.next().ok_or_else(|| anyhow::anyhow!("convertor missing component name: {line}"))?;
    Ok(ConvertorSpec {
        type_name: type_name.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
config:
  http_port: 8080
  environment: development
  grpc_service_name: HelloService
  grpc_service_host: 127.0.0.1
  grpc_service_port: 50051
urlmapping:
  - "GET /hello/{your_name:[a-zA-Z0-9]+} SayHello"
  - "GET,POST /hello SayHello"
interceptor:
  - "GET / Test1Interceptor"
preprocessor:
  - "* /hello/{your_name:[a-zA-Z0-9]+} preProcessor"
errorhandler: errorHandler
"#;

    #[test]
    fn parses_recognized_keys() {
        let descriptor = Descriptor::parse(SAMPLE).unwrap();
        assert_eq!(descriptor.config.http_port, "8080");
        assert_eq!(descriptor.urlmapping.len(), 2);
        assert_eq!(descriptor.urlmapping[0].rpc_method, "SayHello");
        assert_eq!(descriptor.errorhandler.as_deref(), Some("errorHandler"));
    }

    #[test]
    fn http_port_accepts_string_form() {
        let yaml = "config:\n  http_port: \"9090\"\n";
        let descriptor = Descriptor::parse(yaml).unwrap();
        assert_eq!(descriptor.config.http_port, "9090");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let yaml = "config:\n  http_port: 80\n  totally_unknown: yes\nsomething_else: 1\n";
        assert!(Descriptor::parse(yaml).is_ok());
    }

    #[test]
    fn wildcard_methods_means_all() {
        let spec = parse_attachment("* /hello preProcessor").unwrap();
        assert!(spec.methods.is_empty());
        assert_eq!(spec.path, "/hello");
    }

    #[test]
    fn urlmapping_requires_rpc_method() {
        let yaml = "urlmapping:\n  - \"GET /hello\"\n";
        assert!(Descriptor::parse(yaml).is_err());
    }
}
