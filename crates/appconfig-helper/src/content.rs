//! Content-type dispatch for configuration payloads.
//!
//! The service declares a MIME type next to every payload. Known structured
//! and text types are parsed; anything else is handed to the caller as the
//! raw bytes it arrived as.

use serde_json::Value;

use crate::error::RefresherError;

/// Content types with dedicated handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// `application/x-yaml` and its common aliases.
    Yaml,
    /// `application/json`.
    Json,
    /// `text/plain`.
    Text,
    /// Any other declared type, kept verbatim.
    Other(String),
}

impl ContentType {
    /// Classifies a declared MIME type, ignoring case and parameters such as `charset`.
    pub fn parse(declared: &str) -> Self {
        let essence = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/x-yaml" | "application/yaml" | "text/yaml" | "text/x-yaml" => {
                ContentType::Yaml
            }
            "application/json" => ContentType::Json,
            "text/plain" => ContentType::Text,
            _ => ContentType::Other(declared.to_string()),
        }
    }
}

/// Parsed form of a configuration payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    /// Mapping/sequence tree decoded from JSON or YAML.
    Structured(Value),
    /// UTF-8 text.
    Text(String),
    /// Unprocessed payload for content types without a decoder.
    Bytes(Vec<u8>),
}

impl ParsedValue {
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            ParsedValue::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ParsedValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Looks up `key` in a structured mapping; `None` for any other shape.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_structured().and_then(|value| value.get(key))
    }
}

/// Decoder set used by the refresher.
///
/// YAML support depends on the `yaml` feature; the dispatch consults
/// `yaml_available` instead of assuming the decoder exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentDecoder {
    yaml_available: bool,
}

impl Default for ContentDecoder {
    fn default() -> Self {
        Self {
            yaml_available: cfg!(feature = "yaml"),
        }
    }
}

impl ContentDecoder {
    /// Builds a decoder with YAML switched on or off. Requesting YAML in a
    /// build without the `yaml` feature still leaves it unavailable.
    pub fn with_yaml(enabled: bool) -> Self {
        Self {
            yaml_available: enabled && cfg!(feature = "yaml"),
        }
    }

    pub fn yaml_available(&self) -> bool {
        self.yaml_available
    }

    /// Decodes `payload` according to its declared `content_type`.
    pub fn decode(&self, content_type: &str, payload: &[u8]) -> Result<ParsedValue, RefresherError> {
        match ContentType::parse(content_type) {
            ContentType::Yaml => {
                if !self.yaml_available {
                    return Err(RefresherError::MissingDependency(format!(
                        "received {content_type} configuration but YAML support is not available; \
                         enable the `yaml` feature"
                    )));
                }
                parse_yaml(content_type, payload).map(ParsedValue::Structured)
            }
            ContentType::Json => serde_json::from_slice::<Value>(payload)
                .map(ParsedValue::Structured)
                .map_err(|err| RefresherError::Decode {
                    content_type: content_type.to_string(),
                    message: err.to_string(),
                }),
            ContentType::Text => String::from_utf8(payload.to_vec())
                .map(ParsedValue::Text)
                .map_err(|err| RefresherError::Decode {
                    content_type: content_type.to_string(),
                    message: err.to_string(),
                }),
            ContentType::Other(_) => Ok(ParsedValue::Bytes(payload.to_vec())),
        }
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(content_type: &str, payload: &[u8]) -> Result<Value, RefresherError> {
    let decode_error = |message: String| RefresherError::Decode {
        content_type: content_type.to_string(),
        message,
    };
    let document = serde_yaml::from_slice::<serde_yaml::Value>(payload).map_err(|err| {
        let mut message = "unable to parse YAML configuration data".to_string();
        if let Some(location) = err.location() {
            message.push_str(&format!(
                " at line {} column {}",
                location.line(),
                location.column()
            ));
        }
        decode_error(message)
    })?;
    yaml_to_json(document).map_err(|reason| {
        decode_error(format!("unsupported YAML configuration data: {reason}"))
    })
}

/// Converts a YAML document into the JSON tree exposed to callers.
///
/// Scalar mapping keys become strings and tags are dropped. Values JSON
/// cannot hold (`.inf`, `.nan`, collection keys) are rejected.
#[cfg(feature = "yaml")]
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    let converted = match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(flag) => Value::Bool(flag),
        Yaml::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::from(int)
            } else if let Some(uint) = number.as_u64() {
                Value::from(uint)
            } else {
                number
                    .as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("non-finite number {number}"))?
            }
        }
        Yaml::String(text) => Value::String(text),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = serde_json::Map::with_capacity(mapping.len());
            for (key, item) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(item)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    };
    Ok(converted)
}

#[cfg(feature = "yaml")]
fn yaml_key(key: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(text) => Ok(text),
        Yaml::Number(number) => Ok(number.to_string()),
        Yaml::Bool(flag) => Ok(flag.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => {
            Err("mapping keys must be scalars".to_string())
        }
    }
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(content_type: &str, _payload: &[u8]) -> Result<Value, RefresherError> {
    Err(RefresherError::MissingDependency(format!(
        "received {content_type} configuration but this build has no YAML decoder"
    )))
}
