//! Endpoint template parsing and url resolution.
//!
//! A template is a url or url fragment with `{name}` placeholders, e.g.
//! `users/{id}`. Templates containing `http` are treated as absolute and used
//! verbatim; everything else is appended to the configured base url.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BaseUrlProvider;
use crate::error::ApiError;

static PARAMETER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*?\}").expect("Invalid parameter regex"));

/// Shortest accepted placeholder token, braces included.
const MIN_TOKEN_LEN: usize = 3;

/// Named values substituted into an endpoint template.
///
/// Also used as the JSON request body when a list query is sent by POST, so
/// values are kept as JSON rather than plain strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text substituted for `name`; absent and `null` values render empty.
    pub fn render(&self, name: &str) -> String {
        match self.0.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A placeholder discovered in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Byte offset of the `{` in the original template.
    pub index: usize,
}

/// Output of `resolve`: the final url and the placeholders it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub url: String,
    pub parameters: Vec<Parameter>,
}

/// Returns the placeholders of `template` in order of appearance.
pub fn parse_parameters(template: &str) -> Result<Vec<Parameter>, ApiError> {
    PARAMETER_RE
        .find_iter(template)
        .map(|m| {
            let token = m.as_str();
            if token.len() < MIN_TOKEN_LEN {
                return Err(ApiError::InvalidTemplate {
                    endpoint: template.to_string(),
                    token: token.to_string(),
                });
            }
            Ok(Parameter {
                name: token[1..token.len() - 1].to_string(),
                index: m.start(),
            })
        })
        .collect()
}

/// Whether `template` is used as-is rather than appended to the base url.
pub fn is_absolute(template: &str) -> bool {
    template.contains("http")
}

/// Builds the request url for `template`.
///
/// Each placeholder replaces the first remaining occurrence of its token, so
/// a name used twice is substituted twice with the same value.
pub fn resolve(
    template: &str,
    parameters: Option<&Parameters>,
    base: Option<&dyn BaseUrlProvider>,
) -> Result<ResolvedRequest, ApiError> {
    if template.is_empty() {
        return Err(ApiError::MissingArgument("endpoint"));
    }

    let found = parse_parameters(template)?;

    let mut url = if is_absolute(template) {
        template.to_string()
    } else {
        let base = base.ok_or_else(|| ApiError::MissingEndpoint(template.to_string()))?;
        format!("{}{template}", base.base_url()?)
    };

    let empty = Parameters::default();
    let values = parameters.unwrap_or(&empty);
    for parameter in &found {
        let token = format!("{{{}}}", parameter.name);
        url = url.replacen(&token, &values.render(&parameter.name), 1);
    }

    Ok(ResolvedRequest {
        url,
        parameters: found,
    })
}
