//! Typed view of an OpenAPI document.
//!
//! Only the parts the gateway integration cares about are typed: the path map,
//! the operations under each path and the `x-amazon-apigateway-integration`
//! extension on each operation. Other fields are carried through as loaded.
//! `paths` is always written back, and a null path item is written as `{}`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::intrinsic::Sub;

pub const INTEGRATION_EXTENSION: &str = "x-amazon-apigateway-integration";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiDescription {
    #[serde(flatten)]
    pub other: Mapping,
    pub paths: BTreeMap<String, PathItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathItem {
    /// Path level keys that are not operations (`summary`, `parameters`, ...).
    #[serde(flatten)]
    pub other: Mapping,
    #[serde(flatten)]
    pub operations: BTreeMap<Method, Operation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Operation {
    #[serde(flatten)]
    pub fields: Mapping,
    #[serde(
        rename = "x-amazon-apigateway-integration",
        skip_serializing_if = "Option::is_none"
    )]
    pub integration: Option<Integration>,
}

/// The integration attached to an operation.
///
/// Anything that is not exactly a Lambda proxy integration (a hand written
/// `http` integration, a `!Sub` tagged or `Fn::Join` uri) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Integration {
    Lambda(IntegrationExtension),
    Opaque(Value),
}

/// How API Gateway calls the backend for an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntegrationExtension {
    pub uri: Sub,
    pub passthrough_behavior: String,
    pub http_method: String,
    #[serde(rename = "type")]
    pub integration_type: String,
}

impl Integration {
    fn from_value(value: Value) -> Self {
        match serde_yaml::from_value(value.clone()) {
            Ok(extension) => Integration::Lambda(extension),
            Err(_) => Integration::Opaque(value),
        }
    }

    pub fn as_lambda(&self) -> Option<&IntegrationExtension> {
        match self {
            Integration::Lambda(extension) => Some(extension),
            Integration::Opaque(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
            Method::Post => "post",
            Method::Delete => "delete",
            Method::Options => "options",
            Method::Head => "head",
            Method::Patch => "patch",
            Method::Trace => "trace",
        }
    }

    /// Path item keys are case sensitive in OpenAPI, so `GET` is not a method.
    pub fn from_key(key: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|method| method.as_str() == key)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

impl ApiDescription {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read OpenAPI document {}", path.display()))?;

        Self::from_yaml(&source)
            .with_context(|| format!("failed to load OpenAPI document {}", path.display()))
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(source).context("malformed YAML")?;

        Self::from_value(document)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn from_value(document: Value) -> Result<Self> {
        let mut other = match document {
            Value::Null => Mapping::new(),
            Value::Mapping(mapping) => mapping,
            value => bail!("document must be a mapping, found {}", kind(&value)),
        };

        let paths = match other.shift_remove("paths") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(Value::Mapping(paths)) => paths
                .into_iter()
                .map(|(key, item)| -> Result<(String, PathItem)> {
                    let path = match key {
                        Value::String(path) => path,
                        key => bail!("path keys must be strings, found {}", kind(&key)),
                    };
                    let item = PathItem::from_value(&path, item)?;
                    Ok((path, item))
                })
                .collect::<Result<_>>()?,
            Some(value) => bail!("`paths` must be a mapping, found {}", kind(&value)),
        };

        Ok(Self { other, paths })
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, Method, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations
                .iter()
                .map(move |(method, operation)| (path.as_str(), *method, operation))
        })
    }

    pub fn operations_mut(&mut self) -> impl Iterator<Item = (&str, Method, &mut Operation)> {
        self.paths.iter_mut().flat_map(|(path, item)| {
            item.operations
                .iter_mut()
                .map(move |(method, operation)| (path.as_str(), *method, operation))
        })
    }
}

impl<'de> Deserialize<'de> for ApiDescription {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let document = Value::deserialize(deserializer)?;
        Self::from_value(document).map_err(|e| serde::de::Error::custom(format!("{:#}", e)))
    }
}

impl PathItem {
    fn from_value(path: &str, value: Value) -> Result<Self> {
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            value => bail!(
                "path `{}` must be a mapping of operations, found {}",
                path,
                kind(&value)
            ),
        };

        let mut item = Self::default();
        for (key, value) in mapping {
            let method = key.as_str().and_then(Method::from_key);
            match method {
                Some(method) => {
                    let operation = Operation::from_value(path, method, value)?;
                    item.operations.insert(method, operation);
                }
                None => {
                    item.other.insert(key, value);
                }
            }
        }

        Ok(item)
    }
}

impl Operation {
    fn from_value(path: &str, method: Method, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Mapping(mut fields) => {
                let integration = fields
                    .shift_remove(INTEGRATION_EXTENSION)
                    .map(Integration::from_value);
                Ok(Self {
                    fields,
                    integration,
                })
            }
            value => bail!(
                "operation `{} {}` must be a mapping, found {}",
                method,
                path,
                kind(&value)
            ),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
