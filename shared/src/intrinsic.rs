//! CloudFormation intrinsic functions used by the generated template.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const PARTITION: &str = "${AWS::Partition}";
pub const REGION: &str = "${AWS::Region}";
pub const ACCOUNT_ID: &str = "${AWS::AccountId}";
pub const URL_SUFFIX: &str = "${AWS::URLSuffix}";

/// Wraps a reference (`MyLambda.Arn`, `AWS::Region`) as a `Fn::Sub` placeholder.
pub fn placeholder(reference: &str) -> String {
    format!("${{{}}}", reference)
}

/// A string which may contain `${...}` placeholders.
///
/// Serialises as `{"Fn::Sub": "..."}` when it has placeholders and as a plain
/// string otherwise, so fully resolved values stay readable in the template.
/// Both forms deserialise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Sub(String);

impl Sub {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_deferred(&self) -> bool {
        self.0.contains("${")
    }
}

impl fmt::Display for Sub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Sub {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Sub {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for Sub {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_deferred() {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry("Fn::Sub", &self.0)?;
            map.end()
        } else {
            serializer.serialize_str(&self.0)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubRepr {
    Literal(String),
    Intrinsic {
        #[serde(rename = "Fn::Sub")]
        template: String,
    },
}

impl<'de> Deserialize<'de> for Sub {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match SubRepr::deserialize(deserializer)? {
            SubRepr::Literal(value) | SubRepr::Intrinsic { template: value } => value,
        };

        Ok(Self(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    #[serde(rename = "Ref")]
    pub logical_id: String,
}

impl Ref {
    pub fn new(logical_id: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetAtt {
    #[serde(rename = "Fn::GetAtt")]
    pub target: [String; 2],
}

impl GetAtt {
    pub fn new(logical_id: &str, attribute: &str) -> Self {
        Self {
            target: [logical_id.to_string(), attribute.to_string()],
        }
    }
}
