use std::ops::Deref;

use serde::{Deserialize, Deserializer};

use crate::{types::Type, values::Value};

/// Function parameter from an interface document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub type_: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, type_: Type) -> Self {
        Param {
            name: name.into(),
            type_,
        }
    }
}

#[derive(Deserialize)]
struct ParamEntry {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    type_: String,
    components: Option<Vec<Param>>,
}

impl<'de> Deserialize<'de> for Param {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entry = ParamEntry::deserialize(deserializer)?;

        // JSON ABIs spell tuples as `tuple`, `tuple[]`, ... with the member
        // types listed under `components`.
        let type_ = match (entry.type_.strip_prefix("tuple"), entry.components) {
            (Some(suffix), Some(components)) => {
                let members = components
                    .iter()
                    .map(|c| c.type_.to_string())
                    .collect::<Vec<_>>()
                    .join(",");

                format!("({}){}", members, suffix).parse()
            }
            (Some(_), None) => {
                return Err(serde::de::Error::custom(format!(
                    "tuple parameter `{}` has no components",
                    entry.name
                )))
            }
            (None, _) => entry.type_.parse(),
        }
        .map_err(serde::de::Error::custom)?;

        Ok(Param {
            name: entry.name,
            type_,
        })
    }
}

/// Decoded values paired with the parameters they were decoded for, in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedParams(Vec<(Param, Value)>);

impl DecodedParams {
    /// Looks a value up by parameter name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(param, _)| param.name == name)
            .map(|(_, value)| value)
    }

    pub fn values(&self) -> Vec<&Value> {
        self.0.iter().map(|(_, value)| value).collect()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0.into_iter().map(|(_, value)| value).collect()
    }
}

impl From<Vec<(Param, Value)>> for DecodedParams {
    fn from(v: Vec<(Param, Value)>) -> Self {
        Self(v)
    }
}

impl Deref for DecodedParams {
    type Target = [(Param, Value)];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
