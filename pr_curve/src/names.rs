use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::CurveError;

/// Account login to human label lookup, supplied by the caller.
///
/// Logins absent from the table resolve to themselves.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DisplayNames {
    table: HashMap<String, String>,
}

impl DisplayNames {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Decode a JSON object of `{"login": "Label", ...}`.
    pub fn from_json_str(text: &str) -> Result<Self, CurveError> {
        let table: HashMap<String, String> =
            serde_json::from_str(text).map_err(|e| CurveError::NameTable(e.to_string()))?;
        Ok(Self { table })
    }

    pub fn resolve<'a>(&'a self, login: &'a str) -> &'a str {
        self.table.get(login).map(String::as_str).unwrap_or(login)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
