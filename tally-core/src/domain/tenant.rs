//! Tenant identifier

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// The organization every query is scoped to.
///
/// Construct through [`TenantId::resolve`]; an empty or missing value is a
/// `MissingTenantContext` error, never a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn resolve(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(Self(id.to_string())),
            _ => Err(Error::MissingTenantContext),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
