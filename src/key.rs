//! Key namespacing: logical key + group + tenant -> fully-qualified key
//!
//! A [`FullyQualifiedKey`] can only be produced by [`build_key`], so every
//! backend address has passed validation and carries its tenant scope.
//!
//! # Encoding
//!
//! ```text
//! {len(group)}:{group}/{len(key)}:{key}            single tenant
//! {len(group)}:{group}/{len(key)}:{key}#{tenant}   multi tenant
//! ```
//!
//! Length prefixes make the encoding injective: a group or key containing
//! `/`, `:` or `#` can never be confused with a different split.

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenantScope {
    /// No tenant suffix
    #[default]
    Global,
    /// Numeric tenant, e.g. a site id in a multi-site install
    Tenant(u64),
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantScope::Global => write!(f, "global"),
            TenantScope::Tenant(id) => write!(f, "tenant:{}", id),
        }
    }
}

/// The namespaced, tenant-scoped string used to address the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullyQualifiedKey(String);

impl FullyQualifiedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullyQualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FullyQualifiedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the fully-qualified key for a logical key in a group
///
/// Pass [`TenantScope::Global`] in single-tenant mode; callers holding a
/// [`crate::CacheConfig`] should use its `effective_tenant()`.
pub fn build_key(logical_key: &str, group: &str, tenant: TenantScope) -> Result<FullyQualifiedKey> {
    validate_part("logical key", logical_key)?;
    validate_part("group", group)?;

    let mut key = format!(
        "{}:{}/{}:{}",
        group.len(),
        group,
        logical_key.len(),
        logical_key
    );
    if let TenantScope::Tenant(id) = tenant {
        key.push('#');
        key.push_str(&id.to_string());
    }

    Ok(FullyQualifiedKey(key))
}

fn validate_part(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CacheError::InvalidKey(format!("{} is empty", what)));
    }
    if value.chars().any(char::is_control) {
        return Err(CacheError::InvalidKey(format!(
            "{} contains control characters",
            what
        )));
    }
    Ok(())
}
