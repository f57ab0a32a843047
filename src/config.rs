//! Configuration for the cache facade

use crate::error::{CacheError, Result};
use crate::key::TenantScope;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time-to-live: 24 hours
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Application name used when neither a group nor a name is configured
pub const DEFAULT_APP_NAME: &str = "ouroboros";

/// Configuration for the cache facade
///
/// The group defaults to the slugified application name, so two apps sharing
/// one backend land in separate namespaces unless told otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Explicit group/namespace; falls back to the slugified `app_name`
    pub group_name: Option<String>,

    /// Application name, used to derive the default group
    pub app_name: String,

    /// Default time-to-live for cached values
    pub default_ttl: Duration,

    /// Whether keys are scoped per tenant
    pub multi_tenant: bool,

    /// Tenant used by the facade when `multi_tenant` is on
    pub tenant: TenantScope,

    /// Treat empty cached payloads (`""`, `0`, and falsy JSON in the typed
    /// layer) as a miss and recompute
    pub treat_empty_as_miss: bool,

    /// TTL jitter factor (0.0 - 1.0)
    /// Adds random variation so entries written together don't expire together
    pub ttl_jitter: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            group_name: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            multi_tenant: false,
            tenant: TenantScope::Global,
            treat_empty_as_miss: true,
            ttl_jitter: 0.0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from `OBJECT_CACHE_*` environment variables
    ///
    /// A `.env` file in the working directory is honoured. Recognised variables:
    /// `OBJECT_CACHE_GROUP`, `OBJECT_CACHE_APP_NAME`, `OBJECT_CACHE_TTL_SECONDS`,
    /// `OBJECT_CACHE_EXPIRE_HOURS`, `OBJECT_CACHE_MULTI_TENANT`,
    /// `OBJECT_CACHE_TENANT_ID`, `OBJECT_CACHE_TREAT_EMPTY_AS_MISS`,
    /// `OBJECT_CACHE_TTL_JITTER`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(group) = lookup("OBJECT_CACHE_GROUP").filter(|g| !g.trim().is_empty()) {
            builder = builder.group_name(group);
        }
        if let Some(name) = lookup("OBJECT_CACHE_APP_NAME") {
            builder = builder.app_name(name);
        }

        // Seconds win over hours when both are set
        if let Some(secs) = lookup("OBJECT_CACHE_TTL_SECONDS") {
            builder = builder.default_ttl(Duration::from_secs(parse_var(
                "OBJECT_CACHE_TTL_SECONDS",
                &secs,
            )?));
        } else if let Some(hours) = lookup("OBJECT_CACHE_EXPIRE_HOURS") {
            let hours: u64 = parse_var("OBJECT_CACHE_EXPIRE_HOURS", &hours)?;
            builder = builder.default_ttl(Duration::from_secs(hours.saturating_mul(3600)));
        }

        if let Some(flag) = lookup("OBJECT_CACHE_MULTI_TENANT") {
            builder = builder.multi_tenant(parse_bool("OBJECT_CACHE_MULTI_TENANT", &flag)?);
        }
        if let Some(id) = lookup("OBJECT_CACHE_TENANT_ID") {
            builder = builder.tenant(TenantScope::Tenant(parse_var("OBJECT_CACHE_TENANT_ID", &id)?));
        }
        if let Some(flag) = lookup("OBJECT_CACHE_TREAT_EMPTY_AS_MISS") {
            builder = builder
                .treat_empty_as_miss(parse_bool("OBJECT_CACHE_TREAT_EMPTY_AS_MISS", &flag)?);
        }
        if let Some(jitter) = lookup("OBJECT_CACHE_TTL_JITTER") {
            builder = builder.ttl_jitter(parse_var("OBJECT_CACHE_TTL_JITTER", &jitter)?);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(CacheError::ConfigError(
                "default_ttl must be greater than 0".to_string(),
            ));
        }

        if self.ttl_jitter < 0.0 || self.ttl_jitter > 1.0 {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.group().is_empty() {
            return Err(CacheError::ConfigError(
                "group name resolves to an empty string".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolved group: the explicit group, else the slugified app name
    pub fn group(&self) -> String {
        match &self.group_name {
            Some(group) if !group.trim().is_empty() => group.trim().to_string(),
            _ => slug::slugify(&self.app_name),
        }
    }

    /// Tenant scope keys are built with; always global in single-tenant mode
    pub fn effective_tenant(&self) -> TenantScope {
        if self.multi_tenant {
            self.tenant
        } else {
            TenantScope::Global
        }
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self, base: Duration) -> Duration {
        if self.ttl_jitter == 0.0 {
            return base;
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        // Jitter on a near-maximal TTL can overflow; saturate like entry expiry does
        Duration::try_from_secs_f64(final_secs).unwrap_or(Duration::MAX)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| CacheError::ConfigError(format!("{}={:?}: {}", name, raw, e)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CacheError::ConfigError(format!(
            "{}={:?}: expected a boolean",
            name, other
        ))),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    group_name: Option<String>,
    app_name: Option<String>,
    default_ttl: Option<Duration>,
    multi_tenant: Option<bool>,
    tenant: Option<TenantScope>,
    treat_empty_as_miss: Option<bool>,
    ttl_jitter: Option<f64>,
}

impl CacheConfigBuilder {
    /// Set an explicit group/namespace
    pub fn group_name(mut self, group: impl Into<String>) -> Self {
        self.group_name = Some(group.into());
        self
    }

    /// Set the application name the default group derives from
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set default TTL for cached values
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Enable or disable per-tenant key scoping
    pub fn multi_tenant(mut self, enable: bool) -> Self {
        self.multi_tenant = Some(enable);
        self
    }

    /// Set the tenant the facade scopes keys to
    pub fn tenant(mut self, tenant: TenantScope) -> Self {
        self.tenant = Some(tenant);
        self
    }

    /// Enable or disable the empty-as-miss policy
    pub fn treat_empty_as_miss(mut self, enable: bool) -> Self {
        self.treat_empty_as_miss = Some(enable);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            group_name: self.group_name.or(defaults.group_name),
            app_name: self.app_name.unwrap_or(defaults.app_name),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            multi_tenant: self.multi_tenant.unwrap_or(defaults.multi_tenant),
            tenant: self.tenant.unwrap_or(defaults.tenant),
            treat_empty_as_miss: self
                .treat_empty_as_miss
                .unwrap_or(defaults.treat_empty_as_miss),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Short-lived values (5 minutes) with jitter
    pub fn short_lived() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            ttl_jitter: 0.15,
            ..Default::default()
        }
    }

    /// Multi-tenant configuration scoped to one tenant
    pub fn multi_tenant_for(tenant_id: u64) -> Self {
        Self {
            multi_tenant: true,
            tenant: TenantScope::Tenant(tenant_id),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(86_400));
        assert!(config.treat_empty_as_miss);
        assert!(!config.multi_tenant);
        assert_eq!(config.group(), "ouroboros");
    }

    #[test]
    fn test_group_falls_back_to_slugified_app_name() {
        let config = CacheConfig::builder().app_name("My Fancy Plugin!").build();
        assert_eq!(config.group(), "my-fancy-plugin");

        let config = CacheConfig::builder()
            .app_name("My Fancy Plugin")
            .group_name("custom")
            .build();
        assert_eq!(config.group(), "custom");
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::default().validate().is_ok());

        let mut invalid = CacheConfig::default();
        invalid.default_ttl = Duration::ZERO;
        assert!(invalid.validate().is_err());

        let mut invalid = CacheConfig::default();
        invalid.ttl_jitter = 1.5;
        assert!(invalid.validate().is_err());

        let invalid = CacheConfig::builder().app_name("!!!").build();
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_effective_tenant() {
        let single = CacheConfig::builder()
            .tenant(TenantScope::Tenant(7))
            .build();
        assert_eq!(single.effective_tenant(), TenantScope::Global);

        let multi = CacheConfig::multi_tenant_for(7);
        assert_eq!(multi.effective_tenant(), TenantScope::Tenant(7));
    }

    #[test]
    fn test_from_lookup() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("OBJECT_CACHE_APP_NAME", "Site Kit"),
            ("OBJECT_CACHE_EXPIRE_HOURS", "2"),
            ("OBJECT_CACHE_MULTI_TENANT", "true"),
            ("OBJECT_CACHE_TENANT_ID", "12"),
            ("OBJECT_CACHE_TREAT_EMPTY_AS_MISS", "off"),
        ]))
        .unwrap();

        assert_eq!(config.group(), "site-kit");
        assert_eq!(config.default_ttl, Duration::from_secs(7200));
        assert_eq!(config.effective_tenant(), TenantScope::Tenant(12));
        assert!(!config.treat_empty_as_miss);
    }

    #[test]
    fn test_from_lookup_seconds_override_hours() {
        let config = CacheConfig::from_lookup(lookup_from(&[
            ("OBJECT_CACHE_TTL_SECONDS", "90"),
            ("OBJECT_CACHE_EXPIRE_HOURS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.default_ttl, Duration::from_secs(90));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = CacheConfig::from_lookup(lookup_from(&[("OBJECT_CACHE_TTL_SECONDS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::ConfigError(_)));

        let err = CacheConfig::from_lookup(lookup_from(&[("OBJECT_CACHE_TTL_SECONDS", "0")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::ConfigError(_)));

        let err = CacheConfig::from_lookup(lookup_from(&[("OBJECT_CACHE_MULTI_TENANT", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::ConfigError(_)));
    }

    #[test]
    fn test_ttl_with_jitter() {
        let config = CacheConfig {
            ttl_jitter: 0.1,
            ..Default::default()
        };

        let base = Duration::from_secs(3600);
        let ttl = config.ttl_with_jitter(base);
        assert!(ttl.as_secs_f64() >= 3600.0 - 360.0);
        assert!(ttl.as_secs_f64() <= 3600.0 + 360.0);

        let no_jitter = CacheConfig::default();
        assert_eq!(no_jitter.ttl_with_jitter(base), base);
    }

    #[test]
    fn test_ttl_with_jitter_saturates_huge_ttl() {
        let config = CacheConfig {
            ttl_jitter: 1.0,
            ..Default::default()
        };

        for _ in 0..32 {
            let ttl = config.ttl_with_jitter(Duration::MAX);
            assert!(ttl >= Duration::from_secs(1));
        }
    }
}
