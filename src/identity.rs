//! Routing identity attached to every published message.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Value used when the environment supplies no tenant or service id.
pub const DEFAULT_IDENTITY: &str = "default";

/// Environment key holding the tenant id.
pub const TENANT_ID_KEY: &str = "TENANT_ID";

/// Environment key holding the service id.
pub const SERVICE_ID_KEY: &str = "SERVICE_ID";

/// Identifier of the log source (typically a container id).
///
/// Rendered in front of every payload as `"<source_id>: "`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(Arc<str>);

impl SourceId {
    /// Generate a short random source id.
    ///
    /// Uses the first 12 hex digits of a v4 UUID, the same width container
    /// runtimes use for abbreviated container ids.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(Arc::from(&simple[..12]))
    }

    /// Borrow the source id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable per-publisher routing metadata.
///
/// Derived once when a publisher is built and never re-derived. The tenant
/// and service ids become the first two frames of every message; the source
/// id prefixes the payload frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    tenant_id: Arc<str>,
    service_id: Arc<str>,
    source_id: SourceId,
}

impl IdentityContext {
    /// Build an identity from explicit values.
    ///
    /// Empty tenant or service ids fall back to [`DEFAULT_IDENTITY`].
    pub fn new(
        tenant_id: impl AsRef<str>,
        service_id: impl AsRef<str>,
        source_id: impl Into<SourceId>,
    ) -> Self {
        // ---
        Self {
            tenant_id: or_default(tenant_id.as_ref()),
            service_id: or_default(service_id.as_ref()),
            source_id: source_id.into(),
        }
    }

    /// Derive an identity from `KEY=VALUE` environment entries.
    ///
    /// Only [`TENANT_ID_KEY`] and [`SERVICE_ID_KEY`] are consumed. Entries
    /// without `=` are skipped. Each entry splits on its first `=`, so values
    /// may themselves contain `=`. When a key repeats, the last entry wins.
    pub fn from_env<I, S>(source_id: impl Into<SourceId>, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // ---
        let mut vars = HashMap::new();
        for pair in env {
            if let Some((key, value)) = pair.as_ref().split_once('=') {
                vars.insert(key.to_string(), value.to_string());
            }
        }

        let tenant = vars.get(TENANT_ID_KEY).map(String::as_str).unwrap_or("");
        let service = vars.get(SERVICE_ID_KEY).map(String::as_str).unwrap_or("");

        Self::new(tenant, service, source_id)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }
}

fn or_default(value: &str) -> Arc<str> {
    if value.is_empty() {
        Arc::from(DEFAULT_IDENTITY)
    } else {
        Arc::from(value)
    }
}
