//! Publisher builder.
//!
//! Hosts construct publishers explicitly through this builder and hold the
//! returned handle; there is no ambient driver registry.

use std::collections::HashMap;

use crate::{
    // ---
    connect,
    log_debug,
    log_opts::{validate_log_opts, ENDPOINT_ADDRESS},
    ConnectionPtr,
    IdentityContext,
    Publisher,
    Result,
    SourceId,
};

/// Builder for creating publisher instances.
///
/// Construction order is fixed:
/// 1. validate log options (nothing is allocated on failure)
/// 2. derive the identity from the environment
/// 3. connect to the endpoint, unless a connection was supplied
///
/// # Examples
///
/// ```no_run
/// use logbus::PublisherBuilder;
///
/// # async fn example() -> logbus::Result<()> {
/// let publisher = PublisherBuilder::new()
///     .endpoint("tcp://collector:5555")
///     .source_id("4f2a9c1b7e3d")
///     .environment(["TENANT_ID=acme", "SERVICE_ID=web"])
///     .build()
///     .await?;
///
/// publisher.publish(b"hello", false).await?;
/// publisher.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct PublisherBuilder {
    log_opts: HashMap<String, String>,
    source_id: Option<SourceId>,
    environment: Vec<String>,
    connection: Option<ConnectionPtr>,
}

impl PublisherBuilder {
    /// Create a new publisher builder.
    pub fn new() -> Self {
        Self {
            log_opts: HashMap::new(),
            source_id: None,
            environment: Vec::new(),
            connection: None,
        }
    }

    /// Add host-supplied log options (validated at build time).
    pub fn log_opts(mut self, opts: HashMap<String, String>) -> Self {
        self.log_opts.extend(opts);
        self
    }

    /// Add a single log option.
    pub fn log_opt(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.log_opts.insert(key.into(), value.into());
        self
    }

    /// Set the endpoint address (shorthand for the `endpointAddress` option).
    pub fn endpoint(self, address: impl Into<String>) -> Self {
        self.log_opt(ENDPOINT_ADDRESS, address)
    }

    /// Set the source id (typically the container id).
    ///
    /// Default: a generated 12-hex-character id.
    pub fn source_id(mut self, id: impl Into<SourceId>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    /// Set the `KEY=VALUE` environment the identity is derived from.
    pub fn environment<I, S>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environment = env.into_iter().map(Into::into).collect();
        self
    }

    /// Use an already-open connection instead of connecting at build time.
    ///
    /// Options are still validated.
    pub fn connection(mut self, connection: ConnectionPtr) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Build the publisher (consumes self).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if options are unknown or the endpoint
    /// is missing, or a connection error if connecting fails.
    pub async fn build(self) -> Result<Publisher> {
        // ---
        let config = validate_log_opts(&self.log_opts)?;

        let source_id = self.source_id.unwrap_or_else(SourceId::generate);
        let identity = IdentityContext::from_env(source_id, &self.environment);

        let connection = match self.connection {
            Some(connection) => connection,
            None => connect(&config.endpoint_address).await?,
        };

        log_debug!(
            "{}: publisher ready for tenant={} service={} source={}",
            config.endpoint_address,
            identity.tenant_id(),
            identity.service_id(),
            identity.source_id()
        );

        Ok(Publisher::new(connection, identity))
    }
}

impl Default for PublisherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
