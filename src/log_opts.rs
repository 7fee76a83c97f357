//! Log option validation and publisher configuration.
//!
//! Hosts hand the driver a flat map of option name to value. The map is
//! validated before anything is allocated; a failing validation prevents
//! publisher construction entirely.

use std::collections::HashMap;

use crate::{Error, Result};

/// Fixed driver identifier, reported by [`Publisher::name`](crate::Publisher::name).
pub const DRIVER_NAME: &str = "zmq_logger";

/// Option naming the outbound endpoint address (required).
pub const ENDPOINT_ADDRESS: &str = "endpointAddress";

const KNOWN_OPTIONS: &[&str] = &[ENDPOINT_ADDRESS];

/// Validated publisher configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    // ---
    /// Endpoint the publisher connects to, e.g. `"tcp://collector:5555"`.
    pub endpoint_address: String,
}

impl PublisherConfig {
    /// Create a configuration for the given endpoint.
    ///
    /// Fails with [`Error::MissingOption`] when the address is empty.
    pub fn with_endpoint(endpoint_address: impl Into<String>) -> Result<Self> {
        let endpoint_address = endpoint_address.into();
        if endpoint_address.is_empty() {
            return Err(missing(ENDPOINT_ADDRESS));
        }
        Ok(Self { endpoint_address })
    }

    /// Build a configuration from host-supplied log options.
    ///
    /// See [`validate_log_opts`].
    pub fn from_log_opts(opts: &HashMap<String, String>) -> Result<Self> {
        validate_log_opts(opts)
    }
}

/// Validate host-supplied log options.
///
/// Unknown keys are rejected first; when several are present the
/// lexicographically smallest one is reported so the error is stable.
/// The endpoint address must then be present and non-empty.
pub fn validate_log_opts(opts: &HashMap<String, String>) -> Result<PublisherConfig> {
    // ---
    let unknown = opts
        .keys()
        .filter(|key| !KNOWN_OPTIONS.contains(&key.as_str()))
        .min();

    if let Some(option) = unknown {
        return Err(Error::UnknownOption {
            option: option.clone(),
            driver: DRIVER_NAME,
        });
    }

    match opts.get(ENDPOINT_ADDRESS) {
        Some(address) if !address.is_empty() => Ok(PublisherConfig {
            endpoint_address: address.clone(),
        }),
        _ => Err(missing(ENDPOINT_ADDRESS)),
    }
}

fn missing(option: &'static str) -> Error {
    Error::MissingOption {
        option,
        driver: DRIVER_NAME,
    }
}
