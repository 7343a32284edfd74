//! Client configuration types.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Transport client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL.
    pub base_url: Url,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a configuration with the default 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or cannot serve as a
    /// base for endpoint paths.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(ConfigBuilder::new(base_url)?.build())
    }

    /// Creates a configuration builder.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn builder(base_url: impl AsRef<str>) -> Result<ConfigBuilder> {
        ConfigBuilder::new(base_url)
    }

    /// Resolves an endpoint path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL is invalid.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }
}

/// Builder for client configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    base_url: Url,
    request_timeout: Duration,
}

impl ConfigBuilder {
    /// Creates a new builder with the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(base_url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidConfig(format!(
                "base URL cannot be a base: {url}"
            )));
        }
        Ok(Self {
            base_url: url,
            request_timeout: Duration::from_secs(30),
        })
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            base_url: self.base_url,
            request_timeout: self.request_timeout,
        }
    }
}
