//! Configuration of the composition engine.
//!
//! The configuration is a plain value threaded from the problem factory
//! into every builder it owns. A default configuration is used when none
//! is given.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do with a restriction entry that extends past the end of the
/// manifold it restricts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RestrictionPolicy {
    /// Shorten the entry to the manifold's span.
    #[default]
    Clip,
    /// Fail with an invalid restriction error.
    Reject,
}

/// Configuration for composing functions over manifolds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapConfig {
    /// Handling of restriction entries overflowing their manifold.
    pub restriction_policy: RestrictionPolicy,
    /// Entries of assembled sparse derivatives whose magnitude does not
    /// exceed this value are dropped. Zero keeps every structural entry
    /// except exact zeros.
    pub sparse_tolerance: f64,
    /// Weight given to contributions registered without one.
    pub default_weight: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            restriction_policy: RestrictionPolicy::Clip,
            sparse_tolerance: 0.0,
            default_weight: 1.0,
        }
    }
}

/// Builder for creating a custom configuration.
pub struct MapConfigBuilder {
    config: MapConfig,
}

impl MapConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: MapConfig::default(),
        }
    }

    /// Set the restriction overflow policy.
    pub fn restriction_policy(mut self, policy: RestrictionPolicy) -> Self {
        self.config.restriction_policy = policy;
        self
    }

    /// Set the drop tolerance for assembled sparse derivatives.
    pub fn sparse_tolerance(mut self, tolerance: f64) -> Self {
        self.config.sparse_tolerance = tolerance;
        self
    }

    /// Set the weight of contributions registered without one.
    pub fn default_weight(mut self, weight: f64) -> Self {
        self.config.default_weight = weight;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MapConfig {
        self.config
    }
}

impl Default for MapConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
