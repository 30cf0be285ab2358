//! Configurable bounds applied by the validator.

use serde::{Deserialize, Serialize};

use crate::error::{SpecError, SpecResult};

pub const DEFAULT_MAX_REPLICAS: u32 = 10;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10_000;

/// Hard upper bound on replicas; renderers refuse anything above it.
pub const REPLICA_CEILING: u32 = 255;

/// Inclusive numeric bounds for request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationLimits {
    pub max_replicas: u32,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_replicas: DEFAULT_MAX_REPLICAS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl ValidationLimits {
    pub fn with_max_replicas(mut self, max_replicas: u32) -> Self {
        self.max_replicas = max_replicas;
        self
    }

    pub fn with_connection_range(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    /// Reject limits that no request could satisfy.
    pub fn check(&self) -> SpecResult<()> {
        if self.max_replicas > REPLICA_CEILING {
            return Err(SpecError::InvalidLimits(format!(
                "max_replicas ({}) exceeds the ceiling of {}",
                self.max_replicas, REPLICA_CEILING
            )));
        }
        if self.min_connections == 0 {
            return Err(SpecError::InvalidLimits(
                "min_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(SpecError::InvalidLimits(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }
}
