//! Playbook settings that are not part of a request.

use regex::Regex;
use serde::{Deserialize, Serialize};

use pgforge_spec::{Cidr, DEFAULT_CLUSTER_CIDR};

use crate::error::{PlaybookError, PlaybookResult};

/// How replica nodes relate to the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationMode {
    /// Replicas are cloned from the primary and follow it as hot standbys.
    #[default]
    Streaming,
    /// Replicas are installed and tuned but left independent.
    Standalone,
}

impl ReplicationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplicationMode::Streaming => "streaming",
            ReplicationMode::Standalone => "standalone",
        }
    }
}

impl std::fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Playbook rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybookSettings {
    pub replication: ReplicationMode,
    /// Value of `listen_addresses` in postgresql.conf.
    pub listen_addresses: String,
    /// Role replicas connect as.
    pub replication_user: String,
    /// Network allowed to open replication connections in pg_hba.conf. Must
    /// cover the network the nodes are provisioned in.
    pub replication_cidr: String,
}

impl Default for PlaybookSettings {
    fn default() -> Self {
        Self {
            replication: ReplicationMode::default(),
            listen_addresses: "*".to_string(),
            replication_user: "replicator".to_string(),
            replication_cidr: DEFAULT_CLUSTER_CIDR.to_string(),
        }
    }
}

impl PlaybookSettings {
    pub fn with_replication(mut self, mode: ReplicationMode) -> Self {
        self.replication = mode;
        self
    }

    pub fn with_listen_addresses(mut self, addresses: impl Into<String>) -> Self {
        self.listen_addresses = addresses.into();
        self
    }

    pub fn with_replication_user(mut self, user: impl Into<String>) -> Self {
        self.replication_user = user.into();
        self
    }

    pub fn with_replication_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.replication_cidr = cidr.into();
        self
    }

    /// Check values that end up in postgresql.conf and pg_hba.conf, where
    /// YAML quoting does not protect them.
    pub fn check(&self) -> PlaybookResult<()> {
        let listen = &self.listen_addresses;
        if listen.trim().is_empty()
            || listen.chars().any(|c| c == '\'' || c == '\\' || c.is_control())
        {
            return Err(PlaybookError::InvalidSettings(format!(
                "listen_addresses '{}' must be non-empty without quotes or control characters",
                listen
            )));
        }

        let identifier = Regex::new(r"^[a-z_][a-z0-9_]{0,62}$")
            .map_err(|e| PlaybookError::InvalidSettings(e.to_string()))?;
        if !identifier.is_match(&self.replication_user) {
            return Err(PlaybookError::InvalidSettings(format!(
                "replication_user '{}' must be a lowercase PostgreSQL identifier",
                self.replication_user
            )));
        }

        self.replication_network()?;

        Ok(())
    }

    /// The pg_hba.conf replication range as a parsed block.
    pub fn replication_network(&self) -> PlaybookResult<Cidr> {
        self.replication_cidr
            .parse()
            .map_err(|e| PlaybookError::InvalidSettings(format!("replication_cidr: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_check() {
        assert!(PlaybookSettings::default().check().is_ok());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(ReplicationMode::Streaming.to_string(), "streaming");
        assert_eq!(ReplicationMode::Standalone.as_str(), "standalone");
    }

    #[test]
    fn test_replication_cidr() {
        let network = PlaybookSettings::default().replication_network().unwrap();
        assert_eq!(network.to_string(), DEFAULT_CLUSTER_CIDR);

        for bad in ["10.0.0.0", "10.0.0.0/33", "everyone/8"] {
            let settings = PlaybookSettings::default().with_replication_cidr(bad);
            assert!(settings.check().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_rejects_injection_into_conf_files() {
        let listen = PlaybookSettings::default().with_listen_addresses("*'\nfsync = off");
        assert!(listen.check().is_err());

        let user = PlaybookSettings::default().with_replication_user("rep all 0.0.0.0/0 trust");
        assert!(user.check().is_err());
    }
}
