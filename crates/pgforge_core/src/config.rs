//! Generator configuration, read from `pgforge.toml`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use pgforge_iac::InfraSettings;
use pgforge_playbook::{PlaybookSettings, ReplicationMode};
use pgforge_spec::ValidationLimits;

use crate::error::{CoreError, CoreResult};
use crate::naming::NamingSettings;

/// Everything that shapes generation apart from the request itself.
///
/// Every section is optional:
///
/// ```toml
/// [limits]
/// max_replicas = 5
///
/// [infra]
/// region = "eu-west-1"
///
/// [playbook]
/// replication = "standalone"
///
/// [naming]
/// unique_suffix = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub limits: ValidationLimits,
    pub infra: InfraSettings,
    pub playbook: PlaybookSettings,
    pub naming: NamingSettings,
}

impl GeneratorConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Checks that span sections: with streaming replication the pg_hba.conf
    /// range has to cover the network the nodes are provisioned in.
    pub fn check(&self) -> CoreResult<()> {
        if self.playbook.replication != ReplicationMode::Streaming {
            return Ok(());
        }

        let network = self.infra.network()?;
        let allowed = self.playbook.replication_network()?;
        if !allowed.contains(&network) {
            return Err(CoreError::Config(format!(
                "playbook.replication_cidr {} does not cover infra.network_cidr {}; \
                 replicas could not reach the primary",
                allowed, network
            )));
        }
        Ok(())
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_infra(mut self, infra: InfraSettings) -> Self {
        self.infra = infra;
        self
    }

    pub fn with_playbook(mut self, playbook: PlaybookSettings) -> Self {
        self.playbook = playbook;
        self
    }

    pub fn with_naming(mut self, naming: NamingSettings) -> Self {
        self.naming = naming;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(GeneratorConfig::from_toml_str("").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = GeneratorConfig::from_toml_str(
            r#"
[limits]
max_replicas = 3

[playbook]
replication = "standalone"

[naming]
unique_suffix = true
"#,
        )
        .unwrap();

        assert_eq!(config.limits.max_replicas, 3);
        assert_eq!(config.limits.max_connections, 10_000);
        assert_eq!(config.playbook.replication, ReplicationMode::Standalone);
        assert_eq!(config.infra.region, "us-east-1");
        assert!(config.naming.unique_suffix);
    }

    #[test]
    fn test_unknown_section_is_an_error() {
        let err = GeneratorConfig::from_toml_str("[limit]\nmax_replicas = 3\n").unwrap_err();
        assert!(matches!(err, CoreError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[infra]\nregion = \"eu-central-1\"").unwrap();

        let config = GeneratorConfig::load(file.path()).unwrap();
        assert_eq!(config.infra.region, "eu-central-1");
    }

    #[test]
    fn test_defaults_agree_on_the_cluster_network() {
        assert!(GeneratorConfig::default().check().is_ok());
    }

    #[test]
    fn test_replication_range_must_cover_the_network() {
        let config = GeneratorConfig::from_toml_str(
            r#"
[infra]
network_cidr = "10.20.0.0/16"

[playbook]
replication_cidr = "10.0.0.0/16"
"#,
        )
        .unwrap();
        assert!(matches!(config.check(), Err(CoreError::Config(_))));

        let widened = config.clone().with_playbook(
            PlaybookSettings::default().with_replication_cidr("10.0.0.0/8"),
        );
        assert!(widened.check().is_ok());

        let standalone = config
            .with_playbook(PlaybookSettings::default().with_replication(ReplicationMode::Standalone));
        assert!(standalone.check().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = GeneratorConfig::load("/nonexistent/pgforge.toml").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
