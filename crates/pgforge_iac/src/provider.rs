//! AWS provider and deployment settings.

use serde::{Deserialize, Serialize};

use pgforge_spec::{Cidr, DEFAULT_CLUSTER_CIDR};

use crate::error::{IacError, IacResult};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_AMI_ID: &str = "ami-12345678";
pub const DEFAULT_DEPLOYMENT_NAME: &str = "postgres";
pub const DEFAULT_AWS_PROVIDER_VERSION: &str = "~> 5.0";
pub const DEFAULT_ADMIN_CIDR: &str = "0.0.0.0/0";

/// Settings that shape the rendered Terraform but are not part of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfraSettings {
    /// AWS region for the provider block.
    pub region: String,
    /// Default for the `ami_id` variable.
    pub ami_id: String,
    /// Default for the `deployment_name` variable, prefixed to every Name tag.
    pub deployment_name: String,
    /// Version constraint for the hashicorp/aws provider.
    pub aws_provider_version: String,
    /// Address range of the generated VPC and subnet. PostgreSQL traffic is
    /// only admitted from inside it.
    pub network_cidr: String,
    /// Where SSH connections are admitted from.
    pub admin_cidr: String,
}

impl Default for InfraSettings {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            ami_id: DEFAULT_AMI_ID.to_string(),
            deployment_name: DEFAULT_DEPLOYMENT_NAME.to_string(),
            aws_provider_version: DEFAULT_AWS_PROVIDER_VERSION.to_string(),
            network_cidr: DEFAULT_CLUSTER_CIDR.to_string(),
            admin_cidr: DEFAULT_ADMIN_CIDR.to_string(),
        }
    }
}

impl InfraSettings {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_ami_id(mut self, ami_id: impl Into<String>) -> Self {
        self.ami_id = ami_id.into();
        self
    }

    pub fn with_deployment_name(mut self, name: impl Into<String>) -> Self {
        self.deployment_name = name.into();
        self
    }

    pub fn with_aws_provider_version(mut self, version: impl Into<String>) -> Self {
        self.aws_provider_version = version.into();
        self
    }

    pub fn with_network_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.network_cidr = cidr.into();
        self
    }

    pub fn with_admin_cidr(mut self, cidr: impl Into<String>) -> Self {
        self.admin_cidr = cidr.into();
        self
    }

    /// The cluster network as a parsed block.
    pub fn network(&self) -> IacResult<Cidr> {
        let network: Cidr = self
            .network_cidr
            .parse()
            .map_err(|e| IacError::InvalidSettings(format!("network_cidr: {}", e)))?;
        // AWS accepts IPv4 VPC blocks between /16 and /28.
        if !network.addr().is_ipv4() || !(16..=28).contains(&network.prefix()) {
            return Err(IacError::InvalidSettings(format!(
                "network_cidr '{}' must be an IPv4 block between /16 and /28",
                self.network_cidr
            )));
        }
        Ok(network)
    }

    /// Check the settings before any rendering happens.
    pub fn check(&self) -> IacResult<()> {
        for (name, value) in [
            ("region", &self.region),
            ("ami_id", &self.ami_id),
            ("aws_provider_version", &self.aws_provider_version),
        ] {
            if value.trim().is_empty() {
                return Err(IacError::InvalidSettings(format!("{} cannot be empty", name)));
            }
        }

        let name = &self.deployment_name;
        let valid_name = !name.is_empty()
            && name.len() <= 48
            && name.starts_with(|c: char| c.is_ascii_lowercase())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid_name {
            return Err(IacError::InvalidSettings(format!(
                "deployment_name '{}' must start with a lowercase letter and contain only \
                 lowercase letters, digits and '-' (max 48 characters)",
                name
            )));
        }

        self.network()?;
        self.admin_cidr
            .parse::<Cidr>()
            .map_err(|e| IacError::InvalidSettings(format!("admin_cidr: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_check() {
        assert!(InfraSettings::default().check().is_ok());
    }

    #[test]
    fn test_deployment_name_rules() {
        for bad in ["", "Postgres", "1db", "pg_cluster", "pg cluster"] {
            let settings = InfraSettings::default().with_deployment_name(bad);
            assert!(settings.check().is_err(), "accepted {:?}", bad);
        }
        let settings = InfraSettings::default().with_deployment_name("orders-db-2");
        assert!(settings.check().is_ok());
    }

    #[test]
    fn test_network_rules() {
        assert_eq!(InfraSettings::default().network().unwrap().to_string(), "10.0.0.0/16");
        for bad in ["10.0.0.0/8", "10.0.0.0/29", "fd00::/64", "10.0.0.0"] {
            let settings = InfraSettings::default().with_network_cidr(bad);
            assert!(settings.check().is_err(), "accepted {:?}", bad);
        }
        let settings = InfraSettings::default().with_admin_cidr("203.0.113.0/24");
        assert!(settings.check().is_ok());
        assert!(InfraSettings::default().with_admin_cidr("anywhere").check().is_err());
    }

    #[test]
    fn test_empty_region_is_rejected() {
        let settings = InfraSettings::default().with_region(" ");
        assert!(matches!(settings.check(), Err(IacError::InvalidSettings(_))));
    }
}
