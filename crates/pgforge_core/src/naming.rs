//! Artifact file naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp layout embedded in artifact names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// The two artifacts produced by one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Terraform descriptor.
    Infra,
    /// Ansible playbook.
    Config,
}

impl ArtifactKind {
    pub fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::Infra => "main",
            ArtifactKind::Config => "playbook",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Infra => "tf",
            ArtifactKind::Config => "yml",
        }
    }
}

/// Naming settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingSettings {
    /// Append a random suffix shared by both files of one generation.
    pub unique_suffix: bool,
}

/// Filenames for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactNames {
    pub infra: String,
    pub config: String,
}

/// Derives artifact filenames from a generation timestamp.
///
/// Names are `main_<YYYYMMDDHHMMSS>.tf` and `playbook_<YYYYMMDDHHMMSS>.yml`.
/// Two generations within the same second collide unless the unique suffix
/// is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactNamer {
    settings: NamingSettings,
}

impl ArtifactNamer {
    pub fn new(settings: NamingSettings) -> Self {
        Self { settings }
    }

    /// Timestamp component of a name.
    pub fn timestamp(at: DateTime<Utc>) -> String {
        at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Name one artifact. Never adds a suffix.
    pub fn name(&self, kind: ArtifactKind, at: DateTime<Utc>) -> String {
        compose(kind, at, None)
    }

    /// Name both artifacts of one generation from the same instant.
    pub fn name_pair(&self, at: DateTime<Utc>) -> ArtifactNames {
        let suffix = self
            .settings
            .unique_suffix
            .then(|| Uuid::new_v4().simple().to_string()[..8].to_string());

        ArtifactNames {
            infra: compose(ArtifactKind::Infra, at, suffix.as_deref()),
            config: compose(ArtifactKind::Config, at, suffix.as_deref()),
        }
    }
}

fn compose(kind: ArtifactKind, at: DateTime<Utc>, suffix: Option<&str>) -> String {
    let stamp = ArtifactNamer::timestamp(at);
    match suffix {
        Some(suffix) => format!("{}_{}_{}.{}", kind.stem(), stamp, suffix, kind.extension()),
        None => format!("{}_{}.{}", kind.stem(), stamp, kind.extension()),
    }
}
