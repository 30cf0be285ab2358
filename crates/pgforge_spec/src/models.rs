//! Data models for generation requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fields of a generation request, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestField {
    PostgresVersion,
    InstanceType,
    NumReplicas,
    MaxConnections,
    SharedBuffers,
}

impl RequestField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestField::PostgresVersion => "postgres_version",
            RequestField::InstanceType => "instance_type",
            RequestField::NumReplicas => "num_replicas",
            RequestField::MaxConnections => "max_connections",
            RequestField::SharedBuffers => "shared_buffers",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            RequestField::PostgresVersion,
            RequestField::InstanceType,
            RequestField::NumReplicas,
            RequestField::MaxConnections,
            RequestField::SharedBuffers,
        ]
    }
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unvalidated request payload as received from a caller.
///
/// Every field is optional and numbers are signed so that missing fields and
/// negative counts reach the validator instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGenerationRequest {
    pub postgres_version: Option<String>,
    pub instance_type: Option<String>,
    pub num_replicas: Option<i64>,
    pub max_connections: Option<i64>,
    pub shared_buffers: Option<String>,
}

impl RawGenerationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_postgres_version(mut self, version: impl Into<String>) -> Self {
        self.postgres_version = Some(version.into());
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    pub fn with_num_replicas(mut self, num_replicas: i64) -> Self {
        self.num_replicas = Some(num_replicas);
        self
    }

    pub fn with_max_connections(mut self, max_connections: i64) -> Self {
        self.max_connections = Some(max_connections);
        self
    }

    pub fn with_shared_buffers(mut self, shared_buffers: impl Into<String>) -> Self {
        self.shared_buffers = Some(shared_buffers.into());
        self
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn overlay(self, other: RawGenerationRequest) -> Self {
        Self {
            postgres_version: other.postgres_version.or(self.postgres_version),
            instance_type: other.instance_type.or(self.instance_type),
            num_replicas: other.num_replicas.or(self.num_replicas),
            max_connections: other.max_connections.or(self.max_connections),
            shared_buffers: other.shared_buffers.or(self.shared_buffers),
        }
    }
}

/// A `major.minor` PostgreSQL version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PostgresVersion {
    major: u32,
    minor: u32,
    #[serde(rename = "version")]
    text: String,
}

impl PostgresVersion {
    pub(crate) fn new(major: u32, minor: u32, text: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            text: text.into(),
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Version as the caller wrote it, e.g. `14.10`.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Major release used for package names and cluster paths.
    ///
    /// From 10 onwards the first component is the major release; before that
    /// it was the first two (`9.6`).
    pub fn release(&self) -> String {
        if self.major >= 10 {
            self.major.to_string()
        } else {
            format!("{}.{}", self.major, self.minor)
        }
    }
}

impl fmt::Display for PostgresVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Supported EC2 instance sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceType {
    #[serde(rename = "t2.micro")]
    T2Micro,
    #[serde(rename = "t2.small")]
    T2Small,
    #[serde(rename = "t2.medium")]
    T2Medium,
    #[serde(rename = "t3.micro")]
    T3Micro,
    #[serde(rename = "t3.small")]
    T3Small,
    #[serde(rename = "t3.medium")]
    T3Medium,
    #[serde(rename = "m5.large")]
    M5Large,
    #[serde(rename = "m5.xlarge")]
    M5Xlarge,
    #[serde(rename = "m5.2xlarge")]
    M52xlarge,
}

impl InstanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::T2Micro => "t2.micro",
            InstanceType::T2Small => "t2.small",
            InstanceType::T2Medium => "t2.medium",
            InstanceType::T3Micro => "t3.micro",
            InstanceType::T3Small => "t3.small",
            InstanceType::T3Medium => "t3.medium",
            InstanceType::M5Large => "m5.large",
            InstanceType::M5Xlarge => "m5.xlarge",
            InstanceType::M52xlarge => "m5.2xlarge",
        }
    }

    /// Exact, case-sensitive lookup against the allow-list.
    pub fn from_id(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.as_str() == s)
    }

    pub fn all() -> Vec<Self> {
        vec![
            InstanceType::T2Micro,
            InstanceType::T2Small,
            InstanceType::T2Medium,
            InstanceType::T3Micro,
            InstanceType::T3Small,
            InstanceType::T3Medium,
            InstanceType::M5Large,
            InstanceType::M5Xlarge,
            InstanceType::M52xlarge,
        ]
    }

    /// Memory of the instance size in MiB.
    pub fn memory_mib(&self) -> u64 {
        match self {
            InstanceType::T2Micro | InstanceType::T3Micro => 1024,
            InstanceType::T2Small | InstanceType::T3Small => 2048,
            InstanceType::T2Medium | InstanceType::T3Medium => 4096,
            InstanceType::M5Large => 8192,
            InstanceType::M5Xlarge => 16384,
            InstanceType::M52xlarge => 32768,
        }
    }

    pub fn vcpus(&self) -> u32 {
        match self {
            InstanceType::T2Micro | InstanceType::T2Small => 1,
            InstanceType::T3Micro | InstanceType::T3Small => 2,
            InstanceType::T2Medium | InstanceType::T3Medium | InstanceType::M5Large => 2,
            InstanceType::M5Xlarge => 4,
            InstanceType::M52xlarge => 8,
        }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit suffix of a memory size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryUnit {
    #[serde(rename = "KB")]
    Kilobytes,
    #[serde(rename = "MB")]
    Megabytes,
    #[serde(rename = "GB")]
    Gigabytes,
}

impl MemoryUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryUnit::Kilobytes => "KB",
            MemoryUnit::Megabytes => "MB",
            MemoryUnit::Gigabytes => "GB",
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "KB" => Some(MemoryUnit::Kilobytes),
            "MB" => Some(MemoryUnit::Megabytes),
            "GB" => Some(MemoryUnit::Gigabytes),
            _ => None,
        }
    }

    /// Suffix as postgresql.conf spells it (units there are case-sensitive).
    pub fn postgres_suffix(&self) -> &'static str {
        match self {
            MemoryUnit::Kilobytes => "kB",
            MemoryUnit::Megabytes => "MB",
            MemoryUnit::Gigabytes => "GB",
        }
    }

    fn kib_factor(&self) -> u64 {
        match self {
            MemoryUnit::Kilobytes => 1,
            MemoryUnit::Megabytes => 1024,
            MemoryUnit::Gigabytes => 1024 * 1024,
        }
    }
}

/// A memory size such as `256MB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MemorySize {
    amount: u64,
    unit: MemoryUnit,
}

impl MemorySize {
    pub(crate) fn new(amount: u64, unit: MemoryUnit) -> Self {
        Self { amount, unit }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn unit(&self) -> MemoryUnit {
        self.unit
    }

    /// Size in KiB, `None` on overflow.
    pub fn to_kib(&self) -> Option<u64> {
        self.amount.checked_mul(self.unit.kib_factor())
    }

    /// Value as written into postgresql.conf, e.g. `256MB` or `128kB`.
    pub fn postgres_setting(&self) -> String {
        format!("{}{}", self.amount, self.unit.postgres_suffix())
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.as_str())
    }
}

/// A validated generation request.
///
/// Only [`crate::RequestValidator`] constructs this type, so every instance
/// satisfies the field constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    postgres_version: PostgresVersion,
    instance_type: InstanceType,
    num_replicas: u32,
    max_connections: u32,
    shared_buffers: MemorySize,
}

impl GenerationRequest {
    pub(crate) fn new(
        postgres_version: PostgresVersion,
        instance_type: InstanceType,
        num_replicas: u32,
        max_connections: u32,
        shared_buffers: MemorySize,
    ) -> Self {
        Self {
            postgres_version,
            instance_type,
            num_replicas,
            max_connections,
            shared_buffers,
        }
    }

    pub fn postgres_version(&self) -> &PostgresVersion {
        &self.postgres_version
    }

    pub fn instance_type(&self) -> InstanceType {
        self.instance_type
    }

    pub fn num_replicas(&self) -> u32 {
        self.num_replicas
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    pub fn shared_buffers(&self) -> MemorySize {
        self.shared_buffers
    }

    /// Primary plus replicas.
    pub fn node_count(&self) -> u32 {
        self.num_replicas + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_type_lookup_is_exact() {
        assert_eq!(InstanceType::from_id("t2.micro"), Some(InstanceType::T2Micro));
        assert_eq!(InstanceType::from_id("m5.2xlarge"), Some(InstanceType::M52xlarge));
        assert_eq!(InstanceType::from_id("T2.MICRO"), None);
        assert_eq!(InstanceType::from_id("t2.nano"), None);
    }

    #[test]
    fn test_instance_type_serde_names_match_ids() {
        for ty in InstanceType::all() {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn test_release_numbering() {
        assert_eq!(PostgresVersion::new(14, 10, "14.10").release(), "14");
        assert_eq!(PostgresVersion::new(9, 6, "9.6").release(), "9.6");
    }

    #[test]
    fn test_memory_size_postgres_setting() {
        assert_eq!(MemorySize::new(256, MemoryUnit::Megabytes).postgres_setting(), "256MB");
        assert_eq!(MemorySize::new(512, MemoryUnit::Kilobytes).postgres_setting(), "512kB");
        assert_eq!(MemorySize::new(512, MemoryUnit::Kilobytes).to_string(), "512KB");
        assert_eq!(MemorySize::new(2, MemoryUnit::Gigabytes).to_kib(), Some(2 * 1024 * 1024));
        assert_eq!(MemorySize::new(u64::MAX, MemoryUnit::Gigabytes).to_kib(), None);
    }

    #[test]
    fn test_overlay_prefers_later_values() {
        let file = RawGenerationRequest::new()
            .with_postgres_version("13.4")
            .with_num_replicas(1);
        let flags = RawGenerationRequest::new().with_num_replicas(3);

        let merged = file.overlay(flags);
        assert_eq!(merged.postgres_version.as_deref(), Some("13.4"));
        assert_eq!(merged.num_replicas, Some(3));
        assert_eq!(merged.instance_type, None);
    }
}
