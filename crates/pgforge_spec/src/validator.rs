//! Request validation.

use regex::Regex;
use tracing::debug;

use crate::error::{FieldError, SpecError, SpecResult, ValidationErrors, ValidationReason};
use crate::limits::ValidationLimits;
use crate::models::{
    GenerationRequest, InstanceType, MemorySize, MemoryUnit, PostgresVersion,
    RawGenerationRequest, RequestField,
};

/// Smallest shared_buffers value PostgreSQL will start with, in KiB.
const MIN_SHARED_BUFFERS_KIB: u64 = 128;

/// Validator turning raw payloads into [`GenerationRequest`]s.
///
/// Every field is checked; failures are aggregated with one entry per
/// offending field.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    limits: ValidationLimits,
    version_pattern: Regex,
    memory_pattern: Regex,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::with_checked_limits(ValidationLimits::default())
    }
}

impl RequestValidator {
    /// Create a validator, rejecting unsatisfiable limits.
    pub fn new(limits: ValidationLimits) -> SpecResult<Self> {
        limits.check()?;
        Ok(Self::with_checked_limits(limits))
    }

    fn with_checked_limits(limits: ValidationLimits) -> Self {
        Self {
            limits,
            version_pattern: Regex::new(r"^([0-9]+)\.([0-9]+)$").expect("version pattern compiles"),
            memory_pattern: Regex::new(r"^([0-9]+)(KB|MB|GB)$").expect("memory pattern compiles"),
        }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Validate a raw request.
    pub fn validate(&self, raw: &RawGenerationRequest) -> SpecResult<GenerationRequest> {
        let mut errors = ValidationErrors::new();

        let version = collect(
            &mut errors,
            RequestField::PostgresVersion,
            self.check_version(raw.postgres_version.as_deref()),
        );
        let instance_type = collect(
            &mut errors,
            RequestField::InstanceType,
            self.check_instance_type(raw.instance_type.as_deref()),
        );
        let num_replicas = collect(
            &mut errors,
            RequestField::NumReplicas,
            check_range(raw.num_replicas, 0, self.limits.max_replicas),
        );
        let max_connections = collect(
            &mut errors,
            RequestField::MaxConnections,
            check_range(
                raw.max_connections,
                self.limits.min_connections,
                self.limits.max_connections,
            ),
        );
        let shared_buffers = collect(
            &mut errors,
            RequestField::SharedBuffers,
            self.check_memory(raw.shared_buffers.as_deref()),
        );

        match (version, instance_type, num_replicas, max_connections, shared_buffers) {
            (Some(v), Some(t), Some(r), Some(c), Some(b)) if errors.is_empty() => {
                Ok(GenerationRequest::new(v, t, r, c, b))
            }
            _ => {
                debug!("Rejected request: {}", errors);
                Err(SpecError::Validation(errors))
            }
        }
    }

    /// Non-fatal observations about a valid request.
    pub fn advisories(&self, request: &GenerationRequest) -> Vec<String> {
        let mut notes = Vec::new();
        let instance = request.instance_type();
        let instance_kib = instance.memory_mib() * 1024;

        if let Some(buffers_kib) = request.shared_buffers().to_kib() {
            if buffers_kib < MIN_SHARED_BUFFERS_KIB {
                notes.push(format!(
                    "shared_buffers {} is below PostgreSQL's minimum of 128kB",
                    request.shared_buffers()
                ));
            } else if buffers_kib >= instance_kib {
                notes.push(format!(
                    "shared_buffers {} does not fit in the {} MiB of a {}",
                    request.shared_buffers(),
                    instance.memory_mib(),
                    instance
                ));
            } else if buffers_kib * 5 > instance_kib * 2 {
                notes.push(format!(
                    "shared_buffers {} exceeds 40% of the memory of a {}",
                    request.shared_buffers(),
                    instance
                ));
            }
        }

        if request.postgres_version().major() < 10 {
            notes.push(format!(
                "PostgreSQL {} is past end of life",
                request.postgres_version()
            ));
        }

        notes
    }

    fn check_version(&self, value: Option<&str>) -> Result<PostgresVersion, ValidationReason> {
        let value = value.ok_or(ValidationReason::Missing)?;
        let caps = self.version_pattern.captures(value).ok_or_else(|| {
            ValidationReason::InvalidFormat(format!(
                "'{}' is not a MAJOR.MINOR version such as 14.10",
                value
            ))
        })?;

        let component = |i: usize| {
            caps[i].parse::<u32>().map_err(|_| {
                ValidationReason::InvalidFormat(format!("version component '{}' is too large", &caps[i]))
            })
        };

        Ok(PostgresVersion::new(component(1)?, component(2)?, value))
    }

    fn check_instance_type(&self, value: Option<&str>) -> Result<InstanceType, ValidationReason> {
        let value = value.ok_or(ValidationReason::Missing)?;
        InstanceType::from_id(value).ok_or_else(|| {
            let valid: Vec<&str> = InstanceType::all().iter().map(|t| t.as_str()).collect();
            ValidationReason::UnsupportedValue(format!(
                "'{}' is not an allowed instance type; valid types are: {}",
                value,
                valid.join(", ")
            ))
        })
    }

    fn check_memory(&self, value: Option<&str>) -> Result<MemorySize, ValidationReason> {
        let value = value.ok_or(ValidationReason::Missing)?;
        let caps = self.memory_pattern.captures(value).ok_or_else(|| {
            ValidationReason::InvalidFormat(format!(
                "'{}' must be an integer followed by KB, MB or GB, such as 256MB",
                value
            ))
        })?;

        let amount = caps[1].parse::<u64>().map_err(|_| {
            ValidationReason::InvalidFormat(format!("'{}' is too large", value))
        })?;
        if amount == 0 {
            return Err(ValidationReason::InvalidFormat(
                "size must be greater than zero".to_string(),
            ));
        }
        let unit = MemoryUnit::from_suffix(&caps[2])
            .ok_or_else(|| ValidationReason::InvalidFormat(format!("unknown unit in '{}'", value)))?;

        let size = MemorySize::new(amount, unit);
        if size.to_kib().is_none() {
            return Err(ValidationReason::InvalidFormat(format!("'{}' is too large", value)));
        }
        Ok(size)
    }
}

fn check_range(value: Option<i64>, min: u32, max: u32) -> Result<u32, ValidationReason> {
    let value = value.ok_or(ValidationReason::Missing)?;
    if value < i64::from(min) || value > i64::from(max) {
        return Err(ValidationReason::OutOfRange {
            value,
            min: i64::from(min),
            max: i64::from(max),
        });
    }
    // In range of two u32 bounds, so the conversion cannot fail.
    u32::try_from(value).map_err(|_| ValidationReason::OutOfRange {
        value,
        min: i64::from(min),
        max: i64::from(max),
    })
}

fn collect<T>(
    errors: &mut ValidationErrors,
    field: RequestField,
    result: Result<T, ValidationReason>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(reason) => {
            errors.push(FieldError::new(field, reason));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_raw() -> RawGenerationRequest {
        RawGenerationRequest::new()
            .with_postgres_version("14.10")
            .with_instance_type("t2.micro")
            .with_num_replicas(2)
            .with_max_connections(100)
            .with_shared_buffers("256MB")
    }

    fn field_errors(raw: &RawGenerationRequest) -> ValidationErrors {
        match RequestValidator::default().validate(raw) {
            Err(SpecError::Validation(errors)) => errors,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request() {
        let request = RequestValidator::default().validate(&valid_raw()).unwrap();
        assert_eq!(request.postgres_version().major(), 14);
        assert_eq!(request.postgres_version().minor(), 10);
        assert_eq!(request.instance_type(), InstanceType::T2Micro);
        assert_eq!(request.num_replicas(), 2);
        assert_eq!(request.max_connections(), 100);
        assert_eq!(request.shared_buffers().to_string(), "256MB");
        assert_eq!(request.node_count(), 3);
    }

    #[test]
    fn test_bad_versions_name_the_field() {
        for bad in ["abc", "14", "14.x", "14.10.2", " 14.10", "v14.1", ""] {
            let errors = field_errors(&valid_raw().with_postgres_version(bad));
            let error = errors.get(RequestField::PostgresVersion).unwrap();
            assert_eq!(error.reason.kind(), "invalid_format", "input {:?}", bad);
            assert_eq!(errors.len(), 1);
        }
    }

    #[test]
    fn test_non_ascii_digits_are_rejected() {
        let errors = field_errors(&valid_raw().with_postgres_version("١٤.١٠"));
        assert!(errors.contains(RequestField::PostgresVersion));
    }

    #[test]
    fn test_oversized_version_component() {
        let errors = field_errors(&valid_raw().with_postgres_version("99999999999.1"));
        assert!(matches!(
            errors.get(RequestField::PostgresVersion).unwrap().reason,
            ValidationReason::InvalidFormat(_)
        ));
    }

    #[test]
    fn test_unknown_instance_type() {
        let errors = field_errors(&valid_raw().with_instance_type("t2.nano"));
        let error = errors.get(RequestField::InstanceType).unwrap();
        assert_eq!(error.reason.kind(), "unsupported_value");
        assert!(error.to_string().contains("t3.medium"));
    }

    #[test]
    fn test_replica_bounds() {
        let errors = field_errors(&valid_raw().with_num_replicas(-1));
        assert_eq!(
            errors.get(RequestField::NumReplicas).unwrap().reason,
            ValidationReason::OutOfRange { value: -1, min: 0, max: 10 }
        );

        assert!(field_errors(&valid_raw().with_num_replicas(11)).contains(RequestField::NumReplicas));
        assert!(RequestValidator::default().validate(&valid_raw().with_num_replicas(0)).is_ok());
        assert!(RequestValidator::default().validate(&valid_raw().with_num_replicas(10)).is_ok());
    }

    #[test]
    fn test_connection_bounds() {
        for bad in [9, 10_001, -5, i64::MAX] {
            let errors = field_errors(&valid_raw().with_max_connections(bad));
            assert_eq!(errors.get(RequestField::MaxConnections).unwrap().reason.kind(), "out_of_range");
        }
        for good in [10, 10_000] {
            assert!(RequestValidator::default().validate(&valid_raw().with_max_connections(good)).is_ok());
        }
    }

    #[test]
    fn test_custom_limits() {
        let limits = ValidationLimits::default()
            .with_max_replicas(2)
            .with_connection_range(50, 200);
        let validator = RequestValidator::new(limits).unwrap();

        assert!(validator.validate(&valid_raw()).is_ok());
        assert!(validator.validate(&valid_raw().with_num_replicas(3)).is_err());
        assert!(validator.validate(&valid_raw().with_max_connections(201)).is_err());
    }

    #[test]
    fn test_shared_buffers_format() {
        for bad in ["256", "256mb", "256 MB", "MB", "1.5GB", "256TB", "0MB", "-1MB"] {
            let errors = field_errors(&valid_raw().with_shared_buffers(bad));
            assert_eq!(
                errors.get(RequestField::SharedBuffers).unwrap().reason.kind(),
                "invalid_format",
                "input {:?}",
                bad
            );
        }
        for good in ["128KB", "256MB", "2GB"] {
            assert!(RequestValidator::default().validate(&valid_raw().with_shared_buffers(good)).is_ok());
        }
    }

    #[test]
    fn test_shared_buffers_overflow() {
        let errors = field_errors(&valid_raw().with_shared_buffers("18446744073709551615GB"));
        assert!(errors.contains(RequestField::SharedBuffers));
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let errors = field_errors(&RawGenerationRequest::new());
        assert_eq!(errors.len(), 5);
        for (error, field) in errors.iter().zip(RequestField::all()) {
            assert_eq!(error.field, field);
            assert_eq!(error.reason, ValidationReason::Missing);
        }
    }

    #[test]
    fn test_one_error_per_field() {
        let raw = valid_raw()
            .with_postgres_version("14")
            .with_shared_buffers("256")
            .with_num_replicas(-1);
        let errors = field_errors(&raw);
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(RequestField::PostgresVersion));
        assert!(errors.contains(RequestField::NumReplicas));
        assert!(errors.contains(RequestField::SharedBuffers));
    }

    #[test]
    fn test_advisories() {
        let validator = RequestValidator::default();

        let ok = validator.validate(&valid_raw()).unwrap();
        assert!(validator.advisories(&ok).is_empty());

        let oversized = validator
            .validate(&valid_raw().with_shared_buffers("2GB"))
            .unwrap();
        assert_eq!(validator.advisories(&oversized).len(), 1);

        let tiny = validator
            .validate(&valid_raw().with_shared_buffers("64KB"))
            .unwrap();
        assert!(validator.advisories(&tiny)[0].contains("128kB"));

        let old = validator
            .validate(&valid_raw().with_postgres_version("9.6"))
            .unwrap();
        assert!(validator.advisories(&old)[0].contains("end of life"));
    }

    #[test]
    fn test_large_share_of_memory_advisory() {
        let validator = RequestValidator::default();
        let advisories = |buffers: &str| {
            let request = validator
                .validate(&valid_raw().with_shared_buffers(buffers))
                .unwrap();
            validator.advisories(&request)
        };

        let half = advisories("512MB");
        assert_eq!(half.len(), 1);
        assert!(half[0].contains("exceeds 40% of the memory of a t2.micro"));

        // 40% of 1024 MiB is 409.6 MiB.
        assert!(advisories("409MB").is_empty());
        assert_eq!(advisories("410MB").len(), 1);
    }
}
