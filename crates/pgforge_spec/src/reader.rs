//! Request file reading utilities.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FieldError, SpecError, SpecResult, ValidationErrors, ValidationReason};
use crate::models::{RawGenerationRequest, RequestField};

/// Reader for request payloads stored as YAML or JSON.
pub struct RequestReader;

impl RequestReader {
    /// Read a request file, picking the format from the extension.
    pub fn read_file(path: impl AsRef<Path>) -> SpecResult<RawGenerationRequest> {
        let path = path.as_ref();
        debug!("Reading request from {:?}", path);

        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let content = fs::read_to_string(path)?;
        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            _ => Err(SpecError::UnsupportedRequestFormat(path.to_path_buf())),
        }
    }

    pub fn from_yaml_str(content: &str) -> SpecResult<RawGenerationRequest> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> SpecResult<RawGenerationRequest> {
        Self::from_json_value(serde_json::from_str(content)?)
    }

    /// Decode a request from parsed JSON.
    ///
    /// Each field is decoded on its own, so a value of the wrong type is
    /// reported against its field as [`ValidationReason::InvalidType`].
    /// Unknown keys are ignored and `null` counts as absent.
    pub fn from_json_value(value: Value) -> SpecResult<RawGenerationRequest> {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Ok(serde_json::from_value(other)?),
        };

        let mut errors = ValidationErrors::new();
        let raw = RawGenerationRequest {
            postgres_version: take(&mut object, RequestField::PostgresVersion, &mut errors),
            instance_type: take(&mut object, RequestField::InstanceType, &mut errors),
            num_replicas: take(&mut object, RequestField::NumReplicas, &mut errors),
            max_connections: take(&mut object, RequestField::MaxConnections, &mut errors),
            shared_buffers: take(&mut object, RequestField::SharedBuffers, &mut errors),
        };

        if !errors.is_empty() {
            debug!("Request payload has mistyped fields: {}", errors);
            return Err(SpecError::Validation(errors));
        }
        Ok(raw)
    }
}

fn take<T: DeserializeOwned>(
    object: &mut Map<String, Value>,
    field: RequestField,
    errors: &mut ValidationErrors,
) -> Option<T> {
    let value = object.remove(field.as_str())?;
    match serde_json::from_value::<Option<T>>(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            errors.push(FieldError::new(field, ValidationReason::InvalidType(e.to_string())));
            None
        }
    }
}
