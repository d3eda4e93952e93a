//! JSON Schema for the MCP resource document.

use serde_json::{json, Value};
use thiserror::Error;

use crate::domain::McpResource;

/// Errors from resource validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid resource schema: {0}")]
    Schema(String),

    #[error("Resource failed schema validation: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Failed to serialize resource: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The fixed schema every written resource must satisfy
pub fn resource_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "metadata": {
                "type": "object",
                "properties": {
                    "author": {"type": "string"},
                    "version": {"type": "string"},
                    "last_updated": {"type": "string", "format": "date-time"},
                    "content_count": {"type": "integer"},
                    "content_types": {
                        "type": "object",
                        "additionalProperties": {"type": "integer"}
                    },
                    "processing_stats": {
                        "type": "object",
                        "properties": {
                            "total_items": {"type": "integer"},
                            "processed_items": {"type": "integer"},
                            "failed_items": {"type": "integer"},
                            "processing_time": {"type": "number"}
                        }
                    }
                },
                "required": ["author", "version", "last_updated"]
            },
            "content": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "kind": {"type": "string"},
                        "subkind": {"type": "string"},
                        "title": {"type": "string"},
                        "source": {"type": "string"},
                        "published_date": {"type": "string"},
                        "url": {"type": "string"},
                        "content": {
                            "type": "object",
                            "properties": {
                                "text": {"type": "string"},
                                "transcript": {"type": "string"},
                                "summary": {"type": "string"},
                                "chapters": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "title": {"type": "string"},
                                            "content": {"type": "string"},
                                            "timestamp": {"type": "string"}
                                        }
                                    }
                                }
                            }
                        },
                        "tags": {
                            "type": "array",
                            "items": {"type": "string"}
                        },
                        "metadata": {
                            "type": "object",
                            "properties": {
                                "word_count": {"type": "integer"},
                                "processing_status": {"type": "string"},
                                "processing_errors": {
                                    "type": "array",
                                    "items": {"type": "string"}
                                }
                            }
                        }
                    },
                    "required": ["id", "kind", "title", "source", "url"]
                }
            }
        },
        "required": ["metadata", "content"]
    })
}

/// Validate an arbitrary JSON document against the resource schema
pub fn validate_value(instance: &Value) -> Result<(), ValidationError> {
    let schema = resource_schema();
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ValidationError::Schema(e.to_string()))?;

    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| format!("{} at '{}'", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Invalid(errors))
    }
}

pub fn validate_resource(resource: &McpResource) -> Result<(), ValidationError> {
    validate_value(&serde_json::to_value(resource)?)
}
