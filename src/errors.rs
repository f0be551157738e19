use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Which party has to act on a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// The order or build configuration has to be corrected.
    Configuration,
    /// The part/assembly catalog or the mapping tables have to be corrected.
    CatalogIntegrity,
    /// A tracking assignment was rejected; the tree itself is intact.
    Tracking,
    /// Infrastructure failure (database, serialization, ...).
    Internal,
}

/// Failures of the BOM generation pipeline.
///
/// Every variant aborts the whole generation. None of them is transient, so
/// callers retry only after correcting the underlying data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BomError {
    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("No {table} mapping for '{key}'")]
    MappingNotFound { table: &'static str, key: String },

    #[error("Broken component link in '{parent}': '{child}' resolves to neither a part nor an assembly")]
    UnknownComponent { parent: String, child: String },

    #[error("Ambiguous component link in '{parent}': '{child}' is declared as both a part and an assembly")]
    AmbiguousComponent { parent: String, child: String },

    #[error("Cyclic assembly membership: {}", .cycle.join(" -> "))]
    CyclicAssembly { cycle: Vec<String> },

    #[error("Invalid quantity {quantity} for '{child}' in '{parent}'")]
    InvalidQuantity {
        parent: String,
        child: String,
        quantity: i64,
    },

    #[error("Effective quantity of '{id}' overflows")]
    QuantityOverflow { id: String },

    #[error("Catalog id '{id}' is registered as both a part and an assembly")]
    DuplicateCatalogId { id: String },

    #[error("Tracking rejected for node {node}: {reason}")]
    Tracking { node: usize, reason: String },
}

impl BomError {
    pub fn validation(message: impl Into<String>) -> Self {
        BomError::Validation(message.into())
    }

    pub fn mapping(table: &'static str, key: impl Into<String>) -> Self {
        BomError::MappingNotFound {
            table,
            key: key.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::MappingNotFound { .. } => "mapping_not_found",
            Self::UnknownComponent { .. } => "unknown_component",
            Self::AmbiguousComponent { .. } => "ambiguous_component",
            Self::CyclicAssembly { .. } => "cyclic_assembly",
            Self::InvalidQuantity { .. } => "invalid_quantity",
            Self::QuantityOverflow { .. } => "quantity_overflow",
            Self::DuplicateCatalogId { .. } => "duplicate_catalog_id",
            Self::Tracking { .. } => "tracking_rejected",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::MappingNotFound { .. } => ErrorCategory::Configuration,
            Self::UnknownComponent { .. }
            | Self::AmbiguousComponent { .. }
            | Self::CyclicAssembly { .. }
            | Self::InvalidQuantity { .. }
            | Self::QuantityOverflow { .. }
            | Self::DuplicateCatalogId { .. } => ErrorCategory::CatalogIntegrity,
            Self::Tracking { .. } => ErrorCategory::Tracking,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("BOM generation failed: {0}")]
    Bom(#[from] BomError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Returns the machine-readable code for this error.
    /// This is the single source of truth for error-to-code mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::Bom(err) => err.code(),
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::ConfigError(_) => "configuration_error",
            Self::SerializationError(_) => "serialization_error",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Bom(err) => err.category(),
            Self::NotFound(_) | Self::ValidationError(_) => ErrorCategory::Configuration,
            Self::ConfigError(_) => ErrorCategory::CatalogIntegrity,
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the error message suitable for callers outside the crate.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::SerializationError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Serializable error body handed to the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "cyclic_assembly")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Who has to act on the failure
    pub category: ErrorCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(error: &ServiceError) -> Self {
        let details = match error {
            ServiceError::Bom(BomError::CyclicAssembly { cycle }) => Some(cycle.join(" -> ")),
            _ => None,
        };

        Self {
            error: error.code().to_string(),
            message: error.response_message(),
            category: error.category(),
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_error_codes_and_categories() {
        let unknown = BomError::UnknownComponent {
            parent: "T2-BSN-EDR-KIT".into(),
            child: "T2-MISSING".into(),
        };
        assert_eq!(unknown.code(), "unknown_component");
        assert_eq!(unknown.category(), ErrorCategory::CatalogIntegrity);

        let mapping = BomError::mapping("legs", "DL99");
        assert_eq!(mapping.code(), "mapping_not_found");
        assert_eq!(mapping.category(), ErrorCategory::Configuration);
        assert_eq!(mapping.to_string(), "No legs mapping for 'DL99'");
    }

    #[test]
    fn cycle_message_lists_path() {
        let err = BomError::CyclicAssembly {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "Cyclic assembly membership: A -> B -> A");
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::InternalError("pool exhausted".into()).response_message(),
            "Internal error"
        );
        assert_eq!(
            ServiceError::db_error("connection refused").response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::NotFound("build 2".into()).response_message(),
            "Not found: build 2"
        );
    }

    #[test]
    fn error_response_carries_code_and_cycle_details() {
        let err = ServiceError::from(BomError::CyclicAssembly {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        });
        let body = ErrorResponse::from(&err);
        assert_eq!(body.error, "cyclic_assembly");
        assert_eq!(body.category, ErrorCategory::CatalogIntegrity);
        assert_eq!(body.details.as_deref(), Some("A -> B -> A"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["category"], "catalog_integrity");
    }
}
