//! Error taxonomy shared by the repository and the HTTP layer.
//!
//! Repository functions return [`InventoryError`]; the Rocket responder at the
//! bottom of this module maps each kind to its HTTP status and JSON body.

use std::collections::BTreeMap;
use std::fmt;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, status};
use rocket::serde::json::{Json, json};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Field-keyed validation messages.
///
/// Serializes as `{"field": ["message", ...]}`, the body returned for every
/// `400` produced by validation or a uniqueness clash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// True when exactly one message was recorded and it is `message` on
    /// `field`.
    pub fn is_only(&self, field: &str, message: &str) -> bool {
        self.0.len() == 1 && self.get(field).is_some_and(|m| m.len() == 1 && m[0] == message)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded, `Invalid(self)` otherwise.
    pub fn into_result(self) -> Result<(), InventoryError> {
        if self.is_empty() { Ok(()) } else { Err(InventoryError::Invalid(self)) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("validation failed: {0}")]
    Invalid(FieldErrors),
    #[error("{message}")]
    Conflict { field: String, message: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("authentication credentials were not provided")]
    Unauthorized,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl InventoryError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        InventoryError::Invalid(FieldErrors::single(field, message))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        InventoryError::NotFound(what.into())
    }

    pub fn status(&self) -> Status {
        match self {
            InventoryError::Invalid(_) | InventoryError::Conflict { .. } => Status::BadRequest,
            InventoryError::NotFound(_) => Status::NotFound,
            InventoryError::Unauthorized => Status::Unauthorized,
            InventoryError::Unavailable(_) => Status::ServiceUnavailable,
            InventoryError::Internal(_) => Status::InternalServerError,
        }
    }

    /// The JSON body sent to API clients.
    pub fn body(&self) -> serde_json::Value {
        match self {
            InventoryError::Invalid(errors) => json!(errors),
            InventoryError::Conflict { field, message } => {
                json!(FieldErrors::single(field, message.clone()))
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

/// Maps a SQLite `UNIQUE constraint failed: table.col[, table.col]` message to
/// the offending field and the message users see.
fn describe_unique_violation(message: &str) -> (String, String) {
    let columns = message
        .split_once(':')
        .map(|(_, cols)| cols.trim())
        .unwrap_or(message);

    match columns {
        "devices.asset_tag" => ("asset_tag".into(), "This asset tag is already in use.".into()),
        "categories.name" => ("name".into(), "Category with this name already exists.".into()),
        "vendors.name" => ("name".into(), "Vendor with this name already exists.".into()),
        "users.username" => {
            ("username".into(), "A user with that username already exists.".into())
        }
        c if c.starts_with("software_installations.") => (
            "non_field_errors".into(),
            "This software is already installed on the device.".into(),
        ),
        c if c.starts_with("audit_items.") => (
            "non_field_errors".into(),
            "This device is already part of the audit.".into(),
        ),
        other => {
            let field = other
                .split(',')
                .next()
                .and_then(|col| col.trim().split('.').nth(1))
                .unwrap_or("non_field_errors");
            (field.to_string(), format!("A record with this {} already exists.", field))
        }
    }
}

impl From<DieselError> for InventoryError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => InventoryError::NotFound("record".to_string()),
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => {
                    let (field, message) = describe_unique_violation(info.message());
                    InventoryError::Conflict { field, message }
                }
                DatabaseErrorKind::ForeignKeyViolation => InventoryError::invalid(
                    "non_field_errors",
                    "Referenced record does not exist.",
                ),
                DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation => {
                    InventoryError::invalid("non_field_errors", info.message().to_string())
                }
                DatabaseErrorKind::ClosedConnection
                | DatabaseErrorKind::UnableToSendCommand
                | DatabaseErrorKind::SerializationFailure
                | DatabaseErrorKind::ReadOnlyTransaction => {
                    InventoryError::Unavailable(info.message().to_string())
                }
                _ if info.message().contains("locked") || info.message().contains("busy") => {
                    InventoryError::Unavailable(info.message().to_string())
                }
                _ => InventoryError::Internal(info.message().to_string()),
            },
            DieselError::BrokenTransactionManager => {
                InventoryError::Unavailable("transaction manager is broken".to_string())
            }
            other => InventoryError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Internal(format!("json: {}", err))
    }
}

impl<'r> Responder<'r, 'static> for InventoryError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        match &self {
            InventoryError::Unavailable(_) | InventoryError::Internal(_) => {
                error!("{} {} failed: {}", req.method(), req.uri().path(), self);
            }
            _ => {
                warn!("{} {} rejected: {}", req.method(), req.uri().path(), self);
            }
        }
        status::Custom(status, Json(self.body())).respond_to(req)
    }
}
