// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Taxonomy for everything a server action can hand back: validation
// errors pin to a form field, failures become transient toasts with the
// form state preserved, and anything unexpected is coerced to a string
// rather than crashing the UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("{message}")]
    Failed { message: String },
    #[error("{0}")]
    Unexpected(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn unexpected(error: impl std::fmt::Display) -> Self {
        Self::Unexpected(error.to_string())
    }

    pub fn toast_text(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::Failed { message } => message.clone(),
            Self::Unexpected(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.first() {
            Some(first) if self.errors.len() == 1 => {
                write!(f, "{}: {}", first.field, first.message)
            }
            Some(first) => write!(
                f,
                "{}: {} (+{} more)",
                first.field,
                first.message,
                self.errors.len() - 1
            ),
            None => f.write_str("no field errors"),
        }
    }
}

impl std::error::Error for FieldErrors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Success,
    Error,
}

// The discriminated result every server action returns:
// `{status, data?, message, error?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ActionEnvelope<T> {
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionEnvelope<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            data: Some(data),
            message: message.into(),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status: ActionStatus::Error,
            data: None,
            message: message.into(),
            error,
        }
    }

    pub fn into_result(self) -> Result<T, ActionError> {
        match self.status {
            ActionStatus::Success => self.data.ok_or_else(|| {
                ActionError::unexpected("success envelope arrived without a data payload")
            }),
            ActionStatus::Error => {
                let detail = self.error.unwrap_or_default();
                if self.message.is_empty() && detail.is_empty() {
                    Err(ActionError::failed("action failed without a message"))
                } else if self.message.is_empty() {
                    Err(ActionError::failed(detail))
                } else {
                    Err(ActionError::failed(self.message))
                }
            }
        }
    }
}
