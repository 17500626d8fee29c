// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Domain error type shared by the store, the blog service and the IPC layer

use thiserror::Error;

use crate::cache::CacheError;
use crate::models::{error_codes, IpcError};

/// Result alias for blog operations
pub type BlogResult<T> = Result<T, BlogError>;

/// Errors raised by blog operations
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

impl BlogError {
    /// IPC error code reported for this error
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound(_) => error_codes::NOT_FOUND,
            Self::Forbidden(_) => error_codes::FORBIDDEN,
            Self::Validation(_) => error_codes::VALIDATION,
            Self::Conflict(_) => error_codes::CONFLICT,
            Self::Database(_) | Self::Serialization(_) | Self::Cache(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }

    /// Whether the caller caused this error (as opposed to the backend)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Cache(_)
        )
    }
}

impl From<BlogError> for IpcError {
    fn from(err: BlogError) -> Self {
        IpcError::new(err.code(), err.to_string())
    }
}

/// Map a unique-constraint violation to a conflict, everything else to a database error
pub fn conflict_on_unique(err: sqlx::Error, what: impl Into<String>) -> BlogError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => BlogError::Conflict(what.into()),
        _ => BlogError::Database(err),
    }
}
