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

//! IPC message models for the presentation layer protocol
//!
//! One JSON object per line. Requests name a method and carry params;
//! responses echo the request id and carry either a result or an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type of IPC message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
}

/// An IPC message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcMessage {
    /// Unique message ID (UUID)
    pub id: String,

    /// Message type
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Method name for requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Parameters for requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Result for responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error for failed responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<IpcError>,
}

impl IpcMessage {
    /// Create a new request message
    #[cfg(test)]
    pub fn request(method: &str, params: Option<Value>) -> Self {
        Self {
            id: new_message_id(),
            message_type: MessageType::Request,
            method: Some(method.to_string()),
            params,
            result: None,
            error: None,
        }
    }

    /// Create a success response
    pub fn response_ok(id: &str, result: Value) -> Self {
        Self {
            id: id.to_string(),
            message_type: MessageType::Response,
            method: None,
            params: None,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn response_err(id: &str, error: IpcError) -> Self {
        Self {
            id: id.to_string(),
            message_type: MessageType::Response,
            method: None,
            params: None,
            result: None,
            error: Some(error),
        }
    }

    /// Deserialize the params into a typed request; missing params read as `{}`
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T, IpcError> {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(params).map_err(|e| {
            IpcError::new(error_codes::INVALID_PARAMS, format!("Invalid params: {}", e))
        })
    }
}

/// Fresh message id
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Error in an IPC response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl IpcError {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Standard error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Application-specific errors
    pub const NOT_FOUND: i32 = -1001;
    pub const FORBIDDEN: i32 = -1002;
    pub const VALIDATION: i32 = -1003;
    pub const CONFLICT: i32 = -1004;
}

/// IPC method names
pub mod methods {
    // Administration
    pub const USERS_REGISTER: &str = "users.register";
    pub const GROUPS_CREATE: &str = "groups.create";

    // Listings
    pub const POSTS_INDEX: &str = "posts.index";
    pub const POSTS_GROUP: &str = "posts.group";
    pub const POSTS_PROFILE: &str = "posts.profile";
    pub const FOLLOW_INDEX: &str = "follow.index";

    // Posts
    pub const POSTS_DETAIL: &str = "posts.detail";
    pub const POSTS_CREATE: &str = "posts.create";
    pub const POSTS_EDIT: &str = "posts.edit";
    pub const COMMENTS_ADD: &str = "comments.add";

    // Subscriptions
    pub const FOLLOW_ADD: &str = "follow.add";
    pub const FOLLOW_REMOVE: &str = "follow.remove";

    // Cache
    pub const CACHE_CLEAR: &str = "cache.clear";

    // System
    pub const PING: &str = "ping";
    pub const SHUTDOWN: &str = "shutdown";
}
