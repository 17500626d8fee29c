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

//! IPC message handler

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::blog::Blog;
use crate::error::BlogResult;
use crate::log_ipc;
use crate::models::{
    error_codes, methods, IpcError, IpcMessage, MessageType, NewGroup, NewPost, PageRequest, PostEdit,
};

#[derive(Debug, Deserialize)]
struct RegisterParams {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GroupPostsParams {
    slug: String,
    #[serde(flatten)]
    page: PageRequest,
}

#[derive(Debug, Deserialize)]
struct ProfileParams {
    username: String,
    #[serde(default)]
    viewer: Option<String>,
    #[serde(flatten)]
    page: PageRequest,
}

#[derive(Debug, Deserialize)]
struct FeedParams {
    username: String,
    #[serde(flatten)]
    page: PageRequest,
}

#[derive(Debug, Deserialize)]
struct PostIdParams {
    post_id: i64,
}

#[derive(Debug, Deserialize)]
struct CreatePostParams {
    author: String,
    #[serde(flatten)]
    post: NewPost,
}

#[derive(Debug, Deserialize)]
struct EditPostParams {
    editor: String,
    post_id: i64,
    #[serde(flatten)]
    edit: PostEdit,
}

#[derive(Debug, Deserialize)]
struct CommentParams {
    author: String,
    post_id: i64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct FollowParams {
    username: String,
    author: String,
}

/// Routes incoming IPC requests to the blog
pub struct MessageHandler {
    blog: Blog,
    shutdown_tx: broadcast::Sender<()>,
}

impl MessageHandler {
    pub fn new(blog: Blog, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self { blog, shutdown_tx }
    }

    /// Handle an incoming IPC message
    pub async fn handle_message(&self, msg: IpcMessage) -> IpcMessage {
        let method = msg.method.as_deref().unwrap_or("unknown");
        log_ipc!(request, method, &msg.id);

        let outcome = match (&msg.message_type, &msg.method) {
            (MessageType::Request, Some(method)) => self.dispatch(method, &msg).await,
            _ => Err(IpcError::new(
                error_codes::INVALID_REQUEST,
                "Expected a request with a method",
            )),
        };

        let result = match outcome {
            Ok(value) => IpcMessage::response_ok(&msg.id, value),
            Err(err) => IpcMessage::response_err(&msg.id, err),
        };

        let success = result.error.is_none();
        log_ipc!(response, method, &msg.id, success);

        result
    }

    async fn dispatch(&self, method: &str, msg: &IpcMessage) -> Result<serde_json::Value, IpcError> {
        match method {
            // System
            methods::PING => Ok(serde_json::json!({
                "pong": true,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
            methods::SHUTDOWN => {
                info!("Shutdown requested via IPC");
                let _ = self.shutdown_tx.send(());
                Ok(serde_json::json!({ "status": "shutting_down" }))
            }
            methods::CACHE_CLEAR => {
                reply(self.blog.clear_cache().await.map(|_| serde_json::json!({ "cleared": true })))
            }

            // Administration
            methods::USERS_REGISTER => {
                let params: RegisterParams = msg.parse_params()?;
                reply(self.blog.register_user(&params.username).await)
            }
            methods::GROUPS_CREATE => {
                let params: NewGroup = msg.parse_params()?;
                reply(self.blog.create_group(params).await)
            }

            // Listings
            methods::POSTS_INDEX => {
                let params: PageRequest = msg.parse_params()?;
                reply(self.blog.index(params.page.as_deref()).await)
            }
            methods::POSTS_GROUP => {
                let params: GroupPostsParams = msg.parse_params()?;
                reply(
                    self.blog
                        .group_posts(&params.slug, params.page.page.as_deref())
                        .await,
                )
            }
            methods::POSTS_PROFILE => {
                let params: ProfileParams = msg.parse_params()?;
                reply(
                    self.blog
                        .profile(
                            &params.username,
                            params.page.page.as_deref(),
                            params.viewer.as_deref(),
                        )
                        .await,
                )
            }
            methods::FOLLOW_INDEX => {
                let params: FeedParams = msg.parse_params()?;
                reply(
                    self.blog
                        .follow_index(&params.username, params.page.page.as_deref())
                        .await,
                )
            }

            // Posts
            methods::POSTS_DETAIL => {
                let params: PostIdParams = msg.parse_params()?;
                reply(self.blog.post_detail(params.post_id).await)
            }
            methods::POSTS_CREATE => {
                let params: CreatePostParams = msg.parse_params()?;
                reply(self.blog.create_post(&params.author, params.post).await)
            }
            methods::POSTS_EDIT => {
                let params: EditPostParams = msg.parse_params()?;
                reply(
                    self.blog
                        .edit_post(&params.editor, params.post_id, params.edit)
                        .await,
                )
            }
            methods::COMMENTS_ADD => {
                let params: CommentParams = msg.parse_params()?;
                reply(
                    self.blog
                        .add_comment(&params.author, params.post_id, &params.text)
                        .await,
                )
            }

            // Subscriptions
            methods::FOLLOW_ADD => {
                let params: FollowParams = msg.parse_params()?;
                let created = self.blog.profile_follow(&params.username, &params.author).await;
                reply(created.map(|created| serde_json::json!({ "created": created })))
            }
            methods::FOLLOW_REMOVE => {
                let params: FollowParams = msg.parse_params()?;
                let removed = self
                    .blog
                    .profile_unfollow(&params.username, &params.author)
                    .await;
                reply(removed.map(|removed| serde_json::json!({ "removed": removed })))
            }

            _ => {
                warn!("Unknown method: {}", method);
                Err(IpcError::new(
                    error_codes::METHOD_NOT_FOUND,
                    format!("Unknown method: {}", method),
                ))
            }
        }
    }
}

/// Turn a blog result into a response payload
fn reply<T: Serialize>(result: BlogResult<T>) -> Result<serde_json::Value, IpcError> {
    match result {
        Ok(value) => serde_json::to_value(value).map_err(|e| {
            error!("Failed to serialize response: {}", e);
            IpcError::new(error_codes::INTERNAL_ERROR, format!("Serialization error: {}", e))
        }),
        Err(err) => {
            if err.is_client_error() {
                warn!("Request rejected: {}", err);
            } else {
                error!("Request failed: {}", err);
            }
            Err(err.into())
        }
    }
}
