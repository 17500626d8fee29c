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

//! Listing views and their paginated responses

use serde::{Deserialize, Serialize};

use super::{AuthorProfile, Group, Post};
use crate::pagination::Page;

/// Which posts a listing shows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimelineKind {
    /// Every post
    Home,
    /// Posts in one group
    Group { slug: String },
    /// Posts written by one user
    Author { username: String },
    /// Posts by the authors a user follows
    Feed { username: String },
}

impl TimelineKind {
    /// Get a display name for this timeline kind
    pub fn display_name(&self) -> String {
        match self {
            TimelineKind::Home => "Home".to_string(),
            TimelineKind::Group { slug } => format!("Group: {}", slug),
            TimelineKind::Author { username } => format!("Profile: {}", username),
            TimelineKind::Feed { username } => format!("Feed of {}", username),
        }
    }
}

impl std::fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Request for one page of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Raw page number as the client sent it; anything unparsable means page 1
    #[serde(default, deserialize_with = "raw_page")]
    pub page: Option<String>,
}

/// Accept the page as either a JSON string or a JSON number
fn raw_page<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Home timeline page
pub type IndexPage = Page<Post>;

/// Group listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPage {
    pub group: Group,
    pub page: Page<Post>,
}

/// Profile listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePage {
    pub profile: AuthorProfile,
    pub page: Page<Post>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_accepts_strings_and_numbers() {
        let r: PageRequest = serde_json::from_str(r#"{"page": "2"}"#).unwrap();
        assert_eq!(r.page.as_deref(), Some("2"));

        let r: PageRequest = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(r.page.as_deref(), Some("3"));

        let r: PageRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(r.page.is_none());

        let r: PageRequest = serde_json::from_str(r#"{"page": null}"#).unwrap();
        assert!(r.page.is_none());
    }

    #[test]
    fn timeline_kind_is_tagged() {
        let kind: TimelineKind =
            serde_json::from_str(r#"{"kind": "group", "slug": "g1"}"#).unwrap();
        assert_eq!(kind, TimelineKind::Group { slug: "g1".into() });
        assert_eq!(kind.to_string(), "Group: g1");
    }
}
