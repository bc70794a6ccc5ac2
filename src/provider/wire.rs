//! JSON shapes of the REST API responses

use crate::provider::{Account, PostRef, ReplyRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct UserWire {
    #[serde(default)]
    pub id_str: String,
    pub screen_name: String,
}

impl From<UserWire> for Account {
    fn from(user: UserWire) -> Self {
        Self {
            id: user.id_str,
            handle: user.screen_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusWire {
    pub id_str: String,
    #[serde(default)]
    pub in_reply_to_status_id_str: Option<String>,
    pub user: UserWire,
}

impl From<StatusWire> for PostRef {
    fn from(status: StatusWire) -> Self {
        Self {
            id: status.id_str,
            author: status.user.screen_name,
        }
    }
}

impl From<StatusWire> for ReplyRecord {
    fn from(status: StatusWire) -> Self {
        Self {
            id: status.id_str,
            author: status.user.screen_name,
            in_reply_to: status.in_reply_to_status_id_str,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchMetadata {
    #[serde(default)]
    pub next_results: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub statuses: Vec<StatusWire>,
    #[serde(default)]
    pub search_metadata: SearchMetadata,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendsResponse {
    #[serde(default)]
    pub users: Vec<UserWire>,
    #[serde(default)]
    pub next_cursor: i64,
    #[serde(default)]
    pub next_cursor_str: Option<String>,
}

impl FriendsResponse {
    /// Continuation cursor, `None` once the provider reports cursor 0
    pub fn next(&self) -> Option<String> {
        let cursor = self
            .next_cursor_str
            .clone()
            .unwrap_or_else(|| self.next_cursor.to_string());
        if cursor == "0" {
            None
        } else {
            Some(cursor)
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEntry {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_with_null_reply_target() {
        let json = r#"{
            "id_str": "100",
            "in_reply_to_status_id_str": null,
            "user": {"id_str": "7", "screen_name": "dave"}
        }"#;
        let status: StatusWire = serde_json::from_str(json).unwrap();
        let record = ReplyRecord::from(status);
        assert_eq!(record.author, "dave");
        assert_eq!(record.reply_target(), None);
    }

    #[test]
    fn test_search_response_without_metadata() {
        let json = r#"{"statuses": []}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert!(response.statuses.is_empty());
        assert!(response.search_metadata.next_results.is_none());
    }

    #[test]
    fn test_friends_cursor_end() {
        let json = r#"{"users": [], "next_cursor": 0, "next_cursor_str": "0"}"#;
        let response: FriendsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next(), None);
    }

    #[test]
    fn test_friends_cursor_continues() {
        let json = r#"{"users": [{"screen_name": "bob"}], "next_cursor": 1489467234237774933}"#;
        let response: FriendsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next(), Some("1489467234237774933".to_string()));
        assert_eq!(response.users[0].screen_name, "bob");
    }
}
