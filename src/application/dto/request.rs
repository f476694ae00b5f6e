//! Request DTOs
//!
//! Data structures for API request bodies and query strings. Bodies use
//! camelCase keys; IDs may be sent as strings or numbers.

use serde::Deserialize;
use validator::Validate;

use crate::shared::snowflake::{id_string, id_string_vec};

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Please enter username"))]
    pub username: String,

    #[validate(length(min = 1, message = "Please enter password"))]
    pub password: String,
}

/// Registration fields (sent as multipart alongside the avatar)
#[derive(Debug, Default, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 64, message = "Please enter name"))]
    pub name: String,

    #[validate(length(min = 2, max = 32, message = "Username must be 2-32 characters"))]
    pub username: String,

    #[validate(length(min = 1, message = "Please enter password"))]
    pub password: String,

    #[validate(length(min = 1, message = "Please enter bio"))]
    pub bio: String,
}

/// Send friend request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequest {
    #[serde(with = "id_string")]
    pub user_id: i64,
}

/// Accept or reject a friend request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFriendRequest {
    #[serde(with = "id_string")]
    pub request_id: i64,

    pub accept: bool,
}

/// Create group request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Please enter a group name"))]
    pub name: String,

    #[serde(with = "id_string_vec")]
    #[validate(length(min = 2, message = "Please add at least 2 members"))]
    pub members: Vec<i64>,
}

/// Add members request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMembersRequest {
    #[serde(with = "id_string")]
    pub chat_id: i64,

    #[serde(with = "id_string_vec")]
    #[validate(length(min = 1, message = "Please add at least 1 member"))]
    pub members: Vec<i64>,
}

/// Remove member request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    #[serde(with = "id_string")]
    pub chat_id: i64,

    #[serde(with = "id_string")]
    pub user_id: i64,
}

/// Rename chat request
#[derive(Debug, Deserialize, Validate)]
pub struct RenameChatRequest {
    #[validate(length(min = 1, max = 100, message = "Please enter a new name"))]
    pub name: String,
}

/// Admin login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, message = "Please enter the secret key"))]
    pub secret_key: String,
}

/// `GET /user/search?name=`
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub name: String,
}

/// `GET /user/friends?chatId=`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsQuery {
    pub chat_id: Option<String>,
}

/// `GET /chat/message/{id}?page=`
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// `GET /chat/{id}?populate=true`
#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub populate: Option<String>,
}

impl DetailsQuery {
    pub fn populate(&self) -> bool {
        self.populate.as_deref() == Some("true")
    }
}
