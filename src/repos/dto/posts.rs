/*
 * Responsibility
 * - /api/post 系の request/response DTO
 * - サーバー側の ID は文字列でも数値でも来るので、クライアントでは文字列に揃える
 */
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(deserialize_with = "id_as_string")]
    pub user_id: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
    #[serde(default)]
    pub items: Vec<Post>,
}

/// Query string of `GET /api/post`. `query` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub search_titles: bool,
}

impl PostQuery {
    pub fn new(page: u32, page_size: u32, query: &str, search_titles: bool) -> Self {
        let query = query.trim();
        Self {
            page,
            page_size,
            query: (!query.is_empty()).then(|| query.to_string()),
            search_titles,
        }
    }
}

/// Server-push message on `/api/post/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamPayload {
    pub operation: String,
    pub count: u64,
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Unsigned(n) => n.to_string(),
        RawId::Signed(n) => n.to_string(),
    })
}
