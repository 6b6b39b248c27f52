/*
 * Responsibility
 * - GET /api/post (ページ単位の取得)
 * - 取得元を trait (PostSource) で抽象化し、フェッチ制御側から差し替え可能にする
 */
use async_trait::async_trait;

use crate::repos::client::ApiClient;
use crate::repos::dto::posts::{PageResult, PostQuery};
use crate::repos::error::RepoResult;

pub const POSTS_PATH: &str = "api/post";

pub async fn fetch_page(client: &ApiClient, query: &PostQuery) -> RepoResult<PageResult> {
    let page: PageResult = client.get_json(POSTS_PATH, query).await?;

    tracing::debug!(
        page = page.page,
        total_pages = page.total_pages,
        items = page.items.len(),
        "fetched posts page"
    );

    Ok(page)
}

/// Source of post pages.
///
/// Implementations must be cheap to clone; the fetch controller clones one
/// into every spawned request task.
#[async_trait]
pub trait PostSource: Clone + Send + Sync + 'static {
    async fn fetch_page(&self, query: &PostQuery) -> RepoResult<PageResult>;
}

/// `PostSource` backed by the remote API.
#[derive(Clone, Debug)]
pub struct RemotePosts {
    client: ApiClient,
}

impl RemotePosts {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PostSource for RemotePosts {
    async fn fetch_page(&self, query: &PostQuery) -> RepoResult<PageResult> {
        fetch_page(&self.client, query).await
    }
}
