//! In-process mock of the remote Post Tracker API (axum).
#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use serde_json::{Value, json};

use post_tracker::config::Config;
use post_tracker::repos::client::ApiClient;

pub const SESSION_COOKIE: &str = "session=mock-session";

#[derive(Debug, Clone)]
pub enum StreamItem {
    Message(String),
    Named(&'static str, String),
    WithId(&'static str, String),
    Retry(Duration),
}

#[derive(Default)]
pub struct MockState {
    pub posts: Vec<Value>,
    pub fail_posts: AtomicBool,
    pub queries: Mutex<Vec<HashMap<String, String>>>,
    pub request_ids: Mutex<Vec<String>>,

    pub stream_items: Mutex<Vec<StreamItem>>,
    /// 0 = serve the stream, otherwise reply with this status.
    pub stream_status: AtomicU16,
    pub stream_connects: AtomicUsize,
    /// `Last-Event-ID` sent on each connect.
    pub stream_last_ids: Mutex<Vec<Option<String>>>,

    pub registered_emails: Mutex<Vec<String>>,
    pub logouts: AtomicUsize,
    pub fail_logout: AtomicBool,
}

impl MockState {
    pub fn with_posts(count: usize) -> Self {
        let posts = (1..=count)
            .map(|i| {
                json!({
                    "id": i,
                    "userId": (i % 3) + 1,
                    "title": if i % 2 == 0 { format!("rust post {i}") } else { format!("post {i}") },
                    "body": if i % 5 == 0 { "all about rust".to_string() } else { format!("body {i}") },
                })
            })
            .collect();
        Self {
            posts,
            ..Default::default()
        }
    }

    pub fn recorded_queries(&self) -> Vec<HashMap<String, String>> {
        self.queries.lock().unwrap().clone()
    }
}

pub struct MockApi {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockApi {
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/api/post", get(list_posts))
            .route("/api/post/stream", get(stream_posts))
            .route("/api/user/check-auth", get(check_auth))
            .route("/api/User/login", post(login))
            .route("/api/User/logout", post(logout))
            .route("/api/user/register", post(register))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> Config {
        let base_url = self.base_url.clone();
        Config::from_lookup(move |key| match key {
            "API_BASE_URL" => Some(base_url.clone()),
            "SEARCH_DEBOUNCE_MS" => Some("20".into()),
            "STREAM_MAX_RETRIES" => Some("2".into()),
            "STREAM_RETRY_INITIAL_MS" => Some("10".into()),
            "STREAM_RETRY_MAX_MS" => Some("40".into()),
            "REQUEST_TIMEOUT_SECONDS" => Some("5".into()),
            _ => None,
        })
        .unwrap()
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.config()).unwrap()
    }
}

async fn list_posts(
    State(mock): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        mock.request_ids.lock().unwrap().push(id.to_string());
    }
    mock.queries.lock().unwrap().push(params.clone());

    if mock.fail_posts.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "database unavailable"})),
        )
            .into_response();
    }

    let page: usize = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let page_size: usize = params
        .get("pageSize")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let titles_only = params.get("searchTitles").map(|v| v == "true").unwrap_or(false);
    let query = params.get("query").map(|q| q.to_lowercase());

    let matching: Vec<&Value> = mock
        .posts
        .iter()
        .filter(|p| match &query {
            None => true,
            Some(q) => {
                let title = p["title"].as_str().unwrap_or_default().to_lowercase();
                let body = p["body"].as_str().unwrap_or_default().to_lowercase();
                title.contains(q) || (!titles_only && body.contains(q))
            }
        })
        .collect();

    let total_items = matching.len();
    let total_pages = total_items.div_ceil(page_size);
    let items: Vec<&Value> = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Json(json!({
        "page": page,
        "pageSize": page_size,
        "totalItems": total_items,
        "totalPages": total_pages,
        "items": items,
    }))
    .into_response()
}

async fn stream_posts(State(mock): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    mock.stream_connects.fetch_add(1, Ordering::SeqCst);
    let last_id = headers
        .get("last-event-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.stream_last_ids.lock().unwrap().push(last_id);

    let status = mock.stream_status.load(Ordering::SeqCst);
    if status != 0 {
        return StatusCode::from_u16(status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
    }

    let events: Vec<Result<Event, Infallible>> = mock
        .stream_items
        .lock()
        .unwrap()
        .iter()
        .map(|item| {
            Ok(match item {
                StreamItem::Message(data) => Event::default().data(data),
                StreamItem::Named(name, data) => Event::default().event(*name).data(data),
                StreamItem::WithId(id, data) => Event::default().id(*id).data(data),
                StreamItem::Retry(delay) => Event::default().retry(*delay),
            })
        })
        .collect();

    // 送り終えたらストリームを閉じる (クライアント側の再接続を確認するため)
    Sse::new(futures_util::stream::iter(events)).into_response()
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|c| c.contains(SESSION_COOKIE))
        .unwrap_or(false)
}

async fn check_auth(headers: HeaderMap) -> Response {
    if has_session(&headers) {
        Json(json!({
            "isAuthenticated": true,
            "user": {"username": "alice", "email": "alice@example.com"}
        }))
        .into_response()
    } else {
        Json(json!({"isAuthenticated": false})).into_response()
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "secret" {
        (
            [(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/; HttpOnly"))],
            Json(json!({
                "message": "Login successful",
                "user": {"username": "alice", "email": body["email"]}
            })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid email or password."})),
        )
            .into_response()
    }
}

async fn logout(State(mock): State<Arc<MockState>>) -> Response {
    mock.logouts.fetch_add(1, Ordering::SeqCst);
    if mock.fail_logout.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "session store unavailable"})),
        )
            .into_response();
    }
    (
        [(header::SET_COOKIE, "session=; Path=/; Max-Age=0")],
        StatusCode::OK,
    )
        .into_response()
}

async fn register(State(mock): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut registered = mock.registered_emails.lock().unwrap();
    if registered.contains(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!([
                {"code": "DuplicateEmail", "description": format!("Email '{email}' is already taken.")},
                {"code": "PasswordRequiresDigit", "description": "Passwords must have at least one digit ('0'-'9')."}
            ])),
        )
            .into_response();
    }
    registered.push(email);
    StatusCode::OK.into_response()
}
