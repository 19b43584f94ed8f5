use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
}

#[derive(Deserialize)]
pub struct ItemInput {
    pub name: String,
}

/// JSON error body in the shape API servers answer with: a message, an
/// application code and an optional nested detail object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

pub struct ApiFailure {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiFailure {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                message: "item not found".to_string(),
                code: 5,
                error: None,
            },
        }
    }

    fn invalid_name() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                message: "name must not be empty".to_string(),
                code: 3,
                error: Some(serde_json::json!({ "field": "name", "reason": "empty" })),
            },
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type Db = Arc<RwLock<HashMap<Uuid, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/v2/items", get(list_items).post(create_item))
        .route("/v2/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .route("/status/{code}", get(status))
        .route("/headers", get(echo_headers))
        .route("/slow/{ms}", get(slow))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({}))
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Item>> {
    let items = db.read().await;
    Json(items.values().cloned().collect())
}

async fn create_item(
    State(db): State<Db>,
    Json(input): Json<ItemInput>,
) -> Result<(StatusCode, Json<Item>), ApiFailure> {
    if input.name.trim().is_empty() {
        return Err(ApiFailure::invalid_name());
    }
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
    };
    tracing::info!(id = %item.id, "created item");
    db.write().await.insert(item.id, item.clone());
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Item>, ApiFailure> {
    let items = db.read().await;
    items.get(&id).cloned().map(Json).ok_or_else(ApiFailure::not_found)
}

async fn update_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<ItemInput>,
) -> Result<Json<Item>, ApiFailure> {
    if input.name.trim().is_empty() {
        return Err(ApiFailure::invalid_name());
    }
    let mut items = db.write().await;
    let item = items.get_mut(&id).ok_or_else(ApiFailure::not_found)?;
    item.name = input.name;
    Ok(Json(item.clone()))
}

async fn delete_item(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiFailure> {
    let mut items = db.write().await;
    items
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(ApiFailure::not_found)
}

/// Answer with the requested status and an empty body.
async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Echo the request headers back as a JSON object, names lowercased.
/// Repeated headers are joined with ", ".
async fn echo_headers(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let mut echoed: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let value = value.to_str().unwrap_or_default();
        echoed
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    Json(echoed)
}

async fn slow(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept_ms": ms }))
}
