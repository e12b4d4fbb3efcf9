//! In-memory Parse REST server for local development and integration tests.
//!
//! Serves `/1/classes/{class}` and `/1/classes/{class}/{id}` with the same
//! status codes and JSON shapes as Parse, and rejects any request whose
//! credential headers do not match the configured keys.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub const APPLICATION_ID_HEADER: &str = "x-parse-application-id";
pub const REST_API_KEY_HEADER: &str = "x-parse-rest-api-key";

/// Parse error code for a missing object.
pub const OBJECT_NOT_FOUND: i64 = 101;
/// Parse error code for a malformed `where` parameter.
pub const INVALID_QUERY: i64 = 102;

pub type ParseObject = Map<String, Value>;

/// Objects by class name, then by object id.
pub type Db = Arc<RwLock<HashMap<String, HashMap<String, ParseObject>>>>;

/// Keys a client must present.
#[derive(Clone, Debug)]
pub struct AppKeys {
    pub application_id: String,
    pub rest_api_key: String,
}

#[derive(Clone)]
pub struct AppState {
    db: Db,
    keys: Arc<AppKeys>,
}

type Failure = (StatusCode, Json<Value>);
type Reply = Result<(StatusCode, Json<Value>), Failure>;

pub fn app(keys: AppKeys) -> Router {
    let state = AppState {
        db: Db::default(),
        keys: Arc::new(keys),
    };
    Router::new()
        .route("/1/classes/{class}", get(list_objects).post(create_object))
        .route(
            "/1/classes/{class}/{id}",
            get(get_object).put(update_object).delete(delete_object),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_credentials))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener, keys: AppKeys) -> Result<(), std::io::Error> {
    axum::serve(listener, app(keys)).await
}

/// Runs before any extractor, so a bad body never masks a missing key.
async fn require_credentials(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Failure> {
    authorize(request.headers(), &state.keys)?;
    Ok(next.run(request).await)
}

fn authorize(headers: &HeaderMap, keys: &AppKeys) -> Result<(), Failure> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if header(APPLICATION_ID_HEADER) == Some(keys.application_id.as_str())
        && header(REST_API_KEY_HEADER) == Some(keys.rest_api_key.as_str())
    {
        return Ok(());
    }
    tracing::warn!("rejected request with missing or wrong credentials");
    Err((StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))))
}

fn not_found(verb: &str) -> Failure {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"code": OBJECT_NOT_FOUND, "error": format!("object not found for {verb}")})),
    )
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn new_object_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

async fn list_objects(
    State(state): State<AppState>,
    Path(class): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let constraints = match params.get("where") {
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({"code": INVALID_QUERY, "error": "invalid JSON in where"})),
                ))
            }
        },
        None => Map::new(),
    };

    let db = state.db.read().await;
    let results: Vec<Value> = db
        .get(&class)
        .map(|objects| {
            objects
                .values()
                .filter(|obj| matches_where(obj, &constraints))
                .cloned()
                .map(Value::Object)
                .collect()
        })
        .unwrap_or_default();
    Ok((StatusCode::OK, Json(json!({ "results": results }))))
}

async fn create_object(
    State(state): State<AppState>,
    Path(class): Path<String>,
    Json(mut input): Json<ParseObject>,
) -> Reply {
    let id = new_object_id();
    let created_at = now();
    input.insert("objectId".to_string(), json!(id));
    input.insert("createdAt".to_string(), json!(created_at));
    input.insert("updatedAt".to_string(), json!(created_at));
    state
        .db
        .write()
        .await
        .entry(class)
        .or_default()
        .insert(id.clone(), input);
    Ok((
        StatusCode::CREATED,
        Json(json!({"objectId": id, "createdAt": created_at})),
    ))
}

async fn get_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
) -> Reply {
    let db = state.db.read().await;
    let obj = db
        .get(&class)
        .and_then(|objects| objects.get(&id))
        .ok_or_else(|| not_found("get"))?;
    Ok((StatusCode::OK, Json(Value::Object(obj.clone()))))
}

async fn update_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
    Json(input): Json<ParseObject>,
) -> Reply {
    let mut db = state.db.write().await;
    let obj = db
        .get_mut(&class)
        .and_then(|objects| objects.get_mut(&id))
        .ok_or_else(|| not_found("update"))?;
    for (key, value) in input {
        if key != "objectId" && key != "createdAt" {
            obj.insert(key, value);
        }
    }
    let updated_at = now();
    obj.insert("updatedAt".to_string(), json!(updated_at));
    Ok((StatusCode::OK, Json(json!({ "updatedAt": updated_at }))))
}

async fn delete_object(
    State(state): State<AppState>,
    Path((class, id)): Path<(String, String)>,
) -> Reply {
    let mut db = state.db.write().await;
    db.get_mut(&class)
        .and_then(|objects| objects.remove(&id))
        .ok_or_else(|| not_found("delete"))?;
    Ok((StatusCode::OK, Json(json!({}))))
}

/// Evaluate a decoded `where` object against one stored object.
pub fn matches_where(obj: &ParseObject, constraints: &Map<String, Value>) -> bool {
    constraints.iter().all(|(field, expected)| {
        let actual = obj.get(field);
        match expected {
            Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                ops.iter().all(|(op, operand)| matches_operator(actual, op, operand))
            }
            _ => actual == Some(expected),
        }
    })
}

fn matches_operator(actual: Option<&Value>, op: &str, operand: &Value) -> bool {
    match op {
        "$ne" => actual != Some(operand),
        "$exists" => actual.is_some() == operand.as_bool().unwrap_or(false),
        "$in" => operand
            .as_array()
            .is_some_and(|options| actual.is_some_and(|a| options.contains(a))),
        "$nin" => operand
            .as_array()
            .is_some_and(|options| !actual.is_some_and(|a| options.contains(a))),
        "$lt" | "$lte" | "$gt" | "$gte" => match (actual.and_then(Value::as_f64), operand.as_f64()) {
            (Some(a), Some(b)) => match op {
                "$lt" => a < b,
                "$lte" => a <= b,
                "$gt" => a > b,
                _ => a >= b,
            },
            _ => false,
        },
        _ => false,
    }
}
