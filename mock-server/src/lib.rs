use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
}

/// Body of `POST /users/search`; an absent field matches everything.
#[derive(Deserialize)]
pub struct UserQuery {
    pub name: Option<String>,
}

#[derive(Deserialize, Serialize)]
pub struct Message {
    pub message: String,
}

/// Envelope used by the `/wrapped` routes.
#[derive(Serialize)]
pub struct Wrapped<T> {
    pub data: T,
}

pub type Db = Arc<RwLock<BTreeMap<u32, User>>>;

/// Three users, `user-1` to `user-3`, keyed by id.
pub fn seed() -> BTreeMap<u32, User> {
    (1..=3)
        .map(|id| {
            (
                id,
                User {
                    id,
                    name: format!("user-{id}"),
                },
            )
        })
        .collect()
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/search", post(search_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/wrapped/users", get(list_users_wrapped))
        .route("/wrapped/users/{id}", get(get_user_wrapped))
        .route("/messages", post(echo_message))
        .route("/empty", get(empty))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.read().await;
    Json(users.values().cloned().collect())
}

async fn list_users_wrapped(State(db): State<Db>) -> Json<Wrapped<Vec<User>>> {
    let users = db.read().await;
    Json(Wrapped {
        data: users.values().cloned().collect(),
    })
}

async fn search_users(
    State(db): State<Db>,
    Json(query): Json<UserQuery>,
) -> Json<Vec<User>> {
    let users = db.read().await;
    Json(
        users
            .values()
            .filter(|u| query.name.as_ref().map_or(true, |name| &u.name == name))
            .cloned()
            .collect(),
    )
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> (StatusCode, Json<User>) {
    let mut users = db.write().await;
    let id = users.keys().next_back().map_or(1, |last| last + 1);
    let user = User {
        id,
        name: input.name,
    };
    users.insert(id, user.clone());
    (StatusCode::CREATED, Json(user))
}

async fn get_user(
    State(db): State<Db>,
    Path(id): Path<u32>,
) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn get_user_wrapped(
    State(db): State<Db>,
    Path(id): Path<u32>,
) -> Result<Json<Wrapped<User>>, StatusCode> {
    let users = db.read().await;
    users
        .get(&id)
        .cloned()
        .map(|data| Json(Wrapped { data }))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u32>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, StatusCode> {
    let mut users = db.write().await;
    let user = users.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        user.name = name;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(
    State(db): State<Db>,
    Path(id): Path<u32>,
) -> Result<Json<Value>, StatusCode> {
    let mut users = db.write().await;
    users
        .remove(&id)
        .map(|user| Json(json!({ "deleted": user.id })))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn echo_message(Json(input): Json<Message>) -> (StatusCode, Json<Message>) {
    (StatusCode::CREATED, Json(input))
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}
