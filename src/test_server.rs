//! In-process users API for tests, bound to an ephemeral port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use url::Url;

use crate::types::{User, UserFields};

#[derive(Clone, Default)]
struct ServerState {
    users: Arc<RwLock<Vec<User>>>,
    silent: Arc<AtomicBool>,
}

pub struct TestServer {
    url: Url,
    state: ServerState,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = ServerState::default();
        let app = Router::new()
            .route("/users", get(list_users).post(create_user))
            .route("/users/{id}", put(update_user).delete(delete_user))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: Url::parse(&format!("http://{addr}")).unwrap(),
            state,
        }
    }

    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// When false, create and update answer with an empty body.
    pub fn set_echo_bodies(&self, echo: bool) {
        self.state.silent.store(!echo, Ordering::SeqCst);
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.users.read().await.clone()
    }
}

async fn list_users(State(state): State<ServerState>) -> Json<Vec<User>> {
    Json(state.users.read().await.clone())
}

async fn create_user(State(state): State<ServerState>, Json(user): Json<User>) -> Response {
    state.users.write().await.push(user.clone());
    if state.silent.load(Ordering::SeqCst) {
        return StatusCode::CREATED.into_response();
    }
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn update_user(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(fields): Json<UserFields>,
) -> Response {
    let mut users = state.users.write().await;
    let Some(user) = users.iter_mut().find(|u| u.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    *user = fields.with_id(id);
    if state.silent.load(Ordering::SeqCst) {
        return StatusCode::OK.into_response();
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(state): State<ServerState>, Path(id): Path<String>) -> StatusCode {
    let mut users = state.users.write().await;
    let before = users.len();
    users.retain(|u| u.id != id);
    if users.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}
