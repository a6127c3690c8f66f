//! HTTP server exposing the task and user routes.

mod envelope;
mod routes;
pub mod session;

pub use envelope::Envelope;

use crate::accounts::AccountService;
use crate::config::SessionConfig;
use crate::db::Database;
use crate::error::ApiResult;
use crate::guards::RequestContext;
use crate::lifecycle::TaskService;
use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    tasks: TaskService,
    accounts: AccountService,
    cookie_name: Arc<str>,
}

impl AppState {
    pub fn new(db: Arc<Database>, session: &SessionConfig) -> Self {
        Self {
            tasks: TaskService::new(Arc::clone(&db)),
            accounts: AccountService::new(Arc::clone(&db), session.ttl_secs()),
            cookie_name: Arc::from(session.cookie_name.as_str()),
            db,
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Build the guard context for a request from its session cookie.
    fn context(&self, headers: &HeaderMap) -> ApiResult<RequestContext> {
        let user = match session::read_cookie(headers, &self.cookie_name) {
            Some(token) => self.accounts.resolve(&token)?,
            None => None,
        };
        Ok(RequestContext::new(user))
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Tasks
        .route("/tasks", post(routes::create_task))
        .route("/tasks/", post(routes::create_task))
        .route(
            "/tasks/{task_id}",
            get(routes::show_task)
                .put(routes::edit_task)
                .delete(routes::delete_task),
        )
        // Users
        .route("/users", post(routes::register))
        .route("/users/", post(routes::register))
        .route("/users/login", post(routes::login))
        .route("/users/amILoggedIn", get(routes::am_i_logged_in))
        .route("/users/logOut", get(routes::logout))
        .route("/health", get(routes::health))
        .fallback(routes::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on `addr`.
///
/// Returns a sender that triggers graceful shutdown, the bound address, and
/// the serving task.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr, JoinHandle<()>)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task server shutting down");
            })
            .await
        {
            tracing::error!("Task server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr, handle))
}

/// Periodically delete expired sessions.
pub fn spawn_session_reaper(db: Arc<Database>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match db.purge_expired_sessions() {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "expired sessions purged"),
                Err(e) => warn!("Failed to purge expired sessions: {}", e),
            }
        }
    })
}
