use std::future::Future;

use axum::{middleware, Router};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{middlewares::require_api_key, rest, AppState};

/// Largest accepted request body, 4 GiB.
pub const DEFAULT_BODY_LIMIT: u64 = 4 * 1024 * 1024 * 1024;

pub struct FilesApp {
    pub state: AppState,
    pub router: Router<()>,
}

impl FilesApp {
    pub fn new(state: AppState) -> Self {
        Self::with_body_limit(state, DEFAULT_BODY_LIMIT)
    }

    /// Uploads larger than `body_limit` bytes are refused with 413.
    pub fn with_body_limit(mut state: AppState, body_limit: u64) -> Self {
        state.body_limit = body_limit;

        let files = rest::files_router()
            .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

        let router = Router::new()
            .nest("/api/v1/files", files)
            .with_state(state.clone())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        self.listen_with_shutdown(addr, std::future::pending()).await
    }

    /// Serve until `shutdown` resolves, letting in-flight requests finish.
    pub async fn listen_with_shutdown<A, F>(self, addr: A, shutdown: F) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
