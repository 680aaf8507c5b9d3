//! The `--backstage <port>` HTTP inspection server (`spec.md` §6): a
//! localhost-only `axum` router exposing a handful of read-only endpoints
//! over the kernel's live state. Grounded on `peeps-web`'s/`moire-web`'s
//! axum router shape, trimmed to plain-text responses since a handful of
//! diagnostic lines doesn't warrant a JSON body; reflection over the
//! kernel's types (class/field/object snapshots) goes through
//! `facet::Facet`, not this endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use parasol_runtime::Core;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

#[derive(Clone)]
struct BackstageState {
    core: Arc<Core>,
}

fn router(core: Arc<Core>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .with_state(BackstageState { core })
}

async fn index() -> &'static str {
    "parasol backstage: see /status\n"
}

async fn status(State(state): State<BackstageState>) -> String {
    format!(
        "classes: {}\nobjects: {}\nmemory_allocations: {}\n",
        state.core.classes.class_count(),
        state.core.objects.object_count(),
        state.core.ledger.outstanding_count(),
    )
}

/// Binds and serves the backstage router on `127.0.0.1:<port>` until the
/// process is asked to shut down. Only ever binds the loopback address —
/// the inspection endpoint is not meant to be reachable off-box.
pub async fn serve(port: u16, core: Arc<Core>) -> std::io::Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "backstage inspection server listening");
    axum::serve(listener, router(core)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use parasol_runtime::{open_core, OpenCoreArgs};

    #[tokio::test]
    async fn status_endpoint_reports_an_empty_core() {
        let core = open_core(OpenCoreArgs::default()).unwrap();
        let state = BackstageState { core };
        let body = status(State(state)).await;
        assert!(body.contains("classes: 0"));
        assert!(body.contains("objects: 0"));
    }

    #[test]
    fn router_builds_without_panicking() {
        let core = open_core(OpenCoreArgs::default()).unwrap();
        let _ = router(core);
    }
}
