use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::time::{sleep, Duration};

use crate::session::SharedStatus;

/// Embedded live view of the running session: serves a single page and
/// pushes the latest debug snapshot over a WebSocket.
pub async fn start_dashboard(shared: SharedStatus, port: u16) {
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/ws", get(ws_handler))
        .with_state(shared);

    let addr = format!("0.0.0.0:{}", port);
    eprintln!("[DASHBOARD] Starting embedded server at http://{}", addr);

    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("[DASHBOARD] server error: {}", e);
            }
        }
        Err(e) => eprintln!("[DASHBOARD] failed to bind {}: {}", addr, e),
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("dashboard_static.html"))
}

async fn ws_handler(ws: WebSocketUpgrade, State(shared): State<SharedStatus>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, shared))
}

async fn handle_socket(mut socket: WebSocket, shared: SharedStatus) {
    loop {
        let payload = {
            let snapshot = shared.lock().ok().and_then(|s| s.clone());
            snapshot.and_then(|s| serde_json::to_string(&s).ok())
        };

        if let Some(json) = payload {
            if socket.send(Message::Text(json)).await.is_err() {
                // Client disconnected
                break;
            }
        }

        sleep(Duration::from_millis(500)).await;
    }
}
