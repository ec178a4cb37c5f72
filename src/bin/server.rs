use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use muncher_server::constants::TICK_MS;
use muncher_server::engine::GameSession;
use muncher_server::score_store::ScoreStore;
use muncher_server::server_protocol::{parse_client_message, ParsedClientMessage};
use muncher_server::types::{InputState, SessionState, SoundCue};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// One connected editor/player. Every client owns a private session; the
/// shared tick loop drives them all.
struct ClientContext {
    tx: mpsc::Sender<OutboundMessage>,
    session: GameSession,
    input: InputState,
    name: String,
    /// Share code of the level currently being played, recorded on game end.
    active_level_code: Option<String>,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    score_store: ScoreStore,
    /// Share code every new connection boots straight into, when set.
    boot_level: Option<String>,
}

impl ServerState {
    fn new(score_store: ScoreStore, boot_level: Option<String>) -> Self {
        Self {
            clients: HashMap::new(),
            score_store,
            boot_level,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoresQuery {
    limit: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let scores_path = std::env::var("SCORE_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/scores.json"));

    let boot_level = std::env::var("BOOT_LEVEL").ok().filter(|code| {
        let ok = muncher_server::codec::decode(code).is_ok();
        if !ok {
            warn!("BOOT_LEVEL is not a valid share code; ignoring");
        }
        ok
    });

    let state = Arc::new(Mutex::new(ServerState::new(
        ScoreStore::new(scores_path),
        boot_level,
    )));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/scores", get(scores_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        info!("static file root: {}", static_dir.to_string_lossy());
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        warn!("static file root not found; serving API only");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!("listening on :{port}");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("public"), PathBuf::from("../public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn scores_handler(
    State(state): State<SharedState>,
    Query(query): Query<ScoresQuery>,
) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(
        guard
            .score_store
            .build_response(parse_scores_limit(query.limit.as_deref())),
    )
}

fn parse_scores_limit(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|value| value.parse::<usize>().ok())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    {
        let mut guard = state.lock().await;
        let mut session = GameSession::new(rand::random());
        let mut active_level_code = None;
        // A configured boot level drops the client straight into a game.
        if let Some(code) = guard.boot_level.as_deref() {
            if session.load_level(code).is_ok() && session.run().is_ok() {
                active_level_code = Some(session.share());
            } else {
                warn!("boot level rejected for {client_id}");
            }
        }
        guard.clients.insert(
            client_id.clone(),
            ClientContext {
                tx: tx.clone(),
                session,
                input: InputState::default(),
                name: "Player".to_string(),
                active_level_code,
            },
        );
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        guard.clients.remove(&client_id);
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    let Some(client) = guard.clients.get_mut(client_id) else {
        return;
    };

    match message {
        ParsedClientMessage::Hello { name } => {
            client.name = sanitize_name(name.as_deref().unwrap_or(""));
            let payload = json!({
                "type": "welcome",
                "clientId": client_id,
                "name": client.name,
            });
            send_to_client(&mut guard, client_id, &payload, QueuePolicy::DisconnectOnFull);
        }
        ParsedClientMessage::Input { input } => {
            client.input = input;
        }
        ParsedClientMessage::Paint { row, col, value } => {
            client.session.paint(row, col, value);
        }
        ParsedClientMessage::Run => match client.session.run() {
            Ok(()) => {
                client.active_level_code = Some(client.session.share());
                client.input = InputState::default();
            }
            Err(error) => {
                let payload = json!({
                    "type": "error",
                    "message": error.to_string(),
                });
                send_to_client(&mut guard, client_id, &payload, QueuePolicy::DisconnectOnFull);
            }
        },
        ParsedClientMessage::Edit => {
            client.session.edit();
            client.active_level_code = None;
        }
        ParsedClientMessage::ClearLevel => {
            client.session.clear_level();
        }
        ParsedClientMessage::Share => {
            let payload = json!({
                "type": "share",
                "code": client.session.share(),
            });
            send_to_client(&mut guard, client_id, &payload, QueuePolicy::DisconnectOnFull);
        }
        ParsedClientMessage::LoadLevel { code } => {
            if let Err(error) = client.session.load_level(&code) {
                let payload = json!({
                    "type": "error",
                    "message": error.to_string(),
                });
                send_to_client(&mut guard, client_id, &payload, QueuePolicy::DisconnectOnFull);
            } else {
                client.active_level_code = None;
            }
        }
        ParsedClientMessage::SetLevel { level } => {
            client.session.set_level(level);
        }
        ParsedClientMessage::Ping { t } => {
            let payload = json!({
                "type": "pong",
                "t": t,
            });
            send_to_client(&mut guard, client_id, &payload, QueuePolicy::DisconnectOnFull);
        }
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_sessions(&mut guard);
        }
    });
}

fn tick_sessions(state: &mut ServerState) {
    let client_ids: Vec<String> = state.clients.keys().cloned().collect();
    for client_id in client_ids {
        let (payload, finished) = {
            let Some(client) = state.clients.get_mut(&client_id) else {
                continue;
            };
            let input = client.input;
            client.session.tick(input);
            let snapshot = client.session.build_snapshot(true);
            let finished = client.active_level_code.as_ref().and_then(|code| {
                if snapshot.state == SessionState::Editor {
                    let won = snapshot.events.contains(&SoundCue::Win);
                    Some((code.clone(), snapshot.score, won))
                } else {
                    None
                }
            });
            (
                json!({
                    "type": "state",
                    "snapshot": snapshot,
                }),
                finished,
            )
        };

        if let Some((code, score, won)) = finished {
            state.score_store.record_game(&code, score, won);
            if let Some(client) = state.clients.get_mut(&client_id) {
                client.active_level_code = None;
            }
        }

        send_to_client(state, &client_id, &payload, QueuePolicy::DropOnFull);
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        if let Some(client) = state.clients.remove(client_id) {
            let _ = client.tx.try_send(OutboundMessage::Close {
                code: 1008,
                reason: "outbound queue overflow".to_string(),
            });
        }
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    let payload = json!({
        "type": "error",
        "message": message,
    });
    send_to_client(&mut guard, client_id, &payload, QueuePolicy::DisconnectOnFull);
}

fn sanitize_name(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(16).collect()
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_defaults_and_truncates() {
        assert_eq!(sanitize_name("  "), "Player");
        assert_eq!(sanitize_name(" Dac "), "Dac");
        assert_eq!(sanitize_name("abcdefghijklmnopqrstuvwxyz").len(), 16);
    }

    #[test]
    fn scores_limit_parsing_is_lenient_for_invalid_values() {
        assert_eq!(parse_scores_limit(Some("8")), Some(8));
        assert_eq!(parse_scores_limit(Some("abc")), None);
        assert_eq!(parse_scores_limit(Some("-1")), None);
        assert_eq!(parse_scores_limit(None), None);
    }

    #[test]
    fn make_id_is_monotonic() {
        let a = make_id("client");
        let b = make_id("client");
        assert_ne!(a, b);
    }
}
