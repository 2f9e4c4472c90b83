use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use warp::{http::StatusCode, Filter, Reply};

use crate::{chat::ChatOrchestrator, session::Turn};

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub diagnosis_suggested: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// `POST /chat` and `GET /health`, open to any origin.
pub fn routes(
    chat: Arc<ChatOrchestrator>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    let chat_route = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_chat(chat))
        .and_then(handle_chat);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "ok"})));

    chat_route.or(health).with(cors)
}

fn with_chat(
    chat: Arc<ChatOrchestrator>,
) -> impl Filter<Extract = (Arc<ChatOrchestrator>,), Error = Infallible> + Clone {
    warp::any().map(move || chat.clone())
}

async fn handle_chat(
    request: ChatRequest,
    chat: Arc<ChatOrchestrator>,
) -> Result<warp::reply::Response, Infallible> {
    match chat.respond(request.conversation, &request.message).await {
        Ok((reply, session)) => Ok(warp::reply::json(&ChatResponse {
            response: reply.text,
            diagnosis_suggested: session.diagnosis_suggested(),
        })
        .into_response()),
        Err(e) => {
            error!("Chat turn failed: {e}");
            Ok(warp::reply::with_status(
                warp::reply::json(&ErrorResponse {
                    error: e.to_string(),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            )
            .into_response())
        }
    }
}

pub async fn serve(chat: Arc<ChatOrchestrator>, addr: SocketAddr) {
    info!("Listening on {addr}");
    warp::serve(routes(chat)).run(addr).await;
}
