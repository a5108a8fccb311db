use crate::casting::sender::Sender;
use crate::configuration::Config;
use crate::error_handling::types::SessionError;
use crate::session_management::session_registry::SessionRegistry;
use crate::web_interface::types::*;
use std::sync::Arc;
use uuid::Uuid;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

fn error_reply(status: StatusCode, message: &str) -> warp::reply::Response {
    reply::with_status(
        reply::json(&ApiError {
            message: message.to_string(),
        }),
        status,
    )
    .into_response()
}

fn session_error_reply(error: &SessionError) -> warp::reply::Response {
    let status = match error {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SessionError::LimitReached | SessionError::ResourceExhaustion(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    error_reply(status, &error.to_string())
}

/// GET /
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end().and(warp::get()).and_then(|| async move {
        let html = r#"<html><head><title>webcast</title></head>
                <body><h1>webcast is running</h1><p>See /sessions for JSON.</p></body></html>"#;
        Ok::<_, Rejection>(reply::html(html))
    })
}

/// GET /healthz
pub fn healthz_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(|| async move {
            Ok::<_, Rejection>(reply::json(&serde_json::json!({ "ok": true })))
        })
}

/// POST /sessions
pub fn create_session_route(
    registry: Arc<SessionRegistry>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("sessions")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and_then(move |request: StartRequest| {
            let registry = registry.clone();
            let config = config.clone();
            async move {
                let session_config = match request.into_session_config(&config.receiver) {
                    Ok(session_config) => session_config,
                    Err(e) => return Ok::<_, Rejection>(session_error_reply(&e)),
                };
                let res = match registry.create(session_config) {
                    Ok(record) => reply::with_status(
                        reply::json(&SessionStatus::from_record(&record)),
                        StatusCode::OK,
                    )
                    .into_response(),
                    Err(e) => session_error_reply(&e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /sessions
pub fn list_sessions_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("sessions")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let registry = registry.clone();
            async move {
                let sessions = registry
                    .list()
                    .iter()
                    .map(SessionStatus::from_record)
                    .collect();
                Ok::<_, Rejection>(reply::json(&SessionListResponse { sessions }))
            }
        })
}

/// GET /sessions/:id/status
pub fn session_status_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("sessions" / String / "status")
        .and(warp::get())
        .and_then(move |id_str: String| {
            let registry = registry.clone();
            async move {
                let id = match Uuid::parse_str(&id_str) {
                    Ok(id) => id,
                    Err(_) => {
                        return Ok::<_, Rejection>(error_reply(
                            StatusCode::BAD_REQUEST,
                            "Invalid session id",
                        ))
                    }
                };
                let res = match registry.get(id) {
                    Some(record) => reply::with_status(
                        reply::json(&SessionStatus::from_record(&record)),
                        StatusCode::OK,
                    )
                    .into_response(),
                    None => error_reply(StatusCode::NOT_FOUND, "Session not found"),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// DELETE /sessions/:id
pub fn stop_session_route(
    registry: Arc<SessionRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("sessions" / String)
        .and(warp::delete())
        .and_then(move |id_str: String| {
            let registry = registry.clone();
            async move {
                let id = match Uuid::parse_str(&id_str) {
                    Ok(id) => id,
                    Err(_) => {
                        return Ok::<_, Rejection>(error_reply(
                            StatusCode::BAD_REQUEST,
                            "Invalid session id",
                        ))
                    }
                };
                let res = match registry.stop(id).await {
                    Ok(record) => reply::json(&StopResponse {
                        ok: true,
                        state: record.state,
                    })
                    .into_response(),
                    Err(e) => session_error_reply(&e),
                };
                Ok::<_, Rejection>(res)
            }
        })
}

/// GET /receivers
pub fn receivers_route(
    sender: Arc<Sender>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("receivers")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let sender = sender.clone();
            async move {
                let receivers = sender.discover().await;
                Ok::<_, Rejection>(reply::json(&ReceiverListResponse { receivers }))
            }
        })
}

/// True for names the artifact route is willing to serve: plain playlist or
/// segment files, nothing that could escape the session directory and none
/// of the browser scratch living alongside them.
fn servable_artifact(name: &str) -> bool {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return false;
    }
    name.ends_with(".m3u8") && name.len() > 5 || name.ends_with(".ts") && name.len() > 3
}

/// GET /cast/:id/:file — static retrieval of a session's output artifacts.
pub fn artifact_route(
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("cast" / String / String)
        .and(warp::get())
        .and_then(move |id_str: String, file: String| {
            let config = config.clone();
            async move {
                let id = match Uuid::parse_str(&id_str) {
                    Ok(id) => id,
                    Err(_) => {
                        return Ok::<_, Rejection>(error_reply(
                            StatusCode::NOT_FOUND,
                            "Unknown artifact",
                        ))
                    }
                };
                if !servable_artifact(&file) {
                    return Ok::<_, Rejection>(error_reply(
                        StatusCode::NOT_FOUND,
                        "Unknown artifact",
                    ));
                }

                let path = config
                    .sessions_root
                    .join(id.simple().to_string())
                    .join(&file);
                let res = match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        let content_type = if file.ends_with(".m3u8") {
                            String::from("application/vnd.apple.mpegurl")
                        } else {
                            mime_guess::from_path(&file)
                                .first_or_octet_stream()
                                .to_string()
                        };
                        // Playlists mutate constantly; receivers must re-poll.
                        let cache_control = if file.ends_with(".m3u8") {
                            "no-store"
                        } else {
                            "max-age=60"
                        };
                        reply::with_header(
                            reply::with_header(bytes, "Content-Type", content_type),
                            "Cache-Control",
                            cache_control,
                        )
                        .into_response()
                    }
                    Err(_) => error_reply(StatusCode::NOT_FOUND, "Unknown artifact"),
                };
                Ok::<_, Rejection>(res)
            }
        })
}
