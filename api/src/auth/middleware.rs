use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode, header::USER_AGENT},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use tracing::info;

/// Logs method, path, client IP, and user-agent for each incoming request.
/// CORS preflight `OPTIONS` requests are skipped.
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    info!(
        method = %method,
        path = %path,
        ip = %addr.ip(),
        user_agent = %user_agent,
        "incoming request"
    );

    Ok(next.run(req).await)
}
