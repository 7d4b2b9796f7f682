use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::error;

/// 记录服务端错误，便于在日志里定位 5xx。
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    if response.status().is_server_error() {
        error!("{} {} responded with {}", method, path, response.status());
    }

    response
}
