use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::storage::StoreError;

#[derive(Debug)]
pub enum AppError {
    /// 字段缺失或格式错误
    Validation(String),
    /// id 或 secret_id 对应的记录不存在
    NotFound(String),
    /// 图片过大、为空或类型不支持
    Upload(String),
    /// 认证令牌缺失或无效
    Unauthorized(String),
    /// 持久层故障，不重试
    Storage(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) | AppError::Upload(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::Validation("记录已存在".to_string()),
            err => {
                tracing::error!("Storage failure: {}", err);
                AppError::Storage("内部服务器错误".to_string())
            }
        }
    }
}
