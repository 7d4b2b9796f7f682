use axum::{
    Json,
    extract::{Extension, State},
    http::StatusCode,
};

use super::model::{AuthResponse, CheckTokenResponse, LoginRequest, RegisterRequest};
use crate::AppState;
use crate::error::AppError;
use crate::storage::StoreError;
use crate::utils::{self, Claims};

/// 账号只用于登录态，和书籍所有权无关：编辑权来自秘密链接。
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    // 用户名只允许字母、数字和下划线
    if req.username.chars().count() < 2
        || req.username.chars().count() > 24
        || !req.username.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "用户名格式无效，只允许使用字母、数字和下划线".to_string(),
        ));
    }
    if req.password.len() < 6 || req.password.len() > 24 {
        return Err(AppError::Validation(
            "密码长度必须在6到24个字符之间".to_string(),
        ));
    }

    let password_hash = utils::hash_password(&req.password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::Storage("内部服务器错误".to_string())
    })?;

    let user = match state.store.create_user(&req.username, &password_hash).await {
        Ok(user) => user,
        Err(StoreError::Duplicate) => {
            return Err(AppError::Validation("用户名已存在".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let token = utils::generate_token(&user.username, &state.config)
        .map_err(|_| AppError::Storage("生成令牌失败".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            username: user.username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .store
        .get_user_by_username(&req.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("用户名或密码错误".to_string()))?;

    match utils::verify_password(&req.password, &user.password) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::Unauthorized("用户名或密码错误".to_string())),
        Err(e) => {
            tracing::error!("Password verification failed: {}", e);
            return Err(AppError::Storage("内部服务器错误".to_string()));
        }
    }

    let token = utils::generate_token(&user.username, &state.config)
        .map_err(|_| AppError::Storage("生成令牌失败".to_string()))?;

    Ok(Json(AuthResponse {
        username: user.username,
        token,
    }))
}

/// 令牌已由中间件验证，直接回显当前用户。
pub async fn check_token(
    Extension(claims): Extension<Claims>,
) -> Result<Json<CheckTokenResponse>, AppError> {
    Ok(Json(CheckTokenResponse {
        username: claims.sub,
    }))
}
