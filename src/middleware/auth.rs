use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AppState, error::AppError, utils};

/// 校验 Bearer 令牌并把 Claims 注入请求扩展。
/// 只挂在账号相关路由上；书籍操作一律不经过这里。
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(AppError::Unauthorized("缺少认证令牌".to_string()));
    };

    let claims = utils::verify_token(bearer.token(), &state.config)
        .map_err(|_| AppError::Unauthorized("认证令牌无效或已过期".to_string()))?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
