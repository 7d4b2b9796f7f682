use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use config::Config;
use storage::Store;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod storage;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
}

/// 组装完整路由。main 和集成测试共用，测试注入 MemStore。
pub fn app(state: AppState) -> Router {
    // 书籍路由全部公开：改动由秘密链接授权，不经过登录
    let public_routes = Router::new()
        .route(
            "/books",
            get(routes::book::get_all_books).post(routes::book::create_book),
        )
        .route("/books/search", get(routes::book::search_books))
        .route("/books/filter", get(routes::book::filter_books))
        .route("/books/{id}", get(routes::book::get_book_by_id))
        .route("/books/{id}/report", post(routes::book::report_book))
        .route(
            "/books/secret/{secret_id}",
            get(routes::book::get_book_by_secret)
                .put(routes::book::update_book)
                .delete(routes::book::delete_book),
        )
        .route(
            "/books/secret/{secret_id}/sold",
            put(routes::book::mark_book_sold),
        )
        .route("/users/register", post(routes::user::register))
        .route("/users/login", post(routes::user::login));

    // 需要认证的账号路由
    let protected_routes = Router::new()
        .route("/users/check-token", get(routes::user::check_token))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .nest(
            &state.config.api_base_uri,
            Router::new().merge(public_routes).merge(protected_routes),
        )
        // 上传的图片按生成的文件名静态回源
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // 留出 multipart 包装的余量，5MB 的图片上限在落盘前单独检查
        .layer(DefaultBodyLimit::max(routes::book::MAX_IMAGE_BYTES + 1024 * 1024))
        .with_state(state)
}
