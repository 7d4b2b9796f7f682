use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use super::model::{BookForm, BookWithSecret, FilterParams, SearchParams};
use super::upload;
use crate::AppState;
use crate::error::AppError;
use crate::storage::{Book, BookFilter, BookUpdate};

const BOOK_NOT_FOUND: &str = "书籍不存在";

pub async fn get_all_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.store.get_all_books().await?))
}

pub async fn search_books(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    let query = params.q.unwrap_or_default();
    Ok(Json(state.store.search_books(&query).await?))
}

pub async fn filter_books(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    let filter = BookFilter {
        subject: params.subject,
        condition: params.condition,
        free_only: params.free_only,
    };
    Ok(Json(state.store.filter_books(filter).await?))
}

pub async fn get_book_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Book>, AppError> {
    match state.store.get_book_by_id(id).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::NotFound(BOOK_NOT_FOUND.to_string())),
    }
}

/// 秘密链接视图：持有 secret_id 即所有者，返回带 secretId 的完整记录。
pub async fn get_book_by_secret(
    State(state): State<AppState>,
    Path(secret_id): Path<String>,
) -> Result<Json<BookWithSecret>, AppError> {
    match state.store.get_book_by_secret_id(&secret_id).await? {
        Some(book) => Ok(Json(book.into())),
        None => Err(AppError::NotFound(BOOK_NOT_FOUND.to_string())),
    }
}

pub async fn create_book(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BookWithSecret>), AppError> {
    let (form, image) = collect_book_form(multipart).await?;
    let image = image.ok_or_else(|| AppError::Validation("书籍图片不能为空".to_string()))?;

    // 字段先于图片落盘校验，校验不通过不留下任何痕迹
    let fields = form.validate_for_create()?;
    let image_url = upload::save_image(&state.config.upload_dir, &image).await?;

    let book = state.store.create_book(fields.into_new_book(image_url)).await?;
    tracing::info!("Book created: id={}", book.id);
    Ok((StatusCode::CREATED, Json(book.into())))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(secret_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Book>, AppError> {
    let (form, image) = collect_book_form(multipart).await?;
    let mut update = form.validate_for_update()?;

    if let Some(image) = image {
        update.image_url = Some(upload::save_image(&state.config.upload_dir, &image).await?);
    }

    match state.store.update_book_by_secret_id(&secret_id, update).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::NotFound(BOOK_NOT_FOUND.to_string())),
    }
}

/// 标记售出。重复调用只是把 sold 再次写成 true，不报错。
pub async fn mark_book_sold(
    State(state): State<AppState>,
    Path(secret_id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let update = BookUpdate {
        sold: Some(true),
        ..Default::default()
    };
    match state.store.update_book_by_secret_id(&secret_id, update).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::NotFound(BOOK_NOT_FOUND.to_string())),
    }
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(secret_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if state.store.delete_book_by_secret_id(&secret_id).await? {
        Ok(Json(json!({ "message": "书籍已删除" })))
    } else {
        Err(AppError::NotFound(BOOK_NOT_FOUND.to_string()))
    }
}

/// 举报按公开 id 操作，不需要秘密令牌。
pub async fn report_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Book>, AppError> {
    match state.store.report_book(id).await? {
        Some(book) => Ok(Json(book)),
        None => Err(AppError::NotFound(BOOK_NOT_FOUND.to_string())),
    }
}

/// 遍历 multipart 表单：image 字段取原始字节，其余按文本收集。
async fn collect_book_form(
    mut multipart: Multipart,
) -> Result<(BookForm, Option<Vec<u8>>), AppError> {
    let mut form = BookForm::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(format!("读取上传内容失败: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "image" {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Upload(format!("读取图片失败: {}", e)))?;
            image = Some(bytes.to_vec());
        } else {
            let value = field
                .text()
                .await
                .map_err(|_| AppError::Validation("表单内容无效".to_string()))?;
            form.set(&name, value);
        }
    }

    Ok((form, image))
}
