use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::storage::{Book, BookUpdate, NewBook};

pub const CONDITIONS: [&str; 2] = ["New", "Used"];

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub subject: Option<String>,
    pub condition: Option<String>,
    #[serde(default)]
    pub free_only: bool,
}

/// 创建/获取秘密链接时返回给所有者的视图，带 secretId。
/// 公开列表接口返回的 Book 不包含该字段。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookWithSecret {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub condition: String,
    pub price: i32,
    pub phone: String,
    pub image_url: String,
    pub sold: bool,
    pub secret_id: String,
    pub report_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Book> for BookWithSecret {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            subject: book.subject,
            condition: book.condition,
            price: book.price,
            phone: book.phone,
            image_url: book.image_url,
            sold: book.sold,
            secret_id: book.secret_id,
            report_count: book.report_count,
            created_at: book.created_at,
        }
    }
}

/// multipart 表单收集到的文本字段，全部可选，校验时再区分创建/更新。
#[derive(Debug, Default)]
pub struct BookForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub condition: Option<String>,
    pub price: Option<String>,
    pub phone: Option<String>,
}

/// 通过全部校验的创建字段。
#[derive(Debug)]
pub struct CreateFields {
    title: String,
    author: String,
    subject: String,
    condition: String,
    price: i32,
    phone: String,
}

impl CreateFields {
    pub fn into_new_book(self, image_url: String) -> NewBook {
        NewBook {
            title: self.title,
            author: self.author,
            subject: self.subject,
            condition: self.condition,
            price: self.price,
            phone: self.phone,
            image_url,
        }
    }
}

impl BookForm {
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = Some(value),
            "author" => self.author = Some(value),
            "subject" => self.subject = Some(value),
            "condition" => self.condition = Some(value),
            "price" => self.price = Some(value),
            "phone" => self.phone = Some(value),
            _ => {}
        }
    }

    /// 创建校验：所有字段必填，且满足格式要求。
    /// 必须在图片落盘和写库之前调用。
    pub fn validate_for_create(self) -> Result<CreateFields, AppError> {
        let title = require(self.title, "书名不能为空")?;
        let author = require(self.author, "作者不能为空")?;
        let subject = require(self.subject, "科目不能为空")?;
        let condition = require(self.condition, "成色不能为空")?;
        let phone = require(self.phone, "手机号不能为空")?;

        validate_title(&title)?;
        validate_author(&author)?;
        validate_subject(&subject)?;
        validate_condition(&condition)?;
        validate_phone(&phone)?;
        let price = parse_price(self.price.as_deref())?;

        Ok(CreateFields {
            title,
            author,
            subject,
            condition,
            price,
            phone,
        })
    }

    /// 更新校验：只校验客户端提供的字段，未提供的保留原值。
    /// sold 不在这里出现，更新操作不会改动售出状态。
    pub fn validate_for_update(self) -> Result<BookUpdate, AppError> {
        let mut update = BookUpdate::default();

        if let Some(title) = self.title {
            validate_title(&title)?;
            update.title = Some(title);
        }
        if let Some(author) = self.author {
            validate_author(&author)?;
            update.author = Some(author);
        }
        if let Some(subject) = self.subject {
            validate_subject(&subject)?;
            update.subject = Some(subject);
        }
        if let Some(condition) = self.condition {
            validate_condition(&condition)?;
            update.condition = Some(condition);
        }
        if let Some(price) = self.price.as_deref() {
            update.price = Some(parse_price(Some(price))?);
        }
        if let Some(phone) = self.phone {
            validate_phone(&phone)?;
            update.phone = Some(phone);
        }

        Ok(update)
    }
}

fn require(value: Option<String>, message: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.chars().count() < 2 {
        return Err(AppError::Validation("书名至少需要2个字符".to_string()));
    }
    Ok(())
}

fn validate_author(author: &str) -> Result<(), AppError> {
    if author.chars().count() < 2 {
        return Err(AppError::Validation("作者至少需要2个字符".to_string()));
    }
    Ok(())
}

fn validate_subject(subject: &str) -> Result<(), AppError> {
    if subject.chars().count() < 2 {
        return Err(AppError::Validation("科目至少需要2个字符".to_string()));
    }
    Ok(())
}

fn validate_condition(condition: &str) -> Result<(), AppError> {
    if !CONDITIONS.contains(&condition) {
        return Err(AppError::Validation("成色必须为 New 或 Used".to_string()));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), AppError> {
    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("手机号必须为10位数字".to_string()));
    }
    Ok(())
}

/// 价格解析：无法解析的输入按 0 处理，负数直接拒绝。
fn parse_price(raw: Option<&str>) -> Result<i32, AppError> {
    let price = raw
        .map(|p| p.trim().parse::<i32>().unwrap_or(0))
        .unwrap_or(0);
    if price < 0 {
        return Err(AppError::Validation("价格不能为负数".to_string()));
    }
    Ok(price)
}
