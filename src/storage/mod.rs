pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use memory::MemStore;
pub use postgres::PgStore;

// 科目/成色过滤的哨兵值，表示"不限"
pub const SUBJECT_ALL: &str = "All Subjects";
pub const CONDITION_ALL: &str = "All";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub subject: String,
    pub condition: String,
    pub price: i32,
    pub phone: String,
    pub image_url: String,
    pub sold: bool,
    // 秘密链接令牌，持有者即所有者；公开序列化时不输出
    #[serde(skip_serializing, default)]
    pub secret_id: String,
    pub report_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// 创建书籍时由调用方提供的字段。
/// id、secret_id、sold、report_count、created_at 由存储层生成。
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub condition: String,
    pub price: i32,
    pub phone: String,
    pub image_url: String,
}

/// 部分更新：None 表示保留原值。
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub condition: Option<String>,
    pub price: Option<i32>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub sold: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub subject: Option<String>,
    pub condition: Option<String>,
    pub free_only: bool,
}

impl BookFilter {
    /// 把哨兵值（"All Subjects" / "All"）归一化为"无约束"。
    pub fn subject_constraint(&self) -> Option<&str> {
        self.subject
            .as_deref()
            .filter(|s| !s.is_empty() && *s != SUBJECT_ALL)
    }

    pub fn condition_constraint(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .filter(|c| !c.is_empty() && *c != CONDITION_ALL)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("record already exists")]
    Duplicate,
    #[error("storage backend failure: {0}")]
    Internal(String),
}

/// 存储访问层：唯一允许接触持久化数据的入口。
/// 生产环境注入 PgStore，测试注入 MemStore。
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_all_books(&self) -> Result<Vec<Book>, StoreError>;

    async fn get_book_by_id(&self, id: i32) -> Result<Option<Book>, StoreError>;

    async fn get_book_by_secret_id(&self, secret_id: &str) -> Result<Option<Book>, StoreError>;

    async fn create_book(&self, book: NewBook) -> Result<Book, StoreError>;

    async fn update_book_by_secret_id(
        &self,
        secret_id: &str,
        update: BookUpdate,
    ) -> Result<Option<Book>, StoreError>;

    /// 硬删除，返回是否确实删掉了一条记录。
    async fn delete_book_by_secret_id(&self, secret_id: &str) -> Result<bool, StoreError>;

    /// 举报计数 +1，按公开 id 操作，不需要秘密令牌。
    async fn report_book(&self, id: i32) -> Result<Option<Book>, StoreError>;

    /// 标题或作者的大小写不敏感子串匹配；空查询返回全部。
    async fn search_books(&self, query: &str) -> Result<Vec<Book>, StoreError>;

    async fn filter_books(&self, filter: BookFilter) -> Result<Vec<Book>, StoreError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;
}
