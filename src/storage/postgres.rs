use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Book, BookFilter, BookUpdate, NewBook, Store, StoreError, User};

const BOOK_COLUMNS: &str = "id, title, author, subject, condition, price, phone, \
     image_url, sold, secret_id, report_count, created_at";

/// Postgres 存储实现，生产环境使用。
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_all_books(&self) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books", BOOK_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn get_book_by_id(&self, id: i32) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn get_book_by_secret_id(&self, secret_id: &str) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE secret_id = $1",
            BOOK_COLUMNS
        ))
        .bind(secret_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn create_book(&self, book: NewBook) -> Result<Book, StoreError> {
        let secret_id = Uuid::new_v4().to_string();
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, subject, condition, price, phone, image_url, secret_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.subject)
        .bind(&book.condition)
        .bind(book.price)
        .bind(&book.phone)
        .bind(&book.image_url)
        .bind(&secret_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_book_by_secret_id(
        &self,
        secret_id: &str,
        update: BookUpdate,
    ) -> Result<Option<Book>, StoreError> {
        // COALESCE 合并：未提供的字段保留原值
        let updated = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                subject = COALESCE($4, subject),
                condition = COALESCE($5, condition),
                price = COALESCE($6, price),
                phone = COALESCE($7, phone),
                image_url = COALESCE($8, image_url),
                sold = COALESCE($9, sold)
            WHERE secret_id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(secret_id)
        .bind(update.title)
        .bind(update.author)
        .bind(update.subject)
        .bind(update.condition)
        .bind(update.price)
        .bind(update.phone)
        .bind(update.image_url)
        .bind(update.sold)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_book_by_secret_id(&self, secret_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM books WHERE secret_id = $1")
            .bind(secret_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn report_book(&self, id: i32) -> Result<Option<Book>, StoreError> {
        // 单条原子自增，并发举报不会丢计数
        let reported = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET report_count = report_count + 1
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reported)
    }

    async fn search_books(&self, query: &str) -> Result<Vec<Book>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return self.get_all_books().await;
        }
        // 转义 LIKE 元字符，保证按普通子串匹配
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE title ILIKE $1 OR author ILIKE $1",
            BOOK_COLUMNS
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn filter_books(&self, filter: BookFilter) -> Result<Vec<Book>, StoreError> {
        let subject = filter.subject_constraint().map(str::to_owned);
        let condition = filter.condition_constraint().map(str::to_owned);
        let books = sqlx::query_as::<_, Book>(&format!(
            r#"
            SELECT {} FROM books
            WHERE ($1::TEXT IS NULL OR subject = $1)
              AND ($2::TEXT IS NULL OR condition = $2)
              AND (NOT $3::BOOL OR price <= 0)
            "#,
            BOOK_COLUMNS
        ))
        .bind(subject)
        .bind(condition)
        .bind(filter.free_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password)
            VALUES ($1, $2)
            RETURNING id, username, password
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
            _ => StoreError::Database(e),
        })?;
        Ok(user)
    }
}
