use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Book, BookFilter, BookUpdate, NewBook, Store, StoreError, User};

/// 进程内存储，行为与 PgStore 一致，供测试注入。
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    books: HashMap<i32, Book>,
    users: HashMap<i32, User>,
    next_book_id: i32,
    next_user_id: i32,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> StoreError {
        StoreError::Internal("storage lock poisoned".to_string())
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_all_books(&self) -> Result<Vec<Book>, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(inner.books.values().cloned().collect())
    }

    async fn get_book_by_id(&self, id: i32) -> Result<Option<Book>, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(inner.books.get(&id).cloned())
    }

    async fn get_book_by_secret_id(&self, secret_id: &str) -> Result<Option<Book>, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(inner
            .books
            .values()
            .find(|b| b.secret_id == secret_id)
            .cloned())
    }

    async fn create_book(&self, book: NewBook) -> Result<Book, StoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_err())?;
        inner.next_book_id += 1;
        let id = inner.next_book_id;
        let record = Book {
            id,
            title: book.title,
            author: book.author,
            subject: book.subject,
            condition: book.condition,
            price: book.price,
            phone: book.phone,
            image_url: book.image_url,
            sold: false,
            secret_id: Uuid::new_v4().to_string(),
            report_count: 0,
            created_at: Utc::now(),
        };
        inner.books.insert(id, record.clone());
        Ok(record)
    }

    async fn update_book_by_secret_id(
        &self,
        secret_id: &str,
        update: BookUpdate,
    ) -> Result<Option<Book>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_err())?;
        let Some(book) = inner.books.values_mut().find(|b| b.secret_id == secret_id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            book.title = title;
        }
        if let Some(author) = update.author {
            book.author = author;
        }
        if let Some(subject) = update.subject {
            book.subject = subject;
        }
        if let Some(condition) = update.condition {
            book.condition = condition;
        }
        if let Some(price) = update.price {
            book.price = price;
        }
        if let Some(phone) = update.phone {
            book.phone = phone;
        }
        if let Some(image_url) = update.image_url {
            book.image_url = image_url;
        }
        if let Some(sold) = update.sold {
            book.sold = sold;
        }
        Ok(Some(book.clone()))
    }

    async fn delete_book_by_secret_id(&self, secret_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_err())?;
        let id = inner
            .books
            .values()
            .find(|b| b.secret_id == secret_id)
            .map(|b| b.id);
        match id {
            Some(id) => Ok(inner.books.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    async fn report_book(&self, id: i32) -> Result<Option<Book>, StoreError> {
        // 写锁内完成自增，计数不会丢失
        let mut inner = self.inner.write().map_err(|_| Self::lock_err())?;
        let Some(book) = inner.books.get_mut(&id) else {
            return Ok(None);
        };
        book.report_count += 1;
        Ok(Some(book.clone()))
    }

    async fn search_books(&self, query: &str) -> Result<Vec<Book>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return self.get_all_books().await;
        }
        let needle = query.to_lowercase();
        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(inner
            .books
            .values()
            .filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || b.author.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn filter_books(&self, filter: BookFilter) -> Result<Vec<Book>, StoreError> {
        let subject = filter.subject_constraint().map(str::to_owned);
        let condition = filter.condition_constraint().map(str::to_owned);
        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(inner
            .books
            .values()
            .filter(|b| {
                subject.as_deref().is_none_or(|s| b.subject == s)
                    && condition.as_deref().is_none_or(|c| b.condition == c)
                    && (!filter.free_only || b.price <= 0)
            })
            .cloned()
            .collect())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_err())?;
        if inner.users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate);
        }
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            username: username.to_string(),
            password: password_hash.to_string(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }
}
