use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use serde_json::Value;

use backend::{AppState, app, config::Config, storage::MemStore};

const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52,
];

fn test_config(upload_dir: &str) -> Config {
    Config {
        database_url: String::new(),
        redis_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_secs: 3600,
        rate_limit_window_secs: 60,
        rate_limit_requests: 100,
        server_host: "::".to_string(),
        server_port: 0,
        api_base_uri: "/api".to_string(),
        upload_dir: upload_dir.to_string(),
    }
}

/// 基于内存存储起一个完整路由，和生产环境只差注入的 Store。
fn test_server() -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState {
        store: Arc::new(MemStore::new()),
        config: test_config(dir.path().to_str().unwrap()),
    };
    (TestServer::new(app(state)).unwrap(), dir)
}

fn book_form(title: &str, subject: &str, price: &str, phone: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title.to_string())
        .add_text("author", "测试作者".to_string())
        .add_text("subject", subject.to_string())
        .add_text("condition", "Used".to_string())
        .add_text("price", price.to_string())
        .add_text("phone", phone.to_string())
        .add_part(
            "image",
            Part::bytes(PNG.to_vec())
                .file_name("cover.png")
                .mime_type("image/png"),
        )
}

async fn create_book(server: &TestServer, title: &str, subject: &str, price: &str) -> Value {
    let res = server
        .post("/api/books")
        .multipart(book_form(title, subject, price, "1234567890"))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()
}

#[tokio::test]
async fn create_then_browse_hides_secret() {
    let (server, _dir) = test_server();

    let created = create_book(&server, "线性代数", "Math", "25").await;
    assert!(created["secretId"].as_str().is_some());
    assert_eq!(created["reportCount"], 0);
    assert_eq!(created["sold"], false);

    let res = server.get("/api/books").await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let books = res.json::<Vec<Value>>();
    assert_eq!(books.len(), 1);
    // 公开列表不暴露秘密链接
    assert!(books[0].get("secretId").is_none());
    assert_eq!(books[0]["title"], "线性代数");

    let id = books[0]["id"].as_i64().unwrap();
    let res = server.get(&format!("/api/books/{}", id)).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert!(res.json::<Value>().get("secretId").is_none());
}

#[tokio::test]
async fn uploaded_image_is_served_statically() {
    let (server, _dir) = test_server();

    let created = create_book(&server, "线性代数", "Math", "25").await;
    let image_url = created["imageUrl"].as_str().unwrap();
    assert!(image_url.starts_with("/uploads/"));

    let res = server.get(image_url).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.as_bytes().as_ref(), PNG);
}

#[tokio::test]
async fn create_without_image_is_rejected() {
    let (server, _dir) = test_server();

    let form = MultipartForm::new()
        .add_text("title", "线性代数".to_string())
        .add_text("author", "测试作者".to_string())
        .add_text("subject", "Math".to_string())
        .add_text("condition", "Used".to_string())
        .add_text("price", "25".to_string())
        .add_text("phone", "1234567890".to_string());
    let res = server.post("/api/books").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert!(res.json::<Value>()["message"].as_str().unwrap().contains("图片"));
}

#[tokio::test]
async fn create_with_non_image_bytes_is_rejected() {
    let (server, _dir) = test_server();

    let form = MultipartForm::new()
        .add_text("title", "线性代数".to_string())
        .add_text("author", "测试作者".to_string())
        .add_text("subject", "Math".to_string())
        .add_text("condition", "Used".to_string())
        .add_text("price", "25".to_string())
        .add_text("phone", "1234567890".to_string())
        .add_part(
            "image",
            Part::bytes(b"definitely not an image".to_vec())
                .file_name("cover.png")
                .mime_type("image/png"),
        );
    let res = server.post("/api/books").multipart(form).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_phone_rejected_before_persistence() {
    let (server, _dir) = test_server();

    let res = server
        .post("/api/books")
        .multipart(book_form("线性代数", "Math", "25", "12345"))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert!(res.json::<Value>()["message"].as_str().unwrap().contains("手机号"));

    // 校验失败的请求不产生任何记录
    let books = server.get("/api/books").await.json::<Vec<Value>>();
    assert!(books.is_empty());
}

#[tokio::test]
async fn secret_link_lifecycle() {
    let (server, _dir) = test_server();

    let created = create_book(&server, "线性代数", "Math", "25").await;
    let secret = created["secretId"].as_str().unwrap().to_string();

    // 秘密链接可以取回完整记录
    let res = server.get(&format!("/api/books/secret/{}", secret)).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["secretId"], secret.as_str());

    // 标记售出，重复调用不报错
    for _ in 0..2 {
        let res = server
            .put(&format!("/api/books/secret/{}/sold", secret))
            .await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.json::<Value>()["sold"], true);
    }

    // 部分更新：只改价格，售出状态和其他字段不动
    let form = MultipartForm::new().add_text("price", "10".to_string());
    let res = server
        .put(&format!("/api/books/secret/{}", secret))
        .multipart(form)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let updated = res.json::<Value>();
    assert_eq!(updated["price"], 10);
    assert_eq!(updated["title"], "线性代数");
    assert_eq!(updated["sold"], true);

    // 删除后记录彻底消失
    let res = server.delete(&format!("/api/books/secret/{}", secret)).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let res = server.get(&format!("/api/books/secret/{}", secret)).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let res = server.delete(&format!("/api/books/secret/{}", secret)).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_with_unknown_secret_is_404() {
    let (server, _dir) = test_server();
    create_book(&server, "线性代数", "Math", "25").await;

    let form = MultipartForm::new().add_text("title", "改名成功".to_string());
    let res = server
        .put("/api/books/secret/no-such-secret")
        .multipart(form)
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    // 确认没有任何记录被改动
    let books = server.get("/api/books").await.json::<Vec<Value>>();
    assert_eq!(books[0]["title"], "线性代数");
}

#[tokio::test]
async fn report_uses_public_id_and_counts() {
    let (server, _dir) = test_server();

    let created = create_book(&server, "线性代数", "Math", "25").await;
    let id = created["id"].as_i64().unwrap();

    let res = server.post(&format!("/api/books/{}/report", id)).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["reportCount"], 1);

    let res = server.post(&format!("/api/books/{}/report", id)).await;
    assert_eq!(res.json::<Value>()["reportCount"], 2);

    let res = server.post("/api/books/9999/report").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_and_filter_endpoints() {
    let (server, _dir) = test_server();

    create_book(&server, "Linear Algebra", "Math", "0").await;
    create_book(&server, "Physics Vol.1", "Physics", "50").await;

    // 子串搜索大小写不敏感
    let res = server.get("/api/books/search").add_query_param("q", "algebra").await;
    let found = res.json::<Vec<Value>>();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["title"], "Linear Algebra");

    // 空查询等于全部
    let res = server.get("/api/books/search").await;
    assert_eq!(res.json::<Vec<Value>>().len(), 2);

    // freeOnly 只留免费书
    let res = server
        .get("/api/books/filter")
        .add_query_param("freeOnly", "true")
        .await;
    let free = res.json::<Vec<Value>>();
    assert_eq!(free.len(), 1);
    assert_eq!(free[0]["price"], 0);

    // 哨兵值等于不过滤
    let res = server
        .get("/api/books/filter")
        .add_query_param("subject", "All Subjects")
        .add_query_param("condition", "All")
        .await;
    assert_eq!(res.json::<Vec<Value>>().len(), 2);

    // 条件取交集
    let res = server
        .get("/api/books/filter")
        .add_query_param("subject", "Math")
        .add_query_param("condition", "Used")
        .await;
    let filtered = res.json::<Vec<Value>>();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["subject"], "Math");
}

#[tokio::test]
async fn get_unknown_book_is_404() {
    let (server, _dir) = test_server();
    let res = server.get("/api/books/42").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    let res = server.get("/api/books/secret/nope").await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn account_round_trip() {
    let (server, _dir) = test_server();

    let res = server
        .post("/api/users/register")
        .json(&serde_json::json!({ "username": "alice", "password": "secret123" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let registered = res.json::<Value>();
    assert_eq!(registered["username"], "alice");
    assert!(registered["token"].as_str().is_some());

    // 重名注册拒绝
    let res = server
        .post("/api/users/register")
        .json(&serde_json::json!({ "username": "alice", "password": "secret123" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    // 登录换新令牌
    let res = server
        .post("/api/users/login")
        .json(&serde_json::json!({ "username": "alice", "password": "secret123" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let token = res.json::<Value>()["token"].as_str().unwrap().to_string();

    // 令牌有效
    let res = server
        .get("/api/users/check-token")
        .authorization_bearer(&token)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["username"], "alice");

    // 缺失或伪造的令牌一律 401
    let res = server.get("/api/users/check-token").await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    let res = server
        .get("/api/users/check-token")
        .authorization_bearer("not-a-token")
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    // 密码错误
    let res = server
        .post("/api/users/login")
        .json(&serde_json::json!({ "username": "alice", "password": "wrong-pass" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}
