use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderName, Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use quill_api::{AppStateInner, SecretHasher, TokenService, router};
use quill_cache::{KvCache, MemoryCache, PendingSignup, PendingSignups};
use quill_db::models::NewUser;
use quill_db::{Database, UserStore};
use quill_mail::{MailQueue, MemoryMailer};
use quill_types::models::Role;

struct Harness {
    app: Router,
    store: Arc<Database>,
    cache: MemoryCache,
    mailer: Arc<MemoryMailer>,
    tokens: TokenService,
}

fn harness() -> Harness {
    harness_with_header("authorization")
}

fn harness_with_header(header: &'static str) -> Harness {
    let store = Arc::new(Database::open_in_memory().unwrap());
    let cache = MemoryCache::new();
    let mailer = Arc::new(MemoryMailer::new());
    let (mail, _worker) = MailQueue::start(mailer.clone(), 16);
    let tokens = TokenService::new(
        "test-secret",
        Duration::from_secs(12 * 3600),
        Duration::from_secs(100 * 3600),
    );

    let state = Arc::new(AppStateInner {
        store: store.clone(),
        signups: PendingSignups::new(Arc::new(cache.clone()), Duration::from_secs(600)),
        tokens: tokens.clone(),
        hasher: SecretHasher::new(argon2::Params::new(256, 1, 1, None).unwrap()),
        mail,
        auth_header: HeaderName::from_static(header),
    });

    Harness {
        app: router(state),
        store,
        cache,
        mailer,
        tokens,
    }
}

impl Harness {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    /// Insert a verified account directly and mint a token for it.
    fn account(&self, email: &str, role: Role) -> (i64, String) {
        let user = self
            .store
            .create_user(&NewUser {
                name: email.split('@').next().unwrap().to_string(),
                email: email.to_string(),
                password_hash: "unused".into(),
                role,
            })
            .unwrap();
        let (token, _) = self.tokens.issue(&user, false).unwrap();
        (user.id, token)
    }

    async fn pending(&self, email: &str) -> Option<PendingSignup> {
        self.cache
            .get(&PendingSignups::key(email))
            .await
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    /// Wait for the mail worker and pull the code out of the last message to `email`.
    async fn code_for(&self, email: &str) -> String {
        for _ in 0..200 {
            if let Some(mail) = self.mailer.sent().into_iter().rev().find(|m| m.to == email) {
                let body = &mail.html_body;
                let start = body.find("<h2").unwrap();
                let rest = &body[start..];
                let open = rest.find('>').unwrap() + 1;
                let close = rest.find("</h2>").unwrap();
                return rest[open..close].to_string();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no verification mail for {email}");
    }

    async fn signup_and_verify(&self, email: &str, password: &str, role: &str) -> Value {
        let (status, _) = self
            .call(
                Method::POST,
                "/v1/auth/signup",
                None,
                Some(json!({ "email": email, "password": password, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let code = self.code_for(email).await;
        let (status, body) = self
            .call(
                Method::POST,
                "/v1/auth/verify",
                None,
                Some(json!({ "email": email, "code": code })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

#[tokio::test]
async fn signup_verify_and_publish() {
    let h = harness();

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/signup",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw", "role": "blogger" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);

    let pending = h.pending("a@x.com").await.expect("pending signup stored");
    assert_eq!(pending.role, Role::Blogger);
    assert_ne!(pending.password, "pw");

    let code = h.code_for("a@x.com").await;
    assert_eq!(code.len(), 6);
    assert_ne!(pending.code, code);

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/verify",
            None,
            Some(json!({ "email": "a@x.com", "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_info"]["name"], "a");
    assert_eq!(body["user_info"]["role"], "blogger");

    let token = body["access_token"].as_str().unwrap().to_string();
    let claims = h.tokens.verify(&token).unwrap();
    assert_eq!(claims.role, Role::Blogger);
    assert_eq!(claims.email, "a@x.com");

    // the hash is carried over unchanged, not rehashed
    let user = h.store.get_user_by_email("a@x.com").unwrap().unwrap();
    assert_eq!(user.password, pending.password);

    let (status, created) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some(token.as_str()),
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = created["id"].as_i64().unwrap();

    let (status, post) = h
        .call(Method::GET, &format!("/v1/posts/{post_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["header"], "H");
    assert_eq!(post["body"], "B");
    assert_eq!(post["user_info"]["name"], "a");
    assert_eq!(post["all_comments"]["count"], 0);
    assert_eq!(post["all_comments"]["comments"], json!([]));
}

#[tokio::test]
async fn unknown_role_leaves_no_pending_signup() {
    let h = harness();

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/signup",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(h.pending("a@x.com").await.is_none());
}

#[tokio::test]
async fn malformed_bodies_use_error_envelope() {
    let h = harness();

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/signup",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw", "role": "reader", "admin": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = h.call(Method::GET, "/v1/posts/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn wrong_code_creates_no_user() {
    let h = harness();

    h.call(
        Method::POST,
        "/v1/auth/signup",
        None,
        Some(json!({ "email": "a@x.com", "password": "pw", "role": "reader" })),
    )
    .await;

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/verify",
            None,
            Some(json!({ "email": "a@x.com", "code": "abcdef" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
    assert!(h.store.get_user_by_email("a@x.com").unwrap().is_none());
}

#[tokio::test]
async fn verify_without_pending_signup_is_not_found() {
    let h = harness();

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/verify",
            None,
            Some(json!({ "email": "ghost@x.com", "code": "123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn repeated_signup_and_verify_conflict() {
    let h = harness();
    h.signup_and_verify("a@x.com", "pw", "reader").await;

    // the pending entry is still live, so the same code verifies again
    let code = h.code_for("a@x.com").await;
    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/verify",
            None,
            Some(json!({ "email": "a@x.com", "code": code })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = h
        .call(
            Method::POST,
            "/v1/auth/signup",
            None,
            Some(json!({ "email": "A@X.com", "password": "pw", "role": "reader" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_checks_password_and_honours_remember_me() {
    let h = harness();
    h.signup_and_verify("a@x.com", "pw", "blogger").await;

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw", "remember_me": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remember_me"], true);
    let claims = h
        .tokens
        .verify(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!((claims.expired_at - claims.issued_at).num_hours(), 100);

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, _) = h
        .call(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "b@x.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mutations_require_a_valid_token() {
    let h = harness();

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/posts",
            None,
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some("garbage"),
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h.call(Method::GET, "/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // reads stay public
    let (status, _) = h.call(Method::GET, "/v1/posts", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn custom_header_accepts_bare_token() {
    let h = harness_with_header("x-access-token");
    let (_, token) = h.account("a@x.com", Role::Reader);

    let req = Request::builder()
        .method(Method::GET)
        .uri("/v1/users/me")
        .header("x-access-token", token)
        .body(Body::empty())
        .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn readers_cannot_publish() {
    let h = harness();
    let (_, token) = h.account("r@x.com", Role::Reader);

    let (status, body) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some(token.as_str()),
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (_, list) = h.call(Method::GET, "/v1/posts", None, None).await;
    assert_eq!(list["total_count"], 0);
}

#[tokio::test]
async fn post_update_round_trip() {
    let h = harness();
    let (user_id, token) = h.account("a@x.com", Role::Blogger);

    let (_, created) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some(token.as_str()),
            Some(json!({ "header": "H1", "body": "B1" })),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = h
        .call(
            Method::PUT,
            &format!("/v1/posts/{id}"),
            Some(token.as_str()),
            Some(json!({ "header": "H2", "body": "B2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, post) = h.call(Method::GET, &format!("/v1/posts/{id}"), None, None).await;
    assert_eq!(post["id"], id);
    assert_eq!(post["header"], "H2");
    assert_eq!(post["body"], "B2");
    assert_eq!(post["user_id"], user_id);
    assert_eq!(post["created_at"], created["created_at"]);
}

#[tokio::test]
async fn foreign_mutations_look_like_missing_rows() {
    let h = harness();
    let (_, owner) = h.account("a@x.com", Role::Blogger);
    let (_, other) = h.account("b@x.com", Role::Blogger);

    let (_, created) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some(owner.as_str()),
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/v1/posts/{id}"),
            Some(other.as_str()),
            Some(json!({ "header": "X", "body": "Y" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = h
        .call(Method::DELETE, &format!("/v1/posts/{id}"), Some(other.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, post) = h.call(Method::GET, &format!("/v1/posts/{id}"), None, None).await;
    assert_eq!(post["header"], "H");

    let (status, body) = h
        .call(Method::DELETE, &format!("/v1/posts/{id}"), Some(owner.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);

    let (status, _) = h.call(Method::GET, &format!("/v1/posts/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_pages_newest_first() {
    let h = harness();
    let (_, token) = h.account("a@x.com", Role::Blogger);

    let mut ids = Vec::new();
    for i in 1..=25 {
        let (_, created) = h
            .call(
                Method::POST,
                "/v1/posts",
                Some(token.as_str()),
                Some(json!({ "header": format!("H{i}"), "body": "B" })),
            )
            .await;
        ids.push(created["id"].as_i64().unwrap());
    }

    let (status, page) = h
        .call(Method::GET, "/v1/posts?limit=10&page=2", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 25);
    let got: Vec<i64> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    let expected: Vec<i64> = ids.iter().rev().skip(10).take(10).copied().collect();
    assert_eq!(got, expected);

    let (_, last) = h
        .call(Method::GET, "/v1/posts?limit=10&page=3&sort=asc", None, None)
        .await;
    assert_eq!(last["items"].as_array().unwrap().len(), 5);

    for bad in ["/v1/posts?sort=sideways", "/v1/posts?limit=0", "/v1/posts?page=0", "/v1/posts?limit=x"] {
        let (status, body) = h.call(Method::GET, bad, None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn comment_tree_and_reply_rules() {
    let h = harness();
    let (_, blogger) = h.account("a@x.com", Role::Blogger);
    let (reader_id, reader) = h.account("r@x.com", Role::Reader);

    let (_, post) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some(blogger.as_str()),
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    let post_id = post["id"].as_i64().unwrap();

    let (status, comment) = h
        .call(
            Method::POST,
            "/v1/comments",
            Some(reader.as_str()),
            Some(json!({ "post_id": post_id, "content": "nice" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["id"].as_i64().unwrap();
    assert_eq!(comment["user_id"], reader_id);

    let (status, _) = h
        .call(
            Method::POST,
            "/v1/comments",
            Some(reader.as_str()),
            Some(json!({ "post_id": 9999, "content": "lost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, reply) = h
        .call(
            Method::POST,
            "/v1/replies",
            Some(blogger.as_str()),
            Some(json!({ "comment_id": comment_id, "content": "thanks" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["post_id"], post_id);

    let (status, _) = h
        .call(
            Method::POST,
            "/v1/replies",
            Some(blogger.as_str()),
            Some(json!({ "comment_id": comment_id, "post_id": post_id + 1, "content": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, detail) = h
        .call(Method::GET, &format!("/v1/posts/{post_id}"), None, None)
        .await;
    assert_eq!(detail["all_comments"]["count"], 1);
    let thread = &detail["all_comments"]["comments"][0];
    assert_eq!(thread["content"], "nice");
    assert_eq!(thread["user_info"]["name"], "r");
    assert_eq!(thread["all_replies"]["count"], 1);
    assert_eq!(thread["all_replies"]["replies"][0]["content"], "thanks");

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/v1/comments/{comment_id}"),
            Some(blogger.as_str()),
            Some(json!({ "content": "hijack" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/v1/comments/{comment_id}"),
            Some(reader.as_str()),
            Some(json!({ "content": "edited" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);

    let (_, replies) = h
        .call(
            Method::GET,
            &format!("/v1/replies?comment_id={comment_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(replies["total_count"], 1);

    // deleting the comment takes its replies with it
    let (status, _) = h
        .call(
            Method::DELETE,
            &format!("/v1/comments/{comment_id}"),
            Some(reader.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, replies) = h
        .call(Method::GET, &format!("/v1/replies?post_id={post_id}"), None, None)
        .await;
    assert_eq!(replies["total_count"], 0);
}

#[tokio::test]
async fn profile_name_can_be_changed() {
    let h = harness();
    let (_, token) = h.account("a@x.com", Role::Reader);

    let (status, me) = h.call(Method::GET, "/v1/users/me", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "a");
    assert_eq!(me["email"], "a@x.com");

    let (status, me) = h
        .call(
            Method::PUT,
            "/v1/users/me",
            Some(token.as_str()),
            Some(json!({ "name": "Alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Alice");

    let (status, _) = h
        .call(
            Method::PUT,
            "/v1/users/me",
            Some(token.as_str()),
            Some(json!({ "name": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn foreign_reply_edits_look_like_missing_rows() {
    let h = harness();
    let (_, blogger) = h.account("a@x.com", Role::Blogger);
    let (_, reader) = h.account("r@x.com", Role::Reader);

    let (_, post) = h
        .call(
            Method::POST,
            "/v1/posts",
            Some(blogger.as_str()),
            Some(json!({ "header": "H", "body": "B" })),
        )
        .await;
    let post_id = post["id"].as_i64().unwrap();
    let (_, comment) = h
        .call(
            Method::POST,
            "/v1/comments",
            Some(blogger.as_str()),
            Some(json!({ "post_id": post_id, "content": "c" })),
        )
        .await;
    let comment_id = comment["id"].as_i64().unwrap();
    let (_, reply) = h
        .call(
            Method::POST,
            "/v1/replies",
            Some(blogger.as_str()),
            Some(json!({ "comment_id": comment_id, "content": "mine" })),
        )
        .await;
    let reply_id = reply["id"].as_i64().unwrap();

    let (status, body) = h
        .call(
            Method::PUT,
            &format!("/v1/replies/{reply_id}"),
            Some(reader.as_str()),
            Some(json!({ "content": "hijack" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = h
        .call(
            Method::DELETE,
            &format!("/v1/replies/{reply_id}"),
            Some(reader.as_str()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (_, replies) = h
        .call(
            Method::GET,
            &format!("/v1/replies?comment_id={comment_id}"),
            None,
            None,
        )
        .await;
    assert_eq!(replies["total_count"], 1);
    assert_eq!(replies["items"][0]["content"], "mine");
}

#[tokio::test]
async fn unknown_routes_use_error_envelope() {
    let h = harness();

    let (status, body) = h.call(Method::GET, "/v1/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert_eq!(body["code"], 404);

    let (status, body) = h.call(Method::PATCH, "/health", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "method_not_allowed");
    assert_eq!(body["code"], 405);
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness();
    let (status, body) = h.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
