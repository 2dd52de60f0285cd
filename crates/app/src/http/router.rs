use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::http::routes::{comments, health, search};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state);
    let request_timeout = state.config.request_timeout;
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route(
            "/comments",
            get(comments::get_comments).post(comments::create_comment),
        )
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/search", get(search::search))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn build_cors(state: &AppState) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    let mut allow_any = false;
    for origin in state.config.cors_allow_origins.iter() {
        if origin.trim() == "*" {
            allow_any = true;
            break;
        }
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => origins.push(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
            }
        }
    }
    if !allow_any && origins.is_empty() {
        return None;
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]);
    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_headers([CONTENT_TYPE]),
        )
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::{build, build_cors};
    use crate::config::AppConfig;
    use crate::wiring::build_state;

    fn app() -> Router {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        build(build_state(config).unwrap())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(payload: Value) -> Request<Body> {
        Request::post("/comments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn create(app: &Router, text: &str, parent: Option<i64>) -> i64 {
        let (status, body) = send(app, post_json(json!({"comment": text, "parent_id": parent}))).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["comment"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn create_fetch_and_delete_tree() {
        let app = app();
        let root = create(&app, "root", None).await;
        let child = create(&app, "child", Some(root)).await;
        let grandchild = create(&app, "grandchild", Some(child)).await;

        let (status, body) = send(&app, get(&format!("/comments?parent={root}"))).await;
        assert_eq!(status, StatusCode::OK);
        let tree = &body["comment"];
        assert_eq!(tree["id"], root);
        assert_eq!(tree["comment"], "root");
        assert!(tree.get("path").is_none());
        assert_eq!(tree["children"][0]["id"], child);
        assert_eq!(tree["children"][0]["children"][0]["id"], grandchild);
        assert_eq!(tree["children"][0]["children"][0]["children"], json!([]));

        let request = Request::delete(format!("/comments/{child}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"id": child, "removed": 2}));

        let (status, _) = send(&app, get(&format!("/comments?parent={grandchild}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, body) = send(&app, get(&format!("/comments?parent={root}"))).await;
        assert_eq!(body["comment"]["children"], json!([]));
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let app = app();
        let (status, body) = send(&app, post_json(json!({"comment": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "comment text is required");

        let (status, _) = send(&app, post_json(json!({"comment": "x", "parent_id": -1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, post_json(json!({"comment": "x", "parent_id": 999}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "parent comment 999 not found");

        let request = Request::post("/comments")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_ids_are_bad_requests() {
        let app = app();
        let (status, _) = send(&app, get("/comments?parent=abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let request = Request::delete("/comments/abc").body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let request = Request::delete("/comments/41").body(Body::empty()).unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_pages_of_top_level_trees() {
        let app = app();
        for n in 0..25 {
            create(&app, &format!("root {n}"), None).await;
        }
        let (status, body) = send(&app, get("/comments?page=1&limit=10&sort_by=id")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 25);
        assert_eq!(body["comments"].as_array().unwrap().len(), 10);
        assert!(body.get("skipped").is_none());

        let (_, body) = send(&app, get("/comments?page=3&limit=10&sort_by=id")).await;
        assert_eq!(body["comments"].as_array().unwrap().len(), 5);
        assert_eq!(body["page"], 3);

        let (_, body) = send(&app, get("/comments?limit=1000&sort_by=id&sort_order=desc")).await;
        assert_eq!(body["limit"], 10);
        assert_eq!(body["comments"][0]["comment"], "root 24");
    }

    #[tokio::test]
    async fn garbage_paging_falls_back_to_defaults() {
        let app = app();
        for n in 0..3 {
            create(&app, &format!("root {n}"), None).await;
        }
        let (status, body) = send(&app, get("/comments?page=abc&limit=xyz")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 10);
        assert_eq!(body["total"], 3);
        assert_eq!(body["comments"].as_array().unwrap().len(), 3);

        let (status, body) = send(&app, get("/comments?page=-2&limit=0")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], 1);
        assert_eq!(body["limit"], 10);
    }

    #[tokio::test]
    async fn search_matches_case_insensitively() {
        let app = app();
        create(&app, "Hello World", None).await;
        create(&app, "shell game", None).await;
        create(&app, "unrelated", None).await;

        let (status, body) = send(&app, get("/search?q=he")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comments"], json!([]));

        let (_, body) = send(&app, get("/search?q=HEL")).await;
        let texts: Vec<&str> = body["comments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["comment"].as_str().unwrap())
            .collect();
        assert_eq!(texts, vec!["shell game", "Hello World"]);

        let long = "a".repeat(300);
        let (status, _) = send(&app, get(&format!("/search?q={long}"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_storage_backend() {
        let (status, body) = send(&app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["database"]["configured"], false);
    }

    #[test]
    fn cors_enablement_requires_origin_or_wildcard() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let state = build_state(config).unwrap();
        assert!(build_cors(&state).is_none());

        let config = AppConfig::from_lookup(|key| {
            (key == "COMMENT_TREE_CORS_ALLOW_ORIGINS").then(|| "*".to_string())
        })
        .unwrap();
        let state = build_state(config).unwrap();
        assert!(build_cors(&state).is_some());
    }
}
