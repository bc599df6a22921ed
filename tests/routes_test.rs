//! HTTP surface exposed to the browser.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulse_console::clients::ApiClient;
use pulse_console::clients::orchestrator::{Orchestrator, MAX_UNMAPPED_SLOTS};
use pulse_console::config::Config;
use pulse_console::routes::build_router;
use pulse_console::AppState;

fn app(base_url: &str) -> (Router, Arc<Orchestrator>) {
    let cfg = Config {
        api_base_url: base_url.to_string(),
        ..Default::default()
    };
    let client = ApiClient::new(cfg.api_base_url.clone(), None).unwrap();
    let orchestrator = Arc::new(Orchestrator::new(client, cfg.orchestrator_options()));
    let state = AppState {
        orchestrator: orchestrator.clone(),
        config: Arc::new(cfg),
    };
    (build_router(state), orchestrator)
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn wait_for_value(orch: &Orchestrator, id: &str) -> String {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(slot) = orch.slot(id).await {
            if slot.is_set() {
                return slot.value;
            }
        }
        assert!(tokio::time::Instant::now() < deadline, "slot {id} never written");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn state_lists_tracked_slots() {
    let (router, _) = app("http://unused.invalid");
    let (status, body) = send(&router, get("/api/state")).await;
    assert_eq!(status, StatusCode::OK);

    let snap: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(snap["backend_status"], "Checking...");
    assert_eq!(snap["reachable"], false);
    let slots = snap["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 7);
    assert_eq!(slots[0]["id"], "color");
    assert_eq!(slots[0]["value"], "");
}

#[tokio::test]
async fn refresh_is_fire_and_forget() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/joke"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"joke": "Why? - Because."})),
        )
        .mount(&mock)
        .await;

    let (router, orch) = app(&mock.uri());
    let (status, body) = send(&router, post("/api/refresh/joke")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let key: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(key["endpoint"], "joke");
    assert!(key["seq"].as_u64().is_some());

    assert_eq!(wait_for_value(&orch, "joke").await, "Why? - Because.");

    let (status, body) = send(&router, get("/api/slots/joke")).await;
    assert_eq!(status, StatusCode::OK);
    let slot: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(slot["value"], "Why? - Because.");
    assert_eq!(slot["error"], false);
}

#[tokio::test]
async fn refresh_with_junk_ids_stays_bounded_and_escaped() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not Found"})))
        .mount(&mock)
        .await;

    let (router, orch) = app(&mock.uri());
    for i in 0..40 {
        let (status, _) = send(&router, post(&format!("/api/refresh/junk{i}%3Fq%3D1"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !orch.in_flight().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "requests never finished");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let snap = orch.snapshot().await;
    assert_eq!(snap.slots.len(), 7 + MAX_UNMAPPED_SLOTS);

    let received = mock.received_requests().await.unwrap();
    assert_eq!(received.len(), 40);
    for req in received {
        assert_eq!(req.url.query(), None);
        assert!(req.url.path().starts_with("/junk"));
        assert!(req.url.path().ends_with("%3Fq=1"));
    }
}

#[tokio::test]
async fn unknown_slot_is_not_found() {
    let (router, _) = app("http://unused.invalid");
    let (status, _) = send(&router, get("/api/slots/weather")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_check_route_runs_the_probe() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "UP"})))
        .mount(&mock)
        .await;

    let (router, _) = app(&mock.uri());
    let (status, body) = send(&router, post("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["backend_status"], "Backend OK! (UP)");
    assert_eq!(v["reachable"], true);
    assert_eq!(v["detail"]["state"], "reachable");
}

#[tokio::test]
async fn cancel_route() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cat"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock)
        .await;

    let (router, orch) = app(&mock.uri());
    let ticket = orch.request("cat");

    let (status, body) = send(&router, get("/api/requests")).await;
    assert_eq!(status, StatusCode::OK);
    let keys: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(keys[0]["endpoint"], "cat");

    let uri = format!("/api/requests/cat/{}", ticket.key.seq);
    let del = || {
        Request::builder()
            .method("DELETE")
            .uri(uri.as_str())
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&router, del()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&router, del()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_renders_slots_and_status() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/color"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cor": "#3357FF"})))
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/cat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"cat_image_url": "https://cdn2.thecatapi.com/a.jpg"})),
        )
        .mount(&mock)
        .await;

    let (router, orch) = app(&mock.uri());
    orch.fetch("color").await;
    orch.fetch("cat").await;

    let (status, html) = send(&router, get("/ui/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Checking..."));
    assert!(html.contains("background-color: #3357FF"));
    assert!(html.contains("<img src="));
    assert!(html.contains("cdn2.thecatapi.com"));
    assert!(html.contains("Random photo"));
    assert!(html.contains(r#"action="/ui/refresh/lookalike""#));
}

#[tokio::test]
async fn dashboard_refresh_redirects_back() {
    let (router, _) = app("http://unused.invalid");
    let resp = router.oneshot(post("/ui/refresh/time")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/ui/");
}

#[tokio::test]
async fn own_liveness_and_root_redirect() {
    let (router, _) = app("http://unused.invalid");
    let (status, body) = send(&router, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok\n");

    let resp = router.oneshot(get("/")).await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()["location"], "/ui/");
}

#[tokio::test]
async fn events_stream_starts_with_a_snapshot() {
    use futures_util::StreamExt;

    let (router, _) = app("http://unused.invalid");
    let resp = router.oneshot(get("/api/events")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/event-stream");

    let mut body = resp.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.starts_with("event:"));
    assert!(text.lines().next().unwrap().ends_with("state"));
    assert!(text.contains(r#""backend_status":"Checking...""#));
}
