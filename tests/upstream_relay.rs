//! Requests that pass authorization and reach the inference API.

mod common;

use std::time::Duration;

use axum::http::{header as http_header, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;

fn completion() -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": "Sales are up 12%." }],
        "model": "claude-3-5-haiku-20241022",
        "stop_reason": "end_turn",
        "usage": { "input_tokens": 20, "output_tokens": 8 }
    })
}

async fn upstream_replying(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", API_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

async fn forwarded_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_chat_relayed() {
    let server = upstream_replying(ResponseTemplate::new(200).set_body_json(completion())).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let (status, _, body) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "messages": [{ "role": "user", "content": "How did we do?" }],
            "max_tokens": 300
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, completion());

    let forwarded = forwarded_bodies(&server).await;
    assert_eq!(forwarded.len(), 1);
    assert_eq!(
        forwarded[0],
        json!({
            "model": "claude-3-5-haiku-20241022",
            "max_tokens": 300,
            "messages": [{ "role": "user", "content": "How did we do?" }]
        })
    );
}

#[tokio::test]
async fn test_restaurant_id_accepted() {
    let server = upstream_replying(ResponseTemplate::new(200).set_body_json(completion())).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let (status, _, _) = send(
        app,
        post_json(&json!({
            "restaurantId": TENANT,
            "messages": [{ "role": "user", "content": "hi" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upstream_error_relayed_verbatim() {
    let overloaded = json!({
        "type": "error",
        "error": { "type": "overloaded_error", "message": "Overloaded" }
    });
    let server = upstream_replying(ResponseTemplate::new(529).set_body_json(overloaded.clone())).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let (status, _, body) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "messages": [{ "role": "user", "content": "hi" }]
        })),
    )
    .await;

    assert_eq!(status.as_u16(), 529);
    assert_eq!(body, overloaded);
    // Never retried.
    assert_eq!(forwarded_bodies(&server).await.len(), 1);
}

#[tokio::test]
async fn test_non_json_upstream_error_wrapped() {
    let server = upstream_replying(ResponseTemplate::new(500).set_body_string("bad gateway html")).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let (status, _, body) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "messages": [{ "role": "user", "content": "hi" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Upstream API error");
    assert_eq!(body["details"], "bad gateway html");
}

#[tokio::test]
async fn test_analytics_prompt_is_bounded() {
    let server = upstream_replying(ResponseTemplate::new(200).set_body_json(completion())).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let products: Vec<Value> = (1..=15)
        .map(|i| json!({ "name": format!("Dish {}", i), "quantity": 100 - i, "revenue": 10.0 * i as f64 }))
        .collect();
    let comments: Vec<Value> = (1..=30)
        .map(|i| json!({ "rating": 4, "comment": format!("comment-{:02} {}", i, "y".repeat(300)) }))
        .collect();

    let (status, _, _) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "analyticsData": {
                "restaurantName": "Chez Test",
                "productSales": products,
                "sessionMetrics": {
                    "totalSessions": 200,
                    "totalOrders": 50,
                    "averageSessionMinutes": 4.5,
                    "conversionRate": 25.0,
                    "averageOrderValue": 18.5
                },
                "feedback": {
                    "ratingDistribution": { "5": 10, "4": 20 },
                    "comments": comments
                }
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let forwarded = forwarded_bodies(&server).await;
    let sent = &forwarded[0];
    assert_eq!(sent["model"], "claude-3-5-sonnet-20241022");
    assert_eq!(sent["max_tokens"], 2048);
    assert!(sent["system"].as_str().is_some());

    let prompt = sent["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("Dish 10"));
    assert!(!prompt.contains("Dish 11"));
    assert!(prompt.contains("comment-20"));
    assert!(!prompt.contains("comment-21"));
    assert!(!prompt.contains(&"y".repeat(200)));
}

#[tokio::test]
async fn test_identical_requests_forward_identical_payloads() {
    let server = upstream_replying(ResponseTemplate::new(200).set_body_json(completion())).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let request = json!({
        "tenantRef": TENANT,
        "analyticsData": {
            "productSales": [
                { "name": "Soup", "quantity": 3, "revenue": 27.0 },
                { "name": "Bread", "quantity": 9, "revenue": 13.5 }
            ],
            "feedback": { "ratingDistribution": { "5": 1, "3": 2, "1": 1 } }
        }
    });

    for _ in 0..2 {
        let (status, _, _) = send(app.clone(), post_json(&request)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let forwarded = forwarded_bodies(&server).await;
    assert_eq!(forwarded.len(), 2);
    assert_eq!(forwarded[0], forwarded[1]);
}

#[tokio::test]
async fn test_max_tokens_clamped() {
    let server = upstream_replying(ResponseTemplate::new(200).set_body_json(completion())).await;
    let app = build_app(test_config(&server.uri()), seeded_store());

    let (status, _, _) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "messages": [{ "role": "user", "content": "hi" }],
            "max_tokens": 100000
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(forwarded_bodies(&server).await[0]["max_tokens"], 4096);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let app = build_app(test_config(UNREACHABLE), seeded_store());

    let (status, _, body) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "messages": [{ "role": "user", "content": "hi" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Upstream request failed");
}

#[tokio::test]
async fn test_slow_upstream_times_out_with_json() {
    let server = upstream_replying(
        ResponseTemplate::new(200)
            .set_body_json(completion())
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let mut config = test_config(&server.uri());
    config.timeouts.request_secs = 1;
    let app = build_app(config, seeded_store());

    let (status, headers, body) = send(
        app,
        post_json(&json!({
            "tenantRef": TENANT,
            "messages": [{ "role": "user", "content": "hi" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "Request timeout");
    assert_eq!(headers[http_header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
}
