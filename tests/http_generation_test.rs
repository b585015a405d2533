//! HttpGenerationService against a mock generation server.

use mockito::{Matcher, Server};

use levelforge::adapters::generation::HttpGenerationService;
use levelforge::domain::models::{Grade, ServiceConfig};
use levelforge::domain::ports::{GenerationError, GenerationRequest, GenerationService};

fn service_for(server: &Server) -> HttpGenerationService {
    let config = ServiceConfig {
        base_url: server.url(),
        timeout_secs: 5,
        requests_per_second: 0.0,
    };
    HttpGenerationService::new(&config).expect("client builds")
}

fn request() -> GenerationRequest {
    GenerationRequest {
        gimmick_intensity: Some(0.25),
        available_gimmicks: Some(vec!["ice".to_string(), "bombs".to_string()]),
        unlock_level_number: Some(12),
        shape_params: serde_json::json!({ "width": 9 }),
        ..GenerationRequest::new(0.3)
    }
}

#[tokio::test]
async fn test_generate_success_with_mock() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/generate")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "target_difficulty": 0.3,
            "available_gimmicks": ["ice", "bombs"],
            "unlock_level_number": 12,
            "shape_params": { "width": 9 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "artifact": { "cells": [1, 2, 3] },
                "actual_difficulty": 0.33,
                "grade": "A"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = service_for(&server).generate(request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.grade, Grade::A);
    assert!((response.actual_difficulty - 0.33).abs() < 1e-9);
    assert_eq!(response.artifact["cells"][2], 3);
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/generate")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let err = service_for(&server).generate(request()).await.unwrap_err();
    match err {
        GenerationError::Server { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_gateway_timeout_maps_to_timeout() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/generate")
        .with_status(504)
        .create_async()
        .await;

    let err = service_for(&server).generate(request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{\"artifact\": ")
        .create_async()
        .await;

    let err = service_for(&server).generate(request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_out_of_range_difficulty_is_rejected() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/generate")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "artifact": {},
                "actual_difficulty": 1.4,
                "grade": "D"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = service_for(&server).generate(request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(msg) if msg.contains("1.4")));
}
