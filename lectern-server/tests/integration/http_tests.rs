use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use lectern_core::RoomId;
use lectern_server::{ConnectionConfig, CreateRoomResponse, RoomConfig, RoomExistsResponse};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

use crate::integration::{init_tracing, test_service};

async fn call<T: DeserializeOwned>(app: &Router, method: Method, uri: &str) -> (StatusCode, T) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_room_exists_and_create() {
    init_tracing();
    let (service, registry, _) = test_service(ConnectionConfig::default(), RoomConfig::default());
    let app = service.into_router();

    let (status, body): (_, RoomExistsResponse) =
        call(&app, Method::GET, "/rooms/L42/exists").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.exists);
    assert!(registry.is_empty(), "checking must not create the room");

    let (status, body): (_, CreateRoomResponse) = call(&app, Method::POST, "/rooms/L42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.room_id, RoomId::from("L42"));

    let (_, body): (_, RoomExistsResponse) = call(&app, Method::GET, "/rooms/L42/exists").await;
    assert!(body.exists);

    // Creating again is a no-op.
    let _: (_, CreateRoomResponse) = call(&app, Method::POST, "/rooms/L42").await;
    assert_eq!(registry.coordinators_started(), 1);
    assert_eq!(registry.len(), 1);
}
