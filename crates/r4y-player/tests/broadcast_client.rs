//! Broadcast GraphQL client against a mock HTTP server.

use r4y_player::broadcast::{BroadcastClient, ScheduleSource};
use r4y_player::proto::error::PlaybackError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> BroadcastClient {
    BroadcastClient::builder()
        .endpoint(format!("{}/v1/graphql", server.uri()))
        .token("secret-token")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_live_stream_descriptor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(header("x-token", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "brand": {
                    "id": "FRANCEINTER",
                    "title": "France Inter",
                    "liveStream": "https://icecast.radiofrance.fr/franceinter-midfi.mp3"
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let live = client(&server).live_stream().await.unwrap();
    assert_eq!(live.station_title, "France Inter");
    assert_eq!(
        live.stream_url,
        "https://icecast.radiofrance.fr/franceinter-midfi.mp3"
    );
}

#[tokio::test]
async fn test_grid_sends_window_and_maps_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/graphql"))
        .and(body_partial_json(json!({
            "variables": { "start": 1714543200, "end": 1714607999 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "grid": [
                    {
                        "id": "d2",
                        "start": 1714550400,
                        "end": 1714554000,
                        "diffusion": { "id": "x2", "title": "Le 7/10", "url": "https://example.test/d2" }
                    },
                    {},
                    {
                        "id": "d1",
                        "start": 1714543200,
                        "end": 1714550400,
                        "diffusion": { "id": "x1", "title": "", "url": null }
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let slots = client(&server)
        .grid(1714543200, 1714607999)
        .await
        .unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].id, "d1");
    assert_eq!(slots[0].title, "Program 3");
    assert_eq!(slots[1].id, "d2");
    assert_eq!(slots[1].title, "Le 7/10");
    assert!(slots.windows(2).all(|w| w[0].start <= w[1].start));
}

#[tokio::test]
async fn test_graphql_errors_map_to_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [ { "message": "Unknown station" }, { "message": "ignored" } ]
        })))
        .mount(&server)
        .await;

    let err = client(&server).live_stream().await.unwrap_err();
    assert_eq!(err, PlaybackError::Api("Unknown station".into()));
}

#[tokio::test]
async fn test_unauthorized_maps_to_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).grid(0, 10).await.unwrap_err();
    assert_eq!(err, PlaybackError::Http { status: 401 });
}

#[tokio::test]
async fn test_missing_data_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client(&server).live_stream().await.unwrap_err();
    assert!(matches!(err, PlaybackError::Decode(_)));
}

#[tokio::test]
async fn test_missing_token_never_hits_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = BroadcastClient::builder()
        .endpoint(server.uri())
        .token("  ")
        .build()
        .unwrap();
    let err = client.grid(0, 10).await.unwrap_err();
    assert!(err.is_fatal());
}
