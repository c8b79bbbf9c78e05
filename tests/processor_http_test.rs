use chrono::{NaiveDate, Utc};
use form_batcher::model::{Outcome, Record, RecordStatus};
use form_batcher::processor::{ProcessingClient, ProcessingService, TransportError};
use reqwest::Url;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(id: i64, dob: Option<NaiveDate>, link: Option<&str>) -> Record {
    let now = Utc::now();
    Record {
        id,
        name: format!("Person {}", id),
        email: format!("person{}@example.com", id),
        phone_number: "+14155552671".into(),
        link: link.map(str::to_string),
        dob,
        status: RecordStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

fn client(server: &MockServer, timeout: Duration) -> ProcessingClient {
    let endpoint = Url::parse(&format!("{}/batch/process", server.uri())).unwrap();
    ProcessingClient::new(endpoint, timeout).unwrap()
}

#[tokio::test]
async fn posts_wire_records_and_decodes_verdicts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch/process"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!([
            {
                "id": 1,
                "name": "Person 1",
                "email": "person1@example.com",
                "phoneNumber": "+14155552671",
                "link": "https://github.com/p1",
                "dob": "07/03/1994"
            },
            {
                "id": 2,
                "name": "Person 2",
                "email": "person2@example.com",
                "phoneNumber": "+14155552671",
                "link": "",
                "dob": ""
            }
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "status": "SUCCESS" },
            { "id": 2, "status": "TIMEOUT" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let batch = vec![
        record(1, NaiveDate::from_ymd_opt(1994, 3, 7), Some("https://github.com/p1")),
        record(2, None, None),
    ];
    let verdicts = client(&server, Duration::from_secs(5))
        .submit(&batch)
        .await
        .unwrap();

    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].record_id, 1);
    assert_eq!(verdicts[0].outcome, Outcome::Success);
    assert_eq!(verdicts[1].outcome, Outcome::Failed("TIMEOUT".into()));
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .submit(&[record(1, None, None)])
        .await
        .unwrap_err();
    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "results": [{ "id": 1 }] })),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .submit(&[record(1, None, None)])
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_millis(200))
        .submit(&[record(1, None, None)])
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    // Nothing listens on port 9 (discard) in the test environment.
    let endpoint = Url::parse("http://127.0.0.1:9/batch/process").unwrap();
    let client = ProcessingClient::new(endpoint, Duration::from_secs(2)).unwrap();
    let err = client.submit(&[record(1, None, None)]).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::Request(_) | TransportError::Timeout(_)
    ));
}
