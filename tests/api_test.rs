use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use form_batcher::api;
use form_batcher::db;
use form_batcher::model::RecordStatus;
use serde_json::{json, Value};

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

#[actix_web::test]
async fn create_record_returns_pending_record() {
    let pool = setup_pool().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .configure(api::init_app),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/records/")
        .set_json(json!({
            "name": "Priya Sharma",
            "email": "Priya@Example.com",
            "phone_number": "+919876543210",
            "link": "https://github.com/priya",
            "dob": "1994-03-07"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Record created successfully");
    assert_eq!(body["data"]["status"], "PENDING");
    assert_eq!(body["data"]["email"], "priya@example.com");
    assert_eq!(body["data"]["dob"], "1994-03-07");

    let id = body["data"]["id"].as_i64().unwrap();
    let stored = db::get_record(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.status, RecordStatus::Pending);
}

#[actix_web::test]
async fn invalid_record_reports_field_errors() {
    let pool = setup_pool().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .configure(api::init_app),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/records/")
        .set_json(json!({
            "name": "P",
            "email": "nope",
            "phone_number": "9876543210"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed");
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["phone_number"].is_array());
    assert!(body["errors"].get("link").is_none());

    let counts = db::count_by_status(&pool).await.unwrap();
    assert_eq!(counts.pending, 0);
}

#[actix_web::test]
async fn success_listing_only_shows_success_with_formatted_dob() {
    let pool = setup_pool().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .configure(api::init_app),
    )
    .await;

    let mut ids = Vec::new();
    for (name, dob) in [("Alice Doe", Some("1990-12-25")), ("Bob Roe", None)] {
        let req = test::TestRequest::post()
            .uri("/api/records/")
            .set_json(json!({
                "name": name,
                "email": "someone@example.com",
                "phone_number": "+14155552671",
                "dob": dob
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        ids.push(body["data"]["id"].as_i64().unwrap());
    }
    db::set_record_status(&pool, ids[0], RecordStatus::Success)
        .await
        .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/records/success/")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], ids[0]);
    assert_eq!(body["data"][0]["dob"], "25/12/1990");
    assert_eq!(body["data"][0]["status"], "SUCCESS");
}

#[actix_web::test]
async fn health_is_ok() {
    let pool = setup_pool().await;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(pool))
            .configure(api::init_app),
    )
    .await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
