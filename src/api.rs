//! Inbound HTTP API: record creation and the success listing.
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::db::{self, Pool};
use crate::intake::{self, RecordRequest};
use crate::model::{Record, RecordStatus};

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_endpoint)).service(
        web::scope("/api/records")
            .route("/", web::post().to(create_record_endpoint))
            .route("/success/", web::get().to(list_success_endpoint)),
    );
}

/// Listing shape: `dob` as `DD/MM/YYYY`.
#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub link: Option<String>,
    pub dob: Option<String>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Record> for RecordListItem {
    fn from(r: Record) -> Self {
        RecordListItem {
            id: r.id,
            name: r.name,
            email: r.email,
            phone_number: r.phone_number,
            link: r.link,
            dob: r.dob.map(|d| d.format("%d/%m/%Y").to_string()),
            status: r.status,
            created_at: r.created_at,
        }
    }
}

fn internal_error(err: anyhow::Error) -> HttpResponse {
    error!(?err, "request failed");
    HttpResponse::InternalServerError().json(json!({
        "message": "Internal server error",
    }))
}

/// POST /api/records/
pub async fn create_record_endpoint(
    pool: web::Data<Pool>,
    body: web::Json<RecordRequest>,
) -> HttpResponse {
    let today = Utc::now().date_naive();
    let new = match intake::validate(&body, today) {
        Ok(new) => new,
        Err(errors) => {
            warn!(?errors, "Record validation failed");
            return HttpResponse::BadRequest().json(json!({
                "message": "Validation failed",
                "errors": errors,
            }));
        }
    };

    match db::insert_record(&pool, &new).await {
        Ok(record) => {
            info!(id = record.id, "Record created successfully");
            HttpResponse::Created().json(json!({
                "message": "Record created successfully",
                "data": record,
            }))
        }
        Err(err) => internal_error(err),
    }
}

/// GET /api/records/success/
pub async fn list_success_endpoint(pool: web::Data<Pool>) -> HttpResponse {
    match db::list_by_status(&pool, RecordStatus::Success).await {
        Ok(records) => {
            let data: Vec<RecordListItem> = records.into_iter().map(Into::into).collect();
            info!(count = data.len(), "Returning SUCCESS records");
            HttpResponse::Ok().json(json!({
                "count": data.len(),
                "data": data,
            }))
        }
        Err(err) => internal_error(err),
    }
}

/// GET /health
pub async fn health_endpoint() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}
