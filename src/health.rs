use actix_web::{get, web, HttpResponse};
use log::error;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;

#[derive(Serialize)]
struct Status {
    status: &'static str,
    message: &'static str,
}

#[get("/health")]
async fn health(pool: web::Data<SqlitePool>) -> HttpResponse {
    match db::ping(&pool).await {
        Ok(()) => HttpResponse::Ok().json(Status {
            status: "ok",
            message: "Service is healthy",
        }),
        Err(x) => {
            error!("health check failed: {x}");
            HttpResponse::ServiceUnavailable().json(Status {
                status: "error",
                message: "Database connection failed",
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
