pub mod config;
pub mod pages;
pub mod train;

pub use config::*;
pub use pages::*;
pub use train::*;

use crate::error::AppError;
use crate::health;
use actix_web::error::QueryPayloadError;
use actix_web::{web, HttpRequest};

/// Register every route. Shared by `main` and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .route("/", web::get().to(index))
        .route("/test", web::get().to(upload_form))
        .route("/train", web::post().to(train))
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics))
                .route("/config", web::get().to(get_config)),
        );
}

/// Query strings that fail to deserialize get the same error envelope as
/// every other rejected request instead of actix's plain-text 400.
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}
