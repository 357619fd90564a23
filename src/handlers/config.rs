use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// `GET /api/v1/config` - effective configuration. The API key itself is
/// never exposed, only whether authentication is on.
pub async fn get_config(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    let auth_enabled = state.api_keys.is_enabled().ok();

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "training": {
                "executable": config.training.executable,
                "tmp_dir": config.training.tmp_dir,
                "required_files": config.training.required_files,
                "max_file_size": config.training.max_file_size,
                "model_suffix": config.training.model_suffix,
                "timeout_secs": config.training.timeout_secs,
                "max_concurrent_jobs": config.training.max_concurrent_jobs
            },
            "auth": {
                "key_file": state.api_keys.path(),
                "enabled": auth_enabled
            }
        }
    }))
}
