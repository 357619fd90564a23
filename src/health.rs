use crate::state::{AppMetrics, AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = &state.config;
    let executable = state.invoker.executable();

    // A missing tool does not stop the server, but every /train will fail.
    let executable_found = executable.is_file();
    let auth_enabled = state.api_keys.is_enabled().ok();
    let status = if executable_found && auth_enabled.is_some() {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "training": {
            "executable": executable,
            "executable_found": executable_found,
            "tmp_dir": config.training.tmp_dir,
            "active_jobs": metrics.active_jobs,
            "free_slots": state.invoker.available_slots(),
            "max_concurrent_jobs": config.training.max_concurrent_jobs
        },
        "auth": {
            "enabled": auth_enabled
        },
        "metrics": summary(&metrics)
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": summary(&metrics),
        "requests_per_second": if uptime_seconds > 0 {
            metrics.request_count as f64 / uptime_seconds as f64
        } else {
            0.0
        },
        "training": {
            "succeeded": metrics.training.succeeded,
            "failed": metrics.training.failed,
            "average_duration_ms": metrics.training.average_duration_ms(),
            "active_jobs": metrics.active_jobs
        },
        "endpoints": endpoint_stats
    }))
}

fn summary(metrics: &AppMetrics) -> serde_json::Value {
    json!({
        "total_requests": metrics.request_count,
        "total_errors": metrics.error_count,
        "error_rate": if metrics.request_count > 0 {
            metrics.error_count as f64 / metrics.request_count as f64
        } else {
            0.0
        }
    })
}
