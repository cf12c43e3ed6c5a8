mod report;

use axum::{
    Json, Router,
    extract::Query,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AggregateResult, MonthTracePoint, RunSummary, SeverityModel, SimulationConfig,
    run_path_trace, run_stress_test,
};

pub use report::{format_count, format_currency, render_report};

const MAX_API_RUNS: u32 = 2_000_000;
const MAX_API_MONTHS: u32 = 1_200;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StressTestPayload {
    initial_fund: Option<f64>,
    base_drift: Option<f64>,
    base_volatility: Option<f64>,
    years: Option<u32>,
    months: Option<u32>,
    runs: Option<u32>,
    floor: Option<f64>,
    monthly_payout: Option<f64>,
    seed: Option<u64>,

    prob_recession: Option<f64>,
    prob_war: Option<f64>,
    prob_pandemic: Option<f64>,
    prob_black_swan: Option<f64>,
    prob_bull: Option<f64>,

    max_recession_drop: Option<f64>,
    max_war_drop: Option<f64>,
    max_pandemic_drop: Option<f64>,
    max_black_swan_drop: Option<f64>,
    max_bull_gain: Option<f64>,

    max_monthly_loss: Option<f64>,
    gamma_cap: Option<f64>,
    learning_rate: Option<f64>,
    severity_model: Option<SeverityModel>,

    run_index: Option<u64>,
}

#[derive(Debug)]
struct ApiRequest {
    config: SimulationConfig,
    run_index: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressTestResponse {
    config: SimulationConfig,
    result: AggregateResult,
    report: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PathTraceResponse {
    config: SimulationConfig,
    run_index: u64,
    summary: RunSummary,
    months: Vec<MonthTracePoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/defaults", get(defaults_handler))
        .route(
            "/api/stress-test",
            get(stress_test_get_handler).post(stress_test_post_handler),
        )
        .route(
            "/api/path-trace",
            get(path_trace_get_handler).post(path_trace_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "pension stress API listening");

    axum::serve(listener, app).await
}

async fn defaults_handler() -> Response {
    json_response(StatusCode::OK, SimulationConfig::default())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn stress_test_get_handler(Query(payload): Query<StressTestPayload>) -> Response {
    stress_test_handler_impl(payload).await
}

async fn stress_test_post_handler(Json(payload): Json<StressTestPayload>) -> Response {
    stress_test_handler_impl(payload).await
}

async fn path_trace_get_handler(Query(payload): Query<StressTestPayload>) -> Response {
    path_trace_handler_impl(payload).await
}

async fn path_trace_post_handler(Json(payload): Json<StressTestPayload>) -> Response {
    path_trace_handler_impl(payload).await
}

async fn stress_test_handler_impl(payload: StressTestPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected stress-test payload");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let config = request.config;
    let joined = tokio::task::spawn_blocking(move || {
        run_stress_test(&config).map(|result| (config, result))
    })
    .await;

    match joined {
        Ok(Ok((config, result))) => {
            let report = render_report(&result);
            json_response(
                StatusCode::OK,
                StressTestResponse {
                    config,
                    result,
                    report,
                },
            )
        }
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("simulation task failed: {e}"),
        ),
    }
}

async fn path_trace_handler_impl(payload: StressTestPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected path-trace payload");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    let ApiRequest { config, run_index } = request;
    let joined = tokio::task::spawn_blocking(move || {
        run_path_trace(&config, run_index).map(|trace| (config, trace))
    })
    .await;

    match joined {
        Ok(Ok((config, (summary, months)))) => json_response(
            StatusCode::OK,
            PathTraceResponse {
                config,
                run_index,
                summary,
                months,
            },
        ),
        Ok(Err(e)) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("simulation task failed: {e}"),
        ),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<StressTestPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: StressTestPayload) -> Result<ApiRequest, String> {
    let mut config = SimulationConfig::default();

    if let Some(v) = payload.initial_fund {
        config.initial_fund = v;
    }
    if let Some(v) = payload.base_drift {
        config.base_drift = v;
    }
    if let Some(v) = payload.base_volatility {
        config.base_volatility = v;
    }
    if let Some(v) = payload.years {
        config.months = v
            .checked_mul(12)
            .ok_or_else(|| "years is too large".to_string())?;
    }
    if let Some(v) = payload.months {
        config.months = v;
    }
    if let Some(v) = payload.runs {
        config.runs = v;
    }
    if let Some(v) = payload.floor {
        config.floor = v;
    }
    if let Some(v) = payload.monthly_payout {
        config.monthly_payout = v;
    }
    if let Some(v) = payload.seed {
        config.seed = v;
    }

    if let Some(v) = payload.prob_recession {
        config.base_probabilities.recession = v;
    }
    if let Some(v) = payload.prob_war {
        config.base_probabilities.war = v;
    }
    if let Some(v) = payload.prob_pandemic {
        config.base_probabilities.pandemic = v;
    }
    if let Some(v) = payload.prob_black_swan {
        config.base_probabilities.black_swan = v;
    }
    if let Some(v) = payload.prob_bull {
        config.base_probabilities.bull = v;
    }

    if let Some(v) = payload.max_recession_drop {
        config.magnitude_caps.recession = v;
    }
    if let Some(v) = payload.max_war_drop {
        config.magnitude_caps.war = v;
    }
    if let Some(v) = payload.max_pandemic_drop {
        config.magnitude_caps.pandemic = v;
    }
    if let Some(v) = payload.max_black_swan_drop {
        config.magnitude_caps.black_swan = v;
    }
    if let Some(v) = payload.max_bull_gain {
        config.magnitude_caps.bull = v;
    }

    if let Some(v) = payload.max_monthly_loss {
        config.max_monthly_loss = v;
    }
    if let Some(v) = payload.gamma_cap {
        config.gamma_cap = v;
    }
    if let Some(v) = payload.learning_rate {
        config.learning_rate = v;
    }
    if let Some(v) = payload.severity_model {
        config.severity_model = v;
    }

    if config.runs > MAX_API_RUNS {
        return Err(format!("runs must be <= {MAX_API_RUNS}"));
    }
    if config.months > MAX_API_MONTHS {
        return Err(format!("months must be <= {MAX_API_MONTHS}"));
    }
    config.validate().map_err(|e| e.to_string())?;

    let run_index = payload.run_index.unwrap_or(0);
    if run_index >= u64::from(config.runs) {
        return Err("runIndex must be < runs".to_string());
    }

    Ok(ApiRequest { config, run_index })
}
