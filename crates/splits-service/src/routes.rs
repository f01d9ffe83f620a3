use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use splits::engine::{
    ApproveIntentRequest, CreateSplitRequest, SettleRequest, SubmitSignatureRequest,
};

use crate::error::ApiError;
use crate::metrics;
use crate::state::AppState;
use crate::validation::{require_address, require_decimal, require_hex_bytes};

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "splits-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

#[post("/splits")]
pub async fn create_split(
    state: web::Data<AppState>,
    body: web::Json<CreateSplitRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = body.into_inner();

    require_address("payer", &req.payer)?;
    require_address("token", &req.token)?;
    for leg in &req.legs {
        require_address("participant", &leg.participant)?;
        require_decimal("amount", &leg.amount)?;
    }
    if let Some(meta_hash) = req.meta_hash.as_deref() {
        require_hex_bytes("metaHash", meta_hash, 32)?;
    }

    match state.engine.create_split(req).await {
        Ok(resp) => {
            metrics::SPLITS_CREATED.with_label_values(&["success"]).inc();
            Ok(HttpResponse::Created().json(resp))
        }
        Err(e) => {
            metrics::SPLITS_CREATED.with_label_values(&["error"]).inc();
            Err(e.into())
        }
    }
}

#[get("/splits/{id}")]
pub async fn get_split(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let split_id = path.into_inner();
    let view = state.engine.get_split(split_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[post("/splits/{id}/approve-intent")]
pub async fn approve_intent(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<ApproveIntentRequest>,
) -> Result<HttpResponse, ApiError> {
    let split_id = path.into_inner();
    let req = body.into_inner();

    require_address("participant", &req.participant)?;

    let payload = state.engine.approve_intent(split_id, req).await?;
    Ok(HttpResponse::Ok().json(payload))
}

#[post("/splits/{id}/signatures")]
pub async fn submit_signature(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<SubmitSignatureRequest>,
) -> Result<HttpResponse, ApiError> {
    let split_id = path.into_inner();
    let req = body.into_inner();

    require_address("participant", &req.participant)?;
    require_decimal("amount", &req.amount)?;
    require_hex_bytes("salt", &req.salt, 32)?;
    require_hex_bytes("signature", &req.signature, 65)?;

    match state.engine.submit_signature(split_id, req).await {
        Ok(view) => {
            metrics::SIGNATURES_SUBMITTED
                .with_label_values(&["accepted"])
                .inc();
            Ok(HttpResponse::Ok().json(view))
        }
        Err(e) => {
            metrics::SIGNATURES_SUBMITTED
                .with_label_values(&["rejected"])
                .inc();
            Err(e.into())
        }
    }
}

#[post("/splits/{id}/settle")]
pub async fn settle(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    body: web::Json<SettleRequest>,
) -> Result<HttpResponse, ApiError> {
    let split_id = path.into_inner();
    let req = body.into_inner();

    if let Some(items) = req.items.as_deref() {
        for item in items {
            require_address("participant", &item.participant)?;
            require_decimal("amount", &item.amount)?;
            require_hex_bytes("salt", &item.salt, 32)?;
            require_hex_bytes("signature", &item.signature, 65)?;
        }
    }

    let start = std::time::Instant::now();
    match state.engine.settle(split_id, req).await {
        Ok(resp) => {
            let elapsed = start.elapsed().as_secs_f64();
            metrics::SETTLE_REQUESTS.with_label_values(&["success"]).inc();
            metrics::SETTLE_LATENCY
                .with_label_values(&["success"])
                .observe(elapsed);
            Ok(HttpResponse::Ok().json(resp))
        }
        Err(e) => {
            let elapsed = start.elapsed().as_secs_f64();
            metrics::SETTLE_REQUESTS.with_label_values(&["error"]).inc();
            metrics::SETTLE_LATENCY
                .with_label_values(&["error"])
                .observe(elapsed);
            Err(e.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AllowanceQuery {
    pub token: String,
    pub owner: String,
}

#[get("/splits/allowances/check")]
pub async fn check_allowance(
    state: web::Data<AppState>,
    query: web::Query<AllowanceQuery>,
) -> Result<HttpResponse, ApiError> {
    require_address("token", &query.token)?;
    require_address("owner", &query.owner)?;

    let view = state.engine.check_allowance(&query.token, &query.owner).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[get("/tokens")]
pub async fn list_tokens(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let tokens = state.engine.list_tokens().await?;
    let count = tokens.len();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "tokens": tokens,
        "count": count,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(metrics_endpoint)
        .service(check_allowance)
        .service(create_split)
        .service(get_split)
        .service(approve_intent)
        .service(submit_signature)
        .service(settle)
        .service(list_tokens);
}
