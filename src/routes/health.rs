//! Health Check Endpoint
//!
//! # Interview Q&A
//!
//! Q: Health check 엔드포인트는 왜 필요한가?
//! A: 3가지 용도
//!    1. 로드밸런서/Railway 헬스체크
//!    2. Kubernetes liveness/readiness probe
//!    3. 모니터링 시스템 연동
//!
//! Q: 저장소 상태도 체크하는 이유는?
//! A: "깊은 헬스체크"(deep health check) 패턴
//!    - 단순 200 OK: 프로세스 살아있음
//!    - 저장소 ping: 실제 서비스 가능 상태

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check 응답
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: StoreStatus,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StoreStatus {
    pub backend: String,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// GET /health
///
/// 서버 및 저장소 상태 확인
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ping_start = std::time::Instant::now();
    let store_status = match state.store.ping().await {
        Ok(_) => StoreStatus {
            backend: state.store.backend().to_string(),
            connected: true,
            latency_ms: Some(ping_start.elapsed().as_millis() as u64),
        },
        Err(_) => StoreStatus {
            backend: state.store.backend().to_string(),
            connected: false,
            latency_ms: None,
        },
    };

    Json(HealthResponse {
        status: if store_status.connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store_status,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
