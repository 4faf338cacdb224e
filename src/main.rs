//! Community Gateway API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Bot Platform / Landing / Admin                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /health  /webhook  /api/payments/*  /api/referrals/*   ││
//! │  │  /api/promoters/*  /api/referral/*  /admin/stats        ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  UpdateDeduplicator   TelemetryGraph   Notifier         ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Data Layer                          ││
//! │  │  GatewayStore (PostgreSQL / no-op)                      ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use community_gateway_api::{
    routes,
    services::{LoggingDispatcher, NoopNotifier, TelegramNotifier},
    AppState, Config, Database, GatewayStore, Notifier, ReferralTelemetryGraph,
    UpdateDeduplicator,
};
use community_gateway_api::db::repository::NullStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "community_gateway_api=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Community Gateway API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!("📋 Configuration loaded");

    // 저장소 선택 — 여기서 단 한 번
    let store: Arc<dyn GatewayStore> = match &config.database_url {
        Some(database_url) => {
            let db = Database::connect(database_url).await?;
            db.init_schema().await?;
            tracing::info!("🗄️  Database connected, schema ensured");
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set – running with the no-op store");
            Arc::new(NullStore)
        }
    };

    // 알림 경계 선택
    let notifier: Arc<dyn Notifier> = match &config.bot_token {
        Some(token) => {
            tracing::info!("📨 Platform notifier enabled");
            Arc::new(TelegramNotifier::new(token, config.admin_log_chat_id))
        }
        None => {
            tracing::warn!("BOT_TOKEN is not set – notifications will only be logged");
            Arc::new(NoopNotifier)
        }
    };

    // 앱 상태 구성 — 프로세스 수명 서비스들은 여기서 한 번 생성된다
    let state = AppState {
        store,
        dedup: Arc::new(UpdateDeduplicator::new()),
        telemetry: Arc::new(ReferralTelemetryGraph::new()),
        notifier,
        dispatcher: Arc::new(LoggingDispatcher),
        config: Arc::new(config.clone()),
    };

    // 라우터 구성
    let app = create_router(state);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                  - 서버/저장소 상태
/// GET  /config/public           - 공개 프로젝트 설정
/// GET  /api/token/price         - 토큰 가격 (수동 설정)
///
/// POST /webhook                 - 인바운드 update (중복 제거 게이트)
///
/// POST /api/payments/submit     - 결제 증빙 제출
/// POST /api/payments/resolve    - 승인/거절 (admin)
/// GET  /api/payments/stats      - 승인 통계 (admin)
/// GET  /api/payments/monthly    - 월별 분해 (admin)
///
/// POST /api/referrals           - 추천 간선 기록
/// GET  /api/referrals/top       - 리더보드
/// GET  /api/promoters/:user_id  - 프로모터 요약
/// POST /api/promoters/:user_id/settings - 설정 부분 업데이트
///
/// POST /api/referral/track_visit - 텔레메트리 방문 기록
/// GET  /api/referral/stats       - 텔레메트리 그래프 통계
/// GET  /api/referral/tree/:user_id - 추천 트리
///
/// GET  /admin/stats             - 대시보드 집계 (admin)
/// POST /api/rewards             - 수동 리워드 (admin)
/// ```
fn create_router(state: AppState) -> Router {
    // CORS 설정
    // 프로덕션에서는 특정 도메인만 허용, 개발 환경에서는 전체 허용
    let cors = if state.config.is_production() {
        let allowed_origins = std::env::var("ALLOWED_ORIGINS").unwrap_or_default();
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health & public config
        .route("/health", get(routes::health::health_check))
        .route("/config/public", get(routes::public::public_config))
        .route("/api/token/price", get(routes::public::token_price))

        // Inbound events
        .route("/webhook", post(routes::webhook::telegram_webhook))

        // Payment ledger
        .route("/api/payments/submit", post(routes::payments::submit_payment))
        .route("/api/payments/resolve", post(routes::payments::resolve_payment))
        .route("/api/payments/stats", get(routes::payments::payment_stats))
        .route("/api/payments/monthly", get(routes::payments::monthly_breakdown))

        // Referral graph & promoters
        .route("/api/referrals", post(routes::referrals::add_referral))
        .route("/api/referrals/top", get(routes::referrals::top_referrers))
        .route("/api/promoters/:user_id", get(routes::referrals::promoter_summary))
        .route(
            "/api/promoters/:user_id/settings",
            post(routes::referrals::update_promoter_settings),
        )

        // Telemetry graph
        .route("/api/referral/track_visit", post(routes::telemetry::track_visit))
        .route("/api/referral/stats", get(routes::telemetry::referral_stats))
        .route("/api/referral/tree/:user_id", get(routes::telemetry::referral_tree))

        // Admin
        .route("/admin/stats", get(routes::admin::admin_stats))
        .route("/api/rewards", post(routes::admin::create_reward))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}
