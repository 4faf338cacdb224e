//! Community Gateway API Library
//!
//! # Overview
//!
//! 이 라이브러리는 유료 커뮤니티/추천 프로그램 게이트웨이 봇의 백엔드를 제공합니다.
//! 결제 증빙 제출 → 운영자 승인/거절 → 프로모터 전환 → 추천 체인 추적이 핵심 흐름입니다.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌──────────┐  │
//! │  │ Routes  │  │ Services │  │   DB    │  │  Config  │  │
//! │  └────┬────┘  └────┬─────┘  └────┬────┘  └────┬─────┘  │
//! │       │            │             │            │         │
//! │       └────────────┴─────────────┴────────────┘         │
//! │                         │                                │
//! └─────────────────────────┼────────────────────────────────┘
//!                           │
//!                           ▼
//!                  ┌────────────────┐
//!                  │  Bot Platform  │
//!                  └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 인메모리 비즈니스 서비스 (중복 제거, 텔레메트리 그래프, 알림)
//! - `db`: 결제/추천 원장 저장소
//!
//! ## Usage
//!
//! ```rust,ignore
//! use community_gateway_api::{config::Config, db::Database};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let db = Database::connect(config.database_url.as_deref().unwrap()).await?;
//!     db.init_schema().await?;
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;

// Re-exports for convenience
pub use config::Config;
pub use error::ApiError;
pub use db::Database;
pub use db::repository::GatewayStore;
pub use services::{Notifier, ReferralTelemetryGraph, UpdateDeduplicator, UpdateDispatcher};

/// 애플리케이션 전역 상태
///
/// 모든 서비스 객체는 프로세스 시작 시 한 번 생성되어 핸들러에 주입된다.
/// 모듈 수준 전역 상태는 사용하지 않는다.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GatewayStore>,
    pub dedup: Arc<UpdateDeduplicator>,
    pub telemetry: Arc<ReferralTelemetryGraph>,
    pub notifier: Arc<dyn Notifier>,
    pub dispatcher: Arc<dyn UpdateDispatcher>,
    pub config: Arc<Config>,
}
