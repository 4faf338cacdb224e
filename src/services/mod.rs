//! Services Module
//!
//! 인메모리 비즈니스 서비스 레이어
//!
//! # Services
//! - `UpdateDeduplicator`: 인바운드 이벤트 중복 제거 게이트
//! - `ReferralTelemetryGraph`: 분석 전용 인메모리 추천 그래프
//! - `Notifier`: 아웃바운드 알림 경계 (fire-and-forget)
//! - `UpdateDispatcher`: 명령 디스패치 협력자 경계

mod dedup;
mod telemetry;
mod notifier;
mod dispatch;

pub use dedup::UpdateDeduplicator;
pub use telemetry::{ReferralNode, ReferralTelemetryGraph, TelemetryStats, VisitEvent};
pub use notifier::{NoopNotifier, Notifier, TelegramNotifier};
pub use dispatch::{LoggingDispatcher, UpdateDispatcher};
