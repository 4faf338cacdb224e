//! Public Config Endpoints
//!
//! 랜딩 페이지/클라이언트가 읽는 정적 프로젝트 설정. 인증 없음.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PublicConfigResponse {
    pub project: String,
    pub landing_url: String,
    pub bot_link: String,
    pub community_group_link: String,
    pub token_symbol: String,
    pub token_contract: String,
    pub token_decimals: u8,
    pub token_price_ils: f64,
}

#[derive(Debug, Serialize)]
pub struct TokenPriceResponse {
    pub symbol: String,
    pub contract: String,
    pub decimals: u8,
    pub price_ils: f64,
    pub source: String,
    pub updated_at: String,
}

/// GET /config/public
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    let config = &state.config;
    Json(PublicConfigResponse {
        project: env!("CARGO_PKG_NAME").to_string(),
        landing_url: config.landing_url.clone(),
        bot_link: format!("https://t.me/{}", config.bot_username),
        community_group_link: config.community_group_link.clone(),
        token_symbol: config.token.symbol.clone(),
        token_contract: config.token.contract.clone(),
        token_decimals: config.token.decimals,
        token_price_ils: config.token.price_ils,
    })
}

/// GET /api/token/price
///
/// 수동 설정 가격. 온체인/거래소 오라클 연동은 외부 협력자의 몫.
pub async fn token_price(State(state): State<AppState>) -> Json<TokenPriceResponse> {
    let token = &state.config.token;
    Json(TokenPriceResponse {
        symbol: token.symbol.clone(),
        contract: token.contract.clone(),
        decimals: token.decimals,
        price_ils: token.price_ils,
        source: "manual_config".to_string(),
        updated_at: chrono::Utc::now().to_rfc3339(),
    })
}
