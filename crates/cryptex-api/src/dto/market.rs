//! Trading pair DTOs

use cryptex_db::DbTradingPair;
use cryptex_types::from_atoms;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPairView {
    pub id: i64,
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub is_active: bool,
}

impl From<DbTradingPair> for TradingPairView {
    fn from(p: DbTradingPair) -> Self {
        Self {
            id: p.id,
            symbol: p.symbol,
            base_currency: p.base_currency,
            quote_currency: p.quote_currency,
            maker_fee: from_atoms(p.maker_fee),
            taker_fee: from_atoms(p.taker_fee),
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPairListResponse {
    pub trading_pairs: Vec<TradingPairView>,
}
