//! Order and trade DTOs

use chrono::{DateTime, Utc};
use cryptex_db::DbTrade;
use cryptex_settlement::{Order, PlaceOrder};
use cryptex_types::{from_atoms, OrderSide, OrderStatus, OrderType, TypesError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::{DecimalInput, PageMeta};

/// Place order request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(range(min = 1, message = "tradingPairId must be a positive id"))]
    pub trading_pair_id: i64,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: DecimalInput,
    pub amount: DecimalInput,
}

impl CreateOrderRequest {
    pub fn into_place_order(self) -> Result<PlaceOrder, TypesError> {
        Ok(PlaceOrder {
            trading_pair_id: self.trading_pair_id,
            side: self.side,
            order_type: self.order_type,
            price: self.price.positive("price")?,
            amount: self.amount.positive("amount")?,
        })
    }
}

/// Order list filters
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub trading_pair_id: Option<i64>,
}

/// Order mutation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub message: String,
    pub order: Order,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    #[serde(flatten)]
    pub page: PageMeta,
}

/// Trade list filters
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TradeQuery {
    pub trading_pair_id: Option<i64>,
}

/// A fill between two orders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeView {
    pub id: Uuid,
    pub trading_pair_id: i64,
    pub maker_order_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_user_id: Uuid,
    pub taker_user_id: Uuid,
    pub price: Decimal,
    pub amount: Decimal,
    pub total: Decimal,
    pub maker_fee: Decimal,
    pub taker_fee: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<DbTrade> for TradeView {
    fn from(t: DbTrade) -> Self {
        Self {
            id: t.id,
            trading_pair_id: t.trading_pair_id,
            maker_order_id: t.maker_order_id,
            taker_order_id: t.taker_order_id,
            maker_user_id: t.maker_user_id,
            taker_user_id: t.taker_user_id,
            price: from_atoms(t.price),
            amount: from_atoms(t.amount),
            total: from_atoms(t.total),
            maker_fee: from_atoms(t.maker_fee),
            taker_fee: from_atoms(t.taker_fee),
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeListResponse {
    pub trades: Vec<TradeView>,
    #[serde(flatten)]
    pub page: PageMeta,
}
