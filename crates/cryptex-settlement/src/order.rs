//! Order view shared by API responses and outbox events

use chrono::{DateTime, Utc};
use cryptex_db::DbOrder;
use cryptex_types::{from_atoms, OrderSide, OrderStatus, OrderType, TypesError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trading_pair_id: i64,
    pub wallet_id: Uuid,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: Decimal,
    pub amount: Decimal,
    pub remaining_amount: Decimal,
    pub total: Decimal,
    pub reserved_amount: Decimal,
    pub status: OrderStatus,
    pub maker_fee_rate: Decimal,
    pub taker_fee_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Quantity filled so far
    pub fn filled_amount(&self) -> Decimal {
        self.amount - self.remaining_amount
    }
}

impl TryFrom<DbOrder> for Order {
    type Error = TypesError;

    fn try_from(row: DbOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            trading_pair_id: row.trading_pair_id,
            wallet_id: row.wallet_id,
            side: row.side.parse()?,
            order_type: row.order_type.parse()?,
            price: from_atoms(row.price),
            amount: from_atoms(row.amount),
            remaining_amount: from_atoms(row.remaining_amount),
            total: from_atoms(row.total),
            reserved_amount: from_atoms(row.reserved_amount),
            status: row.status.parse()?,
            maker_fee_rate: from_atoms(row.maker_fee_rate),
            taker_fee_rate: from_atoms(row.taker_fee_rate),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row() -> DbOrder {
        let now = Utc::now();
        DbOrder {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            trading_pair_id: 1,
            wallet_id: Uuid::new_v4(),
            side: "buy".into(),
            order_type: "limit".into(),
            price: 10_000_000_000,
            amount: 200_000_000,
            remaining_amount: 50_000_000,
            total: 20_000_000_000,
            reserved_amount: 20_000_000_000,
            status: "partial".into(),
            maker_fee_rate: 100_000,
            taker_fee_rate: 200_000,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_from_row_converts_atoms() {
        let order = Order::try_from(row()).unwrap();
        assert_eq!(order.price, dec!(100));
        assert_eq!(order.amount, dec!(2));
        assert_eq!(order.filled_amount(), dec!(1.5));
        assert_eq!(order.maker_fee_rate, dec!(0.001));
        assert_eq!(order.status, OrderStatus::Partial);
    }

    #[test]
    fn test_serializes_camel_case_with_type_field() {
        let json = serde_json::to_value(Order::try_from(row()).unwrap()).unwrap();
        assert_eq!(json["type"], "limit");
        assert_eq!(json["side"], "buy");
        assert!(json.get("remainingAmount").is_some());
        assert!(json.get("tradingPairId").is_some());
    }

    #[test]
    fn test_rejects_unknown_side() {
        let mut bad = row();
        bad.side = "hold".into();
        assert!(Order::try_from(bad).is_err());
    }
}
