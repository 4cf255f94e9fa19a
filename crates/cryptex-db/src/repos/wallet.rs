//! Wallet and balance repository

use chrono::Utc;
use cryptex_types::{TransactionKind, WalletStatus, WalletType};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{DbError, DbResult, DbWallet, DbWalletTransaction};

/// Wallet repository for managing balances
pub struct WalletRepo {
    pool: SqlitePool,
}

impl WalletRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new zero-balance wallet.
    ///
    /// The user's first wallet becomes their default one.
    pub async fn create(
        &self,
        user_id: Uuid,
        currency: &str,
        wallet_type: WalletType,
        label: Option<&str>,
    ) -> DbResult<DbWallet> {
        let now = Utc::now();
        let wallet = sqlx::query_as::<_, DbWallet>(
            r#"
            INSERT INTO wallets
                (id, user_id, currency, wallet_type, address, label, is_default, status,
                 balance, available_balance, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, (SELECT COUNT(*) = 0 FROM wallets WHERE user_id = ?), ?, 0, 0, ?, ?)
            RETURNING *
            "#
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(currency)
        .bind(wallet_type.as_str())
        .bind(generate_address())
        .bind(label)
        .bind(user_id)
        .bind(WalletStatus::Active.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, &format!("{} {} wallet", currency, wallet_type)))?;

        Ok(wallet)
    }

    /// Find wallet by ID
    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbWallet>> {
        let wallet = sqlx::query_as::<_, DbWallet>("SELECT * FROM wallets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(wallet)
    }

    /// Find a wallet by ID, only if it belongs to `user_id`
    pub async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> DbResult<Option<DbWallet>> {
        let wallet = sqlx::query_as::<_, DbWallet>(
            "SELECT * FROM wallets WHERE id = ? AND user_id = ?"
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// Find the user's wallet for a currency and type
    pub async fn find_by_user_and_currency(
        &self,
        user_id: Uuid,
        currency: &str,
        wallet_type: WalletType,
    ) -> DbResult<Option<DbWallet>> {
        let wallet = sqlx::query_as::<_, DbWallet>(
            r#"
            SELECT * FROM wallets
            WHERE user_id = ? AND currency = ? AND wallet_type = ?
            "#
        )
        .bind(user_id)
        .bind(currency)
        .bind(wallet_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    /// List all wallets for user
    pub async fn list_by_user(&self, user_id: Uuid) -> DbResult<Vec<DbWallet>> {
        let wallets = sqlx::query_as::<_, DbWallet>(
            "SELECT * FROM wallets WHERE user_id = ? ORDER BY currency"
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(wallets)
    }

    // =========================================================================
    // Balance Operations
    // =========================================================================

    /// Credit external funds to a wallet (raises balance and available balance)
    pub async fn deposit(
        &self,
        wallet_id: Uuid,
        amount: i64,
        reference_id: Option<Uuid>,
    ) -> DbResult<DbWallet> {
        if amount <= 0 {
            return Err(DbError::InvalidInput("Deposit amount must be positive".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let wallet = sqlx::query_as::<_, DbWallet>(
            r#"
            UPDATE wallets
            SET balance = balance + ?, available_balance = available_balance + ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#
        )
        .bind(amount)
        .bind(amount)
        .bind(Utc::now())
        .bind(wallet_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Wallet {}", wallet_id)))?;

        Self::record(&mut *tx, &wallet, TransactionKind::Deposit, amount, reference_id).await?;

        tx.commit().await?;

        Ok(wallet)
    }

    /// Lock `amount` of the wallet's available balance.
    ///
    /// The availability check and the decrement are a single conditional
    /// `UPDATE`, so two reservations racing on the same wallet can never
    /// both pass a check that only one of them fits.
    pub async fn reserve(
        conn: &mut SqliteConnection,
        wallet_id: Uuid,
        amount: i64,
        reference_id: Uuid,
    ) -> DbResult<DbWallet> {
        if amount <= 0 {
            return Err(DbError::InvalidInput("Reservation amount must be positive".to_string()));
        }

        let wallet = sqlx::query_as::<_, DbWallet>(
            r#"
            UPDATE wallets
            SET available_balance = available_balance - ?, updated_at = ?
            WHERE id = ? AND status = ? AND available_balance >= ?
            RETURNING *
            "#
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(wallet_id)
        .bind(WalletStatus::Active.as_str())
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?;

        let wallet = match wallet {
            Some(wallet) => wallet,
            None => return Err(Self::reserve_refusal(conn, wallet_id).await),
        };

        Self::record(conn, &wallet, TransactionKind::OrderLock, -amount, Some(reference_id)).await?;

        Ok(wallet)
    }

    /// Explain why a reservation matched no row
    async fn reserve_refusal(conn: &mut SqliteConnection, wallet_id: Uuid) -> DbError {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM wallets WHERE id = ?")
            .bind(wallet_id)
            .fetch_optional(&mut *conn)
            .await;

        match status {
            Ok(None) => DbError::NotFound(format!("Wallet {}", wallet_id)),
            Ok(Some(status)) if status != WalletStatus::Active.as_str() => DbError::WalletInactive {
                wallet: wallet_id.to_string(),
                status,
            },
            Ok(Some(_)) => DbError::InsufficientBalance(format!("Wallet {}", wallet_id)),
            Err(e) => DbError::Query(e),
        }
    }

    /// Change a wallet's lifecycle status.
    ///
    /// Funds already locked by open orders stay locked and are still
    /// returned on cancel; only new reservations are refused.
    pub async fn set_status(&self, wallet_id: Uuid, status: WalletStatus) -> DbResult<DbWallet> {
        let wallet = sqlx::query_as::<_, DbWallet>(
            "UPDATE wallets SET status = ?, updated_at = ? WHERE id = ? RETURNING *"
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Wallet {}", wallet_id)))?;

        Ok(wallet)
    }

    /// Return `amount` to the wallet's available balance.
    ///
    /// Refuses to raise the available balance above the total balance.
    pub async fn release(
        conn: &mut SqliteConnection,
        wallet_id: Uuid,
        amount: i64,
        reference_id: Uuid,
    ) -> DbResult<DbWallet> {
        if amount < 0 {
            return Err(DbError::InvalidInput("Release amount must not be negative".to_string()));
        }

        let wallet = sqlx::query_as::<_, DbWallet>(
            r#"
            UPDATE wallets
            SET available_balance = available_balance + ?, updated_at = ?
            WHERE id = ? AND available_balance + ? <= balance
            RETURNING *
            "#
        )
        .bind(amount)
        .bind(Utc::now())
        .bind(wallet_id)
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            DbError::Constraint(format!(
                "Releasing {} atoms would exceed the balance of wallet {}",
                amount, wallet_id
            ))
        })?;

        Self::record(conn, &wallet, TransactionKind::OrderRelease, amount, Some(reference_id)).await?;

        Ok(wallet)
    }

    /// Wallet ledger, newest first
    pub async fn transactions(
        &self,
        wallet_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbWalletTransaction>> {
        let rows = sqlx::query_as::<_, DbWalletTransaction>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE wallet_id = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ? OFFSET ?
            "#
        )
        .bind(wallet_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_transactions(&self, wallet_id: Uuid) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM wallet_transactions WHERE wallet_id = ?"
        )
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn record(
        conn: &mut SqliteConnection,
        wallet: &DbWallet,
        kind: TransactionKind,
        amount: i64,
        reference_id: Option<Uuid>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallet_transactions
                (id, wallet_id, kind, amount, balance_after, available_after, reference_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(Uuid::new_v4())
        .bind(wallet.id)
        .bind(kind.as_str())
        .bind(amount)
        .bind(wallet.balance)
        .bind(wallet.available_balance)
        .bind(reference_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

/// Generate a wallet address: `0x` followed by 40 hex characters
fn generate_address() -> String {
    let bytes: [u8; 20] = rand::random();
    format!("0x{}", hex::encode(bytes))
}
