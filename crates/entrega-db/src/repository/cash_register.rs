//! # Cash Register Repository
//!
//! Sessions and their ledger.
//!
//! ## Write Paths
//! ```text
//! open_session ──► INSERT cash_sessions (status open)
//!                  INSERT cash_transactions (kind opening)
//!
//! record_transaction ──► session open?  ──► withdrawal ≤ expected cash?
//!                                                 │
//!                                                 ▼
//!                                    INSERT cash_transactions
//!
//! close_session ──► summarize ledger ──► reconcile(counted)
//!                                                 │
//!                                                 ▼
//!                          UPDATE cash_sessions (closed, expected, variance)
//! ```
//!
//! Each path runs in one transaction so the checks and the write see the
//! same ledger.

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use entrega_core::cash::{
    check_withdrawal, reconcile, summarize, validate_opening_float, NewCashTransaction,
};
use entrega_core::money::Money;
use entrega_core::validation::validate_operator;
use entrega_core::{
    CashRegisterSession, CashTransaction, PaymentMethod, Reconciliation, SessionStatus,
    SessionSummary, TransactionKind,
};

const SESSION_COLUMNS: &str = "id, operator, status, opening_float, counted_cash, \
     expected_cash, variance, notes, opened_at, closed_at";

const TRANSACTION_COLUMNS: &str =
    "id, session_id, kind, payment_method, amount, order_id, description, created_at";

/// Repository for cash register sessions.
#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    pool: SqlitePool,
}

impl CashRegisterRepository {
    /// Creates a new CashRegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterRepository { pool }
    }

    /// Opens a session for `operator` with the given float.
    ///
    /// ## Errors
    /// * `Conflict` - the operator already has an open session
    pub async fn open_session(
        &self,
        operator: &str,
        opening_float: Money,
    ) -> DbResult<CashRegisterSession> {
        validate_operator(operator)?;
        validate_opening_float(opening_float)?;
        let operator = operator.trim();

        let mut tx = self.pool.begin().await?;

        if fetch_open_session(&mut *tx, operator).await?.is_some() {
            return Err(open_session_conflict(operator));
        }

        let now = Utc::now();
        let session = CashRegisterSession {
            id: Uuid::new_v4().to_string(),
            operator: operator.to_string(),
            status: SessionStatus::Open,
            opening_float,
            counted_cash: None,
            expected_cash: None,
            variance: None,
            notes: None,
            opened_at: now,
            closed_at: None,
        };

        let inserted = sqlx::query(&format!(
            "INSERT INTO cash_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(&session.id)
        .bind(&session.operator)
        .bind(session.status)
        .bind(session.opening_float)
        .bind(session.counted_cash)
        .bind(session.expected_cash)
        .bind(session.variance)
        .bind(&session.notes)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from);

        // The partial unique index backs up the check above
        if let Err(err) = inserted {
            return Err(if err.is_unique_violation() {
                open_session_conflict(operator)
            } else {
                err
            });
        }

        let opening = CashTransaction {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            kind: TransactionKind::Opening,
            payment_method: PaymentMethod::Cash,
            amount: opening_float,
            order_id: None,
            description: Some("Troco inicial".to_string()),
            created_at: now,
        };
        insert_transaction(&mut *tx, &opening).await?;

        tx.commit().await?;

        info!(
            id = %session.id,
            operator = %session.operator,
            opening_float = %session.opening_float,
            "Cash register session opened"
        );

        Ok(session)
    }

    /// The operator's open session, if any.
    pub async fn current_session(&self, operator: &str) -> DbResult<Option<CashRegisterSession>> {
        fetch_open_session(&self.pool, operator.trim()).await
    }

    /// Gets a session by ID.
    pub async fn get_session(&self, id: &str) -> DbResult<Option<CashRegisterSession>> {
        fetch_session(&self.pool, id).await
    }

    /// Adds a sale, withdrawal or deposit to an open session.
    ///
    /// ## Errors
    /// * `Domain(SessionClosed)` - session already closed
    /// * `Domain(InsufficientCash)` - withdrawal above the expected cash
    pub async fn record_transaction(
        &self,
        session_id: &str,
        new: &NewCashTransaction,
    ) -> DbResult<CashTransaction> {
        new.validate()?;

        let mut tx = self.pool.begin().await?;

        let session = fetch_session(&mut *tx, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cash register session", session_id))?;
        session.ensure_open()?;

        if new.kind == TransactionKind::Withdrawal {
            let ledger = fetch_transactions(&mut *tx, session_id).await?;
            check_withdrawal(&summarize(&session, &ledger)?, new.amount)?;
        }

        let transaction = CashTransaction {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            kind: new.kind,
            payment_method: new.payment_method,
            amount: new.amount,
            order_id: new.order_id.clone(),
            description: new.description.clone(),
            created_at: Utc::now(),
        };
        insert_transaction(&mut *tx, &transaction).await?;

        tx.commit().await?;

        debug!(
            session_id = %transaction.session_id,
            kind = ?transaction.kind,
            amount = %transaction.amount,
            "Cash transaction recorded"
        );

        Ok(transaction)
    }

    /// The ledger of a session, oldest first.
    pub async fn list_transactions(&self, session_id: &str) -> DbResult<Vec<CashTransaction>> {
        fetch_transactions(&self.pool, session_id).await
    }

    /// Session plus its ledger totals.
    pub async fn summary(
        &self,
        session_id: &str,
    ) -> DbResult<(CashRegisterSession, SessionSummary)> {
        let session = self
            .get_session(session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cash register session", session_id))?;
        let ledger = self.list_transactions(session_id).await?;
        let summary = summarize(&session, &ledger)?;
        Ok((session, summary))
    }

    /// Closes a session, storing expected cash and variance.
    pub async fn close_session(
        &self,
        session_id: &str,
        counted_cash: Money,
        notes: Option<&str>,
    ) -> DbResult<(CashRegisterSession, Reconciliation)> {
        let mut tx = self.pool.begin().await?;

        let mut session = fetch_session(&mut *tx, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cash register session", session_id))?;
        session.ensure_open()?;

        let ledger = fetch_transactions(&mut *tx, session_id).await?;
        let reconciliation = reconcile(&summarize(&session, &ledger)?, counted_cash)?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = ?1,
                counted_cash = ?2,
                expected_cash = ?3,
                variance = ?4,
                notes = ?5,
                closed_at = ?6
            WHERE id = ?7 AND status = 'open'
            "#,
        )
        .bind(SessionStatus::Closed)
        .bind(reconciliation.counted_cash)
        .bind(reconciliation.expected_cash)
        .bind(reconciliation.variance)
        .bind(notes)
        .bind(now)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "cash register session {session_id} was closed concurrently"
            )));
        }

        tx.commit().await?;

        session.status = SessionStatus::Closed;
        session.counted_cash = Some(reconciliation.counted_cash);
        session.expected_cash = Some(reconciliation.expected_cash);
        session.variance = Some(reconciliation.variance);
        session.notes = notes.map(str::to_string);
        session.closed_at = Some(now);

        if reconciliation.variance.is_zero() {
            info!(id = %session.id, operator = %session.operator, "Cash register closed balanced");
        } else {
            warn!(
                id = %session.id,
                operator = %session.operator,
                expected = %reconciliation.expected_cash,
                counted = %reconciliation.counted_cash,
                variance = %reconciliation.variance,
                "Cash register closed with variance"
            );
        }

        Ok((session, reconciliation))
    }

    /// Sessions opened in the last `limit` shifts, newest first.
    pub async fn list_sessions(&self, limit: i64) -> DbResult<Vec<CashRegisterSession>> {
        let sessions = sqlx::query_as::<_, CashRegisterSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions ORDER BY opened_at DESC LIMIT ?1"
        ))
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

fn open_session_conflict(operator: &str) -> DbError {
    DbError::Conflict(format!(
        "operator '{operator}' already has an open cash register session"
    ))
}

// =============================================================================
// Shared queries (pool or transaction)
// =============================================================================

async fn fetch_session<'e, E>(exec: E, id: &str) -> DbResult<Option<CashRegisterSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let session = sqlx::query_as::<_, CashRegisterSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;

    Ok(session)
}

async fn fetch_open_session<'e, E>(exec: E, operator: &str) -> DbResult<Option<CashRegisterSession>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let session = sqlx::query_as::<_, CashRegisterSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE operator = ?1 AND status = 'open'"
    ))
    .bind(operator)
    .fetch_optional(exec)
    .await?;

    Ok(session)
}

async fn fetch_transactions<'e, E>(exec: E, session_id: &str) -> DbResult<Vec<CashTransaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let transactions = sqlx::query_as::<_, CashTransaction>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM cash_transactions \
         WHERE session_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(session_id)
    .fetch_all(exec)
    .await?;

    Ok(transactions)
}

async fn insert_transaction<'e, E>(exec: E, transaction: &CashTransaction) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(&format!(
        "INSERT INTO cash_transactions ({TRANSACTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ))
    .bind(&transaction.id)
    .bind(&transaction.session_id)
    .bind(transaction.kind)
    .bind(transaction.payment_method)
    .bind(transaction.amount)
    .bind(&transaction.order_id)
    .bind(&transaction.description)
    .bind(transaction.created_at)
    .execute(exec)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use entrega_core::{CoreError, ReconciliationStatus};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sale(method: PaymentMethod, cents: i64) -> NewCashTransaction {
        NewCashTransaction {
            kind: TransactionKind::Sale,
            payment_method: method,
            amount: Money::from_cents(cents),
            order_id: None,
            description: None,
        }
    }

    fn cash(kind: TransactionKind, cents: i64) -> NewCashTransaction {
        NewCashTransaction {
            kind,
            payment_method: PaymentMethod::Cash,
            amount: Money::from_cents(cents),
            order_id: None,
            description: Some("troca de turno".to_string()),
        }
    }

    #[tokio::test]
    async fn test_open_writes_opening_entry() {
        let db = db().await;
        let repo = db.cash_register();

        let session = repo.open_session("caixa-01", Money::from_cents(20000)).await.unwrap();
        assert!(session.is_open());

        let ledger = repo.list_transactions(&session.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, TransactionKind::Opening);
        assert_eq!(ledger[0].amount, Money::from_cents(20000));

        let current = repo.current_session("caixa-01").await.unwrap().unwrap();
        assert_eq!(current.id, session.id);
    }

    #[tokio::test]
    async fn test_second_open_session_conflicts() {
        let db = db().await;
        let repo = db.cash_register();

        repo.open_session("caixa-01", Money::zero()).await.unwrap();
        let err = repo.open_session("caixa-01", Money::zero()).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        // Another operator is independent
        assert!(repo.open_session("caixa-02", Money::zero()).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_reconciles_cash_only() {
        let db = db().await;
        let repo = db.cash_register();
        let session = repo.open_session("caixa-01", Money::from_cents(10000)).await.unwrap();

        repo.record_transaction(&session.id, &sale(PaymentMethod::Cash, 4590)).await.unwrap();
        repo.record_transaction(&session.id, &sale(PaymentMethod::Pix, 7000)).await.unwrap();
        repo.record_transaction(&session.id, &sale(PaymentMethod::DebitCard, 3200)).await.unwrap();

        let (_, summary) = repo.summary(&session.id).await.unwrap();
        assert_eq!(summary.expected_cash, Money::from_cents(14590));
        assert_eq!(summary.total_sales, Money::from_cents(14790));

        let (closed, rec) = repo
            .close_session(&session.id, Money::from_cents(14500), Some("faltou moeda"))
            .await
            .unwrap();
        assert_eq!(rec.variance, Money::from_cents(-90));
        assert_eq!(rec.status, ReconciliationStatus::Short);
        assert_eq!(closed.status, SessionStatus::Closed);

        let stored = repo.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.variance, Some(Money::from_cents(-90)));
        assert_eq!(stored.expected_cash, Some(Money::from_cents(14590)));
        assert!(repo.current_session("caixa-01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_writes() {
        let db = db().await;
        let repo = db.cash_register();
        let session = repo.open_session("caixa-01", Money::zero()).await.unwrap();
        repo.close_session(&session.id, Money::zero(), None).await.unwrap();

        let err = repo
            .record_transaction(&session.id, &sale(PaymentMethod::Cash, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SessionClosed(_))));

        let err = repo.close_session(&session.id, Money::zero(), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SessionClosed(_))));
    }

    #[tokio::test]
    async fn test_withdrawal_limited_to_drawer() {
        let db = db().await;
        let repo = db.cash_register();
        let session = repo.open_session("caixa-01", Money::from_cents(5000)).await.unwrap();

        repo.record_transaction(&session.id, &cash(TransactionKind::Deposit, 1000))
            .await
            .unwrap();
        repo.record_transaction(&session.id, &cash(TransactionKind::Withdrawal, 6000))
            .await
            .unwrap();

        let err = repo
            .record_transaction(&session.id, &cash(TransactionKind::Withdrawal, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientCash { .. })));
    }

    #[tokio::test]
    async fn test_oversized_rows_error_instead_of_panicking() {
        let db = db().await;
        let repo = db.cash_register();

        let err = repo.open_session("caixa-01", Money::from_cents(i64::MAX)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        // A float stored before amounts were bounded
        let session = repo.open_session("caixa-01", Money::from_cents(10000)).await.unwrap();
        sqlx::query("UPDATE cash_sessions SET opening_float = ?1 WHERE id = ?2")
            .bind(i64::MAX)
            .bind(&session.id)
            .execute(db.pool())
            .await
            .unwrap();
        repo.record_transaction(&session.id, &sale(PaymentMethod::Cash, 1)).await.unwrap();

        let err = repo.summary(&session.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AmountOverflow { .. })));
        let err = repo.close_session(&session.id, Money::zero(), None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AmountOverflow { .. })));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let db = db().await;
        let err = db
            .cash_register()
            .record_transaction("missing", &sale(PaymentMethod::Cash, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
