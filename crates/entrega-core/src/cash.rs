//! # Cash Register
//!
//! One session per operator shift: an opening float, a ledger of movements
//! and a reconciliation against the cash counted at closing.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open(opening_float) ──► ledger: opening                               │
//! │          │                                                              │
//! │          ▼                                                              │
//! │   sale (any method) ─┐                                                  │
//! │   withdrawal (cash) ─┼──► ledger grows, session stays open              │
//! │   deposit (cash)    ─┘                                                  │
//! │          │                                                              │
//! │          ▼                                                              │
//! │   close(counted) ──► Reconciliation { expected, counted, variance }     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expected Cash
//! ```text
//! expected = opening_float + Σ cash sales + Σ deposits − Σ withdrawals
//! variance = counted − expected       (> 0 over, < 0 short)
//! ```
//!
//! Card, PIX, online and voucher sales are reported per method but never
//! enter the drawer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::PaymentMethod;
use crate::validation::validate_amount;

// =============================================================================
// Enums
// =============================================================================

/// Status of a cash register session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// Kind of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Float placed in the drawer when the session opens.
    Opening,
    /// Payment received for an order.
    Sale,
    /// Cash taken out of the drawer (sangria).
    Withdrawal,
    /// Cash added to the drawer (suprimento).
    Deposit,
}

// =============================================================================
// Records
// =============================================================================

/// A cash register session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashRegisterSession {
    pub id: String,
    /// Operator who opened the session.
    pub operator: String,
    pub status: SessionStatus,
    pub opening_float: Money,
    /// Set on close.
    pub counted_cash: Option<Money>,
    pub expected_cash: Option<Money>,
    pub variance: Option<Money>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashRegisterSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Fails with [`CoreError::SessionClosed`] for a closed session.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::SessionClosed(self.id.clone()))
        }
    }
}

/// A ledger movement. `amount` is always positive; the kind gives the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashTransaction {
    pub id: String,
    pub session_id: String,
    pub kind: TransactionKind,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub order_id: Option<String>,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A movement as submitted by the PDV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCashTransaction {
    pub kind: TransactionKind,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCashTransaction {
    /// ## Rules
    /// - Amount positive, at most [`MAX_MONEY_CENTS`](crate::MAX_MONEY_CENTS)
    /// - `opening` is written only when the session opens
    /// - Withdrawals and deposits move physical cash
    pub fn validate(&self) -> CoreResult<()> {
        if !self.amount.is_positive() {
            return Err(ValidationError::must_be_positive("amount").into());
        }
        validate_amount("amount", self.amount)?;
        match self.kind {
            TransactionKind::Opening => Err(ValidationError::InvalidFormat {
                field: "kind".to_string(),
                reason: "opening entries are created with the session".to_string(),
            }
            .into()),
            TransactionKind::Withdrawal | TransactionKind::Deposit
                if !self.payment_method.is_cash() =>
            {
                Err(ValidationError::InvalidFormat {
                    field: "payment_method".to_string(),
                    reason: "withdrawals and deposits are cash only".to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Sales total of one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotal {
    pub payment_method: PaymentMethod,
    pub total: Money,
    pub count: u32,
}

/// Ledger totals of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSummary {
    pub opening_float: Money,
    /// One entry per method with at least one sale, in display order.
    pub sales_by_method: Vec<MethodTotal>,
    pub total_sales: Money,
    pub cash_sales: Money,
    pub withdrawals: Money,
    pub deposits: Money,
    pub expected_cash: Money,
    pub transaction_count: u32,
}

impl SessionSummary {
    /// Sales total of one method (zero when it had no sales).
    pub fn sales_for(&self, method: PaymentMethod) -> Money {
        self.sales_by_method
            .iter()
            .find(|m| m.payment_method == method)
            .map(|m| m.total)
            .unwrap_or_default()
    }
}

/// Partitions the ledger by payment method and computes the expected cash.
///
/// The `opening` entry mirrors `session.opening_float` and is not counted
/// twice. Fails with [`CoreError::AmountOverflow`] if a sum leaves the
/// `i64` range.
pub fn summarize(
    session: &CashRegisterSession,
    transactions: &[CashTransaction],
) -> CoreResult<SessionSummary> {
    let mut sales_by_method: Vec<MethodTotal> = PaymentMethod::ALL
        .iter()
        .map(|&payment_method| MethodTotal {
            payment_method,
            total: Money::zero(),
            count: 0,
        })
        .collect();

    let mut withdrawals = Money::zero();
    let mut deposits = Money::zero();
    let mut transaction_count = 0u32;

    for tx in transactions {
        transaction_count += 1;
        match tx.kind {
            TransactionKind::Opening => {}
            TransactionKind::Sale => {
                if let Some(entry) = sales_by_method
                    .iter_mut()
                    .find(|m| m.payment_method == tx.payment_method)
                {
                    entry.total = add(entry.total, tx.amount, "sales")?;
                    entry.count += 1;
                }
            }
            TransactionKind::Withdrawal => {
                withdrawals = add(withdrawals, tx.amount, "withdrawals")?;
            }
            TransactionKind::Deposit => {
                deposits = add(deposits, tx.amount, "deposits")?;
            }
        }
    }

    sales_by_method.retain(|m| m.count > 0);

    let total_sales = sales_by_method
        .iter()
        .try_fold(Money::zero(), |acc, m| add(acc, m.total, "total_sales"))?;
    let cash_sales = sales_by_method
        .iter()
        .find(|m| m.payment_method.is_cash())
        .map(|m| m.total)
        .unwrap_or_default();

    let expected_cash = add(session.opening_float, cash_sales, "expected_cash")
        .and_then(|sum| add(sum, deposits, "expected_cash"))?
        .checked_sub(withdrawals)
        .ok_or_else(|| CoreError::overflow("expected_cash"))?;

    Ok(SessionSummary {
        opening_float: session.opening_float,
        sales_by_method,
        total_sales,
        cash_sales,
        withdrawals,
        deposits,
        expected_cash,
        transaction_count,
    })
}

fn add(a: Money, b: Money, field: &str) -> CoreResult<Money> {
    a.checked_add(b).ok_or_else(|| CoreError::overflow(field))
}

/// Rejects a withdrawal larger than the cash expected in the drawer.
pub fn check_withdrawal(summary: &SessionSummary, amount: Money) -> CoreResult<()> {
    if amount > summary.expected_cash {
        return Err(CoreError::InsufficientCash {
            available: summary.expected_cash,
            requested: amount,
        });
    }
    Ok(())
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Outcome of comparing counted and expected cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Balanced,
    /// More cash than expected.
    Over,
    /// Less cash than expected.
    Short,
}

/// Result of closing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub expected_cash: Money,
    pub counted_cash: Money,
    /// `counted − expected`.
    pub variance: Money,
    pub status: ReconciliationStatus,
}

/// Reconciles the counted cash against the summary.
///
/// ```rust
/// use entrega_core::cash::{reconcile, ReconciliationStatus, SessionSummary};
/// use entrega_core::money::Money;
///
/// let summary = SessionSummary {
///     opening_float: Money::from_cents(10000),
///     sales_by_method: vec![],
///     total_sales: Money::from_cents(4500),
///     cash_sales: Money::from_cents(4500),
///     withdrawals: Money::zero(),
///     deposits: Money::zero(),
///     expected_cash: Money::from_cents(14500),
///     transaction_count: 2,
/// };
/// let rec = reconcile(&summary, Money::from_cents(14000)).unwrap();
/// assert_eq!(rec.variance.cents(), -500);
/// assert_eq!(rec.status, ReconciliationStatus::Short);
/// ```
pub fn reconcile(summary: &SessionSummary, counted_cash: Money) -> CoreResult<Reconciliation> {
    validate_amount("counted_cash", counted_cash)?;

    let variance = counted_cash
        .checked_sub(summary.expected_cash)
        .ok_or_else(|| CoreError::overflow("variance"))?;
    let status = if variance.is_zero() {
        ReconciliationStatus::Balanced
    } else if variance.is_positive() {
        ReconciliationStatus::Over
    } else {
        ReconciliationStatus::Short
    };

    Ok(Reconciliation {
        expected_cash: summary.expected_cash,
        counted_cash,
        variance,
        status,
    })
}

/// Validates an opening float.
pub fn validate_opening_float(amount: Money) -> Result<(), ValidationError> {
    validate_amount("opening_float", amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
