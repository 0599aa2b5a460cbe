//! # Orders
//!
//! Order records, line items, totals, change for cash payments and the
//! status lookup table driven by the kitchen and motoboy panels.
//!
//! ## Status Lookup Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  waiting_payment ─► pending ─► confirmed ─► preparing ─► ready          │
//! │  (online payment)                                          │            │
//! │                                   delivery ◄───────────────┤            │
//! │                                       │                    │ pickup,    │
//! │                                       ▼                    │ table,     │
//! │                               out_for_delivery             │ counter    │
//! │                                       │                    │            │
//! │                                       ▼                    ▼            │
//! │                                   delivered ◄──────────────┘            │
//! │                                                                         │
//! │  cancelled: reachable from any status before out_for_delivery          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table only answers "what comes next"; panels write the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::geo::Coordinates;
use crate::money::Money;
use crate::validation::{
    validate_amount, validate_customer_name, validate_phone, validate_quantity,
};
use crate::MAX_ORDER_ITEMS;

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Online payment not confirmed yet.
    WaitingPayment,
    /// Received, waiting for the establishment to accept.
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Status a freshly placed order starts in.
    pub fn initial_for(method: PaymentMethod) -> Self {
        if method == PaymentMethod::Online {
            OrderStatus::WaitingPayment
        } else {
            OrderStatus::Pending
        }
    }

    /// Next status for a delivery order.
    pub fn next(self) -> Option<OrderStatus> {
        self.next_for(OrderType::Delivery)
    }

    /// Next status for the given order type.
    ///
    /// Orders that never leave the establishment skip `out_for_delivery`.
    pub fn next_for(self, order_type: OrderType) -> Option<OrderStatus> {
        use OrderStatus::*;
        match self {
            WaitingPayment => Some(Pending),
            Pending => Some(Confirmed),
            Confirmed => Some(Preparing),
            Preparing => Some(Ready),
            Ready if order_type == OrderType::Delivery => Some(OutForDelivery),
            Ready => Some(Delivered),
            OutForDelivery => Some(Delivered),
            Delivered | Cancelled => None,
        }
    }

    /// Delivered and cancelled orders never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Orders can be cancelled until the rider leaves.
    pub fn can_cancel(self) -> bool {
        !matches!(
            self,
            OrderStatus::OutForDelivery | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::WaitingPayment => "waiting_payment",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Label shown on the panels.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::WaitingPayment => "Aguardando pagamento",
            OrderStatus::Pending => "Pendente",
            OrderStatus::Confirmed => "Confirmado",
            OrderStatus::Preparing => "Em preparo",
            OrderStatus::Ready => "Pronto",
            OrderStatus::OutForDelivery => "Saiu para entrega",
            OrderStatus::Delivered => "Entregue",
            OrderStatus::Cancelled => "Cancelado",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Type / Payment Method
// =============================================================================

/// Where the order is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Motoboy takes it to the customer's address.
    Delivery,
    /// Customer picks it up at the counter.
    Pickup,
    /// Dine-in, served at a table.
    Table,
    /// Sold at the PDV.
    Counter,
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    Pix,
    /// Paid through the online checkout.
    Online,
    /// Meal voucher (VR/VA).
    Voucher,
}

impl PaymentMethod {
    /// Physical cash that ends up in the drawer.
    pub fn is_cash(self) -> bool {
        self == PaymentMethod::Cash
    }

    /// Every method, in display order.
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Pix,
        PaymentMethod::Online,
        PaymentMethod::Voucher,
    ];
}

// =============================================================================
// Items
// =============================================================================

/// A line item as submitted by the PWA or PDV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrderItem {
    /// `unit_price × quantity`.
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price
            .checked_multiply_quantity(self.quantity)
            .ok_or_else(|| CoreError::overflow("line_total"))
    }
}

/// A stored line item. Name and price are frozen at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Totals
// =============================================================================

/// Computed money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// `total = subtotal + delivery_fee − discount`, never below zero.
    ///
    /// ```rust
    /// use entrega_core::money::Money;
    /// use entrega_core::order::{NewOrderItem, OrderTotals};
    ///
    /// let items = vec![NewOrderItem {
    ///     product_id: "p1".into(),
    ///     name: "Pizza Margherita".into(),
    ///     quantity: 2,
    ///     unit_price: Money::from_cents(4500),
    ///     notes: None,
    /// }];
    /// let totals =
    ///     OrderTotals::compute(&items, Money::from_cents(800), Money::from_cents(1000)).unwrap();
    /// assert_eq!(totals.subtotal.cents(), 9000);
    /// assert_eq!(totals.total.cents(), 8800);
    /// ```
    pub fn compute(
        items: &[NewOrderItem],
        delivery_fee: Money,
        discount: Money,
    ) -> CoreResult<OrderTotals> {
        let subtotal = items_subtotal(items)?;
        let total = subtotal
            .checked_add(delivery_fee)
            .and_then(|t| t.checked_sub(discount))
            .ok_or_else(|| CoreError::overflow("total"))?
            .clamp_non_negative();
        Ok(OrderTotals {
            subtotal,
            delivery_fee,
            discount,
            total,
        })
    }
}

fn items_subtotal(items: &[NewOrderItem]) -> CoreResult<Money> {
    items.iter().try_fold(Money::zero(), |acc, item| {
        acc.checked_add(item.line_total()?)
            .ok_or_else(|| CoreError::overflow("subtotal"))
    })
}

/// Change the rider must bring for a cash payment.
///
/// ## Returns
/// * `Ok(None)` - no change requested
/// * `Ok(Some(change))` - `change_for − total`
/// * `Err(InsufficientChangeAmount)` - customer pays with less than the total
pub fn change_due(total: Money, change_for: Option<Money>) -> CoreResult<Option<Money>> {
    match change_for {
        None => Ok(None),
        Some(change_for) if change_for < total => {
            Err(CoreError::InsufficientChangeAmount { total, change_for })
        }
        Some(change_for) => Ok(Some(change_for - total)),
    }
}

// =============================================================================
// New Order
// =============================================================================

/// An order as submitted, before numbering and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub order_type: OrderType,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub table_number: Option<String>,
    #[serde(default)]
    pub zone_id: Option<String>,
    pub items: Vec<NewOrderItem>,
    pub payment_method: PaymentMethod,
    /// Cash note the customer will pay with.
    #[serde(default)]
    pub change_for: Option<Money>,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewOrder {
    /// Checks the order can be accepted.
    ///
    /// ## Rules
    /// - At least one item, at most [`MAX_ORDER_ITEMS`]
    /// - Valid quantities; prices, discount and change within
    ///   [`MAX_MONEY_CENTS`](crate::MAX_MONEY_CENTS)
    /// - Delivery orders carry an address; table orders a table number
    /// - Change is only requested for cash payments
    pub fn validate(&self) -> CoreResult<()> {
        validate_customer_name(&self.customer_name)?;
        if let Some(phone) = &self.customer_phone {
            validate_phone(phone)?;
        }

        if self.items.is_empty() {
            return Err(CoreError::EmptyOrder);
        }
        if self.items.len() > MAX_ORDER_ITEMS {
            return Err(CoreError::TooManyItems {
                max: MAX_ORDER_ITEMS,
            });
        }
        for item in &self.items {
            validate_quantity(item.quantity)?;
            if item.name.trim().is_empty() {
                return Err(ValidationError::required("item name").into());
            }
            validate_amount("unit_price", item.unit_price)?;
        }
        self.subtotal()?;

        validate_amount("discount", self.discount)?;
        if let Some(change_for) = self.change_for {
            validate_amount("change_for", change_for)?;
        }

        match self.order_type {
            OrderType::Delivery => {
                if self.address.as_deref().map_or(true, |a| a.trim().is_empty()) {
                    return Err(ValidationError::required("address").into());
                }
                if let Some(coords) = &self.coordinates {
                    coords.validate()?;
                }
            }
            OrderType::Table => {
                if self
                    .table_number
                    .as_deref()
                    .map_or(true, |t| t.trim().is_empty())
                {
                    return Err(ValidationError::required("table_number").into());
                }
            }
            OrderType::Pickup | OrderType::Counter => {}
        }

        if self.change_for.is_some() && !self.payment_method.is_cash() {
            return Err(ValidationError::InvalidFormat {
                field: "change_for".to_string(),
                reason: "only cash payments take change".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Subtotal of the submitted items.
    pub fn subtotal(&self) -> CoreResult<Money> {
        items_subtotal(&self.items)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Sequential number shown to customer and kitchen (#0042).
    pub number: i64,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub table_number: Option<String>,
    pub zone_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub total: Money,
    pub change_for: Option<Money>,
    pub change_due: Option<Money>,
    pub eta_min_minutes: Option<i64>,
    pub eta_max_minutes: Option<i64>,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Status the order moves to on "advance".
    pub fn next_status(&self) -> CoreResult<OrderStatus> {
        self.status
            .next_for(self.order_type)
            .ok_or(CoreError::NoNextStatus {
                status: self.status,
            })
    }

    /// Fails unless the order may still be cancelled.
    pub fn ensure_cancellable(&self) -> CoreResult<()> {
        if self.status.can_cancel() {
            Ok(())
        } else {
            Err(CoreError::CannotCancel {
                status: self.status,
            })
        }
    }

    /// Delivery coordinates, when both columns are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    /// Totals as a single value.
    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            discount: self.discount,
            total: self.total,
        }
    }
}

/// Formats an order number for tickets: `#0042`.
pub fn display_number(number: i64) -> String {
    format!("#{:04}", number)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(qty: i64, price: i64) -> NewOrderItem {
        NewOrderItem {
            product_id: "prod-1".to_string(),
            name: "X-Salada".to_string(),
            quantity: qty,
            unit_price: Money::from_cents(price),
            notes: None,
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            customer_name: "Maria Silva".to_string(),
            customer_phone: Some("(11) 98765-4321".to_string()),
            order_type: OrderType::Delivery,
            address: Some("Rua Augusta, 1500".to_string()),
            coordinates: Some(Coordinates {
                lat: -23.5558,
                lng: -46.6622,
            }),
            table_number: None,
            zone_id: None,
            items: vec![item(2, 2590)],
            payment_method: PaymentMethod::Cash,
            change_for: Some(Money::from_cents(10000)),
            discount: Money::zero(),
            notes: None,
        }
    }

    #[test]
    fn test_delivery_chain() {
        let mut status = OrderStatus::WaitingPayment;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            status = next;
            seen.push(status);
        }
        assert_eq!(
            seen,
            vec![
                OrderStatus::WaitingPayment,
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered,
            ]
        );
    }

    #[test]
    fn test_pickup_skips_out_for_delivery() {
        assert_eq!(
            OrderStatus::Ready.next_for(OrderType::Pickup),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(
            OrderStatus::Ready.next_for(OrderType::Table),
            Some(OrderStatus::Delivered)
        );
        assert_eq!(OrderStatus::Cancelled.next(), None);
    }

    #[test]
    fn test_cancel_rules() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Ready.can_cancel());
        assert!(!OrderStatus::OutForDelivery.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(
            OrderStatus::initial_for(PaymentMethod::Online),
            OrderStatus::WaitingPayment
        );
        assert_eq!(OrderStatus::initial_for(PaymentMethod::Pix), OrderStatus::Pending);
    }

    #[test]
    fn test_status_serde_matches_db() {
        for status in [OrderStatus::OutForDelivery, OrderStatus::WaitingPayment] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_totals() {
        let items = vec![item(2, 2590), item(1, 800)];
        let totals =
            OrderTotals::compute(&items, Money::from_cents(650), Money::from_cents(500)).unwrap();
        assert_eq!(totals.subtotal, Money::from_cents(5980));
        assert_eq!(totals.total, Money::from_cents(6130));

        let huge_discount =
            OrderTotals::compute(&items, Money::zero(), Money::from_cents(99999)).unwrap();
        assert_eq!(huge_discount.total, Money::zero());
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let items = vec![item(2, 5_000_000_000_000_000_000)];
        assert!(matches!(
            OrderTotals::compute(&items, Money::zero(), Money::zero()),
            Err(CoreError::AmountOverflow { .. })
        ));

        let items = vec![item(1, i64::MAX), item(1, 1)];
        assert!(matches!(
            items_subtotal(&items),
            Err(CoreError::AmountOverflow { .. })
        ));
    }

    #[test]
    fn test_change_due() {
        let total = Money::from_cents(5830);
        assert_eq!(change_due(total, None).unwrap(), None);
        assert_eq!(
            change_due(total, Some(Money::from_cents(10000))).unwrap(),
            Some(Money::from_cents(4170))
        );
        assert_eq!(change_due(total, Some(total)).unwrap(), Some(Money::zero()));
        assert!(matches!(
            change_due(total, Some(Money::from_cents(5000))),
            Err(CoreError::InsufficientChangeAmount { .. })
        ));
    }

    #[test]
    fn test_new_order_validation() {
        assert!(new_order().validate().is_ok());

        let mut order = new_order();
        order.items.clear();
        assert!(matches!(order.validate(), Err(CoreError::EmptyOrder)));

        let mut order = new_order();
        order.address = None;
        assert!(order.validate().is_err());

        let mut order = new_order();
        order.payment_method = PaymentMethod::Pix;
        assert!(order.validate().is_err(), "change only for cash");

        let mut order = new_order();
        order.order_type = OrderType::Table;
        order.address = None;
        assert!(order.validate().is_err(), "table number required");
        order.table_number = Some("12".to_string());
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_new_order_rejects_oversized_amounts() {
        let mut order = new_order();
        order.items = vec![item(2, 5_000_000_000_000_000_000)];
        assert!(matches!(
            order.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut order = new_order();
        order.discount = Money::from_cents(crate::MAX_MONEY_CENTS + 1);
        assert!(order.validate().is_err());

        let mut order = new_order();
        order.change_for = Some(Money::from_cents(i64::MAX));
        assert!(order.validate().is_err());

        // Largest accepted order still sums without overflow
        let mut order = new_order();
        order.change_for = None;
        let largest = item(crate::MAX_ITEM_QUANTITY, crate::MAX_MONEY_CENTS);
        order.items = vec![largest; crate::MAX_ORDER_ITEMS];
        assert!(order.validate().is_ok());
        assert!(order.subtotal().is_ok());
    }

    #[test]
    fn test_display_number() {
        assert_eq!(display_number(42), "#0042");
        assert_eq!(display_number(12345), "#12345");
    }
}
