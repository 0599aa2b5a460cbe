//! # Order Repository
//!
//! Database operations for orders and their items.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                             │
//! │     └── create() → next number from order_sequence, order + items      │
//! │         written in one transaction                                     │
//! │                                                                         │
//! │  2. ADVANCE (kitchen / motoboy panel)                                  │
//! │     └── advance() → OrderStatus::next_for(order_type)                  │
//! │                                                                         │
//! │  3. (OPTIONAL) CANCEL                                                  │
//! │     └── cancel() → only before out_for_delivery                        │
//! │                                                                         │
//! │  Every status write is guarded by the status that was read, so two     │
//! │  panels clicking at once yield one winner and one Conflict.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use entrega_core::money::Money;
use entrega_core::{NewOrder, Order, OrderItem, OrderStatus, OrderTotals};

const ORDER_COLUMNS: &str = "id, number, customer_name, customer_phone, order_type, status, \
     address, latitude, longitude, table_number, zone_id, payment_method, \
     subtotal, delivery_fee, discount, total, change_for, change_due, \
     eta_min_minutes, eta_max_minutes, notes, cancel_reason, \
     created_at, updated_at, delivered_at, cancelled_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, name, quantity, unit_price, line_total, notes, created_at";

fn select_orders(filter: &str) -> String {
    format!("SELECT {ORDER_COLUMNS} FROM orders {filter}")
}

/// Everything needed to store a new order.
///
/// Prices, fee and ETA are computed by the caller (logistics-api) from
/// entrega-core; the repository only persists them.
#[derive(Debug, Clone)]
pub struct CreateOrder<'a> {
    pub order: &'a NewOrder,
    pub totals: OrderTotals,
    pub change_due: Option<Money>,
    pub eta_min_minutes: Option<u32>,
    pub eta_max_minutes: Option<u32>,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Stores a new order and its items.
    ///
    /// ## What This Does
    /// 1. Validates the submitted order
    /// 2. Takes the next sequential number (write lock held from here on)
    /// 3. Inserts the order with its initial status
    /// 4. Inserts the items, freezing name and price
    pub async fn create(&self, input: CreateOrder<'_>) -> DbResult<Order> {
        let new = input.order;
        new.validate()?;

        let mut tx = self.pool.begin().await?;

        let number: i64 = sqlx::query_scalar(
            "UPDATE order_sequence SET last_number = last_number + 1 WHERE id = 1 RETURNING last_number",
        )
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            number,
            customer_name: new.customer_name.trim().to_string(),
            customer_phone: new.customer_phone.clone(),
            order_type: new.order_type,
            status: OrderStatus::initial_for(new.payment_method),
            address: new.address.clone(),
            latitude: new.coordinates.map(|c| c.lat),
            longitude: new.coordinates.map(|c| c.lng),
            table_number: new.table_number.clone(),
            zone_id: new.zone_id.clone(),
            payment_method: new.payment_method,
            subtotal: input.totals.subtotal,
            delivery_fee: input.totals.delivery_fee,
            discount: input.totals.discount,
            total: input.totals.total,
            change_for: new.change_for,
            change_due: input.change_due,
            eta_min_minutes: input.eta_min_minutes.map(i64::from),
            eta_max_minutes: input.eta_max_minutes.map(i64::from),
            notes: new.notes.clone(),
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
        };

        debug!(id = %order.id, number = order.number, "Inserting order");

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES (\
             ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
             ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)"
        ))
        .bind(&order.id)
        .bind(order.number)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(order.order_type)
        .bind(order.status)
        .bind(&order.address)
        .bind(order.latitude)
        .bind(order.longitude)
        .bind(&order.table_number)
        .bind(&order.zone_id)
        .bind(order.payment_method)
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.discount)
        .bind(order.total)
        .bind(order.change_for)
        .bind(order.change_due)
        .bind(order.eta_min_minutes)
        .bind(order.eta_max_minutes)
        .bind(&order.notes)
        .bind(&order.cancel_reason)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .execute(&mut *tx)
        .await?;

        for item in &new.items {
            let line_total = item.line_total()?;
            sqlx::query(&format!(
                "INSERT INTO order_items ({ITEM_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ))
            .bind(Uuid::new_v4().to_string())
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(item.name.trim())
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(line_total)
            .bind(&item.notes)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %order.id,
            number = order.number,
            status = %order.status,
            total = %order.total,
            "Order created"
        );

        Ok(order)
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&select_orders("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets an order by ID, failing with `NotFound`.
    pub async fn require(&self, id: &str) -> DbResult<Order> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Gets all items of an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Orders that are neither delivered nor cancelled, oldest first.
    pub async fn list_active(&self) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&select_orders(
            "WHERE status NOT IN ('delivered', 'cancelled') ORDER BY number",
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders currently in `status`, oldest first (kitchen / motoboy columns).
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&select_orders("WHERE status = ?1 ORDER BY number"))
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Sets the status of an order directly.
    ///
    /// Terminal orders are never rewritten.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<Order> {
        let order = self.require(id).await?;
        if order.status.is_terminal() {
            return Err(DbError::Conflict(format!(
                "order {} is already {}",
                order.number, order.status
            )));
        }
        self.transition(order, status, None).await
    }

    /// Moves an order to its next status.
    ///
    /// ## Errors
    /// * `Domain(NoNextStatus)` - delivered or cancelled
    /// * `Conflict` - status changed since it was read
    pub async fn advance(&self, id: &str) -> DbResult<Order> {
        let order = self.require(id).await?;
        let next = order.next_status()?;
        self.transition(order, next, None).await
    }

    /// Cancels an order that has not left the establishment.
    pub async fn cancel(&self, id: &str, reason: Option<&str>) -> DbResult<Order> {
        let order = self.require(id).await?;
        order.ensure_cancellable()?;
        self.transition(order, OrderStatus::Cancelled, reason).await
    }

    async fn transition(
        &self,
        mut order: Order,
        to: OrderStatus,
        cancel_reason: Option<&str>,
    ) -> DbResult<Order> {
        let from = order.status;
        let now = Utc::now();

        if to == OrderStatus::Delivered {
            order.delivered_at = Some(now);
        }
        if to == OrderStatus::Cancelled {
            order.cancelled_at = Some(now);
            order.cancel_reason = cancel_reason.map(str::to_string);
        }

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?1,
                updated_at = ?2,
                delivered_at = ?3,
                cancelled_at = ?4,
                cancel_reason = ?5
            WHERE id = ?6 AND status = ?7
            "#,
        )
        .bind(to)
        .bind(now)
        .bind(order.delivered_at)
        .bind(order.cancelled_at)
        .bind(&order.cancel_reason)
        .bind(&order.id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "order {} is no longer {}",
                order.number, from
            )));
        }

        info!(id = %order.id, number = order.number, %from, %to, "Order status changed");

        order.status = to;
        order.updated_at = now;
        Ok(order)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use entrega_core::order::change_due;
    use entrega_core::{CoreError, Coordinates, NewOrderItem, OrderType, PaymentMethod};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_order(order_type: OrderType, payment_method: PaymentMethod) -> NewOrder {
        NewOrder {
            customer_name: "Carla Souza".to_string(),
            customer_phone: Some("(21) 99876-5432".to_string()),
            order_type,
            address: Some("Rua das Laranjeiras, 210".to_string()),
            coordinates: Some(Coordinates {
                lat: -22.9366,
                lng: -43.1867,
            }),
            table_number: None,
            zone_id: None,
            items: vec![
                NewOrderItem {
                    product_id: "pizza-calabresa".to_string(),
                    name: "Pizza Calabresa".to_string(),
                    quantity: 1,
                    unit_price: Money::from_cents(5490),
                    notes: Some("sem cebola".to_string()),
                },
                NewOrderItem {
                    product_id: "guarana-2l".to_string(),
                    name: "Guaraná 2L".to_string(),
                    quantity: 2,
                    unit_price: Money::from_cents(1290),
                    notes: None,
                },
            ],
            payment_method,
            change_for: None,
            discount: Money::zero(),
            notes: None,
        }
    }

    async fn create(db: &Database, new: &NewOrder) -> Order {
        let totals =
            OrderTotals::compute(&new.items, Money::from_cents(650), new.discount).unwrap();
        let change = change_due(totals.total, new.change_for).unwrap();
        db.orders()
            .create(CreateOrder {
                order: new,
                totals,
                change_due: change,
                eta_min_minutes: Some(35),
                eta_max_minutes: Some(45),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_numbers() {
        let db = db().await;
        let new = new_order(OrderType::Delivery, PaymentMethod::Pix);

        let first = create(&db, &new).await;
        let second = create(&db, &new).await;
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(first.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_persists_totals_and_items() {
        let db = db().await;
        let mut new = new_order(OrderType::Delivery, PaymentMethod::Cash);
        new.change_for = Some(Money::from_cents(10000));

        let order = create(&db, &new).await;
        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();

        assert_eq!(stored.subtotal, Money::from_cents(8070));
        assert_eq!(stored.total, Money::from_cents(8720));
        assert_eq!(stored.change_due, Some(Money::from_cents(1280)));
        assert_eq!(stored.eta_max_minutes, Some(45));
        assert_eq!(stored.coordinates().map(|c| c.lat), Some(-22.9366));

        let items = db.orders().get_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Pizza Calabresa");
        assert_eq!(items[1].line_total, Money::from_cents(2580));
    }

    #[tokio::test]
    async fn test_online_payment_waits_for_confirmation() {
        let db = db().await;
        let order = create(&db, &new_order(OrderType::Delivery, PaymentMethod::Online)).await;
        assert_eq!(order.status, OrderStatus::WaitingPayment);

        let order = db.orders().advance(&order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_advance_pickup_to_delivered() {
        let db = db().await;
        let order = create(&db, &new_order(OrderType::Pickup, PaymentMethod::Pix)).await;

        let mut current = order;
        for _ in 0..4 {
            current = db.orders().advance(&current.id).await.unwrap();
        }
        assert_eq!(current.status, OrderStatus::Delivered);
        assert!(current.delivered_at.is_some());

        let err = db.orders().advance(&current.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NoNextStatus { .. })));

        let active = db.orders().list_active().await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let db = db().await;
        let order = create(&db, &new_order(OrderType::Delivery, PaymentMethod::Pix)).await;

        let cancelled = db
            .orders()
            .cancel(&order.id, Some("cliente desistiu"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("cliente desistiu"));

        let err = db.orders().cancel(&order.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CannotCancel { .. })));

        let err = db
            .orders()
            .update_status(&order.id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_out_for_delivery_cannot_cancel() {
        let db = db().await;
        let order = create(&db, &new_order(OrderType::Delivery, PaymentMethod::Pix)).await;
        db.orders()
            .update_status(&order.id, OrderStatus::OutForDelivery)
            .await
            .unwrap();

        let out = db.orders().list_by_status(OrderStatus::OutForDelivery).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(db.orders().cancel(&order.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let db = db().await;
        assert!(db.orders().get_by_id("missing").await.unwrap().is_none());
        assert!(matches!(
            db.orders().advance("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_order_is_rejected() {
        let db = db().await;
        let mut new = new_order(OrderType::Delivery, PaymentMethod::Pix);
        new.items.clear();
        let totals = OrderTotals::compute(&new.items, Money::zero(), Money::zero()).unwrap();

        let err = db
            .orders()
            .create(CreateOrder {
                order: &new,
                totals,
                change_due: None,
                eta_min_minutes: None,
                eta_max_minutes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyOrder)));
    }
}
