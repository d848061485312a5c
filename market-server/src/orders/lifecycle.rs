//! Order lifecycle coordinator
//!
//! Drives order creation, payment, delivery and status transitions.
//!
//! # Transition Flow
//!
//! ```text
//! create_order(buyer, payload)
//!     ├─ 1. Validate items and price breakdown
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Persist order (status = Pending)
//!     ├─ 4. Emit one pending DeliveryRequest
//!     ├─ 5. Clear the buyer's cart
//!     ├─ 6. Commit transaction
//!     └─ 7. Publish OrderCreated
//! ```
//!
//! All three effects of step 3-5 commit or roll back together; a failure at
//! any point leaves no partial state behind.

use crate::events::{DomainEvent, EventBus};
use crate::orders::money;
use crate::services::CartService;
use crate::storage::MarketStorage;
use chrono::Utc;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    DeliveryRequest, DeliveryStatus, Order, OrderCreate, OrderStatus, PaymentResult, RefundStatus,
};

/// Synthetic per-unit shipment weight in kg
///
/// The catalog carries no physical weights, so the delivery weight is
/// derived from line quantities.
pub const WEIGHT_PER_UNIT_KG: f64 = 5.0;

#[derive(Clone)]
pub struct OrderLifecycle {
    storage: MarketStorage,
    carts: CartService,
    events: EventBus,
}

impl OrderLifecycle {
    pub fn new(storage: MarketStorage, carts: CartService, events: EventBus) -> Self {
        Self {
            storage,
            carts,
            events,
        }
    }

    /// Create an order from caller-supplied line-item snapshots
    ///
    /// Persists the order, emits exactly one pending delivery request with
    /// pickup/drop-off set to the shipping address, and clears the buyer's
    /// cart, all in one transaction.
    pub fn create_order(&self, buyer_id: &str, payload: OrderCreate) -> AppResult<Order> {
        if payload.items.is_empty() {
            return Err(AppError::new(ErrorCode::OrderEmpty));
        }
        for item in &payload.items {
            money::validate_item(item)?;
        }
        money::validate_breakdown(&payload.prices)?;

        let now = Utc::now().timestamp_millis();
        let order_id = uuid::Uuid::new_v4().to_string();
        let delivery_id = uuid::Uuid::new_v4().to_string();

        let weight = derive_weight(&payload.items);
        let farmer_id = payload.items[0].farmer_id.clone();

        let order = Order {
            id: order_id,
            buyer_id: buyer_id.to_string(),
            items: payload.items,
            shipping_address: payload.shipping_address.clone(),
            payment_method: payload.payment_method,
            items_price: payload.prices.items_price,
            tax_price: payload.prices.tax_price,
            shipping_price: payload.prices.shipping_price,
            total_price: payload.prices.total_price,
            status: OrderStatus::Pending,
            is_paid: false,
            paid_at: None,
            payment_result: None,
            is_delivered: false,
            delivered_at: None,
            delivery_id: delivery_id.clone(),
            is_cancelled: false,
            cancelled_at: None,
            cancellation_reason: None,
            refund_requested: false,
            refund_requested_at: None,
            refund_status: RefundStatus::None,
            refund_reason: None,
            refund_processed_at: None,
            refund_amount: 0.0,
            created_at: now,
        };

        let request = DeliveryRequest {
            delivery_id,
            order_id: order.id.clone(),
            buyer_id: order.buyer_id.clone(),
            farmer_id,
            weight,
            pickup: payload.shipping_address.clone(),
            dropoff: payload.shipping_address,
            status: DeliveryStatus::Pending,
            created_at: now,
        };

        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .store_order(&txn, &order)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .store_pending_delivery(&txn, &request)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.carts
            .clear_cart_in_txn(&txn, buyer_id)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        self.events.publish(DomainEvent::OrderCreated {
            order_id: order.id.clone(),
            buyer_id: order.buyer_id.clone(),
            delivery_id: order.delivery_id.clone(),
            total_price: order.total_price,
        });

        Ok(order)
    }

    /// Record a payment confirmation from the gateway
    ///
    /// A repeat confirmation is a hard error; callers that retry must treat
    /// `OrderAlreadyPaid` as final. The cart clear here is best-effort and
    /// never fails the confirmation.
    pub fn mark_paid(&self, order_id: &str, payment: PaymentResult) -> AppResult<Order> {
        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| order_not_found(order_id))?;

        if order.is_paid {
            return Err(AppError::with_message(
                ErrorCode::OrderAlreadyPaid,
                format!("Order {} has already been paid", order_id),
            ));
        }

        order.is_paid = true;
        order.paid_at = Some(Utc::now().timestamp_millis());
        order.payment_result = Some(payment);
        if order.status == OrderStatus::Pending {
            order.status = OrderStatus::Processing;
        }

        self.storage
            .store_order(&txn, &order)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        if let Err(e) = self.carts.clear_cart(&order.buyer_id) {
            tracing::warn!(
                buyer_id = %order.buyer_id,
                error = %e,
                "cart clear failed during payment confirmation"
            );
        }

        self.events.publish(DomainEvent::OrderPaid {
            order_id: order.id.clone(),
        });

        Ok(order)
    }

    /// Mark a paid order as delivered
    pub fn mark_delivered(&self, order_id: &str) -> AppResult<Order> {
        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| order_not_found(order_id))?;

        if order.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::OrderStateTerminal,
                format!(
                    "Order {} is {:?} and cannot be delivered",
                    order_id, order.status
                ),
            ));
        }
        if !order.is_paid {
            return Err(AppError::with_message(
                ErrorCode::OrderNotPaid,
                format!("Order {} cannot be delivered before payment", order_id),
            ));
        }
        if order.is_delivered {
            return Err(AppError::with_message(
                ErrorCode::OrderAlreadyDelivered,
                format!("Order {} has already been delivered", order_id),
            ));
        }

        order.is_delivered = true;
        order.delivered_at = Some(Utc::now().timestamp_millis());
        order.status = OrderStatus::Delivered;

        self.storage
            .store_order(&txn, &order)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        self.events.publish(DomainEvent::OrderDelivered {
            order_id: order.id.clone(),
        });

        Ok(order)
    }

    /// Set an order's status, enforcing lifecycle rules
    ///
    /// - Cancelled and Refunded orders admit no further transition.
    /// - A Delivered order can only still become Refunded.
    /// - Cancelling requires an explicit reason and records the cancellation
    ///   facts.
    /// - Refunded requires a previously requested refund.
    pub fn set_status(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        reason: Option<String>,
    ) -> AppResult<Order> {
        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut order = self
            .storage
            .get_order_txn(&txn, order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| order_not_found(order_id))?;

        if order.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::OrderStateTerminal,
                format!(
                    "Order {} is {:?} and cannot change status",
                    order_id, order.status
                ),
            ));
        }
        if order.status == OrderStatus::Delivered && new_status != OrderStatus::Refunded {
            return Err(AppError::with_message(
                ErrorCode::OrderStateTerminal,
                format!("Delivered order {} can only become Refunded", order_id),
            ));
        }

        let now = Utc::now().timestamp_millis();
        let mut cancelled_reason = None;

        match new_status {
            OrderStatus::Cancelled => {
                let reason = reason
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| AppError::validation("Cancellation requires a reason"))?;
                order.is_cancelled = true;
                order.cancelled_at = Some(now);
                order.cancellation_reason = Some(reason.clone());
                cancelled_reason = Some(reason);
            }
            OrderStatus::Refunded => {
                if !order.refund_requested {
                    return Err(AppError::with_message(
                        ErrorCode::RefundNotRequested,
                        format!("Order {} has no refund request", order_id),
                    ));
                }
            }
            OrderStatus::Delivered => {
                if !order.is_paid {
                    return Err(AppError::with_message(
                        ErrorCode::OrderNotPaid,
                        format!("Order {} cannot be delivered before payment", order_id),
                    ));
                }
                if !order.is_delivered {
                    order.is_delivered = true;
                    order.delivered_at = Some(now);
                }
            }
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Shipped => {}
        }

        order.status = new_status;

        self.storage
            .store_order(&txn, &order)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        if let Some(reason) = cancelled_reason {
            self.events.publish(DomainEvent::OrderCancelled {
                order_id: order.id.clone(),
                reason,
            });
        }

        Ok(order)
    }

    /// Get an order by id
    pub fn get_order(&self, order_id: &str) -> AppResult<Order> {
        self.storage
            .get_order(order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| order_not_found(order_id))
    }

    /// List a buyer's orders, newest first
    pub fn list_for_buyer(&self, buyer_id: &str) -> AppResult<Vec<Order>> {
        self.storage
            .list_orders_for_buyer(buyer_id)
            .map_err(|e| AppError::database(e.to_string()))
    }

    /// List every order, newest first (admin)
    pub fn list_all(&self) -> AppResult<Vec<Order>> {
        self.storage
            .list_orders()
            .map_err(|e| AppError::database(e.to_string()))
    }
}

fn derive_weight(items: &[shared::models::OrderItem]) -> f64 {
    let units: i64 = items.iter().map(|i| i.quantity as i64).sum();
    units as f64 * WEIGHT_PER_UNIT_KG
}

fn order_not_found(order_id: &str) -> AppError {
    AppError::with_message(
        ErrorCode::OrderNotFound,
        format!("Order {} not found", order_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CartItem, OrderItem, PriceBreakdown, ShippingAddress};

    fn test_lifecycle() -> (OrderLifecycle, MarketStorage, EventBus) {
        let storage = MarketStorage::open_in_memory().unwrap();
        let carts = CartService::new(storage.clone());
        let events = EventBus::new();
        (
            OrderLifecycle::new(storage.clone(), carts, events.clone()),
            storage,
            events,
        )
    }

    fn item(name: &str, price: f64, quantity: i32) -> OrderItem {
        OrderItem {
            product_id: format!("prod-{}", name),
            farmer_id: "farmer-1".to_string(),
            name: name.to_string(),
            price,
            quantity,
            image: None,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "1 Orchard Lane".to_string(),
            city: "Leiden".to_string(),
            postal_code: "2311".to_string(),
            country: "NL".to_string(),
        }
    }

    fn payload(items: Vec<OrderItem>, prices: PriceBreakdown) -> OrderCreate {
        OrderCreate {
            items,
            shipping_address: address(),
            payment_method: "PayPal".to_string(),
            prices,
        }
    }

    fn paypal_result() -> PaymentResult {
        PaymentResult {
            id: "PAY-1".to_string(),
            status: "COMPLETED".to_string(),
            update_time: "2024-05-01T10:00:00Z".to_string(),
            email_address: Some("buyer@example.com".to_string()),
        }
    }

    fn prices(items: f64, tax: f64, shipping: f64) -> PriceBreakdown {
        PriceBreakdown {
            items_price: items,
            tax_price: tax,
            shipping_price: shipping,
            total_price: items + tax + shipping,
        }
    }

    #[test]
    fn test_create_order_emits_delivery_and_clears_cart() {
        let (lifecycle, storage, events) = test_lifecycle();
        let mut rx = events.subscribe();

        // Seed the buyer's cart
        let carts = CartService::new(storage.clone());
        carts
            .set_cart(
                "buyer-1",
                &[CartItem {
                    product_id: "p1".to_string(),
                    name: "Apples".to_string(),
                    price: 100.0,
                    quantity: 1,
                    image: None,
                }],
            )
            .unwrap();

        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(
                    vec![item("apples", 100.0, 1), item("pears", 50.0, 1)],
                    prices(150.0, 15.0, 0.0),
                ),
            )
            .unwrap();

        // Total invariant
        assert_eq!(order.total_price, 165.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);

        // Cart is empty immediately after
        assert!(storage.get_cart("buyer-1").unwrap().is_empty());

        // Exactly one pending delivery request referencing the shipping address
        let pending = storage.list_pending_deliveries().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id, order.id);
        assert_eq!(pending[0].delivery_id, order.delivery_id);
        assert_eq!(pending[0].dropoff, order.shipping_address);
        assert_eq!(pending[0].status, DeliveryStatus::Pending);
        assert_eq!(pending[0].weight, 2.0 * WEIGHT_PER_UNIT_KG);

        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::OrderCreated { .. }
        ));
    }

    #[test]
    fn test_create_order_rejects_empty_items() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let err = lifecycle
            .create_order("buyer-1", payload(vec![], prices(0.0, 0.0, 0.0)))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_create_order_rejects_total_mismatch() {
        let (lifecycle, storage, _events) = test_lifecycle();
        let mut bad = prices(100.0, 10.0, 5.0);
        bad.total_price = 200.0;

        let err = lifecycle
            .create_order("buyer-1", payload(vec![item("a", 100.0, 1)], bad))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderTotalMismatch);

        // No partial state
        assert!(storage.list_orders().unwrap().is_empty());
        assert!(storage.list_pending_deliveries().unwrap().is_empty());
    }

    #[test]
    fn test_total_invariant_over_random_triples() {
        use rand::Rng;

        let (lifecycle, _storage, _events) = test_lifecycle();
        let mut rng = rand::thread_rng();

        for _ in 0..100 {
            let items_price = rng.gen_range(1..100_000) as f64 / 100.0;
            let tax = rng.gen_range(0..10_000) as f64 / 100.0;
            let shipping = rng.gen_range(0..5_000) as f64 / 100.0;

            let order = lifecycle
                .create_order(
                    "buyer-1",
                    payload(
                        vec![item("a", items_price, 1)],
                        prices(items_price, tax, shipping),
                    ),
                )
                .unwrap();
            assert!(money::money_eq(
                order.total_price,
                order.items_price + order.tax_price + order.shipping_price
            ));

            // Off-by-one total must be rejected
            let mut bad = prices(items_price, tax, shipping);
            bad.total_price += 1.0;
            assert!(lifecycle
                .create_order("buyer-1", payload(vec![item("a", items_price, 1)], bad))
                .is_err());
        }
    }

    #[test]
    fn test_mark_paid_advances_to_processing() {
        let (lifecycle, _storage, events) = test_lifecycle();
        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(vec![item("a", 10.0, 1)], prices(10.0, 0.0, 0.0)),
            )
            .unwrap();

        let mut rx = events.subscribe();
        let paid = lifecycle.mark_paid(&order.id, paypal_result()).unwrap();
        assert!(paid.is_paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.status, OrderStatus::Processing);
        assert_eq!(paid.payment_result.unwrap().id, "PAY-1");
        assert!(matches!(
            rx.try_recv().unwrap(),
            DomainEvent::OrderPaid { .. }
        ));
    }

    #[test]
    fn test_mark_paid_twice_is_hard_error() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(vec![item("a", 10.0, 1)], prices(10.0, 0.0, 0.0)),
            )
            .unwrap();

        lifecycle.mark_paid(&order.id, paypal_result()).unwrap();
        let err = lifecycle.mark_paid(&order.id, paypal_result()).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyPaid);
    }

    #[test]
    fn test_mark_paid_missing_order() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let err = lifecycle.mark_paid("missing", paypal_result()).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_mark_delivered_requires_payment() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(vec![item("a", 10.0, 1)], prices(10.0, 0.0, 0.0)),
            )
            .unwrap();

        let err = lifecycle.mark_delivered(&order.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotPaid);

        lifecycle.mark_paid(&order.id, paypal_result()).unwrap();
        let delivered = lifecycle.mark_delivered(&order.id).unwrap();
        assert!(delivered.is_delivered);
        assert_eq!(delivered.status, OrderStatus::Delivered);
        // delivered implies paid
        assert!(delivered.is_paid);

        let err = lifecycle.mark_delivered(&order.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyDelivered);
    }

    #[test]
    fn test_cancel_requires_reason_and_is_terminal() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(vec![item("a", 10.0, 1)], prices(10.0, 0.0, 0.0)),
            )
            .unwrap();

        let err = lifecycle
            .set_status(&order.id, OrderStatus::Cancelled, None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let cancelled = lifecycle
            .set_status(
                &order.id,
                OrderStatus::Cancelled,
                Some("changed my mind".to_string()),
            )
            .unwrap();
        assert!(cancelled.is_cancelled);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("changed my mind")
        );

        // No transition out of Cancelled
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Refunded,
        ] {
            let err = lifecycle
                .set_status(&order.id, status, Some("retry".to_string()))
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::OrderStateTerminal);
        }

        // mark_delivered cannot leave Cancelled either
        let err = lifecycle.mark_delivered(&order.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderStateTerminal);
    }

    #[test]
    fn test_refunded_requires_prior_request() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(vec![item("a", 10.0, 1)], prices(10.0, 0.0, 0.0)),
            )
            .unwrap();

        let err = lifecycle
            .set_status(&order.id, OrderStatus::Refunded, None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RefundNotRequested);
    }

    #[test]
    fn test_delivered_order_only_becomes_refunded() {
        let (lifecycle, _storage, _events) = test_lifecycle();
        let order = lifecycle
            .create_order(
                "buyer-1",
                payload(vec![item("a", 10.0, 1)], prices(10.0, 0.0, 0.0)),
            )
            .unwrap();
        lifecycle.mark_paid(&order.id, paypal_result()).unwrap();
        lifecycle.mark_delivered(&order.id).unwrap();

        let err = lifecycle
            .set_status(&order.id, OrderStatus::Shipped, None)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderStateTerminal);
    }
}
