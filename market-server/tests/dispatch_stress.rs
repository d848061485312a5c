//! Dispatch stress test - concurrent delivery acceptance
//!
//! Exercises the full flow against a real server state: orders fan out
//! pending delivery requests, a fleet of drivers races to accept them, and
//! the capacity invariants must hold once the dust settles.

use market_server::ServerState;
use shared::error::ErrorCode;
use shared::models::{
    DriverProfile, OrderCreate, OrderItem, PaymentResult, PriceBreakdown, RefundRequestCreate,
    RefundRequestStatus, RefundProcess, ShippingAddress,
};
use std::collections::HashSet;

const ORDER_COUNT: usize = 20;
const DRIVER_COUNT: usize = 4;
/// Each order ships 2 units at 5 kg per unit
const ORDER_WEIGHT: f64 = 10.0;
/// Three orders fit exactly; a fourth would overflow
const VEHICLE_CAPACITY: f64 = 30.0;

fn order_payload(price: f64) -> OrderCreate {
    OrderCreate {
        items: vec![OrderItem {
            product_id: format!("product:{}", uuid::Uuid::new_v4()),
            farmer_id: "farmer-1".to_string(),
            name: "Crate of apples".to_string(),
            price,
            quantity: 2,
            image: None,
        }],
        shipping_address: ShippingAddress {
            address: "1 Orchard Lane".to_string(),
            city: "Leiden".to_string(),
            postal_code: "2311".to_string(),
            country: "NL".to_string(),
        },
        payment_method: "PayPal".to_string(),
        prices: PriceBreakdown {
            items_price: price * 2.0,
            tax_price: 0.0,
            shipping_price: 0.0,
            total_price: price * 2.0,
        },
    }
}

fn seeded_state() -> (ServerState, Vec<String>) {
    let state = ServerState::in_memory().unwrap();

    for i in 0..DRIVER_COUNT {
        state.drivers.register(DriverProfile {
            id: format!("driver-{}", i),
            name: format!("Driver {}", i),
            vehicle_capacity: VEHICLE_CAPACITY,
        });
    }

    let mut delivery_ids = Vec::new();
    for i in 0..ORDER_COUNT {
        let order = state
            .orders
            .create_order(&format!("buyer-{}", i % 5), order_payload(10.0))
            .expect("create order");
        delivery_ids.push(order.delivery_id);
    }

    (state, delivery_ids)
}

#[test]
fn concurrent_acceptance_holds_capacity_invariants() {
    let (state, delivery_ids) = seeded_state();

    // Every driver races over the whole pool
    std::thread::scope(|scope| {
        for i in 0..DRIVER_COUNT {
            let state = state.clone();
            let delivery_ids = delivery_ids.clone();
            scope.spawn(move || {
                let driver_id = format!("driver-{}", i);
                for delivery_id in &delivery_ids {
                    match state.dispatch.accept_delivery(&driver_id, delivery_id) {
                        Ok(_) => {}
                        Err(e) => assert!(
                            matches!(
                                e.code,
                                ErrorCode::DeliveryNotFound | ErrorCode::CapacityExceeded
                            ),
                            "unexpected error: {:?}",
                            e.code
                        ),
                    }
                }
            });
        }
    });

    // Single acceptance: no delivery appears twice across drivers
    let mut seen = HashSet::new();
    let mut accepted_total = 0usize;
    for i in 0..DRIVER_COUNT {
        let driver_id = format!("driver-{}", i);
        let accepted = state.dispatch.list_accepted(&driver_id).unwrap();
        for row in &accepted {
            assert!(
                seen.insert(row.delivery_id.clone()),
                "delivery {} accepted twice",
                row.delivery_id
            );
            assert_eq!(row.driver_id, driver_id);
        }
        accepted_total += accepted.len();

        // No overshoot, and the materialized counter matches the rows
        let load = state.capacity.current_load(&driver_id).unwrap();
        assert!(
            load <= VEHICLE_CAPACITY,
            "driver {} overloaded: {} kg",
            driver_id,
            load
        );
        let scanned: f64 = accepted.iter().map(|a| a.weight).sum();
        assert_eq!(load, scanned);

        // Capacity is saturated: exactly three 10 kg orders per driver
        assert_eq!(accepted.len(), (VEHICLE_CAPACITY / ORDER_WEIGHT) as usize);
    }

    // Accepted plus still-pending covers the whole pool, nothing vanished
    let pending = state
        .dispatch
        .list_pending(shared::models::Role::Driver, "driver-0")
        .unwrap();
    assert_eq!(accepted_total + pending.len(), ORDER_COUNT);
    for request in &pending {
        assert!(!seen.contains(&request.delivery_id));
    }
}

#[test]
fn accepted_delivery_flows_through_to_refund() {
    let state = ServerState::in_memory().unwrap();
    state.drivers.register(DriverProfile {
        id: "driver-0".to_string(),
        name: "Driver 0".to_string(),
        vehicle_capacity: VEHICLE_CAPACITY,
    });

    let order = state
        .orders
        .create_order("buyer-1", order_payload(50.0))
        .unwrap();

    // Pay, dispatch, deliver
    state
        .orders
        .mark_paid(
            &order.id,
            PaymentResult {
                id: "PAY-9".to_string(),
                status: "COMPLETED".to_string(),
                update_time: "2024-06-01T09:00:00Z".to_string(),
                email_address: None,
            },
        )
        .unwrap();
    let receipt = state
        .dispatch
        .accept_delivery("driver-0", &order.delivery_id)
        .unwrap();
    assert_eq!(receipt.delivery.order_id, order.id);
    assert_eq!(receipt.current_load, ORDER_WEIGHT);
    let delivered = state.orders.mark_delivered(&order.id).unwrap();
    assert!(delivered.is_delivered && delivered.is_paid);

    // Refund the whole order
    let request = state
        .refunds
        .request_refund(
            "buyer-1",
            RefundRequestCreate {
                order_id: order.id.clone(),
                reason: "Crushed on arrival".to_string(),
                items: None,
                evidence: Some(vec!["crate.jpg".to_string()]),
            },
        )
        .unwrap();
    let processed = state
        .refunds
        .process_refund(
            &request.id,
            "admin-1",
            RefundProcess {
                status: RefundRequestStatus::Approved,
                admin_notes: "Verified damage".to_string(),
                refund_amount: None,
            },
        )
        .unwrap();
    assert_eq!(processed.refund_amount, 100.0);

    let order = state.orders.get_order(&order.id).unwrap();
    assert_eq!(order.refund_amount, 100.0);
    assert_eq!(order.status, shared::models::OrderStatus::Refunded);
}
