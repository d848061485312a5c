//! Storage persistence across server restarts

use market_server::{Config, ServerState};
use shared::models::{OrderCreate, OrderItem, PriceBreakdown, ShippingAddress};

fn payload() -> OrderCreate {
    OrderCreate {
        items: vec![OrderItem {
            product_id: "product:1".to_string(),
            farmer_id: "farmer-1".to_string(),
            name: "Honey jar".to_string(),
            price: 12.5,
            quantity: 4,
            image: Some("honey.jpg".to_string()),
        }],
        shipping_address: ShippingAddress {
            address: "1 Orchard Lane".to_string(),
            city: "Leiden".to_string(),
            postal_code: "2311".to_string(),
            country: "NL".to_string(),
        },
        payment_method: "Stripe".to_string(),
        prices: PriceBreakdown {
            items_price: 50.0,
            tax_price: 5.0,
            shipping_price: 2.5,
            total_price: 57.5,
        },
    }
}

#[test]
fn orders_and_pending_deliveries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_overrides(dir.path().to_str().unwrap(), 0);

    let order_id;
    let delivery_id;
    {
        let state = ServerState::new(config.clone()).unwrap();
        let order = state.orders.create_order("buyer-1", payload()).unwrap();
        order_id = order.id;
        delivery_id = order.delivery_id;
        // state dropped, database closed
    }

    let state = ServerState::new(config).unwrap();
    let order = state.orders.get_order(&order_id).unwrap();
    assert_eq!(order.total_price, 57.5);
    assert_eq!(order.delivery_id, delivery_id);

    let pending = state
        .dispatch
        .list_pending(shared::models::Role::Admin, "admin-1")
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].delivery_id, delivery_id);
    // Four units at 5 kg each
    assert_eq!(pending[0].weight, 20.0);
}
