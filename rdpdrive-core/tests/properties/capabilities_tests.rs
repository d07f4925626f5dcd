//! Property-based tests for drawing-order capability tables

use proptest::prelude::*;
use rdpdrive_core::capabilities::ORDER_SUPPORT_SLOTS;
use rdpdrive_core::{DrawingOrder, OrderSupport};

// Strategy for generating any subset of the known drawing orders
fn arb_order_subset() -> impl Strategy<Value = Vec<DrawingOrder>> {
    proptest::sample::subsequence(DrawingOrder::ALL.to_vec(), 0..=DrawingOrder::ALL.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The wire table has a set byte exactly at the slots of enabled orders.
    #[test]
    fn prop_wire_table_matches_enabled_orders(orders in arb_order_subset()) {
        let support = OrderSupport::from(orders.clone());
        let bytes = support.to_bytes();

        prop_assert_eq!(bytes.len(), ORDER_SUPPORT_SLOTS);
        prop_assert_eq!(
            bytes.iter().filter(|b| **b == 1).count(),
            orders.len()
        );
        for order in &orders {
            prop_assert_eq!(bytes[order.negotiation_index()], 1);
        }
    }

    /// Disabling an order only clears that order's slot.
    #[test]
    fn prop_disable_is_local(index in 0usize..22) {
        let order = DrawingOrder::ALL[index];
        let mut support = OrderSupport::all();
        support.disable(order);

        prop_assert!(!support.is_supported(order));
        prop_assert_eq!(support.enabled().len(), DrawingOrder::ALL.len() - 1);
    }

    /// Every order name parses back to the same order.
    #[test]
    fn prop_order_names_parse(index in 0usize..22, upper in any::<bool>()) {
        let order = DrawingOrder::ALL[index];
        let name = if upper {
            order.name().to_uppercase()
        } else {
            order.name().to_string()
        };
        prop_assert_eq!(name.parse::<DrawingOrder>().unwrap(), order);
    }
}

#[test]
fn test_negotiation_indices_are_unique() {
    let mut seen = [false; ORDER_SUPPORT_SLOTS];
    for order in DrawingOrder::ALL {
        let index = order.negotiation_index();
        assert!(!seen[index], "duplicate index for {order}");
        seen[index] = true;
    }
}
