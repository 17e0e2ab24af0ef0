//! Property-based tests for collection invariants.

use proptest::prelude::*;

use crate::model::{Account, Role};

#[derive(Debug, Clone)]
enum AddressOp {
    Add,
    Delete(usize),
    SetDefault(usize),
}

fn address_op() -> impl Strategy<Value = AddressOp> {
    prop_oneof![
        Just(AddressOp::Add),
        (0usize..8).prop_map(AddressOp::Delete),
        (0usize..8).prop_map(AddressOp::SetDefault),
    ]
}

proptest! {
    #[test]
    fn test_exactly_one_default_address_when_non_empty(ops in prop::collection::vec(address_op(), 0..40)) {
        let mut account = Account::new("Sam", "sam@example.com", "h", Role::User);
        for (n, op) in ops.into_iter().enumerate() {
            match op {
                AddressOp::Add => {
                    account.add_address(&format!("{n} Main St")).unwrap();
                }
                AddressOp::Delete(i) => {
                    if let Some(id) = account.addresses.get(i).map(|a| a.id.clone()) {
                        account.delete_address(&id);
                    }
                }
                AddressOp::SetDefault(i) => {
                    if let Some(id) = account.addresses.get(i).map(|a| a.id.clone()) {
                        account.set_default_address(&id).unwrap();
                    }
                }
            }
            let defaults = account.addresses.iter().filter(|a| a.is_default).count();
            if account.addresses.is_empty() {
                prop_assert_eq!(defaults, 0);
            } else {
                prop_assert_eq!(defaults, 1);
            }
        }
    }

    #[test]
    fn test_cart_lines_stay_unique_per_book(adds in prop::collection::vec((0u8..5, 1u32..4), 0..30)) {
        let mut account = Account::new("Sam", "sam@example.com", "h", Role::User);
        let mut expected = [0u32; 5];
        for (book, qty) in adds {
            account.add_to_cart(&format!("book-{book}"), Some(qty)).unwrap();
            expected[book as usize] += qty;
        }
        for (book, qty) in expected.iter().enumerate() {
            let lines: Vec<_> = account
                .cart
                .iter()
                .filter(|item| item.book == format!("book-{book}"))
                .collect();
            if *qty == 0 {
                prop_assert!(lines.is_empty());
            } else {
                prop_assert_eq!(lines.len(), 1);
                prop_assert_eq!(lines[0].quantity, *qty);
            }
        }
    }
}
