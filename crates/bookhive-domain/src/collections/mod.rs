//! Self-service collections on an account: cart, wishlist, addresses.
//!
//! These are pure in-memory mutations of an [`Account`](crate::Account).
//! Callers load the account, apply one of these operations and save it
//! back while holding the account's serialization lock.

mod addresses;
mod cart;
mod wishlist;

#[cfg(test)]
mod invariants_proptest;
