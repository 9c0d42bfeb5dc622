//! Serde models for the order and table lifecycle.

pub mod cart;
pub mod notification;
pub mod order;
pub mod staff;
pub mod table;
