//! Cart line model.

use serde::{Deserialize, Serialize};

/// One selected line in a cart, and the snapshot form persisted on an
/// order at submit time. Prices are captured at selection time; a later
/// menu price change never retro-edits an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    /// Product record ID in the storage collaborator.
    pub product_id: String,
    /// Display name captured at selection time.
    pub name: String,
    /// Unit price.
    pub price: f64,
    /// Quantity, always >= 1 inside a cart.
    pub quantity: i32,
    /// Customization tags ("extra spicy", "no onion", ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customizations: Vec<String>,
    /// Free-text note for the kitchen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            quantity: 1,
            customizations: Vec::new(),
            note: None,
        }
    }

    pub fn with_quantity(mut self, quantity: i32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_customizations(mut self, customizations: Vec<String>) -> Self {
        self.customizations = customizations;
        self
    }

    /// Two lines merge in a cart only when both product and customization
    /// set are identical. Order matters: "no onion, extra spicy" and
    /// "extra spicy, no onion" are distinct selections, mirroring how the
    /// selection UI emits them.
    pub fn same_selection(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id && self.customizations == other.customizations
    }
}
