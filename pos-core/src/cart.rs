//! Cart Aggregator.
//!
//! Holds the selected line items prior to order submission. Purely
//! in-memory; totals are recomputed from the current lines on every call,
//! never cached across mutation.

use rust_decimal::prelude::*;
use shared::CartLine;
use tracing::debug;

use crate::charges;

#[derive(Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line. Merges into an existing line when product id and
    /// customization set are identical, otherwise appends.
    pub fn add(&mut self, line: CartLine) {
        let quantity = line.quantity.max(1);
        if let Some(existing) = self.lines.iter_mut().find(|l| l.same_selection(&line)) {
            existing.quantity += quantity;
            debug!(product_id = %line.product_id, quantity = existing.quantity, "cart line merged");
        } else {
            let mut line = line;
            line.quantity = quantity;
            debug!(product_id = %line.product_id, "cart line added");
            self.lines.push(line);
        }
    }

    /// Set the quantity of every line for `product_id`. A quantity of zero
    /// or less removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i32) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }
        for line in self.lines.iter_mut().filter(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    pub fn remove(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Snapshot the lines for submission; the cart itself stays intact
    /// until the caller confirms persistence and clears it.
    pub fn snapshot(&self) -> Vec<CartLine> {
        self.lines.clone()
    }

    /// Sum of `price * quantity` over all present lines.
    pub fn total(&self) -> f64 {
        charges::subtotal(&self.lines)
            .ok()
            .and_then(|d| d.to_f64())
            .unwrap_or_default()
    }

    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
