//! Option Value Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discrete option value owned by a leaf attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionValue {
    pub id: String,
    /// Owning leaf attribute
    pub attribute_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    /// Additive adjustment to the base price (negative = discount)
    pub price_delta: Decimal,
    pub stock: u32,
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i32,
}

impl OptionValue {
    /// Create an active option with zero price delta and zero stock
    pub fn new(
        id: impl Into<String>,
        attribute_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            attribute_id: attribute_id.into(),
            name: name.into(),
            sku: None,
            barcode: None,
            image_url: None,
            price_delta: Decimal::ZERO,
            stock: 0,
            is_active: true,
            display_order: 0,
        }
    }

    pub fn with_price_delta(mut self, price_delta: Decimal) -> Self {
        self.price_delta = price_delta;
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
