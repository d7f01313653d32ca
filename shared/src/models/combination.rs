//! Combination Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used by [`CombinationKey::canonical`]
pub const KEY_SEPARATOR: char = '|';

/// Identity of a combination: the set of selected option ids
///
/// Stored sorted and deduplicated, so equality and hashing are
/// independent of selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CombinationKey(Vec<String>);

impl CombinationKey {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, option_id: &str) -> bool {
        self.0.binary_search_by(|id| id.as_str().cmp(option_id)).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Stable string form ("a|b|c"), used as a storage key
    pub fn canonical(&self) -> String {
        self.0.join(&KEY_SEPARATOR.to_string())
    }
}

impl From<Vec<String>> for CombinationKey {
    fn from(ids: Vec<String>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<CombinationKey> for Vec<String> {
    fn from(key: CombinationKey) -> Self {
        key.0
    }
}

impl fmt::Display for CombinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// How a combination came into existence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationOrigin {
    /// Produced by the generator
    Automatic,
    /// Assembled by a user picking option values
    Custom,
}

/// Sellable variation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    /// Generation-time or persistence-time id (not the identity)
    pub id: String,
    /// Selected option ids: the identity of the combination
    pub selected_option_ids: CombinationKey,
    /// Root-to-leaf attribute paths, in selection order
    pub attribute_paths: Vec<String>,
    pub is_composite: bool,

    // Editable fields
    pub name: String,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    /// Sum of the selected options' price deltas
    pub price_delta: Decimal,
    /// Minimum of the selected options' stock
    pub stock: u32,
    pub notes: Option<String>,

    pub is_active: bool,
    pub origin: CombinationOrigin,
    /// Set once an editable field diverges from its generated default
    pub is_modified: bool,
    /// Row id in the persistent store (None = never written)
    pub storage_id: Option<String>,
}

impl Combination {
    pub fn key(&self) -> &CombinationKey {
        &self.selected_option_ids
    }

    pub fn is_persisted(&self) -> bool {
        self.storage_id.is_some()
    }

    /// Apply a partial edit; flags the record as modified when a value changes
    ///
    /// Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &CombinationPatch) -> bool {
        let mut changed = false;

        if let Some(name) = &patch.name
            && *name != self.name
        {
            self.name = name.clone();
            changed = true;
        }
        changed |= replace_optional(&mut self.sku, &patch.sku);
        changed |= replace_optional(&mut self.barcode, &patch.barcode);
        changed |= replace_optional(&mut self.image_url, &patch.image_url);
        changed |= replace_optional(&mut self.notes, &patch.notes);
        if let Some(price_delta) = patch.price_delta
            && price_delta != self.price_delta
        {
            self.price_delta = price_delta;
            changed = true;
        }
        if let Some(stock) = patch.stock
            && stock != self.stock
        {
            self.stock = stock;
            changed = true;
        }

        if changed {
            self.is_modified = true;
        }
        changed
    }
}

/// Empty string clears the field
fn replace_optional(field: &mut Option<String>, value: &Option<String>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let next = if value.is_empty() {
        None
    } else {
        Some(value.clone())
    };
    if *field == next {
        return false;
    }
    *field = next;
    true
}

/// Partial update of a combination's editable fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinationPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub image_url: Option<String>,
    pub price_delta: Option<Decimal>,
    pub stock: Option<u32>,
    pub notes: Option<String>,
}
