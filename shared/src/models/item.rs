//! Item Model

use serde::{Deserialize, Serialize};

/// UOM conversion row (1 `uom` = `conversion_factor` stock units)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UomConversion {
    pub uom: String,
    pub conversion_factor: f64,
}

/// Item entity (catalog master data used by pricing)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub item_code: String,
    pub item_name: String,
    pub description: Option<String>,
    pub item_group: String,
    pub brand: Option<String>,
    pub stock_uom: String,
    /// Template item code when this item is a variant
    pub variant_of: Option<String>,
    pub uoms: Vec<UomConversion>,
}

impl Item {
    pub fn new(item_code: impl Into<String>, item_group: impl Into<String>) -> Self {
        let item_code = item_code.into();
        Self {
            item_name: item_code.clone(),
            item_code,
            item_group: item_group.into(),
            stock_uom: "Nos".to_string(),
            ..Default::default()
        }
    }

    /// Conversion factor for `uom`; stock UOM and unknown UOMs are 1
    pub fn conversion_factor(&self, uom: &str) -> f64 {
        if uom == self.stock_uom {
            return 1.0;
        }
        self.uoms
            .iter()
            .find(|u| u.uom == uom)
            .map(|u| u.conversion_factor)
            .unwrap_or(1.0)
    }
}

/// Price list entry for an item, optionally UOM-specific
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPrice {
    pub item_code: String,
    pub price_list: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
    pub price_list_rate: f64,
}

/// Node of a hierarchical master (item group, territory, warehouse...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub is_group: bool,
}

impl GroupNode {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_group: true,
        }
    }

    pub fn child(name: impl Into<String>, parent: impl Into<String>, is_group: bool) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            is_group,
        }
    }
}
