//! Catalog Service - item master data, prices and hierarchies with in-memory caching
//!
//! Serves every catalog lookup pricing needs: item metadata (template,
//! group, brand, stock UOM), UOM conversion, UOM-specific prices and the
//! nested-set hierarchies for item groups, customer groups, territories,
//! supplier groups and warehouses.

use super::hierarchy::GroupTree;
use crate::db::repository::{RepoError, RepoResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::models::{GroupNode, Item, ItemPrice};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Hierarchical master kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HierarchyKind {
    ItemGroup,
    CustomerGroup,
    Territory,
    SupplierGroup,
    Warehouse,
}

impl HierarchyKind {
    /// Kinds whose tree root also matches every member
    pub fn includes_root(&self) -> bool {
        matches!(self, Self::ItemGroup | Self::CustomerGroup | Self::Territory)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ItemGroup => "Item Group",
            Self::CustomerGroup => "Customer Group",
            Self::Territory => "Territory",
            Self::SupplierGroup => "Supplier Group",
            Self::Warehouse => "Warehouse",
        }
    }
}

impl fmt::Display for HierarchyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Catalog lookups consumed by the engine
pub trait CatalogLookup: Send + Sync {
    /// Item master data
    fn item_meta(&self, item_code: &str) -> Option<Item>;

    /// Stock units per `uom` for the item (1 when unknown)
    fn conversion_factor(&self, item_code: &str, uom: &str) -> f64;

    /// Whether a price exists for exactly this UOM
    fn has_item_price(&self, item_code: &str, uom: &str, price_list: Option<&str>) -> bool;

    /// `name` and its ancestors; `None` when unknown
    fn ancestors(&self, kind: HierarchyKind, name: &str) -> Option<Vec<String>>;

    /// `name` and its descendants
    fn descendants(&self, kind: HierarchyKind, name: &str) -> Vec<String>;

    /// Root group of the hierarchy
    fn root(&self, kind: HierarchyKind) -> Option<String>;
}

/// In-memory catalog
#[derive(Clone, Default)]
pub struct CatalogService {
    items: Arc<RwLock<HashMap<String, Item>>>,
    prices: Arc<RwLock<Vec<ItemPrice>>>,
    trees: Arc<RwLock<HashMap<HierarchyKind, GroupTree>>>,
}

impl fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogService")
            .field("items", &self.items.read().len())
            .field("prices", &self.prices.read().len())
            .field("trees", &self.trees.read().len())
            .finish()
    }
}

impl CatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Items ====================

    /// Add or replace an item
    ///
    /// The item group must already exist when an item group tree is loaded.
    pub fn upsert_item(&self, item: Item) -> RepoResult<()> {
        if item.item_code.trim().is_empty() {
            return Err(RepoError::Validation("Item code is required".to_string()));
        }
        if let Some(tree) = self.trees.read().get(&HierarchyKind::ItemGroup)
            && !item.item_group.is_empty()
            && !tree.contains(&item.item_group)
        {
            return Err(RepoError::NotFound(format!(
                "Item Group {} not found",
                item.item_group
            )));
        }
        self.items.write().insert(item.item_code.clone(), item);
        Ok(())
    }

    pub fn get_item(&self, item_code: &str) -> Option<Item> {
        self.items.read().get(item_code).cloned()
    }

    /// Variants of a template item
    pub fn variants_of(&self, template: &str) -> Vec<String> {
        let mut variants: Vec<String> = self
            .items
            .read()
            .values()
            .filter(|i| i.variant_of.as_deref() == Some(template))
            .map(|i| i.item_code.clone())
            .collect();
        variants.sort();
        variants
    }

    // ==================== Prices ====================

    pub fn add_price(&self, price: ItemPrice) {
        self.prices.write().push(price);
    }

    /// Price list rate for the item, preferring a UOM-specific entry
    pub fn price_list_rate(&self, item_code: &str, price_list: &str, uom: Option<&str>) -> Option<f64> {
        let prices = self.prices.read();
        let candidates = prices
            .iter()
            .filter(|p| p.item_code == item_code && p.price_list == price_list);
        let mut fallback = None;
        for price in candidates {
            match (&price.uom, uom) {
                (Some(p), Some(u)) if p == u => return Some(price.price_list_rate),
                (None, _) => fallback = fallback.or(Some(price.price_list_rate)),
                _ => {}
            }
        }
        fallback
    }

    // ==================== Hierarchies ====================

    pub fn add_group(&self, kind: HierarchyKind, node: GroupNode) -> RepoResult<()> {
        self.trees.write().entry(kind).or_default().insert(node)
    }
}

impl CatalogLookup for CatalogService {
    fn item_meta(&self, item_code: &str) -> Option<Item> {
        self.get_item(item_code)
    }

    fn conversion_factor(&self, item_code: &str, uom: &str) -> f64 {
        match self.items.read().get(item_code) {
            Some(item) => item.conversion_factor(uom),
            None => {
                tracing::warn!(item_code, uom, "Item not found in catalog, using conversion factor 1");
                1.0
            }
        }
    }

    fn has_item_price(&self, item_code: &str, uom: &str, price_list: Option<&str>) -> bool {
        self.prices.read().iter().any(|p| {
            p.item_code == item_code
                && p.uom.as_deref() == Some(uom)
                && price_list.is_none_or(|pl| p.price_list == pl)
        })
    }

    fn ancestors(&self, kind: HierarchyKind, name: &str) -> Option<Vec<String>> {
        self.trees.read().get(&kind)?.ancestors(name)
    }

    fn descendants(&self, kind: HierarchyKind, name: &str) -> Vec<String> {
        self.trees
            .read()
            .get(&kind)
            .map(|t| t.descendants(name))
            .unwrap_or_default()
    }

    fn root(&self, kind: HierarchyKind) -> Option<String> {
        self.trees.read().get(&kind)?.root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::UomConversion;

    fn catalog() -> CatalogService {
        let catalog = CatalogService::new();
        catalog
            .add_group(HierarchyKind::ItemGroup, GroupNode::root("All Item Groups"))
            .unwrap();
        catalog
            .add_group(
                HierarchyKind::ItemGroup,
                GroupNode::child("Products", "All Item Groups", false),
            )
            .unwrap();
        let mut item = Item::new("_Test Item", "Products");
        item.uoms.push(UomConversion {
            uom: "Box".to_string(),
            conversion_factor: 10.0,
        });
        catalog.upsert_item(item).unwrap();
        catalog
    }

    #[test]
    fn test_upsert_item_checks_group() {
        let catalog = catalog();
        let err = catalog
            .upsert_item(Item::new("_Test Other", "Missing"))
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[test]
    fn test_conversion_factor() {
        let catalog = catalog();
        assert_eq!(catalog.conversion_factor("_Test Item", "Box"), 10.0);
        assert_eq!(catalog.conversion_factor("_Test Item", "Nos"), 1.0);
        assert_eq!(catalog.conversion_factor("_Unknown", "Box"), 1.0);
    }

    #[test]
    fn test_uom_specific_price() {
        let catalog = catalog();
        catalog.add_price(ItemPrice {
            item_code: "_Test Item".to_string(),
            price_list: "Standard Selling".to_string(),
            uom: None,
            price_list_rate: 100.0,
        });
        catalog.add_price(ItemPrice {
            item_code: "_Test Item".to_string(),
            price_list: "Standard Selling".to_string(),
            uom: Some("Box".to_string()),
            price_list_rate: 950.0,
        });

        assert!(catalog.has_item_price("_Test Item", "Box", Some("Standard Selling")));
        assert!(!catalog.has_item_price("_Test Item", "Nos", Some("Standard Selling")));
        assert_eq!(
            catalog.price_list_rate("_Test Item", "Standard Selling", Some("Box")),
            Some(950.0)
        );
        assert_eq!(
            catalog.price_list_rate("_Test Item", "Standard Selling", Some("Nos")),
            Some(100.0)
        );
    }

    #[test]
    fn test_hierarchy_lookups() {
        let catalog = catalog();
        assert_eq!(
            catalog.ancestors(HierarchyKind::ItemGroup, "Products").unwrap(),
            vec!["All Item Groups", "Products"]
        );
        assert_eq!(
            catalog.root(HierarchyKind::ItemGroup).as_deref(),
            Some("All Item Groups")
        );
        assert!(catalog.ancestors(HierarchyKind::Territory, "India").is_none());
    }
}
