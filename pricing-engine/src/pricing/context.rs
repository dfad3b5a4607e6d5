//! Resolution context
//!
//! Read-only collaborators shared by every step of one resolution pass.

use super::error::{PricingError, PricingResult};
use crate::core::EngineConfig;
use crate::services::{CatalogLookup, HierarchyClosureCache, HierarchyKind, PostingHistory};
use shared::models::{ApplyOnKind, TransactionLine};
use shared::pricing::ResolutionArgs;
use std::sync::Arc;

#[derive(Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub catalog: &'a dyn CatalogLookup,
    pub history: &'a dyn PostingHistory,
    pub closures: &'a HierarchyClosureCache,
    pub config: &'a EngineConfig,
}

impl std::fmt::Debug for ResolutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("closures", &self.closures.len())
            .field("config", self.config)
            .finish()
    }
}

impl<'a> ResolutionContext<'a> {
    /// Groups matching `name` in the `kind` hierarchy
    ///
    /// Fails with `InvalidGroup` when `name` is unknown.
    pub fn matching_groups(&self, kind: HierarchyKind, name: &str) -> PricingResult<Arc<Vec<String>>> {
        self.closures
            .matching_groups(self.catalog, kind, name)
            .ok_or_else(|| PricingError::InvalidGroup {
                kind,
                name: name.to_string(),
            })
    }

    /// `name` and all groups below it
    pub fn descendants(&self, kind: HierarchyKind, name: &str) -> Arc<Vec<String>> {
        self.closures.descendants(self.catalog, kind, name)
    }

    /// Line value for a scope kind, falling back to the item master
    pub fn line_value(&self, line: &TransactionLine, kind: ApplyOnKind) -> Option<String> {
        let own = match kind {
            ApplyOnKind::ItemCode => Some(line.item_code.clone()).filter(|c| !c.is_empty()),
            ApplyOnKind::ItemGroup => line.item_group.clone(),
            ApplyOnKind::Brand => line.brand.clone(),
            ApplyOnKind::Transaction => None,
        };
        own.or_else(|| {
            let item = self.catalog.item_meta(&line.item_code)?;
            match kind {
                ApplyOnKind::ItemGroup => Some(item.item_group).filter(|g| !g.is_empty()),
                ApplyOnKind::Brand => item.brand,
                _ => None,
            }
        })
    }
}

/// Args value for a scope kind
pub fn args_value(args: &ResolutionArgs, kind: ApplyOnKind) -> Option<&str> {
    let value = match kind {
        ApplyOnKind::ItemCode => Some(args.item_code.as_str()),
        ApplyOnKind::ItemGroup => args.item_group.as_deref(),
        ApplyOnKind::Brand => args.brand.as_deref(),
        ApplyOnKind::Transaction => None,
    };
    value.filter(|v| !v.is_empty())
}
