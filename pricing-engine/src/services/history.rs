//! Posting history used by cumulative rules
//!
//! Cumulative rules qualify on quantities and amounts booked by previously
//! submitted documents of the same type within the rule's validity window.

use crate::db::repository::RepoResult;
use chrono::NaiveDate;
use parking_lot::RwLock;
use shared::models::{ApplyOnKind, DocStatus, TransactionDocument, TransactionLine};
use std::sync::Arc;

/// Document types dated by `transaction_date`; the rest use `posting_date`
const TRANSACTION_DATED: [&str; 5] = [
    "Quotation",
    "Sales Order",
    "Purchase Order",
    "Supplier Quotation",
    "Material Request",
];

/// Date field a document type is filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    TransactionDate,
    PostingDate,
}

impl DateField {
    pub fn for_doctype(doctype: &str) -> Self {
        let parent = doctype.strip_suffix(" Item").unwrap_or(doctype);
        if TRANSACTION_DATED.contains(&parent) {
            Self::TransactionDate
        } else {
            Self::PostingDate
        }
    }

    fn of(&self, doc: &TransactionDocument) -> Option<NaiveDate> {
        match self {
            Self::TransactionDate => doc.transaction_date,
            Self::PostingDate => doc.posting_date,
        }
    }
}

/// Filter for historical postings
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub doctype: String,
    pub from: NaiveDate,
    pub upto: NaiveDate,
    /// Line field the scope values are matched on
    pub scope: ApplyOnKind,
    pub values: Vec<String>,
    /// Warehouse closure; `None` = any warehouse
    pub warehouses: Option<Vec<String>>,
}

impl HistoryQuery {
    fn matches_line(&self, line: &TransactionLine) -> bool {
        let field = match self.scope {
            ApplyOnKind::ItemCode => Some(line.item_code.as_str()),
            ApplyOnKind::ItemGroup => line.item_group.as_deref(),
            ApplyOnKind::Brand => line.brand.as_deref(),
            ApplyOnKind::Transaction => return true,
        };
        if !field.is_some_and(|v| self.values.iter().any(|s| s == v)) {
            return false;
        }
        match &self.warehouses {
            Some(warehouses) => line
                .warehouse
                .as_deref()
                .is_some_and(|w| warehouses.iter().any(|s| s == w)),
            None => true,
        }
    }
}

/// One booked line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostingRow {
    pub stock_qty: f64,
    pub amount: f64,
}

/// Ledger of submitted postings
pub trait PostingHistory: Send + Sync {
    fn postings(&self, query: &HistoryQuery) -> RepoResult<Vec<PostingRow>>;
}

/// In-memory posting history over recorded documents
#[derive(Debug, Clone, Default)]
pub struct InMemoryPostingHistory {
    documents: Arc<RwLock<Vec<TransactionDocument>>>,
}

impl InMemoryPostingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document; only submitted documents count as postings
    pub fn record(&self, doc: TransactionDocument) {
        tracing::debug!(doctype = %doc.doctype, name = %doc.name, "Posting recorded");
        self.documents.write().push(doc);
    }
}

impl PostingHistory for InMemoryPostingHistory {
    fn postings(&self, query: &HistoryQuery) -> RepoResult<Vec<PostingRow>> {
        let date_field = DateField::for_doctype(&query.doctype);
        let doctype = query
            .doctype
            .strip_suffix(" Item")
            .unwrap_or(&query.doctype);

        let documents = self.documents.read();
        let rows = documents
            .iter()
            .filter(|d| d.doctype == doctype && d.docstatus == DocStatus::Submitted)
            .filter(|d| {
                date_field
                    .of(d)
                    .is_some_and(|date| date >= query.from && date <= query.upto)
            })
            .flat_map(|d| d.items.iter())
            .filter(|line| query.matches_line(line))
            .map(|line| PostingRow {
                stock_qty: line.effective_stock_qty(),
                amount: line.amount,
            })
            .collect();
        Ok(rows)
    }
}
