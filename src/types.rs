use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sheet payload
// ---------------------------------------------------------------------------

/// Body returned by the sheet endpoint. Only `values` is read; the header row
/// comes first, data rows follow. A body without `values` does not parse.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetResponse {
    pub values: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A sheet cell after type inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// One normalized data row, keyed by normalized header.
pub type SheetRow = HashMap<String, CellValue>;

// ---------------------------------------------------------------------------
// Bid records
// ---------------------------------------------------------------------------

pub const ITEM_ID_KEY: &str = "itemID";
pub const ITEM_NAME_KEY: &str = "itemName";
pub const BIDDER_ID_KEY: &str = "bidderID";
pub const BID_AMOUNT_KEY: &str = "bidAmount";

/// One bidding entry. Fields missing from a short sheet row are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidRecord {
    #[serde(rename = "itemID")]
    pub item_id: Option<CellValue>,
    #[serde(rename = "itemName")]
    pub item_name: Option<CellValue>,
    #[serde(rename = "bidderID")]
    pub bidder_id: Option<CellValue>,
    #[serde(rename = "bidAmount")]
    pub bid_amount: Option<CellValue>,
}

impl BidRecord {
    pub fn from_row(row: &SheetRow) -> Self {
        Self {
            item_id: row.get(ITEM_ID_KEY).cloned(),
            item_name: row.get(ITEM_NAME_KEY).cloned(),
            bidder_id: row.get(BIDDER_ID_KEY).cloned(),
            bid_amount: row.get(BID_AMOUNT_KEY).cloned(),
        }
    }

    /// Display strings in board column order. Missing fields render empty.
    pub fn display_fields(&self) -> [String; 4] {
        [
            display(&self.item_id),
            display(&self.item_name),
            display(&self.bidder_id),
            display(&self.bid_amount),
        ]
    }
}

fn display(value: &Option<CellValue>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}
