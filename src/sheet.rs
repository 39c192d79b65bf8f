use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::fetch::{FetchClient, HttpRequest, Transport};
use crate::refresh::RecordSource;
use crate::types::{BidRecord, CellValue, SheetResponse, SheetRow};

/// Lowercase the leading run of capitals, then drop all whitespace.
/// `"Item ID"` → `"itemID"`, `"Bid Amount"` → `"bidAmount"`.
pub fn header_to_key(header: &str) -> String {
    let lead = header
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(header.len());
    let (capitals, rest) = header.split_at(lead);
    capitals
        .to_ascii_lowercase()
        .chars()
        .chain(rest.chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Infer a cell's type: yes/no words become booleans, numbers become numbers,
/// everything else stays the raw text.
pub fn infer_cell(raw: &str) -> CellValue {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => return CellValue::Bool(true),
        "false" | "f" | "no" | "n" => return CellValue::Bool(false),
        _ => {}
    }
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

/// Zip each data row against the header row. Short rows simply lack the
/// trailing keys; cells past the last header are dropped.
pub fn normalize_rows(values: &[Vec<String>]) -> Vec<SheetRow> {
    let Some((header, rows)) = values.split_first() else {
        return Vec::new();
    };
    let keys: Vec<String> = header.iter().map(|h| header_to_key(h)).collect();

    rows.iter()
        .map(|row| {
            keys.iter()
                .zip(row.iter())
                .map(|(key, cell)| (key.clone(), infer_cell(cell)))
                .collect()
        })
        .collect()
}

pub fn to_records(values: &[Vec<String>]) -> Vec<BidRecord> {
    normalize_rows(values).iter().map(BidRecord::from_row).collect()
}

// ---------------------------------------------------------------------------
// SheetSource
// ---------------------------------------------------------------------------

/// The auction sheet as a [`RecordSource`].
pub struct SheetSource<T> {
    client: FetchClient<T>,
    request: HttpRequest,
}

impl<T: Transport> SheetSource<T> {
    pub fn new(client: FetchClient<T>, url: impl Into<String>) -> Self {
        Self {
            client,
            request: HttpRequest::get(url),
        }
    }
}

#[async_trait]
impl<T: Transport + 'static> RecordSource for SheetSource<T> {
    async fn load(&self) -> Result<Vec<BidRecord>> {
        let sheet: SheetResponse = self.client.fetch_json(&self.request).await?;
        let records = to_records(&sheet.values);
        debug!(rows = records.len(), "Sheet normalized");
        Ok(records)
    }
}
