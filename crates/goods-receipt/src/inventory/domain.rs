use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::numbering::{format_document_date, format_pz_number};

/// Units suggested when entering a line item.
pub const DEFAULT_UNIT_OPTIONS: [&str; 3] = ["szt", "kg", "mb"];

/// Supplier or other business partner referenced by PZ documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    /// Store-assigned identifier, absent until the contractor is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl Contractor {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            uid: None,
        }
    }
}

/// Named good with a unit of measure.
///
/// `amount` is kept as entered; it is never parsed or compared numerically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub amount: String,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            amount: amount.into(),
        }
    }
}

/// Goods-received (PZ) document.
///
/// `contractor` is filled in at read time from `contractor_uid` and is never
/// written back to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub contractor_uid: Option<String>,
    #[serde(default, rename = "item")]
    pub items: Vec<Item>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(skip)]
    pub contractor: Option<Contractor>,
}

impl Document {
    /// Build a new PZ document numbered `sequence` and dated `date`.
    pub fn new_pz(
        uid: impl Into<String>,
        sequence: i32,
        contractor_uid: impl Into<String>,
        items: &[Item],
        date: NaiveDate,
    ) -> Self {
        Self {
            date: Some(format_document_date(date)),
            number: Some(format_pz_number(sequence, date)),
            contractor_uid: Some(contractor_uid.into()),
            items: items.to_vec(),
            uid: Some(uid.into()),
            contractor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineItemError {
    #[error("item '{0}' is already listed on this document")]
    DuplicateName(String),
}

/// Draft list of line items while a document is being composed or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItems {
    lines: Vec<Item>,
}

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, rejecting names already present on the document.
    pub fn add(&mut self, item: Item) -> Result<(), LineItemError> {
        if self.lines.iter().any(|line| line.name == item.name) {
            return Err(LineItemError::DuplicateName(item.name));
        }
        self.lines.push(item);
        Ok(())
    }

    /// Swap every line equal to `current` for `updated`.
    pub fn replace(&mut self, current: &Item, updated: Item) -> bool {
        let mut replaced = false;
        for line in self.lines.iter_mut().filter(|line| **line == *current) {
            *line = updated.clone();
            replaced = true;
        }
        replaced
    }

    pub fn remove(&mut self, item: &Item) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line != item);
        self.lines.len() != before
    }

    pub fn as_slice(&self) -> &[Item] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_vec(self) -> Vec<Item> {
        self.lines
    }
}

impl From<Vec<Item>> for LineItems {
    fn from(lines: Vec<Item>) -> Self {
        Self { lines }
    }
}

/// Sanitized document representation including the joined contractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub uid: Option<String>,
    pub number: Option<String>,
    pub date: Option<String>,
    pub contractor_uid: Option<String>,
    pub items: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<Contractor>,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self {
            uid: document.uid,
            number: document.number,
            date: document.date,
            contractor_uid: document.contractor_uid,
            items: document.items,
            contractor: document.contractor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bolt() -> Item {
        Item::new("Bolt M8", "szt", "40")
    }

    #[test]
    fn new_pz_formats_number_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).expect("valid date");
        let document = Document::new_pz("doc-1", 12, "c-1", &[bolt()], date);

        assert_eq!(document.number.as_deref(), Some("PZ 12/03/2024"));
        assert_eq!(document.date.as_deref(), Some("07/03/2024"));
        assert_eq!(document.contractor_uid.as_deref(), Some("c-1"));
        assert_eq!(document.items, vec![bolt()]);
    }

    #[test]
    fn document_serializes_with_store_field_names() {
        let mut document = Document::new_pz(
            "doc-1",
            1,
            "c-1",
            &[bolt()],
            NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date"),
        );
        document.contractor = Some(Contractor::new("Acme", "AC"));

        let value = serde_json::to_value(&document).expect("serializes");
        assert_eq!(value["contractorUid"], json!("c-1"));
        assert_eq!(value["item"][0]["amount"], json!("40"));
        assert!(value.get("contractor").is_none());
    }

    #[test]
    fn document_tolerates_missing_fields() {
        let document: Document =
            serde_json::from_value(json!({ "number": "PZ 3/01/2024" })).expect("decodes");

        assert_eq!(document.number.as_deref(), Some("PZ 3/01/2024"));
        assert!(document.items.is_empty());
        assert!(document.contractor_uid.is_none());
    }

    #[test]
    fn line_items_reject_duplicate_names() {
        let mut lines = LineItems::new();
        lines.add(bolt()).expect("first line accepted");

        let duplicate = Item::new("Bolt M8", "kg", "2");
        assert_eq!(
            lines.add(duplicate),
            Err(LineItemError::DuplicateName("Bolt M8".to_string()))
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.as_slice()[0].unit, "szt");
    }

    #[test]
    fn line_items_replace_and_remove_equal_lines() {
        let mut lines = LineItems::from(vec![bolt(), Item::new("Nut", "szt", "10")]);

        assert!(lines.replace(&bolt(), Item::new("Bolt M10", "szt", "40")));
        assert_eq!(lines.as_slice()[0].name, "Bolt M10");

        assert!(lines.remove(&Item::new("Nut", "szt", "10")));
        assert!(!lines.remove(&Item::new("Nut", "szt", "10")));
        assert_eq!(lines.into_vec().len(), 1);
    }
}
