//! Typed per-section payloads.
//!
//! The original design kept an untyped record per section; here each type is a
//! variant of [`SectionData`] with a typed default constructor. Serialized form
//! stays `{"type": ..., "data": {...}}` so persisted receipts read naturally.

use serde::{Deserialize, Serialize};

use super::registry::SectionKind;

/// Horizontal alignment for headers, dates, and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Placement of the currency symbol relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CurrencyPosition {
    #[default]
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after")]
    After,
    #[serde(rename = "after-space")]
    AfterSpace,
}

/// A numeric field that tolerates user-typed garbage.
///
/// Prices and quantities arrive from form bindings and old saves as numbers,
/// strings, or null. Malformed values coerce to zero at read time instead of
/// failing the load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Missing(()),
}

impl Scalar {
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::Number(n) if n.is_finite() => *n,
            Scalar::Number(_) => 0.0,
            Scalar::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Scalar::Missing(()) => 0.0,
        }
    }

    /// Quantity semantics: whole units, garbage coerces to zero.
    pub fn as_quantity(&self) -> f64 {
        self.as_f64().trunc()
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing(()))
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Missing(())
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

/// Global display options (currency, font, colors, receipt width).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsData {
    pub currency_symbol: String,
    pub currency_position: CurrencyPosition,
    pub selected_font: String,
    pub text_color: String,
    pub show_background: bool,
    /// `None` in receipts saved before the width control existed;
    /// normalized to 320 on load.
    pub receipt_width: Option<u32>,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            currency_symbol: "$".into(),
            currency_position: CurrencyPosition::Before,
            selected_font: "font-1".into(),
            text_color: "#000000".into(),
            show_background: true,
            receipt_width: Some(320),
        }
    }
}

/// Business identity block at the top of the receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeaderData {
    pub logo_url: String,
    pub header_alignment: Alignment,
    pub logo_size: u32,
    pub business_name: String,
    pub line1: String,
    pub line2: String,
    pub line3: String,
    pub header_divider: String,
    pub show_header_divider: bool,
}

impl Default for HeaderData {
    fn default() -> Self {
        Self {
            logo_url: String::new(),
            header_alignment: Alignment::Center,
            logo_size: 50,
            business_name: "Business Details".into(),
            line1: String::new(),
            line2: String::new(),
            line3: String::new(),
            header_divider: "---".into(),
            show_header_divider: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateTimeData {
    pub date_alignment: Alignment,
    pub date_time: String,
    pub date_divider: String,
    pub show_date_divider: bool,
}

impl Default for DateTimeData {
    fn default() -> Self {
        Self {
            date_alignment: Alignment::Left,
            date_time: String::new(),
            date_divider: "---".into(),
            show_date_divider: true,
        }
    }
}

/// A label/value pair assigned to the left (1) or right (2) column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CustomField {
    pub label: String,
    pub value: String,
    pub column: u8,
}

impl CustomField {
    pub fn new(label: &str, value: &str, column: u8) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwoColumnData {
    pub custom_fields: Vec<CustomField>,
    pub info_divider: String,
    pub show_info_divider: bool,
}

impl Default for TwoColumnData {
    fn default() -> Self {
        Self {
            custom_fields: vec![
                CustomField::new("Table", "415", 1),
                CustomField::new("Server", "Rebecca", 1),
                CustomField::new("Guests", "2", 2),
            ],
            info_divider: "---".into(),
            show_info_divider: true,
        }
    }
}

/// One purchasable line on the receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LineItem {
    pub id: String,
    pub quantity: Scalar,
    pub name: String,
    pub price: Scalar,
}

impl LineItem {
    pub fn new(id: &str, quantity: f64, name: &str, price: f64) -> Self {
        Self {
            id: id.into(),
            quantity: quantity.into(),
            name: name.into(),
            price: price.into(),
        }
    }

    /// Line contribution to the subtotal; malformed fields count as zero.
    pub fn line_total(&self) -> f64 {
        self.price.as_f64() * self.quantity.as_quantity()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemsData {
    pub items: Vec<LineItem>,
    pub items_divider: String,
    pub show_items_divider: bool,
}

impl Default for ItemsData {
    fn default() -> Self {
        Self {
            items: vec![
                LineItem::new("item_1", 1.0, "Americano", 2.99),
                LineItem::new("item_2", 2.0, "Chocolate Chip Cookie", 1.98),
                LineItem::new("item_3", 2.0, "Coke", 1.5),
            ],
            items_divider: "---".into(),
            show_items_divider: true,
        }
    }
}

/// A free-form label/value row in the payment block (card number, cashier, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PaymentField {
    pub label: String,
    pub value: String,
}

impl PaymentField {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentData {
    pub tax_rate: Scalar,
    pub show_tax_rate: bool,
    pub payment_type: String,
    pub payment_fields: Vec<PaymentField>,
    pub payment_divider: String,
    pub show_payment_divider: bool,
}

impl Default for PaymentData {
    fn default() -> Self {
        Self {
            tax_rate: Scalar::Missing(()),
            show_tax_rate: false,
            payment_type: "cash".into(),
            payment_fields: Vec::new(),
            payment_divider: "---".into(),
            show_payment_divider: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageData {
    pub custom_message: String,
    pub message_alignment: Alignment,
    pub message_bold: bool,
    pub message_divider: String,
    pub show_message_divider: bool,
}

impl Default for MessageData {
    fn default() -> Self {
        Self {
            custom_message: "THANK YOU\nHAVE A NICE DAY".into(),
            message_alignment: Alignment::Center,
            message_bold: false,
            message_divider: "---".into(),
            show_message_divider: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BarcodeData {
    pub barcode_enabled: bool,
    pub barcode_size: u32,
    pub barcode_length: u32,
    pub barcode_value: String,
}

impl Default for BarcodeData {
    fn default() -> Self {
        Self {
            barcode_enabled: true,
            barcode_size: 50,
            barcode_length: 50,
            barcode_value: String::new(),
        }
    }
}

/// Tagged union over all section payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SectionData {
    Settings(SettingsData),
    Header(HeaderData),
    DateTime(DateTimeData),
    TwoColumn(TwoColumnData),
    Items(ItemsData),
    Payment(PaymentData),
    CustomMessage(MessageData),
    Barcode(BarcodeData),
}

impl SectionData {
    /// The typed default constructor for a section type.
    pub fn default_for(kind: SectionKind) -> SectionData {
        match kind {
            SectionKind::Settings => SectionData::Settings(SettingsData::default()),
            SectionKind::Header => SectionData::Header(HeaderData::default()),
            SectionKind::DateTime => SectionData::DateTime(DateTimeData::default()),
            SectionKind::TwoColumn => SectionData::TwoColumn(TwoColumnData::default()),
            SectionKind::Items => SectionData::Items(ItemsData::default()),
            SectionKind::Payment => SectionData::Payment(PaymentData::default()),
            SectionKind::CustomMessage => SectionData::CustomMessage(MessageData::default()),
            SectionKind::Barcode => SectionData::Barcode(BarcodeData::default()),
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            SectionData::Settings(_) => SectionKind::Settings,
            SectionData::Header(_) => SectionKind::Header,
            SectionData::DateTime(_) => SectionKind::DateTime,
            SectionData::TwoColumn(_) => SectionKind::TwoColumn,
            SectionData::Items(_) => SectionKind::Items,
            SectionData::Payment(_) => SectionKind::Payment,
            SectionData::CustomMessage(_) => SectionKind::CustomMessage,
            SectionData::Barcode(_) => SectionKind::Barcode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(Scalar::from("2.99").as_f64(), 2.99);
        assert_eq!(Scalar::from("abc").as_f64(), 0.0);
        assert_eq!(Scalar::from(" 3.5 ").as_f64(), 3.5);
        assert_eq!(Scalar::Missing(()).as_f64(), 0.0);
        assert_eq!(Scalar::Number(2.7).as_quantity(), 2.0);
    }

    #[test]
    fn test_scalar_deserializes_null() {
        let s: Scalar = serde_json::from_str("null").unwrap();
        assert!(s.is_missing());
        let s: Scalar = serde_json::from_str("\"8.5\"").unwrap();
        assert_eq!(s.as_f64(), 8.5);
    }

    #[test]
    fn test_default_for_matches_kind() {
        for kind in SectionKind::ALL {
            assert_eq!(SectionData::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_tagged_serialization_shape() {
        let data = SectionData::Barcode(BarcodeData::default());
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["type"], "barcode");
        assert_eq!(v["data"]["barcodeSize"], 50);
    }

    #[test]
    fn test_line_total_malformed_price() {
        let item = LineItem {
            id: "i".into(),
            quantity: Scalar::Number(3.0),
            name: "x".into(),
            price: Scalar::Text("oops".into()),
        };
        assert_eq!(item.line_total(), 0.0);
    }
}
