//! # Template Loader
//!
//! Parses the two historical template config shapes and turns them into an
//! ordered section list. The newer shape carries a `sections` array; the
//! legacy flat shape names each block at the top level and is translated in a
//! fixed sequence. Both paths are lenient: missing or malformed blocks are
//! skipped, never fatal (preserved legacy behavior, see DESIGN.md).

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::section::{
    data_with_overlay, CustomField, LineItem, SectionData, SectionInstance, SectionKind,
};

/// One entry of the `sections` array shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub collapsed: bool,
}

/// A template configuration in either supported shape.
///
/// Every field is optional; which path [`instantiate`] takes depends only on
/// whether `sections` is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateConfig {
    pub sections: Option<Vec<SectionEntry>>,
    pub settings: Option<Value>,
    pub header: Option<Value>,
    // Legacy flat shape blocks.
    pub date_time: Option<Value>,
    pub two_column: Option<Vec<Value>>,
    pub custom_messages: Option<Vec<Value>>,
    pub items: Option<Vec<Value>>,
    pub payment: Option<Value>,
    pub custom_messages2: Option<Vec<Value>>,
    pub barcode: Option<Value>,
}

impl TemplateConfig {
    /// Serialize a live section list into the `sections` array shape, the form
    /// used by manual saves and pending-save records.
    pub fn snapshot_of(sections: &[SectionInstance]) -> TemplateConfig {
        let entries = sections
            .iter()
            .filter_map(|section| {
                let tagged = serde_json::to_value(&section.data).ok()?;
                Some(SectionEntry {
                    kind: tagged.get("type")?.as_str()?.to_string(),
                    data: tagged.get("data").cloned().unwrap_or(Value::Null),
                    collapsed: section.collapsed,
                })
            })
            .collect();
        TemplateConfig {
            sections: Some(entries),
            ..TemplateConfig::default()
        }
    }
}

fn next_instance(next_id: &mut u64, collapsed: bool, data: SectionData) -> SectionInstance {
    let instance_id = *next_id;
    *next_id += 1;
    SectionInstance {
        instance_id,
        collapsed,
        data,
    }
}

/// Replace-the-world template instantiation.
///
/// Returns the full new section list; the caller owns id continuity through
/// `next_id`. Run [`normalize`] on the result unconditionally.
pub fn instantiate(config: &TemplateConfig, next_id: &mut u64) -> Vec<SectionInstance> {
    let mut sections = Vec::new();

    if let Some(entries) = &config.sections {
        // Sections-array shape: optional settings/header blocks are prepended.
        if let Some(settings) = &config.settings {
            let data = data_with_overlay(SectionKind::Settings, settings);
            sections.push(next_instance(next_id, true, data));
        }
        if let Some(header) = &config.header {
            let data = data_with_overlay(SectionKind::Header, header);
            sections.push(next_instance(next_id, true, data));
        }
        for entry in entries {
            let Some(kind) = SectionKind::from_wire(&entry.kind) else {
                warn!("unknown section type '{}' in template, skipping", entry.kind);
                continue;
            };
            let data = data_with_overlay(kind, &entry.data);
            sections.push(next_instance(next_id, entry.collapsed, data));
        }
    } else {
        instantiate_legacy(config, next_id, &mut sections);
    }

    sections
}

/// Legacy flat shape: named blocks translated in a fixed order. Absent blocks
/// are silently dropped.
fn instantiate_legacy(
    config: &TemplateConfig,
    next_id: &mut u64,
    sections: &mut Vec<SectionInstance>,
) {
    if let Some(settings) = &config.settings {
        let data = data_with_overlay(SectionKind::Settings, settings);
        sections.push(next_instance(next_id, true, data));
    }
    if let Some(header) = &config.header {
        let data = data_with_overlay(SectionKind::Header, header);
        sections.push(next_instance(next_id, true, data));
    }
    if let Some(date_time) = &config.date_time {
        let data = data_with_overlay(SectionKind::DateTime, date_time);
        sections.push(next_instance(next_id, true, data));
    }
    if let Some(fields) = &config.two_column {
        if !fields.is_empty() {
            let mut data = match SectionData::default_for(SectionKind::TwoColumn) {
                SectionData::TwoColumn(d) => d,
                _ => unreachable!(),
            };
            // The flat shape is a simple list; everything lands in column 1.
            data.custom_fields = fields
                .iter()
                .map(|field| CustomField {
                    label: string_at(field, "label"),
                    value: string_at(field, "value"),
                    column: 1,
                })
                .collect();
            sections.push(next_instance(next_id, true, SectionData::TwoColumn(data)));
        }
    }
    if let Some(messages) = &config.custom_messages {
        for message in messages {
            let data = data_with_overlay(SectionKind::CustomMessage, message);
            sections.push(next_instance(next_id, true, data));
        }
    }
    if let Some(items) = &config.items {
        if !items.is_empty() {
            let mut data = match SectionData::default_for(SectionKind::Items) {
                SectionData::Items(d) => d,
                _ => unreachable!(),
            };
            data.items = items
                .iter()
                .map(|item| serde_json::from_value::<LineItem>(item.clone()).unwrap_or_default())
                .collect();
            sections.push(next_instance(next_id, true, SectionData::Items(data)));
        }
    }
    if let Some(payment) = &config.payment {
        let data = data_with_overlay(SectionKind::Payment, payment);
        sections.push(next_instance(next_id, true, data));
    }
    // The first post-payment message lands before the barcode, the rest after.
    if let Some(messages) = &config.custom_messages2 {
        if let Some(first) = messages.first() {
            let data = data_with_overlay(SectionKind::CustomMessage, first);
            sections.push(next_instance(next_id, true, data));
        }
    }
    if let Some(barcode) = &config.barcode {
        let data = data_with_overlay(SectionKind::Barcode, barcode);
        sections.push(next_instance(next_id, true, data));
    }
    if let Some(messages) = &config.custom_messages2 {
        for message in messages.iter().skip(1) {
            let data = data_with_overlay(SectionKind::CustomMessage, message);
            sections.push(next_instance(next_id, true, data));
        }
    }
}

fn string_at(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Post-load normalization, applied after every bulk load.
///
/// Assigns a unique id to every item lacking one and guarantees the settings
/// section carries a receipt width. Returns the effective width so the caller
/// can propagate it into the live reactive field. Idempotent.
pub fn normalize(sections: &mut [SectionInstance]) -> u32 {
    for section in sections.iter_mut() {
        if let Some(items) = section.items_mut() {
            for item in &mut items.items {
                if item.id.is_empty() {
                    item.id = format!("item_{}", Uuid::new_v4().simple());
                }
            }
        }
    }

    let mut width = crate::DEFAULT_RECEIPT_WIDTH;
    for section in sections.iter_mut() {
        if let SectionData::Settings(settings) = &mut section.data {
            if settings.receipt_width.is_none() {
                settings.receipt_width = Some(crate::DEFAULT_RECEIPT_WIDTH);
                debug!("migrated settings section: added receipt width");
            }
            width = settings.receipt_width.unwrap_or(crate::DEFAULT_RECEIPT_WIDTH);
            break;
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn kinds(sections: &[SectionInstance]) -> Vec<SectionKind> {
        sections.iter().map(|s| s.kind()).collect()
    }

    #[test]
    fn test_sections_array_shape() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "settings": {"currencySymbol": "€"},
            "sections": [
                {"type": "items", "data": {"items": [{"name": "Latte", "price": 4.5, "quantity": 1}]}},
                {"type": "barcode", "data": {}}
            ]
        }))
        .unwrap();
        let mut next_id = 1;
        let sections = instantiate(&config, &mut next_id);
        assert_eq!(
            kinds(&sections),
            vec![SectionKind::Settings, SectionKind::Items, SectionKind::Barcode]
        );
        assert_eq!(next_id, 4);
    }

    #[test]
    fn test_unknown_type_skipped() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "sections": [
                {"type": "hologram", "data": {}},
                {"type": "header", "data": {"businessName": "X"}}
            ]
        }))
        .unwrap();
        let mut next_id = 1;
        let sections = instantiate(&config, &mut next_id);
        assert_eq!(kinds(&sections), vec![SectionKind::Header]);
    }

    #[test]
    fn test_legacy_flat_shape_ordering() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "settings": {},
            "header": {"businessName": "CAFE"},
            "dateTime": {"dateTime": "01/02/2025"},
            "twoColumn": [{"label": "Order", "value": "17"}],
            "customMessages": [{"customMessage": "pre-items"}],
            "items": [{"name": "Espresso", "price": 3.0, "quantity": 1}],
            "payment": {"paymentType": "card"},
            "customMessages2": [
                {"customMessage": "before barcode"},
                {"customMessage": "after barcode"},
                {"customMessage": "also after"}
            ],
            "barcode": {"barcodeValue": "12345"}
        }))
        .unwrap();
        let mut next_id = 1;
        let sections = instantiate(&config, &mut next_id);
        assert_eq!(
            kinds(&sections),
            vec![
                SectionKind::Settings,
                SectionKind::Header,
                SectionKind::DateTime,
                SectionKind::TwoColumn,
                SectionKind::CustomMessage,
                SectionKind::Items,
                SectionKind::Payment,
                SectionKind::CustomMessage,
                SectionKind::Barcode,
                SectionKind::CustomMessage,
                SectionKind::CustomMessage,
            ]
        );
    }

    #[test]
    fn test_legacy_missing_blocks_dropped() {
        let config: TemplateConfig =
            serde_json::from_value(json!({"items": [{"name": "A", "price": 1.0}]})).unwrap();
        let mut next_id = 1;
        let sections = instantiate(&config, &mut next_id);
        assert_eq!(kinds(&sections), vec![SectionKind::Items]);
    }

    #[test]
    fn test_legacy_two_column_lands_in_column_one() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "twoColumn": [{"label": "Register", "value": 3}]
        }))
        .unwrap();
        let mut next_id = 1;
        let sections = instantiate(&config, &mut next_id);
        let SectionData::TwoColumn(data) = &sections[0].data else {
            panic!("expected two-column");
        };
        assert_eq!(data.custom_fields[0].column, 1);
        assert_eq!(data.custom_fields[0].value, "3");
    }

    #[test]
    fn test_normalize_assigns_unique_item_ids_idempotently() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "sections": [
                {"type": "items", "data": {"items": [
                    {"name": "A", "price": 1.0},
                    {"name": "B", "price": 2.0}
                ]}}
            ]
        }))
        .unwrap();
        let mut next_id = 1;
        let mut sections = instantiate(&config, &mut next_id);
        normalize(&mut sections);
        let first_pass: Vec<String> = sections[0]
            .items()
            .unwrap()
            .items
            .iter()
            .map(|i| i.id.clone())
            .collect();
        assert!(first_pass.iter().all(|id| !id.is_empty()));
        assert_ne!(first_pass[0], first_pass[1]);

        normalize(&mut sections);
        let second_pass: Vec<String> = sections[0]
            .items()
            .unwrap()
            .items
            .iter()
            .map(|i| i.id.clone())
            .collect();
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_normalize_defaults_receipt_width() {
        let config: TemplateConfig = serde_json::from_value(json!({
            "sections": [{"type": "settings", "data": {"receiptWidth": null}}]
        }))
        .unwrap();
        let mut next_id = 1;
        let mut sections = instantiate(&config, &mut next_id);
        let width = normalize(&mut sections);
        assert_eq!(width, 320);
        assert_eq!(sections[0].settings().unwrap().receipt_width, Some(320));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut next_id = 1;
        let sections = vec![next_instance(
            &mut next_id,
            false,
            SectionData::default_for(SectionKind::Items),
        )];
        let snapshot = TemplateConfig::snapshot_of(&sections);
        let mut next_id2 = 10;
        let reloaded = instantiate(&snapshot, &mut next_id2);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].data, sections[0].data);
        assert_eq!(reloaded[0].collapsed, false);
    }
}
