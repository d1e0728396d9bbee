//! # Section Model
//!
//! Sections are the configurable, repeatable blocks a receipt is assembled
//! from. The registry ([`SectionKind`], [`SectionSpec`]) declares the closed
//! set of types; [`SectionInstance`] is the runtime object the editor owns.

mod data;
mod registry;

pub use data::*;
pub use registry::{SectionKind, SectionSpec};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One live section in the editor.
///
/// `instance_id` is unique within a session and monotonically increasing.
/// `data` is cloned from the type's default and mutated in place by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInstance {
    pub instance_id: u64,
    pub collapsed: bool,
    #[serde(flatten)]
    pub data: SectionData,
}

impl SectionInstance {
    pub fn kind(&self) -> SectionKind {
        self.data.kind()
    }

    pub fn settings(&self) -> Option<&SettingsData> {
        match &self.data {
            SectionData::Settings(d) => Some(d),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&ItemsData> {
        match &self.data {
            SectionData::Items(d) => Some(d),
            _ => None,
        }
    }

    pub fn items_mut(&mut self) -> Option<&mut ItemsData> {
        match &mut self.data {
            SectionData::Items(d) => Some(d),
            _ => None,
        }
    }

    pub fn payment(&self) -> Option<&PaymentData> {
        match &self.data {
            SectionData::Payment(d) => Some(d),
            _ => None,
        }
    }

    pub fn barcode_mut(&mut self) -> Option<&mut BarcodeData> {
        match &mut self.data {
            SectionData::Barcode(d) => Some(d),
            _ => None,
        }
    }
}

/// Build a payload for `kind` by overlaying a partial config object onto the
/// type's default.
///
/// Template configs and old auto-saves carry partial records; keys they omit
/// keep the default value, keys the current schema does not know are ignored.
/// A structurally broken overlay falls back to the plain default rather than
/// failing the whole load.
pub fn data_with_overlay(kind: SectionKind, overlay: &Value) -> SectionData {
    let default = SectionData::default_for(kind);
    let Value::Object(patch) = overlay else {
        if !overlay.is_null() {
            warn!("ignoring non-object overlay for {:?} section", kind);
        }
        return default;
    };

    // Round-trip through JSON so every field stays individually defaultable.
    let mut base = match serde_json::to_value(&default) {
        Ok(Value::Object(tagged)) => tagged
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        _ => return default,
    };
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }

    let tagged = serde_json::json!({
        "type": serde_json::to_value(kind).unwrap_or(Value::Null),
        "data": Value::Object(base),
    });
    match serde_json::from_value::<SectionData>(tagged) {
        Ok(data) => data,
        Err(e) => {
            warn!("overlay for {:?} section did not parse ({}), using defaults", kind, e);
            default
        }
    }
}
