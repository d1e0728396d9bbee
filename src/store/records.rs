//! Persisted record shapes and their expiry rules.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::section::SectionInstance;
use crate::template::TemplateConfig;

/// Fixed key for the single manual-save slot.
pub const MANUAL_SAVE_KEY: &str = "savedReceipt";
/// Fixed key for the single cross-navigation pending-save slot.
pub const PENDING_SAVE_KEY: &str = "pending_template_save";

/// Durable records older than this are expired and removed on sight.
pub fn auto_save_max_age() -> Duration {
    Duration::days(7)
}

/// Pending saves are only honored for a short hop across navigation.
pub fn pending_save_max_age() -> Duration {
    Duration::minutes(10)
}

/// Background snapshot of the live section list, keyed per page template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoSaveRecord {
    pub sections: Vec<SectionInstance>,
    pub next_instance_id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub template_slug: String,
    #[serde(default)]
    pub source_url: String,
}

impl AutoSaveRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) > auto_save_max_age()
    }
}

/// Snapshot written by the remove-watermark flow; one global slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSaveRecord {
    pub config: TemplateConfig,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub template_slug: String,
}

impl ManualSaveRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) > auto_save_max_age()
    }
}

/// Why a pending save was staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveIntent {
    SaveTemplate,
    RemoveWatermark,
}

/// Cross-navigation save intent, staged before a login or checkout hop and
/// consumed exactly once on the next editor load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTemplateSave {
    pub intent: SaveIntent,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub config: TemplateConfig,
    /// Epoch milliseconds at staging time.
    pub timestamp: i64,
    #[serde(default)]
    pub next_url: String,
    #[serde(default)]
    pub auto_save: bool,
}

impl PendingTemplateSave {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp;
        age_ms > pending_save_max_age().num_milliseconds()
    }

    /// A record is only honored when it actually carries sections and a name.
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && self.config.sections.as_ref().is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{SectionData, SectionKind};
    use crate::template::SectionEntry;

    fn sample_config() -> TemplateConfig {
        TemplateConfig {
            sections: Some(vec![SectionEntry {
                kind: "items".into(),
                data: serde_json::json!({}),
                collapsed: false,
            }]),
            ..TemplateConfig::default()
        }
    }

    #[test]
    fn test_auto_save_expiry() {
        let now = Utc::now();
        let record = AutoSaveRecord {
            sections: vec![SectionInstance {
                instance_id: 1,
                collapsed: false,
                data: SectionData::default_for(SectionKind::Items),
            }],
            next_instance_id: 2,
            timestamp: now - Duration::days(8),
            template_name: String::new(),
            template_slug: "walmart".into(),
            source_url: "/generate-walmart-receipt".into(),
        };
        assert!(record.is_expired(now));

        let fresh = AutoSaveRecord {
            timestamp: now - Duration::days(6),
            ..record
        };
        assert!(!fresh.is_expired(now));
    }

    #[test]
    fn test_pending_save_ttl() {
        let now = Utc::now();
        let pending = PendingTemplateSave {
            intent: SaveIntent::SaveTemplate,
            name: "Template 1".into(),
            description: String::new(),
            config: sample_config(),
            timestamp: now.timestamp_millis() - 11 * 60 * 1000,
            next_url: String::new(),
            auto_save: true,
        };
        assert!(pending.is_expired(now));
        let fresh = PendingTemplateSave {
            timestamp: now.timestamp_millis() - 9 * 60 * 1000,
            ..pending
        };
        assert!(!fresh.is_expired(now));
    }

    #[test]
    fn test_pending_save_well_formed() {
        let now = Utc::now();
        let pending = PendingTemplateSave {
            intent: SaveIntent::RemoveWatermark,
            name: String::new(),
            description: String::new(),
            config: sample_config(),
            timestamp: now.timestamp_millis(),
            next_url: String::new(),
            auto_save: false,
        };
        assert!(!pending.is_well_formed());
        let named = PendingTemplateSave {
            name: "Walmart".into(),
            ..pending
        };
        assert!(named.is_well_formed());
    }

    #[test]
    fn test_intent_wire_names() {
        assert_eq!(
            serde_json::to_string(&SaveIntent::RemoveWatermark).unwrap(),
            "\"remove_watermark\""
        );
    }
}
