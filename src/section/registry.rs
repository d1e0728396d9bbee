//! Section registry: the closed set of section types and their display metadata.
//!
//! Pure data — cardinality limits, icons, and divider defaults. Behavior lives
//! on [`crate::editor::EditorSession`].

use serde::{Deserialize, Serialize};

/// The closed set of section types a receipt can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    Settings,
    Header,
    DateTime,
    TwoColumn,
    Items,
    Payment,
    CustomMessage,
    Barcode,
}

/// Registry metadata for one section type. Immutable at runtime.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub display_name: &'static str,
    pub icon: &'static str,
    pub max_instances: u32,
    pub has_divider: bool,
}

impl SectionSpec {
    /// A type is repeatable exactly when its cap is above one.
    pub fn allow_multiple(&self) -> bool {
        self.max_instances > 1
    }
}

impl SectionKind {
    /// All section types, in add-menu order.
    pub const ALL: [SectionKind; 8] = [
        SectionKind::Settings,
        SectionKind::Header,
        SectionKind::DateTime,
        SectionKind::TwoColumn,
        SectionKind::Items,
        SectionKind::Payment,
        SectionKind::CustomMessage,
        SectionKind::Barcode,
    ];

    /// Registry lookup. Total for the closed enum, so it cannot fail.
    pub fn spec(self) -> SectionSpec {
        match self {
            SectionKind::Settings => SectionSpec {
                display_name: "Settings",
                icon: "settings",
                max_instances: 1,
                has_divider: false,
            },
            SectionKind::Header => SectionSpec {
                display_name: "Header",
                icon: "header",
                max_instances: 1,
                has_divider: true,
            },
            SectionKind::DateTime => SectionSpec {
                display_name: "Date & Time",
                icon: "calendar",
                max_instances: 1,
                has_divider: true,
            },
            SectionKind::TwoColumn => SectionSpec {
                display_name: "Two column information",
                icon: "columns",
                max_instances: 10,
                has_divider: true,
            },
            SectionKind::Items => SectionSpec {
                display_name: "Items list",
                icon: "cart",
                max_instances: 1,
                has_divider: true,
            },
            SectionKind::Payment => SectionSpec {
                display_name: "Payment",
                icon: "payment",
                max_instances: 1,
                has_divider: true,
            },
            SectionKind::CustomMessage => SectionSpec {
                display_name: "Custom message",
                icon: "message",
                max_instances: 10,
                has_divider: true,
            },
            SectionKind::Barcode => SectionSpec {
                display_name: "Barcode",
                icon: "barcode",
                max_instances: 1,
                has_divider: false,
            },
        }
    }

    /// Removing these requires interactive confirmation.
    pub fn is_core(self) -> bool {
        matches!(
            self,
            SectionKind::Settings | SectionKind::Items | SectionKind::Payment
        )
    }

    /// Parse the wire name used in template configs ("dateTime", "twoColumn", ...).
    pub fn from_wire(name: &str) -> Option<SectionKind> {
        match name {
            "settings" => Some(SectionKind::Settings),
            "header" => Some(SectionKind::Header),
            "dateTime" => Some(SectionKind::DateTime),
            "twoColumn" => Some(SectionKind::TwoColumn),
            "items" => Some(SectionKind::Items),
            "payment" => Some(SectionKind::Payment),
            "customMessage" => Some(SectionKind::CustomMessage),
            "barcode" => Some(SectionKind::Barcode),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_multiple_matches_cap() {
        for kind in SectionKind::ALL {
            let spec = kind.spec();
            assert_eq!(
                spec.allow_multiple(),
                spec.max_instances > 1,
                "{:?} violates allow_multiple == (max_instances > 1)",
                kind
            );
        }
    }

    #[test]
    fn test_repeatable_kinds() {
        assert!(SectionKind::TwoColumn.spec().allow_multiple());
        assert!(SectionKind::CustomMessage.spec().allow_multiple());
        assert!(!SectionKind::Items.spec().allow_multiple());
    }

    #[test]
    fn test_wire_names_round_trip() {
        for kind in SectionKind::ALL {
            let wire = serde_json::to_value(kind).unwrap();
            let name = wire.as_str().unwrap();
            assert_eq!(SectionKind::from_wire(name), Some(kind));
        }
    }

    #[test]
    fn test_unknown_wire_name() {
        assert_eq!(SectionKind::from_wire("footer"), None);
    }
}
