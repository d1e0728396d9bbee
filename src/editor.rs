//! # Editor Session
//!
//! The single owner of the live section list. Every mutation goes through an
//! explicit method that bumps the session revision, which is what the update
//! pipeline observes — there is no implicit deep-diffing and no global
//! singleton; construct one session and hand it to whoever needs it.

use chrono::Local;
use log::debug;
use rand::Rng;

use crate::error::ReceiptError;
use crate::section::{
    CustomField, CurrencyPosition, LineItem, PaymentField, Scalar, SectionData, SectionInstance,
    SectionKind,
};
use crate::template::{self, TemplateConfig};
use crate::DEFAULT_RECEIPT_WIDTH;

/// Result of a section removal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Core sections (settings, items, payment) need the user to confirm.
    ConfirmationRequired,
    NotFound,
}

/// Receipt summary handed to the login modal when an unauthenticated user
/// tries to save.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LoginPreview {
    pub business_name: String,
    pub date_time: String,
    pub items: Vec<LineItem>,
    pub total: f64,
}

pub struct EditorSession {
    sections: Vec<SectionInstance>,
    next_instance_id: u64,
    revision: u64,
    /// Live copy of the settings width, for consumers that cannot observe
    /// nested field changes.
    pub current_receipt_width: u32,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            next_instance_id: 1,
            revision: 0,
            current_receipt_width: DEFAULT_RECEIPT_WIDTH,
        }
    }

    pub fn sections(&self) -> &[SectionInstance] {
        &self.sections
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn next_instance_id(&self) -> u64 {
        self.next_instance_id
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.sync_receipt_width();
    }

    /// Recompute the live width field from the settings section.
    pub fn sync_receipt_width(&mut self) {
        self.current_receipt_width = self
            .sections
            .iter()
            .find_map(|s| s.settings())
            .and_then(|s| s.receipt_width)
            .unwrap_or(DEFAULT_RECEIPT_WIDTH);
    }

    /// Mutable access for form bindings. Counts as a mutation.
    pub fn section_mut(&mut self, instance_id: u64) -> Option<&mut SectionInstance> {
        self.touch();
        self.sections
            .iter_mut()
            .find(|s| s.instance_id == instance_id)
    }

    pub fn section(&self, instance_id: u64) -> Option<&SectionInstance> {
        self.sections.iter().find(|s| s.instance_id == instance_id)
    }

    fn index_of(&self, instance_id: u64) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.instance_id == instance_id)
    }

    pub fn count_of(&self, kind: SectionKind) -> usize {
        self.sections.iter().filter(|s| s.kind() == kind).count()
    }

    pub fn can_add_section(&self, kind: SectionKind) -> bool {
        (self.count_of(kind) as u32) < kind.spec().max_instances
    }

    /// Clone the type's default payload into a fresh instance. The id counter
    /// is the only side effect.
    pub fn create_section(&mut self, kind: SectionKind, collapsed: bool) -> SectionInstance {
        let instance_id = self.next_instance_id;
        self.next_instance_id += 1;
        SectionInstance {
            instance_id,
            collapsed,
            data: SectionData::default_for(kind),
        }
    }

    /// Append a new expanded section, rejecting when the type is at capacity.
    pub fn add_section(&mut self, kind: SectionKind) -> Result<u64, ReceiptError> {
        let spec = kind.spec();
        if !self.can_add_section(kind) {
            return Err(ReceiptError::SectionLimit {
                name: spec.display_name,
                max: spec.max_instances,
            });
        }
        let section = self.create_section(kind, false);
        let id = section.instance_id;
        self.sections.push(section);
        self.touch();
        Ok(id)
    }

    /// Remove a section. Core types are only removed when `confirmed` is set;
    /// unknown ids are a no-op.
    pub fn remove_section(&mut self, instance_id: u64, confirmed: bool) -> RemoveOutcome {
        let Some(index) = self.index_of(instance_id) else {
            return RemoveOutcome::NotFound;
        };
        if self.sections[index].kind().is_core() && !confirmed {
            return RemoveOutcome::ConfirmationRequired;
        }
        self.sections.remove(index);
        self.touch();
        RemoveOutcome::Removed
    }

    pub fn toggle_section(&mut self, instance_id: u64) {
        if let Some(index) = self.index_of(instance_id) {
            self.sections[index].collapsed = !self.sections[index].collapsed;
            self.touch();
        }
    }

    pub fn move_section_up(&mut self, instance_id: u64) {
        if let Some(index) = self.index_of(instance_id) {
            if index > 0 {
                self.sections.swap(index, index - 1);
                self.touch();
            }
        }
    }

    pub fn move_section_down(&mut self, instance_id: u64) {
        if let Some(index) = self.index_of(instance_id) {
            if index + 1 < self.sections.len() {
                self.sections.swap(index, index + 1);
                self.touch();
            }
        }
    }

    /// Live reorder during a drag: pull the dragged section out and reinsert
    /// it at the target's position.
    pub fn reorder(&mut self, dragged_id: u64, target_id: u64) {
        if dragged_id == target_id {
            return;
        }
        let (Some(from), Some(to)) = (self.index_of(dragged_id), self.index_of(target_id)) else {
            return;
        };
        let section = self.sections.remove(from);
        self.sections.insert(to, section);
        self.touch();
    }

    // ---- Per-section helpers -------------------------------------------------

    pub fn add_item(&mut self, section_id: u64) {
        let touched = self
            .sections
            .iter_mut()
            .find(|s| s.instance_id == section_id)
            .and_then(|s| s.items_mut())
            .map(|items| {
                items.items.push(LineItem {
                    id: format!("item_{}", uuid::Uuid::new_v4().simple()),
                    quantity: Scalar::Number(1.0),
                    name: String::new(),
                    price: Scalar::Number(0.0),
                })
            })
            .is_some();
        if touched {
            self.touch();
        }
    }

    pub fn remove_item(&mut self, section_id: u64, index: usize) {
        let touched = self
            .sections
            .iter_mut()
            .find(|s| s.instance_id == section_id)
            .and_then(|s| s.items_mut())
            .map(|items| {
                if index < items.items.len() {
                    items.items.remove(index);
                }
            })
            .is_some();
        if touched {
            self.touch();
        }
    }

    pub fn add_custom_field(&mut self, section_id: u64, column: u8) {
        if let Some(SectionData::TwoColumn(data)) = self.data_mut(section_id) {
            data.custom_fields.push(CustomField {
                label: String::new(),
                value: String::new(),
                column,
            });
            self.touch();
        }
    }

    pub fn remove_custom_field(&mut self, section_id: u64, index: usize) {
        if let Some(SectionData::TwoColumn(data)) = self.data_mut(section_id) {
            if index < data.custom_fields.len() {
                data.custom_fields.remove(index);
                self.touch();
            }
        }
    }

    pub fn add_payment_field(&mut self, section_id: u64) {
        if let Some(SectionData::Payment(data)) = self.data_mut(section_id) {
            data.payment_fields.push(PaymentField::default());
            self.touch();
        }
    }

    pub fn remove_payment_field(&mut self, section_id: u64, index: usize) {
        if let Some(SectionData::Payment(data)) = self.data_mut(section_id) {
            if index < data.payment_fields.len() {
                data.payment_fields.remove(index);
                self.touch();
            }
        }
    }

    pub fn set_logo(&mut self, section_id: u64, logo_url: String) {
        if let Some(SectionData::Header(data)) = self.data_mut(section_id) {
            data.logo_url = logo_url;
            self.touch();
        }
    }

    /// Generate and store a fresh barcode value for the section.
    pub fn refresh_barcode(&mut self, section_id: u64, rng: &mut impl Rng) {
        let mut value = None;
        if let Some(SectionData::Barcode(data)) = self.data_mut(section_id) {
            value = Some(crate::barcode::generate_value(data.barcode_length, rng));
        }
        if let (Some(value), Some(SectionData::Barcode(data))) = (value, self.data_mut(section_id)) {
            data.barcode_value = value;
            self.touch();
        }
    }

    fn data_mut(&mut self, section_id: u64) -> Option<&mut SectionData> {
        self.sections
            .iter_mut()
            .find(|s| s.instance_id == section_id)
            .map(|s| &mut s.data)
    }

    // ---- Bulk loading --------------------------------------------------------

    /// Wholesale replacement of the section list from a template config.
    pub fn load_template(&mut self, config: &TemplateConfig) {
        self.sections = template::instantiate(config, &mut self.next_instance_id);
        let width = template::normalize(&mut self.sections);
        self.current_receipt_width = width;
        self.revision += 1;
        debug!("template loaded: {} sections", self.sections.len());
    }

    /// Wholesale restore from a persisted auto-save snapshot. The id counter
    /// resumes where the saved session left off.
    pub fn restore_sections(&mut self, sections: Vec<SectionInstance>, next_instance_id: u64) {
        self.sections = sections;
        self.next_instance_id = self
            .next_instance_id
            .max(next_instance_id)
            .max(self.sections.iter().map(|s| s.instance_id + 1).max().unwrap_or(1));
        let width = template::normalize(&mut self.sections);
        self.current_receipt_width = width;
        self.revision += 1;
        debug!("session restored: {} sections", self.sections.len());
    }

    /// Hardcoded example receipt for first-time users: one of each core type,
    /// pre-filled so the form never starts blank.
    pub fn load_defaults(&mut self) {
        let mut sections = Vec::new();

        let settings = self.create_section(SectionKind::Settings, true);
        sections.push(settings);

        let mut header = self.create_section(SectionKind::Header, true);
        if let SectionData::Header(data) = &mut header.data {
            data.logo_url = concat!(
                "data:image/svg+xml,<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"80\" ",
                "height=\"80\" viewBox=\"0 0 80 80\"><circle cx=\"40\" cy=\"40\" r=\"35\" ",
                "fill=\"%23000000\"/><text x=\"40\" y=\"50\" font-size=\"32\" ",
                "fill=\"%23ffffff\" text-anchor=\"middle\">SE</text></svg>"
            )
            .to_string();
            data.logo_size = 35;
            data.business_name = "STORE EXPRESS".into();
            data.line1 = "123 Main Street".into();
            data.line2 = "Springfield, IL 62701".into();
            data.line3 = "(555) 123-4567".into();
        }
        sections.push(header);

        let mut date_time = self.create_section(SectionKind::DateTime, true);
        if let SectionData::DateTime(data) = &mut date_time.data {
            data.date_time = Local::now().format("%m/%d/%Y %I:%M:%S %p").to_string();
            data.date_alignment = crate::section::Alignment::Center;
        }
        sections.push(date_time);

        let mut items = self.create_section(SectionKind::Items, false);
        if let SectionData::Items(data) = &mut items.data {
            data.items = vec![
                LineItem::new("item_1", 2.0, "Wireless Mouse", 24.99),
                LineItem::new("item_2", 1.0, "USB-C Cable (6ft)", 12.99),
                LineItem::new("item_3", 1.0, "Phone Screen Protector", 9.99),
                LineItem::new("item_4", 3.0, "AA Batteries (4-pack)", 8.99),
            ];
        }
        sections.push(items);

        let mut payment = self.create_section(SectionKind::Payment, true);
        if let SectionData::Payment(data) = &mut payment.data {
            data.tax_rate = Scalar::Number(8.5);
            data.show_tax_rate = true;
            data.payment_type = "card".into();
            data.payment_fields = vec![
                PaymentField::new("Card number", "**** **** **** 4922"),
                PaymentField::new("Card type", "Debit"),
                PaymentField::new("Card entry", "Chip"),
                PaymentField::new("Transaction #", "458721"),
                PaymentField::new("Cashier", "Sarah M."),
                PaymentField::new("Register", "03"),
                PaymentField::new("REWARDS MEMBER", "#SE892341"),
                PaymentField::new("Points earned", "45"),
                PaymentField::new("Total points", "1,245"),
            ];
        }
        sections.push(payment);

        let mut thanks = self.create_section(SectionKind::CustomMessage, true);
        if let SectionData::CustomMessage(data) = &mut thanks.data {
            data.custom_message = concat!(
                "Thank you for shopping with us!\n\n",
                "Returns accepted within 30 days with receipt.\n",
                "For assistance, call us at (555) 123-4567"
            )
            .into();
        }
        sections.push(thanks);

        let mut promo = self.create_section(SectionKind::CustomMessage, true);
        if let SectionData::CustomMessage(data) = &mut promo.data {
            data.custom_message = concat!(
                "Visit us online at StoreExpress.com for exclusive deals!\n\n",
                "Sign up for our rewards program and earn 1 point per dollar spent. ",
                "New members get 500 bonus points!\n\n",
                "Join our email list for 10% off your next purchase."
            )
            .into();
        }
        sections.push(promo);

        let mut barcode = self.create_section(SectionKind::Barcode, true);
        if let SectionData::Barcode(data) = &mut barcode.data {
            data.barcode_value = "458721".into();
        }
        sections.push(barcode);

        self.sections = sections;
        template::normalize(&mut self.sections);
        self.touch();
    }

    // ---- Derived totals (pure, recomputed on every read) ---------------------

    pub fn subtotal(&self) -> f64 {
        subtotal_of(&self.sections)
    }

    pub fn tax(&self) -> f64 {
        tax_of(&self.sections)
    }

    pub fn total(&self) -> f64 {
        total_of(&self.sections)
    }

    /// Format an amount with the settings section's currency symbol/position.
    pub fn format_currency(&self, amount: f64) -> String {
        currency_format(&self.sections, amount)
    }

    /// Divider line sized to fill the receipt width at the preview font pitch.
    pub fn divider_line(&self, style: &str) -> String {
        divider_line(self.current_receipt_width, style)
    }

    // ---- Validation ----------------------------------------------------------

    /// Collect validation errors that block save-as-template. Never partial:
    /// either the list is empty or the save is rejected wholesale.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for section in &self.sections {
            if let Some(items) = section.items() {
                for (idx, item) in items.items.iter().enumerate() {
                    if item.name.trim().is_empty() {
                        errors.push(format!("Item {}: Name is required", idx + 1));
                    }
                    match item.price.checked() {
                        Some(price) if price >= 0.0 => {}
                        _ => errors.push(format!("Item {}: Price must be a valid number", idx + 1)),
                    }
                    match item.quantity.checked() {
                        Some(qty) if qty >= 1.0 => {}
                        _ => errors.push(format!("Item {}: Quantity must be at least 1", idx + 1)),
                    }
                }
            }
            if let SectionData::TwoColumn(data) = &section.data {
                for field in &data.custom_fields {
                    if !field.label.is_empty() && field.value.is_empty() {
                        errors.push(format!(
                            "Two-column field \"{}\": Value is required",
                            field.label
                        ));
                    }
                }
            }
        }
        errors
    }

    /// Receipt summary for the login modal.
    pub fn login_preview(&self) -> LoginPreview {
        let business_name = self
            .sections
            .iter()
            .find_map(|s| match &s.data {
                SectionData::Header(h) => Some(h.business_name.clone()),
                _ => None,
            })
            .unwrap_or_else(|| "Your Business".into());
        let date_time = self
            .sections
            .iter()
            .find_map(|s| match &s.data {
                SectionData::DateTime(d) if !d.date_time.is_empty() => Some(d.date_time.clone()),
                _ => None,
            })
            .unwrap_or_else(|| Local::now().format("%m/%d/%Y %I:%M:%S %p").to_string());
        let items = self
            .sections
            .iter()
            .find_map(|s| s.items())
            .map(|i| i.items.clone())
            .unwrap_or_default();
        LoginPreview {
            business_name,
            date_time,
            items,
            total: self.subtotal(),
        }
    }

    pub fn business_name(&self) -> String {
        self.sections
            .iter()
            .find_map(|s| match &s.data {
                SectionData::Header(h) => Some(h.business_name.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

// Totals and formatting work on any section slice, not just the live session:
// the renderer reads them off the pipeline's snapshot.

/// Sum of price x quantity over every items section. Malformed fields count
/// as zero.
pub fn subtotal_of(sections: &[SectionInstance]) -> f64 {
    sections
        .iter()
        .filter_map(|s| s.items())
        .flat_map(|items| items.items.iter())
        .map(LineItem::line_total)
        .sum()
}

/// Tax applies only when the payment section shows it and the rate is
/// positive.
pub fn tax_of(sections: &[SectionInstance]) -> f64 {
    let Some(payment) = sections.iter().find_map(|s| s.payment()) else {
        return 0.0;
    };
    let rate = payment.tax_rate.as_f64();
    if payment.show_tax_rate && rate > 0.0 {
        subtotal_of(sections) * (rate / 100.0)
    } else {
        0.0
    }
}

pub fn total_of(sections: &[SectionInstance]) -> f64 {
    subtotal_of(sections) + tax_of(sections)
}

/// Format an amount with the settings section's currency symbol/position.
pub fn currency_format(sections: &[SectionInstance], amount: f64) -> String {
    let (symbol, position) = sections
        .iter()
        .find_map(|s| s.settings())
        .map(|s| (s.currency_symbol.clone(), s.currency_position))
        .unwrap_or(("$".into(), CurrencyPosition::Before));
    let formatted = format!("{:.2}", amount);
    if symbol.trim().is_empty() {
        return formatted;
    }
    match position {
        CurrencyPosition::Before => format!("{}{}", symbol, formatted),
        CurrencyPosition::After => format!("{}{}", formatted, symbol),
        CurrencyPosition::AfterSpace => format!("{} {}", formatted, symbol),
    }
}

/// Divider line sized to fill a receipt width at the preview font pitch.
pub fn divider_line(receipt_width: u32, style: &str) -> String {
    let content_width = receipt_width.saturating_sub(64).max(90);
    let count = ((content_width as usize).div_ceil(6) + 2).max(15);
    let ch = match style {
        "===" => '=',
        "..." => '.',
        ":::" => ':',
        "***" => '*',
        _ => '-',
    };
    std::iter::repeat(ch).take(count).collect()
}

impl Scalar {
    /// Validation-grade read: `None` means not-a-number (empty counts as 0,
    /// matching the original form semantics).
    pub fn checked(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            Scalar::Number(_) => None,
            Scalar::Text(s) if s.trim().is_empty() => Some(0.0),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            Scalar::Missing(()) => Some(0.0),
        }
    }
}
