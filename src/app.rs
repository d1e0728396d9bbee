//! # Application Root
//!
//! [`ReceiptApp`] wires the editor session, update pipeline, stores, and the
//! save/export workflows together. There is deliberately no global instance;
//! the host (CLI, HTTP facade, tests) constructs one app and drives it.
//!
//! Browser-era event handlers become explicit methods returning action enums:
//! the host decides how to surface a login modal, a restore banner, or a
//! pricing redirect.

use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::Value;

use crate::client::{ApiClient, WatermarkApi};
use crate::editor::{EditorSession, LoginPreview};
use crate::error::ReceiptError;
use crate::export::{self, ExportOutcome, Quality};
use crate::pipeline::UpdatePipeline;
use crate::restore::{
    self, resolve_startup, RestoreCandidate, StartupContext, StartupPlan,
};
use crate::store::{
    auto_save_key, template_slug, write_record, AutoSaveRecord, KeyValueStore, ManualSaveRecord,
    PendingTemplateSave, SaveIntent, MANUAL_SAVE_KEY, PENDING_SAVE_KEY,
};
use crate::template::TemplateConfig;

/// What the host should surface after startup.
#[derive(Debug)]
pub enum StartupAction {
    /// A restorable session was staged; show the banner.
    OfferRestore { saved_at: DateTime<Utc> },
    /// A pending save survived login; persist it via the API now and then
    /// navigate onward.
    CompletePendingSave(PendingTemplateSave),
    /// A pending save survived login but asked for manual confirmation; open
    /// the save dialog pre-filled.
    OpenSaveDialog { name: String, description: String },
    /// Post-login flow finished; land on the dashboard.
    RedirectToDashboard,
}

/// What the host should do with a save request.
#[derive(Debug)]
pub enum SaveAction {
    /// Validation failed; nothing staged or sent.
    Invalid(Vec<String>),
    /// Not signed in: pending save staged, show the login modal.
    OpenLoginModal(LoginPreview),
    /// Signed in: POST this payload to the templates endpoint.
    Persist {
        name: String,
        description: String,
        config: Value,
    },
}

/// Composition root owning the editor state and its side-effect plumbing.
pub struct ReceiptApp<D: KeyValueStore, S: KeyValueStore> {
    pub session: EditorSession,
    pipeline: UpdatePipeline,
    durable: D,
    session_store: S,
    ctx: StartupContext,
    template_name: String,
    restore_offer: Option<RestoreCandidate>,
    last_seen_revision: u64,
    export_busy: bool,
}

impl<D: KeyValueStore, S: KeyValueStore> ReceiptApp<D, S> {
    pub fn new(durable: D, session_store: S, ctx: StartupContext, now: Instant) -> Self {
        Self {
            session: EditorSession::new(),
            pipeline: UpdatePipeline::new(now),
            durable,
            session_store,
            ctx,
            template_name: String::new(),
            restore_offer: None,
            last_seen_revision: 0,
            export_busy: false,
        }
    }

    /// Resolve what to open with and load it. Runs once per app.
    pub fn init(&mut self, now_utc: DateTime<Utc>) -> Vec<StartupAction> {
        let mut actions = Vec::new();
        let resolution = resolve_startup(
            &mut self.durable,
            &mut self.session_store,
            &self.ctx,
            now_utc,
        );

        match resolution.plan {
            StartupPlan::PendingSave(pending) => {
                self.session.load_template(&pending.config);
                self.template_name = pending.name.clone();
                if pending.auto_save {
                    actions.push(StartupAction::CompletePendingSave(pending));
                } else {
                    actions.push(StartupAction::OpenSaveDialog {
                        name: pending.name,
                        description: pending.description,
                    });
                }
            }
            StartupPlan::RestoreBanner(candidate) => {
                // Staged data goes live immediately; the banner only decides
                // whether it stays.
                match &candidate {
                    RestoreCandidate::AutoSave(record) => {
                        self.template_name = record.template_name.clone();
                        self.session
                            .restore_sections(record.sections.clone(), record.next_instance_id);
                    }
                    RestoreCandidate::Manual(record) => {
                        self.template_name = record.name.clone();
                        self.session.load_template(&record.config);
                    }
                }
                actions.push(StartupAction::OfferRestore {
                    saved_at: candidate.saved_at(),
                });
                self.restore_offer = Some(candidate);
            }
            StartupPlan::Template(config) => {
                self.session.load_template(&config);
            }
            StartupPlan::Defaults => {
                self.session.load_defaults();
            }
        }

        if resolution.redirect_to_dashboard {
            actions.push(StartupAction::RedirectToDashboard);
        }
        self.last_seen_revision = self.session.revision();
        actions
    }

    /// Keep the restored session; the data is already live.
    pub fn confirm_restore(&mut self) {
        self.restore_offer = None;
    }

    /// Discard the restored session and every persisted record, then fall
    /// back to template or defaults.
    pub fn start_fresh(&mut self) {
        restore::start_fresh(
            &mut self.durable,
            &mut self.session_store,
            &self.ctx.page_path,
        );
        self.restore_offer = None;
        match &self.ctx.template {
            Some(template) => {
                let template = template.clone();
                self.session.load_template(&template);
            }
            None => self.session.load_defaults(),
        }
    }

    pub fn restore_pending(&self) -> bool {
        self.restore_offer.is_some()
    }

    /// Drive timers. Call from the host loop; any mutation made through
    /// `self.session` since the last tick is picked up here.
    pub fn tick(&mut self, now: Instant, now_utc: DateTime<Utc>) {
        if self.session.revision() != self.last_seen_revision {
            self.last_seen_revision = self.session.revision();
            self.pipeline.notify_change(now);
        }
        let out = self.pipeline.poll(now, self.session.sections());
        if out.save {
            self.write_auto_save(now_utc);
        }
    }

    /// Page-hide analog: everything pending is persisted synchronously.
    pub fn flush(&mut self, now_utc: DateTime<Utc>) {
        if self.session.revision() != self.last_seen_revision {
            self.last_seen_revision = self.session.revision();
            self.pipeline.notify_change(Instant::now());
        }
        let out = self.pipeline.flush(self.session.sections());
        if out.save {
            self.write_auto_save(now_utc);
        }
    }

    fn write_auto_save(&mut self, now_utc: DateTime<Utc>) {
        let record = AutoSaveRecord {
            sections: self.session.sections().to_vec(),
            next_instance_id: self.session.next_instance_id(),
            timestamp: now_utc,
            template_name: self.template_name.clone(),
            template_slug: template_slug(&self.ctx.page_path),
            source_url: self.ctx.page_path.clone(),
        };
        let key = auto_save_key(&self.ctx.page_path);
        if let Err(e) = write_record(&mut self.durable, &key, &record) {
            warn!("auto-save failed: {}", e);
        }
    }

    /// Render the current preview snapshot (or the live list when nothing has
    /// been snapshotted yet) to PNG bytes.
    pub fn render_preview(&self) -> Result<Vec<u8>, ReceiptError> {
        let snapshot = self.pipeline.snapshot();
        let sections = if snapshot.is_empty() {
            self.session.sections()
        } else {
            snapshot
        };
        crate::render::render_receipt(sections, self.session.current_receipt_width)
    }

    // ---- Save-template workflow ----------------------------------------------

    /// Request saving the receipt as a named template.
    pub fn save_template_request(
        &mut self,
        name: &str,
        description: &str,
        now_utc: DateTime<Utc>,
    ) -> SaveAction {
        let errors = self.session.validate();
        if !errors.is_empty() {
            return SaveAction::Invalid(errors);
        }

        let config = TemplateConfig::snapshot_of(self.session.sections());
        let config_json = serde_json::to_value(&config).unwrap_or(Value::Null);

        if !self.ctx.authenticated {
            self.stage_pending_save(
                SaveIntent::SaveTemplate,
                name,
                description,
                config,
                now_utc,
            );
            return SaveAction::OpenLoginModal(self.session.login_preview());
        }

        SaveAction::Persist {
            name: name.to_string(),
            description: description.to_string(),
            config: config_json,
        }
    }

    /// Stage a pending save for the next editor load. A staged
    /// remove-watermark intent is never downgraded to a plain template save.
    fn stage_pending_save(
        &mut self,
        intent: SaveIntent,
        name: &str,
        description: &str,
        config: TemplateConfig,
        now_utc: DateTime<Utc>,
    ) {
        if intent == SaveIntent::SaveTemplate {
            let existing =
                crate::store::read_record::<PendingTemplateSave>(&mut self.session_store, PENDING_SAVE_KEY);
            if existing.is_some_and(|p| p.intent == SaveIntent::RemoveWatermark) {
                info!("keeping staged remove-watermark save");
                return;
            }
        }
        let pending = PendingTemplateSave {
            intent,
            name: name.to_string(),
            description: description.to_string(),
            config,
            timestamp: now_utc.timestamp_millis(),
            next_url: self.ctx.page_path.clone(),
            auto_save: intent == SaveIntent::SaveTemplate,
        };
        if let Err(e) = write_record(&mut self.session_store, PENDING_SAVE_KEY, &pending) {
            warn!("failed to stage pending save: {}", e);
        }
    }

    /// Remove-watermark flow: back the receipt up locally, stash it on the
    /// server, and hand back the pricing hop.
    pub async fn remove_watermark_request(
        &mut self,
        api: &ApiClient,
        now_utc: DateTime<Utc>,
    ) -> Result<(), ReceiptError> {
        let config = TemplateConfig::snapshot_of(self.session.sections());
        let name = title_case(&self.session.business_name());
        let name = if name.is_empty() { "My Receipt".to_string() } else { name };

        let backup = ManualSaveRecord {
            config: config.clone(),
            timestamp: now_utc,
            name: name.clone(),
            template_slug: template_slug(&self.ctx.page_path),
        };
        write_record(&mut self.durable, MANUAL_SAVE_KEY, &backup)?;
        self.stage_pending_save(SaveIntent::RemoveWatermark, &name, "", config.clone(), now_utc);

        let config_json = serde_json::to_value(&config)?;
        api.store_pending_receipt(SaveIntent::RemoveWatermark, &name, "", &config_json)
            .await
    }

    // ---- Export --------------------------------------------------------------

    /// Export the receipt as an image. Re-entrant calls while busy are
    /// rejected; the busy flag resets on every path.
    pub fn export_image(
        &mut self,
        quality: Quality,
        subscribed: bool,
    ) -> Result<ExportOutcome, ReceiptError> {
        if self.export_busy {
            return Err(ReceiptError::Render("export already in progress".into()));
        }
        self.export_busy = true;
        let result = export::export_image(
            self.session.sections(),
            self.session.current_receipt_width,
            quality,
            subscribed,
        );
        self.export_busy = false;
        result
    }

    /// Export the receipt as a PDF through the server watermark endpoint.
    pub async fn export_pdf(
        &mut self,
        store_name: &str,
        subscribed: bool,
        api: &impl WatermarkApi,
    ) -> Result<ExportOutcome, ReceiptError> {
        if self.export_busy {
            return Err(ReceiptError::Render("export already in progress".into()));
        }
        self.export_busy = true;
        let result = export::export_pdf(
            self.session.sections(),
            self.session.current_receipt_width,
            store_name,
            &self.template_name,
            subscribed,
            api,
        )
        .await;
        self.export_busy = false;
        result
    }

    pub fn export_busy(&self) -> bool {
        self.export_busy
    }

    /// Tear the app down and hand the stores back to the host.
    pub fn into_stores(self) -> (D, S) {
        (self.durable, self.session_store)
    }
}

/// Title-case a business name for the generated template name.
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::store::MemoryStore;

    fn app() -> ReceiptApp<MemoryStore, MemoryStore> {
        let ctx = StartupContext {
            page_path: "/generate-walmart-receipt".into(),
            authenticated: false,
            ..Default::default()
        };
        ReceiptApp::new(MemoryStore::new(), MemoryStore::new(), ctx, Instant::now())
    }

    #[test]
    fn test_init_defaults() {
        let mut app = app();
        let actions = app.init(Utc::now());
        assert!(actions.is_empty());
        assert_eq!(app.session.sections().len(), 8);
    }

    #[test]
    fn test_tick_auto_saves_after_debounce() {
        let t0 = Instant::now();
        let mut app = app();
        app.init(Utc::now());

        let items_id = app.session.sections()[3].instance_id;
        app.session.add_item(items_id);
        app.tick(t0 + Duration::from_millis(1), Utc::now());
        // Debounce not elapsed yet.
        assert!(app.durable.get(&auto_save_key("/generate-walmart-receipt")).is_none());

        app.tick(t0 + Duration::from_millis(600), Utc::now());
        assert!(app.durable.get(&auto_save_key("/generate-walmart-receipt")).is_some());
    }

    #[test]
    fn test_restored_session_offered_and_kept() {
        let t0 = Instant::now();
        let mut first = app();
        first.init(Utc::now());
        let items_id = first.session.sections()[3].instance_id;
        first.session.add_item(items_id);
        first.tick(t0, Utc::now());
        first.flush(Utc::now());
        let durable = first.durable;

        let ctx = StartupContext {
            page_path: "/generate-walmart-receipt".into(),
            ..Default::default()
        };
        let mut second = ReceiptApp::new(durable, MemoryStore::new(), ctx, Instant::now());
        let actions = second.init(Utc::now());
        assert!(matches!(actions[..], [StartupAction::OfferRestore { .. }]));
        // Five items: the restored session includes the added one.
        let items = second.session.sections().iter().find_map(|s| s.items()).unwrap();
        assert_eq!(items.items.len(), 5);
        second.confirm_restore();
        assert!(!second.restore_pending());
    }

    #[test]
    fn test_start_fresh_reverts_to_defaults() {
        let mut app = app();
        app.init(Utc::now());
        let items_id = app.session.sections()[3].instance_id;
        app.session.add_item(items_id);
        app.flush(Utc::now());

        app.start_fresh();
        let items = app.session.sections().iter().find_map(|s| s.items()).unwrap();
        assert_eq!(items.items.len(), 4);
        assert!(app.durable.get(&auto_save_key("/generate-walmart-receipt")).is_none());
    }

    #[test]
    fn test_unauthenticated_save_stages_pending_and_opens_login() {
        let mut app = app();
        app.init(Utc::now());
        let action = app.save_template_request("My Store", "", Utc::now());
        assert!(matches!(action, SaveAction::OpenLoginModal(_)));
        assert!(app.session_store.get(PENDING_SAVE_KEY).is_some());
    }

    #[test]
    fn test_invalid_receipt_blocks_save() {
        let mut app = app();
        app.init(Utc::now());
        let items_id = app.session.sections()[3].instance_id;
        if let Some(section) = app.session.section_mut(items_id) {
            if let Some(items) = section.items_mut() {
                items.items[0].name.clear();
            }
        }
        let action = app.save_template_request("X", "", Utc::now());
        let SaveAction::Invalid(errors) = action else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 1);
        assert!(app.session_store.get(PENDING_SAVE_KEY).is_none());
    }

    #[test]
    fn test_remove_watermark_intent_not_downgraded() {
        let mut app = app();
        app.init(Utc::now());
        let config = TemplateConfig::snapshot_of(app.session.sections());
        app.stage_pending_save(SaveIntent::RemoveWatermark, "Store", "", config, Utc::now());

        app.save_template_request("Other Name", "", Utc::now());

        let staged: PendingTemplateSave =
            serde_json::from_str(&app.session_store.get(PENDING_SAVE_KEY).unwrap()).unwrap();
        assert_eq!(staged.intent, SaveIntent::RemoveWatermark);
        assert_eq!(staged.name, "Store");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("STORE EXPRESS"), "Store Express");
        assert_eq!(title_case("kwik-e-mart"), "Kwik-e-mart");
        assert_eq!(title_case(""), "");
    }
}
