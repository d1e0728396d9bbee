//! # Startup Restore Resolution
//!
//! One-shot decision, on session start, of what the editor opens with. The
//! precedence is strict and each rung is only consulted when every rung above
//! it declined:
//!
//! 1. a valid cross-navigation pending save, read only when signed in and
//!    consumed on that read;
//! 2. an unexpired auto-save or manual save whose template slug matches the
//!    current page, surfaced as a restore banner;
//! 3. an explicit host-supplied template config;
//! 4. the hardcoded example receipt.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::store::{
    auto_save_key, read_record, template_slug, AutoSaveRecord, KeyValueStore, ManualSaveRecord,
    PendingTemplateSave, MANUAL_SAVE_KEY, PENDING_SAVE_KEY,
};
use crate::template::TemplateConfig;

/// Host-provided facts the resolver needs.
#[derive(Debug, Default, Clone)]
pub struct StartupContext {
    /// Page path, e.g. `/generate-walmart-receipt`.
    pub page_path: String,
    /// Whether the current user is signed in.
    pub authenticated: bool,
    /// `load_template` query parameter: an explicit template load suppresses
    /// the restore banner.
    pub load_template_param: bool,
    /// `redirect_to_dashboard=1` query parameter (post-login hop).
    pub redirect_to_dashboard: bool,
    /// Page-level success flag set by the host after a completed save.
    pub save_succeeded: bool,
    /// Template config supplied by the host page, if any.
    pub template: Option<TemplateConfig>,
}

/// A staged restore offer: the data is already loaded into the live session,
/// the banner only decides whether it stays.
#[derive(Debug, Clone)]
pub enum RestoreCandidate {
    AutoSave(AutoSaveRecord),
    Manual(ManualSaveRecord),
}

impl RestoreCandidate {
    pub fn saved_at(&self) -> DateTime<Utc> {
        match self {
            RestoreCandidate::AutoSave(r) => r.timestamp,
            RestoreCandidate::Manual(r) => r.timestamp,
        }
    }
}

/// What the editor opens with.
#[derive(Debug, Clone)]
pub enum StartupPlan {
    /// A pending save survived the navigation hop; finish the save flow.
    PendingSave(PendingTemplateSave),
    /// Offer restoring a previous session.
    RestoreBanner(RestoreCandidate),
    /// Load the host-supplied template.
    Template(TemplateConfig),
    /// Nothing applicable: example receipt.
    Defaults,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub plan: StartupPlan,
    /// Post-login flow: the host asked to land on the dashboard after a
    /// successful save.
    pub redirect_to_dashboard: bool,
}

/// Resolve what to open with. Mutates the stores: the pending-save slot is
/// consumed unconditionally, and expired records are deleted on sight.
pub fn resolve_startup(
    durable: &mut dyn KeyValueStore,
    session: &mut dyn KeyValueStore,
    ctx: &StartupContext,
    now: DateTime<Utc>,
) -> Resolution {
    let redirect = ctx.redirect_to_dashboard && ctx.save_succeeded;

    // Rung 1: pending save. Only a signed-in load reads the slot, so a
    // receipt staged before the login hop is still there afterwards. Once
    // read, the slot is removed before validation so a malformed or stale
    // record can never be replayed.
    if ctx.authenticated {
        let pending = read_record::<PendingTemplateSave>(session, PENDING_SAVE_KEY);
        session.remove(PENDING_SAVE_KEY);
        if let Some(pending) = pending {
            if !pending.is_expired(now) && pending.is_well_formed() {
                info!("resuming pending {:?} save \"{}\"", pending.intent, pending.name);
                return Resolution {
                    plan: StartupPlan::PendingSave(pending),
                    redirect_to_dashboard: redirect,
                };
            }
            debug!("discarding inapplicable pending save");
        }
    }

    // Rung 2: restore banner, unless an explicit template load was requested.
    if !ctx.load_template_param {
        if let Some(candidate) = restore_candidate(durable, &ctx.page_path, now) {
            return Resolution {
                plan: StartupPlan::RestoreBanner(candidate),
                redirect_to_dashboard: redirect,
            };
        }
    }

    // Rung 3: host template.
    if let Some(template) = &ctx.template {
        return Resolution {
            plan: StartupPlan::Template(template.clone()),
            redirect_to_dashboard: redirect,
        };
    }

    Resolution {
        plan: StartupPlan::Defaults,
        redirect_to_dashboard: redirect,
    }
}

/// Find a restorable record for this page: auto-save first, manual save as
/// fallback. Expired records are deleted. A live auto-save that does not
/// match this page's slug ends the search: it is left untouched, and the
/// manual slot is not consulted, so another template's backup never surfaces
/// here.
fn restore_candidate(
    durable: &mut dyn KeyValueStore,
    page_path: &str,
    now: DateTime<Utc>,
) -> Option<RestoreCandidate> {
    let slug = template_slug(page_path);
    let auto_key = auto_save_key(page_path);

    if let Some(record) = read_record::<AutoSaveRecord>(durable, &auto_key) {
        if record.is_expired(now) {
            debug!("auto-save for {} expired, removing", page_path);
            durable.remove(&auto_key);
        } else if record.template_slug == slug && !record.sections.is_empty() {
            return Some(RestoreCandidate::AutoSave(record));
        } else {
            return None;
        }
    }

    if let Some(record) = read_record::<ManualSaveRecord>(durable, MANUAL_SAVE_KEY) {
        if record.is_expired(now) {
            debug!("manual save expired, removing");
            durable.remove(MANUAL_SAVE_KEY);
        } else if record.template_slug == slug {
            return Some(RestoreCandidate::Manual(record));
        }
    }

    None
}

/// "Start fresh" from the restore banner: drop every persisted record for a
/// clean slate. The caller then falls through to template/defaults.
pub fn start_fresh(
    durable: &mut dyn KeyValueStore,
    session: &mut dyn KeyValueStore,
    page_path: &str,
) {
    durable.remove(&auto_save_key(page_path));
    durable.remove(MANUAL_SAVE_KEY);
    session.remove(PENDING_SAVE_KEY);
    info!("cleared saved receipts for {}", page_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::section::{SectionData, SectionInstance, SectionKind};
    use crate::store::{write_record, MemoryStore, SaveIntent};
    use crate::template::SectionEntry;

    const PATH: &str = "/generate-walmart-receipt";

    fn ctx() -> StartupContext {
        StartupContext {
            page_path: PATH.into(),
            authenticated: true,
            ..Default::default()
        }
    }

    fn auto_save(slug: &str, age: Duration) -> AutoSaveRecord {
        AutoSaveRecord {
            sections: vec![SectionInstance {
                instance_id: 1,
                collapsed: false,
                data: SectionData::default_for(SectionKind::Items),
            }],
            next_instance_id: 2,
            timestamp: Utc::now() - age,
            template_name: String::new(),
            template_slug: slug.into(),
            source_url: PATH.into(),
        }
    }

    fn pending(name: &str) -> PendingTemplateSave {
        PendingTemplateSave {
            intent: SaveIntent::SaveTemplate,
            name: name.into(),
            description: String::new(),
            config: TemplateConfig {
                sections: Some(vec![SectionEntry {
                    kind: "items".into(),
                    data: serde_json::json!({}),
                    collapsed: false,
                }]),
                ..TemplateConfig::default()
            },
            timestamp: Utc::now().timestamp_millis(),
            next_url: String::new(),
            auto_save: true,
        }
    }

    #[test]
    fn test_fresh_session_defaults() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(res.plan, StartupPlan::Defaults));
        assert!(!res.redirect_to_dashboard);
    }

    #[test]
    fn test_pending_save_wins_over_everything() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("walmart", Duration::hours(1)))
            .unwrap();
        write_record(&mut session, PENDING_SAVE_KEY, &pending("Walmart")).unwrap();

        let mut context = ctx();
        context.template = Some(TemplateConfig::default());

        let res = resolve_startup(&mut durable, &mut session, &context, Utc::now());
        assert!(matches!(res.plan, StartupPlan::PendingSave(_)));
    }

    #[test]
    fn test_pending_save_consumed_once() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut session, PENDING_SAVE_KEY, &pending("Walmart")).unwrap();

        let first = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(first.plan, StartupPlan::PendingSave(_)));

        let second = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(second.plan, StartupPlan::Defaults));
    }

    #[test]
    fn test_pending_save_consumed_even_when_corrupt() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        session.set(PENDING_SAVE_KEY, "{broken").unwrap();

        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(res.plan, StartupPlan::Defaults));
        assert!(session.get(PENDING_SAVE_KEY).is_none());
    }

    #[test]
    fn test_pending_save_survives_unauthenticated_load() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut session, PENDING_SAVE_KEY, &pending("Walmart")).unwrap();

        let mut context = ctx();
        context.authenticated = false;

        // Not signed in yet: the staged receipt waits out the login hop.
        let res = resolve_startup(&mut durable, &mut session, &context, Utc::now());
        assert!(matches!(res.plan, StartupPlan::Defaults));
        assert!(session.get(PENDING_SAVE_KEY).is_some());

        // Back from login: honored and consumed.
        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(res.plan, StartupPlan::PendingSave(_)));
        assert!(session.get(PENDING_SAVE_KEY).is_none());
    }

    #[test]
    fn test_matching_auto_save_offers_banner() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("walmart", Duration::hours(2)))
            .unwrap();

        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(
            res.plan,
            StartupPlan::RestoreBanner(RestoreCandidate::AutoSave(_))
        ));
    }

    #[test]
    fn test_slug_mismatch_never_offered() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("target", Duration::hours(1)))
            .unwrap();

        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(res.plan, StartupPlan::Defaults));
        // Mismatched record is left alone: it belongs to another page.
        assert!(durable.get(&auto_save_key(PATH)).is_some());
    }

    #[test]
    fn test_expired_auto_save_removed() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("walmart", Duration::days(8)))
            .unwrap();

        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(res.plan, StartupPlan::Defaults));
        assert!(durable.get(&auto_save_key(PATH)).is_none());
    }

    #[test]
    fn test_load_template_param_suppresses_banner() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("walmart", Duration::hours(1)))
            .unwrap();

        let mut context = ctx();
        context.load_template_param = true;
        context.template = Some(TemplateConfig::default());

        let res = resolve_startup(&mut durable, &mut session, &context, Utc::now());
        assert!(matches!(res.plan, StartupPlan::Template(_)));
    }

    #[test]
    fn test_mismatched_auto_save_hides_manual_slot() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("target", Duration::hours(1)))
            .unwrap();
        let manual = ManualSaveRecord {
            config: TemplateConfig::default(),
            timestamp: Utc::now() - Duration::hours(1),
            name: "Backup".into(),
            template_slug: "walmart".into(),
        };
        write_record(&mut durable, MANUAL_SAVE_KEY, &manual).unwrap();

        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(res.plan, StartupPlan::Defaults));
        // Both records stay put.
        assert!(durable.get(&auto_save_key(PATH)).is_some());
        assert!(durable.get(MANUAL_SAVE_KEY).is_some());
    }

    #[test]
    fn test_manual_save_is_fallback_candidate() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        let manual = ManualSaveRecord {
            config: TemplateConfig::default(),
            timestamp: Utc::now() - Duration::hours(3),
            name: "Backup".into(),
            template_slug: "walmart".into(),
        };
        write_record(&mut durable, MANUAL_SAVE_KEY, &manual).unwrap();

        let res = resolve_startup(&mut durable, &mut session, &ctx(), Utc::now());
        assert!(matches!(
            res.plan,
            StartupPlan::RestoreBanner(RestoreCandidate::Manual(_))
        ));
    }

    #[test]
    fn test_dashboard_redirect_needs_both_flags() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        let mut context = ctx();
        context.redirect_to_dashboard = true;

        let res = resolve_startup(&mut durable, &mut session, &context, Utc::now());
        assert!(!res.redirect_to_dashboard);

        context.save_succeeded = true;
        let res = resolve_startup(&mut durable, &mut session, &context, Utc::now());
        assert!(res.redirect_to_dashboard);
    }

    #[test]
    fn test_start_fresh_clears_everything() {
        let mut durable = MemoryStore::new();
        let mut session = MemoryStore::new();
        write_record(&mut durable, &auto_save_key(PATH), &auto_save("walmart", Duration::hours(1)))
            .unwrap();
        write_record(&mut session, PENDING_SAVE_KEY, &pending("W")).unwrap();

        start_fresh(&mut durable, &mut session, PATH);
        assert!(durable.get(&auto_save_key(PATH)).is_none());
        assert!(session.get(PENDING_SAVE_KEY).is_none());
    }
}
