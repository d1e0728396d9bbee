//! # Update Pipeline
//!
//! Debounced reactions to editor mutations. The original design leaned on
//! framework reactivity and wall-clock timers; here every timer is an explicit
//! state machine and time is injected, so the whole pipeline is deterministic
//! under test.
//!
//! Three timers:
//! - preview debounce (300 ms): clone the live sections into the preview
//!   snapshot;
//! - save debounce (500 ms): persist an auto-save record;
//! - backstop interval (10 s): unconditional save even while the user keeps
//!   typing.
//!
//! Drive with [`UpdatePipeline::notify_change`] on every mutation and
//! [`UpdatePipeline::poll`] from the host loop; call
//! [`UpdatePipeline::flush`] on shutdown or page-hide.

use std::time::{Duration, Instant};

use crate::section::SectionInstance;

pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(300);
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);
pub const BACKSTOP_INTERVAL: Duration = Duration::from_secs(10);

/// A restartable one-shot timer. Re-triggering while pending replaces the
/// deadline; only the last trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounce {
    Idle,
    Pending { deadline: Instant },
}

impl Debounce {
    pub fn new() -> Self {
        Debounce::Idle
    }

    pub fn trigger(&mut self, now: Instant, delay: Duration) {
        *self = Debounce::Pending {
            deadline: now + delay,
        };
    }

    /// True exactly once when the deadline passes; resets to idle.
    pub fn poll(&mut self, now: Instant) -> bool {
        match *self {
            Debounce::Pending { deadline } if now >= deadline => {
                *self = Debounce::Idle;
                true
            }
            _ => false,
        }
    }

    /// Fire immediately if pending; resets to idle.
    pub fn force_flush(&mut self) -> bool {
        let was_pending = matches!(self, Debounce::Pending { .. });
        *self = Debounce::Idle;
        was_pending
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Debounce::Pending { .. })
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new()
    }
}

/// What the host should do after a poll.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub refresh_preview: bool,
    pub save: bool,
}

/// Debounce coordinator between the editor session and its consumers.
///
/// The preview snapshot is a deep copy of the section list, taken at fire
/// time. In between fires the snapshot is stale but stable, so a renderer can
/// read it without observing half-applied edits.
pub struct UpdatePipeline {
    preview: Debounce,
    save: Debounce,
    next_backstop: Instant,
    snapshot: Vec<SectionInstance>,
    snapshot_stale: bool,
}

impl UpdatePipeline {
    pub fn new(now: Instant) -> Self {
        Self {
            preview: Debounce::new(),
            save: Debounce::new(),
            next_backstop: now + BACKSTOP_INTERVAL,
            snapshot: Vec::new(),
            snapshot_stale: false,
        }
    }

    /// Record that the section list changed. Restarts both debounce windows.
    pub fn notify_change(&mut self, now: Instant) {
        self.preview.trigger(now, PREVIEW_DEBOUNCE);
        self.save.trigger(now, SAVE_DEBOUNCE);
        self.snapshot_stale = true;
    }

    /// Advance timers. `sections` is read only when a preview fire actually
    /// happens, so the snapshot always reflects fire-time state.
    pub fn poll(&mut self, now: Instant, sections: &[SectionInstance]) -> PipelineOutput {
        let mut out = PipelineOutput::default();

        if self.preview.poll(now) {
            self.snapshot = sections.to_vec();
            self.snapshot_stale = false;
            out.refresh_preview = true;
        }

        if self.save.poll(now) {
            out.save = true;
        }

        if now >= self.next_backstop {
            self.next_backstop = now + BACKSTOP_INTERVAL;
            out.save = true;
        }

        out
    }

    /// Synchronous flush: pending work fires now regardless of deadlines.
    /// A flushed save always observes the effects of every prior mutation.
    pub fn flush(&mut self, sections: &[SectionInstance]) -> PipelineOutput {
        let mut out = PipelineOutput::default();
        if self.preview.force_flush() || self.snapshot_stale {
            self.snapshot = sections.to_vec();
            self.snapshot_stale = false;
            out.refresh_preview = true;
        }
        if self.save.force_flush() {
            out.save = true;
        }
        out
    }

    /// The last captured preview snapshot.
    pub fn snapshot(&self) -> &[SectionInstance] {
        &self.snapshot
    }

    pub fn snapshot_is_stale(&self) -> bool {
        self.snapshot_stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{SectionData, SectionKind};

    fn section(id: u64) -> SectionInstance {
        SectionInstance {
            instance_id: id,
            collapsed: false,
            data: SectionData::default_for(SectionKind::CustomMessage),
        }
    }

    #[test]
    fn test_debounce_replaces_deadline() {
        let t0 = Instant::now();
        let mut d = Debounce::new();
        d.trigger(t0, Duration::from_millis(300));
        // Re-trigger at t0+200: old deadline (t0+300) must not fire.
        d.trigger(t0 + Duration::from_millis(200), Duration::from_millis(300));
        assert!(!d.poll(t0 + Duration::from_millis(400)));
        assert!(d.poll(t0 + Duration::from_millis(500)));
        // Fires once only.
        assert!(!d.poll(t0 + Duration::from_millis(600)));
    }

    #[test]
    fn test_rapid_mutations_single_fire() {
        let t0 = Instant::now();
        let mut pipeline = UpdatePipeline::new(t0);
        let sections = vec![section(1)];

        let mut fires = 0;
        for i in 0..10 {
            pipeline.notify_change(t0 + Duration::from_millis(i * 50));
            if pipeline
                .poll(t0 + Duration::from_millis(i * 50), &sections)
                .refresh_preview
            {
                fires += 1;
            }
        }
        assert_eq!(fires, 0);
        // Preview quiet period passes first: one preview fire, save still
        // waiting on its longer debounce.
        let out = pipeline.poll(t0 + Duration::from_millis(9 * 50 + 300), &sections);
        assert!(out.refresh_preview);
        assert!(!out.save);
        assert_eq!(pipeline.snapshot().len(), 1);

        // Save debounce elapses: exactly one save fire.
        let out = pipeline.poll(t0 + Duration::from_millis(9 * 50 + 500), &sections);
        assert!(!out.refresh_preview);
        assert!(out.save);
    }

    #[test]
    fn test_snapshot_reads_fire_time_state() {
        let t0 = Instant::now();
        let mut pipeline = UpdatePipeline::new(t0);

        pipeline.notify_change(t0);
        // Between schedule and fire the list grows; the fire must see both.
        let sections = vec![section(1), section(2)];
        let out = pipeline.poll(t0 + Duration::from_millis(300), &sections);
        assert!(out.refresh_preview);
        assert_eq!(pipeline.snapshot().len(), 2);
    }

    #[test]
    fn test_snapshot_not_aliased() {
        let t0 = Instant::now();
        let mut pipeline = UpdatePipeline::new(t0);
        let mut sections = vec![section(1)];
        pipeline.notify_change(t0);
        pipeline.poll(t0 + Duration::from_millis(300), &sections);

        sections.clear();
        assert_eq!(pipeline.snapshot().len(), 1);
    }

    #[test]
    fn test_backstop_fires_during_constant_editing() {
        let t0 = Instant::now();
        let mut pipeline = UpdatePipeline::new(t0);
        let sections = vec![section(1)];

        // Mutate every 400 ms: the 500 ms save debounce never settles.
        let mut saves = 0;
        for i in 0..30 {
            let now = t0 + Duration::from_millis(i * 400);
            pipeline.notify_change(now);
            if pipeline.poll(now, &sections).save {
                saves += 1;
            }
        }
        // 30 * 400 ms = 12 s of editing; the 10 s backstop fired once.
        assert_eq!(saves, 1);
    }

    #[test]
    fn test_flush_supersedes_pending() {
        let t0 = Instant::now();
        let mut pipeline = UpdatePipeline::new(t0);
        let sections = vec![section(1), section(2), section(3)];

        pipeline.notify_change(t0);
        let out = pipeline.flush(&sections);
        assert!(out.save);
        assert!(out.refresh_preview);
        assert_eq!(pipeline.snapshot().len(), 3);

        // Nothing pending afterwards.
        let out = pipeline.poll(t0 + Duration::from_secs(1), &sections);
        assert!(!out.save && !out.refresh_preview);
    }

    #[test]
    fn test_flush_without_pending_is_quiet() {
        let t0 = Instant::now();
        let mut pipeline = UpdatePipeline::new(t0);
        let out = pipeline.flush(&[]);
        assert!(!out.save);
        assert!(!out.refresh_preview);
    }
}
