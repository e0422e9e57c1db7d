//! Deferred rebuild scheduling.
//!
//! STRUCTURE-class mutations never rebuild synchronously. Each one bumps a
//! monotonically increasing generation counter and arms (or merges into)
//! the single pending [`RebuildRequest`]; the widget executes it at the
//! next cooperative opportunity, or immediately through its force-now
//! entry point. However many STRUCTURE fields change inside one quantum,
//! at most one rebuild runs - and it observes the state current at
//! execution time, not at scheduling time, because the request carries no
//! values, only the fact that a rebuild is owed.
//!
//! State machine:
//!
//! ```text
//! Idle -(structure change)-> PendingRebuild -(tick | force)-> Rebuilding -> Idle
//! ```
//!
//! STYLE changes never touch this module; they self-loop on Idle.

use log::debug;

use crate::style::AttrKind;

// =============================================================================
// Types
// =============================================================================

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    PendingRebuild,
    Rebuilding,
}

/// The one pending regeneration. Later STRUCTURE changes merge into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildRequest {
    /// Generation at the latest contributing change. Strictly greater
    /// than the generation of any previously executed rebuild.
    pub generation: u64,
    /// Which attributes changed since the last rebuild, deduplicated, in
    /// first-change order.
    pub changed: Vec<AttrKind>,
}

// =============================================================================
// Scheduler
// =============================================================================

/// Coalescing rebuild scheduler.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    state: SchedulerState,
    generation: u64,
    executed_generation: u64,
    pending: Option<RebuildRequest>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Generation of the latest STRUCTURE change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation observed by the last executed rebuild.
    pub fn executed_generation(&self) -> u64 {
        self.executed_generation
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a STRUCTURE change and arm the deferred rebuild.
    ///
    /// Returns the new generation. Calls while a request is already
    /// pending coalesce into it.
    pub fn schedule(&mut self, kind: AttrKind) -> u64 {
        self.generation += 1;
        match &mut self.pending {
            Some(request) => {
                request.generation = self.generation;
                if !request.changed.contains(&kind) {
                    request.changed.push(kind);
                }
                debug!(
                    "rebuild coalesced: {kind:?} joins pending request (generation {})",
                    self.generation
                );
            }
            None => {
                self.pending = Some(RebuildRequest {
                    generation: self.generation,
                    changed: vec![kind],
                });
                self.state = SchedulerState::PendingRebuild;
                debug!("rebuild armed: {kind:?} (generation {})", self.generation);
            }
        }
        self.generation
    }

    /// Claim the pending request at a cooperative opportunity.
    ///
    /// Returns `None` when nothing is owed (a force-now call with no
    /// pending rebuild is a no-op). On `Some`, the caller rebuilds and
    /// then reports completion through [`finish_rebuild`].
    ///
    /// [`finish_rebuild`]: UpdateScheduler::finish_rebuild
    pub fn begin_rebuild(&mut self) -> Option<RebuildRequest> {
        let request = self.pending.take()?;
        self.state = SchedulerState::Rebuilding;
        Some(request)
    }

    /// Report a finished rebuild for the given request generation.
    pub fn finish_rebuild(&mut self, generation: u64) {
        self.executed_generation = self.executed_generation.max(generation);
        // A mutation during the rebuild re-arms; otherwise back to idle.
        self.state = if self.pending.is_some() {
            SchedulerState::PendingRebuild
        } else {
            SchedulerState::Idle
        };
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_has_nothing_due() {
        let mut s = UpdateScheduler::new();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.begin_rebuild().is_none(), "force-now with no pending is a no-op");
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_structure_change_arms_rebuild() {
        let mut s = UpdateScheduler::new();
        let generation = s.schedule(AttrKind::Source);
        assert_eq!(generation, 1);
        assert_eq!(s.state(), SchedulerState::PendingRebuild);
        assert!(s.has_pending());
    }

    #[test]
    fn test_coalescing_many_changes_one_request() {
        let mut s = UpdateScheduler::new();
        s.schedule(AttrKind::Source);
        s.schedule(AttrKind::Source);
        s.schedule(AttrKind::Caps);
        s.schedule(AttrKind::NestingLimit);

        let request = s.begin_rebuild().expect("one request pending");
        assert_eq!(request.generation, 4);
        assert_eq!(
            request.changed,
            vec![AttrKind::Source, AttrKind::Caps, AttrKind::NestingLimit]
        );
        // Nothing further is due.
        s.finish_rebuild(request.generation);
        assert!(s.begin_rebuild().is_none());
    }

    #[test]
    fn test_generation_strictly_increases() {
        let mut s = UpdateScheduler::new();
        let mut last = 0;
        for _ in 0..10 {
            let generation = s.schedule(AttrKind::Source);
            assert!(generation > last);
            last = generation;
        }
        let request = s.begin_rebuild().unwrap();
        s.finish_rebuild(request.generation);
        assert!(s.executed_generation() < s.schedule(AttrKind::Source));
    }

    #[test]
    fn test_state_round_trip() {
        let mut s = UpdateScheduler::new();
        s.schedule(AttrKind::Source);
        let request = s.begin_rebuild().unwrap();
        assert_eq!(s.state(), SchedulerState::Rebuilding);
        s.finish_rebuild(request.generation);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn test_change_during_rebuild_rearms() {
        let mut s = UpdateScheduler::new();
        s.schedule(AttrKind::Source);
        let request = s.begin_rebuild().unwrap();
        // A mutation lands while the rebuild runs.
        s.schedule(AttrKind::Caps);
        s.finish_rebuild(request.generation);
        assert_eq!(s.state(), SchedulerState::PendingRebuild);
        assert!(s.has_pending());
    }

    #[test]
    fn test_executed_generation_tracks_latest() {
        let mut s = UpdateScheduler::new();
        s.schedule(AttrKind::Source);
        let request = s.begin_rebuild().unwrap();
        s.finish_rebuild(request.generation);
        assert_eq!(s.executed_generation(), 1);
    }
}
