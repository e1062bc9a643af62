// file: src/image/mod.rs
// version: 2.0.0
// guid: a1b2c3d4-e5f6-7890-1234-567890abcdef

//! Image build lifecycle
//!
//! This module handles:
//! - Phase tracking for a single build run
//! - Relocating finished images out of the pi-gen checkout

use std::fmt;
use tracing::{info, warn};

pub mod relocator;

pub use relocator::{ArtifactRelocator, ARTIFACTS_DIR};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    NotStarted,
    CollectingConfig,
    DispatchingBuild,
    Succeeded,
    Failed,
    RelocatingArtifacts,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::NotStarted => "NOT_STARTED",
            BuildPhase::CollectingConfig => "COLLECTING_CONFIG",
            BuildPhase::DispatchingBuild => "DISPATCHING_BUILD",
            BuildPhase::Succeeded => "SUCCEEDED",
            BuildPhase::Failed => "FAILED",
            BuildPhase::RelocatingArtifacts => "RELOCATING_ARTIFACTS",
        }
    }

    /// Whether `next` may follow this phase
    pub fn can_advance_to(&self, next: BuildPhase) -> bool {
        use BuildPhase::*;
        matches!(
            (*self, next),
            (NotStarted, CollectingConfig)
                | (CollectingConfig, DispatchingBuild)
                | (CollectingConfig, Failed)
                | (DispatchingBuild, Succeeded)
                | (DispatchingBuild, Failed)
                | (Succeeded, RelocatingArtifacts)
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logs each phase change of a run
#[derive(Debug)]
pub struct PhaseTracker {
    current: BuildPhase,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: BuildPhase::NotStarted,
        }
    }

    pub fn current(&self) -> BuildPhase {
        self.current
    }

    /// Move to `next`; out-of-order transitions are ignored
    pub fn advance(&mut self, next: BuildPhase) -> bool {
        if !self.current.can_advance_to(next) {
            warn!("Ignoring phase change {} -> {}", self.current, next);
            return false;
        }
        info!("Phase: {} -> {}", self.current, next);
        self.current = next;
        true
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_run_sequence() {
        let mut tracker = PhaseTracker::new();
        for phase in [
            BuildPhase::CollectingConfig,
            BuildPhase::DispatchingBuild,
            BuildPhase::Succeeded,
            BuildPhase::RelocatingArtifacts,
        ] {
            assert!(tracker.advance(phase));
        }
        assert_eq!(tracker.current(), BuildPhase::RelocatingArtifacts);
    }

    #[test]
    fn test_failed_build_never_relocates() {
        let mut tracker = PhaseTracker::new();
        tracker.advance(BuildPhase::CollectingConfig);
        tracker.advance(BuildPhase::DispatchingBuild);
        tracker.advance(BuildPhase::Failed);

        assert!(!tracker.advance(BuildPhase::RelocatingArtifacts));
        assert_eq!(tracker.current(), BuildPhase::Failed);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(BuildPhase::DispatchingBuild.to_string(), "DISPATCHING_BUILD");
        assert_eq!(BuildPhase::NotStarted.to_string(), "NOT_STARTED");
    }
}
