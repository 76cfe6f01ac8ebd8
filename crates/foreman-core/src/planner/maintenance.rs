//! Maintenance policies used to pad a plan up to its fixed size.

use jiff::civil::Date;

use crate::{
    catalog::{self, ActionCandidate},
    models::Repository,
};

/// Chooses maintenance work for the slots ideas did not fill.
pub trait MaintenancePolicy: Send + Sync {
    /// Returns up to `slots` candidates for `date`. Returning fewer than
    /// `slots` makes the plan unbuildable.
    fn select(&self, date: Date, repositories: &[Repository], slots: usize) -> Vec<ActionCandidate>;
}

/// Files a triage issue on known repositories in turn, starting from an
/// offset derived from the date so consecutive days cover different
/// repositories. With fewer repositories than slots the rotation wraps and
/// each further pass is numbered, so no two entries file the same issue.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinTriage;

impl RoundRobinTriage {
    fn offset(date: Date, len: usize) -> usize {
        let ordinal = i64::from(date.year()) * 366 + i64::from(date.day_of_year());
        ordinal.rem_euclid(len as i64) as usize
    }
}

impl MaintenancePolicy for RoundRobinTriage {
    fn select(&self, date: Date, repositories: &[Repository], slots: usize) -> Vec<ActionCandidate> {
        let eligible: Vec<_> = repositories
            .iter()
            .filter(|repo| catalog::validate_repository_name(&repo.name).is_ok())
            .collect();
        if eligible.is_empty() || slots == 0 {
            return Vec::new();
        }

        let start = Self::offset(date, eligible.len());
        (0..slots)
            .filter_map(|slot| {
                let repo = eligible[(start + slot) % eligible.len()];
                catalog::triage_candidate(repo, slot / eligible.len() + 1).ok()
            })
            .collect()
    }
}
