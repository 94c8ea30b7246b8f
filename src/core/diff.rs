//! Transition detection between consecutive poll cycles.
//!
//! The baseline maps every job id ever seen to the last status token observed for it.
//! Entries are never removed; a job that drops out of the listing keeps its last token.

use std::collections::HashMap;

use super::models::{Job, Transition};

pub type Baseline = HashMap<String, String>;

/// Compare `jobs` against `baseline`, recording a transition for every known id whose
/// token changed, then write every job's current token into the baseline.
///
/// Ids absent from the baseline are first sightings and never produce a transition.
pub fn detect_transitions(baseline: &mut Baseline, jobs: &[Job]) -> Vec<Transition> {
    let mut transitions = Vec::new();

    for job in jobs {
        match baseline.get_mut(&job.id) {
            Some(previous) => {
                if *previous != job.status {
                    transitions.push(Transition {
                        job_id: job.id.clone(),
                        title: job.title.clone(),
                        previous: std::mem::replace(previous, job.status.clone()),
                        current: job.status.clone(),
                    });
                }
            }
            None => {
                baseline.insert(job.id.clone(), job.status.clone());
            }
        }
    }

    transitions
}

/// Running flags for exactly the jobs in `jobs`.
pub fn running_flags(jobs: &[Job]) -> HashMap<String, bool> {
    jobs.iter()
        .map(|job| (job.id.clone(), job.is_running()))
        .collect()
}
