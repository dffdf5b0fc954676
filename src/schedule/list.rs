//! Sorted, never-empty service list with its precomputed schedule index.

#![allow(missing_docs)]

use std::sync::Arc;

use crate::core::clock::SECONDS_PER_DAY;
use crate::schedule::service::Service;
use crate::schedule::timeparse::parse_schedule;

/// Parsed schedule per list position; `None` marks an unparseable time.
pub type ScheduleIndex = Vec<Option<u32>>;

/// Services ordered by (scheduled seconds, destination), unparseable times last.
///
/// Rebuilt wholesale on every refresh; shared cheaply through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceList {
    services: Arc<Vec<Service>>,
    schedule: Arc<ScheduleIndex>,
}

impl ServiceList {
    /// Sort and index `services`. Returns `None` for an empty input.
    #[must_use]
    pub fn build(services: Vec<Service>) -> Option<Self> {
        if services.is_empty() {
            return None;
        }
        let mut keyed: Vec<(Option<u32>, Service)> = services
            .into_iter()
            .map(|svc| (parse_schedule(&svc.scheduled), svc))
            .collect();
        keyed.sort_by(|(a_secs, a), (b_secs, b)| {
            a_secs
                .unwrap_or(SECONDS_PER_DAY)
                .cmp(&b_secs.unwrap_or(SECONDS_PER_DAY))
                .then_with(|| a.destination.cmp(&b.destination))
        });
        let (schedule, services): (Vec<_>, Vec<_>) = keyed.into_iter().unzip();
        Some(Self {
            services: Arc::new(services),
            schedule: Arc::new(schedule),
        })
    }

    /// A one-entry list holding `service`.
    #[must_use]
    pub fn single(service: Service) -> Self {
        let secs = parse_schedule(&service.scheduled);
        Self {
            services: Arc::new(vec![service]),
            schedule: Arc::new(vec![secs]),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Service at `index`, clamped into range.
    #[must_use]
    pub fn get(&self, index: usize) -> &Service {
        &self.services[index.min(self.services.len() - 1)]
    }

    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    #[must_use]
    pub fn schedule(&self) -> &[Option<u32>] {
        &self.schedule
    }

    #[must_use]
    pub fn schedule_at(&self, index: usize) -> Option<u32> {
        self.schedule.get(index).copied().flatten()
    }

    /// First entry departing at or after `now_secs`; else the earliest known
    /// schedule; else 0.
    #[must_use]
    pub fn target_index(&self, now_secs: u32) -> usize {
        if let Some(idx) = self
            .schedule
            .iter()
            .position(|secs| secs.is_some_and(|s| s >= now_secs))
        {
            return idx;
        }
        self.schedule
            .iter()
            .enumerate()
            .filter_map(|(idx, secs)| secs.map(|s| (s, idx)))
            .min()
            .map_or(0, |(_, idx)| idx)
    }
}
