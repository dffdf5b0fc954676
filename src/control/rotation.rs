//! Which service is on screen: manual advance, schedule-driven auto-advance,
//! round-robin fallback without a wall clock, and refresh-driven reset.

#![allow(missing_docs)]

use std::fmt;

use crate::control::state::ControllerState;
use crate::core::clock::ticks_diff;
use crate::render::TextMeasure;
use crate::schedule::list::ServiceList;
use crate::source::arbiter::SourceLabel;

/// Why the displayed service changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceReason {
    Manual,
    Schedule,
    Rotation,
}

impl fmt::Display for AdvanceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manual => "manual",
            Self::Schedule => "schedule",
            Self::Rotation => "rotation",
        })
    }
}

/// Retext the ticker for the current service.
pub fn apply_current(state: &mut ControllerState, measure: &dyn TextMeasure) {
    let calling = state.current().calling.clone();
    state.ticker.retext(&calling, measure);
}

/// Step to the next service (wrapping). No-op with a single service.
pub fn manual_advance(
    state: &mut ControllerState,
    now_ms: u32,
    measure: &dyn TextMeasure,
) -> bool {
    let len = state.services.len();
    if len <= 1 {
        return false;
    }
    state.index = (state.index + 1) % len;
    state.last_rotate_ms = now_ms;
    apply_current(state, measure);
    true
}

/// Move to the time-appropriate service once the current one has departed.
///
/// A service whose schedule is known stays up until `now_secs` is strictly
/// past it; one with an unknown schedule yields to the target immediately.
pub fn auto_advance(
    state: &mut ControllerState,
    now_secs: u32,
    measure: &dyn TextMeasure,
) -> bool {
    if state.services.len() <= 1 {
        return false;
    }
    let target = state.services.target_index(now_secs);
    if target == state.index {
        return false;
    }
    let departed = state
        .services
        .schedule_at(state.index)
        .is_none_or(|current| now_secs > current);
    if !departed {
        return false;
    }
    state.index = target;
    apply_current(state, measure);
    true
}

/// Round-robin on a fixed interval; used only while wall time is unavailable.
pub fn periodic_rotate(
    state: &mut ControllerState,
    now_ms: u32,
    interval_ms: u32,
    measure: &dyn TextMeasure,
) -> bool {
    if state.services.len() <= 1 || ticks_diff(now_ms, state.last_rotate_ms) < interval_ms {
        return false;
    }
    manual_advance(state, now_ms, measure)
}

/// Install a freshly fetched list and re-resolve the index by time.
///
/// Without wall time an identical list keeps its round-robin position;
/// otherwise the index restarts at zero. The ticker only rewinds when the
/// displayed service actually changes.
pub fn apply_list(
    state: &mut ControllerState,
    list: ServiceList,
    source: SourceLabel,
    now_secs: Option<u32>,
    now_ms: u32,
    measure: &dyn TextMeasure,
) {
    let previous = state.current().clone();
    let unchanged = state.services == list;
    state.services = list;
    state.source = source;
    match now_secs {
        Some(secs) => {
            state.index = state.services.target_index(secs);
            state.last_rotate_ms = now_ms;
        }
        None if unchanged => {}
        None => {
            state.index = 0;
            state.last_rotate_ms = now_ms;
        }
    }
    if *state.current() != previous {
        apply_current(state, measure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::worker::FetchWorker;
    use crate::render::BitmapFont;
    use crate::schedule::service::Service;

    const FONT: BitmapFont = BitmapFont { glyph_px: 6 };

    fn svc(scheduled: &str, destination: &str) -> Service {
        Service {
            scheduled: scheduled.to_string(),
            destination: destination.to_string(),
            status: "On time".to_string(),
            calling: format!("via {destination}"),
        }
    }

    fn hm(h: u32, m: u32) -> u32 {
        h * 3600 + m * 60
    }

    fn state_with(services: Vec<Service>) -> ControllerState {
        let mut state = ControllerState::new(
            svc("12:24", "Default"),
            false,
            200,
            FetchWorker::disabled(),
            &FONT,
            0,
        );
        let list = ServiceList::build(services).expect("non-empty");
        apply_list(&mut state, list, SourceLabel::Local, None, 0, &FONT);
        state
    }

    #[test]
    fn manual_advance_wraps() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("10:00", "B")]);
        assert!(manual_advance(&mut state, 5, &FONT));
        assert_eq!(state.index, 1);
        assert!(state.ticker.text().contains("VIA B"));
        assert!(manual_advance(&mut state, 6, &FONT));
        assert_eq!(state.index, 0);
        assert_eq!(state.last_rotate_ms, 6);
    }

    #[test]
    fn manual_advance_single_service_noop() {
        let mut state = state_with(vec![svc("09:00", "A")]);
        assert!(!manual_advance(&mut state, 5, &FONT));
        assert_eq!(state.index, 0);
    }

    #[test]
    fn holds_until_departure_strictly_passed() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("10:00", "B")]);
        assert!(!auto_advance(&mut state, hm(8, 59), &FONT));
        assert!(!auto_advance(&mut state, hm(9, 0), &FONT));
        assert_eq!(state.index, 0);
        assert!(auto_advance(&mut state, hm(9, 1), &FONT));
        assert_eq!(state.index, 1);
    }

    #[test]
    fn unknown_schedule_yields_to_target() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("bad", "Z")]);
        state.index = 1;
        assert!(auto_advance(&mut state, hm(8, 0), &FONT));
        assert_eq!(state.index, 0);
    }

    #[test]
    fn past_everything_targets_earliest() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("10:00", "B")]);
        state.index = 1;
        assert!(auto_advance(&mut state, hm(22, 0), &FONT));
        assert_eq!(state.index, 0);
        // Earliest is itself departed but already current: stays put.
        assert!(!auto_advance(&mut state, hm(22, 5), &FONT));
    }

    #[test]
    fn periodic_rotation_waits_for_interval() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("10:00", "B")]);
        assert!(!periodic_rotate(&mut state, 299_999, 300_000, &FONT));
        assert!(periodic_rotate(&mut state, 300_000, 300_000, &FONT));
        assert_eq!(state.index, 1);
        assert!(!periodic_rotate(&mut state, 300_001, 300_000, &FONT));
    }

    #[test]
    fn refresh_recomputes_index_by_time() {
        let mut state = state_with(vec![svc("09:00", "A")]);
        let list = ServiceList::build(vec![
            svc("08:00", "Early"),
            svc("11:00", "Late"),
            svc("10:00", "Mid"),
        ])
        .expect("non-empty");
        apply_list(&mut state, list, SourceLabel::Remote, Some(hm(9, 30)), 10, &FONT);
        assert_eq!(state.index, 1);
        assert_eq!(state.current().destination, "Mid");
        assert_eq!(state.source, SourceLabel::Remote);
        assert_eq!(state.ticker.offset(), 0);
    }

    #[test]
    fn refresh_without_clock_lands_on_first() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("10:00", "B")]);
        state.index = 1;
        let list = ServiceList::build(vec![svc("09:00", "A"), svc("11:00", "C")]).expect("list");
        apply_list(&mut state, list, SourceLabel::Local, None, 50, &FONT);
        assert_eq!(state.index, 0);
        assert_eq!(state.last_rotate_ms, 50);
    }

    #[test]
    fn same_list_without_clock_keeps_rotation_position() {
        let mut state = state_with(vec![svc("09:00", "A"), svc("10:00", "B")]);
        assert!(manual_advance(&mut state, 40, &FONT));
        let list = ServiceList::build(vec![svc("09:00", "A"), svc("10:00", "B")]).expect("list");
        apply_list(&mut state, list, SourceLabel::Local, None, 90, &FONT);
        assert_eq!(state.index, 1);
        assert_eq!(state.last_rotate_ms, 40);
    }

    #[test]
    fn unchanged_service_keeps_ticker_position() {
        let mut state = state_with(vec![svc("09:00", "A")]);
        state.ticker.advance(1_000, 120, 4);
        let offset = state.ticker.offset();
        assert!(offset > 0);
        let same = ServiceList::build(vec![svc("09:00", "A")]).expect("list");
        apply_list(&mut state, same, SourceLabel::Local, Some(hm(8, 0)), 1_000, &FONT);
        assert_eq!(state.ticker.offset(), offset);
    }
}
