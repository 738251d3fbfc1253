//! Window declarations and watermark tracking for aggregate nodes (spec
//! §4.2, §9 Open Questions: "only the interface shape is fixed").
//!
//! Event time is modelled as epoch milliseconds (`i64`) rather than a
//! `SystemTime`/`Instant`, matching `npipeline-retry`'s millisecond
//! serialization convention and keeping watermark arithmetic integer-only.

use serde::{Deserialize, Serialize};

/// How an aggregate node partitions its input into windows (spec §4.2:
/// "Windows are declared (tumbling, sliding, session) with
/// watermark-driven closure").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowSpec {
    /// Fixed-size, non-overlapping windows aligned to `size`.
    Tumbling {
        /// Window width, in milliseconds.
        size_millis: i64,
    },
    /// Fixed-size windows that advance by `slide`, so consecutive windows
    /// may overlap.
    Sliding {
        /// Window width, in milliseconds.
        size_millis: i64,
        /// Advance between consecutive window starts, in milliseconds.
        slide_millis: i64,
    },
    /// A window that stays open while items keep arriving within `gap` of
    /// each other, closing once no item arrives for that long.
    Session {
        /// Maximum allowed gap between items in the same session, in
        /// milliseconds.
        gap_millis: i64,
    },
}

impl WindowSpec {
    /// The window bucket an event at `event_time_millis` falls into, for
    /// the two fixed-width window kinds. `Tumbling` buckets by
    /// `size_millis`; `Sliding` buckets by `slide_millis` — the window
    /// index advances every `slide_millis`, so a key's open window closes
    /// as soon as an item arrives in the next slide period rather than
    /// only at end-of-stream (spec §4.2: "watermark-driven closure").
    ///
    /// This assigns each item to exactly one bucket instead of fanning it
    /// out across every window a fully general sliding semantics would
    /// overlap it into; the aggregate's accumulator is keyed one-per-slide
    /// rather than one-per-overlapping-window (spec §9 Open Questions
    /// leaves exact window-closure semantics to the implementer). Returns
    /// `None` for `Session`, whose membership depends on per-key
    /// last-seen-time state the caller tracks itself (see
    /// `npipeline_graph::erased::AggregateAdapter`).
    #[must_use]
    pub fn size_based_index(&self, event_time_millis: i64) -> Option<i64> {
        match *self {
            WindowSpec::Tumbling { size_millis } if size_millis > 0 => {
                Some(event_time_millis.div_euclid(size_millis))
            }
            WindowSpec::Sliding { slide_millis, .. } if slide_millis > 0 => {
                Some(event_time_millis.div_euclid(slide_millis))
            }
            _ => None,
        }
    }

    /// The inactivity gap that closes a `Session` window, or `None` for
    /// the two fixed-width kinds.
    #[must_use]
    pub fn session_gap_millis(&self) -> Option<i64> {
        match *self {
            WindowSpec::Session { gap_millis } if gap_millis >= 0 => Some(gap_millis),
            _ => None,
        }
    }
}

/// What happens to an item whose event time falls behind the current
/// watermark (spec §4.2: "Out-of-order items past the watermark are
/// either dropped or routed to a late-data edge").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LateDataPolicy {
    /// Silently drop the late item.
    #[default]
    Drop,
    /// Route the late item to the node's declared late-data edge.
    Route,
}

/// A monotonic watermark: "no item with event-time earlier than this will
/// arrive" (GLOSSARY). Tracked as `max observed event time - allowed
/// lateness`, the simplest monotonic generator that satisfies spec §4.2
/// without prescribing exact lateness-threshold semantics (left to the
/// implementer per §9 Open Questions).
#[derive(Debug, Clone, Copy)]
pub struct WatermarkTracker {
    allowed_lateness_millis: i64,
    max_event_time_millis: Option<i64>,
}

impl WatermarkTracker {
    /// Creates a tracker that allows events up to `allowed_lateness_millis`
    /// behind the maximum event time seen so far.
    #[must_use]
    pub fn new(allowed_lateness_millis: i64) -> Self {
        Self {
            allowed_lateness_millis: allowed_lateness_millis.max(0),
            max_event_time_millis: None,
        }
    }

    /// The current watermark, or `None` before any item has been observed.
    #[must_use]
    pub fn watermark(&self) -> Option<i64> {
        self.max_event_time_millis
            .map(|max| max - self.allowed_lateness_millis)
    }

    /// Observes an item's event time, advancing the watermark if it is the
    /// new maximum, and reports whether the item itself arrived late
    /// (behind the watermark *before* this observation).
    pub fn observe(&mut self, event_time_millis: i64) -> bool {
        let was_late = self
            .watermark()
            .is_some_and(|wm| event_time_millis < wm);

        self.max_event_time_millis = Some(
            self.max_event_time_millis
                .map_or(event_time_millis, |max| max.max(event_time_millis)),
        );
        was_late
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tumbling_index_groups_by_fixed_width() {
        let spec = WindowSpec::Tumbling { size_millis: 1000 };
        assert_eq!(spec.size_based_index(500), Some(0));
        assert_eq!(spec.size_based_index(1500), Some(1));
        assert_eq!(spec.size_based_index(999), Some(0));
    }

    #[test]
    fn sliding_index_advances_every_slide_period() {
        let spec = WindowSpec::Sliding {
            size_millis: 1000,
            slide_millis: 250,
        };
        assert_eq!(spec.size_based_index(0), Some(0));
        assert_eq!(spec.size_based_index(249), Some(0));
        assert_eq!(spec.size_based_index(250), Some(1));
        assert_eq!(spec.size_based_index(999), Some(3));
    }

    #[test]
    fn session_has_no_size_based_index_but_exposes_its_gap() {
        let spec = WindowSpec::Session { gap_millis: 500 };
        assert_eq!(spec.size_based_index(12345), None);
        assert_eq!(spec.session_gap_millis(), Some(500));
    }

    #[test]
    fn watermark_advances_with_allowed_lateness() {
        let mut tracker = WatermarkTracker::new(100);
        assert_eq!(tracker.watermark(), None);

        assert!(!tracker.observe(1000));
        assert_eq!(tracker.watermark(), Some(900));

        assert!(!tracker.observe(1200));
        assert_eq!(tracker.watermark(), Some(1100));
    }

    #[test]
    fn observe_reports_late_items() {
        let mut tracker = WatermarkTracker::new(50);
        tracker.observe(1000); // watermark becomes 950
        assert!(tracker.observe(900)); // behind watermark: late
        assert!(!tracker.observe(2000)); // ahead: not late
    }
}
