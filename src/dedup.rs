use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::{NormalizedRecord, RejectReason, SeismicEvent};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupCounts {
    pub records_in: usize,
    pub dropped_missing_time: usize,
    pub dropped_missing_coordinates: usize,
    pub dropped_missing_magnitude: usize,
    pub dropped_out_of_range: usize,
    pub dropped_duplicate: usize,
    pub retained: usize,
}

impl DedupCounts {
    pub fn dropped_total(&self) -> usize {
        self.dropped_missing_time
            + self.dropped_missing_coordinates
            + self.dropped_missing_magnitude
            + self.dropped_out_of_range
            + self.dropped_duplicate
    }

    fn record_rejection(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::MissingTime => self.dropped_missing_time += 1,
            RejectReason::MissingCoordinates => self.dropped_missing_coordinates += 1,
            RejectReason::MissingMagnitude => self.dropped_missing_magnitude += 1,
            RejectReason::OutOfRange => self.dropped_out_of_range += 1,
        }
    }
}

/// Validates, deduplicates and orders records given in enumeration order.
///
/// Validation runs before identity comparison, so an incomplete record never
/// shadows a later complete one. The first record of each identity key wins,
/// and the final sort is stable, so events with equal times keep the order in
/// which they were first seen.
pub fn dedup_and_sort<I>(records: I) -> (Vec<SeismicEvent>, DedupCounts)
where
    I: IntoIterator<Item = NormalizedRecord>,
{
    let mut counts = DedupCounts::default();
    let mut seen = HashSet::new();
    let mut events = Vec::new();

    for record in records {
        counts.records_in += 1;

        let event = match record.validate() {
            Ok(event) => event,
            Err(reason) => {
                counts.record_rejection(reason);
                continue;
            }
        };

        if !seen.insert(event.identity_key()) {
            counts.dropped_duplicate += 1;
            continue;
        }

        events.push(event);
    }

    events.sort_by(|a, b| b.time.cmp(&a.time));
    counts.retained = events.len();

    (events, counts)
}
