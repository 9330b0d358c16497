//! Lane (row) assignment for occurrences of one rule that overlap in time.

use crate::interval::Interval;

/// Lane per input interval (same order as the input) and the number of lanes
/// used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneAssignment {
    pub lanes: Vec<usize>,
    pub max_row: usize,
}

/// Greedy interval partitioning.
///
/// Intervals are visited by start time; each goes into the lowest-numbered
/// lane whose last interval ends at or before its start, or opens a new lane.
/// Two intervals sharing a lane never overlap.
pub fn assign_lanes(intervals: &[Interval]) -> LaneAssignment {
    let mut order: Vec<usize> = (0..intervals.len()).collect();
    order.sort_by_key(|&i| (intervals[i], i));

    let mut lane_ends = Vec::new();
    let mut lanes = vec![0; intervals.len()];

    for index in order {
        let interval = intervals[index];
        match lane_ends.iter().position(|end| *end <= interval.start) {
            Some(lane) => {
                lane_ends[lane] = interval.end;
                lanes[index] = lane;
            }
            None => {
                lanes[index] = lane_ends.len();
                lane_ends.push(interval.end);
            }
        }
    }

    LaneAssignment {
        lanes,
        max_row: lane_ends.len(),
    }
}
