//! Fire-slot computation for the recurring schedule.
//!
//! Scheduled runs fire at fixed hours of the day: the multiples of the
//! configured interval below 24, starting at hour 0. With an interval of
//! 4 the slots are 00:00, 04:00, ..., 20:00. Intervals that do not divide
//! 24 leave a shorter gap before midnight (interval 5 -> 20:00 followed
//! by 00:00 the next day); see the tests for the pinned behavior.
//!
//! All functions are pure over `NaiveDateTime` so callers decide the
//! timezone. The scheduler evaluates them in local time.

use chrono::{Duration, NaiveDateTime};

/// Hours of the day at which the schedule fires, ascending.
pub fn fire_slots(interval_hours: u32) -> Vec<u32> {
    debug_assert!(interval_hours >= 1);
    (0..24).step_by(interval_hours.max(1) as usize).collect()
}

/// The first fire time strictly after `after`.
pub fn next_fire(after: NaiveDateTime, interval_hours: u32) -> NaiveDateTime {
    let midnight = after
        .date()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");

    for hour in fire_slots(interval_hours) {
        let candidate = midnight + Duration::hours(i64::from(hour));
        if candidate > after {
            return candidate;
        }
    }

    // Every slot today has passed; the next fire is tomorrow's hour 0.
    midnight + Duration::days(1)
}

/// The next `count` fire times strictly after `after`, ascending.
pub fn upcoming_fires(after: NaiveDateTime, interval_hours: u32, count: usize) -> Vec<NaiveDateTime> {
    let mut fires = Vec::with_capacity(count);
    let mut cursor = after;
    for _ in 0..count {
        cursor = next_fire(cursor, interval_hours);
        fires.push(cursor);
    }
    fires
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn slots_for_dividing_interval() {
        assert_eq!(fire_slots(4), vec![0, 4, 8, 12, 16, 20]);
        assert_eq!(fire_slots(12), vec![0, 12]);
        assert_eq!(fire_slots(1).len(), 24);
    }

    #[test]
    fn slots_for_non_dividing_interval() {
        // 24 % 5 != 0: the last slot is 20:00 and the day ends with a 4h gap.
        assert_eq!(fire_slots(5), vec![0, 5, 10, 15, 20]);
        assert_eq!(fire_slots(7), vec![0, 7, 14, 21]);
    }

    #[test]
    fn next_fire_within_the_day() {
        assert_eq!(next_fire(at(10, 9, 30), 4), at(10, 12, 0));
    }

    #[test]
    fn next_fire_is_strictly_after() {
        // Sitting exactly on a slot advances to the following slot.
        assert_eq!(next_fire(at(10, 12, 0), 4), at(10, 16, 0));
    }

    #[test]
    fn next_fire_wraps_to_midnight() {
        assert_eq!(next_fire(at(10, 21, 15), 4), at(11, 0, 0));
    }

    #[test]
    fn non_dividing_interval_wraps_with_short_gap() {
        // Interval 5: ... 20:00, then 00:00 next day (a 4h gap, not 5h).
        assert_eq!(next_fire(at(10, 20, 0), 5), at(11, 0, 0));
        assert_eq!(next_fire(at(10, 19, 59), 5), at(10, 20, 0));
    }

    #[test]
    fn upcoming_fires_are_ascending_and_distinct() {
        let fires = upcoming_fires(at(10, 9, 30), 4, 5);
        assert_eq!(
            fires,
            vec![
                at(10, 12, 0),
                at(10, 16, 0),
                at(10, 20, 0),
                at(11, 0, 0),
                at(11, 4, 0),
            ]
        );
    }

    #[test]
    fn upcoming_fires_cross_midnight_for_non_dividing_interval() {
        let fires = upcoming_fires(at(10, 14, 0), 5, 3);
        assert_eq!(fires, vec![at(10, 15, 0), at(10, 20, 0), at(11, 0, 0)]);
    }

}
