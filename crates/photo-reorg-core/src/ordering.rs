use std::cmp::Ordering;

use crate::config::{Config, Direction, UndatedPlacement};
use crate::types::Entry;

/// Total order over the entries of one batch.
///
/// Dated entries compare by timestamp, then by original file name (byte-wise,
/// case-sensitive). `direction` reverses that whole comparison, and also the
/// name order among undated entries. Where undated entries go relative to
/// dated ones is decided by `undated` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderingPolicy {
    pub direction: Direction,
    pub undated: UndatedPlacement,
}

impl OrderingPolicy {
    pub fn new(direction: Direction, undated: UndatedPlacement) -> Self {
        Self { direction, undated }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.direction, config.undated)
    }

    pub fn compare(&self, a: &Entry, b: &Entry) -> Ordering {
        match (a.capture_timestamp(), b.capture_timestamp()) {
            (Some(ta), Some(tb)) => self.directed(
                ta.cmp(&tb)
                    .then_with(|| a.file_name().cmp(b.file_name())),
            ),
            (None, None) => self.directed(a.file_name().cmp(b.file_name())),
            (Some(_), None) => self.undated_side(Ordering::Less),
            (None, Some(_)) => self.undated_side(Ordering::Greater),
        }
    }

    /// Sort a batch into commit order
    pub fn sort(&self, entries: &mut [Entry]) {
        entries.sort_by(|a, b| self.compare(a, b));
    }

    fn directed(&self, ordering: Ordering) -> Ordering {
        match self.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }

    /// `dated_vs_undated` is the answer for undated-last
    fn undated_side(&self, dated_vs_undated: Ordering) -> Ordering {
        match self.undated {
            UndatedPlacement::Last => dated_vs_undated,
            UndatedPlacement::First => dated_vs_undated.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::timestamp;
    use crate::types::TimestampSource;
    use std::path::PathBuf;

    fn entry(name: &str, date: Option<&str>) -> Entry {
        Entry::new(
            PathBuf::from("/photos").join(name),
            date.map(timestamp),
            Some(TimestampSource::Metadata),
        )
    }

    fn sorted(policy: OrderingPolicy, mut entries: Vec<Entry>) -> Vec<String> {
        policy.sort(&mut entries);
        entries
            .iter()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect()
    }

    fn batch() -> Vec<Entry> {
        vec![
            entry("undated.jpg", None),
            entry("late.jpg", Some("2021-05-02 10:00")),
            entry("early.jpg", Some("2021-05-01 10:00")),
        ]
    }

    #[test]
    fn test_ascending_undated_last() {
        let policy = OrderingPolicy::default();
        assert_eq!(
            sorted(policy, batch()),
            vec!["early.jpg", "late.jpg", "undated.jpg"]
        );
    }

    #[test]
    fn test_descending_keeps_undated_placement() {
        let policy = OrderingPolicy::new(Direction::Descending, UndatedPlacement::Last);
        assert_eq!(
            sorted(policy, batch()),
            vec!["late.jpg", "early.jpg", "undated.jpg"]
        );

        let policy = OrderingPolicy::new(Direction::Descending, UndatedPlacement::First);
        assert_eq!(
            sorted(policy, batch()),
            vec!["undated.jpg", "late.jpg", "early.jpg"]
        );
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_name() {
        let entries = vec![
            entry("b.jpg", Some("2021-05-01 10:00")),
            entry("B.jpg", Some("2021-05-01 10:00")),
            entry("a.jpg", Some("2021-05-01 10:00")),
        ];

        // Upper case sorts before lower case
        assert_eq!(
            sorted(OrderingPolicy::default(), entries.clone()),
            vec!["B.jpg", "a.jpg", "b.jpg"]
        );

        let policy = OrderingPolicy::new(Direction::Descending, UndatedPlacement::Last);
        assert_eq!(sorted(policy, entries), vec!["b.jpg", "a.jpg", "B.jpg"]);
    }

    #[test]
    fn test_undated_entries_ordered_by_name() {
        let entries = vec![
            entry("c.png", None),
            entry("a.png", None),
            entry("x.jpg", Some("2020-01-01 00:00")),
            entry("b.png", None),
        ];

        let policy = OrderingPolicy::new(Direction::Ascending, UndatedPlacement::First);
        assert_eq!(
            sorted(policy, entries),
            vec!["a.png", "b.png", "c.png", "x.jpg"]
        );
    }

    #[test]
    fn test_order_ignores_input_order() {
        let mut reversed = batch();
        reversed.reverse();
        assert_eq!(
            sorted(OrderingPolicy::default(), batch()),
            sorted(OrderingPolicy::default(), reversed)
        );
    }
}
