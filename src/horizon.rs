//! The time horizon over which units are committed.
use std::ops::Range;

/// An hour in the horizon, counted from zero
pub type Hour = usize;

/// A horizon made up of consecutive one-hour time steps.
///
/// The first hour has no predecessor: anything that depends on the state in the previous hour must
/// supply an implicit initial state instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    num_hours: usize,
}

impl Horizon {
    /// Create a horizon with the given number of hours
    pub const fn new(num_hours: usize) -> Self {
        Self { num_hours }
    }

    /// The number of hours in the horizon
    pub const fn num_hours(&self) -> usize {
        self.num_hours
    }

    /// Iterate over the hours in the horizon
    pub fn iter(&self) -> Range<Hour> {
        0..self.num_hours
    }

    /// The hour before `hour`, or `None` for the first hour
    pub fn previous(&self, hour: Hour) -> Option<Hour> {
        assert!(hour < self.num_hours, "Hour {hour} is outside the horizon");
        hour.checked_sub(1)
    }

    /// The hours `[start, start + len)`, truncated at the end of the horizon
    pub fn window(&self, start: Hour, len: usize) -> Range<Hour> {
        assert!(start < self.num_hours, "Hour {start} is outside the horizon");
        start..(start + len).min(self.num_hours)
    }

    /// The hours `[start, start + len]`, truncated at the end of the horizon
    pub fn window_inclusive(&self, start: Hour, len: usize) -> Range<Hour> {
        self.window(start, len + 1)
    }

    /// Whether the hours `[start, start + len]` extend beyond the end of the horizon
    pub fn overruns(&self, start: Hour, len: usize) -> bool {
        start + len >= self.num_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn previous_hour() {
        let horizon = Horizon::new(24);
        assert_eq!(horizon.previous(0), None);
        assert_eq!(horizon.previous(1), Some(0));
        assert_eq!(horizon.previous(23), Some(22));
    }

    #[rstest]
    #[case(0, 2, 0..2)]
    #[case(10, 4, 10..14)]
    #[case(20, 4, 20..24)]
    #[case(22, 2, 22..24)]
    #[case(22, 4, 22..24)]
    #[case(23, 8, 23..24)]
    fn window_is_truncated(#[case] start: Hour, #[case] len: usize, #[case] expected: Range<Hour>) {
        assert_eq!(Horizon::new(24).window(start, len), expected);
    }

    #[rstest]
    #[case(0, 2, 0..3, false)]
    #[case(20, 3, 20..24, false)]
    #[case(21, 2, 21..24, false)]
    #[case(22, 2, 22..24, true)]
    fn window_inclusive_is_truncated(
        #[case] start: Hour,
        #[case] len: usize,
        #[case] expected: Range<Hour>,
        #[case] overruns: bool,
    ) {
        let horizon = Horizon::new(24);
        assert_eq!(horizon.window_inclusive(start, len), expected);
        assert_eq!(horizon.overruns(start, len), overruns);
    }

    #[test]
    #[should_panic(expected = "outside the horizon")]
    fn window_outside_horizon() {
        Horizon::new(24).window(24, 1);
    }
}
