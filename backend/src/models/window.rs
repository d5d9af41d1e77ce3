use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One scheduled patrol slot, half-open `[start, end)`.
///
/// Windows tile a shift from its start time in steps of the route frequency;
/// they are not clamped to the shift end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open containment: `start <= t < end`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Index of the window covering `t` on the grid anchored at `shift_start`.
///
/// Callers guarantee `frequency_minutes > 0`.
pub fn window_index(shift_start: DateTime<Utc>, frequency_minutes: i64, t: DateTime<Utc>) -> i64 {
    debug_assert!(frequency_minutes > 0);
    let offset_secs = (t - shift_start).num_seconds();
    offset_secs.div_euclid(frequency_minutes * 60)
}

/// The window covering `t` on the grid anchored at `shift_start`.
pub fn window_covering(
    shift_start: DateTime<Utc>,
    frequency_minutes: i64,
    t: DateTime<Utc>,
) -> Window {
    let index = window_index(shift_start, frequency_minutes, t);
    let frequency = Duration::minutes(frequency_minutes);
    let start = shift_start + frequency * index as i32;
    Window::new(start, start + frequency)
}

/// Unbounded walk of the window grid from `shift_start`. Callers bound it
/// with `take_while` on `window.start`.
pub fn windows_from(
    shift_start: DateTime<Utc>,
    frequency_minutes: i64,
) -> impl Iterator<Item = Window> {
    debug_assert!(frequency_minutes > 0);
    let frequency = Duration::minutes(frequency_minutes);
    (0i32..).map(move |i| {
        let start = shift_start + frequency * i;
        Window::new(start, start + frequency)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_window_index_grid() {
        let shift_start = t(8, 0);
        assert_eq!(window_index(shift_start, 120, t(8, 0)), 0);
        assert_eq!(window_index(shift_start, 120, t(9, 59)), 0);
        assert_eq!(window_index(shift_start, 120, t(10, 0)), 1);
        assert_eq!(window_index(shift_start, 120, t(15, 30)), 3);
    }

    #[test]
    fn test_window_covering_bounds() {
        let w = window_covering(t(8, 0), 120, t(10, 17));
        assert_eq!(w.start, t(10, 0));
        assert_eq!(w.end, t(12, 0));
        assert_eq!(w.duration(), Duration::minutes(120));
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let w = Window::new(t(10, 0), t(12, 0));
        assert!(w.contains(t(10, 0)));
        assert!(w.contains(t(11, 59)));
        assert!(!w.contains(t(12, 0)));
        assert!(!w.contains(t(9, 59)));
    }

    #[test]
    fn test_windows_from_tiles_contiguously() {
        let windows: Vec<Window> = windows_from(t(8, 0), 180).take(3).collect();
        assert_eq!(windows[0].start, t(8, 0));
        assert_eq!(windows[0].end, t(11, 0));
        assert_eq!(windows[1].start, t(11, 0));
        assert_eq!(windows[2].start, t(14, 0));
    }
}
