//! Log display buffer with scroll-position-aware auto-follow.
//!
//! New lines keep the viewport pinned to the bottom until the user scrolls
//! away, at which point appends continue silently and a "jump to latest"
//! affordance appears. Programmatic scrolls are latched for the duration of
//! the scroll animation so the scroll-detection logic does not misread them
//! as the user scrolling away.

use std::time::{Duration, Instant};

/// Distance from the bottom still counted as "at the bottom".
pub const BOTTOM_THRESHOLD_PX: f32 = 10.0;

/// How long a programmatic smooth scroll is assumed to take.
pub const SCROLL_ANIMATION: Duration = Duration::from_millis(600);

/// Viewport metrics reported by the host on scroll events.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub client_height: f32,
}

impl Viewport {
    /// Pixels between the current position and the maximum scroll offset.
    pub fn distance_from_bottom(&self) -> f32 {
        (self.scroll_height - self.client_height - self.scroll_top).max(0.0)
    }

    /// Whether the viewport counts as scrolled to the bottom.
    pub fn is_at_bottom(&self) -> bool {
        self.distance_from_bottom() <= BOTTOM_THRESHOLD_PX
    }
}

/// Append-only log buffer plus follow state.
#[derive(Debug)]
pub struct LogViewer {
    lines: Vec<String>,
    auto_follow: bool,
    programmatic_until: Option<Instant>,
    show_jump_to_latest: bool,
}

impl Default for LogViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogViewer {
    /// Create an empty viewer following the bottom.
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            auto_follow: true,
            programmatic_until: None,
            show_jump_to_latest: false,
        }
    }

    /// The buffered lines, in arrival order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether new lines keep the viewport pinned to the bottom.
    pub fn auto_follow(&self) -> bool {
        self.auto_follow
    }

    /// Whether the "jump to latest" affordance should be shown.
    pub fn show_jump_to_latest(&self) -> bool {
        self.show_jump_to_latest
    }

    /// Whether a programmatic scroll is still animating at `now`.
    pub fn is_programmatic_scroll(&self, now: Instant) -> bool {
        matches!(self.programmatic_until, Some(until) if now < until)
    }

    /// Append a line. Returns `true` when the host should scroll the
    /// viewport to the bottom.
    pub fn push_line(&mut self, line: impl Into<String>) -> bool {
        self.lines.push(line.into());
        self.auto_follow
    }

    /// Record a programmatic scroll-to-bottom, re-enabling auto-follow and
    /// latching scroll detection for the animation window.
    pub fn scroll_to_bottom(&mut self, now: Instant) {
        self.programmatic_until = Some(now + SCROLL_ANIMATION);
        self.auto_follow = true;
        self.show_jump_to_latest = false;
    }

    /// React to a scroll event. Events inside the programmatic-scroll window
    /// are ignored; user scrolls recompute auto-follow from the distance to
    /// the bottom.
    pub fn on_user_scroll(&mut self, viewport: Viewport, now: Instant) {
        if self.is_programmatic_scroll(now) {
            return;
        }
        self.auto_follow = viewport.is_at_bottom();
        self.show_jump_to_latest = !self.auto_follow;
    }

    /// Empty the buffer. The underlying stream is unaffected.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_bottom() -> Viewport {
        Viewport {
            scroll_top: 900.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        }
    }

    fn scrolled_away() -> Viewport {
        Viewport {
            scroll_top: 200.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        }
    }

    #[test]
    fn test_lines_append_in_order_with_auto_follow() {
        let mut viewer = LogViewer::new();
        let now = Instant::now();

        for line in ["start", "step 1", "step 2", "done"] {
            assert!(viewer.push_line(line), "auto-follow should request scroll");
            viewer.scroll_to_bottom(now);
        }

        assert_eq!(viewer.lines(), ["start", "step 1", "step 2", "done"]);
        assert!(viewer.auto_follow());
        assert!(!viewer.show_jump_to_latest());
    }

    #[test]
    fn test_scrolling_away_stops_forced_scroll_but_keeps_appending() {
        let mut viewer = LogViewer::new();
        let now = Instant::now();

        viewer.push_line("start");
        viewer.push_line("step 1");

        // User scrolls up between step 1 and step 2
        viewer.on_user_scroll(scrolled_away(), now);
        assert!(!viewer.auto_follow());
        assert!(viewer.show_jump_to_latest());

        assert!(!viewer.push_line("step 2"), "must not force a scroll");
        assert!(!viewer.push_line("done"));
        assert_eq!(viewer.len(), 4);
    }

    #[test]
    fn test_scrolling_back_to_bottom_resumes_follow() {
        let mut viewer = LogViewer::new();
        let now = Instant::now();

        viewer.on_user_scroll(scrolled_away(), now);
        assert!(!viewer.auto_follow());

        viewer.on_user_scroll(at_bottom(), now);
        assert!(viewer.auto_follow());
        assert!(!viewer.show_jump_to_latest());
    }

    #[test]
    fn test_programmatic_scroll_not_misread_as_user_scroll() {
        let mut viewer = LogViewer::new();
        let now = Instant::now();

        viewer.scroll_to_bottom(now);
        assert!(viewer.is_programmatic_scroll(now));

        // Mid-animation the viewport is not at the bottom yet; this must not
        // disable auto-follow
        viewer.on_user_scroll(scrolled_away(), now + Duration::from_millis(100));
        assert!(viewer.auto_follow());
        assert!(!viewer.show_jump_to_latest());

        // Once the animation window has passed, scrolls count again
        let later = now + SCROLL_ANIMATION + Duration::from_millis(1);
        assert!(!viewer.is_programmatic_scroll(later));
        viewer.on_user_scroll(scrolled_away(), later);
        assert!(!viewer.auto_follow());
    }

    #[test]
    fn test_bottom_threshold() {
        let near = Viewport {
            scroll_top: 890.5,
            scroll_height: 1500.0,
            client_height: 600.0,
        };
        assert!(near.is_at_bottom(), "within 10px counts as bottom");

        let far = Viewport {
            scroll_top: 880.0,
            scroll_height: 1500.0,
            client_height: 600.0,
        };
        assert!(!far.is_at_bottom());
    }

    #[test]
    fn test_clear_empties_buffer_only() {
        let mut viewer = LogViewer::new();
        viewer.push_line("start");
        viewer.push_line("step 1");

        viewer.clear();
        assert!(viewer.is_empty());

        // A still-open stream keeps delivering
        assert!(viewer.push_line("step 2"));
        assert_eq!(viewer.lines(), ["step 2"]);
    }

    #[test]
    fn test_jump_to_latest_resets_state() {
        let mut viewer = LogViewer::new();
        let now = Instant::now();

        viewer.on_user_scroll(scrolled_away(), now);
        assert!(viewer.show_jump_to_latest());

        viewer.scroll_to_bottom(now);
        assert!(viewer.auto_follow());
        assert!(!viewer.show_jump_to_latest());
        assert!(viewer.is_programmatic_scroll(now + Duration::from_millis(599)));
    }
}
