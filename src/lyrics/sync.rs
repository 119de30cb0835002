//! Lyrics sync clock.
//!
//! A two-state machine: IDLE (no session) and ACTIVE (a session holding the
//! parsed lines for one song). While active, a 100ms tick maps the estimated
//! playback position to the highest line whose timestamp has passed and
//! publishes that line plus the following one. A song with no synced lyrics
//! leaves the clock idle with an explicitly empty publication.

use super::parser::LyricLine;

/// The published current/next line pair. Both empty when idle or before the
/// first timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinePair {
    pub current: String,
    pub next: String,
}

#[derive(Debug)]
struct Session {
    lines: Vec<LyricLine>,
    current: Option<usize>,
}

#[derive(Debug, Default)]
pub struct SyncClock {
    session: Option<Session>,
}

impl SyncClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start a session over `lines`. An empty line set keeps the clock
    /// idle, which is the explicit no-lyrics state.
    pub fn activate(&mut self, lines: Vec<LyricLine>) {
        self.session = if lines.is_empty() {
            None
        } else {
            Some(Session { lines, current: None })
        };
    }

    pub fn reset(&mut self) {
        self.session = None;
    }

    /// Advance to `position` seconds. Returns a new publication only when the
    /// active line index moved forward; `None` means nothing to update. The
    /// index never moves backwards within a session, so a position rollback
    /// (seek back, hub timestamp jitter) cannot republish an earlier line.
    pub fn tick(&mut self, position: f64) -> Option<LinePair> {
        let session = self.session.as_mut()?;

        let mut index = None;
        for (i, line) in session.lines.iter().enumerate() {
            if line.time <= position {
                index = Some(i);
            } else {
                break;
            }
        }
        let index = index?;
        if session.current.is_some_and(|current| index <= current) {
            return None;
        }
        session.current = Some(index);

        Some(LinePair {
            current: session.lines[index].text.clone(),
            next: session
                .lines
                .get(index + 1)
                .map(|l| l.text.clone())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<LyricLine> {
        vec![
            LyricLine { time: 5.0, text: "one".into() },
            LyricLine { time: 10.0, text: "two".into() },
            LyricLine { time: 15.0, text: "three".into() },
        ]
    }

    #[test]
    fn idle_until_activated() {
        let mut clock = SyncClock::new();
        assert!(!clock.is_active());
        assert_eq!(clock.tick(100.0), None);
    }

    #[test]
    fn empty_lines_leave_clock_idle() {
        let mut clock = SyncClock::new();
        clock.activate(Vec::new());
        assert!(!clock.is_active());
    }

    #[test]
    fn publishes_current_and_next_on_index_change() {
        let mut clock = SyncClock::new();
        clock.activate(lines());

        assert_eq!(clock.tick(1.0), None); // before first stamp
        assert_eq!(
            clock.tick(5.0),
            Some(LinePair { current: "one".into(), next: "two".into() })
        );
        assert_eq!(clock.tick(6.0), None); // same line, no re-publication
        assert_eq!(
            clock.tick(12.0),
            Some(LinePair { current: "two".into(), next: "three".into() })
        );
    }

    #[test]
    fn position_rollback_does_not_move_index_backwards() {
        let mut clock = SyncClock::new();
        clock.activate(lines());

        assert_eq!(
            clock.tick(12.0),
            Some(LinePair { current: "two".into(), next: "three".into() })
        );
        assert_eq!(clock.tick(6.0), None);
        // Moving forward again resumes from where the session left off.
        assert_eq!(
            clock.tick(16.0),
            Some(LinePair { current: "three".into(), next: String::new() })
        );
    }

    #[test]
    fn last_line_publishes_empty_next() {
        let mut clock = SyncClock::new();
        clock.activate(lines());
        assert_eq!(
            clock.tick(60.0),
            Some(LinePair { current: "three".into(), next: String::new() })
        );
    }

    #[test]
    fn reset_clears_session() {
        let mut clock = SyncClock::new();
        clock.activate(lines());
        clock.reset();
        assert!(!clock.is_active());
        assert_eq!(clock.tick(60.0), None);
    }
}
