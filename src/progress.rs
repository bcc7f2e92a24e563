// src/progress.rs
// =============================================================================
// Verbose-mode progress line on stderr.
//
//   URLs Found:    42		 Pages Processed:    17		 Queue:     5
//
// The line is redrawn in place with '\r', at most every REDRAW_INTERVAL, and
// a final redraw plus the elapsed time is printed when the crawl finishes.
// When verbose mode is off nothing is printed.
// =============================================================================

use std::time::{Duration, Instant};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub found: usize,
    pub processed: usize,
    pub queued: usize,
}

pub struct Progress {
    enabled: bool,
    started: Instant,
    last_draw: Option<Instant>,
    latest: Counters,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
            last_draw: None,
            latest: Counters::default(),
        }
    }

    /// Records the latest counters and redraws if enough time has passed
    pub fn update(&mut self, counters: Counters) {
        self.latest = counters;
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let due = self
            .last_draw
            .map_or(true, |last| now.duration_since(last) >= REDRAW_INTERVAL);
        if due {
            self.last_draw = Some(now);
            eprint!("\r{}", render(&counters));
        }
    }

    /// Prints the final counters and how long the crawl took
    pub fn finish(&self) -> Duration {
        let elapsed = self.started.elapsed();
        if self.enabled {
            eprintln!("\r{}", render(&self.latest));
            eprintln!("Time finished sitemap {:?}", elapsed);
        }
        elapsed
    }
}

fn render(counters: &Counters) -> String {
    format!(
        "URLs Found: {:5}\t\t Pages Processed: {:5}\t\t Queue: {:5}",
        counters.found, counters.processed, counters.queued
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let line = render(&Counters {
            found: 12,
            processed: 3,
            queued: 4,
        });
        assert_eq!(
            line,
            "URLs Found:    12\t\t Pages Processed:     3\t\t Queue:     4"
        );
    }

    #[test]
    fn test_disabled_still_tracks_counters() {
        let mut progress = Progress::new(false);
        let counters = Counters {
            found: 5,
            processed: 2,
            queued: 1,
        };
        progress.update(counters);
        assert_eq!(progress.latest, counters);
    }
}
