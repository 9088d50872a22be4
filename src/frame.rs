use std::time::{Duration, Instant};

/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    pub time: f32,
    pub delta: f32,
}

impl FrameInfo {
    pub fn new(number: u64, time: f32, delta: f32) -> Self {
        Self { number, time, delta }
    }
}

#[derive(Debug, Clone, Copy)]
enum Clock {
    Wall { start: Instant, last: Instant },
    Fixed { step: f32 },
}

/// Infinite iterator that yields frame information
/// Use this in a loop: `for frame in frames.take(n) { ... }`
///
/// The wall clock variant measures real elapsed time. The fixed variant
/// advances by a constant step, for reproducible headless runs.
#[derive(Debug, Clone)]
pub struct FrameIterator {
    frame_number: u64,
    elapsed: f32,
    clock: Clock,
}

impl FrameIterator {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_number: 0,
            elapsed: 0.0,
            clock: Clock::Wall {
                start: now,
                last: now,
            },
        }
    }

    /// Every frame advances time by exactly `step`
    pub fn with_fixed_delta(step: Duration) -> Self {
        Self {
            frame_number: 0,
            elapsed: 0.0,
            clock: Clock::Fixed {
                step: step.as_secs_f32(),
            },
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn time(&self) -> f32 {
        match self.clock {
            Clock::Wall { start, .. } => start.elapsed().as_secs_f32(),
            Clock::Fixed { .. } => self.elapsed,
        }
    }
}

impl Default for FrameIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FrameIterator {
    type Item = FrameInfo;

    fn next(&mut self) -> Option<FrameInfo> {
        let (time, delta) = match &mut self.clock {
            Clock::Wall { start, last } => {
                let now = Instant::now();
                let delta = now.duration_since(*last).as_secs_f32();
                *last = now;
                (now.duration_since(*start).as_secs_f32(), delta)
            }
            Clock::Fixed { step } => {
                // the first frame has no predecessor
                let delta = if self.frame_number == 0 { 0.0 } else { *step };
                (self.elapsed + delta, delta)
            }
        };

        let info = FrameInfo::new(self.frame_number, time, delta);

        self.frame_number += 1;
        self.elapsed = time;

        Some(info)
    }
}
