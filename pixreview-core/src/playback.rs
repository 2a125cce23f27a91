//! Play/pause state machine for stepping through a sequence of frames.
//!
//! The controller owns no timer. Arming the periodic advance hands out a
//! generation number; the caller schedules ticks tagged with it and feeds them
//! back through [`FramePlayback::on_timer`]. Any pause or re-arm bumps the
//! generation, so a tick that was already scheduled (or already queued) when
//! playback paused can never move the cursor.

use std::time::Duration;

/// Default interval between automatic frame advances.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// Cursor change the display must reflect: show frame `index` and move the
/// scrub control to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameUpdate {
    pub index: usize,
    pub scrub: usize,
}

impl FrameUpdate {
    fn at(index: usize) -> Self {
        Self { index, scrub: index }
    }
}

/// Timer instruction returned by transitions that arm or cancel the advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Cancel any scheduled tick, then schedule ticks every `delay` tagged `generation`.
    Arm { generation: u64, delay: Duration },
    /// Cancel any scheduled tick.
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("manual stepping is only available while paused")]
    NotPaused,
    #[error("no frames to play")]
    Empty,
}

/// Cursor, play/pause flag and timer generation for one frame sequence.
#[derive(Debug, Clone)]
pub struct FramePlayback {
    len: usize,
    cursor: usize,
    state: PlaybackState,
    delay: Duration,
    generation: u64,
}

impl FramePlayback {
    /// Creates a controller over `len` frames, Playing at frame 0.
    ///
    /// Returns the controller together with the initial display update and the
    /// first arm command. For an empty sequence the controller is inert: both
    /// are `None` and every transition is a no-op.
    pub fn start(len: usize, delay: Duration) -> (Self, Option<FrameUpdate>, Option<TimerCommand>) {
        let mut playback = Self {
            len,
            cursor: 0,
            state: PlaybackState::Playing,
            delay,
            generation: 0,
        };
        if len == 0 {
            return (playback, None, None);
        }
        let arm = playback.arm();
        (playback, Some(FrameUpdate::at(0)), Some(arm))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn arm(&mut self) -> TimerCommand {
        self.generation += 1;
        TimerCommand::Arm { generation: self.generation, delay: self.delay }
    }

    /// Playing → Paused cancels the advance; Paused → Playing re-arms it.
    pub fn toggle(&mut self) -> Option<TimerCommand> {
        if self.is_empty() {
            return None;
        }
        match self.state {
            PlaybackState::Playing => {
                self.state = PlaybackState::Paused;
                // Invalidate ticks that are already in flight.
                self.generation += 1;
                Some(TimerCommand::Cancel)
            }
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                Some(self.arm())
            }
        }
    }

    /// Moves the cursor by `delta` frames with wraparound. Paused only.
    pub fn step(&mut self, delta: isize) -> Result<FrameUpdate, PlaybackError> {
        if self.is_empty() {
            return Err(PlaybackError::Empty);
        }
        if self.state != PlaybackState::Paused {
            return Err(PlaybackError::NotPaused);
        }
        let len = self.len as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
        Ok(FrameUpdate::at(self.cursor))
    }

    /// Jumps to `index`, clamped to the last frame. Valid in either state.
    pub fn seek(&mut self, index: usize) -> Option<FrameUpdate> {
        if self.is_empty() {
            return None;
        }
        self.cursor = index.min(self.len - 1);
        Some(FrameUpdate::at(self.cursor))
    }

    /// Changes the advance interval; applies from the next arm on.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Handles a scheduled tick. Ticks from an older generation, or arriving
    /// while paused, are ignored.
    pub fn on_timer(&mut self, generation: u64) -> Option<FrameUpdate> {
        if self.is_empty() || self.state != PlaybackState::Playing || generation != self.generation {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.len;
        Some(FrameUpdate::at(self.cursor))
    }
}
