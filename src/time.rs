//! Frame timing.
//!
//! The frame counter drives the automatic camera orbit, and elapsed time is
//! fed to the particle kernel as `time`. Pausing freezes both.
//!
//! # Example
//!
//! ```
//! use metaball_particles::time::Time;
//!
//! let mut time = Time::new();
//! time.update();
//! assert_eq!(time.frame(), 1);
//! ```

use std::time::{Duration, Instant};

const FPS_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Time tracking for the render loop.
#[derive(Debug)]
pub struct Time {
    start: Instant,
    /// Seconds since start minus paused time, as of the last update.
    elapsed_secs: f32,
    /// Total unpaused frames since start.
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    /// Set while paused.
    paused_at: Option<Instant>,
    pause_elapsed: Duration,
}

impl Time {
    /// Create a new time tracker starting from now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            start: now,
            elapsed_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            paused_at: None,
            pause_elapsed: Duration::ZERO,
        }
    }

    /// Advance one frame. Does nothing while paused.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    fn update_at(&mut self, now: Instant) {
        if self.is_paused() {
            return;
        }

        let running = now.duration_since(self.start).saturating_sub(self.pause_elapsed);
        self.elapsed_secs = running.as_secs_f32();
        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= FPS_UPDATE_INTERVAL {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }
    }

    /// Seconds since start, excluding pauses.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Total unpaused frames since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    fn pause_at(&mut self, now: Instant) {
        self.paused_at.get_or_insert(now);
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    fn resume_at(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.pause_elapsed += now.duration_since(paused_at);
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_time_new() {
        let time = Time::new();
        assert_eq!(time.frame(), 0);
        assert_eq!(time.elapsed(), 0.0);
        assert!(!time.is_paused());
    }

    #[test]
    fn test_update_counts_frames() {
        let t0 = Instant::now();
        let mut time = Time::starting_at(t0);
        time.update_at(t0 + secs(1));
        time.update_at(t0 + secs(2));

        assert_eq!(time.frame(), 2);
        assert!((time.elapsed() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_paused_updates_change_nothing() {
        let t0 = Instant::now();
        let mut time = Time::starting_at(t0);
        time.update_at(t0 + secs(1));

        time.pause_at(t0 + secs(1));
        time.update_at(t0 + secs(5));

        assert!(time.is_paused());
        assert_eq!(time.frame(), 1);
        assert!((time.elapsed() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_time_before_pause_keypress_still_counts() {
        let t0 = Instant::now();
        let mut time = Time::starting_at(t0);
        time.update_at(t0 + secs(1));

        // Two unrendered seconds pass before the pause
        time.pause_at(t0 + secs(3));
        time.resume_at(t0 + secs(5));
        time.update_at(t0 + secs(6));

        assert!(!time.is_paused());
        assert!((time.elapsed() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_repeated_pause_keeps_first_instant() {
        let t0 = Instant::now();
        let mut time = Time::starting_at(t0);
        time.pause_at(t0 + secs(1));
        time.pause_at(t0 + secs(2));
        time.resume_at(t0 + secs(4));
        time.update_at(t0 + secs(4));

        assert!((time.elapsed() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fps_refreshes_after_interval() {
        let t0 = Instant::now();
        let mut time = Time::starting_at(t0);
        for ms in [100, 200, 300, 400, 500] {
            time.update_at(t0 + Duration::from_millis(ms));
        }
        assert!((time.fps() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_toggle_pause() {
        let mut time = Time::new();
        time.toggle_pause();
        assert!(time.is_paused());
        time.toggle_pause();
        assert!(!time.is_paused());
    }
}
