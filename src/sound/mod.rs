//! Sound playback for the Pomodoro Timer.
//!
//! This module provides:
//!
//! - One-shot completion chimes and looping ambient sounds
//! - A dedicated audio thread so callers never block on audio
//! - Synthesized fallback tones when a chime file is missing
//! - Graceful degradation when audio is unavailable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   crossbeam   ┌──────────────────┐
//! │   SoundWorker    │──────────────▶│ RodioSoundPlayer │
//! │ (Send + Sync)    │   commands    │  (audio thread)  │
//! └──────────────────┘               └──────────────────┘
//!          ▲
//!          │ SoundSource
//! ┌──────────────────┐
//! │   SoundLibrary   │ ← <sounds_dir>/<name>.ogg or tone
//! └──────────────────┘
//! ```

mod error;
mod player;
mod source;
mod worker;

pub use error::SoundError;
pub use player::{RodioSoundPlayer, LOOP_FADE_IN};
pub use source::{SoundLibrary, SoundSource, SOUND_EXTENSION};
pub use worker::{try_spawn_worker, SoundWorker};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for sound playback implementations.
///
/// Allows the rodio-backed player, the audio-thread handle and the test
/// mock to be used interchangeably.
pub trait SoundPlayer {
    /// Plays a one-shot sound in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails.
    fn play(&self, source: &SoundSource) -> Result<(), SoundError>;

    /// Starts looping a sound, replacing any current loop.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails.
    fn play_loop(&self, source: &SoundSource) -> Result<(), SoundError>;

    /// Stops the current loop, if any.
    fn stop(&self);

    /// Returns true if the audio system is available.
    fn is_available(&self) -> bool;

    /// Returns true if sound playback is disabled.
    fn is_disabled(&self) -> bool;

    /// Enables sound playback.
    fn enable(&self);

    /// Disables sound playback.
    fn disable(&self);
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        RodioSoundPlayer::play(self, source)
    }

    fn play_loop(&self, source: &SoundSource) -> Result<(), SoundError> {
        RodioSoundPlayer::play_loop(self, source)
    }

    fn stop(&self) {
        RodioSoundPlayer::stop(self)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_disabled(&self) -> bool {
        RodioSoundPlayer::is_disabled(self)
    }

    fn enable(&self) {
        RodioSoundPlayer::enable(self)
    }

    fn disable(&self) {
        RodioSoundPlayer::disable(self)
    }
}

impl<T: SoundPlayer + ?Sized> SoundPlayer for Arc<T> {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        (**self).play(source)
    }

    fn play_loop(&self, source: &SoundSource) -> Result<(), SoundError> {
        (**self).play_loop(source)
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn is_disabled(&self) -> bool {
        (**self).is_disabled()
    }

    fn enable(&self) {
        (**self).enable()
    }

    fn disable(&self) {
        (**self).disable()
    }
}

/// Mock sound player for testing.
#[derive(Debug, Default)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<SoundSource>>,
    loop_calls: Mutex<Vec<SoundSource>>,
    stop_calls: AtomicUsize,
    available: AtomicBool,
    disabled: AtomicBool,
    should_fail: AtomicBool,
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.lock().unwrap().len()
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<SoundSource> {
        self.play_calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn loop_count(&self) -> usize {
        self.loop_calls.lock().unwrap().len()
    }

    #[must_use]
    pub fn get_loop_calls(&self) -> Vec<SoundSource> {
        self.loop_calls.lock().unwrap().clone()
    }

    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) {
        self.play_calls.lock().unwrap().clear();
        self.loop_calls.lock().unwrap().clear();
        self.stop_calls.store(0, Ordering::SeqCst);
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::StreamError("Mock failure".to_string()));
        }
        if self.disabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.play_calls.lock().unwrap().push(source.clone());
        Ok(())
    }

    fn play_loop(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::StreamError("Mock failure".to_string()));
        }
        if self.disabled.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.loop_calls.lock().unwrap().push(source.clone());
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }
}
