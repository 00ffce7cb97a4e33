//! Sound player implementation using rodio.
//!
//! `RodioSoundPlayer` owns the audio output stream, which cannot leave the
//! thread that created it. Use [`super::SoundWorker`] to drive it from async
//! code.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rodio::source::SineWave;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use super::error::SoundError;
use super::source::SoundSource;

/// Fade-in applied to looping sounds.
pub const LOOP_FADE_IN: Duration = Duration::from_millis(1500);

/// Amplitude of synthesized tones.
const TONE_AMPLITUDE: f32 = 0.25;

/// A sound player that uses rodio for audio playback.
///
/// One-shot sounds are detached and play to completion. At most one looping
/// sound is held at a time; starting another replaces it.
pub struct RodioSoundPlayer {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
    /// Sink of the current looping sound.
    loop_sink: Mutex<Option<Sink>>,
    /// Whether sound playback is disabled.
    disabled: AtomicBool,
}

impl RodioSoundPlayer {
    /// Creates a new sound player on the default output device.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new(disabled: bool) -> Result<Self, SoundError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
            loop_sink: Mutex::new(None),
            disabled: AtomicBool::new(disabled),
        })
    }

    fn new_sink(&self) -> Result<Sink, SoundError> {
        Sink::try_new(&self.stream_handle).map_err(|e| SoundError::StreamError(e.to_string()))
    }

    fn open(path: &Path) -> Result<BufReader<File>, SoundError> {
        let file = File::open(path)
            .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        Ok(BufReader::new(file))
    }

    /// Plays a one-shot sound in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded, or no sink
    /// can be created.
    pub fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.is_disabled() {
            debug!("Sound playback disabled, skipping");
            return Ok(());
        }

        let sink = self.new_sink()?;
        match source {
            SoundSource::File { path, name } => {
                debug!("Playing sound file: {}", name);
                let decoder = Decoder::new(Self::open(path)?)
                    .map_err(|e| SoundError::DecodeError(e.to_string()))?;
                sink.append(decoder);
            }
            SoundSource::Tone {
                name,
                frequency,
                duration_ms,
            } => {
                debug!("Playing tone for {}: {}Hz", name, frequency);
                sink.append(
                    SineWave::new(*frequency)
                        .take_duration(Duration::from_millis(*duration_ms))
                        .amplify(TONE_AMPLITUDE),
                );
            }
        }
        sink.detach();
        Ok(())
    }

    /// Starts looping `source`, replacing any current loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded.
    pub fn play_loop(&self, source: &SoundSource) -> Result<(), SoundError> {
        self.stop();
        if self.is_disabled() {
            return Ok(());
        }

        let sink = self.new_sink()?;
        match source {
            SoundSource::File { path, name } => {
                debug!("Looping sound file: {}", name);
                let decoder = Decoder::new_looped(Self::open(path)?)
                    .map_err(|e| SoundError::DecodeError(e.to_string()))?;
                sink.append(decoder.fade_in(LOOP_FADE_IN));
            }
            SoundSource::Tone { frequency, .. } => {
                sink.append(
                    SineWave::new(*frequency)
                        .amplify(TONE_AMPLITUDE)
                        .fade_in(LOOP_FADE_IN),
                );
            }
        }

        if let Ok(mut current) = self.loop_sink.lock() {
            *current = Some(sink);
        }
        Ok(())
    }

    /// Stops the current loop, if any.
    pub fn stop(&self) {
        if let Ok(mut current) = self.loop_sink.lock() {
            if let Some(sink) = current.take() {
                sink.stop();
                debug!("Loop sound stopped");
            }
        }
    }

    /// Returns true if a loop is currently held.
    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.loop_sink
            .lock()
            .map(|current| current.is_some())
            .unwrap_or(false)
    }

    /// Returns true if sound playback is currently disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Enables sound playback.
    pub fn enable(&self) {
        self.disabled.store(false, Ordering::Relaxed);
        debug!("Sound playback enabled");
    }

    /// Disables sound playback and stops the current loop.
    pub fn disable(&self) {
        self.disabled.store(true, Ordering::Relaxed);
        self.stop();
        debug!("Sound playback disabled");
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("disabled", &self.is_disabled())
            .field("looping", &self.is_looping())
            .finish_non_exhaustive()
    }
}
