//! Dedicated audio thread.
//!
//! The rodio output stream is not `Send`, so the player lives on its own OS
//! thread and receives commands over a `crossbeam-channel`. Sending never
//! blocks; playback errors are logged on the audio thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};
use tracing::{debug, warn};

use super::error::SoundError;
use super::player::RodioSoundPlayer;
use super::source::SoundSource;
use super::SoundPlayer;

#[derive(Debug)]
enum SoundCommand {
    Play(SoundSource),
    PlayLoop(SoundSource),
    Stop,
    Shutdown,
}

/// Thread-safe handle to a player running on the audio thread.
pub struct SoundWorker {
    tx: Sender<SoundCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
    disabled: AtomicBool,
}

impl SoundWorker {
    /// Spawns the audio thread with a rodio player on the default device.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be started or no audio device
    /// is available.
    pub fn spawn() -> Result<Self, SoundError> {
        Self::spawn_with(|| RodioSoundPlayer::new(false))
    }

    /// Spawns the audio thread with a player built by `factory` on that thread.
    ///
    /// # Errors
    ///
    /// Returns the factory's error, or an error if the thread cannot start.
    pub fn spawn_with<F, P>(factory: F) -> Result<Self, SoundError>
    where
        F: FnOnce() -> Result<P, SoundError> + Send + 'static,
        P: SoundPlayer + 'static,
    {
        let (tx, rx) = unbounded::<SoundCommand>();
        let (ready_tx, ready_rx) = bounded::<Result<(), SoundError>>(1);

        let handle = thread::Builder::new()
            .name("pomodoro-audio".to_string())
            .spawn(move || {
                let player = match factory() {
                    Ok(player) => {
                        let _ = ready_tx.send(Ok(()));
                        player
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                for command in rx {
                    debug!("オーディオコマンド: {:?}", command);
                    let result = match command {
                        SoundCommand::Play(source) => player.play(&source),
                        SoundCommand::PlayLoop(source) => player.play_loop(&source),
                        SoundCommand::Stop => {
                            player.stop();
                            Ok(())
                        }
                        SoundCommand::Shutdown => break,
                    };
                    if let Err(e) = result {
                        warn!("サウンド再生に失敗しました: {} ({})", e, e.suggestion());
                    }
                }
                player.stop();
            })
            .map_err(|e| SoundError::StreamError(e.to_string()))?;

        ready_rx.recv().map_err(|_| SoundError::WorkerStopped)??;

        Ok(Self {
            tx,
            handle: Mutex::new(Some(handle)),
            disabled: AtomicBool::new(false),
        })
    }

    fn send(&self, command: SoundCommand) -> Result<(), SoundError> {
        self.tx.send(command).map_err(|_| SoundError::WorkerStopped)
    }

    /// Stops the audio thread and waits for it to finish queued commands.
    pub fn shutdown(&self) {
        let _ = self.send(SoundCommand::Shutdown);
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("オーディオスレッドが異常終了しました");
            }
        }
    }
}

impl SoundPlayer for SoundWorker {
    fn play(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.is_disabled() {
            return Ok(());
        }
        self.send(SoundCommand::Play(source.clone()))
    }

    fn play_loop(&self, source: &SoundSource) -> Result<(), SoundError> {
        if self.is_disabled() {
            return Ok(());
        }
        self.send(SoundCommand::PlayLoop(source.clone()))
    }

    fn stop(&self) {
        let _ = self.send(SoundCommand::Stop);
    }

    fn is_available(&self) -> bool {
        self.handle
            .lock()
            .map(|handle| handle.is_some())
            .unwrap_or(false)
    }

    fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
        self.stop();
    }
}

impl Drop for SoundWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SoundWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundWorker")
            .field("disabled", &self.is_disabled())
            .finish_non_exhaustive()
    }
}

/// Spawns an audio worker, returning `None` if audio is unavailable.
#[must_use]
pub fn try_spawn_worker() -> Option<SoundWorker> {
    match SoundWorker::spawn() {
        Ok(worker) => Some(worker),
        Err(e) => {
            warn!("オーディオが利用できないためサウンドを無効にします: {}", e);
            None
        }
    }
}
