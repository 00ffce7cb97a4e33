//! Sound source resolution.
//!
//! Sounds live in a single directory as `<name>.ogg`. Completion chimes fall
//! back to a synthesized tone when their file is missing; looping sounds are
//! skipped instead.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::timer::{Chime, LoopSound};

/// File extension of bundled sounds.
pub const SOUND_EXTENSION: &str = "ogg";

/// Represents the source of a sound to be played.
#[derive(Debug, Clone, PartialEq)]
pub enum SoundSource {
    /// An audio file on disk.
    File {
        /// The name of the sound (e.g., "bell").
        name: String,
        /// The full path to the sound file.
        path: PathBuf,
    },
    /// A synthesized sine tone.
    Tone {
        /// The name of the sound this tone stands in for.
        name: String,
        /// Frequency in Hz.
        frequency: f32,
        /// Length in milliseconds.
        duration_ms: u64,
    },
}

impl SoundSource {
    /// Creates a new file sound source.
    #[must_use]
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::File {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Creates a new tone sound source.
    #[must_use]
    pub fn tone(name: impl Into<String>, frequency: f32, duration_ms: u64) -> Self {
        Self::Tone {
            name: name.into(),
            frequency,
            duration_ms,
        }
    }

    /// Returns the name of the sound source.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Tone { name, .. } => name,
        }
    }

    /// Returns true if this is a file on disk.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Returns true if this is a synthesized tone.
    #[must_use]
    pub fn is_tone(&self) -> bool {
        matches!(self, Self::Tone { .. })
    }

    /// Returns the file path if this is a file sound.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Tone { .. } => None,
        }
    }
}

/// Fallback tone for a chime whose file is missing.
fn fallback_tone(chime: Chime) -> SoundSource {
    match chime {
        Chime::Bell => SoundSource::tone(chime.name(), 880.0, 600),
        Chime::LoudBell => SoundSource::tone(chime.name(), 1320.0, 1200),
    }
}

/// Maps sound names to files in a sounds directory.
#[derive(Debug, Clone)]
pub struct SoundLibrary {
    dir: PathBuf,
}

impl SoundLibrary {
    /// Creates a library rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the sounds directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the expected file path for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, SOUND_EXTENSION))
    }

    fn existing(&self, name: &str) -> Option<SoundSource> {
        let path = self.path_for(name);
        path.is_file().then(|| SoundSource::file(name, path))
    }

    /// Resolves a completion chime, falling back to a tone.
    #[must_use]
    pub fn resolve_chime(&self, chime: Chime) -> SoundSource {
        self.existing(chime.name()).unwrap_or_else(|| {
            debug!("{} が見つからないため合成音で代替します", chime.name());
            fallback_tone(chime)
        })
    }

    /// Resolves a looping sound; `None` when its file is missing.
    #[must_use]
    pub fn resolve_loop(&self, sound: LoopSound) -> Option<SoundSource> {
        let source = self.existing(sound.name());
        if source.is_none() {
            warn!(
                "ループサウンドが見つかりません: {}",
                self.path_for(sound.name()).display()
            );
        }
        source
    }

    /// Lists the sound names present in the directory, sorted.
    #[must_use]
    pub fn discover(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(SOUND_EXTENSION))
            })
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}
