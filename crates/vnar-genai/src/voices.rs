//! Lazily populated voice catalog.
//!
//! The catalog is an explicit object handed to whichever stage needs it,
//! fetched from the speech service on first use and never invalidated. A
//! fetch failure falls back to the configured default voice so voice lookup
//! can never abort a run.

use tokio::sync::OnceCell;
use tracing::warn;

use crate::tts::{TtsClient, Voice};

/// Default voice used when no request is made or the catalog is unavailable.
pub const DEFAULT_VOICE: &str = "en-US-Standard-C";

/// Voice catalog with lazy population.
pub struct VoiceCatalog {
    default_voice: String,
    voices: OnceCell<Vec<Voice>>,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_VOICE)
    }
}

impl VoiceCatalog {
    /// Create a catalog with the given fallback voice.
    pub fn new(default_voice: impl Into<String>) -> Self {
        Self {
            default_voice: default_voice.into(),
            voices: OnceCell::new(),
        }
    }

    /// The fallback voice name.
    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    /// Resolve a requested voice against the service's catalog.
    ///
    /// Fetches the voice list on first use. Returns the requested voice if
    /// the service offers it, otherwise the default. When the list cannot be
    /// fetched the default is used too: an unverifiable voice must not be
    /// allowed to fail every synthesis call downstream.
    pub async fn resolve(&self, tts: &TtsClient, requested: Option<&str>) -> String {
        let requested = match requested {
            Some(name) if !name.is_empty() => name,
            _ => return self.default_voice.clone(),
        };

        match self.voices.get_or_try_init(|| tts.list_voices()).await {
            Ok(voices) => {
                if voices.iter().any(|v| v.name == requested) {
                    requested.to_string()
                } else {
                    warn!(
                        voice = requested,
                        fallback = %self.default_voice,
                        "requested voice not offered by the service"
                    );
                    self.default_voice.clone()
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %self.default_voice,
                    "voice list unavailable, falling back to the default voice"
                );
                self.default_voice.clone()
            }
        }
    }
}
