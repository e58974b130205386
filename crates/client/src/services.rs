//! Host-side collaborators for a headless session.

use engine_core::services::Audio;

/// Audio that only logs what it would play.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingAudio;

impl Audio for LoggingAudio {
    fn play_sound(&mut self, sound: i32) {
        tracing::debug!(sound, "play sound");
    }

    fn stop_sound(&mut self, sound: i32) {
        tracing::debug!(sound, "stop sound");
    }

    fn play_music(&mut self, track: i32) {
        tracing::debug!(track, "play music");
    }

    fn stop_music(&mut self) {
        tracing::debug!("stop music");
    }
}
