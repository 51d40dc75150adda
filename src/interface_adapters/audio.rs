use crate::domain::ports::{AudioSink, SoundCue};
use tracing::debug;

/// Server-side audio: there are no speakers, so cues become debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudio;

impl AudioSink for TracingAudio {
    fn play(&self, cue: SoundCue) {
        debug!(?cue, "sound cue");
    }
}
