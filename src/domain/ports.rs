// Ports the simulation drivers depend on; adapters provide the implementations.

/// Millisecond time source used to stamp shots, hits, spawns and effect expiry.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Sound effects derived from simulation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Shot,
    Hit,
    Explosion,
    TankDestroyed,
    PowerupCollected,
    AbilityActivated,
    MissionWon,
    MissionLost,
}

/// Audio output owned by a session. Playback must not block the tick.
pub trait AudioSink: Send + Sync {
    fn play(&self, cue: SoundCue);
}

/// Discards every cue; the default for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioSink for SilentAudio {
    fn play(&self, _cue: SoundCue) {}
}
