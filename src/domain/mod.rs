// Domain layer: core simulation types and rules.

pub mod catalog;
pub mod errors;
pub mod math;
pub mod ports;
pub mod state;
pub mod systems;
pub mod tuning;

pub use catalog::TankKind;
pub use errors::CatalogError;
pub use ports::{AudioSink, Clock, SilentAudio, SoundCue};
pub use state::{
    BlockSnapshot, EnemySnapshot, EntityId, MapBounds, PlayerInput, PowerupSnapshot,
    ProjectileSnapshot, TankSnapshot,
};
pub use tuning::enemy::Difficulty;
