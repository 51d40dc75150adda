// Use cases layer: session drivers and the transports that reach them.

pub mod arena;
pub mod chapter;
pub mod registry;
pub mod transport;
pub mod types;

pub use arena::Arena;
pub use chapter::{ChapterConfig, ChapterSession, Objective};
pub use registry::{ArenaError, ArenaHandle, ArenaRegistry, ArenaSettings};
pub use transport::{ArenaTransport, LocalTransport, Transport, TransportError};
pub use types::{ArenaEvent, ChapterCommand, Intent, MatchStatus, WorldUpdate};
