// Network adapters for inbound sockets and the outbound remote transport.

pub mod client;
pub mod internal;
pub mod remote;

pub use client::{arena_ws_handler, chapter_ws_handler, spawn_arena_serializer};
pub use internal::{create_arena_handler, delete_arena_handler};
pub use remote::RemoteTransport;
