// Interface adapters: the wire protocol plus implementations of the domain ports.

pub mod audio;
pub mod clock;
pub mod http;
pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;
