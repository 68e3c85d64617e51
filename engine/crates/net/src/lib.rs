pub mod channels;
pub mod output_router;
pub mod rate_limiter;
pub mod server;
pub mod telnet;

pub use channels::{Outbound, OutputTx};
pub use server::{ServerChannels, SessionLink};
pub use telnet::LineEvent;
