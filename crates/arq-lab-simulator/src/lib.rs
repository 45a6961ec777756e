//! Sender-side simulation of four ARQ flow-control disciplines.
//!
//! - [`window`]: per-protocol window state machines
//! - [`channel`]: loopback medium with optional loss and latency
//! - [`timer`]: discrete-event timeouts
//! - [`session`]: drives one protocol run: send, tick, close
//! - [`event`] / [`trace`]: what happened, for printing and JSON reports
//! - [`scenario_runner`]: scripted TOML runs with assertions

pub mod channel;
pub mod event;
pub mod scenario_runner;
pub mod session;
pub mod timer;
pub mod trace;
pub mod window;

pub use channel::{Channel, ChannelStats, LoopbackChannel, ManualChannel, Receiver, Transmitter};
pub use event::SessionEvent;
pub use session::{Session, SessionError};
pub use timer::{TimerHandle, TimerService};
pub use trace::{SessionReport, SessionStats, TraceEntry};
pub use window::{AckOutcome, WindowController, WindowSnapshot};
