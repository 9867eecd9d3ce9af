//! Run observation: typed transition events and a broadcast hub.
//!
//! The scheduler reports every run and step transition as an
//! [`ExecutionEvent`] published through an [`EventHub`]. Subscribing yields
//! an [`EventStream`]; dropping the stream unsubscribes. Late subscribers see
//! only what is published after they attach.

pub mod event;
pub mod hub;

pub use event::{EventKind, ExecutionEvent};
pub use hub::{BlockingEventIter, EventHub, EventStream};
