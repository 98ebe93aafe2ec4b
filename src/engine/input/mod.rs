// Input handling system
//
// Hosts deliver input as named events (`keydown`, `pointerdown`, ...).
// Handlers subscribe to an event kind and are removed by id or by kind.
//
// - `event`: the event record handed to handlers
// - `listener`: the subscription table

pub mod event;
pub mod listener;

// Re-export commonly used types
pub use event::Event;
pub use listener::{ListenerId, ListenerRegistry};
