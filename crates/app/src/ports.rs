//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod acquisition;
pub mod actuation;
pub mod tick_log;

pub use acquisition::{Acquirer, Acquisition};
pub use actuation::Actuator;
pub use tick_log::{NullTickLog, TickLog};
