//! # aquaria-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Acquirer`: non-blocking sensor acquisition through helpers
//!   - `Actuator`: drive a device to a new state
//!   - `TickLog`: per-tick sample sink
//! - Define **driving/inbound** use-cases:
//!   - `Scheduler`: refresh sensors, evaluate devices, actuate changes, log
//!   - `control`: client-driven overrides
//! - Orchestrate domain objects without knowing *how* helpers or sockets work
//!
//! ## Dependency rule
//! Depends on `aquaria-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod control;
pub mod ports;
pub mod scheduler;
