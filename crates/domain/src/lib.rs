//! # aquaria-domain
//!
//! Pure domain model for the aquaria aquarium controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Sensors** (named reading sources, built-in or helper-backed)
//! - Define **Devices** (on/off actuators with manual overrides)
//! - Define **Conditions** (sensor + operator + range → desired state)
//! - Hold the in-memory **Registry** of sensors and devices
//! - Decide desired device states with the **Evaluator**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod condition;
pub mod device;
pub mod evaluator;
pub mod registry;
pub mod sensor;
