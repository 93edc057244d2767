//! # aquaria-adapter-json-tcp
//!
//! Serves the registry to remote clients over plain TCP.
//!
//! ## Protocol
//!
//! A client writes one JSON object per request and reads one compact JSON
//! object followed by `\n` per response. Requests may be split across reads
//! or packed several per read; the connection stays open between them.
//!
//! ```text
//! → {"request":"get-sensor","name":"Temp"}
//! ← {"sensor":[{"name":"Temp","type":"temp","reading":{"value":297650000,"units":"uK"}}]}
//! → {"request":"set-device","name":"Heater","active":true,"expire":5}
//! ← {"device":[{"name":"Heater","active":false,"reason":{"input":"set","active":true,"expires":{"value":5000000,"units":"us"}}}]}
//! ```
//!
//! A malformed or unknown request is answered with `{}` and the connection
//! is closed.
//!
//! ## How it works
//!
//! - [`lexer`] splits the byte stream into JSON tokens without ever needing
//!   a whole document.
//! - [`decoder`] folds tokens into one [`RawRequest`] per top-level object.
//! - [`dispatch`] answers a [`Request`] from the registry.
//! - [`Server`] owns the registry and the scheduler and multiplexes ticks,
//!   new connections and inbound data on one task.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `aquaria-app` and `aquaria-domain`.

pub mod client;
pub mod decoder;
pub mod dispatch;
mod error;
pub mod lexer;
pub mod request;
pub mod response;
mod server;

pub use client::Client;
pub use decoder::{Decoder, RawRequest};
pub use error::{ClientError, ProtocolError};
pub use request::Request;
pub use response::Response;
pub use server::Server;
