//! Front-end server for the pinbridge gateway.
//!
//! Accepts command batches and directory listings over HTTP and hands them
//! to the [`Dispatcher`](pinbridge_hardware::Dispatcher).
//!
//! # Endpoints
//!
//! | Method | Path | Body | Success |
//! |--------|------|------|---------|
//! | `POST` | `/` | `{"id": "front-door", "commands": ["HOME", "OPEN"]}` | `200 {"status": "ok"}` |
//! | `GET` | `/` | none | `200 {"id": ["front-door", "mux-1"]}` |
//!
//! Failures answer `{"error": "<message>"}` with the status listed on
//! [`RequestError::status`].
//!
//! # Example
//!
//! ```no_run
//! use pinbridge_network::{bind, serve, shutdown_signal};
//! # use pinbridge_hardware::Dispatcher;
//!
//! # async fn example(dispatcher: Dispatcher) -> std::io::Result<()> {
//! let listener = bind(8000).await?;
//! serve(listener, dispatcher, shutdown_signal()).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod request;
mod server;

pub use error::RequestError;
pub use request::parse_request;
pub use server::{bind, router, serve, shutdown_signal};
