//! Courier — single-shot message dispatcher.
//!
//! Sends exactly one outbound message to a messaging platform, either
//! through a pre-authorized webhook URL or through the platform's
//! authenticated chat API, then classifies any failure into retryable
//! versus fatal categories for the calling execution framework.
//!
//! Three entry points are exposed to the framework:
//! - [`dispatch::Dispatcher::invoke`] — validate, resolve, send
//! - [`dispatch::Dispatcher::on_error`] — classify a prior failure
//! - [`handler::halt`] — graceful-shutdown acknowledgment
//!
//! No entity outlives a single invocation: no queues, no persistence,
//! no cross-call state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod auth;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod logging;
