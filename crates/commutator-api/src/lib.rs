//! Commutator API Library
//!
//! HTTP handlers, the order intake pipeline, and application setup.

mod api_doc;
pub mod constants;
mod extractors;
mod handlers;
pub mod services;
pub mod setup;

pub mod error;
pub mod state;

// Re-exports
pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError};
pub use services::intake::{OrderIntake, OrderReceipt, OrderSubmission};
