//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (recorded on the span, echoed in the response)
//!
//! Authentication is an extractor, not a layer: handlers that need a staff
//! principal take [`RequireStaff`].

pub mod auth;
pub mod request_id;

pub use auth::RequireStaff;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
