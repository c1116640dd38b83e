//! Declarative HTTP client layer.
//!
//! Turns a client-capability definition plus call parameters into one
//! concrete outbound request (URL substitution, auth injection, body
//! shaping), and turns the response back into a value via path extraction
//! and field mapping. Building is pure; only the transport does I/O.

pub mod errors;
pub mod extract;
pub mod request;
pub mod runner;
pub mod transport;

pub use errors::HttpFlowError;
pub use extract::{apply_field_map, extract_path};
pub use request::{build_request, PreparedRequest};
pub use runner::{CallReport, ClientRunner};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
