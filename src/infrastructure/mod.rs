pub mod http_transport;
#[cfg(any(test, feature = "testing"))]
pub mod scripted_transport;

pub use http_transport::{GeminiTransport, RawResponse, Transport};
#[cfg(any(test, feature = "testing"))]
pub use scripted_transport::{candidates_body, ScriptedTransport};
