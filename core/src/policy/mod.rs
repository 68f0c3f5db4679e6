//! Built-in pipeline stages.

mod transport;
pub use transport::TransportPolicy;

mod request_id;
pub use request_id::{ClientRequestIdPolicy, CLIENT_REQUEST_ID};

mod user_agent;
pub use user_agent::UserAgentPolicy;

mod headers;
pub use headers::HeadersPolicy;

mod diagnostics;
pub use diagnostics::DiagnosticsPolicy;

mod logging;
pub use logging::LoggingPolicy;

mod retry;
pub use retry::{RetryCount, RetryPolicy};

mod bearer_token;
pub use bearer_token::BearerTokenPolicy;
