mod env;
pub use env::{EnvTokenProvider, REQPIPE_ACCESS_TOKEN, REQPIPE_ACCESS_TOKEN_EXPIRES_ON};

mod static_provider;
pub use static_provider::StaticTokenProvider;

mod chain;
pub use chain::ProvideCredentialChain;
