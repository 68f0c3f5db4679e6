// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Core components of the reqpipe request pipeline.
//!
//! This crate provides the building blocks every client of a cloud service
//! needs to talk HTTP reliably: a chain of policies wrapping a transport,
//! retries with backoff, authentication, diagnostics and paged listings.
//!
//! ## Overview
//!
//! - [`Context`] carries the pluggable runtime pieces: HTTP transport,
//!   environment, timer and diagnostic listener.
//! - [`Policy`] is one stage of the chain, [`Pipeline`] the ordered chain.
//! - [`RetryPolicy`] retries transient failures with exponential backoff.
//! - [`BearerTokenPolicy`] authenticates requests with tokens loaded by a
//!   [`ProvideCredential`].
//! - [`Pager`] walks paged listings lazily by continuation token.
//! - [`DiagnosticScope`] names a logical operation and records its outcome.
//!
//! ## Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use reqpipe_core::{Context, Pipeline, PipelineOptions, Result};
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let options = PipelineOptions::default()
//!     .from_env(&ctx)?
//!     .with_application_id("my-app");
//! let pipeline = Pipeline::builder(ctx).with_options(options).build()?;
//!
//! let req = http::Request::get("https://vault.example.com/secrets/db?api-version=7.4")
//!     .body(Bytes::new())?;
//! let _secret: serde_json::Value = pipeline.send_json("SecretClient.GetSecret", req).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Traits
//!
//! - [`HttpSend`]: For sending HTTP requests
//! - [`Env`]: For environment variable access
//! - [`Sleep`]: For waiting between attempts
//! - [`DiagnosticListener`]: For receiving operation scopes
//! - [`Policy`]: For adding a stage to the pipeline
//! - [`ProvideCredential`]: For loading credentials from various sources
//! - [`SigningCredential`]: For validating credentials

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod diagnostics;
pub mod policy;
pub mod request;
pub mod utils;

mod context;
pub use context::{
    Context, Env, HttpSend, NoopEnv, NoopHttpSend, NoopSleep, OsEnv, Sleep, StaticEnv,
};
mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{Next, Policy, ProvideCredential, SigningCredential};
mod credential;
pub use credential::AccessToken;
mod provide_credential;
pub use provide_credential::{
    EnvTokenProvider, ProvideCredentialChain, StaticTokenProvider, REQPIPE_ACCESS_TOKEN,
    REQPIPE_ACCESS_TOKEN_EXPIRES_ON,
};

mod options;
pub use options::{
    PipelineOptions, RetryMode, RetryOptions, REQPIPE_APPLICATION_ID, REQPIPE_DISABLE_TELEMETRY,
    REQPIPE_MAX_RETRIES, REQPIPE_RETRY_DELAY_MS, REQPIPE_RETRY_JITTER, REQPIPE_RETRY_MAX_DELAY_MS,
    REQPIPE_RETRY_MODE,
};
mod pipeline;
pub use pipeline::{check_status, Pipeline, PipelineBuilder};
mod pager;
pub use pager::{next_link_pager, DecodePage, FetchPage, Page, Pager};

pub use diagnostics::{DiagnosticListener, DiagnosticScope, LogListener, ScopeOutcome};
pub use policy::{
    BearerTokenPolicy, ClientRequestIdPolicy, DiagnosticsPolicy, HeadersPolicy, LoggingPolicy,
    RetryCount, RetryPolicy, TransportPolicy, UserAgentPolicy,
};
