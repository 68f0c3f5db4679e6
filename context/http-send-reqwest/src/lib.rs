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

//! Reqwest-based transport for reqpipe.
//!
//! This crate provides `ReqwestHttpSend`, the terminal stage of a pipeline
//! implementing the `HttpSend` trait from `reqpipe_core` on top of a
//! [`reqwest::Client`].
//!
//! ## Example
//!
//! ```no_run
//! use reqpipe_core::{Context, OsEnv};
//! use reqpipe_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), reqwest::Error> {
//! let client = reqwest::Client::builder()
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//!
//! let ctx = Context::new()
//!     .with_http_send(ReqwestHttpSend::new(client))
//!     .with_env(OsEnv);
//! # Ok(())
//! # }
//! ```
//!
//! Failures that happen before a response is received (connect errors,
//! timeouts, broken bodies) are reported as `ErrorKind::Io` so that the retry
//! stage treats them as transient.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqpipe_core::{Error, HttpSend, Result};
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req).map_err(|e| {
            Error::request_invalid("failed to convert request for reqwest").with_source(e)
        })?;

        let resp = self.client.execute(req).await.map_err(map_send_error)?;
        let resp: http::Response<_> = resp.into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::io("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_builder() {
        return Error::request_invalid("failed to build request").with_source(err);
    }

    log::debug!("request failed before a response was received: {err}");
    let message = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "failed to connect"
    } else {
        "failed to send request"
    };
    Error::io(message).with_source(err)
}
