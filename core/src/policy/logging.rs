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

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;

use crate::request::redact_query;
use crate::utils::format_headers;
use crate::{Context, Next, Policy, Result};

/// LoggingPolicy logs every attempt that reaches the transport.
///
/// Request line and status are logged at `debug`, headers at `trace` with
/// secrets redacted. Query values not listed as allowed are hidden.
#[derive(Debug, Clone)]
pub struct LoggingPolicy {
    allowed_query_params: Vec<String>,
}

impl LoggingPolicy {
    /// Create a policy logging the values of `allowed_query_params` only.
    pub fn new(allowed_query_params: Vec<String>) -> Self {
        Self {
            allowed_query_params,
        }
    }
}

#[async_trait]
impl Policy for LoggingPolicy {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        let allowed = self
            .allowed_query_params
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();
        let url = redact_query(req.uri(), &allowed);
        let method = req.method().clone();

        log::debug!("sending {method} {url} ({} bytes)", req.body().len());
        log::trace!("request headers:{}", format_headers(req.headers()));

        let started = Instant::now();
        let result = next.run(ctx, req).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(resp) => {
                log::debug!(
                    "received {} for {method} {url} in {elapsed:?} ({} bytes)",
                    resp.status(),
                    resp.body().len()
                );
                log::trace!("response headers:{}", format_headers(resp.headers()));
            }
            Err(err) => log::debug!("{method} {url} failed after {elapsed:?}: {err}"),
        }

        result
    }
}
