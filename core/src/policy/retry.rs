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

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::RETRY_AFTER;
use http::HeaderMap;

use crate::request::clone_request;
use crate::{Context, Next, Policy, Result, RetryOptions};

/// Headers carrying a retry delay in milliseconds, checked in order.
const RETRY_AFTER_MS_HEADERS: &[&str] = &["retry-after-ms", "x-ms-retry-after-ms"];

/// Request extension recording how many retries the retry stage performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCount(pub u32);

/// RetryPolicy re-runs the rest of the chain on transient failures.
///
/// An attempt is retried when it fails with a retryable error (see
/// [`crate::Error::is_retryable`]) or when the response status is listed in
/// [`RetryOptions::retry_status_codes`]. Every attempt works on a fresh copy
/// of the request as this stage received it. Once attempts are exhausted the
/// last response or error is returned as is.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    options: RetryOptions,
}

impl RetryPolicy {
    /// Create a retry policy, validating the options.
    pub fn new(options: RetryOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Get the options of this policy.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }
}

#[async_trait]
impl Policy for RetryPolicy {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        let max_attempts = self.options.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            let mut attempt_req = clone_request(req);
            let result = next.run(ctx, &mut attempt_req).await;

            let (reason, hint) = match &result {
                Ok(resp) if self.options.retry_status_codes.contains(&resp.status()) => (
                    format!("status {}", resp.status()),
                    retry_after(resp.headers(), Utc::now()),
                ),
                Err(err) if err.is_retryable() => (err.to_string(), None),
                _ => return result,
            };

            if attempt >= max_attempts {
                log::warn!(
                    "{} {} still failing after {attempt} attempts: {reason}",
                    req.method(),
                    req.uri().path()
                );
                return result;
            }

            let delay = hint.unwrap_or_else(|| self.options.delay_for(attempt));
            log::warn!(
                "{} {} attempt {attempt}/{max_attempts} failed: {reason}, retrying in {delay:?}",
                req.method(),
                req.uri().path()
            );

            req.extensions_mut().insert(RetryCount(attempt));
            ctx.sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Read the delay requested by the service.
///
/// Millisecond headers win over `Retry-After`, which holds either seconds or
/// an HTTP date. A date in the past means retry now.
pub(crate) fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    for name in RETRY_AFTER_MS_HEADERS {
        let ms = headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(ms) = ms {
            return Some(Duration::from_millis(ms));
        }
    }

    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}
