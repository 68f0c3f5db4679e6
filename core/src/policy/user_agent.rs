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

use async_trait::async_trait;
use bytes::Bytes;
use http::header::USER_AGENT;
use http::HeaderValue;

use crate::{Context, Error, Next, Policy, Result};

/// Application ids longer than this are truncated.
const MAX_APPLICATION_ID_LEN: usize = 24;

/// UserAgentPolicy identifies the client to the service.
///
/// The value looks like `myapp reqpipe/0.1.0 (linux; x86_64)`. With telemetry
/// disabled only the application id is sent. An existing `User-Agent` is kept
/// and ours is appended to it.
#[derive(Debug, Clone)]
pub struct UserAgentPolicy {
    value: Option<HeaderValue>,
}

impl UserAgentPolicy {
    /// Build the user agent from an optional application id.
    ///
    /// Fails with `ConfigInvalid` if the id can't be carried in a header.
    pub fn new(application_id: Option<&str>, telemetry: bool) -> Result<Self> {
        let application_id = application_id
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| v.chars().take(MAX_APPLICATION_ID_LEN).collect::<String>());

        let telemetry = telemetry.then(|| {
            format!(
                "reqpipe/{} ({}; {})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS,
                std::env::consts::ARCH
            )
        });

        let value = match (application_id, telemetry) {
            (Some(app), Some(t)) => Some(format!("{app} {t}")),
            (Some(app), None) => Some(app),
            (None, t) => t,
        };

        let value = value
            .map(|v| {
                HeaderValue::from_str(&v).map_err(|e| {
                    Error::config_invalid(format!("user agent {v:?} is not a valid header"))
                        .with_source(e)
                })
            })
            .transpose()?;

        Ok(Self { value })
    }

    /// The value appended to `User-Agent`, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
impl Policy for UserAgentPolicy {
    fn name(&self) -> &'static str {
        "user_agent"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        if let Some(value) = &self.value {
            let value = match req.headers().get(USER_AGENT) {
                Some(existing) => {
                    let mut combined = existing.as_bytes().to_vec();
                    combined.push(b' ');
                    combined.extend_from_slice(value.as_bytes());
                    HeaderValue::from_bytes(&combined)?
                }
                None => value.clone(),
            };
            req.headers_mut().insert(USER_AGENT, value);
        }

        next.run(ctx, req).await
    }
}
