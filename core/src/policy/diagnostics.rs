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

use super::{RetryCount, CLIENT_REQUEST_ID};
use crate::diagnostics::{DiagnosticScope, OperationName};
use crate::request::redact_query;
use crate::{Context, Error, Next, Policy, Result};

/// Header set by the service to identify the request on its side.
const SERVICE_REQUEST_ID: &str = "x-ms-request-id";

/// DiagnosticsPolicy opens one [`DiagnosticScope`] per logical request.
///
/// It runs before the retry stage, so the scope covers every attempt. The
/// scope is named after the [`OperationName`] extension, or `METHOD /path`.
/// Responses with a status of 400 and above close the scope as failed.
#[derive(Debug, Clone)]
pub struct DiagnosticsPolicy {
    allowed_query_params: Vec<String>,
}

impl DiagnosticsPolicy {
    /// Create a policy logging the values of `allowed_query_params` only.
    pub fn new(allowed_query_params: Vec<String>) -> Self {
        Self {
            allowed_query_params,
        }
    }
}

#[async_trait]
impl Policy for DiagnosticsPolicy {
    fn name(&self) -> &'static str {
        "diagnostics"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        let name = match req.extensions().get::<OperationName>() {
            Some(OperationName(name)) => name.clone(),
            None => format!("{} {}", req.method(), req.uri().path()),
        };

        let allowed = self
            .allowed_query_params
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();

        let mut scope = DiagnosticScope::start(ctx, name);
        scope.add_attribute("http.method", req.method());
        scope.add_attribute("http.url", redact_query(req.uri(), &allowed));
        if let Some(id) = req
            .headers()
            .get(CLIENT_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
        {
            scope.add_attribute("client.request_id", id);
        }

        let result = next.run(ctx, req).await;

        let retries = req
            .extensions()
            .get::<RetryCount>()
            .map(|c| c.0)
            .unwrap_or_default();
        scope.add_attribute("retry.count", retries);

        match &result {
            Ok(resp) => {
                scope.add_attribute("http.status_code", resp.status().as_u16());
                if let Some(id) = resp
                    .headers()
                    .get(SERVICE_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                {
                    scope.add_attribute("service.request_id", id);
                }

                if resp.status().as_u16() >= 400 {
                    scope.fail(&Error::service(resp.status(), resp.body()));
                } else {
                    scope.succeed();
                }
            }
            Err(err) => scope.fail(err),
        }

        result
    }
}
