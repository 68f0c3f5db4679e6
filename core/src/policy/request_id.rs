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
use http::header::HeaderName;
use http::HeaderValue;
use uuid::Uuid;

use crate::{Context, Next, Policy, Result};

/// Header correlating client logs with service logs.
pub const CLIENT_REQUEST_ID: HeaderName = HeaderName::from_static("x-ms-client-request-id");

/// ClientRequestIdPolicy tags every logical request with a random id.
///
/// Runs before the retry stage so that all attempts share the same id. A
/// request that already carries the header keeps it.
#[derive(Debug, Clone)]
pub struct ClientRequestIdPolicy {
    header: HeaderName,
}

impl Default for ClientRequestIdPolicy {
    fn default() -> Self {
        Self {
            header: CLIENT_REQUEST_ID,
        }
    }
}

impl ClientRequestIdPolicy {
    /// Create a policy writing [`CLIENT_REQUEST_ID`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another header name.
    pub fn with_header(mut self, header: HeaderName) -> Self {
        self.header = header;
        self
    }
}

#[async_trait]
impl Policy for ClientRequestIdPolicy {
    fn name(&self) -> &'static str {
        "client_request_id"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        if !req.headers().contains_key(&self.header) {
            let id = Uuid::new_v4().to_string();
            req.headers_mut()
                .insert(self.header.clone(), HeaderValue::from_str(&id)?);
        }

        next.run(ctx, req).await
    }
}
