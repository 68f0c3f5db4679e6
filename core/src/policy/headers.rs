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
use http::HeaderMap;

use crate::{Context, Next, Policy, Result};

/// HeadersPolicy adds a fixed set of headers, such as the service api version.
///
/// Headers already present on the request win.
#[derive(Debug, Clone, Default)]
pub struct HeadersPolicy {
    headers: HeaderMap,
}

impl HeadersPolicy {
    /// Create a policy adding `headers`.
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }
}

#[async_trait]
impl Policy for HeadersPolicy {
    fn name(&self) -> &'static str {
        "headers"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        for (name, value) in &self.headers {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }

        next.run(ctx, req).await
    }
}
