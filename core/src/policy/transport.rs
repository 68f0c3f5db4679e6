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

use crate::request::clone_request;
use crate::{Context, Next, Policy, Result};

/// TransportPolicy is the terminal stage: it hands the request to the
/// [`crate::HttpSend`] configured on the [`Context`].
///
/// It never forwards, so any policy placed after it is unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportPolicy;

#[async_trait]
impl Policy for TransportPolicy {
    fn name(&self) -> &'static str {
        "transport"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        _next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        ctx.http_send(clone_request(req)).await
    }
}
