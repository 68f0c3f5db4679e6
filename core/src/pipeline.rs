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

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::diagnostics::OperationName;
use crate::policy::{
    ClientRequestIdPolicy, DiagnosticsPolicy, HeadersPolicy, LoggingPolicy, RetryPolicy,
    TransportPolicy, UserAgentPolicy,
};
use crate::{Context, Error, Next, PipelineOptions, Policy, Result};

/// Pipeline is the ordered chain of policies every request of a client goes through.
///
/// The chain is assembled as:
///
/// 1. client request id, user agent, headers, then caller per-call policies
/// 2. diagnostics scope
/// 3. retry
/// 4. caller per-retry policies (authentication usually lives here)
/// 5. logging
/// 6. transport
///
/// Stages before the retry stage run once per logical request, the others
/// once per attempt. Cloning a pipeline is cheap.
#[derive(Clone)]
pub struct Pipeline {
    ctx: Context,
    policies: Arc<[Arc<dyn Policy>]>,
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("ctx", &self.ctx)
            .field("policies", &self.policy_names())
            .finish()
    }
}

impl Pipeline {
    /// Start building a pipeline on top of `ctx`.
    pub fn builder(ctx: Context) -> PipelineBuilder {
        PipelineBuilder {
            ctx,
            options: PipelineOptions::default(),
            per_call: Vec::new(),
            per_retry: Vec::new(),
        }
    }

    /// Build a pipeline from an explicit list of policies.
    ///
    /// The last policy must answer without forwarding, like [`TransportPolicy`].
    pub fn from_policies(ctx: Context, policies: Vec<Arc<dyn Policy>>) -> Self {
        Self {
            ctx,
            policies: policies.into(),
        }
    }

    /// Get the context of this pipeline.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Get the policies of this pipeline, transport included.
    pub fn policies(&self) -> &[Arc<dyn Policy>] {
        &self.policies
    }

    /// Get the names of the stages in order.
    pub fn policy_names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    /// Send a request through the chain.
    ///
    /// Non-success statuses are not errors here, see [`check_status`].
    pub async fn send(&self, mut req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Next::new(&self.policies).run(&self.ctx, &mut req).await
    }

    /// Send a request tagged with the name of the logical operation it belongs to.
    pub async fn send_operation(
        &self,
        name: &str,
        mut req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>> {
        req.extensions_mut().insert(OperationName(name.to_string()));
        self.send(req).await
    }

    /// Send a request, fail on non-success statuses and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        name: &str,
        req: http::Request<Bytes>,
    ) -> Result<T> {
        let resp = check_status(self.send_operation(name, req).await?)?;
        Ok(serde_json::from_slice(resp.body())?)
    }
}

/// Turn a non-success response into a [`crate::ErrorKind::ServiceError`].
pub fn check_status(resp: http::Response<Bytes>) -> Result<http::Response<Bytes>> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(Error::service(resp.status(), resp.body()))
    }
}

/// PipelineBuilder assembles a [`Pipeline`].
#[derive(Debug)]
pub struct PipelineBuilder {
    ctx: Context,
    options: PipelineOptions,
    per_call: Vec<Arc<dyn Policy>>,
    per_retry: Vec<Arc<dyn Policy>>,
}

impl PipelineBuilder {
    /// Replace the options.
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a policy running once per logical request, before the retry stage.
    pub fn with_per_call_policy(mut self, policy: impl Policy) -> Self {
        self.per_call.push(Arc::new(policy));
        self
    }

    /// Add a policy running on every attempt, after the retry stage.
    pub fn with_per_retry_policy(mut self, policy: impl Policy) -> Self {
        self.per_retry.push(Arc::new(policy));
        self
    }

    /// Assemble the pipeline, validating options.
    pub fn build(self) -> Result<Pipeline> {
        let options = self.options;
        let mut policies: Vec<Arc<dyn Policy>> = Vec::with_capacity(
            self.per_call.len() + self.per_retry.len() + 7,
        );

        policies.push(Arc::new(ClientRequestIdPolicy::new()));
        policies.push(Arc::new(UserAgentPolicy::new(
            options.application_id.as_deref(),
            options.telemetry,
        )?));
        if !options.headers.is_empty() {
            policies.push(Arc::new(HeadersPolicy::new(options.headers.clone())));
        }
        policies.extend(self.per_call);

        if options.diagnostics {
            policies.push(Arc::new(DiagnosticsPolicy::new(
                options.logged_query_params.clone(),
            )));
        }
        policies.push(Arc::new(RetryPolicy::new(options.retry.clone())?));
        policies.extend(self.per_retry);
        policies.push(Arc::new(LoggingPolicy::new(
            options.logged_query_params.clone(),
        )));
        policies.push(Arc::new(TransportPolicy));

        Ok(Pipeline::from_policies(self.ctx, policies))
    }
}
