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

use reqpipe_core::{Context, OsEnv, Pipeline, PipelineOptions, Result};
use reqpipe_http_send_reqwest::ReqwestHttpSend;
use reqpipe_sleep_tokio::TokioSleep;
use reqwest::Client;

/// DefaultContext wires reqwest, the tokio timer and the process environment.
#[derive(Debug, Default, Clone)]
pub struct DefaultContext {
    client: Client,
}

impl DefaultContext {
    /// Create a default context with a fresh reqwest client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a default context on top of an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Build the [`Context`].
    pub fn into_context(self) -> Context {
        Context::new()
            .with_http_send(ReqwestHttpSend::new(self.client))
            .with_sleep(TokioSleep)
            .with_env(OsEnv)
    }
}

impl From<DefaultContext> for Context {
    fn from(value: DefaultContext) -> Self {
        value.into_context()
    }
}

/// Build the standard pipeline on top of `ctx`.
///
/// `options` are overridden by the `REQPIPE_*` environment variables.
pub fn default_pipeline(ctx: impl Into<Context>, options: PipelineOptions) -> Result<Pipeline> {
    let ctx = ctx.into();
    let options = options.from_env(&ctx)?;
    Pipeline::builder(ctx).with_options(options).build()
}
