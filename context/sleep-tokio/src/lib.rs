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

//! Tokio-based timer for reqpipe.
//!
//! This crate provides `TokioSleep`, which implements the `Sleep` trait from
//! `reqpipe_core` with [`tokio::time::sleep`]. The retry stage uses it to
//! wait between attempts.
//!
//! ## Example
//!
//! ```no_run
//! use reqpipe_core::{Context, OsEnv, Pipeline};
//! use reqpipe_sleep_tokio::TokioSleep;
//!
//! # fn example() -> reqpipe_core::Result<()> {
//! let ctx = Context::new().with_sleep(TokioSleep).with_env(OsEnv);
//!
//! // Backoff delays between retries are now real.
//! let _pipeline = Pipeline::builder(ctx).build()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqpipe_core::Sleep;

/// Tokio-based implementation of the `Sleep` trait.
///
/// Must be used from within a tokio runtime with the timer enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await
    }
}
