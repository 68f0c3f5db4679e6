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

//! Composable HTTP request pipeline for service client SDKs.
//!
//! `reqpipe` re-exports everything from `reqpipe-core` and, with the
//! `default-context` feature (on by default), a ready to use context backed
//! by reqwest, the tokio timer and the process environment.
//!
//! ```no_run
//! use bytes::Bytes;
//! use reqpipe::{default_pipeline, DefaultContext, PipelineOptions};
//!
//! # async fn example() -> reqpipe::Result<()> {
//! let pipeline = default_pipeline(DefaultContext::new(), PipelineOptions::default())?;
//!
//! let req = http::Request::get("https://config.example.com/kv?api-version=1.0")
//!     .body(Bytes::new())?;
//! let resp = pipeline.send_operation("ConfigClient.ListSettings", req).await?;
//! println!("{}", resp.status());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use reqpipe_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::{default_pipeline, DefaultContext};
