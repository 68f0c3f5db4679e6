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

//! Scripted stand-ins for the outside world.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqpipe_core::diagnostics::ScopeInfo;
use reqpipe_core::request::clone_request;
use reqpipe_core::{
    Context, DiagnosticListener, Error, HttpSend, Result, ScopeOutcome, Sleep, StaticEnv,
};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// MockHttpSend answers with queued responses and records every request.
#[derive(Debug, Clone, Default)]
pub struct MockHttpSend {
    responses: Arc<Mutex<VecDeque<Result<http::Response<Bytes>>>>>,
    requests: Arc<Mutex<Vec<http::Request<Bytes>>>>,
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, headers: &[(&str, &str)], body: &str) -> Self {
        let mut resp = http::Response::builder().status(status);
        for (k, v) in headers {
            resp = resp.header(*k, *v);
        }
        let resp = resp.body(Bytes::copy_from_slice(body.as_bytes())).unwrap();
        self.responses.lock().unwrap().push_back(Ok(resp));
        self
    }

    pub fn fail(self, err: Error) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<http::Request<Bytes>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(clone_request)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.requests.lock().unwrap().push(req);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::unexpected("no scripted response left")))
    }
}

/// RecordingSleep returns immediately and remembers the requested delays.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleep {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleep {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleep for RecordingSleep {
    async fn sleep(&self, dur: Duration) {
        self.delays.lock().unwrap().push(dur);
    }
}

/// RecordingListener keeps every closed scope.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    ended: Arc<Mutex<Vec<(ScopeInfo, ScopeOutcome)>>>,
}

impl RecordingListener {
    pub fn ended(&self) -> Vec<(ScopeInfo, ScopeOutcome)> {
        self.ended.lock().unwrap().clone()
    }
}

impl DiagnosticListener for RecordingListener {
    fn on_start(&self, _: &ScopeInfo) {}

    fn on_end(&self, scope: &ScopeInfo, outcome: &ScopeOutcome, _: Duration) {
        self.ended
            .lock()
            .unwrap()
            .push((scope.clone(), outcome.clone()));
    }
}

/// Build a context around the given transport, with an empty environment.
pub fn context(http: MockHttpSend, sleep: RecordingSleep) -> Context {
    Context::new()
        .with_http_send(http)
        .with_sleep(sleep)
        .with_env(StaticEnv::default())
}

pub fn get(uri: &str) -> http::Request<Bytes> {
    http::Request::get(uri).body(Bytes::new()).unwrap()
}
