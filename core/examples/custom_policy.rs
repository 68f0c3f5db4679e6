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

//! Build a pipeline with a custom policy and walk a paged listing, all
//! against an in-memory service.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqpipe_core::{
    Context, HttpSend, Next, Page, Pager, Pipeline, PipelineOptions, Policy, Result,
};

/// A fake listing service answering `?page=N` with three pages of numbers.
/// The first call of every page fails with 503 to show the retry stage at work.
#[derive(Debug, Default)]
struct InMemoryService {
    calls: AtomicUsize,
}

#[async_trait]
impl HttpSend for InMemoryService {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 0 {
            return Ok(http::Response::builder()
                .status(503)
                .header("retry-after-ms", "5")
                .body(Bytes::new())?);
        }

        let page = req
            .uri()
            .query()
            .and_then(|q| q.strip_prefix("page="))
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(0);
        let next = if page < 2 {
            format!(",\"next\":\"{}\"", page + 1)
        } else {
            String::new()
        };
        let body = format!("{{\"values\":[{},{}]{next}}}", page * 2, page * 2 + 1);

        Ok(http::Response::builder()
            .status(200)
            .header("x-api-version", req.headers()["x-api-version"].clone())
            .body(Bytes::from(body))?)
    }
}

/// Stamp every request with the api version of the service.
#[derive(Debug)]
struct ApiVersion(&'static str);

#[async_trait]
impl Policy for ApiVersion {
    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        req.headers_mut()
            .insert("x-api-version", http::HeaderValue::from_static(self.0));
        next.run(ctx, req).await
    }
}

#[derive(Debug, serde::Deserialize)]
struct Numbers {
    values: Vec<u64>,
    next: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let ctx = Context::new().with_http_send(InMemoryService::default());
    let pipeline = Pipeline::builder(ctx)
        .with_options(PipelineOptions::default().with_application_id("numbers-example"))
        .with_per_call_policy(ApiVersion("2024-05-01"))
        .build()?;

    let pager = Pager::new(move |token: Option<String>| {
        let pipeline = pipeline.clone();
        async move {
            let uri = match token {
                Some(page) => format!("https://numbers.example.com/list?page={page}"),
                None => "https://numbers.example.com/list".to_string(),
            };
            let req = http::Request::get(uri).body(Bytes::new())?;
            let list: Numbers = pipeline.send_json("NumbersClient.List", req).await?;
            Ok::<_, reqpipe_core::Error>(Page::new(list.values, list.next))
        }
    });

    let values = pager.collect_items().await?;
    println!("values: {values:?}");
    Ok(())
}
