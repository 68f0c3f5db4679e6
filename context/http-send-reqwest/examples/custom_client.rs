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

use bytes::Bytes;
use reqpipe_core::{Context, OsEnv, Pipeline, PipelineOptions, Result, RetryOptions};
use reqpipe_http_send_reqwest::ReqwestHttpSend;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Create a custom reqwest client with specific configuration
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| reqpipe_core::Error::config_invalid("failed to build client").with_source(e))?;

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::new(client))
        .with_env(OsEnv);

    // Without a timer configured retries happen back to back, keep them few.
    let options = PipelineOptions::default()
        .from_env(&ctx)?
        .with_application_id("custom-client")
        .with_retry(RetryOptions {
            max_retries: 1,
            ..RetryOptions::default()
        });
    let pipeline = Pipeline::builder(ctx).with_options(options).build()?;

    let test_url = "https://httpbin.org/get";
    println!("Testing pipeline with GET {test_url}");

    let req = http::Request::builder()
        .method("GET")
        .uri(test_url)
        .header("X-Test-Header", "reqpipe-example")
        .body(Bytes::new())?;

    match pipeline.send_operation("Example.Get", req).await {
        Ok(resp) => {
            println!("Response status: {}", resp.status());
            for (name, value) in resp.headers() {
                println!("  {name}: {value:?}");
            }
            println!("\n{}", String::from_utf8_lossy(resp.body()));
        }
        Err(e) => eprintln!("Request failed: {e}"),
    }

    Ok(())
}
