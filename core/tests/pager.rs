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

mod common;

use bytes::Bytes;
use common::{get, MockHttpSend, RecordingListener, RecordingSleep};
use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use reqpipe_core::{next_link_pager, ErrorKind, Page, Pipeline, Result, RetryOptions};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SettingList {
    items: Vec<Setting>,
    #[serde(rename = "@nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Setting {
    key: String,
}

fn decode(body: &Bytes) -> Result<Page<Setting>> {
    let list: SettingList = serde_json::from_slice(body)?;
    Ok(Page::new(list.items, list.next_link))
}

fn keys(items: &[Setting]) -> Vec<&str> {
    items.iter().map(|s| s.key.as_str()).collect()
}

#[tokio::test]
async fn test_next_link_pager() -> Result<()> {
    let http = MockHttpSend::new()
        .respond(
            200,
            &[],
            r#"{"items":[{"key":"a"},{"key":"b"}],"@nextLink":"/kv?api-version=1.0&after=b"}"#,
        )
        .respond(503, &[], "")
        .respond(
            200,
            &[],
            r#"{"items":[{"key":"c"}],"@nextLink":"https://replica.example.com/kv?after=c"}"#,
        )
        .respond(200, &[], r#"{"items":[]}"#);
    let listener = RecordingListener::default();
    let ctx = common::context(http.clone(), RecordingSleep::default())
        .with_diagnostic_listener(listener.clone());
    let pipeline = Pipeline::builder(ctx).build()?;

    let mut first = get("https://config.example.com/kv?api-version=1.0");
    first
        .headers_mut()
        .insert("x-ms-version", http::HeaderValue::from_static("1.0"));
    let mut pager = next_link_pager(pipeline, "ConfigClient.ListSettings", first, decode);
    assert_eq!(http.request_count(), 0);

    let page = pager.next_page().await?.unwrap();
    assert_eq!(keys(&page.items), vec!["a", "b"]);
    assert_eq!(
        pager.continuation_token(),
        Some("/kv?api-version=1.0&after=b")
    );

    let rest = pager.into_item_stream().try_collect::<Vec<_>>().await?;
    assert_eq!(keys(&rest), vec!["c"]);

    let uris = http
        .requests()
        .iter()
        .map(|r| r.uri().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        uris,
        vec![
            "https://config.example.com/kv?api-version=1.0",
            "https://config.example.com/kv?api-version=1.0&after=b",
            "https://config.example.com/kv?api-version=1.0&after=b",
            "https://replica.example.com/kv?after=c",
        ]
    );
    for req in http.requests() {
        assert_eq!(req.headers()["x-ms-version"], "1.0");
    }

    let ended = listener.ended();
    assert_eq!(ended.len(), 3);
    assert!(ended
        .iter()
        .all(|(scope, _)| scope.name == "ConfigClient.ListSettings"));
    Ok(())
}

#[tokio::test]
async fn test_next_link_pager_resolves_relative_links() -> Result<()> {
    let http = MockHttpSend::new()
        .respond(200, &[], r#"{"items":[{"key":"a"}],"@nextLink":"page?after=a"}"#)
        .respond(
            200,
            &[],
            r#"{"items":[{"key":"b"}],"@nextLink":"//mirror.example.com/settings?after=b"}"#,
        )
        .respond(200, &[], r#"{"items":[{"key":"c"}]}"#);
    let ctx = common::context(http.clone(), RecordingSleep::default());
    let pipeline = Pipeline::builder(ctx).build()?;

    let first = get("https://config.example.com/settings/list?api-version=1.0");
    let items = next_link_pager(pipeline, "ConfigClient.ListSettings", first, decode)
        .collect_items()
        .await?;
    assert_eq!(keys(&items), vec!["a", "b", "c"]);

    let uris = http
        .requests()
        .iter()
        .map(|r| r.uri().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        uris,
        vec![
            "https://config.example.com/settings/list?api-version=1.0",
            "https://config.example.com/settings/page?after=a",
            "https://mirror.example.com/settings?after=b",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_next_link_pager_stops_on_service_error() -> Result<()> {
    let http = MockHttpSend::new()
        .respond(200, &[], r#"{"items":[{"key":"a"}],"@nextLink":"?after=a"}"#)
        .respond(403, &[], r#"{"error":"Forbidden"}"#);
    let ctx = common::context(http.clone(), RecordingSleep::default());
    let pipeline = Pipeline::builder(ctx)
        .with_options(
            reqpipe_core::PipelineOptions::default().with_retry(RetryOptions::none()),
        )
        .build()?;

    let mut pager = next_link_pager(
        pipeline,
        "ConfigClient.ListSettings",
        get("https://config.example.com/kv"),
        decode,
    );

    assert!(pager.next_page().await?.is_some());
    let err = pager.next_page().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServiceError);
    assert_eq!(err.status(), Some(http::StatusCode::FORBIDDEN));
    assert!(pager.is_done());
    assert!(pager.next_page().await?.is_none());

    assert_eq!(
        http.requests()[1].uri().to_string(),
        "https://config.example.com/kv?after=a"
    );
    Ok(())
}

#[tokio::test]
async fn test_next_link_pager_resumes_later() -> Result<()> {
    let http = MockHttpSend::new().respond(200, &[], r#"{"items":[{"key":"z"}]}"#);
    let ctx = common::context(http.clone(), RecordingSleep::default());
    let pipeline = Pipeline::builder(ctx).build()?;

    let saved = "/kv?api-version=1.0&after=y".to_string();
    let pager = next_link_pager(
        pipeline,
        "ConfigClient.ListSettings",
        get("https://config.example.com/kv?api-version=1.0"),
        decode,
    )
    .continue_from(saved);

    let items = pager.collect_items().await?;
    assert_eq!(keys(&items), vec!["z"]);
    assert_eq!(
        http.requests()[0].uri().to_string(),
        "https://config.example.com/kv?api-version=1.0&after=y"
    );
    Ok(())
}
