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

use std::borrow::Cow;
use std::str::FromStr;

use bytes::Bytes;
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::Uri;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use url::Url;

use crate::{Error, Result};

/// Characters kept as is in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters kept as is in a query key or value.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// RequestUrl is an editable view of a request uri.
///
/// Path and query are kept in their encoded form so that a uri coming from
/// the service (a next link for example) survives a round trip untouched.
/// Values pushed through the helpers are encoded on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUrl {
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// Encoded HTTP path.
    pub path: String,
    /// Encoded HTTP query pairs.
    pub query: Vec<(String, String)>,
}

impl RequestUrl {
    /// Build a request url from an absolute uri.
    pub fn parse(uri: &Uri) -> Result<Self> {
        let parts = uri.clone().into_parts();
        let paq = parts
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(RequestUrl {
            scheme: parts.scheme.unwrap_or(Scheme::HTTPS),
            authority: parts
                .authority
                .ok_or_else(|| Error::request_invalid("request without authority"))?,
            path: paq.path().to_string(),
            query: paq.query().map(split_query).unwrap_or_default(),
        })
    }

    /// Resolve a link returned by the service against this url.
    ///
    /// Resolution follows RFC 3986: absolute, scheme-relative, rooted,
    /// path-relative and query-only links are all accepted.
    pub fn resolve(&self, link: &str) -> Result<Self> {
        let link = link.trim();
        if link.is_empty() {
            return Err(Error::request_invalid("can't resolve an empty link"));
        }

        let base = Url::parse(&self.build()?.to_string()).map_err(|e| {
            Error::request_invalid("request url is not a valid base").with_source(e)
        })?;
        let joined = base.join(link).map_err(|e| {
            Error::request_invalid(format!("can't resolve link {link}")).with_source(e)
        })?;
        Self::parse(&Uri::from_str(joined.as_str())?)
    }

    /// Append a path segment, encoding it.
    pub fn path_push(&mut self, segment: &str) {
        if !self.path.ends_with('/') {
            self.path.push('/');
        }
        self.path.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }

    /// Push a new query pair into query list, encoding both sides.
    #[inline]
    pub fn query_push(&mut self, key: &str, value: &str) {
        self.query.push((
            utf8_percent_encode(key, QUERY_COMPONENT).to_string(),
            utf8_percent_encode(value, QUERY_COMPONENT).to_string(),
        ));
    }

    /// Replace every pair named `key` by a single pair.
    pub fn query_set(&mut self, key: &str, value: &str) {
        self.query_remove(key);
        self.query_push(key, value);
    }

    /// Remove every pair named `key`.
    pub fn query_remove(&mut self, key: &str) {
        self.query.retain(|(k, _)| decode(k) != key);
    }

    /// Get the first decoded value of `key`.
    pub fn query_get(&self, key: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(k, _)| decode(k) == key)
            .map(|(_, v)| decode(v).into_owned())
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Build the uri back.
    pub fn build(&self) -> Result<Uri> {
        let mut paq = if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path.clone()
        };

        if !self.query.is_empty() {
            paq.reserve(self.query_size() + self.query.len() * 2);
            paq.push('?');
            for (i, (k, v)) in self.query.iter().enumerate() {
                if i > 0 {
                    paq.push('&');
                }

                paq.push_str(k);
                if !v.is_empty() {
                    paq.push('=');
                    paq.push_str(v);
                }
            }
        }

        let uri = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(PathAndQuery::from_str(&paq)?)
            .build()?;
        Ok(uri)
    }
}

fn split_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn decode(s: &str) -> Cow<str> {
    percent_decode_str(s).decode_utf8_lossy()
}

/// Render a uri for logs, hiding every query value whose key is not in `allowed`.
///
/// SAS tokens and continuation tokens travel in the query, so values are
/// hidden unless proven harmless.
pub fn redact_query(uri: &Uri, allowed: &[&str]) -> String {
    let Some(query) = uri.query() else {
        return uri.to_string();
    };

    let mut s = String::with_capacity(uri.to_string().len());
    if let Some(scheme) = uri.scheme_str() {
        s.push_str(scheme);
        s.push_str("://");
    }
    if let Some(authority) = uri.authority() {
        s.push_str(authority.as_str());
    }
    s.push_str(uri.path());
    s.push('?');

    for (i, (k, v)) in split_query(query).into_iter().enumerate() {
        if i > 0 {
            s.push('&');
        }
        s.push_str(&k);
        if v.is_empty() {
            continue;
        }
        s.push('=');
        if allowed.iter().any(|a| a.eq_ignore_ascii_case(&decode(&k))) {
            s.push_str(&v);
        } else {
            s.push_str("REDACTED");
        }
    }

    s
}

/// Copy a request so it can be sent again.
///
/// `http::Request` is not `Clone`; the body is `Bytes` so copying it is cheap.
pub fn clone_request(req: &http::Request<Bytes>) -> http::Request<Bytes> {
    let mut new = http::Request::new(req.body().clone());
    *new.method_mut() = req.method().clone();
    *new.uri_mut() = req.uri().clone();
    *new.version_mut() = req.version();
    *new.headers_mut() = req.headers().clone();
    *new.extensions_mut() = req.extensions().clone();
    new
}
