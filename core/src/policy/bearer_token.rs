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

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::uri::Scheme;
use http::{HeaderValue, StatusCode};

use crate::{
    AccessToken, Context, Error, Next, Policy, ProvideCredential, Result, SigningCredential,
};

/// BearerTokenPolicy authenticates requests with an OAuth bearer token.
///
/// The token is cached and reloaded from the provider once it is about to
/// expire. When the service answers `401` to a request signed with a cached
/// token, the cache is dropped and the request is sent once more with a fresh
/// token.
///
/// Place it after the retry stage so that every attempt gets a valid token.
#[derive(Debug, Clone)]
pub struct BearerTokenPolicy {
    provider: Arc<dyn ProvideCredential<Credential = AccessToken>>,
    token: Arc<Mutex<Option<AccessToken>>>,
    allow_http: bool,
}

impl BearerTokenPolicy {
    /// Create a new policy loading tokens from `provider`.
    pub fn new(provider: impl ProvideCredential<Credential = AccessToken>) -> Self {
        Self {
            provider: Arc::new(provider),
            token: Arc::new(Mutex::new(None)),
            allow_http: false,
        }
    }

    /// Allow sending tokens over plain http, for local emulators only.
    pub fn with_allow_http(mut self, allow_http: bool) -> Self {
        self.allow_http = allow_http;
        self
    }

    /// Returns the token and whether it was just loaded.
    async fn token(&self, ctx: &Context, force_reload: bool) -> Result<(AccessToken, bool)> {
        if !force_reload {
            let cached = self.token.lock().expect("lock poisoned").clone();
            if let Some(token) = cached.filter(|t| t.is_valid()) {
                return Ok((token, false));
            }
        }

        let token = self
            .provider
            .provide_credential(ctx)
            .await?
            .ok_or_else(|| Error::credential_invalid("no access token available"))?;
        if !token.is_valid() {
            return Err(Error::credential_expired(
                "access token provided is empty or about to expire",
            ));
        }

        *self.token.lock().expect("lock poisoned") = Some(token.clone());
        Ok((token, true))
    }
}

fn authorize(req: &mut http::Request<Bytes>, token: &AccessToken) -> Result<()> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token))?;
    value.set_sensitive(true);
    req.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

#[async_trait]
impl Policy for BearerTokenPolicy {
    fn name(&self) -> &'static str {
        "bearer_token"
    }

    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>> {
        if !self.allow_http && req.uri().scheme() != Some(&Scheme::HTTPS) {
            return Err(Error::request_invalid(
                "bearer token authentication requires https",
            ));
        }

        let (token, fresh) = self.token(ctx, false).await?;
        authorize(req, &token)?;

        let resp = next.run(ctx, req).await?;
        if resp.status() != StatusCode::UNAUTHORIZED || fresh {
            return Ok(resp);
        }

        log::debug!("service rejected the cached access token, reloading");
        let (token, _) = self.token(ctx, true).await?;
        authorize(req, &token)?;
        next.run(ctx, req).await
    }
}
