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

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{AccessToken, Context, Error, ProvideCredential, Result};

/// Env variable holding the access token.
pub const REQPIPE_ACCESS_TOKEN: &str = "REQPIPE_ACCESS_TOKEN";
/// Env variable holding the token expiry as RFC 3339.
pub const REQPIPE_ACCESS_TOKEN_EXPIRES_ON: &str = "REQPIPE_ACCESS_TOKEN_EXPIRES_ON";

/// EnvTokenProvider loads a bearer token from environment variables.
///
/// - `REQPIPE_ACCESS_TOKEN`: the token.
/// - `REQPIPE_ACCESS_TOKEN_EXPIRES_ON`: optional expiry, for example `2024-01-01T00:00:00Z`.
#[derive(Debug, Default, Clone)]
pub struct EnvTokenProvider;

impl EnvTokenProvider {
    /// Create a new env token provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvideCredential for EnvTokenProvider {
    type Credential = AccessToken;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(token) = ctx
            .env_var(REQPIPE_ACCESS_TOKEN)
            .filter(|v| !v.trim().is_empty())
        else {
            return Ok(None);
        };

        let expires_on = match ctx
            .env_var(REQPIPE_ACCESS_TOKEN_EXPIRES_ON)
            .filter(|v| !v.trim().is_empty())
        {
            Some(v) => Some(
                DateTime::parse_from_rfc3339(v.trim())
                    .map_err(|e| {
                        Error::config_invalid(format!(
                            "{REQPIPE_ACCESS_TOKEN_EXPIRES_ON} is not a valid RFC 3339 time"
                        ))
                        .with_source(e)
                    })?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        Ok(Some(AccessToken::new(token.trim(), expires_on)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, StaticEnv};
    use std::collections::HashMap;

    fn ctx(envs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    #[tokio::test]
    async fn test_env_token_provider_missing() {
        let cred = EnvTokenProvider::new()
            .provide_credential(&ctx(&[]))
            .await
            .unwrap();
        assert!(cred.is_none());

        let cred = EnvTokenProvider::new()
            .provide_credential(&ctx(&[(REQPIPE_ACCESS_TOKEN, "  ")]))
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_env_token_provider_with_expiry() {
        let cred = EnvTokenProvider::new()
            .provide_credential(&ctx(&[
                (REQPIPE_ACCESS_TOKEN, "token-from-env"),
                (REQPIPE_ACCESS_TOKEN_EXPIRES_ON, "2030-01-01T00:00:00Z"),
            ]))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cred.token, "token-from-env");
        assert_eq!(
            cred.expires_on.unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_env_token_provider_bad_expiry() {
        let err = EnvTokenProvider::new()
            .provide_credential(&ctx(&[
                (REQPIPE_ACCESS_TOKEN, "token-from-env"),
                (REQPIPE_ACCESS_TOKEN_EXPIRES_ON, "tomorrow"),
            ]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
