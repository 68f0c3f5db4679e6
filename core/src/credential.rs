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

use std::fmt::{Debug, Formatter};

use chrono::{DateTime, TimeDelta, Utc};

use crate::utils::Redact;
use crate::SigningCredential;

/// Tokens expiring within this window are refreshed ahead of time.
const REFRESH_WINDOW_SECS: i64 = 20;

/// AccessToken is an OAuth bearer token.
#[derive(Clone, Default)]
pub struct AccessToken {
    /// The token itself, without the `Bearer ` prefix.
    pub token: String,
    /// Expiration time for this token, `None` means it never expires.
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Create a new access token.
    pub fn new(token: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &Redact::from(&self.token))
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

impl SigningCredential for AccessToken {
    fn is_valid(&self) -> bool {
        if self.token.is_empty() {
            return false;
        }

        match self.expires_on {
            Some(expires_on) => {
                expires_on
                    > Utc::now()
                        + TimeDelta::try_seconds(REFRESH_WINDOW_SECS).expect("in bounds")
            }
            None => true,
        }
    }
}
