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

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Context, Result};

/// SigningCredential is the trait used by authentication policies as the credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is still usable.
    fn is_valid(&self) -> bool;
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(cred) = self else {
            return false;
        };

        cred.is_valid()
    }
}

/// ProvideCredential is the trait used by authentication policies to load credentials.
///
/// Returning `Ok(None)` means this provider has nothing to offer, which lets a
/// [`crate::ProvideCredentialChain`] move on to the next provider.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;
}

/// Policy is one stage of a [`crate::Pipeline`].
///
/// A policy may inspect or modify the request, forward it with
/// [`Next::run`], then inspect or modify the response or error. A policy
/// that does not call `next` answers on behalf of the rest of the chain.
///
/// ```
/// use bytes::Bytes;
/// use reqpipe_core::{Context, Next, Policy, Result};
///
/// #[derive(Debug)]
/// struct ApiVersion;
///
/// #[async_trait::async_trait]
/// impl Policy for ApiVersion {
///     async fn send(
///         &self,
///         ctx: &Context,
///         req: &mut http::Request<Bytes>,
///         next: Next<'_>,
///     ) -> Result<http::Response<Bytes>> {
///         req.headers_mut()
///             .insert("x-ms-version", http::HeaderValue::from_static("2023-01-03"));
///         next.run(ctx, req).await
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Policy: Debug + Send + Sync + 'static {
    /// Name of this stage, used in logs and diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Process the request, usually by calling `next.run(ctx, req)`.
    async fn send(
        &self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
        next: Next<'_>,
    ) -> Result<http::Response<Bytes>>;
}

/// Next is a cursor over the policies that follow the current one.
///
/// It is `Copy`: a policy may run the rest of the chain as many times as it likes.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    policies: &'a [Arc<dyn Policy>],
}

impl<'a> Next<'a> {
    /// Create a cursor pointing at the first of `policies`.
    pub fn new(policies: &'a [Arc<dyn Policy>]) -> Self {
        Self { policies }
    }

    /// Run the rest of the chain.
    pub async fn run(
        self,
        ctx: &Context,
        req: &mut http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>> {
        match self.policies.split_first() {
            Some((head, rest)) => head.send(ctx, req, Next::new(rest)).await,
            None => Err(crate::Error::unexpected(
                "pipeline ended without a transport stage",
            )),
        }
    }
}

impl Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.policies.iter().map(|p| p.name()))
            .finish()
    }
}
