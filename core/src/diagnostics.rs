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

//! Named scopes around logical operations.
//!
//! A client opens a [`DiagnosticScope`] for each logical operation (one
//! `get_secret` call, one walk over a paged listing) and closes it with the
//! outcome. Scopes are reported to the [`DiagnosticListener`] configured on
//! the [`Context`], which logs them by default.

use std::fmt::Debug;
use std::future::Future;
use std::time::{Duration, Instant};

use crate::{Context, Error, Result};

/// Request extension naming the logical operation a request belongs to.
///
/// [`crate::DiagnosticsPolicy`] uses it as the scope name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationName(pub String);

/// Static data of a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeInfo {
    /// Name of the operation, for example `KeyClient.GetKey`.
    pub name: String,
    /// Attributes collected while the scope was open.
    pub attributes: Vec<(String, String)>,
}

impl ScopeInfo {
    /// Get the value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// How a scope ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOutcome {
    /// The operation completed.
    Succeeded,
    /// The operation failed with the given message.
    Failed(String),
    /// The scope was dropped before an outcome was recorded, usually because
    /// the future driving the operation was dropped.
    Cancelled,
}

/// DiagnosticListener receives scope events.
pub trait DiagnosticListener: Debug + Send + Sync + 'static {
    /// Called when a scope is opened.
    fn on_start(&self, scope: &ScopeInfo);

    /// Called exactly once when a scope is closed.
    fn on_end(&self, scope: &ScopeInfo, outcome: &ScopeOutcome, elapsed: Duration);
}

/// LogListener reports scopes through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl DiagnosticListener for LogListener {
    fn on_start(&self, scope: &ScopeInfo) {
        log::debug!("{} started", scope.name);
    }

    fn on_end(&self, scope: &ScopeInfo, outcome: &ScopeOutcome, elapsed: Duration) {
        match outcome {
            ScopeOutcome::Succeeded => {
                log::debug!(
                    "{} succeeded in {:?} {:?}",
                    scope.name,
                    elapsed,
                    scope.attributes
                )
            }
            ScopeOutcome::Failed(reason) => log::warn!(
                "{} failed in {:?}: {} {:?}",
                scope.name,
                elapsed,
                reason,
                scope.attributes
            ),
            ScopeOutcome::Cancelled => {
                log::debug!("{} cancelled after {:?}", scope.name, elapsed)
            }
        }
    }
}

/// DiagnosticScope is an open scope.
///
/// Close it with [`DiagnosticScope::succeed`] or [`DiagnosticScope::fail`].
/// Dropping it while still open reports [`ScopeOutcome::Cancelled`].
#[derive(Debug)]
pub struct DiagnosticScope {
    ctx: Context,
    info: ScopeInfo,
    started: Instant,
    done: bool,
}

impl DiagnosticScope {
    /// Open a new scope.
    pub fn start(ctx: &Context, name: impl Into<String>) -> Self {
        let info = ScopeInfo {
            name: name.into(),
            attributes: Vec::new(),
        };
        ctx.diagnostics().on_start(&info);

        Self {
            ctx: ctx.clone(),
            info,
            started: Instant::now(),
            done: false,
        }
    }

    /// Name of the scope.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Attach an attribute, replacing a previous value with the same key.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.info.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.info.attributes.push((key, value)),
        }
    }

    /// Close the scope as succeeded.
    pub fn succeed(mut self) {
        self.finish(ScopeOutcome::Succeeded);
    }

    /// Close the scope as failed.
    pub fn fail(mut self, err: &Error) {
        self.add_attribute("error.kind", err.kind());
        self.finish(ScopeOutcome::Failed(err.to_string()));
    }

    fn finish(&mut self, outcome: ScopeOutcome) {
        if self.done {
            return;
        }
        self.done = true;
        self.ctx
            .diagnostics()
            .on_end(&self.info, &outcome, self.started.elapsed());
    }
}

impl Drop for DiagnosticScope {
    fn drop(&mut self) {
        self.finish(ScopeOutcome::Cancelled);
    }
}

/// Run `fut` inside a scope named `name` and record its result.
pub async fn in_scope<T, F>(ctx: &Context, name: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let scope = DiagnosticScope::start(ctx, name);
    match fut.await {
        Ok(v) => {
            scope.succeed();
            Ok(v)
        }
        Err(err) => {
            scope.fail(&err);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Listener keeping every closed scope around.
    #[derive(Debug, Clone, Default)]
    struct RecordingListener {
        started: Arc<Mutex<Vec<String>>>,
        ended: Arc<Mutex<Vec<(ScopeInfo, ScopeOutcome)>>>,
    }

    impl DiagnosticListener for RecordingListener {
        fn on_start(&self, scope: &ScopeInfo) {
            self.started.lock().unwrap().push(scope.name.clone());
        }

        fn on_end(&self, scope: &ScopeInfo, outcome: &ScopeOutcome, _: Duration) {
            self.ended
                .lock()
                .unwrap()
                .push((scope.clone(), outcome.clone()));
        }
    }

    #[test]
    fn test_scope_outcomes() {
        let listener = RecordingListener::default();
        let ctx = Context::new().with_diagnostic_listener(listener.clone());

        let mut scope = DiagnosticScope::start(&ctx, "Client.Ok");
        scope.add_attribute("attempts", 1);
        scope.add_attribute("attempts", 2);
        scope.succeed();

        DiagnosticScope::start(&ctx, "Client.Fail").fail(&Error::io("reset"));

        {
            let _scope = DiagnosticScope::start(&ctx, "Client.Dropped");
        }

        assert_eq!(
            *listener.started.lock().unwrap(),
            vec!["Client.Ok", "Client.Fail", "Client.Dropped"]
        );

        let ended = listener.ended.lock().unwrap();
        assert_eq!(ended.len(), 3);
        assert_eq!(ended[0].0.attribute("attempts"), Some("2"));
        assert_eq!(ended[0].1, ScopeOutcome::Succeeded);
        assert_eq!(
            ended[1].1,
            ScopeOutcome::Failed("transport failure: reset".to_string())
        );
        assert_eq!(ended[1].0.attribute("error.kind"), Some("transport failure"));
        assert_eq!(ended[2].1, ScopeOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_in_scope() {
        let listener = RecordingListener::default();
        let ctx = Context::new().with_diagnostic_listener(listener.clone());

        let v = in_scope(&ctx, "op", async { Ok(7) }).await.unwrap();
        assert_eq!(v, 7);
        let err = in_scope::<(), _>(&ctx, "op", async { Err(Error::unexpected("x")) })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "x");

        let ended = listener.ended.lock().unwrap();
        assert_eq!(ended[0].1, ScopeOutcome::Succeeded);
        assert!(matches!(ended[1].1, ScopeOutcome::Failed(_)));
    }
}
