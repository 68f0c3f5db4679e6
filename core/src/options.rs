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

use std::str::FromStr;
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use rand::Rng;

use crate::{Context, Error, Result};

/// Env variable overriding [`RetryOptions::max_retries`].
pub const REQPIPE_MAX_RETRIES: &str = "REQPIPE_MAX_RETRIES";
/// Env variable overriding [`RetryOptions::mode`], `fixed` or `exponential`.
pub const REQPIPE_RETRY_MODE: &str = "REQPIPE_RETRY_MODE";
/// Env variable overriding [`RetryOptions::initial_delay`] in milliseconds.
pub const REQPIPE_RETRY_DELAY_MS: &str = "REQPIPE_RETRY_DELAY_MS";
/// Env variable overriding [`RetryOptions::max_delay`] in milliseconds.
pub const REQPIPE_RETRY_MAX_DELAY_MS: &str = "REQPIPE_RETRY_MAX_DELAY_MS";
/// Env variable overriding [`RetryOptions::jitter`].
pub const REQPIPE_RETRY_JITTER: &str = "REQPIPE_RETRY_JITTER";
/// Env variable setting [`PipelineOptions::application_id`].
pub const REQPIPE_APPLICATION_ID: &str = "REQPIPE_APPLICATION_ID";
/// Env variable turning [`PipelineOptions::telemetry`] off when `true` or `1`.
pub const REQPIPE_DISABLE_TELEMETRY: &str = "REQPIPE_DISABLE_TELEMETRY";

/// Query parameters whose values are safe to log.
const DEFAULT_LOGGED_QUERY_PARAMS: &[&str] = &[
    "api-version",
    "comp",
    "restype",
    "timeout",
    "maxresults",
    "include",
];

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryMode {
    /// `initial_delay * 2^(retry - 1)`, capped by `max_delay`.
    #[default]
    Exponential,
    /// Always `initial_delay`.
    Fixed,
}

impl FromStr for RetryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" => Ok(RetryMode::Exponential),
            "fixed" => Ok(RetryMode::Fixed),
            v => Err(Error::config_invalid(format!("unknown retry mode: {v}"))),
        }
    }
}

/// RetryOptions carries the configuration of the retry stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// How the delay grows between attempts.
    pub mode: RetryMode,
    /// Retries after the first attempt, so at most `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound of computed delays. Delays requested by the service are not capped.
    pub max_delay: Duration,
    /// Random spread applied to computed delays, between 0 and 1.
    ///
    /// A jitter of `0.2` multiplies the delay by a factor between `0.8` and `1.2`.
    pub jitter: f64,
    /// Response statuses worth retrying.
    pub retry_status_codes: Vec<StatusCode>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            mode: RetryMode::Exponential,
            max_retries: 3,
            initial_delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(60),
            jitter: 0.2,
            retry_status_codes: vec![
                StatusCode::REQUEST_TIMEOUT,
                StatusCode::TOO_MANY_REQUESTS,
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::BAD_GATEWAY,
                StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::GATEWAY_TIMEOUT,
            ],
        }
    }
}

impl RetryOptions {
    /// Options that never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Load options from env, keeping current values for unset variables.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        if let Some(v) = env_parse::<u32>(ctx, REQPIPE_MAX_RETRIES)? {
            self.max_retries = v;
        }
        if let Some(v) = env_parse::<RetryMode>(ctx, REQPIPE_RETRY_MODE)? {
            self.mode = v;
        }
        if let Some(v) = env_parse::<u64>(ctx, REQPIPE_RETRY_DELAY_MS)? {
            self.initial_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_parse::<u64>(ctx, REQPIPE_RETRY_MAX_DELAY_MS)? {
            self.max_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_parse::<f64>(ctx, REQPIPE_RETRY_JITTER)? {
            self.jitter = v;
        }

        self.validate()?;
        Ok(self)
    }

    /// Check options are consistent.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(Error::config_invalid(format!(
                "retry jitter must be between 0 and 1, got {}",
                self.jitter
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(Error::config_invalid(format!(
                "retry initial delay {:?} is larger than max delay {:?}",
                self.initial_delay, self.max_delay
            )));
        }
        Ok(())
    }

    /// Compute the delay before retry number `retry` (starting at 1).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let base = match self.mode {
            RetryMode::Fixed => self.initial_delay,
            RetryMode::Exponential => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1));
                self.initial_delay.saturating_mul(factor)
            }
        }
        .min(self.max_delay);

        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }

        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        Duration::try_from_secs_f64(base.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// PipelineOptions carries the configuration shared by every stage of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Options of the retry stage.
    pub retry: RetryOptions,
    /// Application id prepended to the user agent, truncated to 24 characters.
    pub application_id: Option<String>,
    /// Send the library name, version and platform in the user agent.
    pub telemetry: bool,
    /// Open a diagnostic scope around each logical request.
    pub diagnostics: bool,
    /// Headers added to every request unless already present.
    pub headers: HeaderMap,
    /// Query parameters whose values show up in logs and diagnostics.
    pub logged_query_params: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            retry: RetryOptions::default(),
            application_id: None,
            telemetry: true,
            diagnostics: true,
            headers: HeaderMap::new(),
            logged_query_params: DEFAULT_LOGGED_QUERY_PARAMS
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

impl PipelineOptions {
    /// Load options from env, keeping current values for unset variables.
    pub fn from_env(mut self, ctx: &Context) -> Result<Self> {
        self.retry = self.retry.from_env(ctx)?;

        if let Some(v) = ctx
            .env_var(REQPIPE_APPLICATION_ID)
            .filter(|v| !v.trim().is_empty())
        {
            self.application_id = Some(v.trim().to_string());
        }

        if let Some(v) = ctx.env_var(REQPIPE_DISABLE_TELEMETRY) {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => self.telemetry = false,
                "false" | "0" | "" => {}
                v => {
                    return Err(Error::config_invalid(format!(
                        "{REQPIPE_DISABLE_TELEMETRY} must be true or false, got {v}"
                    )))
                }
            }
        }

        Ok(self)
    }

    /// Replace the retry options.
    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Set the application id.
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(
        mut self,
        name: http::header::HeaderName,
        value: http::HeaderValue,
    ) -> Self {
        self.headers.insert(name, value);
        self
    }
}

fn env_parse<T>(ctx: &Context, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(v) = ctx.env_var(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };

    v.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| Error::config_invalid(format!("{key}={v} is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, StaticEnv};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn ctx(envs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv {
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
    }

    fn no_jitter() -> RetryOptions {
        RetryOptions {
            jitter: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_exponential_delay() {
        let opts = RetryOptions {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            ..no_jitter()
        };

        assert_eq!(opts.delay_for(1), Duration::from_secs(1));
        assert_eq!(opts.delay_for(2), Duration::from_secs(2));
        assert_eq!(opts.delay_for(3), Duration::from_secs(4));
        assert_eq!(opts.delay_for(4), Duration::from_secs(5));
        assert_eq!(opts.delay_for(64), Duration::from_secs(5));
    }

    #[test]
    fn test_fixed_delay() {
        let opts = RetryOptions {
            mode: RetryMode::Fixed,
            initial_delay: Duration::from_millis(300),
            ..no_jitter()
        };

        assert_eq!(opts.delay_for(1), Duration::from_millis(300));
        assert_eq!(opts.delay_for(5), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_bounds() {
        let opts = RetryOptions {
            mode: RetryMode::Fixed,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(11),
            jitter: 0.5,
            ..Default::default()
        };

        for _ in 0..100 {
            let delay = opts.delay_for(1);
            assert!(delay >= Duration::from_secs(5), "{delay:?}");
            assert!(delay <= Duration::from_secs(11), "{delay:?}");
        }
    }

    #[test]
    fn test_validate() {
        assert!(RetryOptions::default().validate().is_ok());

        let err = RetryOptions {
            jitter: 1.5,
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = RetryOptions {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_retry_options_from_env() -> Result<()> {
        let opts = RetryOptions::default().from_env(&ctx(&[
            (REQPIPE_MAX_RETRIES, "5"),
            (REQPIPE_RETRY_MODE, "Fixed"),
            (REQPIPE_RETRY_DELAY_MS, "100"),
            (REQPIPE_RETRY_MAX_DELAY_MS, "2000"),
            (REQPIPE_RETRY_JITTER, "0"),
        ]))?;

        assert_eq!(
            opts,
            RetryOptions {
                mode: RetryMode::Fixed,
                max_retries: 5,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(2),
                jitter: 0.0,
                ..Default::default()
            }
        );

        let opts = RetryOptions::default().from_env(&ctx(&[]))?;
        assert_eq!(opts, RetryOptions::default());
        Ok(())
    }

    #[test]
    fn test_retry_options_from_env_invalid() {
        for (key, value) in [
            (REQPIPE_MAX_RETRIES, "-1"),
            (REQPIPE_RETRY_MODE, "linear"),
            (REQPIPE_RETRY_JITTER, "2"),
        ] {
            let err = RetryOptions::default()
                .from_env(&ctx(&[(key, value)]))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{key}={value}");
        }
    }

    #[test]
    fn test_pipeline_options_from_env() -> Result<()> {
        let opts = PipelineOptions::default().from_env(&ctx(&[
            (REQPIPE_APPLICATION_ID, " my-app "),
            (REQPIPE_DISABLE_TELEMETRY, "1"),
        ]))?;
        assert_eq!(opts.application_id.as_deref(), Some("my-app"));
        assert!(!opts.telemetry);

        let err = PipelineOptions::default()
            .from_env(&ctx(&[(REQPIPE_DISABLE_TELEMETRY, "maybe")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        Ok(())
    }
}
