//! Filter chain: ordering, short-circuit dispatch and failure translation.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

use super::access_log::AccessLogFilter;
use super::cache::CacheFilter;
use super::method_override::MethodOverrideFilter;
use super::rate_limit::RateLimitFilter;
use super::{short_type_name, PreMatchRequestFilter, Priority, RequestFilter, ResponseFilter};
use crate::config::ChainConfig;
use crate::core::{Error, FilterContext, Response, Result, Stage};
use crate::target::Target;

/// What the chain does with an I/O failure from a filter or the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Replace the outcome with a 500 response. Response filters still run
    /// unless the failure came from one of them.
    #[default]
    Respond,
    /// Stop immediately and return the error to the caller.
    Propagate,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "respond" => Ok(ErrorPolicy::Respond),
            "propagate" => Ok(ErrorPolicy::Propagate),
            other => Err(format!(
                "unknown error policy '{}', expected: respond, propagate",
                other
            )),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Respond => f.write_str("respond"),
            ErrorPolicy::Propagate => f.write_str("propagate"),
        }
    }
}

/// A filter plus the name and priority it was registered with.
struct Registration<F: ?Sized> {
    name: &'static str,
    priority: Priority,
    filter: Arc<F>,
}

impl<F: ?Sized> Clone for Registration<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            priority: self.priority,
            filter: Arc::clone(&self.filter),
        }
    }
}

/// Insert keeping ascending priority; equal priorities keep insertion order.
fn insert_sorted<F: ?Sized>(list: &mut Vec<Registration<F>>, reg: Registration<F>) {
    let at = list.partition_point(|r| r.priority <= reg.priority);
    list.insert(at, reg);
}

/// Ordered set of pre-match, request and response filters.
///
/// The chain is immutable once built and cheap to clone, so one instance can
/// serve any number of concurrent requests, each with its own context.
#[derive(Clone, Default)]
pub struct FilterChain {
    pre_match: Vec<Registration<dyn PreMatchRequestFilter>>,
    request: Vec<Registration<dyn RequestFilter>>,
    response: Vec<Registration<dyn ResponseFilter>>,
    error_policy: ErrorPolicy,
}

impl FilterChain {
    /// Create a new empty chain with the `Respond` error policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the built-in filters enabled by configuration.
    ///
    /// | filter            | stage             | priority           |
    /// |-------------------|-------------------|--------------------|
    /// | method override   | pre-match         | `HEADER_DECORATOR` |
    /// | rate limit        | request           | `SECURITY`         |
    /// | response cache    | request, response | `USER`             |
    /// | access log        | response          | `SECURITY`         |
    ///
    /// The access log sits at `SECURITY` so it runs last on the way out.
    pub fn from_config(config: &ChainConfig) -> Self {
        let mut chain = Self::new().with_error_policy(config.error_policy);

        if let Some(filter) = MethodOverrideFilter::from_config(config) {
            chain = chain.pre_match(Priority::HEADER_DECORATOR, filter);
        }
        if let Some(filter) = RateLimitFilter::from_config(config) {
            chain = chain.request(Priority::SECURITY, filter);
        }
        if let Some(cache) = CacheFilter::from_config(config) {
            let cache = Arc::new(cache);
            chain = chain
                .request_arc(Priority::USER, "CacheFilter", cache.clone())
                .response_arc(Priority::USER, "CacheFilter", cache);
        }
        if let Some(filter) = AccessLogFilter::from_config(config) {
            chain = chain.response(Priority::SECURITY, filter);
        }

        chain
    }

    /// Set the error policy.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    // Registration

    /// Register a pre-match filter under its type name.
    pub fn pre_match<F>(self, priority: impl Into<Priority>, filter: F) -> Self
    where
        F: PreMatchRequestFilter + 'static,
    {
        self.pre_match_named(priority, short_type_name::<F>(), filter)
    }

    pub fn pre_match_named<F>(
        self,
        priority: impl Into<Priority>,
        name: &'static str,
        filter: F,
    ) -> Self
    where
        F: PreMatchRequestFilter + 'static,
    {
        self.pre_match_arc(priority, name, Arc::new(filter))
    }

    pub fn pre_match_arc(
        mut self,
        priority: impl Into<Priority>,
        name: &'static str,
        filter: Arc<dyn PreMatchRequestFilter>,
    ) -> Self {
        insert_sorted(
            &mut self.pre_match,
            Registration {
                name,
                priority: priority.into(),
                filter,
            },
        );
        self
    }

    /// Register a request filter under its type name.
    pub fn request<F>(self, priority: impl Into<Priority>, filter: F) -> Self
    where
        F: RequestFilter + 'static,
    {
        self.request_named(priority, short_type_name::<F>(), filter)
    }

    pub fn request_named<F>(
        self,
        priority: impl Into<Priority>,
        name: &'static str,
        filter: F,
    ) -> Self
    where
        F: RequestFilter + 'static,
    {
        self.request_arc(priority, name, Arc::new(filter))
    }

    pub fn request_arc(
        mut self,
        priority: impl Into<Priority>,
        name: &'static str,
        filter: Arc<dyn RequestFilter>,
    ) -> Self {
        insert_sorted(
            &mut self.request,
            Registration {
                name,
                priority: priority.into(),
                filter,
            },
        );
        self
    }

    /// Register a response filter under its type name.
    pub fn response<F>(self, priority: impl Into<Priority>, filter: F) -> Self
    where
        F: ResponseFilter + 'static,
    {
        self.response_named(priority, short_type_name::<F>(), filter)
    }

    pub fn response_named<F>(
        self,
        priority: impl Into<Priority>,
        name: &'static str,
        filter: F,
    ) -> Self
    where
        F: ResponseFilter + 'static,
    {
        self.response_arc(priority, name, Arc::new(filter))
    }

    pub fn response_arc(
        mut self,
        priority: impl Into<Priority>,
        name: &'static str,
        filter: Arc<dyn ResponseFilter>,
    ) -> Self {
        insert_sorted(
            &mut self.response,
            Registration {
                name,
                priority: priority.into(),
                filter,
            },
        );
        self
    }

    // Introspection

    /// Total number of registrations across all stages.
    pub fn len(&self) -> usize {
        self.pre_match.len() + self.request.len() + self.response.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filter names of a stage, in execution order.
    pub fn names(&self, stage: Stage) -> Vec<&'static str> {
        match stage {
            Stage::PreMatch => self.pre_match.iter().map(|r| r.name).collect(),
            Stage::Request => self.request.iter().map(|r| r.name).collect(),
            Stage::Response => self.response.iter().rev().map(|r| r.name).collect(),
        }
    }

    // Dispatch

    /// Drive one invocation through the chain.
    ///
    /// 1. pre-match filters, until one attaches a response
    /// 2. target resolution; an unmatched request gets a 404 and skips the
    ///    request filters
    /// 3. request filters, until one attaches a response
    /// 4. the target, if nothing has produced a response yet
    /// 5. every response filter, in reverse priority order
    ///
    /// Headers queued on the context are merged into the returned response
    /// without overriding headers it already carries.
    pub async fn process<T>(&self, ctx: &mut FilterContext, target: &T) -> Result<Response>
    where
        T: Target + ?Sized,
    {
        if !ctx.has_response() {
            self.run_pre_match(ctx)?;
        }

        if !ctx.has_response() {
            if target.matches(&ctx.request) {
                self.run_request(ctx)?;
                if !ctx.has_response() {
                    self.invoke_target(ctx, target).await?;
                }
            } else {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    method = %ctx.request.method(),
                    path = ctx.request.path(),
                    target = target.name(),
                    "no target matched request"
                );
                ctx.set_response(Response::not_found());
            }
        }

        self.run_response(ctx)?;

        let mut res = match ctx.take_response() {
            Some(res) => res,
            None => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    "response removed during response filtering"
                );
                Response::internal_error()
            }
        };

        for (name, value) in ctx.response_headers() {
            if !res.headers().contains_key(name.as_str()) {
                res.set_header(name, value);
            }
        }

        Ok(res)
    }

    fn run_pre_match(&self, ctx: &mut FilterContext) -> Result<()> {
        for reg in &self.pre_match {
            if let Err(e) = reg.filter.pre_match_filter(ctx) {
                return self.fail(ctx, Stage::PreMatch, reg.name, e);
            }
            if ctx.has_response() {
                self.short_circuited(ctx, Stage::PreMatch, reg.name);
                break;
            }
        }
        Ok(())
    }

    fn run_request(&self, ctx: &mut FilterContext) -> Result<()> {
        for reg in &self.request {
            if let Err(e) = reg.filter.pre_filter(ctx) {
                return self.fail(ctx, Stage::Request, reg.name, e);
            }
            if ctx.has_response() {
                self.short_circuited(ctx, Stage::Request, reg.name);
                break;
            }
        }
        Ok(())
    }

    fn run_response(&self, ctx: &mut FilterContext) -> Result<()> {
        for reg in self.response.iter().rev() {
            if let Err(e) = reg.filter.post_filter(ctx) {
                return self.fail(ctx, Stage::Response, reg.name, e);
            }
        }
        Ok(())
    }

    async fn invoke_target<T>(&self, ctx: &mut FilterContext, target: &T) -> Result<()>
    where
        T: Target + ?Sized,
    {
        match target.invoke(ctx).await {
            Ok(res) => {
                ctx.set_response(res);
                Ok(())
            }
            Err(e) => match self.error_policy {
                ErrorPolicy::Propagate => Err(Error::Target(e)),
                ErrorPolicy::Respond => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        target = target.name(),
                        error = %e,
                        "target invocation failed"
                    );
                    ctx.set_response(Response::internal_error());
                    Ok(())
                }
            },
        }
    }

    fn short_circuited(&self, ctx: &mut FilterContext, stage: Stage, name: &'static str) {
        ctx.mark_aborted(name);
        tracing::debug!(
            request_id = %ctx.request_id,
            stage = %stage,
            filter = name,
            status = ?ctx.response().map(|r| r.status().as_u16()),
            "filter short-circuited request"
        );
    }

    /// Apply the error policy to a filter failure.
    ///
    /// Under `Respond` a pre-match or request failure becomes a 500 that
    /// still flows through the response filters; a response filter failure
    /// replaces the response and ends the response chain.
    fn fail(
        &self,
        ctx: &mut FilterContext,
        stage: Stage,
        name: &'static str,
        error: io::Error,
    ) -> Result<()> {
        match self.error_policy {
            ErrorPolicy::Propagate => Err(Error::filter(stage, name, error)),
            ErrorPolicy::Respond => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    stage = %stage,
                    filter = name,
                    error = %error,
                    "filter failed, responding with 500"
                );
                ctx.set_response(Response::internal_error());
                if stage != Stage::Response {
                    ctx.mark_aborted(name);
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("pre_match", &self.names(Stage::PreMatch))
            .field("request", &self.names(Stage::Request))
            .field("response", &self.names(Stage::Response))
            .field("error_policy", &self.error_policy)
            .finish()
    }
}
