use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use hyper::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use hyper::{Method, StatusCode};
use tracing::trace;

use super::directive::build_cache_control;
use super::options::CacheOptions;
use crate::error::CacheControlError;

const FLAG_UNSET: u8 = 0;
const FLAG_DISABLED: u8 = 1;
const FLAG_ENABLED: u8 = 2;

/// Process-wide state shared by every request.
///
/// The cache-control flag is tri-state: unset behaves as enabled.
#[derive(Debug, Default)]
pub struct AppState {
    cache_control: AtomicU8,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_control(flag: Option<bool>) -> Self {
        let state = Self::new();
        state.set_cache_control(flag);
        state
    }

    pub fn cache_control(&self) -> Option<bool> {
        match self.cache_control.load(Ordering::Relaxed) {
            FLAG_DISABLED => Some(false),
            FLAG_ENABLED => Some(true),
            _ => None,
        }
    }

    pub fn set_cache_control(&self, flag: Option<bool>) {
        let raw = match flag {
            None => FLAG_UNSET,
            Some(false) => FLAG_DISABLED,
            Some(true) => FLAG_ENABLED,
        };
        self.cache_control.store(raw, Ordering::Relaxed);
    }
}

/// Decides whether a response gets the cache header.
///
/// Only successful `GET` responses qualify, and only while caching is not
/// switched off globally. A missing flag counts as enabled.
pub fn should_attach(enabled: Option<bool>, method: &Method, status: StatusCode) -> bool {
    if !enabled.unwrap_or(true) {
        return false;
    }
    if method != Method::GET {
        return false;
    }
    status == StatusCode::OK
}

/// A prebuilt `Cache-Control` value plus the policy for attaching it.
///
/// Built once when routes are registered and shared read-only afterwards.
/// Both the handler wrapper ([`CacheControl::wrap`]) and the transport
/// middleware go through [`CacheControl::apply`].
#[derive(Debug, Clone)]
pub struct CacheControl {
    value: HeaderValue,
    state: Option<Arc<AppState>>,
}

impl CacheControl {
    pub fn new(options: &CacheOptions) -> Result<Self, CacheControlError> {
        Ok(Self {
            value: build_cache_control(options)?,
            state: None,
        })
    }

    /// Reads the global flag from `state` at apply time.
    pub fn with_state(mut self, state: Arc<AppState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    pub fn enabled(&self) -> Option<bool> {
        self.state.as_ref().and_then(|state| state.cache_control())
    }

    /// Sets the header when the policy allows it, replacing any earlier
    /// `Cache-Control`. Returns whether the header was set.
    pub fn apply(&self, method: &Method, status: StatusCode, headers: &mut HeaderMap) -> bool {
        if !should_attach(self.enabled(), method, status) {
            trace!(%method, %status, "Skipping cache-control");
            return false;
        }
        headers.insert(CACHE_CONTROL, self.value.clone());
        true
    }
}
