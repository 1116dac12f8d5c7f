use super::{DeepClone, OptionKey, OptionValue, RestOptions};
use crate::client::RestClient;
use crate::options::{
    CacheMode, Credentials, OverrideStrategy, Redirect, ReferrerPolicy, RequestMode,
};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The global options layer of a client.
///
/// Defaults are applied on construction and re-applied after `unset`, so
/// unsetting a defaulted field restores its default rather than leaving a hole.
/// `throw` has no stored default; see [`RestOptions::throws`].
pub struct OptionsStore {
    options: RestOptions,
}

impl OptionsStore {
    pub fn new(options: RestOptions) -> Self {
        let mut store = Self { options };
        store.restore_defaults();
        store
    }

    fn restore_defaults(&mut self) {
        let options = &mut self.options;
        options.timeout.get_or_insert(DEFAULT_TIMEOUT);
        options.override_strategy.get_or_insert(OverrideStrategy::default());
        options.credentials.get_or_insert(Credentials::default());
        options.mode.get_or_insert(RequestMode::default());
        options.cache.get_or_insert(CacheMode::default());
        options.redirect.get_or_insert(Redirect::default());
        options.referrer_policy.get_or_insert(ReferrerPolicy::default());
        options.keepalive.get_or_insert(false);
        options.cache_in_memory.get_or_insert(false);
    }

    /// Deep clone of the current options.
    pub fn current(&self) -> RestOptions {
        self.options.deep_clone()
    }

    /// Borrow the stored options without cloning.
    pub fn as_options(&self) -> &RestOptions {
        &self.options
    }

    pub fn get(&self, key: OptionKey) -> Option<OptionValue> {
        self.options.get(key)
    }

    pub fn set(&mut self, value: OptionValue) -> &mut Self {
        debug!("Option '{}' set", value.key().name());
        self.options.set(value);
        self
    }

    pub fn unset(&mut self, key: OptionKey) -> &mut Self {
        debug!("Option '{}' unset", key.name());
        self.options.unset(key);
        self.restore_defaults();
        self
    }

    pub fn merge(&mut self, options: RestOptions) -> &mut Self {
        self.options.merge(options);
        self
    }

    pub fn assign(&mut self, options: RestOptions) -> &mut Self {
        self.options.assign(options);
        self
    }

    /// Build a client over an independent copy of these options.
    pub fn create_client(&self, transport: Arc<dyn Transport>) -> RestClient {
        RestClient::from_store(self.clone(), transport)
    }

    /// Combine `base` with per-call `overrides` using the base's strategy.
    ///
    /// The result never shares mutable state with `base`.
    pub fn resolve(base: &RestOptions, overrides: Option<RestOptions>) -> RestOptions {
        let mut resolved = base.deep_clone();
        let Some(overrides) = overrides else {
            return resolved;
        };
        match base.override_strategy.unwrap_or_default() {
            OverrideStrategy::Merge => resolved.merge(overrides),
            OverrideStrategy::Assign => resolved.assign(overrides),
        }
        resolved
    }
}

impl Clone for OptionsStore {
    /// A new store over a deep clone; later changes to either side stay local.
    fn clone(&self) -> Self {
        Self::new(self.options.deep_clone())
    }
}

impl Default for OptionsStore {
    fn default() -> Self {
        Self::new(RestOptions::default())
    }
}

impl std::fmt::Debug for OptionsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsStore")
            .field("options", &self.options)
            .finish()
    }
}
