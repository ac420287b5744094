use hyper::header::HeaderValue;
use tracing::debug;

use super::duration::parse_duration;
use super::options::{CacheOptions, OptionValue};
use crate::error::CacheControlError;

/// Default `max-age` seeded by the `immutable` shortcut.
const IMMUTABLE_MAX_AGE: &str = "1y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveValue {
    Flag(bool),
    Seconds(u64),
}

impl DirectiveValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            DirectiveValue::Flag(b) => *b,
            DirectiveValue::Seconds(n) => *n > 0,
        }
    }
}

/// Resolved directives in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet {
    directives: Vec<(String, DirectiveValue)>,
}

impl DirectiveSet {
    /// Resolves options into directives.
    ///
    /// A truthy `immutable` seeds `max-age=1y` ahead of the caller's options;
    /// an explicit `max_age` from the caller replaces the seeded value in place.
    pub fn resolve(options: &CacheOptions) -> Result<Self, CacheControlError> {
        let mut set = Self::default();

        let immutable = options
            .iter()
            .any(|(key, value)| key.replace('_', "-") == "immutable" && value.is_truthy());
        if immutable {
            set.upsert(
                "max-age".to_string(),
                DirectiveValue::Seconds(parse_duration(IMMUTABLE_MAX_AGE)?),
            );
        }

        for (key, value) in options.iter() {
            let name = directive_name(key)?;
            let value = match value {
                OptionValue::Duration(s) => DirectiveValue::Seconds(parse_duration(s)?),
                OptionValue::Flag(b) => DirectiveValue::Flag(*b),
                OptionValue::Seconds(n) => DirectiveValue::Seconds(*n),
            };
            set.upsert(name, value);
        }

        if !set.directives.iter().any(|(_, v)| v.is_truthy()) {
            return Err(CacheControlError::EmptyDirectiveSet);
        }

        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<DirectiveValue> {
        self.directives
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// `name` for true flags, `name=value` otherwise; falsy directives are left out.
    pub fn render(&self) -> String {
        self.directives
            .iter()
            .filter(|(_, value)| value.is_truthy())
            .map(|(name, value)| match value {
                DirectiveValue::Flag(_) => name.clone(),
                DirectiveValue::Seconds(n) => format!("{}={}", name, n),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn upsert(&mut self, name: String, value: DirectiveValue) {
        match self.directives.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.directives.push((name, value)),
        }
    }
}

/// Maps an option key to its directive name, e.g. `stale_while_revalidate`
/// to `stale-while-revalidate`.
pub fn directive_name(key: &str) -> Result<String, CacheControlError> {
    let name = key.replace('_', "-");
    let valid = !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        Ok(name)
    } else {
        Err(CacheControlError::InvalidDirective(key.to_string()))
    }
}

/// Builds a `Cache-Control` header value from options.
pub fn build_cache_control(options: &CacheOptions) -> Result<HeaderValue, CacheControlError> {
    let rendered = DirectiveSet::resolve(options)?.render();
    debug!("Built cache-control value: {}", rendered);
    HeaderValue::from_str(&rendered).map_err(|_| CacheControlError::InvalidDirective(rendered))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(options: CacheOptions) -> Result<String, CacheControlError> {
        build_cache_control(&options).map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn test_immutable_seeds_one_year() {
        assert_eq!(
            build(CacheOptions::new().immutable(true)).unwrap(),
            "max-age=31536000, immutable"
        );
    }

    #[test]
    fn test_max_age() {
        assert_eq!(build(CacheOptions::new().max_age("5s")).unwrap(), "max-age=5");
    }

    #[test]
    fn test_stale_while_revalidate() {
        assert_eq!(
            build(
                CacheOptions::new()
                    .max_age("5s")
                    .stale_while_revalidate("1s")
            )
            .unwrap(),
            "max-age=5, stale-while-revalidate=1"
        );
    }

    #[test]
    fn test_caller_max_age_overrides_seed() {
        let options = CacheOptions::new().immutable(true).max_age("10s");
        let set = DirectiveSet::resolve(&options).unwrap();
        assert_eq!(set.get("max-age"), Some(DirectiveValue::Seconds(10)));
        assert!(build(options).unwrap().starts_with("max-age=10, immutable"));
    }

    #[test]
    fn test_hyphenated_key_overrides_seed() {
        let options = CacheOptions::new().immutable(true).set("max-age", 60u64);
        assert_eq!(build(options).unwrap(), "max-age=60, immutable");
    }

    #[test]
    fn test_empty_options_rejected() {
        assert_eq!(
            build(CacheOptions::new()),
            Err(CacheControlError::EmptyDirectiveSet)
        );
    }

    #[test]
    fn test_all_falsy_rejected() {
        assert_eq!(
            build(CacheOptions::new().max_age("0s")),
            Err(CacheControlError::EmptyDirectiveSet)
        );
        assert_eq!(
            build(CacheOptions::new().public(false).s_maxage(0u64)),
            Err(CacheControlError::EmptyDirectiveSet)
        );
    }

    #[test]
    fn test_falsy_directives_dropped() {
        assert_eq!(
            build(
                CacheOptions::new()
                    .max_age("0s")
                    .public(true)
                    .no_store(false)
            )
            .unwrap(),
            "public"
        );
    }

    #[test]
    fn test_immutable_false_does_not_seed() {
        assert_eq!(
            build(CacheOptions::new().immutable(false).max_age("1m")).unwrap(),
            "max-age=60"
        );
    }

    #[test]
    fn test_integer_seconds_pass_through() {
        assert_eq!(
            build(CacheOptions::new().public(true).max_age(120u64)).unwrap(),
            "public, max-age=120"
        );
    }

    #[test]
    fn test_invalid_duration_propagates() {
        assert!(matches!(
            build(CacheOptions::new().max_age("5q")),
            Err(CacheControlError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_invalid_directive_name() {
        assert_eq!(
            directive_name("Max_Age"),
            Err(CacheControlError::InvalidDirective("Max_Age".into()))
        );
        assert!(directive_name("max age").is_err());
        assert!(directive_name("_private").is_err());
        assert_eq!(directive_name("no_store").unwrap(), "no-store");
    }
}
