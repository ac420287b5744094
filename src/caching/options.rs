/// Raw value of a cache option before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// `<integer><unit>` string, resolved to seconds.
    Duration(String),
    Flag(bool),
    Seconds(u64),
}

impl OptionValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Duration(s) => !s.is_empty(),
            OptionValue::Flag(b) => *b,
            OptionValue::Seconds(n) => *n > 0,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Duration(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Duration(v)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Flag(v)
    }
}

impl From<u64> for OptionValue {
    fn from(v: u64) -> Self {
        OptionValue::Seconds(v)
    }
}

/// Ordered set of cache options, e.g. `max_age = "1h"`.
///
/// Keys may be written with underscores or hyphens. Setting a key that is
/// already present replaces its value and keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    entries: Vec<(String, OptionValue)>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_age(self, value: impl Into<OptionValue>) -> Self {
        self.set("max_age", value)
    }

    pub fn s_maxage(self, value: impl Into<OptionValue>) -> Self {
        self.set("s_maxage", value)
    }

    pub fn stale_while_revalidate(self, value: impl Into<OptionValue>) -> Self {
        self.set("stale_while_revalidate", value)
    }

    pub fn stale_if_error(self, value: impl Into<OptionValue>) -> Self {
        self.set("stale_if_error", value)
    }

    pub fn immutable(self, value: bool) -> Self {
        self.set("immutable", value)
    }

    pub fn public(self, value: bool) -> Self {
        self.set("public", value)
    }

    pub fn private(self, value: bool) -> Self {
        self.set("private", value)
    }

    pub fn no_cache(self, value: bool) -> Self {
        self.set("no_cache", value)
    }

    pub fn no_store(self, value: bool) -> Self {
        self.set("no_store", value)
    }

    pub fn must_revalidate(self, value: bool) -> Self {
        self.set("must_revalidate", value)
    }
}

impl<K, V> FromIterator<(K, V)> for CacheOptions
where
    K: Into<String>,
    V: Into<OptionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (k, v) in iter {
            options.insert(k, v);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let options = CacheOptions::new()
            .max_age("5s")
            .public(true)
            .max_age("10s");

        let keys: Vec<&str> = options.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["max_age", "public"]);
        assert_eq!(
            options.get("max_age"),
            Some(&OptionValue::Duration("10s".into()))
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(OptionValue::from("0s").is_truthy());
        assert!(!OptionValue::from("").is_truthy());
        assert!(!OptionValue::from(false).is_truthy());
        assert!(!OptionValue::from(0u64).is_truthy());
        assert!(OptionValue::from(3u64).is_truthy());
    }

    #[test]
    fn test_from_iter() {
        let options: CacheOptions = [("max_age", "1h"), ("stale_while_revalidate", "1m")]
            .into_iter()
            .collect();
        assert_eq!(options.iter().count(), 2);
    }
}
