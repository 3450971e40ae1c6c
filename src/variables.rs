//! The variable store consumed by every renderer.
//! Holds answers, imported environment values and computed values in insertion order.

use chrono::{DateTime, Datelike, TimeZone};
use indexmap::IndexMap;
use log::debug;

use crate::case;
use crate::value::Value;

/// Answers keyed by question name.
pub type Answers = IndexMap<String, Value>;

/// Case-sensitive, insertion-ordered mapping of variable names to values.
///
/// Lookup ignores order; iteration and serialization follow insertion order so that
/// rendered contexts and logs are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: Answers,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Borrowed view used by the condition evaluator.
    pub fn values(&self) -> &Answers {
        &self.values
    }

    /// Copies every answer into the store, replacing existing keys.
    pub fn extend(&mut self, answers: &Answers) {
        for (key, value) in answers {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Imports environment variables starting with `prefix`.
    /// The prefix is stripped and the remainder lower-cased: `RITUAL_VAR_REGION` becomes `region`.
    pub fn import_env(&mut self, prefix: &str) {
        self.import_pairs(prefix, std::env::vars());
    }

    fn import_pairs<I: IntoIterator<Item = (String, String)>>(&mut self, prefix: &str, pairs: I) {
        for (key, value) in pairs {
            if let Some(name) = key.strip_prefix(prefix) {
                if name.is_empty() {
                    continue;
                }
                debug!("Importing environment variable '{key}'");
                self.values.insert(name.to_lowercase(), Value::String(value));
            }
        }
    }

    /// Adds `timestamp`, `date` and `year` derived from `now`, without overwriting answers.
    pub fn add_computed<Tz: TimeZone>(&mut self, now: DateTime<Tz>)
    where
        Tz::Offset: std::fmt::Display,
    {
        self.insert_if_absent("timestamp", Value::String(now.to_rfc3339()));
        self.insert_if_absent("date", Value::String(now.format("%Y-%m-%d").to_string()));
        self.insert_if_absent("year", Value::from(i64::from(now.year())));
    }

    /// Adds `<key>_snake`, `<key>_kebab`, `<key>_pascal` and `<key>_camel` for every string value.
    pub fn add_case_variants(&mut self) {
        let strings: Vec<(String, String)> = self
            .values
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();

        for (key, value) in strings {
            self.insert_if_absent(format!("{key}_snake"), case::to_snake_case(&value).into());
            self.insert_if_absent(format!("{key}_kebab"), case::to_kebab_case(&value).into());
            self.insert_if_absent(format!("{key}_pascal"), case::to_pascal_case(&value).into());
            self.insert_if_absent(format!("{key}_camel"), case::to_camel_case(&value).into());
        }
    }

    fn insert_if_absent<K: Into<String>>(&mut self, key: K, value: Value) {
        self.values.entry(key.into()).or_insert(value);
    }

    /// Serializes the store into a rendering context.
    pub fn to_context(&self) -> serde_json::Value {
        serde_json::to_value(&self.values).unwrap_or_default()
    }
}

impl From<Answers> for VariableStore {
    fn from(values: Answers) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut store = VariableStore::new();
        store.insert("Name", "upper");
        store.insert("name", "lower");
        assert_eq!(store.get("Name"), Some(&Value::from("upper")));
        assert_eq!(store.get("name"), Some(&Value::from("lower")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_import_pairs_strips_prefix() {
        let mut store = VariableStore::new();
        store.import_pairs(
            "RITUAL_VAR_",
            vec![
                ("RITUAL_VAR_REGION".to_string(), "eu".to_string()),
                ("RITUAL_VAR_".to_string(), "ignored".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ],
        );
        assert_eq!(store.get("region"), Some(&Value::from("eu")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_computed_values_do_not_overwrite_answers() {
        let mut store = VariableStore::new();
        store.insert("year", "custom");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        store.add_computed(now);
        assert_eq!(store.get("year"), Some(&Value::from("custom")));
        assert_eq!(store.get("date"), Some(&Value::from("2024-03-09")));
        assert!(store.get("timestamp").is_some());
    }

    #[test]
    fn test_case_variants() {
        let mut store = VariableStore::new();
        store.insert("app_name", "my-app");
        store.insert("port", 8080i64);
        store.add_case_variants();
        assert_eq!(store.get("app_name_snake"), Some(&Value::from("my_app")));
        assert_eq!(store.get("app_name_pascal"), Some(&Value::from("MyApp")));
        assert!(!store.contains("port_snake"));
    }
}
