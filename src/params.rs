//! Multi-valued string parameters.
//!
//! Holds request form values and route-extracted values under one view.
//! Values stay untyped strings; numeric and date coercions happen at read
//! time and degrade to zero or empty instead of failing.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

/// A map from key to an ordered list of string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, Vec<String>>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.values
            .get(key)
            .and_then(|v| v.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All values for `key` in insertion order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value as an integer.
    ///
    /// Anything after the last decimal digit is dropped before parsing, so
    /// `"42abc"` reads as 42. Values that still fail to parse read as 0.
    pub fn get_int(&self, key: &str) -> i64 {
        lenient_int(self.get(key))
    }

    /// Every value as an integer, unparseable values reading as 0.
    pub fn get_ints(&self, key: &str) -> Vec<i64> {
        self.get_all(key)
            .iter()
            .map(|v| v.parse().unwrap_or(0))
            .collect()
    }

    /// Distinct non-zero integers in first-seen order. Blank values are skipped.
    pub fn get_unique_ints(&self, key: &str) -> Vec<i64> {
        let mut ints = Vec::new();
        for v in self.get_all(key) {
            if v.is_empty() {
                continue;
            }
            let i = v.parse().unwrap_or(0);
            if i != 0 && !ints.contains(&i) {
                ints.push(i);
            }
        }
        ints
    }

    /// Non-blank values joined with commas.
    pub fn get_ints_string(&self, key: &str) -> String {
        self.get_all(key)
            .iter()
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// First value parsed with a strftime-style `format`.
    ///
    /// Formats without a time component yield midnight on that date.
    pub fn get_date(&self, key: &str, format: &str) -> Option<NaiveDateTime> {
        let v = self.get(key);
        NaiveDateTime::parse_from_str(v, format)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(v, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    /// True when the first value is empty or missing.
    pub fn blank(&self, key: &str) -> bool {
        self.get(key).is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Replace all values for `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, value.to_string());
    }

    /// Append a value for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    /// Collapse the values for `key` into one comma-joined value, replacing
    /// the stored list with it.
    pub fn flatten(&mut self, key: &str) -> String {
        match self.values.get_mut(key) {
            Some(values) => {
                let flat = values.join(",");
                *values = vec![flat.clone()];
                flat
            }
            None => String::new(),
        }
    }

    /// Flat view keeping only the first value per key.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .filter_map(|(k, v)| v.first().map(|first| (k.clone(), first.clone())))
            .collect()
    }

    /// Append every value of `other` after the existing ones.
    pub fn extend(&mut self, other: Params) {
        for (k, v) in other.values {
            self.values.entry(k).or_default().extend(v);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.add(k, v);
        }
        params
    }
}

fn lenient_int(v: &str) -> i64 {
    let end = v.rfind(|c: char| c.is_ascii_digit()).map_or(0, |i| i + 1);
    v[..end].parse().unwrap_or(0)
}
