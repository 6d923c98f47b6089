//! Helpers over [`http::HeaderMap`].
//!
//! `HeaderMap` already is the case-insensitive multi-map the engine needs:
//! `get`/`get_all` look names up ignoring case, `insert` overwrites every
//! previous value, `append` keeps repeated keys and `remove` drops them all.
//! This module adds the string-level accessors the protocol code uses.

use http::header::{AsHeaderName, IntoHeaderName};
use http::{HeaderMap, HeaderValue};

pub trait HeaderMapExt {
    /// The first value of `name` as a string, `None` if absent or not visible ASCII.
    fn get_str<K: AsHeaderName>(&self, name: K) -> Option<&str>;

    /// Every value of `name`, in insertion order.
    fn get_all_str<K: AsHeaderName>(&self, name: K) -> Vec<&str>;

    /// Whether any comma separated element of any `name` value equals `token`, ignoring case.
    fn contains_token<K: AsHeaderName>(&self, name: K, token: &str) -> bool;

    /// Replaces all values of `name`; values that are not valid header values are ignored.
    fn set<K: IntoHeaderName>(&mut self, name: K, value: &str) -> bool;
}

impl HeaderMapExt for HeaderMap {
    fn get_str<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }

    fn get_all_str<K: AsHeaderName>(&self, name: K) -> Vec<&str> {
        self.get_all(name).iter().filter_map(|value| value.to_str().ok()).collect()
    }

    fn contains_token<K: AsHeaderName>(&self, name: K, token: &str) -> bool {
        self.get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|element| element.trim().eq_ignore_ascii_case(token))
    }

    fn set<K: IntoHeaderName>(&mut self, name: K, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.insert(name, value);
                true
            }
            Err(_) => false,
        }
    }
}
