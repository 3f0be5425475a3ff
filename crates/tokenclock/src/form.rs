// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `application/x-www-form-urlencoded` body encoding.

use std::fmt;

use indexmap::IndexMap;

/// Ordered form fields. `None` values are skipped during encoding.
pub type FormFields<'a> = IndexMap<&'a str, Option<FormValue>>;

/// A single form field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl FormValue {
    fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FormValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FormValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

/// Encode fields as a form body, in iteration order.
///
/// Absent and empty-string values are omitted. Spaces encode as `+`.
pub fn encode_form(fields: &FormFields<'_>) -> String {
    fields
        .iter()
        .filter_map(|(name, value)| match value {
            Some(v) if !v.is_empty() => Some(format!("{name}={}", urlencoding(&v.to_string()))),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(char::from(b)),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
#[path = "form_tests.rs"]
mod tests;
