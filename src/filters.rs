//! Label filters passed as `q` query parameters.
//!
//! Supported expressions are `name=value`, `name!=value`, `name=~regex` and
//! `name!~regex`. Regexes have to match the whole value. `@receiver` matches
//! the receiver of an alert instead of a label.
use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::models::{AlertGroup, GroupAlert};

#[allow(clippy::expect_used)]
static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(@?[a-zA-Z_][a-zA-Z0-9_]*)(=~|!~|!=|=)(.+)$").expect("invalid filter expression regex")
});

/// Error occuring when parsing a filter expression
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("filter {0:?} is not of the form name<op>value")]
    Syntax(String),
    #[error("unknown special filter {0:?}")]
    UnknownSpecial(String),
    #[error("invalid regex in filter")]
    Regex(#[from] regex::Error),
}

#[derive(Debug, Clone)]
enum Matcher {
    Equal(String),
    NotEqual(String),
    Regex(Regex),
    NotRegex(Regex),
}

impl Matcher {
    fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Matcher::Equal(expected), Some(value)) => expected == value,
            (Matcher::NotEqual(expected), Some(value)) => expected != value,
            (Matcher::Regex(re), Some(value)) => re.is_match(value),
            (Matcher::NotRegex(re), Some(value)) => !re.is_match(value),
            (Matcher::Equal(_) | Matcher::Regex(_), None) => false,
            (Matcher::NotEqual(_) | Matcher::NotRegex(_), None) => true,
        }
    }
}

/// a parsed filter expression together with its match count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub text: String,
    pub name: String,
    pub matcher: String,
    pub value: String,
    pub is_valid: bool,
    /// number of alerts this filter matched
    pub hits: usize,
    #[serde(skip)]
    compiled: Option<Matcher>,
}

impl Filter {
    /// Parses `text`. Expressions that can't be parsed result in an invalid
    /// filter which never excludes anything.
    pub fn new(text: &str) -> Self {
        let mut filter = Self {
            text: text.to_string(),
            name: String::new(),
            matcher: String::new(),
            value: String::new(),
            is_valid: false,
            hits: 0,
            compiled: None,
        };

        match Self::parse(text) {
            Ok((name, matcher, value, compiled)) => {
                filter.name = name;
                filter.matcher = matcher;
                filter.value = value;
                filter.compiled = Some(compiled);
                filter.is_valid = true;
            }
            Err(err) => tracing::debug!("ignoring invalid filter: {}", err),
        }

        filter
    }

    fn parse(text: &str) -> Result<(String, String, String, Matcher), FilterError> {
        let captures = EXPRESSION
            .captures(text.trim())
            .ok_or_else(|| FilterError::Syntax(text.to_string()))?;

        let name = captures[1].to_string();
        let matcher = captures[2].to_string();
        let value = captures[3].to_string();

        if name.starts_with('@') && name != "@receiver" {
            return Err(FilterError::UnknownSpecial(name));
        }

        let compiled = match matcher.as_str() {
            "=" => Matcher::Equal(value.clone()),
            "!=" => Matcher::NotEqual(value.clone()),
            "=~" => Matcher::Regex(Regex::new(&format!("^(?:{value})$"))?),
            _ => Matcher::NotRegex(Regex::new(&format!("^(?:{value})$"))?),
        };

        Ok((name, matcher, value, compiled))
    }

    /// Invalid filters match every alert.
    pub fn matches(&self, alert: &GroupAlert) -> bool {
        let compiled = match &self.compiled {
            Some(compiled) => compiled,
            None => return true,
        };

        let value = if self.name == "@receiver" {
            Some(alert.receiver.as_str())
        } else {
            alert.labels.get(&self.name).map(String::as_str)
        };

        compiled.matches(value)
    }
}

/// Parses all filter expressions. The flag is set if at least one of them is
/// valid.
pub fn filters_from_query(expressions: &[String]) -> (Vec<Filter>, bool) {
    let filters: Vec<Filter> = expressions.iter().map(|text| Filter::new(text)).collect();
    let valid = filters.iter().any(|filter| filter.is_valid);

    (filters, valid)
}

/// Keeps the alerts matching every filter and drops groups left empty.
/// Updates the hit count of each filter.
pub fn apply_filters(
    groups: HashMap<String, AlertGroup>,
    filters: &mut [Filter],
) -> HashMap<String, AlertGroup> {
    groups
        .into_iter()
        .filter_map(|(id, mut group)| {
            let before = group.alerts.len();

            group.alerts.retain(|alert| {
                let mut keep = true;
                for filter in filters.iter_mut() {
                    if filter.matches(alert) {
                        if filter.is_valid {
                            filter.hits += 1;
                        }
                    } else {
                        keep = false;
                    }
                }
                keep
            });

            if group.alerts.is_empty() {
                return None;
            }
            if group.alerts.len() != before {
                group.refresh_latest_starts_at();
                group.refresh_shared();
            }

            Some((id, group))
        })
        .collect()
}
