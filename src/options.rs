//! Command-line options for the markup→PDF tool.
//!
//! Any option listed by `wkhtmltopdf --extended-help` can be passed through
//! [`ToolOptions`] and is printed as `--<key> [values…]`:
//!
//! | Value | Emitted |
//! |-------|---------|
//! | `Flag(true)` | `--toc` |
//! | `Flag(false)` | nothing |
//! | `Value("2")` | `--copies 2` |
//! | `List(["10", "20"])` | `--margin 10 20` |
//! | `Pairs([("k", "v")])` | `--key k v` once per pair |
//!
//! The `replace` key is checked before anything else: it must hold pairs and
//! yields one `--replace <search> <replacement>` per pair.

use crate::error::{PdfComposeError, Result};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Key given special treatment before the generic rules apply.
pub const REPLACE_KEY: &str = "replace";

/// The value of one tool option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Present (`true`) or omitted (`false`).
    Flag(bool),
    /// A single value.
    Value(String),
    /// Several values following one flag.
    List(Vec<String>),
    /// Repeatable key/value pairs.
    Pairs(Vec<(String, String)>),
}

/// An insertion-ordered set of tool options.
///
/// # Example
/// ```rust
/// use edgequake_pdfcompose::ToolOptions;
///
/// let opts = ToolOptions::new()
///     .flag("toc")
///     .value("copies", "2")
///     .replace("FOO", "bar");
/// assert_eq!(
///     opts.to_args().unwrap(),
///     vec!["--toc", "--copies", "2", "--replace", "FOO", "bar"]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOptions {
    entries: Vec<(String, OptionValue)>,
}

impl ToolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing any earlier value but keeping its position.
    pub fn set(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn flag(self, key: impl Into<String>) -> Self {
        self.set(key, OptionValue::Flag(true))
    }

    pub fn value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, OptionValue::Value(value.into()))
    }

    pub fn list<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(
            key,
            OptionValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Append one search/replacement pair to the `replace` option.
    pub fn replace(mut self, search: impl Into<String>, replacement: impl Into<String>) -> Self {
        let pair = (search.into(), replacement.into());
        match self.entries.iter_mut().find(|(k, _)| k == REPLACE_KEY) {
            Some((_, OptionValue::Pairs(pairs))) => pairs.push(pair),
            Some(slot) => slot.1 = OptionValue::Pairs(vec![pair]),
            None => self
                .entries
                .push((REPLACE_KEY.to_string(), OptionValue::Pairs(vec![pair]))),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Translate into the tool's argument list, in insertion order.
    ///
    /// Values are returned raw; escaping happens once, when the command
    /// string is assembled for diagnostics.
    pub fn to_args(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for (key, value) in &self.entries {
            let flag = format!("--{key}");

            if key == REPLACE_KEY {
                let OptionValue::Pairs(pairs) = value else {
                    return Err(PdfComposeError::invalid_input(format!(
                        "option '{REPLACE_KEY}' expects search/replacement pairs, got {value:?}"
                    )));
                };
                for (search, replacement) in pairs {
                    args.extend([flag.clone(), search.clone(), replacement.clone()]);
                }
                continue;
            }

            match value {
                OptionValue::Flag(true) => args.push(flag),
                OptionValue::Flag(false) => {}
                OptionValue::List(values) => {
                    args.push(flag);
                    args.extend(values.iter().cloned());
                }
                OptionValue::Pairs(pairs) => {
                    for (k, v) in pairs {
                        args.extend([flag.clone(), k.clone(), v.clone()]);
                    }
                }
                OptionValue::Value(v) => args.extend([flag, v.clone()]),
            }
        }
        Ok(args)
    }

    /// Decode from a JSON object such as `{"toc": true, "margin": ["10", "20"]}`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(PdfComposeError::invalid_input(format!(
                "tool options must be a JSON object, got {value}"
            )));
        };
        let mut opts = Self::new();
        for (key, v) in map {
            let value = option_value_from_json(&key, v)?;
            opts.insert(key, value);
        }
        Ok(opts)
    }
}

fn scalar(key: &str, v: Value) -> Result<String> {
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(PdfComposeError::invalid_input(format!(
            "option '{key}' has unsupported value {other}"
        ))),
    }
}

fn option_value_from_json(key: &str, v: Value) -> Result<OptionValue> {
    Ok(match v {
        Value::Bool(b) => OptionValue::Flag(b),
        Value::Array(items) => OptionValue::List(
            items
                .into_iter()
                .map(|i| scalar(key, i))
                .collect::<Result<_>>()?,
        ),
        Value::Object(map) => OptionValue::Pairs(
            map.into_iter()
                .map(|(k, i)| Ok((k, scalar(key, i)?)))
                .collect::<Result<_>>()?,
        ),
        other => OptionValue::Value(scalar(key, other)?),
    })
}

impl<'de> Deserialize<'de> for ToolOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ToolOptions::from_json(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(opts: ToolOptions) -> Vec<String> {
        opts.to_args().unwrap()
    }

    #[test]
    fn boolean_true_is_bare_flag() {
        assert_eq!(args(ToolOptions::new().flag("toc")), vec!["--toc"]);
    }

    #[test]
    fn boolean_false_is_omitted() {
        let opts = ToolOptions::new().set("toc", OptionValue::Flag(false));
        assert!(args(opts).is_empty());
    }

    #[test]
    fn single_value() {
        assert_eq!(
            args(ToolOptions::new().value("copies", "2")),
            vec!["--copies", "2"]
        );
    }

    #[test]
    fn list_values_follow_flag() {
        assert_eq!(
            args(ToolOptions::new().list("margin", ["10", "20"])),
            vec!["--margin", "10", "20"]
        );
    }

    #[test]
    fn replace_pairs() {
        let opts = ToolOptions::new().replace("FOO", "bar").replace("N", "1");
        assert_eq!(
            args(opts),
            vec!["--replace", "FOO", "bar", "--replace", "N", "1"]
        );
    }

    #[test]
    fn replace_with_scalar_is_rejected() {
        let opts = ToolOptions::new().value(REPLACE_KEY, "oops");
        assert!(matches!(
            opts.to_args(),
            Err(PdfComposeError::InvalidInput { .. })
        ));
    }

    #[test]
    fn pairs_under_other_key_repeat_flag() {
        let opts = ToolOptions::new().set(
            "custom-header",
            OptionValue::Pairs(vec![("Accept".into(), "text/html".into())]),
        );
        assert_eq!(args(opts), vec!["--custom-header", "Accept", "text/html"]);
    }

    #[test]
    fn insertion_order_is_kept_and_set_overwrites_in_place() {
        let opts = ToolOptions::new()
            .value("page-size", "A4")
            .flag("grayscale")
            .value("page-size", "Letter");
        assert_eq!(
            args(opts),
            vec!["--page-size", "Letter", "--grayscale"]
        );
    }

    #[test]
    fn decodes_from_json() {
        let opts = ToolOptions::from_json(json!({
            "toc": true,
            "copies": 2,
            "margin": ["10", "20"],
            "replace": {"FOO": "bar"}
        }))
        .unwrap();
        assert_eq!(
            args(opts),
            vec![
                "--toc", "--copies", "2", "--margin", "10", "20", "--replace", "FOO", "bar"
            ]
        );
    }

    #[test]
    fn deserialize_rejects_non_object() {
        let res: std::result::Result<ToolOptions, _> = serde_json::from_str("[1, 2]");
        assert!(res.is_err());
    }
}
