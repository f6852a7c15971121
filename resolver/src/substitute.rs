//! Deferred `{token}` substitution over a merged configuration.

use std::collections::BTreeMap;

use figment::value::{Dict, Value};

use crate::error::{ConfigError, Result};

/// Declared substitution tokens and the configuration key each expands to.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("home", "ValidatorHome"),
    ("host", "ValidatorHost"),
    ("node", "NodeName"),
    ("base", "BaseDirectory"),
    ("conf_dir", "ConfigDirectory"),
    ("data_dir", "DataDirectory"),
    ("log_dir", "LogDirectory"),
    ("key_dir", "KeyDirectory"),
];

fn placeholder(token: &str) -> String {
    format!("{{{token}}}")
}

fn declared_tokens_in(text: &str) -> impl Iterator<Item = &'static str> + '_ {
    SUBSTITUTIONS
        .iter()
        .map(|(token, _)| *token)
        .filter(move |token| text.contains(&placeholder(token)))
}

/// Resolves the value of every declared token whose target key is present.
///
/// Targets may reference other tokens; expansion repeats until no further
/// token resolves. Tokens caught in a cycle stay unresolved.
fn resolve_targets(values: &Dict) -> BTreeMap<&'static str, String> {
    let mut pending: BTreeMap<&'static str, String> = SUBSTITUTIONS
        .iter()
        .filter_map(|(token, key)| {
            values
                .get(*key)
                .and_then(Value::as_str)
                .map(|v| (*token, v.to_string()))
        })
        .collect();
    let mut resolved = BTreeMap::new();

    loop {
        let mut progressed = false;
        let tokens: Vec<&'static str> = pending.keys().copied().collect();
        for token in tokens {
            let Some(raw) = pending.get(token) else {
                continue;
            };
            let expanded = expand_with(raw, &resolved);
            if declared_tokens_in(&expanded).next().is_none() {
                pending.remove(token);
                resolved.insert(token, expanded);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    resolved
}

fn expand_with(text: &str, resolved: &BTreeMap<&'static str, String>) -> String {
    let mut out = text.to_string();
    for (token, value) in resolved {
        out = out.replace(&placeholder(token), value);
    }
    out
}

fn substitute_value(
    key: &str,
    value: &mut Value,
    resolved: &BTreeMap<&'static str, String>,
) -> Result<()> {
    match value {
        Value::String(_, text) => {
            let expanded = expand_with(text, resolved);
            if let Some(token) = declared_tokens_in(&expanded).next() {
                return Err(ConfigError::UnresolvedVariable {
                    key: key.to_string(),
                    token: token.to_string(),
                });
            }
            *text = expanded;
        }
        Value::Array(_, items) => {
            for item in items {
                substitute_value(key, item, resolved)?;
            }
        }
        Value::Dict(_, dict) => {
            for (_, item) in dict.iter_mut() {
                substitute_value(key, item, resolved)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Expands declared `{token}` placeholders in every string value.
///
/// Text in braces that is not a declared token is left untouched. A declared
/// token whose target key is absent, or which participates in a cycle, is an
/// [`ConfigError::UnresolvedVariable`].
pub fn substitute(values: &mut Dict) -> Result<()> {
    let resolved = resolve_targets(values);
    for (key, value) in values.iter_mut() {
        substitute_value(key, value, &resolved)?;
    }
    Ok(())
}
