//! `$VAR` / `${VAR}` substitution for configuration layers (secrets)

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("static regex is valid")
    })
}

/// Replace variable references in `text` using `lookup`; unknown variables become empty.
pub fn substitute_env<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_pattern()
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

/// Apply [`substitute_env`] to every string scalar in `value`; keys are left alone.
pub fn substitute_env_in_value<F>(value: &Value, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<String> + ?Sized,
{
    match value {
        Value::String(text) => Value::String(substitute_env(text, lookup)),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| substitute_env_in_value(item, lookup))
                .collect(),
        ),
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .iter()
                .map(|(key, item)| (key.clone(), substitute_env_in_value(item, lookup)))
                .collect::<Mapping>(),
        ),
        Value::Tagged(tagged) => {
            let mut tagged = tagged.clone();
            tagged.value = substitute_env_in_value(&tagged.value, lookup);
            Value::Tagged(tagged)
        }
        other => other.clone(),
    }
}

/// [`substitute_env`] against the process environment
pub fn substitute_env_from_process(text: &str) -> String {
    substitute_env(text, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_braced_and_bare_references() {
        let text = "url: ${KEYCLOAK_BASE_URL}/realms/$REALM\n";
        let out = substitute_env(
            text,
            lookup(&[("KEYCLOAK_BASE_URL", "https://sso.example.com"), ("REALM", "rhdh")]),
        );
        assert_eq!(out, "url: https://sso.example.com/realms/rhdh\n");
    }

    #[test]
    fn test_unknown_variables_become_empty() {
        assert_eq!(substitute_env("secret: ${MISSING}", lookup(&[])), "secret: ");
    }

    #[test]
    fn test_value_substitution_touches_only_strings() {
        let value: Value = serde_yaml::from_str(
            "${KEY}: ${TOKEN}\nport: 7007\nhosts:\n  - https://${HOST}\n",
        )
        .unwrap();
        let out = substitute_env_in_value(
            &value,
            &lookup(&[("TOKEN", "ghp_x"), ("HOST", "devhub.example.com"), ("KEY", "k")]),
        );

        assert_eq!(out["${KEY}"], Value::from("ghp_x"));
        assert_eq!(out["port"], Value::from(7007));
        assert_eq!(out["hosts"][0], Value::from("https://devhub.example.com"));
    }

    #[test]
    fn test_text_without_references_is_unchanged() {
        let text = "price: 5$ and ${not valid}";
        assert_eq!(substitute_env(text, lookup(&[])), text);
    }
}
