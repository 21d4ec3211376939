use std::sync::OnceLock;

use regex::Regex;

/// Placeholder grammar: `{{ env.VAR }}` with an optional
/// `| default("fallback")` clause.
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*env\.([A-Za-z0-9_]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in raw TOML text
///
/// A placeholder with a `default("...")` clause falls back to the default
/// when the variable is unset; without one, an unset variable is an error.
/// TOML comment lines are passed through untouched, so commented-out
/// examples never fail expansion.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut lines = Vec::with_capacity(input.lines().count());

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
            continue;
        }
        lines.push(expand_line(line)?);
    }

    let mut output = lines.join("\n");
    if input.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut result = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in placeholder().captures_iter(line) {
        let matched = captures.get(0).expect("capture 0 always present");
        let var_name = &captures[1];
        let fallback = captures.get(2).map(|m| m.as_str());

        result.push_str(&line[cursor..matched.start()]);

        match std::env::var(var_name) {
            Ok(value) => result.push_str(&value),
            Err(_) => match fallback {
                Some(default) => result.push_str(default),
                None => return Err(format!("environment variable not found: `{var_name}`")),
            },
        }

        cursor = matched.end();
    }

    result.push_str(&line[cursor..]);
    Ok(result)
}
