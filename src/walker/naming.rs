use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9]+").unwrap());

pub fn strip_type_suffix(name: &str) -> &str {
    name.strip_suffix("Type").unwrap_or(name)
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn clean(s: &str) -> String { s.replace('.', "") }

/// `<StrippedParent><Field>Enum`
pub fn enum_type_name(parent: &str, field: &str) -> String {
    format!("{}{}Enum", clean(strip_type_suffix(parent)), capitalize(&clean(field)))
}

/// `<StrippedParent><Field>Type`
pub fn nested_type_name(parent: &str, field: &str) -> String {
    format!("{}{}Type", clean(strip_type_suffix(parent)), capitalize(&clean(field)))
}

pub fn root_type_name(model: &str) -> String { format!("{model}Type") }

/// Raw enum value → GraphQL enum key.
///
/// Upper-cased; every run of non-alphanumerics becomes one `_`; edges trimmed.
/// A key that would start with a digit (or be empty) is prefixed with `_`.
pub fn enum_key(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let collapsed = NON_ALNUM.replace_all(&upper, "_");
    let trimmed = collapsed.trim_matches('_');
    match trimmed.chars().next() {
        None => "_".to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{trimmed}"),
        Some(_) => trimmed.to_string(),
    }
}
