//! `ref('model')` extraction
//!
//! Only the minimal `ref()` form is understood; no Jinja evaluation happens.

use once_cell::sync::Lazy;
use regex::Regex;

/// `ref('model')`, `ref("model")` and the two-argument `ref('package', 'model')`
static REF_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"ref\s*\(\s*(?:['"][^'"]*['"]\s*,\s*)?['"]([^'"]+)['"]\s*\)"#)
        .expect("ref pattern is valid")
});

/// Extract the model name from a `ref()` reference
///
/// Examples:
/// - `{{ ref('orders') }}` -> `orders`
/// - `ref("orders")` -> `orders`
/// - `orders` -> `orders` (no ref call: treated as a literal model name)
pub fn extract_model_name_from_ref(reference: &str) -> String {
    let inner = strip_jinja_braces(reference.trim());

    REF_PATTERN
        .captures(inner)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| inner.trim().to_string())
}

/// Strip one pair of surrounding `{{ }}`
fn strip_jinja_braces(s: &str) -> &str {
    s.strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_jinja_ref() {
        assert_eq!(extract_model_name_from_ref("{{ ref('orders') }}"), "orders");
        assert_eq!(extract_model_name_from_ref("{{ref(\"orders\")}}"), "orders");
    }

    #[test]
    fn extracts_bare_ref() {
        assert_eq!(extract_model_name_from_ref("ref('customers')"), "customers");
        assert_eq!(extract_model_name_from_ref("  ref( 'customers' )  "), "customers");
    }

    #[test]
    fn extracts_package_qualified_ref() {
        assert_eq!(
            extract_model_name_from_ref("{{ ref('jaffle_shop', 'orders') }}"),
            "orders"
        );
    }

    #[test]
    fn plain_string_passes_through() {
        assert_eq!(extract_model_name_from_ref("plain_string"), "plain_string");
        assert_eq!(extract_model_name_from_ref("  padded  "), "padded");
    }
}
