use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get an optional positive integer parameter (e.g. `?limit=5`).
/// Missing, unparsable and zero values all read as `None`.
pub fn get_limit(params: &HashMap<String, String>, key: &str) -> Option<usize> {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_decodes_values() {
        let params = parse_query_params("/suggestions?limit=3&name=Pierre%20Niney&flag");
        assert_eq!(params.get("limit").map(String::as_str), Some("3"));
        assert_eq!(params.get("name").map(String::as_str), Some("Pierre Niney"));
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn limit_ignores_invalid_values() {
        assert_eq!(get_limit(&parse_query_params("/s?limit=2"), "limit"), Some(2));
        assert_eq!(get_limit(&parse_query_params("/s?limit=0"), "limit"), None);
        assert_eq!(get_limit(&parse_query_params("/s?limit=-4"), "limit"), None);
        assert_eq!(get_limit(&parse_query_params("/s"), "limit"), None);
    }
}
