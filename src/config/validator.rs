//! Value checks for settings: path prefixes and CORS origins.

use crate::error::ConfigError;
use axum::http::HeaderValue;

/// A route prefix must start with `/` and must not end with one (`/api/v1`, `/users`).
pub fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
    if !prefix.starts_with('/') || prefix.ends_with('/') || prefix.contains("//") {
        return Err(ConfigError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

/// Parse `BACKEND_CORS_ORIGINS`: a JSON array of strings or a comma-separated list.
/// Origins are trimmed and lose any trailing `/` so they compare equal to browser `Origin` headers.
pub fn parse_cors_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let items: Vec<String> = if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|e| ConfigError::Invalid {
            key: "BACKEND_CORS_ORIGINS",
            reason: e.to_string(),
        })?
    } else {
        raw.split(',').map(str::to_string).collect()
    };

    let mut origins = Vec::with_capacity(items.len());
    for item in items {
        let origin = item.trim().trim_end_matches('/').to_string();
        if origin.is_empty() {
            continue;
        }
        validate_origin(&origin)?;
        if !origins.contains(&origin) {
            origins.push(origin);
        }
    }
    Ok(origins)
}

fn validate_origin(origin: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: "BACKEND_CORS_ORIGINS",
        reason: format!("{}: {}", origin, reason),
    };
    let rest = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))
        .ok_or_else(|| invalid("must start with http:// or https://"))?;
    if rest.is_empty() || rest.contains('/') {
        return Err(invalid("must be scheme://host[:port] with no path"));
    }
    HeaderValue::from_str(origin).map_err(|_| invalid("not a valid header value"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert!(validate_prefix("/api/v1").is_ok());
        assert!(validate_prefix("/users").is_ok());
        assert!(validate_prefix("api/v1").is_err());
        assert!(validate_prefix("/api/v1/").is_err());
        assert!(validate_prefix("/").is_err());
    }

    #[test]
    fn origins_from_json_and_csv() {
        let json = parse_cors_origins(r#"["http://localhost:3000/", "https://example.com"]"#).unwrap();
        assert_eq!(json, vec!["http://localhost:3000", "https://example.com"]);

        let csv = parse_cors_origins("http://a.test, http://b.test ,http://a.test").unwrap();
        assert_eq!(csv, vec!["http://a.test", "http://b.test"]);

        assert!(parse_cors_origins("").unwrap().is_empty());
        assert!(parse_cors_origins("[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_origins() {
        assert!(parse_cors_origins("localhost:3000").is_err());
        assert!(parse_cors_origins("http://a.test/path").is_err());
        assert!(parse_cors_origins("[1, 2]").is_err());
    }
}
