use std::env;
use std::str::FromStr;
use tracing::warn;

/// Retrieves an environment variable and parses it, falling back to a default.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `default`: The value used when the variable is unset or does not parse.
///
/// # Returns
/// - `T`
pub fn get_env_var_or<T: FromStr>(var: &str, default: T) -> T {
    parse_or_default(var, env::var(var).ok(), default)
}

/// Retrieves an environment variable as a string, falling back to a default.
pub fn get_env_string_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Retrieves an optional, non-empty environment variable.
pub fn get_env_optional(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or_default<T: FromStr>(var: &str, raw: Option<String>, default: T) -> T {
    match raw.as_deref().map(str::trim) {
        None | Some("") => default,
        Some(value) => match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring unparsable value '{}' for {}", value, var);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or_default("X", Some(" 42 ".to_string()), 7u32), 42);
        assert_eq!(parse_or_default("X", Some("forty".to_string()), 7u32), 7);
        assert_eq!(parse_or_default("X", Some(String::new()), 0.3f64), 0.3);
        assert_eq!(parse_or_default::<f32>("X", None, 0.7), 0.7);
    }
}
