use std::str::FromStr;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse an optional configuration value, falling back to `default` when it is absent or malformed.
/// The error (if any) is handed to `on_error` so that the caller can log it in its own context.
pub fn parse_or_default<T, F>(value: Option<String>, default: T, on_error: F) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: FnOnce(&str, T::Err),
{
    match value {
        None => default,
        Some(s) => match s.trim().parse::<T>() {
            Ok(v) => v,
            Err(e) => {
                on_error(&s, e);
                default
            },
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("YES".into()), false));
        assert!(!parse_boolean_flag(Some("off".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn parse_with_fallback() {
        let mut failures = 0;
        let v: u16 = parse_or_default(Some("8080".into()), 1, |_, _| failures += 1);
        assert_eq!(v, 8080);
        let v: u16 = parse_or_default(Some("eighty".into()), 1, |_, _| failures += 1);
        assert_eq!(v, 1);
        let v: u16 = parse_or_default(None, 7, |_, _| failures += 1);
        assert_eq!(v, 7);
        assert_eq!(failures, 1);
    }
}
