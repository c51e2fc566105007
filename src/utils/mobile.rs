use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn local_mobile_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^09\d{9}$").expect("static regex"))
}

/// Normalise an Iranian mobile number to `09XXXXXXXXX`.
///
/// Accepts `09XXXXXXXXX`, `+989XXXXXXXXX` and `989XXXXXXXXX`; spaces, dashes
/// and parentheses are ignored.
pub fn normalize_mobile(mobile: &str) -> AppResult<String> {
    let cleaned: String = mobile
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let local = if let Some(rest) = cleaned.strip_prefix("+98") {
        format!("0{rest}")
    } else if cleaned.starts_with("98") && cleaned.len() == 12 {
        format!("0{}", &cleaned[2..])
    } else {
        cleaned
    };

    if !local_mobile_regex().is_match(&local) {
        return Err(AppError::ValidationError(format!(
            "Invalid mobile number: {mobile}"
        )));
    }

    Ok(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_accepted_formats() {
        assert_eq!(normalize_mobile("09121234567").unwrap(), "09121234567");
        assert_eq!(normalize_mobile("+989121234567").unwrap(), "09121234567");
        assert_eq!(normalize_mobile("989121234567").unwrap(), "09121234567");
        assert_eq!(normalize_mobile("0912 123-4567").unwrap(), "09121234567");
        assert_eq!(normalize_mobile("(+98) 912 123 4567").unwrap(), "09121234567");
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        assert!(normalize_mobile("").is_err());
        assert!(normalize_mobile("0912123456").is_err());
        assert!(normalize_mobile("08121234567").is_err());
        assert!(normalize_mobile("+12345678901").is_err());
        assert!(normalize_mobile("0912abc4567").is_err());
    }
}
