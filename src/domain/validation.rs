//! Input normalisation shared by the services, the web forms and the CLI.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidInput(pub String);

impl InvalidInput {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Parses a dotted-quad IPv4 address and returns its canonical form.
///
/// Every octet must be 1-3 decimal digits in `0..=255`; leading zeros are
/// dropped so `010.0.0.1` and `10.0.0.1` address the same machine.
pub fn parse_ipv4(raw: &str) -> Result<String, InvalidInput> {
    let trimmed = raw.trim();
    let invalid = || InvalidInput(format!("{trimmed} is in invalid format"));

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() != 4 {
        return Err(invalid());
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        *slot = part.parse::<u8>().map_err(|_| invalid())?;
    }

    Ok(format!(
        "{}.{}.{}.{}",
        octets[0], octets[1], octets[2], octets[3]
    ))
}

/// Parses a usage duration in hours. Fractions are allowed, zero is not.
pub fn parse_hours(raw: &str) -> Result<f64, InvalidInput> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| InvalidInput::new("Duration must be a number of hours"))?;
    check_hours(value)
}

pub fn check_hours(value: f64) -> Result<f64, InvalidInput> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InvalidInput::new("Duration must be greater than zero"))
    }
}

/// Trims `raw` and rejects it when nothing is left.
pub fn require_text(field: &str, raw: &str) -> Result<String, InvalidInput> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Emails identify accounts, so they are compared case-insensitively.
pub fn normalize_email(raw: &str) -> Result<String, InvalidInput> {
    let email = require_text("Email", raw)?.to_ascii_lowercase();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(InvalidInput(format!("{email} is not a valid email address")));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dotted_quads() {
        assert_eq!(parse_ipv4("10.0.0.5").unwrap(), "10.0.0.5");
        assert_eq!(parse_ipv4(" 192.168.1.10 ").unwrap(), "192.168.1.10");
        assert_eq!(parse_ipv4("0.0.0.0").unwrap(), "0.0.0.0");
        assert_eq!(parse_ipv4("255.255.255.255").unwrap(), "255.255.255.255");
        assert_eq!(parse_ipv4("010.000.0.1").unwrap(), "10.0.0.1");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_ipv4("999.1.1.1").is_err());
        assert!(parse_ipv4("256.0.0.1").is_err());
        assert!(parse_ipv4("1.2.3").is_err());
        assert!(parse_ipv4("1.2.3.4.5").is_err());
        assert!(parse_ipv4("a.b.c.d").is_err());
        assert!(parse_ipv4("1..2.3").is_err());
        assert!(parse_ipv4("-1.2.3.4").is_err());
        assert!(parse_ipv4("+1.2.3.4").is_err());
        assert!(parse_ipv4("").is_err());
    }

    #[test]
    fn hours_must_be_positive_numbers() {
        assert_eq!(parse_hours("2").unwrap(), 2.0);
        assert_eq!(parse_hours(" 1.5 ").unwrap(), 1.5);
        assert!(parse_hours("0").is_err());
        assert!(parse_hours("-3").is_err());
        assert!(parse_hours("abc").is_err());
        assert!(parse_hours("").is_err());
        assert!(parse_hours("NaN").is_err());
        assert!(parse_hours("inf").is_err());
    }

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(require_text("Project", "  proj-x ").unwrap(), "proj-x");
        assert!(require_text("Project", "   ").is_err());
    }

    #[test]
    fn emails_are_lowercased() {
        assert_eq!(
            normalize_email(" Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(normalize_email("alice").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("").is_err());
    }
}
