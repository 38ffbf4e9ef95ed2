//! UUID utilities

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a guid column read back from the database
pub fn parse(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Malformed guid '{}': {}", s, e)))
}

/// Human-readable code: prefix followed by six upper-case hex characters
///
/// Callers are responsible for retrying on collision.
pub fn short_code(prefix: &str) -> String {
    let hex = generate().simple().to_string();
    format!("{}{}", prefix, hex[..6].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_code_shape() {
        let code = short_code("CRS");
        assert_eq!(code.len(), 9);
        assert!(code.starts_with("CRS"));
        assert!(code[3..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("not-a-guid").is_err());
        let id = generate();
        assert_eq!(parse(&id.to_string()).unwrap(), id);
    }
}
