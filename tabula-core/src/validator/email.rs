use super::{DataState, FieldValidator, current, resolve};
use crate::{CrudError, Record, Result, Value};

/// Email address field.
///
/// Accepts a bare address or the `Display Name <address>` form, and stores only the address.
#[derive(Debug, Default, Clone)]
pub struct EmailValidator {
    pub not_null: bool,
}

impl FieldValidator for EmailValidator {
    fn validate_field(&self, record: &mut Record, field: &str, _state: DataState) -> Result<()> {
        let value = match current(record, field) {
            Some(Value::Varchar(Some(v))) => Some(
                parse_email_address(v)
                    .ok_or_else(|| CrudError::constraint(field, "is not a valid email address"))?,
            ),
            Some(v) => return Err(CrudError::type_mismatch(field, "string", v).into()),
            None => None,
        };
        resolve(
            record,
            field,
            value.map(|v| Value::Varchar(Some(v))),
            None,
            self.not_null,
        )
    }
}

/// Extract the address out of `local@domain` or `Name <local@domain>`.
pub fn parse_email_address(value: &str) -> Option<String> {
    let value = value.trim();
    let address = match (value.rfind('<'), value.strip_suffix('>')) {
        (Some(start), Some(inner)) => &inner[start + 1..],
        (None, None) => value,
        _ => return None,
    };
    let (local, domain) = address.trim().rsplit_once('@')?;
    if is_valid_local(local) && is_valid_domain(domain) {
        Some(format!("{}@{}", local, domain))
    } else {
        None
    }
}

fn is_valid_local(local: &str) -> bool {
    const SPECIAL: &[u8] = b"!#$%&'*+-/=?^_`{|}~";
    !local.is_empty()
        && local.len() <= 64
        && local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .bytes()
                    .all(|c| c.is_ascii_alphanumeric() || SPECIAL.contains(&c))
        })
}

fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'-')
        })
}

#[cfg(test)]
mod tests {
    use super::parse_email_address;

    #[test]
    fn addresses() {
        assert_eq!(
            parse_email_address("alice@example.com").as_deref(),
            Some("alice@example.com")
        );
        assert_eq!(
            parse_email_address("  Alice Liddell <alice.l+tag@mail.example.org> ").as_deref(),
            Some("alice.l+tag@mail.example.org")
        );
        assert_eq!(parse_email_address("alice"), None);
        assert_eq!(parse_email_address("alice@"), None);
        assert_eq!(parse_email_address("@example.com"), None);
        assert_eq!(parse_email_address("alice@-example.com"), None);
        assert_eq!(parse_email_address("al..ice@example.com"), None);
        assert_eq!(parse_email_address("Alice <alice@example.com"), None);
    }
}
