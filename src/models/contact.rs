use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct EmergencyContact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub relationship: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated user raising an alert.
#[derive(Debug, Clone, FromRow)]
pub struct UserIdentity {
    pub id: Uuid,
    pub name: String,
}

/// Copy of a contact embedded in an SOS event at dispatch time.
///
/// Stored as JSONB so historical events stay accurate after the live
/// contact is edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSnapshot {
    pub contact_id: Uuid,
    pub name: String,
    pub phone: String,
    pub relationship: String,
    pub delivered: bool,
}

impl ContactSnapshot {
    pub fn of(contact: &EmergencyContact, delivered: bool) -> Self {
        Self {
            contact_id: contact.id,
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            relationship: contact.relationship.clone(),
            delivered,
        }
    }
}

/// Matches the `phone` validation on the contacts table: optional `+`,
/// a non-zero leading digit, at most 16 digits in total.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) if ('1'..='9').contains(&first) => {}
        _ => return false,
    }
    digits.len() <= 16 && chars.all(|c| c.is_ascii_digit())
}

/// Phone number safe for logs above `debug`: everything but the last four
/// characters is starred out.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let keep = chars.len().saturating_sub(4);
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < keep { '*' } else { *c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("+911111111111"));
        assert!(is_valid_phone("9876543210"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("+0911111111"));
        assert!(!is_valid_phone("+91 11111 11111"));
        assert!(!is_valid_phone("+91-abc"));
        assert!(!is_valid_phone("12345678901234567"));
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+911111114321"), "*********4321");
        assert_eq!(mask_phone("12ab"), "12ab");
        assert_eq!(mask_phone("call me maybe"), "*********aybe");
        assert_eq!(mask_phone(""), "");
    }
}
