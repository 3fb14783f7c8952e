use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashMap;

/// Every known key with its default value.
pub const DEFAULTS: &[(&str, &str)] = &[
    ("site_name", "EventHub"),
    ("contact_email", ""),
    ("contact_phone", ""),
    ("max_tickets_per_booking", "10"),
    ("booking_time_limit", "30"),
    ("allow_cancellations", "1"),
    ("email_notifications", "1"),
    ("currency", "USD"),
    ("test_mode", "1"),
    ("smtp_host", ""),
    ("smtp_port", "587"),
    ("smtp_username", ""),
    ("smtp_password", ""),
    ("payment_api_key", ""),
    ("payment_api_secret", ""),
];

/// Checkbox keys; a missing form value means "off".
pub const FLAG_KEYS: &[&str] = &["allow_cancellations", "email_notifications", "test_mode"];

/// Integer keys with their inclusive upper bound; the lower bound is 1.
pub const NUMERIC_LIMITS: &[(&str, i64)] = &[
    ("max_tickets_per_booking", 100),
    ("booking_time_limit", 10_080),
    ("smtp_port", 65_535),
];

/// Keys rendered as password inputs and never echoed back.
pub const SECRET_KEYS: &[&str] = &["smtp_password", "payment_api_key", "payment_api_secret"];

pub const CURRENCIES: &[&str] = &["USD", "EUR", "GBP"];

#[derive(Debug, FromRow, Clone)]
pub struct SettingRow {
    pub setting_key: String,
    pub setting_value: String,
}

/// Typed view over the key/value settings store.
#[derive(Debug, Serialize, Clone)]
pub struct SiteSettings {
    pub site_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub max_tickets_per_booking: i64,
    pub booking_time_limit: i64,
    pub allow_cancellations: bool,
    pub email_notifications: bool,
    pub currency: String,
    pub test_mode: bool,
    pub smtp_host: String,
    pub smtp_port: i64,
    pub smtp_username: String,
    #[serde(skip_serializing)]
    pub smtp_password: String,
    #[serde(skip_serializing)]
    pub payment_api_key: String,
    #[serde(skip_serializing)]
    pub payment_api_secret: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self::from_rows(Vec::new())
    }
}

impl SiteSettings {
    pub fn from_rows(rows: Vec<SettingRow>) -> Self {
        let mut map: HashMap<String, String> = DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for row in rows {
            map.insert(row.setting_key, row.setting_value);
        }

        let text = |key: &str| map.get(key).cloned().unwrap_or_default();
        let number = |key: &str, fallback: i64| {
            map.get(key)
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|n| (1..=numeric_limit(key)).contains(n))
                .unwrap_or(fallback)
        };
        let flag = |key: &str| map.get(key).is_some_and(|v| v == "1");

        let currency = text("currency");
        Self {
            site_name: text("site_name"),
            contact_email: text("contact_email"),
            contact_phone: text("contact_phone"),
            max_tickets_per_booking: number("max_tickets_per_booking", 10),
            booking_time_limit: number("booking_time_limit", 30),
            allow_cancellations: flag("allow_cancellations"),
            email_notifications: flag("email_notifications"),
            currency: if CURRENCIES.contains(&currency.as_str()) { currency } else { "USD".to_string() },
            test_mode: flag("test_mode"),
            smtp_host: text("smtp_host"),
            smtp_port: number("smtp_port", 587),
            smtp_username: text("smtp_username"),
            smtp_password: text("smtp_password"),
            payment_api_key: text("payment_api_key"),
            payment_api_secret: text("payment_api_secret"),
        }
    }

    pub fn currency_symbol(&self) -> &'static str {
        currency_symbol(&self.currency)
    }
}

pub fn currency_symbol(code: &str) -> &'static str {
    match code {
        "EUR" => "€",
        "GBP" => "£",
        _ => "$",
    }
}

/// Validates a submitted settings form into the pairs to upsert.
///
/// Every known key is returned so unchecked checkboxes are written as `0`.
/// Unknown keys are rejected, as are numeric values outside their bounds.
pub fn validate_update(form: &HashMap<String, String>) -> Result<Vec<(String, String)>, Vec<String>> {
    let mut errors = Vec::new();

    for key in form.keys() {
        if key != "csrf_token" && !DEFAULTS.iter().any(|(k, _)| k == key) {
            errors.push(format!("Unknown setting: {}", key));
        }
    }

    let mut pairs = Vec::with_capacity(DEFAULTS.len());
    for (key, _) in DEFAULTS {
        let raw = form.get(*key).map(|v| v.trim().to_string());
        let value = if FLAG_KEYS.contains(key) {
            if raw.as_deref().is_some_and(|v| !v.is_empty() && v != "0") { "1".to_string() } else { "0".to_string() }
        } else {
            match raw {
                // Secrets left blank keep their stored value.
                Some(v) if v.is_empty() && SECRET_KEYS.contains(key) => continue,
                Some(v) => v,
                None => continue,
            }
        };

        if let Some((_, max)) = NUMERIC_LIMITS.iter().find(|(k, _)| k == key) {
            if !value.parse::<i64>().is_ok_and(|n| (1..=*max).contains(&n)) {
                errors.push(format!("{} must be a whole number between 1 and {}", humanize(key), max));
                continue;
            }
        }
        if *key == "currency" && !CURRENCIES.contains(&value.as_str()) {
            errors.push("Currency must be one of USD, EUR or GBP".to_string());
            continue;
        }
        if *key == "site_name" && value.is_empty() {
            errors.push("Site name is required".to_string());
            continue;
        }
        pairs.push((key.to_string(), value));
    }

    if errors.is_empty() { Ok(pairs) } else { Err(errors) }
}

fn numeric_limit(key: &str) -> i64 {
    NUMERIC_LIMITS.iter().find(|(k, _)| *k == key).map_or(i64::MAX, |(_, max)| *max)
}

fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_apply_when_store_is_empty() {
        let s = SiteSettings::default();
        assert_eq!(s.site_name, "EventHub");
        assert_eq!(s.max_tickets_per_booking, 10);
        assert_eq!(s.booking_time_limit, 30);
        assert!(s.allow_cancellations);
        assert_eq!(s.currency_symbol(), "$");
    }

    #[test]
    fn unchecked_flags_become_zero() {
        let pairs = validate_update(&form(&[
            ("site_name", "Hub"),
            ("max_tickets_per_booking", "4"),
            ("booking_time_limit", "15"),
            ("currency", "EUR"),
        ]))
        .unwrap();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("allow_cancellations"), Some("0"));
        assert_eq!(get("email_notifications"), Some("0"));
        assert_eq!(get("max_tickets_per_booking"), Some("4"));
        assert_eq!(get("smtp_password"), None);
    }

    #[test]
    fn blank_secrets_are_not_overwritten() {
        let pairs = validate_update(&form(&[
            ("site_name", "Hub"),
            ("max_tickets_per_booking", "4"),
            ("booking_time_limit", "15"),
            ("smtp_port", "25"),
            ("currency", "USD"),
            ("smtp_password", ""),
            ("payment_api_key", "pk_live"),
        ]))
        .unwrap();
        assert!(!pairs.iter().any(|(k, _)| k == "smtp_password"));
        assert!(pairs.iter().any(|(k, v)| k == "payment_api_key" && v == "pk_live"));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_numbers() {
        let errors = validate_update(&form(&[
            ("site_name", "Hub"),
            ("max_tickets_per_booking", "0"),
            ("root_password", "x"),
        ]))
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn invalid_stored_numbers_fall_back() {
        let s = SiteSettings::from_rows(vec![SettingRow {
            setting_key: "max_tickets_per_booking".into(),
            setting_value: "-3".into(),
        }]);
        assert_eq!(s.max_tickets_per_booking, 10);
    }

    #[test]
    fn rejects_numbers_above_their_bound() {
        let errors = validate_update(&form(&[
            ("site_name", "Hub"),
            ("booking_time_limit", "1000000000000"),
            ("smtp_port", "70000"),
            ("max_tickets_per_booking", "100"),
        ]))
        .unwrap_err();
        assert_eq!(errors, vec![
            "Booking time limit must be a whole number between 1 and 10080".to_string(),
            "Smtp port must be a whole number between 1 and 65535".to_string(),
        ]);
    }

    #[test]
    fn oversized_stored_numbers_fall_back() {
        let s = SiteSettings::from_rows(vec![
            SettingRow { setting_key: "booking_time_limit".into(), setting_value: "1000000000000".into() },
            SettingRow { setting_key: "smtp_port".into(), setting_value: "65535".into() },
        ]);
        assert_eq!(s.booking_time_limit, 30);
        assert_eq!(s.smtp_port, 65_535);
    }
}
