//! Mapping between the `system_settings` key/value table and
//! [`SystemSettings`].

use tracing::warn;
use tradeportal_core::{Currency, SystemSettings};

pub const KEY_BANK_ID: &str = "bankId";
pub const KEY_BRANCH_ID: &str = "branchId";
pub const KEY_SECOND_PASSWORD: &str = "secondPassword";

fn series_key(currency: Currency) -> &'static str {
    match currency {
        Currency::Inr => "inrSeries",
        Currency::Usd => "usdSeries",
    }
}

fn main_account_key(currency: Currency) -> &'static str {
    match currency {
        Currency::Inr => "inrMainAccount",
        Currency::Usd => "usdMainAccount",
    }
}

fn main_user_key(currency: Currency) -> &'static str {
    match currency {
        Currency::Inr => "inrMainAccountUserId",
        Currency::Usd => "usdMainAccountUserId",
    }
}

fn parse_id(key: &str, value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(key, value, "Ignoring non-numeric setting");
            None
        }
    }
}

/// Build settings from raw rows. Unknown keys are ignored; blank values
/// count as unset.
pub fn settings_from_pairs(pairs: &[(String, String)]) -> SystemSettings {
    let mut settings = SystemSettings::default();

    for (key, value) in pairs {
        let key = key.as_str();
        match key {
            KEY_BANK_ID => settings.bank_id = parse_id(key, value),
            KEY_BRANCH_ID => settings.branch_id = parse_id(key, value),
            KEY_SECOND_PASSWORD => {
                settings.second_password = Some(value.clone()).filter(|v| !v.is_empty())
            }
            _ => {
                for currency in Currency::ALL {
                    if key == series_key(currency) {
                        settings.currency_mut(currency).series =
                            Some(value.clone()).filter(|v| !v.trim().is_empty());
                    } else if key == main_account_key(currency) {
                        settings.currency_mut(currency).main_account_id = parse_id(key, value);
                    } else if key == main_user_key(currency) {
                        settings.currency_mut(currency).main_user_id = parse_id(key, value);
                    }
                }
            }
        }
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_full_settings() {
        let s = settings_from_pairs(&pairs(&[
            ("bankId", "11"),
            ("branchId", "22"),
            ("secondPassword", "pin"),
            ("usdSeries", "1000"),
            ("usdMainAccount", "500"),
            ("usdMainAccountUserId", "50"),
            ("inrSeries", "2000"),
            ("siteTitle", "ignored"),
        ]));
        assert_eq!(s.bank_id, Some(11));
        assert_eq!(s.branch_id, Some(22));
        assert_eq!(s.second_password.as_deref(), Some("pin"));

        let usd = s.currency(Currency::Usd).unwrap();
        assert_eq!(usd.series_base(), Some(1000));
        assert_eq!(usd.main_account_id, Some(500));
        assert_eq!(usd.main_user_id, Some(50));
        assert_eq!(s.currency(Currency::Inr).unwrap().series_base(), Some(2000));
    }

    #[test]
    fn test_blank_and_invalid_values_are_unset() {
        let s = settings_from_pairs(&pairs(&[
            ("bankId", "  "),
            ("branchId", "main-branch"),
            ("usdSeries", ""),
        ]));
        assert_eq!(s.bank_id, None);
        assert_eq!(s.branch_id, None);
        assert_eq!(s.currency(Currency::Usd).and_then(|c| c.series.clone()), None);
    }
}
