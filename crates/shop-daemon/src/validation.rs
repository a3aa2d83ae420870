//! Address validation.
//!
//! Deliveries are limited to one region: the pincode must be the configured
//! prefix followed by ASCII digits up to six in total (`^641[0-9]{3}$` by
//! default) and the phone must be exactly ten ASCII digits. Rejections carry the message shown to
//! the customer; nothing is persisted for a rejected submission.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use shop_config::AddressConfig;
use shop_schemas::AddressInput;

const PINCODE_LEN: usize = 6;

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^[0-9]{10}$").expect("literal phone pattern compiles"))
}

#[derive(Debug, Clone)]
pub struct AddressRule {
    pincode: Regex,
    region_name: String,
}

impl Default for AddressRule {
    fn default() -> Self {
        Self::from_config(&AddressConfig::default())
            .expect("default address config yields a valid pincode pattern")
    }
}

impl AddressRule {
    pub fn from_config(cfg: &AddressConfig) -> Result<Self> {
        let prefix = cfg.pincode_prefix.trim();
        let rest = PINCODE_LEN.saturating_sub(prefix.len());
        let pattern = format!(r"^{}[0-9]{{{}}}$", regex::escape(prefix), rest);
        let pincode = Regex::new(&pattern)
            .with_context(|| format!("invalid pincode pattern built from prefix {prefix:?}"))?;
        Ok(Self {
            pincode,
            region_name: cfg.region_name.clone(),
        })
    }

    /// `Err(message)` names the first rule the input breaks.
    pub fn check(&self, input: &AddressInput) -> Result<(), String> {
        if !self.pincode.is_match(input.pincode.trim()) {
            return Err(format!("Only {} pincodes allowed", self.region_name));
        }
        if !phone_pattern().is_match(input.phone.trim()) {
            return Err("Phone must be 10 digits".to_string());
        }
        if input.street.trim().is_empty()
            || input.city.trim().is_empty()
            || input.state.trim().is_empty()
        {
            return Err("Street, city and state are required".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pincode: &str, phone: &str) -> AddressInput {
        AddressInput {
            street: "7 DB Rd".to_string(),
            city: "Coimbatore".to_string(),
            state: "Tamil Nadu".to_string(),
            pincode: pincode.to_string(),
            phone: phone.to_string(),
        }
    }

    #[test]
    fn pincode_must_carry_regional_prefix() {
        let rule = AddressRule::default();
        assert_eq!(
            rule.check(&input("600001", "9876543210")),
            Err("Only Coimbatore pincodes allowed".to_string())
        );
        assert_eq!(rule.check(&input("641045", "9876543210")), Ok(()));
        assert!(rule.check(&input("6410451", "9876543210")).is_err());
        assert!(rule.check(&input("64104", "9876543210")).is_err());
        // Arabic-Indic and Devanagari digits are not pincode digits.
        assert!(rule.check(&input("641\u{660}\u{664}\u{665}", "9876543210")).is_err());
        assert!(rule.check(&input("641\u{966}\u{967}\u{968}", "9876543210")).is_err());
    }

    #[test]
    fn phone_must_be_ten_digits() {
        let rule = AddressRule::default();
        assert_eq!(
            rule.check(&input("641045", "98765")),
            Err("Phone must be 10 digits".to_string())
        );
        assert!(rule.check(&input("641045", "987654321a")).is_err());
        assert_eq!(
            rule.check(&input("641045", "\u{669}\u{668}\u{667}\u{666}\u{665}\u{664}\u{663}\u{662}\u{661}\u{660}")),
            Err("Phone must be 10 digits".to_string())
        );
        assert!(rule.check(&input("641045", "98765432\u{967}\u{966}")).is_err());
    }

    #[test]
    fn prefix_comes_from_config() {
        let rule = AddressRule::from_config(&AddressConfig {
            pincode_prefix: "600".to_string(),
            region_name: "Chennai".to_string(),
        })
        .unwrap();
        assert_eq!(rule.check(&input("600001", "9876543210")), Ok(()));
        assert_eq!(
            rule.check(&input("641045", "9876543210")),
            Err("Only Chennai pincodes allowed".to_string())
        );
    }
}
