//! Escrow contract generator.
//!
//! The template ships inside the binary. Generation is a single left-to-right
//! pass that swaps each `{{TOKEN}}` for its configured value; substituted text
//! is never scanned again, and unknown tokens are copied through untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const ESCROW_TEMPLATE: &str = include_str!("templates/escrow.clar");

/// Placeholder tokens, each present exactly once in [`ESCROW_TEMPLATE`].
pub const PLACEHOLDERS: [&str; 4] = [
    "{{BENEFICIARY}}",
    "{{ARBITER}}",
    "{{UNLOCK_HEIGHT}}",
    "{{USDC_TRAIT_CONTRACT}}",
];

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("invalid escrow configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to parse escrow configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Validated generator input. Principals are written without the leading `'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowConfig {
    pub beneficiary: String,
    pub arbiter: String,
    pub unlock_height: u64,
    pub usdc_trait_contract: String,
}

/// Generator input as a user supplies it, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEscrowConfig {
    pub beneficiary: String,
    pub arbiter: String,
    pub unlock_height: i64,
    pub usdc_trait_contract: String,
}

impl RawEscrowConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, GeneratorError> {
        Ok(toml::from_str(content)?)
    }
}

impl TryFrom<RawEscrowConfig> for EscrowConfig {
    type Error = GeneratorError;

    fn try_from(raw: RawEscrowConfig) -> Result<Self, Self::Error> {
        let unlock_height = u64::try_from(raw.unlock_height).map_err(|_| {
            GeneratorError::InvalidConfiguration(format!(
                "unlock_height must be non-negative, got {}",
                raw.unlock_height
            ))
        })?;

        for (field, value) in [
            ("beneficiary", &raw.beneficiary),
            ("arbiter", &raw.arbiter),
            ("usdc_trait_contract", &raw.usdc_trait_contract),
        ] {
            if value.trim().is_empty() {
                return Err(GeneratorError::InvalidConfiguration(format!("{} is empty", field)));
            }
        }

        Ok(Self {
            beneficiary: raw.beneficiary,
            arbiter: raw.arbiter,
            unlock_height,
            usdc_trait_contract: raw.usdc_trait_contract,
        })
    }
}

impl EscrowConfig {
    /// Parse and validate in one step.
    pub fn from_toml_str(content: &str) -> Result<Self, GeneratorError> {
        RawEscrowConfig::from_toml_str(content)?.try_into()
    }

    fn value_for(&self, token: &str) -> Option<String> {
        match token {
            "BENEFICIARY" => Some(self.beneficiary.clone()),
            "ARBITER" => Some(self.arbiter.clone()),
            "UNLOCK_HEIGHT" => Some(self.unlock_height.to_string()),
            "USDC_TRAIT_CONTRACT" => Some(self.usdc_trait_contract.clone()),
            _ => None,
        }
    }
}

pub fn generate_escrow(config: &EscrowConfig) -> String {
    let mut out = String::with_capacity(ESCROW_TEMPLATE.len() + 128);
    let mut rest = ESCROW_TEMPLATE;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let substitution = after
            .find("}}")
            .and_then(|close| config.value_for(&after[..close]).map(|v| (close, v)));
        match substitution {
            Some((close, value)) => {
                out.push_str(&value);
                rest = &after[close + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);

    debug!(unlock_height = config.unlock_height, "escrow contract generated");
    out
}

/// Cheap sanity check that text is a deployable contract at all.
pub fn looks_like_contract(source: &str) -> bool {
    source.contains("(define-public")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EscrowConfig {
        EscrowConfig {
            beneficiary: "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG".to_string(),
            arbiter: "ST2JHG361ZXG51QTKY2NQCVBPPRRE2KZB1HR05NNC".to_string(),
            unlock_height: 987_654,
            usdc_trait_contract: "SP3Y2ZSH8P7D50B0VBTSX11S7XSG24M1VB9YFQA4K.token-aeusdc".to_string(),
        }
    }

    #[test]
    fn test_template_has_each_placeholder_once() {
        for token in PLACEHOLDERS {
            assert_eq!(ESCROW_TEMPLATE.matches(token).count(), 1, "{}", token);
        }
    }

    #[test]
    fn test_values_substituted_exactly_once() {
        let cfg = config();
        let out = generate_escrow(&cfg);
        assert_eq!(out.matches(&cfg.beneficiary).count(), 1);
        assert_eq!(out.matches(&cfg.arbiter).count(), 1);
        assert_eq!(out.matches("987654").count(), 1);
        assert_eq!(out.matches(&cfg.usdc_trait_contract).count(), 1);
        assert!(!out.contains("{{"));
        assert!(out.contains("(define-constant UNLOCK-HEIGHT u987654)"));
    }

    #[test]
    fn test_injected_values_are_not_rescanned() {
        let mut cfg = config();
        cfg.beneficiary = "{{ARBITER}}".to_string();
        let out = generate_escrow(&cfg);
        assert!(out.contains("(define-constant BENEFICIARY '{{ARBITER}})"));
        assert_eq!(out.matches(&cfg.arbiter).count(), 1);
    }

    #[test]
    fn test_generated_contract_is_clean() {
        let out = generate_escrow(&config());
        assert!(looks_like_contract(&out));
        assert!(crate::analyze(&out).is_empty());
    }

    #[test]
    fn test_negative_height_rejected() {
        let raw = RawEscrowConfig {
            beneficiary: "ST1".into(),
            arbiter: "ST2".into(),
            unlock_height: -1,
            usdc_trait_contract: "ST3.usdc".into(),
        };
        let err = EscrowConfig::try_from(raw).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_principal_rejected() {
        let raw = RawEscrowConfig {
            beneficiary: "ST1".into(),
            arbiter: "  ".into(),
            unlock_height: 10,
            usdc_trait_contract: "ST3.usdc".into(),
        };
        let err = EscrowConfig::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("arbiter"));
    }

    #[test]
    fn test_toml_input() {
        let cfg = EscrowConfig::from_toml_str(
            r#"
beneficiary = "ST1"
arbiter = "ST2"
unlock_height = 1200
usdc_trait_contract = "ST3.usdc"
"#,
        )
        .unwrap();
        assert_eq!(cfg.unlock_height, 1200);
        assert!(matches!(
            EscrowConfig::from_toml_str("beneficiary = 3"),
            Err(GeneratorError::Parse(_))
        ));
    }
}
