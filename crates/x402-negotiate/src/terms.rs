//! Payment terms: what a resource server demands before releasing a resource.
//!
//! Amounts travel as base-unit integers encoded in decimal strings. Every
//! conversion here is integer-only; no `f64` anywhere in the pipeline.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::constants::NATIVE_DECIMALS;
use crate::error::X402Error;

/// The payment demand carried by a 402 response.
///
/// Fields are private so a stored instance cannot be altered mid-negotiation;
/// the controller only ever hands out clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTerms {
    chain_id: String,
    recipient: String,
    amount: String,
    currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl PaymentTerms {
    pub fn new(
        chain_id: impl Into<String>,
        recipient: impl Into<String>,
        amount: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            recipient: recipient.into(),
            amount: amount.into(),
            currency: currency.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Amount owed, in base units.
    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Check the invariants a negotiation relies on.
    pub fn validate(&self) -> Result<(), X402Error> {
        if self.chain_id.trim().is_empty() {
            return Err(X402Error::MalformedTerms("chainId is empty".to_string()));
        }
        if self.recipient.trim().is_empty() {
            return Err(X402Error::MalformedTerms("recipient is empty".to_string()));
        }
        parse_base_units(&self.amount)?;
        Ok(())
    }

    /// The amount as a 256-bit integer.
    pub fn amount_base_units(&self) -> Result<U256, X402Error> {
        parse_base_units(&self.amount)
    }

    /// The amount in whole native units, e.g. `"0.000001"`.
    pub fn display_amount(&self) -> Result<String, X402Error> {
        format_display_amount(&self.amount, NATIVE_DECIMALS)
    }

    /// Numeric chain id. Accepts `0x`-prefixed hex or plain decimal.
    pub fn chain_id_number(&self) -> Result<u64, X402Error> {
        let raw = self.chain_id.trim();
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => raw.parse::<u64>(),
        };
        parsed.map_err(|e| X402Error::MalformedTerms(format!("invalid chainId '{raw}': {e}")))
    }
}

/// Parse a non-negative base-10 integer string into base units.
///
/// Rejects signs, whitespace, hex prefixes and anything wider than 256 bits.
pub fn parse_base_units(amount: &str) -> Result<U256, X402Error> {
    if amount.is_empty() {
        return Err(X402Error::MalformedTerms("amount is empty".to_string()));
    }
    if !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(X402Error::MalformedTerms(format!(
            "amount '{amount}' is not a base-10 integer"
        )));
    }
    U256::from_str_radix(amount, 10)
        .map_err(|e| X402Error::MalformedTerms(format!("amount '{amount}': {e}")))
}

fn decimal_scale(decimals: u32) -> Result<U256, X402Error> {
    U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(|| X402Error::MalformedTerms(format!("{decimals} decimals is out of range")))
}

/// Render a base-unit amount as a decimal string with `decimals` places.
///
/// Trailing fractional zeros are trimmed but one fractional digit is always
/// kept, so `10^18` at 18 decimals renders as `"1.0"`.
pub fn format_display_amount(amount: &str, decimals: u32) -> Result<String, X402Error> {
    let value = parse_base_units(amount)?;
    let scale = decimal_scale(decimals)?;

    let whole = value / scale;
    let fraction = value % scale;

    let padded = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    let trimmed = padded.trim_end_matches('0');
    let fraction_str = if trimmed.is_empty() { "0" } else { trimmed };

    Ok(format!("{whole}.{fraction_str}"))
}

/// Inverse of [`format_display_amount`]: `"0.000001"` at 18 decimals is `10^12`.
///
/// Fractional digits beyond `decimals` are truncated.
pub fn parse_display_amount(display: &str, decimals: u32) -> Result<U256, X402Error> {
    let malformed = |why: &str| X402Error::MalformedTerms(format!("amount '{display}': {why}"));

    let (integer_part, fractional_part) = display.split_once('.').unwrap_or((display, ""));
    if integer_part.is_empty() && fractional_part.is_empty() {
        return Err(malformed("no numeric content"));
    }

    let integer = if integer_part.is_empty() {
        U256::ZERO
    } else {
        parse_base_units(integer_part)?
    };

    if !fractional_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("fraction is not a base-10 integer"));
    }

    let width = decimals as usize;
    let fraction_digits = if fractional_part.len() > width {
        &fractional_part[..width]
    } else {
        fractional_part
    };
    let fraction = if fraction_digits.is_empty() {
        U256::ZERO
    } else {
        let raw = parse_base_units(fraction_digits)?;
        let pad = decimal_scale((width - fraction_digits.len()) as u32)?;
        raw.checked_mul(pad).ok_or_else(|| malformed("overflow"))?
    };

    integer
        .checked_mul(decimal_scale(decimals)?)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(|| malformed("overflow"))
}
