//! Utility functions for the walletlink library
//!
//! This module provides common helpers used across the library:
//! - Fixed-point unit formatting (wei, lamports)
//! - Hex quantity parsing
//! - Address validation, normalisation and display

use alloy_primitives::{utils, Address, U256};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

/// Decimals of SOL (lamports per SOL = 10^9)
pub const SOLANA_DECIMALS: u8 = 9;

/// Format an integer amount of base units as a decimal string.
///
/// Mirrors `formatEther`/`formatUnits`: the integer part is always present,
/// the fractional part keeps at least one digit and drops trailing zeros.
pub fn format_units(value: U256, decimals: u8) -> String {
    let formatted = utils::format_units(value, decimals).unwrap_or_else(|_| value.to_string());
    trim_fraction(formatted)
}

/// Format wei as ether
pub fn format_ether(wei: U256) -> String {
    format_units(wei, crate::network::NATIVE_DECIMALS)
}

fn trim_fraction(mut formatted: String) -> String {
    match formatted.find('.') {
        Some(dot) => {
            while formatted.len() > dot + 2 && formatted.ends_with('0') {
                formatted.pop();
            }
        }
        None => formatted.push_str(".0"),
    }
    formatted
}

/// Parse a JSON-RPC quantity (`"0x1bc16d674ec80000"`); `"0x"` counts as zero
pub fn parse_quantity(value: &str) -> Option<U256> {
    let digits = value.trim().strip_prefix("0x")?;
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).ok()
}

/// Shorten an address for display: `0x1234...abcd`
pub fn shorten_address(address: &str, chars: usize) -> String {
    if address.is_empty() {
        return String::new();
    }
    if address.len() <= chars * 2 + 2 || !address.is_ascii() {
        return address.to_string();
    }
    format!(
        "{}...{}",
        &address[..chars + 2],
        &address[address.len() - chars..]
    )
}

/// Whether `address` looks like a 20-byte hex EVM address
pub fn is_evm_address(address: &str) -> bool {
    address.starts_with("0x") && Address::from_str(address).is_ok()
}

/// Whether `address` looks like a base58 Solana public key
pub fn is_solana_address(address: &str) -> bool {
    static BASE58: OnceLock<Regex> = OnceLock::new();
    BASE58
        .get_or_init(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("valid base58 pattern"))
        .is_match(address)
}

/// Canonical form kept in the session: lowercase for hex addresses, base58 untouched
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// EIP-55 mixed-case checksum encoding of a hex address
pub fn to_checksum_address(address: &str) -> Option<String> {
    if !is_evm_address(&address.to_lowercase()) {
        return None;
    }
    Address::from_str(address).ok().map(|address| address.to_checksum(None))
}
