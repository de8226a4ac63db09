//! CEC protocol domain types.
//!
//! Addresses and opcodes as they appear in the DUT's console output: logical
//! addresses are single hex nibbles, physical addresses are dotted nibble
//! quads ("2.0.0.1"), opcodes are `0x`-prefixed byte tokens.

mod address;
mod opcode;

pub use address::{LogicalAddress, PhysicalAddress};
pub use opcode::Opcode;

/// Normalize a hex byte token to lowercase `"0xHH"` form.
///
/// Accepts bare hex ("20", "9E") and prefixed hex ("0x20"). Transcript lines,
/// profile payload tables, and expectation payloads all pass through here so
/// comparisons reduce to string equality.
pub fn normalize_byte_token(token: &str) -> String {
    let trimmed = token.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", hex.to_ascii_lowercase())
}

/// Parse a hex byte token ("0x20" or "20") into its value.
pub fn parse_byte_token(token: &str) -> Option<u8> {
    let trimmed = token.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u8::from_str_radix(hex, 16).ok()
}

/// Format a byte as a lowercase `"0xHH"` token.
pub fn byte_token(value: u8) -> String {
    format!("0x{:02x}", value)
}
