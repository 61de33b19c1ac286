//! Time-sortable identifiers for persistent entities.
//!
//! Every entity in §3 of the design carries a 26-character Crockford base32
//! id: a 48-bit millisecond Unix timestamp followed by 80 bits of random
//! data, encoded the way a ULID is. Lexical order of the string matches
//! creation order. Entity-type namespaces aren't baked into the id itself;
//! the store layer prefixes keys by entity type so two entities of
//! different kinds never collide even if they share an id by coincidence.

use rand::RngCore;

const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Generates a new 26-character time-sortable id.
#[must_use]
pub fn new_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut random = [0u8; 10];
    rand::rng().fill_bytes(&mut random);
    encode(millis, &random)
}

/// Encodes a timestamp (milliseconds) and 80 bits of randomness as a
/// 26-character Crockford base32 string.
fn encode(millis: u64, random: &[u8; 10]) -> String {
    let mut bytes = [0u8; 16];
    bytes[0..6].copy_from_slice(&millis.to_be_bytes()[2..8]);
    bytes[6..16].copy_from_slice(random);

    let mut out = String::with_capacity(26);
    // 128 bits packed 5 bits at a time, most-significant first; the last
    // group is short (128 = 25*5 + 3) so it's padded with zero low bits.
    let mut acc: u32 = 0;
    let mut acc_bits: u32 = 0;
    for byte in bytes {
        acc = (acc << 8) | u32::from(byte);
        acc_bits += 8;
        while acc_bits >= 5 {
            acc_bits -= 5;
            let idx = (acc >> acc_bits) & 0x1F;
            out.push(CROCKFORD_ALPHABET[idx as usize] as char);
        }
    }
    if acc_bits > 0 {
        let idx = (acc << (5 - acc_bits)) & 0x1F;
        out.push(CROCKFORD_ALPHABET[idx as usize] as char);
    }
    out
}

/// Validates that a string has the shape of a generated id (26 chars,
/// Crockford base32 alphabet). Does not imply the id is known to the store.
#[must_use]
pub fn is_well_formed(id: &str) -> bool {
    id.len() == 26
        && id
            .bytes()
            .all(|b| CROCKFORD_ALPHABET.contains(&b.to_ascii_uppercase()))
}
