use rand::{rngs::OsRng, Rng};

/// Marks a key as generated by this service.
pub const KEY_PREFIX: &str = "CS_";
pub const DEFAULT_KEY_LENGTH: usize = 25;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Returns `KEY_PREFIX` followed by `length` characters drawn uniformly from
/// lowercase letters, plus uppercase letters and digits when enabled.
pub fn generate(length: usize, use_upper: bool, use_digits: bool) -> String {
    let mut alphabet = LOWER.to_vec();
    if use_upper {
        alphabet.extend_from_slice(UPPER);
    }
    if use_digits {
        alphabet.extend_from_slice(DIGITS);
    }

    let mut rng = OsRng;
    let mut key = String::with_capacity(KEY_PREFIX.len() + length);
    key.push_str(KEY_PREFIX);
    for _ in 0..length {
        key.push(alphabet[rng.gen_range(0..alphabet.len())] as char);
    }
    key
}

pub fn generate_default() -> String {
    generate(DEFAULT_KEY_LENGTH, true, true)
}
