//! Chunked text formatting of byte buffers.
//!
//! A buffer is read as consecutive 16-byte little-endian words, each the
//! numeric value of one `u128` program field. The words are distributed
//! over a fixed number of chunks, short buffers padded with zero words so
//! every chunk carries the same number of fields.

use oracle_shared::Result;

use crate::check_chunks;

/// Numeric value of one 16-byte little-endian word.
///
/// Equivalent to byte-reversing the word and reading it big-endian, which
/// is how downstream programs spell the conversion.
pub fn word_to_u128(word: &[u8; 16]) -> u128 {
    u128::from_le_bytes(*word)
}

/// Split a 32-byte digest into its two `u128` chunks.
pub fn digest_chunks(digest: &[u8; 32]) -> (u128, u128) {
    let mut lo = [0u8; 16];
    let mut hi = [0u8; 16];
    lo.copy_from_slice(&digest[..16]);
    hi.copy_from_slice(&digest[16..]);
    (word_to_u128(&lo), word_to_u128(&hi))
}

/// Render `bytes` as `chunks` structs of `u128` fields.
pub fn format_message(bytes: &[u8], chunks: usize) -> Result<String> {
    check_chunks(chunks)?;
    let mut words: Vec<u128> = bytes
        .chunks(16)
        .map(|c| {
            let mut word = [0u8; 16];
            word[..c.len()].copy_from_slice(c);
            word_to_u128(&word)
        })
        .collect();
    let per_chunk = words.len().div_ceil(chunks).max(1);
    words.resize(per_chunk * chunks, 0);

    let mut out = String::from("{ ");
    for (c, fields) in words.chunks(per_chunk).enumerate() {
        if c > 0 {
            out.push_str(", ");
        }
        out.push_str(&format!("c{c}: {{ "));
        for (f, word) in fields.iter().enumerate() {
            if f > 0 {
                out.push_str(", ");
            }
            out.push_str(&format!("f{f}: {word}u128"));
        }
        out.push_str(" }");
    }
    out.push_str(" }");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_read_little_endian() {
        let mut word = [0u8; 16];
        word[0] = 1;
        assert_eq!(word_to_u128(&word), 1);
        word[0] = 0;
        word[15] = 1;
        assert_eq!(word_to_u128(&word), 1u128 << 120);
    }

    #[test]
    fn short_buffers_are_zero_padded() {
        let text = format_message(&[1u8], 2).unwrap();
        assert_eq!(text, "{ c0: { f0: 1u128 }, c1: { f0: 0u128 } }");
    }

    #[test]
    fn every_chunk_carries_the_same_field_count() {
        // 48 bytes = 3 words over 2 chunks, padded to 2 words each
        let bytes = vec![0xffu8; 48];
        let text = format_message(&bytes, 2).unwrap();
        assert_eq!(text.matches("f0:").count(), 2);
        assert_eq!(text.matches("f1:").count(), 2);
    }

    #[test]
    fn formatting_is_deterministic() {
        let bytes: Vec<u8> = (0..255).collect();
        assert_eq!(
            format_message(&bytes, 8).unwrap(),
            format_message(&bytes, 8).unwrap()
        );
    }

    #[test]
    fn zero_chunks_is_an_error() {
        assert!(format_message(&[1u8], 0).is_err());
    }

    #[test]
    fn digest_splits_into_two_halves() {
        let mut digest = [0u8; 32];
        digest[0] = 2;
        digest[16] = 3;
        let (lo, hi) = digest_chunks(&digest);
        assert_eq!(lo, 2);
        assert_eq!(hi, 3);
    }
}
