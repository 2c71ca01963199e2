//! Short share identifiers

use rand::Rng;

/// URL-safe alphabet: ids can be used verbatim as a path segment.
pub const ID_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const ID_LENGTH: usize = 6;

/// Source of candidate prompt ids
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform random ids drawn from [`ID_ALPHABET`]
#[derive(Debug, Clone)]
pub struct ShortIdGenerator {
    length: usize,
}

impl ShortIdGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for ShortIdGenerator {
    fn default() -> Self {
        Self::new(ID_LENGTH)
    }
}

impl IdGenerator for ShortIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_length() {
        let id = ShortIdGenerator::default().generate();
        assert_eq!(id.len(), ID_LENGTH);
    }

    #[test]
    fn test_ids_are_url_safe() {
        let ids = ShortIdGenerator::new(32);
        for _ in 0..100 {
            let id = ids.generate();
            assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)), "bad id {}", id);
        }
    }

    #[test]
    fn test_alphabet_has_no_duplicates() {
        let mut seen = ID_ALPHABET.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), ID_ALPHABET.len());
    }
}
