use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::{s, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Character vocabulary for domain names.
///
/// Maps each character to a one-hot index; positions past the end of a
/// domain are filled with the reserved end-marker row. Encoding is
/// deterministic: the same string always yields the same tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharVocab {
    chars: HashMap<char, usize>,
    end_index: usize,
}

impl CharVocab {
    /// The vocabulary the DGA model was trained with: lowercase letters,
    /// digits, '-', '.', ' ' and the end marker, 40 symbols in total.
    pub fn dga_default() -> Self {
        let mut chars = HashMap::new();
        for (i, c) in ('a'..='z').enumerate() {
            chars.insert(c, i);
        }
        for (i, c) in ('0'..='9').enumerate() {
            chars.insert(c, 26 + i);
        }
        chars.insert('-', 36);
        chars.insert('.', 37);
        chars.insert(' ', 38);
        Self {
            chars,
            end_index: 39,
        }
    }

    /// Total number of one-hot rows, end marker included.
    pub fn size(&self) -> usize {
        self.end_index + 1
    }

    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Index for a character; anything outside the vocabulary maps to the
    /// end marker.
    pub fn index_of(&self, c: char) -> usize {
        self.chars.get(&c).copied().unwrap_or(self.end_index)
    }

    /// Folds accented characters to their ASCII base, turns '_' into a
    /// space, drops CR/LF and lowercases the rest.
    pub fn normalize(domain: &str) -> String {
        let mut out = String::with_capacity(domain.len());
        for c in domain.chars() {
            match c {
                '\r' | '\n' => {}
                '_' => out.push(' '),
                'æ' | 'Æ' => out.push_str("ae"),
                'ç' | 'Ç' => out.push('c'),
                'à' | 'â' | 'ä' | 'À' | 'Â' | 'Ä' => out.push('a'),
                'é' | 'è' | 'ë' | 'ê' | 'É' | 'È' | 'Ë' | 'Ê' => out.push('e'),
                'ï' | 'î' | 'Ï' | 'Î' => out.push('i'),
                'ô' | 'ö' | 'Ô' | 'Ö' => out.push('o'),
                'û' | 'ü' | 'ù' | 'Û' | 'Ü' | 'Ù' => out.push('u'),
                'ÿ' => out.push('y'),
                _ => out.extend(c.to_lowercase()),
            }
        }
        out
    }

    /// One-hot encodes a domain into `[seq_len, vocab_size]`, truncating
    /// long names and padding short ones with the end marker.
    pub fn encode(&self, domain: &str, seq_len: usize) -> Array2<f32> {
        let mut encoded = Array2::zeros((seq_len, self.size()));
        let normalized = Self::normalize(domain);

        let mut used = 0;
        for (pos, c) in normalized.chars().take(seq_len).enumerate() {
            encoded[[pos, self.index_of(c)]] = 1.0;
            used = pos + 1;
        }
        for pos in used..seq_len {
            encoded[[pos, self.end_index]] = 1.0;
        }
        encoded
    }

    /// Encodes a batch of domains into `[batch, seq_len, vocab_size]`.
    pub fn encode_batch(&self, domains: &[String], seq_len: usize) -> Array3<f32> {
        let mut batch = Array3::zeros((domains.len(), seq_len, self.size()));
        for (i, domain) in domains.iter().enumerate() {
            batch
                .slice_mut(s![i, .., ..])
                .assign(&self.encode(domain, seq_len));
        }
        batch
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let vocab: CharVocab = serde_json::from_str(&json)?;
        vocab.validate()?;
        Ok(vocab)
    }

    fn validate(&self) -> Result<()> {
        if self.chars.len() != self.end_index {
            return Err(Error::Input(format!(
                "vocabulary has {} characters but end marker index {}",
                self.chars.len(),
                self.end_index
            )));
        }
        if self.chars.values().any(|&i| i >= self.end_index) {
            return Err(Error::Input(
                "vocabulary indices must be dense and below the end marker".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocab_has_forty_symbols() {
        let vocab = CharVocab::dga_default();
        assert_eq!(vocab.size(), 40);
        assert_eq!(vocab.end_index(), 39);
        assert!(vocab.validate().is_ok());
    }

    #[test]
    fn encode_is_one_hot_per_position() {
        let vocab = CharVocab::dga_default();
        let encoded = vocab.encode("abc.com", 50);

        assert_eq!(encoded.dim(), (50, 40));
        for row in encoded.outer_iter() {
            assert_eq!(row.iter().filter(|&&x| x == 1.0).count(), 1);
            assert!(row.iter().all(|&x| x == 0.0 || x == 1.0));
        }
        assert_eq!(encoded[[0, vocab.index_of('a')]], 1.0);
        assert_eq!(encoded[[3, vocab.index_of('.')]], 1.0);
    }

    #[test]
    fn short_domains_padded_with_end_marker() {
        let vocab = CharVocab::dga_default();
        let encoded = vocab.encode("ab", 5);

        for pos in 2..5 {
            assert_eq!(encoded[[pos, vocab.end_index()]], 1.0);
        }
    }

    #[test]
    fn long_domains_truncated() {
        let vocab = CharVocab::dga_default();
        let domain = "a".repeat(200);
        assert_eq!(vocab.encode(&domain, 50).dim(), (50, 40));
    }

    #[test]
    fn encode_is_deterministic() {
        let vocab = CharVocab::dga_default();
        assert_eq!(vocab.encode("qzx-17.net", 50), vocab.encode("qzx-17.net", 50));
    }

    #[test]
    fn normalize_folds_accents_and_case() {
        assert_eq!(CharVocab::normalize("Élan.Çom"), "elan.com");
        assert_eq!(CharVocab::normalize("über\r\n"), "uber");
        assert_eq!(CharVocab::normalize("a_b"), "a b");
        assert_eq!(CharVocab::normalize("æther"), "aether");
    }

    #[test]
    fn unknown_characters_map_to_end_marker() {
        let vocab = CharVocab::dga_default();
        assert_eq!(vocab.index_of('!'), vocab.end_index());
    }

    #[test]
    fn vocab_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charmap.json");

        let vocab = CharVocab::dga_default();
        vocab.save(&path).unwrap();
        let restored = CharVocab::load(&path).unwrap();

        assert_eq!(restored.size(), vocab.size());
        assert_eq!(restored.encode("test.com", 50), vocab.encode("test.com", 50));
    }

    #[test]
    fn encode_batch_stacks_examples() {
        let vocab = CharVocab::dga_default();
        let domains = vec!["google.com".to_string(), "mskqpaiq.biz".to_string()];

        let batch = vocab.encode_batch(&domains, 50);

        assert_eq!(batch.dim(), (2, 50, 40));
        assert_eq!(batch.slice(s![0, .., ..]), vocab.encode("google.com", 50));
    }
}
