use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Capsule layer hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapsuleConfig {
    /// Number of higher-level capsules produced by the layer.
    pub num_capsule: usize,
    /// Dimension of each output capsule vector.
    pub dim_capsule: usize,
    /// Fixed number of routing iterations.
    pub routings: usize,
}

impl CapsuleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.routings == 0 {
            return Err(Error::Config("routings must be > 0".into()));
        }
        if self.num_capsule == 0 || self.dim_capsule == 0 {
            return Err(Error::Config(
                "num_capsule and dim_capsule must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Full model configuration: input geometry plus the capsule layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Fixed encoded sequence length (lower-level capsule count).
    pub seq_len: usize,
    /// Vocabulary size (lower-level capsule dimension).
    pub vocab_size: usize,
    pub capsule: CapsuleConfig,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        self.capsule.validate()?;
        if self.seq_len == 0 || self.vocab_size == 0 {
            return Err(Error::Config("seq_len and vocab_size must be > 0".into()));
        }
        if self.capsule.num_capsule != 2 {
            return Err(Error::Config(format!(
                "DGA classifier needs exactly 2 output capsules, got {}",
                self.capsule.num_capsule
            )));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            seq_len: 50,
            vocab_size: 40,
            capsule: CapsuleConfig {
                num_capsule: 2,
                dim_capsule: 16,
                routings: 3,
            },
        }
    }
}
