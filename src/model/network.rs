use std::fmt;

use ndarray::{Array2, Array3, Array4, ArrayView3};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::capsule::CapsuleLayer;
use super::config::ModelConfig;
use crate::error::{Error, Result};

/// Per-domain classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "DGA")]
    Dga,
    Benign,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Dga => write!(f, "DGA"),
            Label::Benign => write!(f, "Benign"),
        }
    }
}

/// Inference network: capsule layer plus a norm-based two-class head.
///
/// Built once at startup and passed by reference afterwards; the weights are
/// never mutated, so concurrent prediction calls are safe.
#[derive(Debug)]
pub struct DgaNet {
    pub config: ModelConfig,
    pub capsule: CapsuleLayer,
}

impl DgaNet {
    /// Builds a freshly initialized network (weights drawn from `rng`).
    pub fn new(config: ModelConfig, rng: &mut StdRng) -> Result<Self> {
        config.validate()?;
        let input_shape = [1, config.seq_len, config.vocab_size];
        let capsule = CapsuleLayer::build(config.capsule.clone(), &input_shape, rng)?;
        Ok(Self { config, capsule })
    }

    /// Rebuilds a network from loaded weights. The weight tensor's input
    /// geometry must agree with the configured sequence length and
    /// vocabulary size, otherwise the first forward pass would index out of
    /// bounds.
    pub fn from_weights(config: ModelConfig, weights: Array4<f32>) -> Result<Self> {
        config.validate()?;
        let (_, input_num, _, input_dim) = weights.dim();
        if input_num != config.seq_len || input_dim != config.vocab_size {
            return Err(Error::Config(format!(
                "weight shape {:?} does not match seq_len={}, vocab_size={}",
                weights.dim(),
                config.seq_len,
                config.vocab_size
            )));
        }
        let capsule = CapsuleLayer::from_weights(config.capsule.clone(), weights)?;
        Ok(Self { config, capsule })
    }

    /// Capsule outputs `[batch, num_capsule, dim_capsule]` for an encoded
    /// batch `[batch, seq_len, vocab_size]`.
    pub fn forward(&self, batch: &ArrayView3<f32>) -> Array3<f32> {
        debug!(batch = batch.dim().0, "capsule forward pass");
        self.capsule.forward(batch)
    }

    /// Per-example class scores `[batch, 2]`: the norm of each output
    /// capsule, capsule 0 scoring DGA and capsule 1 scoring benign.
    pub fn predict_scores(&self, batch: &ArrayView3<f32>) -> Array2<f32> {
        let outputs = self.forward(batch);
        let (batch_size, num_capsule, dim) = outputs.dim();

        let mut scores = Array2::zeros((batch_size, num_capsule));
        for b in 0..batch_size {
            for c in 0..num_capsule {
                let norm_sq: f32 = (0..dim).map(|d| outputs[[b, c, d]].powi(2)).sum();
                scores[[b, c]] = norm_sq.sqrt();
            }
        }
        scores
    }

    /// Labels each example. An exact tie counts as benign.
    pub fn predict(&self, batch: &ArrayView3<f32>) -> Vec<Label> {
        self.predict_scores(batch)
            .outer_iter()
            .map(|row| {
                if row[0] > row[1] {
                    Label::Dga
                } else {
                    Label::Benign
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;

    fn small_net() -> DgaNet {
        let config = ModelConfig {
            seq_len: 10,
            vocab_size: 6,
            capsule: super::super::config::CapsuleConfig {
                num_capsule: 2,
                dim_capsule: 4,
                routings: 3,
            },
        };
        let mut rng = StdRng::seed_from_u64(3);
        DgaNet::new(config, &mut rng).unwrap()
    }

    #[test]
    fn scores_are_pairs() {
        let net = small_net();
        let mut rng = StdRng::seed_from_u64(4);
        let batch = Array3::random_using((5, 10, 6), Uniform::new(0.0, 1.0), &mut rng);

        let scores = net.predict_scores(&batch.view());

        assert_eq!(scores.dim(), (5, 2));
        assert!(scores.iter().all(|s| (0.0..1.0).contains(s)));
    }

    #[test]
    fn predict_labels_every_example() {
        let net = small_net();
        let mut rng = StdRng::seed_from_u64(5);
        let batch = Array3::random_using((3, 10, 6), Uniform::new(0.0, 1.0), &mut rng);

        let labels = net.predict(&batch.view());

        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn weights_disagreeing_with_input_geometry_rejected() {
        // Config declares 50x40 inputs; weights claiming 30 capsules of
        // dimension 20 must fail at build, not panic mid-prediction.
        let config = ModelConfig::default();
        let weights = ndarray::Array4::zeros((2, 30, 16, 20));

        let err = DgaNet::from_weights(config, weights).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn exact_tie_is_benign() {
        // An all-zero batch squashes to all-zero capsules, so both class
        // norms are exactly 0 and the tie-break must pick benign.
        let net = small_net();
        let batch = Array3::zeros((1, 10, 6));

        let labels = net.predict(&batch.view());

        assert_eq!(labels, vec![Label::Benign]);
    }
}
