use std::fs;
use std::path::Path;

use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::ModelConfig;
use super::network::DgaNet;
use crate::error::{Error, Result};

/// Serialized model: layer configuration plus the learned transform
/// weights, stored as a flat buffer with its shape. Loaded once at process
/// start; everything after that is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub config: ModelConfig,
    pub shape: [usize; 4],
    pub weights: Vec<f32>,
}

impl ModelArtifact {
    /// Creates an artifact with freshly initialized weights. A fixed `seed`
    /// makes the draw reproducible.
    pub fn initialized(config: ModelConfig, seed: Option<u64>) -> Result<Self> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let net = DgaNet::new(config, &mut rng)?;
        Ok(Self::from_network(&net))
    }

    pub fn from_network(net: &DgaNet) -> Self {
        let dim = net.capsule.weights.dim();
        Self {
            config: net.config.clone(),
            shape: [dim.0, dim.1, dim.2, dim.3],
            weights: net.capsule.weights.iter().copied().collect(),
        }
    }

    /// Rebuilds the inference network, re-validating the configuration.
    pub fn into_network(self) -> Result<DgaNet> {
        let [n0, n1, n2, n3] = self.shape;
        let weights = Array4::from_shape_vec((n0, n1, n2, n3), self.weights)
            .map_err(|e| Error::Config(format!("weight buffer does not match shape: {e}")))?;
        DgaNet::from_weights(self.config, weights)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), "model artifact written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let artifact: ModelArtifact = bincode::deserialize(&bytes)?;
        info!(
            path = %path.display(),
            num_capsule = artifact.config.capsule.num_capsule,
            dim_capsule = artifact.config.capsule.dim_capsule,
            routings = artifact.config.capsule.routings,
            "model artifact loaded"
        );
        Ok(artifact)
    }
}
