use ndarray::{Array3, Array4, ArrayView3, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::config::CapsuleConfig;
use super::routing::DynamicRouting;
use crate::error::{Error, Result};

/// Capsule layer: one learned linear map per (higher, lower) capsule pair,
/// followed by routing-by-agreement.
///
/// `weights` has shape `[num_capsule, input_num_capsule, dim_capsule,
/// input_dim_capsule]` and is read-only after construction; a forward pass
/// keeps no other state.
#[derive(Debug)]
pub struct CapsuleLayer {
    pub config: CapsuleConfig,
    pub input_num_capsule: usize,
    pub input_dim_capsule: usize,
    pub weights: Array4<f32>,
    routing: DynamicRouting,
}

impl CapsuleLayer {
    /// Validates the declared input shape and initializes the transform
    /// weights with a Glorot-uniform draw from `rng`.
    ///
    /// `input_shape` is `[batch, input_num_capsule, input_dim_capsule]`;
    /// only the last two entries are used, the batch size may be anything.
    pub fn build(config: CapsuleConfig, input_shape: &[usize], rng: &mut StdRng) -> Result<Self> {
        config.validate()?;
        if input_shape.len() < 3 {
            return Err(Error::Config(format!(
                "input shape must have rank >= 3 (batch, capsules, features), got rank {}",
                input_shape.len()
            )));
        }
        let input_num_capsule = input_shape[input_shape.len() - 2];
        let input_dim_capsule = input_shape[input_shape.len() - 1];
        if input_num_capsule == 0 || input_dim_capsule == 0 {
            return Err(Error::Config("input capsule dimensions must be > 0".into()));
        }

        let limit = (6.0 / (input_dim_capsule + config.dim_capsule) as f32).sqrt();
        let weights = Array4::random_using(
            (
                config.num_capsule,
                input_num_capsule,
                config.dim_capsule,
                input_dim_capsule,
            ),
            Uniform::new(-limit, limit),
            rng,
        );

        Ok(Self::from_parts(config, weights))
    }

    /// Rebuilds a layer from previously trained weights (artifact load).
    pub fn from_weights(config: CapsuleConfig, weights: Array4<f32>) -> Result<Self> {
        config.validate()?;
        let (num, _, dim, _) = weights.dim();
        if num != config.num_capsule || dim != config.dim_capsule {
            return Err(Error::Config(format!(
                "weight shape {:?} does not match num_capsule={}, dim_capsule={}",
                weights.dim(),
                config.num_capsule,
                config.dim_capsule
            )));
        }
        Ok(Self::from_parts(config, weights))
    }

    fn from_parts(config: CapsuleConfig, weights: Array4<f32>) -> Self {
        let (_, input_num_capsule, _, input_dim_capsule) = weights.dim();
        let routing = DynamicRouting::new(config.routings);
        Self {
            config,
            input_num_capsule,
            input_dim_capsule,
            weights,
            routing,
        }
    }

    /// Applies the per-pair transform to every lower capsule:
    /// `inputs_hat[b,j,i,:] = W[j,i] . inputs[b,i,:]`, producing the
    /// predicted capsules `[batch, num_capsule, input_num_capsule,
    /// dim_capsule]`. Pure given the weights.
    pub fn transform(&self, inputs: &ArrayView3<f32>) -> Array4<f32> {
        let (batch, input_num, input_dim) = inputs.dim();
        let num_capsule = self.config.num_capsule;
        let dim_capsule = self.config.dim_capsule;

        let mut predictions = Array4::zeros((batch, num_capsule, input_num, dim_capsule));

        predictions
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(b, mut pred)| {
                for oc in 0..num_capsule {
                    for ic in 0..input_num {
                        for d in 0..dim_capsule {
                            let mut sum = 0.0;
                            for k in 0..input_dim {
                                sum += self.weights[[oc, ic, d, k]] * inputs[[b, ic, k]];
                            }
                            pred[[oc, ic, d]] = sum;
                        }
                    }
                }
            });

        predictions
    }

    /// Full forward pass: transform then route. Output shape is
    /// `[batch, num_capsule, dim_capsule]`.
    pub fn forward(&self, inputs: &ArrayView3<f32>) -> Array3<f32> {
        let predictions = self.transform(inputs);
        self.routing.route(&predictions.view())
    }
}
