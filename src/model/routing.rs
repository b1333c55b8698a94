use ndarray::{Array3, ArrayView3, ArrayView4, Axis};
use rayon::prelude::*;

/// Numerical floor for the squash denominator.
pub const EPSILON: f64 = 1e-7;

/// Margin that keeps squashed norms strictly below 1 once the components
/// are rounded back to f32; the epsilon term alone vanishes under f32
/// rounding for squared norms above ~0.1.
const NORM_MARGIN: f64 = 1e-6;

/// Norm-bounding nonlinearity along the last (capsule dimension) axis:
/// `v / sqrt(|v|^2 + eps)`. Preserves direction, shrinks short vectors
/// toward zero and keeps every norm strictly below 1. The squared norm and
/// scale are accumulated in f64 so the bound survives the cast to f32.
pub fn squash(vectors: &ArrayView3<f32>) -> Array3<f32> {
    let mut result = vectors.to_owned();
    for mut example in result.outer_iter_mut() {
        for mut capsule in example.outer_iter_mut() {
            let norm_sq: f64 = capsule.iter().map(|&x| x as f64 * x as f64).sum();
            let scale = (1.0 - NORM_MARGIN) / (norm_sq + EPSILON).sqrt();
            capsule.mapv_inplace(|x| (x as f64 * scale) as f32);
        }
    }
    result
}

/// Routing-by-agreement over predicted capsules.
#[derive(Debug)]
pub struct DynamicRouting {
    pub routings: usize,
}

impl DynamicRouting {
    pub fn new(routings: usize) -> Self {
        Self { routings }
    }

    /// Runs exactly `routings` iterations over `predictions`
    /// `[batch, num_capsule, input_num_capsule, dim_capsule]` and returns
    /// the squashed capsule outputs `[batch, num_capsule, dim_capsule]`.
    ///
    /// The coupling logits are threaded through a left fold; nothing
    /// survives the call. The agreement update is skipped on the final
    /// iteration since the logits would never be read again.
    pub fn route(&self, predictions: &ArrayView4<f32>) -> Array3<f32> {
        let (batch, num_capsule, input_num, dim) = predictions.dim();

        let seed = (
            Array3::<f32>::zeros((batch, num_capsule, input_num)),
            Array3::<f32>::zeros((batch, num_capsule, dim)),
        );
        let (_, outputs) = (0..self.routings).fold(seed, |(logits, _), i| {
            let coeffs = softmax_capsule_axis(&logits.view());
            let outputs = squash(&weighted_sum(predictions, &coeffs.view()).view());
            let logits = if i + 1 < self.routings {
                logits + agreement(predictions, &outputs.view())
            } else {
                logits
            };
            (logits, outputs)
        });

        outputs
    }
}

/// Softmax over the higher-capsule axis: for each (batch, lower capsule)
/// pair the coefficients across higher capsules sum to 1.
fn softmax_capsule_axis(logits: &ArrayView3<f32>) -> Array3<f32> {
    let (_, num_capsule, input_num) = logits.dim();
    let mut result = Array3::zeros(logits.dim());

    result
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(b, mut coeffs)| {
            for ic in 0..input_num {
                let mut max_val = f32::NEG_INFINITY;
                for oc in 0..num_capsule {
                    max_val = max_val.max(logits[[b, oc, ic]]);
                }

                let mut exp_sum = 0.0;
                let mut exp_vals = vec![0.0; num_capsule];
                for oc in 0..num_capsule {
                    let e = (logits[[b, oc, ic]] - max_val).exp();
                    exp_vals[oc] = e;
                    exp_sum += e;
                }

                for oc in 0..num_capsule {
                    coeffs[[oc, ic]] = exp_vals[oc] / exp_sum;
                }
            }
        });

    result
}

/// Coupling-weighted sum of predictions over the lower-capsule axis:
/// `s[b,j,:] = sum_i c[b,j,i] * predictions[b,j,i,:]`.
fn weighted_sum(predictions: &ArrayView4<f32>, coeffs: &ArrayView3<f32>) -> Array3<f32> {
    let (batch, num_capsule, input_num, dim) = predictions.dim();
    let mut outputs = Array3::zeros((batch, num_capsule, dim));

    outputs
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(b, mut out)| {
            for oc in 0..num_capsule {
                for d in 0..dim {
                    let mut sum = 0.0;
                    for ic in 0..input_num {
                        sum += coeffs[[b, oc, ic]] * predictions[[b, oc, ic, d]];
                    }
                    out[[oc, d]] = sum;
                }
            }
        });

    outputs
}

/// Agreement term: dot product of each lower-capsule prediction with the
/// current output of the higher capsule it predicts.
fn agreement(predictions: &ArrayView4<f32>, outputs: &ArrayView3<f32>) -> Array3<f32> {
    let (batch, num_capsule, input_num, dim) = predictions.dim();
    let mut delta = Array3::zeros((batch, num_capsule, input_num));

    delta
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(b, mut logit_delta)| {
            for oc in 0..num_capsule {
                for ic in 0..input_num {
                    let mut dot = 0.0;
                    for d in 0..dim {
                        dot += predictions[[b, oc, ic, d]] * outputs[[b, oc, d]];
                    }
                    logit_delta[[oc, ic]] = dot;
                }
            }
        });

    delta
}
