//! Gesture forecasting model
//!
//! A small temporal convolutional network: causal dilated 1-D convolutions
//! (ReLU), global average pooling over time and a linear head producing one
//! scalar, the player's vertical position a few frames ahead in normalized
//! screen units.
//!
//! Weights come from a JSON artifact exported after training. Kernels use the
//! `[tap][in_channel][out_channel]` layout.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::window::FeatureVector;
use crate::consts::FEATURE_COUNT;
use crate::error::ModelError;

/// Anything that turns a full feature window into a raw forecast
pub trait Forecaster: Send {
    fn forecast(&mut self, window: &[FeatureVector]) -> Result<f32, ModelError>;
}

impl<F> Forecaster for F
where
    F: FnMut(&[FeatureVector]) -> Result<f32, ModelError> + Send,
{
    fn forecast(&mut self, window: &[FeatureVector]) -> Result<f32, ModelError> {
        self(window)
    }
}

/// One causal convolution layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvLayer {
    pub dilation: usize,
    /// `[tap][in][out]`
    pub kernel: Vec<Vec<Vec<f32>>>,
    pub bias: Vec<f32>,
}

impl ConvLayer {
    fn out_channels(&self) -> usize {
        self.bias.len()
    }

    /// Causal convolution + ReLU over a `[time][channel]` sequence
    fn forward(&self, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let taps = self.kernel.len();
        (0..input.len())
            .map(|t| {
                let mut acc = self.bias.clone();
                for (k, tap) in self.kernel.iter().enumerate() {
                    // Left zero padding: taps reaching before t=0 contribute nothing
                    let Some(src) = t.checked_sub((taps - 1 - k) * self.dilation) else {
                        continue;
                    };
                    for (x, weights) in input[src].iter().zip(tap) {
                        for (a, w) in acc.iter_mut().zip(weights) {
                            *a += x * w;
                        }
                    }
                }
                acc.iter_mut().for_each(|a| *a = a.max(0.0));
                acc
            })
            .collect()
    }
}

/// Linear output head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<f32>,
    pub bias: f32,
}

/// Serialized network weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcnWeights {
    pub conv: Vec<ConvLayer>,
    pub dense: DenseLayer,
}

impl TcnWeights {
    /// Check every layer connects to the next
    fn validate(&self) -> Result<(), ModelError> {
        if self.conv.is_empty() {
            return Err(ModelError::Shape("no convolution layers".into()));
        }

        let mut channels = FEATURE_COUNT;
        for (i, layer) in self.conv.iter().enumerate() {
            if layer.dilation == 0 {
                return Err(ModelError::Shape(format!("layer {i}: dilation must be >= 1")));
            }
            if layer.kernel.is_empty() {
                return Err(ModelError::Shape(format!("layer {i}: empty kernel")));
            }
            let out = layer.out_channels();
            for tap in &layer.kernel {
                if tap.len() != channels || tap.iter().any(|row| row.len() != out) {
                    return Err(ModelError::Shape(format!(
                        "layer {i}: expected kernel [_][{channels}][{out}]"
                    )));
                }
            }
            channels = out;
        }

        if self.dense.weights.len() != channels {
            return Err(ModelError::Shape(format!(
                "dense: expected {channels} weights, found {}",
                self.dense.weights.len()
            )));
        }
        Ok(())
    }
}

/// Loaded forecasting network
#[derive(Debug, Clone)]
pub struct TcnModel {
    weights: TcnWeights,
    sequence_length: usize,
}

impl TcnModel {
    /// Build from in-memory weights, validating shapes
    pub fn from_weights(weights: TcnWeights, sequence_length: usize) -> Result<Self, ModelError> {
        weights.validate()?;
        Ok(Self {
            weights,
            sequence_length,
        })
    }

    /// Load a JSON weight artifact
    pub fn load(path: impl AsRef<Path>, sequence_length: usize) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let weights: TcnWeights = serde_json::from_str(&fs::read_to_string(path)?)?;
        let model = Self::from_weights(weights, sequence_length)?;
        log::info!(
            "Loaded TCN model from {} ({} conv layers, receptive field {} frames)",
            path.display(),
            model.weights.conv.len(),
            model.receptive_field()
        );
        Ok(model)
    }

    /// Frames of history that can influence the last output step
    pub fn receptive_field(&self) -> usize {
        1 + self
            .weights
            .conv
            .iter()
            .map(|l| (l.kernel.len() - 1) * l.dilation)
            .sum::<usize>()
    }

    /// Run the network on one window
    pub fn predict(&self, window: &[FeatureVector]) -> Result<f32, ModelError> {
        if window.len() != self.sequence_length {
            return Err(ModelError::Input(format!(
                "expected {} frames, got {}",
                self.sequence_length,
                window.len()
            )));
        }
        if window.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ModelError::Input("non-finite feature".into()));
        }

        let mut x: Vec<Vec<f32>> = window.iter().map(|f| f.to_vec()).collect();
        for layer in &self.weights.conv {
            x = layer.forward(&x);
        }

        // Global average pooling over time
        let steps = x.len() as f32;
        let mut pooled = vec![0.0f32; self.weights.dense.weights.len()];
        for row in &x {
            for (p, v) in pooled.iter_mut().zip(row) {
                *p += v / steps;
            }
        }

        let dense = &self.weights.dense;
        let out = dense.bias + pooled.iter().zip(&dense.weights).map(|(p, w)| p * w).sum::<f32>();
        if out.is_finite() {
            Ok(out)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}

impl Forecaster for TcnModel {
    fn forecast(&mut self, window: &[FeatureVector]) -> Result<f32, ModelError> {
        self.predict(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-output conv layer with one non-zero weight
    fn tap_layer(taps: usize, dilation: usize, tap: usize, feature: usize) -> ConvLayer {
        let mut kernel = vec![vec![vec![0.0]; FEATURE_COUNT]; taps];
        kernel[tap][feature][0] = 1.0;
        ConvLayer {
            dilation,
            kernel,
            bias: vec![0.0],
        }
    }

    fn tap_model(layer: ConvLayer, sequence_length: usize) -> TcnModel {
        let weights = TcnWeights {
            conv: vec![layer],
            dense: DenseLayer {
                weights: vec![1.0],
                bias: 0.0,
            },
        };
        TcnModel::from_weights(weights, sequence_length).unwrap()
    }

    fn ramp(len: usize) -> Vec<FeatureVector> {
        (0..len).map(|t| [(t + 1) as f32; FEATURE_COUNT]).collect()
    }

    #[test]
    fn test_current_tap_averages_input() {
        // Last tap reads x[t]; mean of 1..=6 is 3.5
        let model = tap_model(tap_layer(3, 1, 2, 5), 6);
        assert!((model.predict(&ramp(6)).unwrap() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_dilated_tap_is_causal() {
        // First tap with dilation 2 and 3 taps reads x[t - 4]; zero before that
        let model = tap_model(tap_layer(3, 2, 0, 0), 6);
        // t=4 sees 1, t=5 sees 2, others padding: (1 + 2) / 6
        assert!((model.predict(&ramp(6)).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_relu_clips_negative_activations() {
        let mut layer = tap_layer(1, 1, 0, 0);
        layer.kernel[0][0][0] = -1.0;
        let model = tap_model(layer, 4);
        assert_eq!(model.predict(&ramp(4)).unwrap(), 0.0);
    }

    #[test]
    fn test_receptive_field_of_standard_stack() {
        let conv = [1, 2, 4, 8]
            .iter()
            .scan(FEATURE_COUNT, |channels, &dilation| {
                let layer = ConvLayer {
                    dilation,
                    kernel: vec![vec![vec![0.0; 4]; *channels]; 3],
                    bias: vec![0.0; 4],
                };
                *channels = 4;
                Some(layer)
            })
            .collect();
        let weights = TcnWeights {
            conv,
            dense: DenseLayer {
                weights: vec![0.0; 4],
                bias: 0.25,
            },
        };
        let model = TcnModel::from_weights(weights, 30).unwrap();
        assert_eq!(model.receptive_field(), 31);
        assert_eq!(model.predict(&ramp(30)).unwrap(), 0.25);
    }

    #[test]
    fn test_rejects_bad_shapes_and_inputs() {
        let mut layer = tap_layer(3, 1, 0, 0);
        layer.kernel[1].pop();
        let weights = TcnWeights {
            conv: vec![layer],
            dense: DenseLayer {
                weights: vec![1.0],
                bias: 0.0,
            },
        };
        assert!(matches!(TcnModel::from_weights(weights, 6), Err(ModelError::Shape(_))));

        let model = tap_model(tap_layer(3, 1, 2, 0), 6);
        assert!(matches!(model.predict(&ramp(5)), Err(ModelError::Input(_))));

        let mut window = ramp(6);
        window[2][1] = f32::NAN;
        assert!(matches!(model.predict(&window), Err(ModelError::Input(_))));
    }

    #[test]
    fn test_load_from_json_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            TcnModel::load(&missing, 6),
            Err(ModelError::NotFound { .. })
        ));

        let path = dir.path().join("model.json");
        let weights = tap_model(tap_layer(3, 1, 2, 5), 6).weights;
        fs::write(&path, serde_json::to_string(&weights).unwrap()).unwrap();

        let mut model = TcnModel::load(&path, 6).unwrap();
        assert!((model.forecast(&ramp(6)).unwrap() - 3.5).abs() < 1e-6);
    }
}
