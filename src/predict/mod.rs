//! Short-horizon forecasting of the player's hand position
//!
//! Per frame the game state is reduced to a [`FeatureVector`]; a rolling
//! [`FeatureWindow`] of those feeds a [`Forecaster`] running on a background
//! worker owned by [`PredictionPipeline`].

mod features;
mod model;
mod pipeline;
mod window;

pub use features::extract_features;
pub use model::{ConvLayer, DenseLayer, Forecaster, TcnModel, TcnWeights};
pub use pipeline::{ForecastSlot, Offer, PredictionPipeline};
pub use window::{FeatureVector, FeatureWindow};
