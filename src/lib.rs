//! Solar power prediction and panel configuration optimization engine.
//!
//! The engine fuses location, panel geometry, and weather into a fixed
//! feature vector, scores it with a random-forest ensemble, and searches the
//! tilt/azimuth space for the output-maximizing configuration. Transport,
//! storage schema, and rendering live with the callers.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod features;
pub mod ml;
pub mod optimizer;
pub mod telemetry;
pub mod weather;

pub use config::Config;
pub use domain::{
    Location, OptimizationRequest, OptimizationResult, PanelConfiguration, PredictionRequest,
    PredictionResult, Timeframe, WeatherProvenance, WeatherSnapshot,
};
pub use engine::SolarEngine;
pub use error::EngineError;
