//! Beacon: evidence-grounded chat risk detection.
//!
//! Analyzes chat text for risk indicators (bullying, manipulation,
//! pressure, secrecy, guilt-shifting, grooming) and produces a
//! traffic-light verdict with an evidence-based explanation.
//!
//! The pipeline is synchronous and pure after construction: text is
//! normalized, matched against the configured pattern rules with
//! contextual gating, optionally scored by a pluggable semantic
//! classifier, aggregated, classified, and explained — strictly from
//! matched evidence.
//!
//! ```
//! use beacon::config::{EngineConfig, RulesConfig};
//! use beacon::pipeline::DetectionPipeline;
//!
//! let pipeline = DetectionPipeline::new(RulesConfig::builtin(), EngineConfig::default())
//!     .expect("valid built-in configuration");
//! let result = pipeline.analyze("I'm busy right now, can we talk later? no pressure");
//! assert_eq!(result.risk_level, beacon::models::RiskLevel::Green);
//! ```

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod evidence;
pub mod explainer;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod risk;
pub mod rules;

pub use crate::error::{BeaconError, Result};
pub use crate::models::{DetectionResult, RiskCategory, RiskLevel};
pub use crate::pipeline::DetectionPipeline;
