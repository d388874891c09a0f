//! Data exposure pipeline.
//!
//! Turns a content resource into filtered, transformed JSON: per-resource
//! configuration decides whether and what to expose, a selector picks the
//! records, and registered transformers rewrite individual fields.

pub mod config;
pub mod dump;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod service;

pub use config::{ExposureConfig, ExposureConfigStore, RawExposureInput};
pub use dump::DumpRenderer;
pub use pipeline::TransformationPipeline;
pub use registry::{CallbackRegistry, RegistryError, RegistryHandle, Transformer};
pub use resolver::{SelectorResolver, substitute_placeholder};
pub use service::{ExposedData, ExposureError, ExposureOutcome, ExposureService, HiddenReason};
