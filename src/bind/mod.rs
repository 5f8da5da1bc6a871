//! Parameter binding: classification, type and length resolution, value
//! shaping, and the orchestrator that drives the bind primitives.

pub mod classify;
pub mod length;
pub mod orchestrator;
pub mod shaper;
pub mod type_resolver;
pub mod value;
pub mod wire_type;

pub use classify::{BindMode, ParameterClassifier};
pub use length::{LengthResolver, LengthSpec};
pub use orchestrator::{
    merge, placeholder, BindingOrchestrator, Bindings, BoundParameter, BoundParameters,
};
pub use shaper::{ShapedValue, ValueShaper};
pub use type_resolver::{SampleCategory, TypePatterns, TypeResolver, TypeTally, TypeToken};
pub use value::{BindValue, CompoundDescriptor, ParamValue, ParameterMap};
pub use wire_type::{CustomType, WireType};
