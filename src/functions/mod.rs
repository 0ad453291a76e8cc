pub mod indicators;
pub mod library;
pub mod primitives;
pub mod registry;
pub mod strategy;
pub mod traits;

pub use registry::StrategyRegistry;
pub use strategy::{IndicatorFrame, SignalRun, StrategyDescriptor};
pub use traits::Indicator;
