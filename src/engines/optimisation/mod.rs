pub mod methods;
pub mod result;
pub mod runner;
pub mod space;
pub mod splitters;

pub use result::{outranks, OptimizationResult, ResultList, OVERALL_SYMBOL};
pub use runner::{OptimizationRunner, SearchPlan};
pub use space::{
    Constraint, Dimension, DimensionKind, Domain, ParameterSpace, ParameterSpec, DEFAULT_OBJECTIVE,
    PARAMETER_PREFIX,
};
