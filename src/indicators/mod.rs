pub mod cache;
mod constants;
pub mod eval;
pub mod formulas;
pub mod graph;

pub use cache::ResultCache;
pub use eval::{Evaluator, Generation};
pub use graph::{check_order, topological_order, Constant, GraphError, Indicator, Node};
