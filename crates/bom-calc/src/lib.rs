//! # BOM Cost Engine
//!
//! 多層 BOM 成本計算：成本解析、利潤率定價、成本樹

pub mod cost;
pub mod pricing;
pub mod tree;

// Re-export 主要類型
pub use cost::CostResolver;
pub use pricing::{CostBreakdown, PricingEngine};
pub use tree::{TreeBuilder, TreeNode, TreeNodeType, TreeRow};
