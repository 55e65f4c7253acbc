//! # BOM
//!
//! 多層 BOM 成本引擎：組成圖驗證、成本解析、利潤率定價與成本樹

pub use bom_calc as calc;
pub use bom_core as core;
pub use bom_graph as graph;
pub use bom_service as service;

pub use bom_calc::{CostBreakdown, CostResolver, PricingEngine, TreeBuilder, TreeNode, TreeNodeType};
pub use bom_core::{
    Bom, BomComponent, BomDraft, BomError, BomId, BomItem, BomItemId, BomItemInput, BomSnapshot,
    CreateBomRequest, EngineConfig, ErrorSeverity, InMemoryCatalog, ItemType, Product,
    ProductCatalog, ProductId, ProductType, Reference, Result, RoundingMode, UpdateBomRequest,
};
pub use bom_graph::{available_sub_boms, CompositionGraph};
pub use bom_service::{BomRepository, BomService, InMemoryBomStore};
