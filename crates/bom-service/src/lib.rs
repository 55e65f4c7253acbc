//! # BOM Service
//!
//! 對外操作：BOM 寫入（含循環與引用檢查）、成本查詢、成本樹、可用子 BOM

pub mod service;
pub mod store;

// Re-export 主要類型
pub use service::BomService;
pub use store::{BomRepository, InMemoryBomStore};
