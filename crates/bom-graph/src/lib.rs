//! # BOM Graph
//!
//! 組成圖驗證：循環檢查與可用子 BOM 計算
//!
//! 只有 `sub_bom` 明細構成組成圖的邊；`parent_bom_id` 僅為衍生關係，
//! 不參與任何圖運算。

pub mod available;
pub mod graph;

// Re-export 主要類型
pub use available::available_sub_boms;
pub use graph::CompositionGraph;
