//! # BOM Core
//!
//! 核心資料模型與類型定義

pub mod bom;
pub mod catalog;
pub mod config;
pub mod draft;
pub mod product;
pub mod request;
pub mod snapshot;

use rust_decimal::Decimal;

// Re-export 主要類型
pub use bom::{
    validate_profit_margin, Bom, BomComponent, BomId, BomItem, BomItemId, BomItemInput, ItemType,
};
pub use catalog::{InMemoryCatalog, ProductCatalog};
pub use config::{EngineConfig, RoundingMode};
pub use draft::{BomDraft, DraftLine, DraftLineId};
pub use product::{Product, ProductId, ProductType};
pub use request::{CreateBomRequest, UpdateBomRequest};
pub use snapshot::BomSnapshot;

/// 被引用但不存在的對象
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// 產品 / 原物料（來自產品目錄）
    Product(ProductId),
    /// BOM
    Bom(BomId),
    /// BOM 明細行
    Item(BomItemId),
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Product(id) => write!(f, "產品 {}", id),
            Reference::Bom(id) => write!(f, "BOM {}", id),
            Reference::Item(id) => write!(f, "BOM 明細 {}", id),
        }
    }
}

/// 錯誤嚴重性
///
/// - `Business`：呼叫端可修正的業務錯誤（對應 4xx）
/// - `Fatal`：資料完整性故障，代表寫入驗證曾被繞過（對應 5xx）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Business,
    Fatal,
}

/// BOM 引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum BomError {
    #[error("無效的數量: {0}（必須大於 0）")]
    InvalidQuantity(Decimal),

    #[error("無效的利潤率: {0}（不可為負）")]
    InvalidProfitMargin(Decimal),

    #[error("無效的 BOM 明細: {0}")]
    InvalidItem(String),

    #[error("循環引用: 將 BOM {sub_bom_id} 加入 BOM {bom_id} 會形成循環")]
    CycleDetected { bom_id: BomId, sub_bom_id: BomId },

    #[error("資料完整性錯誤: 組成圖存在循環 {}", format_path(.path))]
    GraphIntegrity { path: Vec<BomId> },

    #[error("找不到引用對象: {0}")]
    MissingReference(Reference),

    #[error("BOM {bom_id} 仍被其他 BOM 引用: {}", format_path(.referenced_by))]
    ReferentialConflict {
        bom_id: BomId,
        referenced_by: Vec<BomId>,
    },

    #[error("數值溢位: {0}")]
    Overflow(String),

    #[error("草稿無效: {0}")]
    InvalidDraft(String),

    #[error("配置錯誤: {0}")]
    Config(String),
}

impl BomError {
    /// 錯誤嚴重性分類
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BomError::GraphIntegrity { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Business,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }
}

fn format_path(ids: &[BomId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

pub type Result<T> = std::result::Result<T, BomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let integrity = BomError::GraphIntegrity {
            path: vec![BomId::new(), BomId::new()],
        };
        assert!(integrity.is_fatal());

        let cycle = BomError::CycleDetected {
            bom_id: BomId::new(),
            sub_bom_id: BomId::new(),
        };
        assert_eq!(cycle.severity(), ErrorSeverity::Business);
        assert!(!BomError::InvalidQuantity(Decimal::ZERO).is_fatal());
        assert_eq!(
            BomError::Overflow("1 × 2".to_string()).severity(),
            ErrorSeverity::Business
        );
    }

    #[test]
    fn test_error_message_names_edge() {
        let parent = BomId::new();
        let child = BomId::new();
        let message = BomError::CycleDetected {
            bom_id: parent,
            sub_bom_id: child,
        }
        .to_string();

        assert!(message.contains(&parent.to_string()));
        assert!(message.contains(&child.to_string()));
    }
}
