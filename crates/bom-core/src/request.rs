//! 寫入請求

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BomId, BomItem, ProductId};

/// 新建 BOM 請求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBomRequest {
    pub product_id: ProductId,
    pub version: String,
    pub items: Vec<BomItem>,
    /// 未指定時使用配置的預設利潤率
    pub profit_margin: Option<Decimal>,
    pub notes: Option<String>,
    pub parent_bom_id: Option<BomId>,
}

impl CreateBomRequest {
    pub fn new(product_id: ProductId, version: impl Into<String>) -> Self {
        Self {
            product_id,
            version: version.into(),
            items: Vec::new(),
            profit_margin: None,
            notes: None,
            parent_bom_id: None,
        }
    }

    /// 建構器模式：設置明細
    pub fn with_items(mut self, items: Vec<BomItem>) -> Self {
        self.items = items;
        self
    }

    /// 建構器模式：設置利潤率
    pub fn with_profit_margin(mut self, margin: Decimal) -> Self {
        self.profit_margin = Some(margin);
        self
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// 建構器模式：設置衍生來源
    pub fn with_parent_bom(mut self, parent_bom_id: BomId) -> Self {
        self.parent_bom_id = Some(parent_bom_id);
        self
    }
}

/// 更新 BOM 請求：明細整批取代，其餘欄位未指定則保留原值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBomRequest {
    pub items: Vec<BomItem>,
    pub profit_margin: Option<Decimal>,
    pub notes: Option<String>,
}

impl UpdateBomRequest {
    pub fn new(items: Vec<BomItem>) -> Self {
        Self {
            items,
            profit_margin: None,
            notes: None,
        }
    }

    /// 建構器模式：設置利潤率
    pub fn with_profit_margin(mut self, margin: Decimal) -> Self {
        self.profit_margin = Some(margin);
        self
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
