//! BOM 編輯草稿
//!
//! 使用者編輯中的 BOM（暫時行號、拖拉排序、未完成的數量）與已持久化的
//! 組成圖分開保存；只有在明確儲存時才轉換為 [`CreateBomRequest`]。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bom::{ensure_positive, validate_profit_margin};
use crate::{Bom, BomComponent, BomError, BomId, BomItem, CreateBomRequest, ProductId, Result};

/// 草稿行的暫時 ID（僅在草稿內有效）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftLineId(pub u32);

/// 草稿行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftLine {
    pub id: DraftLineId,
    pub component: BomComponent,
    /// 編輯中允許暫時無效，儲存時才檢查
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

/// BOM 草稿
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomDraft {
    pub product_id: ProductId,
    pub version: String,
    pub profit_margin: Option<Decimal>,
    pub notes: Option<String>,
    pub parent_bom_id: Option<BomId>,
    lines: Vec<DraftLine>,
    next_line_id: u32,
}

impl BomDraft {
    /// 創建空白草稿
    pub fn new(product_id: ProductId, version: impl Into<String>) -> Self {
        Self {
            product_id,
            version: version.into(),
            profit_margin: None,
            notes: None,
            parent_bom_id: None,
            lines: Vec::new(),
            next_line_id: 1,
        }
    }

    /// 以既有 BOM 為底建立變體草稿
    pub fn from_bom(bom: &Bom, version: impl Into<String>) -> Self {
        let mut draft = Self::new(bom.product_id.clone(), version);
        draft.profit_margin = Some(bom.profit_margin);
        draft.notes = bom.notes.clone();
        draft.parent_bom_id = Some(bom.id);
        for item in &bom.items {
            let id = draft.push(item.component.clone(), item.quantity);
            if let Some(line) = draft.line_mut(id) {
                line.unit = item.unit.clone();
                line.notes = item.notes.clone();
            }
        }
        draft
    }

    fn push(&mut self, component: BomComponent, quantity: Decimal) -> DraftLineId {
        let id = DraftLineId(self.next_line_id);
        self.next_line_id += 1;
        self.lines.push(DraftLine {
            id,
            component,
            quantity,
            unit: None,
            notes: None,
        });
        id
    }

    /// 加入原物料行
    pub fn add_material(&mut self, raw_material_id: ProductId, quantity: Decimal) -> DraftLineId {
        self.push(BomComponent::Material { raw_material_id }, quantity)
    }

    /// 加入子 BOM 行
    pub fn add_sub_bom(&mut self, sub_bom_id: BomId, quantity: Decimal) -> DraftLineId {
        self.push(BomComponent::SubBom { sub_bom_id }, quantity)
    }

    /// 刪除行
    pub fn remove_line(&mut self, id: DraftLineId) -> Option<DraftLine> {
        let index = self.position(id)?;
        Some(self.lines.remove(index))
    }

    /// 修改數量
    pub fn set_quantity(&mut self, id: DraftLineId, quantity: Decimal) -> Result<()> {
        let line = self.line_mut(id).ok_or_else(|| unknown_line(id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// 拖拉排序：把行移到指定位置
    pub fn move_line(&mut self, id: DraftLineId, to_index: usize) -> Result<()> {
        let from = self.position(id).ok_or_else(|| unknown_line(id))?;
        let line = self.lines.remove(from);
        let to_index = to_index.min(self.lines.len());
        self.lines.insert(to_index, line);
        Ok(())
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn line_mut(&mut self, id: DraftLineId) -> Option<&mut DraftLine> {
        self.lines.iter_mut().find(|line| line.id == id)
    }

    fn position(&self, id: DraftLineId) -> Option<usize> {
        self.lines.iter().position(|line| line.id == id)
    }

    /// 轉換為持久化明細（全部有效才成功）
    pub fn to_items(&self) -> Result<Vec<BomItem>> {
        self.lines
            .iter()
            .map(|line| {
                ensure_positive(line.quantity).map_err(|_| {
                    BomError::InvalidDraft(format!(
                        "第 {} 行數量無效: {}",
                        line.id.0, line.quantity
                    ))
                })?;
                let mut item = BomItem::new(line.component.clone(), line.quantity)?;
                item.unit = line.unit.clone();
                item.notes = line.notes.clone();
                Ok(item)
            })
            .collect()
    }

    /// 轉換為新建請求
    pub fn to_request(&self) -> Result<CreateBomRequest> {
        if self.version.trim().is_empty() {
            return Err(BomError::InvalidDraft("版本不可為空".to_string()));
        }
        if let Some(margin) = self.profit_margin {
            validate_profit_margin(margin)?;
        }

        Ok(CreateBomRequest {
            product_id: self.product_id.clone(),
            version: self.version.clone(),
            items: self.to_items()?,
            profit_margin: self.profit_margin,
            notes: self.notes.clone(),
            parent_bom_id: self.parent_bom_id,
        })
    }
}

fn unknown_line(id: DraftLineId) -> BomError {
    BomError::InvalidDraft(format!("找不到草稿行 {}", id.0))
}
