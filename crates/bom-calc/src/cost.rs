//! 成本解析
//!
//! 計算 BOM 在指定產量下的基本成本（未加利潤）：
//! - 原物料明細：`明細用量 × 產量 × 原物料單位成本`
//! - 子 BOM 明細：`明細用量 × 產量 × 子 BOM 單位售價`
//!
//! 子組件本身是已定價的半成品，因此以其「加上利潤後」的單位成本計入。
//! 全程保留完整精度，只在對外輸出時取整。

use bom_core::{
    Bom, BomComponent, BomError, BomId, BomItem, BomSnapshot, Product, ProductCatalog, ProductId,
    Reference, Result,
};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::PricingEngine;

/// 後序走訪的堆疊框架
enum Frame {
    /// 首次進入：展開子 BOM
    Enter(BomId),
    /// 所有子 BOM 已算完：彙總自身
    Exit(BomId),
}

/// 成本解析器
///
/// 一個解析器對應一次頂層查詢：單位售價與原物料價格的快取只在
/// 此解析器的生命週期內有效，下一次查詢需重新建立以取得最新價格。
pub struct CostResolver<'a, C: ProductCatalog + ?Sized> {
    snapshot: &'a BomSnapshot,
    catalog: &'a C,

    /// 子 BOM 單位售價快取
    unit_final_costs: HashMap<BomId, Decimal>,

    /// 本次查詢讀取過的產品
    products: HashMap<ProductId, Product>,
}

impl<'a, C: ProductCatalog + ?Sized> CostResolver<'a, C> {
    /// 創建新的成本解析器
    pub fn new(snapshot: &'a BomSnapshot, catalog: &'a C) -> Self {
        Self {
            snapshot,
            catalog,
            unit_final_costs: HashMap::new(),
            products: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> &'a BomSnapshot {
        self.snapshot
    }

    /// 基本成本：`quantity` 單位產出所需的原物料與子組件成本
    pub fn resolve_base_cost(&mut self, bom_id: BomId, quantity: Decimal) -> Result<Decimal> {
        ensure_quantity(quantity)?;

        // 先完成整個子圖的單位售價（含循環檢查）
        self.unit_final_cost(bom_id)?;

        let snapshot = self.snapshot;
        let bom = snapshot.require(bom_id)?;
        self.sum_items(bom, quantity)
    }

    /// 售價：基本成本加上此 BOM 的利潤率
    pub fn resolve_final_cost(&mut self, bom_id: BomId, quantity: Decimal) -> Result<Decimal> {
        let base_cost = self.resolve_base_cost(bom_id, quantity)?;
        let bom = self.snapshot.require(bom_id)?;
        PricingEngine::apply_margin(base_cost, bom.profit_margin)
    }

    /// 單位售價（快取）
    ///
    /// 以顯式堆疊做後序走訪，避免深層組成圖造成遞迴過深。
    /// 走訪路徑上重複出現的 BOM 代表資料中存在循環，屬於資料完整性錯誤。
    pub fn unit_final_cost(&mut self, bom_id: BomId) -> Result<Decimal> {
        if let Some(cost) = self.unit_final_costs.get(&bom_id) {
            return Ok(*cost);
        }

        let snapshot = self.snapshot;
        let mut stack = vec![Frame::Enter(bom_id)];
        let mut path: Vec<BomId> = Vec::new();
        let mut visiting: HashSet<BomId> = HashSet::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => {
                    if self.unit_final_costs.contains_key(&id) {
                        continue;
                    }
                    if visiting.contains(&id) {
                        return Err(cycle_fault(&path, id));
                    }

                    let bom = snapshot.require(id)?;
                    visiting.insert(id);
                    path.push(id);
                    stack.push(Frame::Exit(id));

                    // 反向壓堆疊，使子 BOM 依明細順序處理
                    let children: Vec<BomId> = bom.sub_bom_ids().collect();
                    for child in children.into_iter().rev() {
                        if self.unit_final_costs.contains_key(&child) {
                            continue;
                        }
                        if visiting.contains(&child) {
                            return Err(cycle_fault(&path, child));
                        }
                        stack.push(Frame::Enter(child));
                    }
                }
                Frame::Exit(id) => {
                    let bom = snapshot.require(id)?;
                    let base_cost = self.sum_items(bom, Decimal::ONE)?;
                    let unit_final_cost =
                        PricingEngine::apply_margin(base_cost, bom.profit_margin)?;

                    tracing::trace!(
                        "BOM {} 單位基本成本 {}，單位售價 {}",
                        id,
                        base_cost,
                        unit_final_cost
                    );

                    self.unit_final_costs.insert(id, unit_final_cost);
                    visiting.remove(&id);
                    path.pop();
                }
            }
        }

        self.unit_final_costs
            .get(&bom_id)
            .copied()
            .ok_or(BomError::MissingReference(Reference::Bom(bom_id)))
    }

    /// 單一明細在父件產量 `quantity` 下的成本貢獻
    pub fn item_contribution(&mut self, item: &BomItem, quantity: Decimal) -> Result<Decimal> {
        let unit_cost = match &item.component {
            BomComponent::Material { raw_material_id } => self.product(raw_material_id)?.unit_cost,
            BomComponent::SubBom { sub_bom_id } => self.unit_final_cost(*sub_bom_id)?,
        };
        checked_mul(checked_mul(item.quantity, quantity)?, unit_cost)
    }

    /// 讀取產品（本次查詢內快取）
    pub fn product(&mut self, id: &ProductId) -> Result<&Product> {
        if !self.products.contains_key(id) {
            let product = self.catalog.require_product(id)?;
            self.products.insert(id.clone(), product);
        }
        self.products
            .get(id)
            .ok_or_else(|| BomError::MissingReference(Reference::Product(id.clone())))
    }

    fn sum_items(&mut self, bom: &Bom, quantity: Decimal) -> Result<Decimal> {
        let mut total = Decimal::ZERO;
        for item in &bom.items {
            total = checked_add(total, self.item_contribution(item, quantity)?)?;
        }
        Ok(total)
    }
}

/// 產量必須大於 0
pub(crate) fn ensure_quantity(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(BomError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// 乘法，超出 `Decimal` 範圍時返回 `Overflow`
pub(crate) fn checked_mul(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs)
        .ok_or_else(|| BomError::Overflow(format!("{} × {}", lhs, rhs)))
}

/// 加法，超出 `Decimal` 範圍時返回 `Overflow`
pub(crate) fn checked_add(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_add(rhs)
        .ok_or_else(|| BomError::Overflow(format!("{} + {}", lhs, rhs)))
}

fn cycle_fault(path: &[BomId], repeated: BomId) -> BomError {
    let start = path.iter().position(|id| *id == repeated).unwrap_or(0);
    let mut cycle = path[start..].to_vec();
    cycle.push(repeated);

    tracing::error!(
        "組成圖存在循環（寫入驗證可能被繞過）：{:?}",
        cycle.iter().map(ToString::to_string).collect::<Vec<_>>()
    );

    BomError::GraphIntegrity { path: cycle }
}
