//! 成本樹
//!
//! 以與成本解析相同的規則展開 BOM，根節點總成本恆等於該 BOM 的售價。

use bom_core::{
    Bom, BomComponent, BomId, BomItem, BomItemId, EngineConfig, ProductCatalog, Result,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost::{checked_mul, ensure_quantity, CostResolver};
use crate::PricingEngine;

/// 節點類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNodeType {
    /// 根節點（查詢的 BOM）
    Bom,
    /// 原物料
    Material,
    /// 子 BOM
    SubBom,
}

/// 成本樹節點
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// 產品 / 原物料 ID
    pub id: String,

    pub item_type: TreeNodeType,

    /// 根節點與子 BOM 節點對應的 BOM
    pub bom_id: Option<BomId>,

    /// 對應的 BOM 明細（根節點為 None）
    pub item_id: Option<BomItemId>,

    pub product_name: String,
    pub product_sku: String,

    /// 層級（根節點 = 0）
    pub level: usize,

    /// 此層級的絕對數量（路徑上用量的乘積）
    pub quantity: Decimal,

    pub unit: String,

    /// 單位成本：原物料為目錄成本，BOM 為單位售價
    pub unit_cost: Decimal,

    /// 此節點的總成本
    pub total_cost: Decimal,

    /// 基本成本（僅 BOM 節點）
    pub base_cost: Option<Decimal>,

    /// 利潤率（僅 BOM 節點）
    pub profit_margin: Option<Decimal>,

    pub children: Vec<TreeNode>,
}

/// 扁平化的成本樹列（表格 / 匯出用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRow {
    pub level: usize,
    pub item_type: TreeNodeType,
    pub id: String,
    pub product_sku: String,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
}

impl TreeNode {
    /// 節點總數（含自身）
    pub fn node_count(&self) -> usize {
        self.preorder().len()
    }

    /// 最大層級
    pub fn depth(&self) -> usize {
        self.preorder()
            .into_iter()
            .map(|node| node.level)
            .max()
            .unwrap_or(self.level)
    }

    /// 子節點成本合計（BOM 節點為其基本成本）
    pub fn children_total(&self) -> Decimal {
        self.children.iter().map(|child| child.total_cost).sum()
    }

    /// 深度優先展開為列
    pub fn flatten(&self) -> Vec<TreeRow> {
        self.preorder()
            .into_iter()
            .map(|node| TreeRow {
                level: node.level,
                item_type: node.item_type,
                id: node.id.clone(),
                product_sku: node.product_sku.clone(),
                product_name: node.product_name.clone(),
                quantity: node.quantity,
                unit: node.unit.clone(),
                unit_cost: node.unit_cost,
                total_cost: node.total_cost,
            })
            .collect()
    }

    /// 對外輸出用：所有金額依幣別精度取整
    pub fn rounded(mut self, config: &EngineConfig) -> Self {
        let mut stack = vec![&mut self];
        while let Some(node) = stack.pop() {
            node.unit_cost = config.round_currency(node.unit_cost);
            node.total_cost = config.round_currency(node.total_cost);
            node.base_cost = node.base_cost.map(|cost| config.round_currency(cost));
            stack.extend(node.children.iter_mut());
        }
        self
    }

    /// 前序走訪（顯式堆疊）
    fn preorder(&self) -> Vec<&TreeNode> {
        let mut nodes = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.iter().rev());
        }
        nodes
    }
}

impl Drop for TreeNode {
    // 逐層搬出子節點再釋放，釋放深度不隨樹高增加
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl std::fmt::Display for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.flatten() {
            writeln!(
                f,
                "{:indent$}{} [{}] {} {} × {} = {}",
                "",
                row.product_name,
                row.product_sku,
                row.quantity,
                row.unit,
                row.unit_cost,
                row.total_cost,
                indent = row.level * 2
            )?;
        }
        Ok(())
    }
}

/// 待展開的明細
struct Pending<'a> {
    item: &'a BomItem,
    parent_quantity: Decimal,
    level: usize,
    /// 父節點在前序列表中的位置（None 為根節點）
    parent: Option<usize>,
}

/// 成本樹建構器
pub struct TreeBuilder;

impl TreeBuilder {
    /// 建立 `quantity` 單位產出的成本樹
    pub fn build<'a, C: ProductCatalog + ?Sized>(
        resolver: &mut CostResolver<'a, C>,
        bom_id: BomId,
        quantity: Decimal,
    ) -> Result<TreeNode> {
        ensure_quantity(quantity)?;

        // 報價同時完成循環與引用檢查，之後的展開不會遇到循環
        let quote = PricingEngine::quote(resolver, bom_id, quantity)?;
        let bom = resolver.snapshot().require(bom_id)?;
        let product = resolver.product(&bom.product_id)?.clone();

        let root = TreeNode {
            id: product.id.to_string(),
            item_type: TreeNodeType::Bom,
            bom_id: Some(bom_id),
            item_id: None,
            product_name: product.name,
            product_sku: product.sku,
            level: 0,
            quantity,
            unit: product.unit,
            unit_cost: resolver.unit_final_cost(bom_id)?,
            total_cost: quote.final_cost,
            base_cost: Some(quote.base_cost),
            profit_margin: Some(quote.profit_margin),
            children: Vec::new(),
        };
        let tree = Self::expand(resolver, root, bom, quantity)?;

        tracing::debug!("BOM {} 成本樹展開完成，共 {} 個節點", bom_id, tree.node_count());
        Ok(tree)
    }

    /// 以顯式堆疊展開明細
    ///
    /// 先依前序產生所有節點並記錄父節點位置，再由後往前掛回父節點；
    /// 子節點的位置必定在父節點之後。
    fn expand<'a, C: ProductCatalog + ?Sized>(
        resolver: &mut CostResolver<'a, C>,
        mut root: TreeNode,
        bom: &'a Bom,
        quantity: Decimal,
    ) -> Result<TreeNode> {
        let snapshot = resolver.snapshot();
        let mut nodes: Vec<(TreeNode, Option<usize>)> = Vec::new();
        let mut pending = Vec::new();
        Self::push_items(&mut pending, bom, quantity, 1, None);

        while let Some(Pending { item, parent_quantity, level, parent }) = pending.pop() {
            let quantity = checked_mul(item.quantity, parent_quantity)?;
            let total_cost = resolver.item_contribution(item, parent_quantity)?;

            let node = match &item.component {
                BomComponent::Material { raw_material_id } => {
                    let product = resolver.product(raw_material_id)?.clone();
                    TreeNode {
                        id: product.id.to_string(),
                        item_type: TreeNodeType::Material,
                        bom_id: None,
                        item_id: Some(item.id),
                        product_name: product.name,
                        product_sku: product.sku,
                        level,
                        quantity,
                        unit: item.unit.clone().unwrap_or(product.unit),
                        unit_cost: product.unit_cost,
                        total_cost,
                        base_cost: None,
                        profit_margin: None,
                        children: Vec::new(),
                    }
                }
                BomComponent::SubBom { sub_bom_id } => {
                    let sub_bom = snapshot.require(*sub_bom_id)?;
                    let product = resolver.product(&sub_bom.product_id)?.clone();
                    let index = Some(nodes.len());
                    Self::push_items(&mut pending, sub_bom, quantity, level + 1, index);
                    TreeNode {
                        id: product.id.to_string(),
                        item_type: TreeNodeType::SubBom,
                        bom_id: Some(*sub_bom_id),
                        item_id: Some(item.id),
                        product_name: product.name,
                        product_sku: product.sku,
                        level,
                        quantity,
                        unit: item.unit.clone().unwrap_or(product.unit),
                        unit_cost: resolver.unit_final_cost(*sub_bom_id)?,
                        total_cost,
                        base_cost: Some(resolver.resolve_base_cost(*sub_bom_id, quantity)?),
                        profit_margin: Some(sub_bom.profit_margin),
                        children: Vec::new(),
                    }
                }
            };
            nodes.push((node, parent));
        }

        // 子節點以反向順序掛上，掛回父節點前先還原明細順序
        while let Some((mut node, parent)) = nodes.pop() {
            node.children.reverse();
            match parent {
                Some(index) => nodes[index].0.children.push(node),
                None => root.children.push(node),
            }
        }
        root.children.reverse();

        Ok(root)
    }

    /// 反向壓堆疊，使明細依原順序展開
    fn push_items<'a>(
        pending: &mut Vec<Pending<'a>>,
        bom: &'a Bom,
        parent_quantity: Decimal,
        level: usize,
        parent: Option<usize>,
    ) {
        pending.extend(bom.items.iter().rev().map(|item| Pending {
            item,
            parent_quantity,
            level,
            parent,
        }));
    }
}
