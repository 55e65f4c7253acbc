//! BOM 與 BOM 明細模型

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BomError, ProductId, Result};

/// BOM ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BomId(Uuid);

impl BomId {
    /// 產生新的 BOM ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BomId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// BOM 明細 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BomItemId(Uuid);

impl BomItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BomItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BomItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// 明細類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// 原物料
    Material,
    /// 子 BOM（半成品 / 子組件）
    SubBom,
}

/// 明細引用的組成對象
///
/// 原物料與子 BOM 二擇一，由型別本身保證。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "snake_case")]
pub enum BomComponent {
    /// 原物料
    Material { raw_material_id: ProductId },
    /// 子組件
    SubBom { sub_bom_id: BomId },
}

impl BomComponent {
    pub fn item_type(&self) -> ItemType {
        match self {
            BomComponent::Material { .. } => ItemType::Material,
            BomComponent::SubBom { .. } => ItemType::SubBom,
        }
    }

    /// 若為子 BOM，返回其 ID（組成圖的邊）
    pub fn sub_bom_id(&self) -> Option<BomId> {
        match self {
            BomComponent::SubBom { sub_bom_id } => Some(*sub_bom_id),
            BomComponent::Material { .. } => None,
        }
    }

    pub fn raw_material_id(&self) -> Option<&ProductId> {
        match self {
            BomComponent::Material { raw_material_id } => Some(raw_material_id),
            BomComponent::SubBom { .. } => None,
        }
    }
}

/// BOM 明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomItem {
    /// 明細 ID
    pub id: BomItemId,

    /// 組成對象
    #[serde(flatten)]
    pub component: BomComponent,

    /// 每單位產出的用量（> 0）
    pub quantity: Decimal,

    /// 計量單位
    pub unit: Option<String>,

    /// 備註
    pub notes: Option<String>,
}

impl BomItem {
    /// 創建明細，驗證用量
    pub fn new(component: BomComponent, quantity: Decimal) -> Result<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            id: BomItemId::new(),
            component,
            quantity,
            unit: None,
            notes: None,
        })
    }

    /// 原物料明細
    pub fn material(raw_material_id: ProductId, quantity: Decimal) -> Result<Self> {
        Self::new(BomComponent::Material { raw_material_id }, quantity)
    }

    /// 子 BOM 明細
    pub fn sub_bom(sub_bom_id: BomId, quantity: Decimal) -> Result<Self> {
        Self::new(BomComponent::SubBom { sub_bom_id }, quantity)
    }

    /// 建構器模式：設置計量單位
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// 建構器模式：設置備註
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn item_type(&self) -> ItemType {
        self.component.item_type()
    }

    /// 已持久化資料重新驗證（反序列化後的資料未經建構函式）
    pub fn validate(&self) -> Result<()> {
        ensure_positive(self.quantity)
    }
}

pub(crate) fn ensure_positive(quantity: Decimal) -> Result<()> {
    if quantity <= Decimal::ZERO {
        return Err(BomError::InvalidQuantity(quantity));
    }
    Ok(())
}

/// 外部輸入的明細（API 邊界形式）
///
/// `raw_material_id` 與 `sub_bom_id` 必須依 `item_type` 恰好設置其一。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomItemInput {
    pub item_type: Option<ItemType>,
    pub raw_material_id: Option<ProductId>,
    pub sub_bom_id: Option<BomId>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

impl BomItemInput {
    pub fn material(raw_material_id: ProductId, quantity: Decimal) -> Self {
        Self {
            item_type: Some(ItemType::Material),
            raw_material_id: Some(raw_material_id),
            sub_bom_id: None,
            quantity: Some(quantity),
            unit: None,
            notes: None,
        }
    }

    pub fn sub_bom(sub_bom_id: BomId, quantity: Decimal) -> Self {
        Self {
            item_type: Some(ItemType::SubBom),
            raw_material_id: None,
            sub_bom_id: Some(sub_bom_id),
            quantity: Some(quantity),
            unit: None,
            notes: None,
        }
    }
}

impl TryFrom<BomItemInput> for BomItem {
    type Error = BomError;

    fn try_from(input: BomItemInput) -> Result<Self> {
        let item_type = input
            .item_type
            .ok_or_else(|| BomError::InvalidItem("缺少 item_type".to_string()))?;
        let quantity = input
            .quantity
            .ok_or_else(|| BomError::InvalidItem("缺少 quantity".to_string()))?;

        let component = match (item_type, input.raw_material_id, input.sub_bom_id) {
            (ItemType::Material, Some(raw_material_id), None) => {
                BomComponent::Material { raw_material_id }
            }
            (ItemType::SubBom, None, Some(sub_bom_id)) => BomComponent::SubBom { sub_bom_id },
            (_, Some(_), Some(_)) => {
                return Err(BomError::InvalidItem(
                    "raw_material_id 與 sub_bom_id 不可同時設置".to_string(),
                ))
            }
            (ItemType::Material, _, _) => {
                return Err(BomError::InvalidItem(
                    "原物料明細必須設置 raw_material_id".to_string(),
                ))
            }
            (ItemType::SubBom, _, _) => {
                return Err(BomError::InvalidItem(
                    "子 BOM 明細必須設置 sub_bom_id".to_string(),
                ))
            }
        };

        let mut item = BomItem::new(component, quantity)?;
        item.unit = input.unit;
        item.notes = input.notes;
        Ok(item)
    }
}

/// BOM（物料清單）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    /// BOM ID
    pub id: BomId,

    /// 產出的成品
    pub product_id: ProductId,

    /// 版本
    pub version: String,

    /// 利潤率（百分比，≥ 0）
    pub profit_margin: Decimal,

    /// 備註
    pub notes: Option<String>,

    /// 衍生來源 BOM（僅作組織用途，不參與成本計算與循環檢查）
    pub parent_bom_id: Option<BomId>,

    /// 明細（保持插入順序）
    pub items: Vec<BomItem>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bom {
    /// 創建新的 BOM
    pub fn new(product_id: ProductId, version: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BomId::new(),
            product_id,
            version: version.into(),
            profit_margin: Decimal::ZERO,
            notes: None,
            parent_bom_id: None,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 建構器模式：設置利潤率
    pub fn with_profit_margin(mut self, margin: Decimal) -> Result<Self> {
        validate_profit_margin(margin)?;
        self.profit_margin = margin;
        Ok(self)
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

    /// 建構器模式：設置明細
    pub fn with_items(mut self, items: Vec<BomItem>) -> Self {
        self.items = items;
        self
    }

    /// 添加明細
    pub fn add_item(&mut self, item: BomItem) {
        self.items.push(item);
    }

    /// 直接引用的子 BOM（依明細順序，可能重複）
    pub fn sub_bom_ids(&self) -> impl Iterator<Item = BomId> + '_ {
        self.items.iter().filter_map(|item| item.component.sub_bom_id())
    }

    /// 是否直接引用指定的子 BOM
    pub fn references(&self, bom_id: BomId) -> bool {
        self.sub_bom_ids().any(|id| id == bom_id)
    }

    pub fn find_item(&self, item_id: BomItemId) -> Option<&BomItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// 驗證 BOM 自身的不變量（利潤率、用量）
    pub fn validate(&self) -> Result<()> {
        validate_profit_margin(self.profit_margin)?;
        self.items.iter().try_for_each(BomItem::validate)
    }

    /// 標記更新時間
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// 利潤率檢查（≥ 0）
pub fn validate_profit_margin(margin: Decimal) -> Result<()> {
    if margin < Decimal::ZERO {
        return Err(BomError::InvalidProfitMargin(margin));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_create_bom() {
        let leg = BomId::new();
        let bom = Bom::new(ProductId::new("P-TABLE"), "v1")
            .with_profit_margin(Decimal::from(15))
            .unwrap()
            .with_items(vec![
                BomItem::sub_bom(leg, Decimal::from(4)).unwrap(),
                BomItem::material(ProductId::new("M-SCREW"), Decimal::from(20))
                    .unwrap()
                    .with_unit("ea"),
            ]);

        assert_eq!(bom.items.len(), 2);
        assert_eq!(bom.items[0].item_type(), ItemType::SubBom);
        assert_eq!(bom.items[1].item_type(), ItemType::Material);
        assert!(bom.references(leg));
        assert_eq!(bom.sub_bom_ids().collect::<Vec<_>>(), vec![leg]);
        assert!(bom.validate().is_ok());
    }

    #[rstest]
    #[case(Decimal::ZERO)]
    #[case(Decimal::from(-1))]
    #[case(Decimal::new(-1, 3))]
    fn test_non_positive_quantity_rejected(#[case] quantity: Decimal) {
        let result = BomItem::material(ProductId::new("M-1"), quantity);
        assert!(matches!(result, Err(BomError::InvalidQuantity(q)) if q == quantity));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let result = Bom::new(ProductId::new("P-1"), "v1").with_profit_margin(Decimal::from(-5));
        assert!(matches!(result, Err(BomError::InvalidProfitMargin(_))));
    }

    #[test]
    fn test_item_input_conversion() {
        let sub = BomId::new();
        let item = BomItem::try_from(BomItemInput::sub_bom(sub, Decimal::from(2))).unwrap();
        assert_eq!(item.component.sub_bom_id(), Some(sub));
        assert_eq!(item.quantity, Decimal::from(2));
    }

    #[test]
    fn test_item_input_xor_violation() {
        let mut both = BomItemInput::material(ProductId::new("M-1"), Decimal::ONE);
        both.sub_bom_id = Some(BomId::new());
        assert!(matches!(BomItem::try_from(both), Err(BomError::InvalidItem(_))));

        let mut neither = BomItemInput::sub_bom(BomId::new(), Decimal::ONE);
        neither.sub_bom_id = None;
        assert!(matches!(BomItem::try_from(neither), Err(BomError::InvalidItem(_))));

        let mut mismatched = BomItemInput::material(ProductId::new("M-1"), Decimal::ONE);
        mismatched.item_type = Some(ItemType::SubBom);
        assert!(matches!(BomItem::try_from(mismatched), Err(BomError::InvalidItem(_))));
    }

    #[test]
    fn test_item_input_missing_fields() {
        let mut no_quantity = BomItemInput::material(ProductId::new("M-1"), Decimal::ONE);
        no_quantity.quantity = None;
        assert!(matches!(BomItem::try_from(no_quantity), Err(BomError::InvalidItem(_))));

        let mut no_type = BomItemInput::material(ProductId::new("M-1"), Decimal::ONE);
        no_type.item_type = None;
        assert!(matches!(BomItem::try_from(no_type), Err(BomError::InvalidItem(_))));
    }

    #[test]
    fn test_component_serialization_is_tagged() {
        let item = BomItem::material(ProductId::new("M-1"), Decimal::from(3)).unwrap();
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["item_type"], "material");
        assert_eq!(json["raw_material_id"], "M-1");
        assert!(json.get("sub_bom_id").is_none());
    }
}
