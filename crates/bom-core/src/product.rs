//! 產品模型（產品目錄提供的查詢結果）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 產品ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 產品類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// 原物料
    RawMaterial,
    /// 成品
    FinishedGood,
}

/// 產品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// 產品ID
    pub id: ProductId,

    /// 料號
    pub sku: String,

    /// 名稱
    pub name: String,

    /// 計量單位
    pub unit: String,

    /// 產品類型
    #[serde(rename = "type")]
    pub product_type: ProductType,

    /// 單位成本（原物料成本的權威來源）
    pub unit_cost: Decimal,
}

impl Product {
    /// 創建原物料
    pub fn raw_material(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            id: ProductId::new(id),
            sku: sku.into(),
            name: name.into(),
            unit: "pcs".to_string(),
            product_type: ProductType::RawMaterial,
            unit_cost,
        }
    }

    /// 創建成品
    pub fn finished_good(
        id: impl Into<String>,
        sku: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId::new(id),
            sku: sku.into(),
            name: name.into(),
            unit: "pcs".to_string(),
            product_type: ProductType::FinishedGood,
            unit_cost: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置計量單位
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn is_raw_material(&self) -> bool {
        self.product_type == ProductType::RawMaterial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_raw_material() {
        let screw = Product::raw_material("M-SCREW", "SCR-001", "Screw", Decimal::new(1, 1))
            .with_unit("ea");

        assert_eq!(screw.id.as_str(), "M-SCREW");
        assert_eq!(screw.unit, "ea");
        assert_eq!(screw.unit_cost, Decimal::new(1, 1));
        assert!(screw.is_raw_material());
    }

    #[test]
    fn test_product_type_serialization() {
        let table = Product::finished_good("P-TABLE", "TBL-001", "Table");
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["type"], "finished_good");
        assert_eq!(json["id"], "P-TABLE");
    }
}
