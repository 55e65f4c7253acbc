//! 利潤率定價

use bom_core::{BomId, EngineConfig, ProductCatalog, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cost::{checked_mul, ensure_quantity, CostResolver};

/// 成本明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub bom_id: BomId,

    /// 產量
    pub quantity: Decimal,

    /// 基本成本（未加利潤）
    pub base_cost: Decimal,

    /// 利潤率（百分比）
    pub profit_margin: Decimal,

    /// 售價
    pub final_cost: Decimal,
}

impl CostBreakdown {
    /// 對外輸出用：金額依幣別精度取整
    pub fn rounded(&self, config: &EngineConfig) -> Self {
        Self {
            base_cost: config.round_currency(self.base_cost),
            final_cost: config.round_currency(self.final_cost),
            ..self.clone()
        }
    }

    /// 利潤金額
    pub fn profit(&self) -> Decimal {
        self.final_cost - self.base_cost
    }
}

/// 定價計算器
pub struct PricingEngine;

impl PricingEngine {
    /// 利潤率係數：`1 + margin / 100`
    pub fn margin_factor(profit_margin: Decimal) -> Decimal {
        Decimal::ONE + profit_margin / Decimal::ONE_HUNDRED
    }

    /// 在基本成本上套用利潤率
    pub fn apply_margin(base_cost: Decimal, profit_margin: Decimal) -> Result<Decimal> {
        checked_mul(base_cost, Self::margin_factor(profit_margin))
    }

    /// 報價：基本成本、利潤率與售價
    pub fn quote<C: ProductCatalog + ?Sized>(
        resolver: &mut CostResolver<'_, C>,
        bom_id: BomId,
        quantity: Decimal,
    ) -> Result<CostBreakdown> {
        ensure_quantity(quantity)?;

        let base_cost = resolver.resolve_base_cost(bom_id, quantity)?;
        let profit_margin = resolver.snapshot().require(bom_id)?.profit_margin;
        let final_cost = Self::apply_margin(base_cost, profit_margin)?;

        tracing::debug!(
            "BOM {} 報價：產量 {}，基本成本 {}，利潤率 {}%，售價 {}",
            bom_id,
            quantity,
            base_cost,
            profit_margin,
            final_cost
        );

        Ok(CostBreakdown {
            bom_id,
            quantity,
            base_cost,
            profit_margin,
            final_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::tests::{bom, catalog, dec, material, table_snapshot};
    use bom_core::BomSnapshot;
    use rstest::rstest;

    #[rstest]
    #[case("35", "20", "42")]
    #[case("34", "15", "39.1")]
    #[case("100", "0", "100")]
    #[case("10", "2.5", "10.25")]
    fn test_apply_margin(#[case] base: &str, #[case] margin: &str, #[case] expected: &str) {
        assert_eq!(
            PricingEngine::apply_margin(dec(base), dec(margin)).unwrap(),
            dec(expected)
        );
    }

    #[test]
    fn test_apply_margin_overflow() {
        assert!(matches!(
            PricingEngine::apply_margin(Decimal::MAX, dec("50")),
            Err(bom_core::BomError::Overflow(_))
        ));
    }

    #[test]
    fn test_quote_table() {
        let (snapshot, table_id, _) = table_snapshot();
        let catalog = catalog();
        let mut resolver = CostResolver::new(&snapshot, &catalog);

        let quote = PricingEngine::quote(&mut resolver, table_id, Decimal::ONE).unwrap();
        assert_eq!(quote.base_cost, dec("34"));
        assert_eq!(quote.profit_margin, dec("15"));
        assert_eq!(quote.final_cost, dec("39.1"));
        assert_eq!(quote.profit(), dec("5.1"));

        let rounded = quote.rounded(&EngineConfig::default());
        assert_eq!(rounded.final_cost.to_string(), "39.10");
        assert_eq!(rounded.base_cost.to_string(), "34.00");
    }

    #[test]
    fn test_rounding_only_at_boundary() {
        let shelf = bom("P", "12.5", vec![material("SCREW", "0.333")]);
        let shelf_id = shelf.id;
        let snapshot = BomSnapshot::new().with_bom(shelf);
        let catalog = catalog();
        let mut resolver = CostResolver::new(&snapshot, &catalog);

        let quote = PricingEngine::quote(&mut resolver, shelf_id, Decimal::ONE).unwrap();
        assert_eq!(quote.final_cost, dec("0.0374625"));
        assert_eq!(quote.rounded(&EngineConfig::default()).final_cost, dec("0.04"));
    }
}
