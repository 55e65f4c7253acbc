//! 簡單 BOM 成本計算示例

use bom::*;
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== 簡單 BOM 成本計算示例 ===\n");

    let catalog: InMemoryCatalog = vec![
        Product::finished_good("TABLE", "TBL-001", "Table"),
        Product::finished_good("LEG", "LEG-001", "Leg Assembly"),
        Product::raw_material("LEG-WOOD", "RM-LEG", "Leg blank", Decimal::from(4)),
        Product::raw_material("SCREW", "RM-SCREW", "Screw", Decimal::new(1, 1)),
    ]
    .into_iter()
    .collect();

    let service = BomService::new(InMemoryBomStore::new(), catalog, EngineConfig::default())?;

    // 桌腳組件：單位售價 8
    let leg = service.create_bom(
        CreateBomRequest::new(ProductId::new("LEG"), "v1")
            .with_items(vec![BomItem::material(ProductId::new("LEG-WOOD"), Decimal::from(2))?]),
    )?;

    // 桌子 = 4 × 桌腳 + 20 × 螺絲，利潤 15%
    let table = service.create_bom(
        CreateBomRequest::new(ProductId::new("TABLE"), "v1")
            .with_profit_margin(Decimal::from(15))
            .with_items(vec![
                BomItem::sub_bom(leg.id, Decimal::from(4))?,
                BomItem::material(ProductId::new("SCREW"), Decimal::from(20))?,
            ]),
    )?;

    tracing::info!("已建立 BOM：桌腳 {}，桌子 {}", leg.id, table.id);

    let cost = service.get_cost(table.id, Decimal::ONE)?;
    println!("基本成本: {}", cost.base_cost);
    println!("利潤率:   {}%", cost.profit_margin);
    println!("售價:     {}", cost.final_cost);
    println!();

    println!("成本樹:");
    print!("{}", service.get_tree(table.id, Decimal::ONE)?);

    Ok(())
}
