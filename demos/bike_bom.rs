//! # 腳踏車多層 BOM 成本範例
//!
//! 這個範例展示完整的成本計算流程：
//! - 產品：腳踏車
//! - 子組件：車架、輪組（輪組再包含輪圈與輻條）
//! - 寫入檢查：循環引用、刪除被引用的子 BOM
//! - 讀取：報價、成本樹、可用子 BOM

use bom::*;
use rust_decimal::Decimal;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("🚲 ===== 腳踏車多層 BOM 成本範例 =====");
    println!();

    // ========== 1. 建立產品目錄 ==========
    println!("📒 步驟 1: 建立產品目錄");
    let catalog = create_catalog();
    println!("   ✓ 產品數: {}", catalog.len());
    println!();

    let service = BomService::new(InMemoryBomStore::new(), catalog, EngineConfig::default())?;

    // ========== 2. 建立 BOM 結構 ==========
    println!("🔧 步驟 2: 建立 BOM 結構（由下而上）");
    let wheel = service.create_bom(
        CreateBomRequest::new(ProductId::new("WHEEL-001"), "v1")
            .with_profit_margin(Decimal::from(10))
            .with_items(vec![
                BomItem::material(ProductId::new("RIM-001"), Decimal::ONE)?,
                BomItem::material(ProductId::new("SPOKE-001"), Decimal::from(32))?.with_unit("EA"),
            ]),
    )?;
    println!("   ✓ WHEEL-001 輪組（利潤 10%）");

    let frame = service.create_bom(
        CreateBomRequest::new(ProductId::new("FRAME-001"), "v1")
            .with_profit_margin(Decimal::from(5))
            .with_items(vec![BomItem::material(ProductId::new("TUBE-001"), Decimal::from(3))?]),
    )?;
    println!("   ✓ FRAME-001 車架（利潤 5%）");

    let bike = service.create_bom(
        CreateBomRequest::new(ProductId::new("BIKE-001"), "v1")
            .with_profit_margin(Decimal::from(25))
            .with_items(vec![
                BomItem::sub_bom(frame.id, Decimal::ONE)?,
                BomItem::sub_bom(wheel.id, Decimal::from(2))?,
                BomItem::material(ProductId::new("SEAT-001"), Decimal::ONE)?,
            ]),
    )?;
    println!("   ✓ BIKE-001 腳踏車（利潤 25%）");
    println!();
    tracing::info!("BOM 結構建立完成，共 {} 筆", service.list_boms().len());

    // ========== 3. 寫入檢查 ==========
    println!("🛡️  步驟 3: 寫入檢查");
    match service.add_item(wheel.id, BomItem::sub_bom(bike.id, Decimal::ONE)?) {
        Err(err) => {
            tracing::info!(severity = ?err.severity(), "循環引用已拒絕");
            println!("   ✓ 已拒絕: {}", err);
        }
        Ok(_) => println!("   ✗ 循環引用未被攔截"),
    }
    match service.delete_bom(frame.id) {
        Err(err) => println!("   ✓ 已拒絕: {}", err),
        Ok(_) => println!("   ✗ 被引用的 BOM 已被刪除"),
    }
    println!();

    // ========== 4. 報價 ==========
    println!("💰 步驟 4: 報價");
    for quantity in [1, 10, 100] {
        let cost = service.get_cost(bike.id, Decimal::from(quantity))?;
        println!(
            "   {} 台: 基本成本 {} | 利潤率 {}% | 售價 {}",
            quantity, cost.base_cost, cost.profit_margin, cost.final_cost
        );
    }
    println!();

    // ========== 5. 成本樹 ==========
    println!("🌳 步驟 5: 成本樹（10 台）");
    let tree = service.get_tree(bike.id, Decimal::from(10))?;
    print!("{}", tree);
    println!();

    // ========== 6. 可用子 BOM ==========
    println!("🧩 步驟 6: 可加入輪組的子 BOM");
    for bom in service.get_available_sub_boms(Some(wheel.id)) {
        println!("   - {} {}", bom.product_id, bom.version);
    }
    println!();

    println!("✅ 完成！");
    Ok(())
}

/// 建立產品目錄
fn create_catalog() -> InMemoryCatalog {
    vec![
        Product::finished_good("BIKE-001", "BK-100", "Bike"),
        Product::finished_good("FRAME-001", "FR-100", "Frame"),
        Product::finished_good("WHEEL-001", "WH-100", "Wheel Set"),
        Product::raw_material("TUBE-001", "RM-TUBE", "Steel Tube", Decimal::new(1250, 2)),
        Product::raw_material("RIM-001", "RM-RIM", "Rim", Decimal::new(1800, 2)),
        Product::raw_material("SPOKE-001", "RM-SPOKE", "Spoke", Decimal::new(35, 2)),
        Product::raw_material("SEAT-001", "RM-SEAT", "Seat", Decimal::new(2200, 2)),
    ]
    .into_iter()
    .collect()
}
