//! BOM 服務
//!
//! 寫入一律在交易內針對「擬議後」的組成圖驗證；
//! 讀取一律在單一快照上以新的成本解析器計算。

use bom_calc::{CostBreakdown, CostResolver, PricingEngine, TreeBuilder, TreeNode};
use bom_core::{
    validate_profit_margin, Bom, BomDraft, BomError, BomId, BomItem, BomItemId, BomSnapshot,
    CreateBomRequest, EngineConfig, ProductCatalog, Reference, Result, UpdateBomRequest,
};
use bom_graph::{available_sub_boms, CompositionGraph};
use rayon::prelude::*;
use rust_decimal::Decimal;

use crate::BomRepository;

/// BOM 服務
pub struct BomService<R, C> {
    repository: R,
    catalog: C,
    config: EngineConfig,
}

impl<R: BomRepository, C: ProductCatalog> BomService<R, C> {
    /// 創建新的 BOM 服務
    pub fn new(repository: R, catalog: C, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            catalog,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    // ========== 寫入 ==========

    /// 新建 BOM（與初始明細一起原子寫入）
    pub fn create_bom(&self, request: CreateBomRequest) -> Result<Bom> {
        tracing::info!(
            "新建 BOM：產品 {}，版本 {}，明細 {} 筆",
            request.product_id,
            request.version,
            request.items.len()
        );

        let profit_margin = request
            .profit_margin
            .unwrap_or(self.config.default_profit_margin);
        validate_profit_margin(profit_margin).map_err(log_rejection)?;
        self.catalog
            .require_product(&request.product_id)
            .map_err(log_rejection)?;

        let mut bom = Bom::new(request.product_id, request.version).with_items(request.items);
        bom.profit_margin = profit_margin;
        bom.notes = request.notes;
        bom.parent_bom_id = request.parent_bom_id;

        self.repository
            .transaction(|snapshot| {
                if let Some(parent_bom_id) = bom.parent_bom_id {
                    snapshot.require(parent_bom_id)?;
                }
                self.validate_items(snapshot, bom.id, &bom.items)?;
                snapshot.insert(bom.clone());
                Ok(())
            })
            .map_err(log_rejection)?;

        tracing::info!("BOM {} 已建立", bom.id);
        Ok(bom)
    }

    /// 更新 BOM：整批取代明細，利潤率與備註未指定則保留
    pub fn update_bom(&self, bom_id: BomId, request: UpdateBomRequest) -> Result<Bom> {
        tracing::info!("更新 BOM {}：明細 {} 筆", bom_id, request.items.len());

        if let Some(margin) = request.profit_margin {
            validate_profit_margin(margin).map_err(log_rejection)?;
        }

        self.repository
            .transaction(|snapshot| {
                snapshot.require(bom_id)?;
                self.validate_items(snapshot, bom_id, &request.items)?;

                let bom = snapshot.require_mut(bom_id)?;
                bom.items = request.items;
                if let Some(margin) = request.profit_margin {
                    bom.profit_margin = margin;
                }
                if let Some(notes) = request.notes {
                    bom.notes = Some(notes);
                }
                bom.touch();
                Ok(bom.clone())
            })
            .map_err(log_rejection)
    }

    /// 刪除 BOM；仍被其他 BOM 引用時拒絕
    pub fn delete_bom(&self, bom_id: BomId) -> Result<()> {
        tracing::info!("刪除 BOM {}", bom_id);

        self.repository
            .transaction(|snapshot| {
                snapshot.require(bom_id)?;

                // 引用檢查與刪除在同一交易內
                let referenced_by = snapshot.referencing(bom_id);
                if !referenced_by.is_empty() {
                    return Err(BomError::ReferentialConflict {
                        bom_id,
                        referenced_by,
                    });
                }

                snapshot.remove(bom_id);

                // 衍生關係僅為組織資訊，來源刪除後清空
                let variants: Vec<BomId> = snapshot
                    .iter()
                    .filter(|bom| bom.parent_bom_id == Some(bom_id))
                    .map(|bom| bom.id)
                    .collect();
                for variant in variants {
                    let bom = snapshot.require_mut(variant)?;
                    bom.parent_bom_id = None;
                    bom.touch();
                }
                Ok(())
            })
            .map_err(log_rejection)
    }

    /// 新增單一明細
    pub fn add_item(&self, bom_id: BomId, item: BomItem) -> Result<Bom> {
        tracing::debug!("BOM {} 新增明細 {}", bom_id, item.id);
        self.modify_items(bom_id, |items| {
            items.push(item);
            Ok(())
        })
    }

    /// 移除單一明細
    pub fn remove_item(&self, bom_id: BomId, item_id: BomItemId) -> Result<Bom> {
        tracing::debug!("BOM {} 移除明細 {}", bom_id, item_id);
        self.modify_items(bom_id, |items| {
            let index = items
                .iter()
                .position(|item| item.id == item_id)
                .ok_or(BomError::MissingReference(Reference::Item(item_id)))?;
            items.remove(index);
            Ok(())
        })
    }

    /// 修改單一明細的用量
    pub fn update_item_quantity(
        &self,
        bom_id: BomId,
        item_id: BomItemId,
        quantity: Decimal,
    ) -> Result<Bom> {
        tracing::debug!("BOM {} 明細 {} 用量改為 {}", bom_id, item_id, quantity);
        self.modify_items(bom_id, |items| {
            let item = items
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or(BomError::MissingReference(Reference::Item(item_id)))?;
            item.quantity = quantity;
            Ok(())
        })
    }

    /// 修改利潤率（不回溯已被其他單據使用的成本）
    pub fn update_profit_margin(&self, bom_id: BomId, profit_margin: Decimal) -> Result<Bom> {
        tracing::info!("BOM {} 利潤率改為 {}%", bom_id, profit_margin);
        validate_profit_margin(profit_margin).map_err(log_rejection)?;

        self.repository
            .transaction(|snapshot| {
                let bom = snapshot.require_mut(bom_id)?;
                bom.profit_margin = profit_margin;
                bom.touch();
                Ok(bom.clone())
            })
            .map_err(log_rejection)
    }

    /// 儲存草稿為新 BOM
    pub fn save_draft(&self, draft: &BomDraft) -> Result<Bom> {
        let request = draft.to_request().map_err(log_rejection)?;
        self.create_bom(request)
    }

    fn modify_items<F>(&self, bom_id: BomId, edit: F) -> Result<Bom>
    where
        F: FnOnce(&mut Vec<BomItem>) -> Result<()>,
    {
        self.repository
            .transaction(|snapshot| {
                let mut items = snapshot.require(bom_id)?.items.clone();
                edit(&mut items)?;
                self.validate_items(snapshot, bom_id, &items)?;

                let bom = snapshot.require_mut(bom_id)?;
                bom.items = items;
                bom.touch();
                Ok(bom.clone())
            })
            .map_err(log_rejection)
    }

    /// 驗證擬議明細：用量、引用存在、組成圖無循環
    fn validate_items(
        &self,
        snapshot: &BomSnapshot,
        bom_id: BomId,
        items: &[BomItem],
    ) -> Result<()> {
        for item in items {
            item.validate()?;
            if let Some(material_id) = item.component.raw_material_id() {
                self.catalog.require_product(material_id)?;
            }
            if let Some(sub_bom_id) = item.component.sub_bom_id() {
                if sub_bom_id != bom_id {
                    snapshot.require(sub_bom_id)?;
                }
            }
        }

        CompositionGraph::from_snapshot(snapshot)
            .validate_children(bom_id, items.iter().filter_map(|item| item.component.sub_bom_id()))
    }

    // ========== 讀取 ==========

    pub fn get_bom(&self, bom_id: BomId) -> Result<Bom> {
        self.repository.snapshot().require(bom_id).cloned()
    }

    /// 所有 BOM，依建立時間排序
    pub fn list_boms(&self) -> Vec<Bom> {
        self.repository
            .snapshot()
            .sorted()
            .into_iter()
            .cloned()
            .collect()
    }

    /// 直接引用指定 BOM 的父 BOM
    pub fn where_used(&self, bom_id: BomId) -> Result<Vec<BomId>> {
        let snapshot = self.repository.snapshot();
        snapshot.require(bom_id)?;
        Ok(snapshot.referencing(bom_id))
    }

    /// 成本查詢（已取整）
    pub fn get_cost(&self, bom_id: BomId, quantity: Decimal) -> Result<CostBreakdown> {
        let snapshot = self.repository.snapshot();
        self.quote_on(&snapshot, bom_id, quantity)
    }

    /// 批次報價：同一快照，各筆獨立計算
    pub fn quote_many(&self, requests: &[(BomId, Decimal)]) -> Vec<Result<CostBreakdown>> {
        let snapshot = self.repository.snapshot();

        if requests.len() > self.config.parallel_quote_threshold {
            tracing::debug!("平行報價 {} 筆", requests.len());
            requests
                .par_iter()
                .map(|(bom_id, quantity)| self.quote_on(&snapshot, *bom_id, *quantity))
                .collect()
        } else {
            requests
                .iter()
                .map(|(bom_id, quantity)| self.quote_on(&snapshot, *bom_id, *quantity))
                .collect()
        }
    }

    /// 成本樹（已取整）
    pub fn get_tree(&self, bom_id: BomId, quantity: Decimal) -> Result<TreeNode> {
        let snapshot = self.repository.snapshot();
        let mut resolver = CostResolver::new(snapshot.as_ref(), &self.catalog);

        TreeBuilder::build(&mut resolver, bom_id, quantity)
            .map(|tree| tree.rounded(&self.config))
            .map_err(log_read_failure)
    }

    /// 可安全加入 `exclude` 的子 BOM；未指定時返回全部
    pub fn get_available_sub_boms(&self, exclude: Option<BomId>) -> Vec<Bom> {
        let snapshot = self.repository.snapshot();
        available_sub_boms(&snapshot, exclude)
            .into_iter()
            .cloned()
            .collect()
    }

    /// 檢查已持久化的組成圖是否仍無循環
    pub fn verify_integrity(&self) -> Result<()> {
        let snapshot = self.repository.snapshot();
        match CompositionGraph::from_snapshot(&snapshot).find_cycle() {
            Some(path) => {
                let err = BomError::GraphIntegrity { path };
                tracing::error!("{}", err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn quote_on(
        &self,
        snapshot: &BomSnapshot,
        bom_id: BomId,
        quantity: Decimal,
    ) -> Result<CostBreakdown> {
        let mut resolver = CostResolver::new(snapshot, &self.catalog);
        PricingEngine::quote(&mut resolver, bom_id, quantity)
            .map(|quote| quote.rounded(&self.config))
            .map_err(log_read_failure)
    }
}

fn log_rejection(err: BomError) -> BomError {
    tracing::warn!("拒絕寫入：{}", err);
    err
}

fn log_read_failure(err: BomError) -> BomError {
    if err.is_fatal() {
        tracing::error!("成本計算失敗（資料完整性）：{}", err);
    } else {
        tracing::warn!("成本計算失敗：{}", err);
    }
    err
}
