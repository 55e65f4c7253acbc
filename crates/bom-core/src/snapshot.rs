//! BOM 快照：某一時點的完整組成圖

use std::collections::HashMap;

use crate::{Bom, BomError, BomId, Reference, Result};

/// BOM 快照
///
/// 讀取操作在同一份快照上完成計算，避免讀到更新到一半的明細。
#[derive(Debug, Clone, Default)]
pub struct BomSnapshot {
    boms: HashMap<BomId, Bom>,
}

impl BomSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入 BOM
    pub fn with_bom(mut self, bom: Bom) -> Self {
        self.insert(bom);
        self
    }

    pub fn get(&self, id: BomId) -> Option<&Bom> {
        self.boms.get(&id)
    }

    /// 查詢 BOM，不存在時返回 `MissingReference`
    pub fn require(&self, id: BomId) -> Result<&Bom> {
        self.boms
            .get(&id)
            .ok_or(BomError::MissingReference(Reference::Bom(id)))
    }

    pub fn require_mut(&mut self, id: BomId) -> Result<&mut Bom> {
        self.boms
            .get_mut(&id)
            .ok_or(BomError::MissingReference(Reference::Bom(id)))
    }

    pub fn contains(&self, id: BomId) -> bool {
        self.boms.contains_key(&id)
    }

    /// 加入或取代 BOM
    pub fn insert(&mut self, bom: Bom) -> Option<Bom> {
        self.boms.insert(bom.id, bom)
    }

    pub fn remove(&mut self, id: BomId) -> Option<Bom> {
        self.boms.remove(&id)
    }

    /// 所有 BOM（無序）
    pub fn iter(&self) -> impl Iterator<Item = &Bom> {
        self.boms.values()
    }

    /// 所有 BOM，依建立時間排序
    pub fn sorted(&self) -> Vec<&Bom> {
        let mut boms: Vec<&Bom> = self.boms.values().collect();
        boms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        boms
    }

    /// 直接引用指定 BOM 的父 BOM（where-used）
    pub fn referencing(&self, id: BomId) -> Vec<BomId> {
        let mut parents: Vec<BomId> = self
            .boms
            .values()
            .filter(|bom| bom.id != id && bom.references(id))
            .map(|bom| bom.id)
            .collect();
        parents.sort();
        parents
    }

    pub fn len(&self) -> usize {
        self.boms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boms.is_empty()
    }
}

impl FromIterator<Bom> for BomSnapshot {
    fn from_iter<I: IntoIterator<Item = Bom>>(iter: I) -> Self {
        Self {
            boms: iter.into_iter().map(|bom| (bom.id, bom)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BomItem, ProductId};
    use rust_decimal::Decimal;

    #[test]
    fn test_referencing() {
        let leg = Bom::new(ProductId::new("P-LEG"), "v1");
        let table = Bom::new(ProductId::new("P-TABLE"), "v1")
            .with_items(vec![BomItem::sub_bom(leg.id, Decimal::from(4)).unwrap()]);
        let (leg_id, table_id) = (leg.id, table.id);

        let snapshot: BomSnapshot = vec![leg, table].into_iter().collect();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.referencing(leg_id), vec![table_id]);
        assert!(snapshot.referencing(table_id).is_empty());
    }

    #[test]
    fn test_require_missing() {
        let snapshot = BomSnapshot::new();
        let id = BomId::new();

        assert!(matches!(
            snapshot.require(id),
            Err(BomError::MissingReference(Reference::Bom(missing))) if missing == id
        ));
    }
}
