//! 可用子 BOM 計算

use bom_core::{Bom, BomId, BomSnapshot};

use crate::CompositionGraph;

/// 計算可安全加入 `exclude` 作為子組件的 BOM
///
/// 排除 `exclude` 自身及其所有祖先（已直接或間接使用 `exclude` 的 BOM）；
/// 未指定 `exclude` 時返回全部 BOM。結果依建立時間排序。
pub fn available_sub_boms(snapshot: &BomSnapshot, exclude: Option<BomId>) -> Vec<&Bom> {
    let Some(exclude) = exclude else {
        return snapshot.sorted();
    };

    let graph = CompositionGraph::from_snapshot(snapshot);
    let ancestors = graph.ancestors(exclude);

    tracing::debug!(
        "BOM {} 的祖先 {} 個，不可作為其子組件",
        exclude,
        ancestors.len()
    );

    snapshot
        .sorted()
        .into_iter()
        .filter(|bom| bom.id != exclude && !ancestors.contains(&bom.id))
        .collect()
}
