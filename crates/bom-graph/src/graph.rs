//! 組成圖

use bom_core::{BomError, BomId, BomSnapshot, Result};
use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;
use std::collections::HashSet;

/// 組成圖（`A → B` 表示 A 的某個明細引用子 BOM B）
///
/// 同一對 BOM 之間最多一條邊，重複引用在圖上只算一次。
#[derive(Debug, Clone, Default)]
pub struct CompositionGraph {
    graph: DiGraphMap<BomId, ()>,
}

impl CompositionGraph {
    /// 創建空圖
    pub fn new() -> Self {
        Self::default()
    }

    /// 從快照建立組成圖
    pub fn from_snapshot(snapshot: &BomSnapshot) -> Self {
        let mut graph = Self::new();
        for bom in snapshot.iter() {
            graph.set_children(bom.id, bom.sub_bom_ids());
        }
        graph
    }

    /// 取代某個 BOM 的全部出邊
    pub fn set_children(&mut self, parent: BomId, children: impl IntoIterator<Item = BomId>) {
        for child in self.children(parent) {
            self.graph.remove_edge(parent, child);
        }

        self.graph.add_node(parent);
        for child in children {
            self.graph.add_edge(parent, child, ());
        }
    }

    /// 加入單一邊
    pub fn add_edge(&mut self, parent: BomId, child: BomId) {
        self.graph.add_edge(parent, child, ());
    }

    /// 移除某個 BOM 的所有出邊與入邊
    pub fn remove_node(&mut self, id: BomId) {
        self.graph.remove_node(id);
    }

    /// 直接子 BOM（依加入順序）
    pub fn children(&self, id: BomId) -> Vec<BomId> {
        self.graph.neighbors_directed(id, Direction::Outgoing).collect()
    }

    /// 直接引用 `id` 的父 BOM
    pub fn parents(&self, id: BomId) -> Vec<BomId> {
        self.graph.neighbors_directed(id, Direction::Incoming).collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// `from` 是否可沿子 BOM 邊到達 `target`（含 `from == target`）
    pub fn reaches(&self, from: BomId, target: BomId) -> bool {
        if !self.graph.contains_node(from) {
            return from == target;
        }
        has_path_connecting(&self.graph, from, target, None)
    }

    /// 將 `candidate` 加為 `parent` 的子 BOM 是否會形成循環
    pub fn would_create_cycle(&self, parent: BomId, candidate: BomId) -> bool {
        self.reaches(candidate, parent)
    }

    /// 所有祖先（直接或間接引用 `id` 的 BOM），不含自身
    pub fn ancestors(&self, id: BomId) -> HashSet<BomId> {
        let mut ancestors = HashSet::new();
        if !self.graph.contains_node(id) {
            return ancestors;
        }

        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, id);
        while let Some(ancestor) = bfs.next(reversed) {
            if ancestor != id {
                ancestors.insert(ancestor);
            }
        }
        ancestors
    }

    /// 以擬議的明細取代 `bom_id` 的出邊後，驗證組成圖仍無循環
    ///
    /// 只有 `bom_id` 的出邊改變，因此新循環必經過 `bom_id`，
    /// 逐一檢查新子 BOM 是否能回到 `bom_id` 即可。
    pub fn validate_children(
        &self,
        bom_id: BomId,
        proposed: impl IntoIterator<Item = BomId>,
    ) -> Result<()> {
        let proposed: Vec<BomId> = proposed.into_iter().collect();
        let mut graph = self.clone();
        graph.set_children(bom_id, proposed.iter().copied());

        for sub_bom_id in proposed {
            if graph.would_create_cycle(bom_id, sub_bom_id) {
                tracing::warn!("拒絕寫入：{} → {} 會形成循環", bom_id, sub_bom_id);
                return Err(BomError::CycleDetected { bom_id, sub_bom_id });
            }
        }

        Ok(())
    }

    /// 檢查整張圖，返回找到的第一個循環路徑（首尾相同）
    pub fn find_cycle(&self) -> Option<Vec<BomId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| {
                component.len() > 1 || self.graph.contains_edge(component[0], component[0])
            })
            .map(|component| self.cycle_within(&component))
    }

    /// 在強連通分量內沿邊前進，直到回到走過的節點
    fn cycle_within(&self, component: &[BomId]) -> Vec<BomId> {
        let members: HashSet<BomId> = component.iter().copied().collect();
        let mut path: Vec<BomId> = Vec::new();
        let mut current = component.iter().copied().min().unwrap_or(component[0]);

        loop {
            if let Some(start) = path.iter().position(|id| *id == current) {
                let mut cycle = path.split_off(start);
                cycle.push(current);
                return cycle;
            }
            path.push(current);

            // 強連通分量中每個節點都至少有一條留在分量內的出邊
            match self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .find(|next| members.contains(next))
            {
                Some(next) => current = next,
                None => {
                    path.push(path[0]);
                    return path;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bom_core::{Bom, BomItem, ProductId};
    use rust_decimal::Decimal;

    fn bom_with_subs(subs: &[BomId]) -> Bom {
        let items = subs
            .iter()
            .map(|id| BomItem::sub_bom(*id, Decimal::ONE).unwrap())
            .collect();
        Bom::new(ProductId::new("P"), "v1").with_items(items)
    }

    /// A → B → C
    fn chain() -> (CompositionGraph, BomId, BomId, BomId) {
        let (a, b, c) = (BomId::new(), BomId::new(), BomId::new());
        let mut graph = CompositionGraph::new();
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        (graph, a, b, c)
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let graph = CompositionGraph::new();
        let a = BomId::new();
        assert!(graph.would_create_cycle(a, a));
    }

    #[test]
    fn test_transitive_cycle() {
        let (graph, a, b, c) = chain();

        assert!(graph.would_create_cycle(c, a));
        assert!(graph.would_create_cycle(b, a));
        assert!(!graph.would_create_cycle(a, c));
        assert!(!graph.would_create_cycle(c, BomId::new()));
    }

    #[test]
    fn test_ancestors() {
        let (mut graph, a, b, c) = chain();
        let d = BomId::new();
        graph.add_edge(d, c);

        let ancestors = graph.ancestors(c);
        assert_eq!(ancestors, HashSet::from([a, b, d]));
        assert!(graph.ancestors(a).is_empty());
    }

    #[test]
    fn test_from_snapshot_ignores_parent_bom_id() {
        let base = bom_with_subs(&[]);
        let variant = bom_with_subs(&[]).with_parent_bom(base.id);
        let (base_id, variant_id) = (base.id, variant.id);
        let snapshot: BomSnapshot = vec![base, variant].into_iter().collect();

        let graph = CompositionGraph::from_snapshot(&snapshot);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.would_create_cycle(base_id, variant_id));
    }

    #[test]
    fn test_duplicate_edges_collapsed() {
        let child = BomId::new();
        let parent = bom_with_subs(&[child, child]);
        let parent_id = parent.id;
        let graph = CompositionGraph::from_snapshot(&BomSnapshot::new().with_bom(parent));

        assert_eq!(graph.children(parent_id), vec![child]);
        assert_eq!(graph.parents(child), vec![parent_id]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_validate_children_against_proposed_graph() {
        let (graph, a, b, c) = chain();

        // C 改為引用 A：A → B → C → A
        let err = graph.validate_children(c, [a]).unwrap_err();
        assert!(matches!(
            err,
            BomError::CycleDetected { bom_id, sub_bom_id } if bom_id == c && sub_bom_id == a
        ));

        // B 移除對 C 的引用後，C 可以引用 B 以外的節點
        assert!(graph.validate_children(b, std::iter::empty()).is_ok());
        assert!(graph.validate_children(a, [c]).is_ok());
    }

    #[test]
    fn test_validate_children_replaces_old_edges() {
        let (graph, a, b, _c) = chain();

        // 擬議圖中 A 不再引用 B，因此 B → A 不構成循環
        let mut proposed = graph.clone();
        proposed.set_children(a, std::iter::empty());
        assert!(proposed.validate_children(b, [a]).is_ok());

        // 原圖中則會
        assert!(graph.validate_children(b, [a]).is_err());
    }

    #[test]
    fn test_remove_node() {
        let (mut graph, a, b, c) = chain();
        graph.remove_node(b);

        assert!(graph.children(a).is_empty());
        assert!(graph.parents(c).is_empty());
        assert!(!graph.reaches(a, c));
    }

    #[test]
    fn test_find_cycle() {
        let (mut graph, a, b, c) = chain();
        assert!(graph.find_cycle().is_none());

        graph.add_edge(c, a);
        let path = graph.find_cycle().unwrap();
        assert_eq!(path.first(), path.last());
        assert_eq!(path.len(), 4);
        assert!(path.contains(&a) && path.contains(&b) && path.contains(&c));
    }

    #[test]
    fn test_find_self_loop() {
        let (mut graph, _a, b, _c) = chain();
        graph.add_edge(b, b);

        assert_eq!(graph.find_cycle(), Some(vec![b, b]));
    }

    #[test]
    fn test_set_children_replaces_edges() {
        let (mut graph, a, b, c) = chain();
        graph.set_children(a, [c, c, b]);

        assert_eq!(graph.children(a), vec![c, b]);
        assert_eq!(graph.parents(c), vec![b, a]);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_reaches_terminates_on_malformed_graph() {
        let (mut graph, a, _b, c) = chain();
        graph.add_edge(c, a);

        assert!(!graph.reaches(a, BomId::new()));
    }
}
