//! BOM 持久化

use bom_core::{BomSnapshot, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// BOM 儲存庫
///
/// - 讀取：取得一致性快照，計算期間不受寫入影響
/// - 寫入：在工作副本上執行，全部成功才提交；寫入之間串行
pub trait BomRepository: Send + Sync {
    /// 目前已提交的快照
    fn snapshot(&self) -> Arc<BomSnapshot>;

    /// 執行寫入交易；`f` 返回錯誤時不留下任何變更
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BomSnapshot) -> Result<T>;
}

/// 記憶體儲存庫（寫入時複製）
#[derive(Debug, Default)]
pub struct InMemoryBomStore {
    committed: RwLock<Arc<BomSnapshot>>,

    /// 串行化所有寫入交易
    writer: Mutex<()>,
}

impl InMemoryBomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以既有資料初始化（不經驗證，用於載入或遷移）
    pub fn with_snapshot(snapshot: BomSnapshot) -> Self {
        Self {
            committed: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        }
    }
}

impl BomRepository for InMemoryBomStore {
    fn snapshot(&self) -> Arc<BomSnapshot> {
        self.committed.read().clone()
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BomSnapshot) -> Result<T>,
    {
        let _writer = self.writer.lock();

        let mut working = (**self.committed.read()).clone();
        let output = f(&mut working)?;
        *self.committed.write() = Arc::new(working);

        Ok(output)
    }
}

impl<R: BomRepository> BomRepository for Arc<R> {
    fn snapshot(&self) -> Arc<BomSnapshot> {
        (**self).snapshot()
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BomSnapshot) -> Result<T>,
    {
        (**self).transaction(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bom_core::{Bom, BomError, ProductId};
    use rust_decimal::Decimal;

    #[test]
    fn test_commit() {
        let store = InMemoryBomStore::new();
        let bom = Bom::new(ProductId::new("P-1"), "v1");
        let id = bom.id;

        store
            .transaction(|snapshot| {
                snapshot.insert(bom);
                Ok(())
            })
            .unwrap();

        assert!(store.snapshot().contains(id));
    }

    #[test]
    fn test_failed_transaction_leaves_no_trace() {
        let store = InMemoryBomStore::new();

        let result: Result<()> = store.transaction(|snapshot| {
            snapshot.insert(Bom::new(ProductId::new("P-1"), "v1"));
            Err(BomError::InvalidQuantity(Decimal::ZERO))
        });

        assert!(result.is_err());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_isolated_from_later_writes() {
        let store = InMemoryBomStore::new();
        let before = store.snapshot();

        store
            .transaction(|snapshot| {
                snapshot.insert(Bom::new(ProductId::new("P-1"), "v1"));
                Ok(())
            })
            .unwrap();

        assert!(before.is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_concurrent_writers_are_serialized() {
        let store = Arc::new(InMemoryBomStore::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .transaction(|snapshot| {
                            snapshot.insert(Bom::new(ProductId::new(format!("P-{i}")), "v1"));
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.snapshot().len(), 8);
    }
}
