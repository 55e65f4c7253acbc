//! 產品目錄查詢介面

use std::collections::HashMap;

use crate::{BomError, Product, ProductId, Reference, Result};

/// 產品目錄（外部協作者）
///
/// 引擎只透過此介面讀取原物料的名稱、料號、單位與單位成本。
pub trait ProductCatalog: Send + Sync {
    /// 查詢產品
    fn get_product(&self, id: &ProductId) -> Option<Product>;

    /// 查詢產品，不存在時返回 `MissingReference`
    fn require_product(&self, id: &ProductId) -> Result<Product> {
        self.get_product(id)
            .ok_or_else(|| BomError::MissingReference(Reference::Product(id.clone())))
    }
}

impl<T: ProductCatalog + ?Sized> ProductCatalog for &T {
    fn get_product(&self, id: &ProductId) -> Option<Product> {
        (**self).get_product(id)
    }
}

impl<T: ProductCatalog + ?Sized> ProductCatalog for std::sync::Arc<T> {
    fn get_product(&self, id: &ProductId) -> Option<Product> {
        (**self).get_product(id)
    }
}

/// 記憶體產品目錄
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: HashMap<ProductId, Product>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入產品
    pub fn with_product(mut self, product: Product) -> Self {
        self.insert(product);
        self
    }

    /// 加入或取代產品
    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for product in iter {
            catalog.insert(product);
        }
        catalog
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn get_product(&self, id: &ProductId) -> Option<Product> {
        self.products.get(id).cloned()
    }
}
