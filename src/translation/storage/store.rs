//! 键值存储抽象
//!
//! 缓存只依赖 `KeyValueStore` / `StoreProvider` 两个接口，具体存储引擎可替换。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use crate::translation::error::TranslationResult;

/// 按命名空间打开的异步键值存储
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> TranslationResult<()>;

    async fn close(&self) -> TranslationResult<()>;
}

/// 存储提供者，每个语言对对应一个命名空间
#[async_trait(?Send)]
pub trait StoreProvider {
    async fn open(&self, namespace: &str) -> TranslationResult<Box<dyn KeyValueStore>>;
}

/// 空存储：总是未命中，写入直接丢弃
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

#[async_trait(?Send)]
impl KeyValueStore for NullStore {
    async fn get(&self, _key: &str) -> TranslationResult<Option<String>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str) -> TranslationResult<()> {
        Ok(())
    }

    async fn close(&self) -> TranslationResult<()> {
        Ok(())
    }
}

/// 不做持久化的提供者
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStoreProvider;

#[async_trait(?Send)]
impl StoreProvider for NullStoreProvider {
    async fn open(&self, _namespace: &str) -> TranslationResult<Box<dyn KeyValueStore>> {
        Ok(Box::new(NullStore))
    }
}

type Table = Rc<RefCell<HashMap<String, String>>>;

/// 进程内存储，同一个提供者打开的相同命名空间共享数据
#[derive(Debug, Default, Clone)]
pub struct MemoryStoreProvider {
    namespaces: Rc<RefCell<HashMap<String, Table>>>,
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 命名空间内的条目数
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .borrow()
            .get(namespace)
            .map(|table| table.borrow().len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// 直接读取某个键
    pub fn value(&self, namespace: &str, key: &str) -> Option<String> {
        self.namespaces
            .borrow()
            .get(namespace)
            .and_then(|table| table.borrow().get(key).cloned())
    }

    /// 已打开过的命名空间
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait(?Send)]
impl StoreProvider for MemoryStoreProvider {
    async fn open(&self, namespace: &str) -> TranslationResult<Box<dyn KeyValueStore>> {
        let table = self
            .namespaces
            .borrow_mut()
            .entry(namespace.to_string())
            .or_default()
            .clone();
        Ok(Box::new(MemoryStore { table }))
    }
}

/// 内存存储
pub struct MemoryStore {
    table: Table,
}

#[async_trait(?Send)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        Ok(self.table.borrow().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> TranslationResult<()> {
        self.table
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn close(&self) -> TranslationResult<()> {
        Ok(())
    }
}
