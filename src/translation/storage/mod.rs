//! 存储模块：内容哈希、键值存储抽象与翻译缓存

pub mod cache;
pub mod hasher;
#[cfg(feature = "redb-store")]
pub mod redb_store;
pub mod store;

pub use cache::{cache_namespace, CacheStats, TranslationCache};
pub use hasher::content_hash;
#[cfg(feature = "redb-store")]
pub use redb_store::{default_cache_dir, RedbStore, RedbStoreProvider};
pub use store::{
    KeyValueStore, MemoryStore, MemoryStoreProvider, NullStore, NullStoreProvider, StoreProvider,
};
