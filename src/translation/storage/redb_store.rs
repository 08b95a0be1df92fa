//! 基于 redb 的磁盘缓存
//!
//! 每个命名空间一个数据库文件，单表 `translations`，键为内容哈希，值为译文。

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError};

use super::store::{KeyValueStore, StoreProvider};
use crate::translation::error::{TranslationError, TranslationResult};

const TABLE: TableDefinition<&str, &str> = TableDefinition::new("translations");

/// 默认缓存目录
pub fn default_cache_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "livetrans").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// 在目录中为每个命名空间创建 redb 数据库
#[derive(Debug, Clone)]
pub struct RedbStoreProvider {
    dir: PathBuf,
}

impl RedbStoreProvider {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// 使用平台缓存目录
    pub fn with_default_dir() -> TranslationResult<Self> {
        default_cache_dir()
            .map(Self::new)
            .ok_or_else(|| TranslationError::StoreUnavailable("无法确定缓存目录".to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 命名空间对应的数据库文件路径
    pub fn db_path(&self, namespace: &str) -> PathBuf {
        let file_name: String = namespace
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.redb", file_name))
    }
}

#[async_trait(?Send)]
impl StoreProvider for RedbStoreProvider {
    async fn open(&self, namespace: &str) -> TranslationResult<Box<dyn KeyValueStore>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TranslationError::StoreUnavailable(format!(
                "创建缓存目录失败 {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let path = self.db_path(namespace);
        let db = Database::create(&path).map_err(|e| {
            TranslationError::StoreUnavailable(format!("打开缓存数据库失败 {}: {}", path.display(), e))
        })?;

        tracing::debug!("已打开缓存数据库: {}", path.display());
        Ok(Box::new(RedbStore { db }))
    }
}

/// redb 存储
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    fn read(&self, key: &str) -> Result<Option<String>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(TABLE) {
            Ok(table) => table,
            // 尚未写入过任何数据
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(table.get(key)?.map(|value| value.value().to_string()))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn count(&self) -> Result<u64, redb::Error> {
        let read_txn = self.db.begin_read()?;
        match read_txn.open_table(TABLE) {
            Ok(table) => Ok(table.len()?),
            Err(TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// 表中条目数
    pub fn len(&self) -> TranslationResult<u64> {
        Ok(self.count()?)
    }

    pub fn is_empty(&self) -> TranslationResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait(?Send)]
impl KeyValueStore for RedbStore {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        Ok(self.read(key)?)
    }

    async fn put(&self, key: &str, value: &str) -> TranslationResult<()> {
        Ok(self.write(key, value)?)
    }

    async fn close(&self) -> TranslationResult<()> {
        // 数据库在 drop 时关闭，已提交的事务均已落盘
        Ok(())
    }
}
