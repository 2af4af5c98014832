//! 答案缓存 - 业务能力层
//!
//! 只负责"记住答案"能力：命名空间前缀的键值存储，
//! 可枚举、可单独删除、可按命名空间一次清空。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, CacheError};
use crate::models::question::CacheKey;
use crate::services::identity::CACHE_NAMESPACE;

/// 持久化键值存储
///
/// 存储中可能包含与答案缓存无关的键，[`AnswerCache`] 只操作自己命名空间下的键
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn list_keys(&self) -> Vec<String>;
    fn delete(&self, key: &str) -> AppResult<()>;
    /// 一次性删除所有以 `prefix` 开头的键，返回删除条数
    fn delete_prefixed(&self, prefix: &str) -> AppResult<usize>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 内存存储（测试和一次性运行使用）
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn list_keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn delete_prefixed(&self, prefix: &str) -> AppResult<usize> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok(before - entries.len())
    }
}

/// JSON 文件存储
///
/// 整个映射保存在一个 JSON 文件里，每次修改先写临时文件再重命名
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// 打开（或新建）存储文件
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let path_str = path.display().to_string();

        let entries: BTreeMap<String, String> = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| {
                CacheError::Corrupted {
                    path: path_str.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("缓存文件不存在，将新建: {}", path_str);
                BTreeMap::new()
            }
            Err(source) => {
                return Err(CacheError::ReadFailed {
                    path: path_str,
                    source,
                }
                .into())
            }
        };

        debug!("已加载缓存文件 {} ({} 条)", path_str, entries.len());

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> AppResult<()> {
        let path_str = self.path.display().to_string();
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Other(format!("序列化缓存失败: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .map_err(|e| AppError::cache_write_failed(tmp_path.display().to_string(), e))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| AppError::cache_write_failed(path_str, e))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut entries = lock(&self.entries);
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn list_keys(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }

    fn delete(&self, key: &str) -> AppResult<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn delete_prefixed(&self, prefix: &str) -> AppResult<usize> {
        let mut entries = lock(&self.entries);
        let kept: BTreeMap<String, String> = entries
            .iter()
            .filter(|(k, _)| !k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let removed = entries.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        // 落盘成功后才替换内存中的映射
        self.persist(&kept)?;
        *entries = kept;
        Ok(removed)
    }
}

/// 答案缓存
///
/// 职责：
/// - 以 [`CacheKey`] 读写答案
/// - 只保存成功解码的答案，不保存错误或中间状态
/// - 没有过期，只能通过 `clear_all` 整体失效
#[derive(Clone)]
pub struct AnswerCache {
    store: Arc<dyn KeyValueStore>,
}

impl AnswerCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// 内存缓存
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        self.store.get(key.as_str())
    }

    /// 写入答案；重复写入相同的值是无害的
    pub fn set(&self, key: &CacheKey, answer: &str) -> AppResult<()> {
        self.store.set(key.as_str(), answer)
    }

    /// 命名空间下的所有键
    pub fn list_keys(&self) -> Vec<String> {
        self.store
            .list_keys()
            .into_iter()
            .filter(|k| k.starts_with(CACHE_NAMESPACE))
            .collect()
    }

    pub fn delete(&self, key: &str) -> AppResult<()> {
        self.store.delete(key)
    }

    /// 清空命名空间下的所有答案，返回删除的条数
    pub fn clear_all(&self) -> AppResult<usize> {
        let removed = self.store.delete_prefixed(CACHE_NAMESPACE).map_err(|e| {
            warn!("清空答案缓存失败: {}", e);
            e
        })?;
        info!("🧹 已清空答案缓存: {} 条", removed);
        Ok(removed)
    }
}
