//! 档案持久化
//!
//! 持久化 KV 存储的最小契约：read_profile / write_profile。
//! FileProfileStore 将档案写成单个 JSON 文件；MemoryProfileStore 用于测试与无盘运行。

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::Profile;

/// 持久化档案存储
pub trait ProfileStore: Send + Sync {
    /// 读取档案；从未写入过时返回 None
    fn read_profile(&self) -> anyhow::Result<Option<Profile>>;

    fn write_profile(&self, profile: &Profile) -> anyhow::Result<()>;
}

/// 单文件 JSON 存储
#[derive(Debug)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStore for FileProfileStore {
    fn read_profile(&self) -> anyhow::Result<Option<Profile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    /// 父目录不存在时自动创建
    fn write_profile(&self, profile: &Profile) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(profile)?)?;
        Ok(())
    }
}

/// 进程内存储
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    slot: Mutex<Option<Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self {
            slot: Mutex::new(Some(profile)),
        }
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read_profile(&self) -> anyhow::Result<Option<Profile>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("profile store poisoned"))?;
        Ok(slot.clone())
    }

    fn write_profile(&self, profile: &Profile) -> anyhow::Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("profile store poisoned"))?;
        *slot = Some(profile.clone());
        Ok(())
    }
}
