//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PROMPTITRON__*` 覆盖（双下划线表示嵌套，如 `PROMPTITRON__REMOTE__API_BASE_URL=http://...`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub remote: RemoteSection,
    pub health: HealthSection,
    pub defaults: DefaultsSection,
}

/// [app] 段：应用名、状态目录（档案文件所在处）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 未设置时用 ./state
    pub state_dir: Option<PathBuf>,
}

impl AppSection {
    pub fn profile_path(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("state"))
            .join("profile.json")
    }
}

/// [remote] 段：API 服务与任务服务地址、请求超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub api_base_url: String,
    pub task_base_url: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            task_base_url: "http://localhost:5000".to_string(),
            timeout_secs: 120,
        }
    }
}

/// [health] 段：健康探测间隔
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

/// [defaults] 段：表单留空时使用的值
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub question_count: u64,
    pub duration_weeks: u64,
    pub search_results: u64,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            question_count: 3,
            duration_weeks: 12,
            search_results: 5,
        }
    }
}

/// 从 config 目录加载配置，环境变量 PROMPTITRON__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PROMPTITRON__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PROMPTITRON")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
