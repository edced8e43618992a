//! # Hook配置加载器
//!
//! 提供从配置文件、配置目录加载Hook引擎配置的能力

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::domain::models::HookEngineConfig;

/// 单个执行组允许的最大超时
const MAX_GROUP_TIMEOUT_MS: u64 = 30_000;

/// 配置目录中参与合并的文件扩展名
const CONFIG_EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Hook配置加载器接口
pub trait ConfigLoader: Send + Sync {
    /// 加载Hook引擎配置
    async fn load(&self) -> Result<HookEngineConfig>;
}

/// ConfigLoader 的枚举封装，用于在 Rust 2024 下避免 `dyn` + async trait 带来的
/// `E0038: trait is not dyn compatible` 问题。
#[derive(Debug)]
pub enum ConfigLoaderItem {
    File(FileConfigLoader),
    Directory(DirectoryConfigLoader),
}

impl ConfigLoaderItem {
    /// 根据路径选择加载器：目录使用 `DirectoryConfigLoader`，其余使用 `FileConfigLoader`
    pub fn for_path<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        if path.is_dir() {
            ConfigLoaderItem::Directory(DirectoryConfigLoader::new(path))
        } else {
            ConfigLoaderItem::File(FileConfigLoader::new(path))
        }
    }

    pub async fn load(&self) -> Result<HookEngineConfig> {
        match self {
            ConfigLoaderItem::File(loader) => loader.load().await,
            ConfigLoaderItem::Directory(loader) => loader.load().await,
        }
    }
}

/// Hook配置合并器
///
/// 按顺序合并多个配置：模块开关后者覆盖前者，执行计划按端点、阶段追加执行组，
/// 日志配置取最后一个显式配置。
pub struct ConfigMerger;

impl ConfigMerger {
    pub fn merge(configs: Vec<HookEngineConfig>) -> HookEngineConfig {
        let mut merged = HookEngineConfig::default();

        for config in configs {
            if config.logging.is_some() {
                merged.logging = config.logging;
            }
            merged.hooks.modules.extend(config.hooks.modules);
            merged.hooks.host_execution_plan = merged
                .hooks
                .host_execution_plan
                .merged_with(&config.hooks.host_execution_plan);
        }

        merged
    }
}

/// Hook配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证Hook引擎配置
    pub fn validate(config: &HookEngineConfig) -> Result<()> {
        if config
            .hooks
            .modules
            .keys()
            .any(|module_code| module_code.trim().is_empty())
        {
            anyhow::bail!("Module code cannot be empty");
        }

        let plan = &config.hooks.host_execution_plan;
        plan.validate().context("Invalid host execution plan")?;

        for (endpoint, endpoint_plan) in &plan.endpoints {
            for (stage, stage_plan) in &endpoint_plan.stages {
                if let Some(group) = stage_plan
                    .groups
                    .iter()
                    .find(|group| group.timeout_ms > MAX_GROUP_TIMEOUT_MS)
                {
                    anyhow::bail!(
                        "Group timeout of {endpoint}/{stage} must be at most {MAX_GROUP_TIMEOUT_MS}ms, got {}ms",
                        group.timeout_ms
                    );
                }
                if stage_plan.groups.iter().any(|group| group.is_empty()) {
                    warn!(endpoint = %endpoint, stage = %stage, "Execution group without hooks");
                }
            }
        }

        for module_code in plan.module_codes() {
            if config.hooks.modules.get(&module_code) == Some(&false) {
                debug!(module = %module_code, "Module referenced by host plan is disabled");
            }
        }

        Ok(())
    }
}

/// 配置文件加载器
///
/// 按扩展名解析：`.json` 使用 JSON，其余按 TOML 解析。
#[derive(Debug)]
pub struct FileConfigLoader {
    path: PathBuf,
}

impl FileConfigLoader {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }
}

impl ConfigLoader for FileConfigLoader {
    async fn load(&self) -> Result<HookEngineConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Hook config file not found, using default config");
            return Ok(HookEngineConfig::default());
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read hook config file: {}", self.path.display()))?;

        let config: HookEngineConfig = if self.is_json() {
            serde_json::from_str(&content).with_context(|| {
                format!("Failed to parse hook config file as JSON: {}", self.path.display())
            })?
        } else {
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse hook config file as TOML: {}", self.path.display())
            })?
        };

        debug!(
            path = %self.path.display(),
            endpoints = config.hooks.host_execution_plan.endpoints.len(),
            modules = config.hooks.modules.len(),
            "Loaded hook config from file"
        );

        Ok(config)
    }
}

/// 配置目录加载器
///
/// 按路径顺序加载目录下全部 `*.toml` 与 `*.json` 文件并合并，其余文件忽略。
#[derive(Debug)]
pub struct DirectoryConfigLoader {
    dir: PathBuf,
}

impl DirectoryConfigLoader {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    async fn config_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read hook config directory: {}", self.dir.display()))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to list hook config directory: {}", self.dir.display()))?
        {
            let path = entry.path();
            if path.is_file() && is_config_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_config_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CONFIG_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

impl ConfigLoader for DirectoryConfigLoader {
    async fn load(&self) -> Result<HookEngineConfig> {
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "Hook config directory not found, using default config");
            return Ok(HookEngineConfig::default());
        }

        let files = self.config_files().await?;
        let mut configs = Vec::with_capacity(files.len());
        for path in &files {
            configs.push(FileConfigLoader::new(path).load().await?);
        }

        let merged = ConfigMerger::merge(configs);
        info!(
            dir = %self.dir.display(),
            files = files.len(),
            endpoints = merged.hooks.host_execution_plan.endpoints.len(),
            "Loaded hook config from directory"
        );

        Ok(merged)
    }
}
