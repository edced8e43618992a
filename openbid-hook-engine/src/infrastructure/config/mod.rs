//! # Hook配置管理
//!
//! 提供Hook引擎配置的加载、合并与验证能力
//!
//! 支持两种配置方式：
//! 1. **配置文件**：单个 TOML 或 JSON 文件
//! 2. **配置目录**：目录下全部 `*.toml`/`*.json` 文件按路径顺序合并

pub mod loader;

pub use loader::{
    ConfigLoader, ConfigLoaderItem, ConfigMerger, ConfigValidator, DirectoryConfigLoader,
    FileConfigLoader,
};
