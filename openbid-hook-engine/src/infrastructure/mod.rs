//! # Hook引擎基础设施层
//!
//! 提供Hook配置加载与监控统计实现

pub mod config;
pub mod monitoring;
