//! # Hook引擎领域层
//!
//! 配置模型与执行统计模型

pub mod models;
