//! 存储模块 - 配置文件与设置导出文档

pub mod config;

pub use config::ConfigManager;
