//! 配置文件管理模块

use crate::core::models::{AppConfig, SettingsExport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// 配置管理器
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// 获取默认配置路径
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "grammar-workbench", "GrammarWorkbench")
            .map(|d| d.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// 加载配置，文件不存在时使用默认配置
    pub fn load(&self) -> Result<AppConfig> {
        if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)
                .with_context(|| format!("读取配置文件失败: {}", self.config_path.display()))?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// 保存配置
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        write_json(&self.config_path, config)
    }

    /// 重置为默认配置
    pub fn reset(&self) -> Result<()> {
        self.save(&AppConfig::default())
    }

    /// 读取设置导出文档
    pub fn load_settings(path: &Path) -> Result<SettingsExport> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取设置文件失败: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("设置文件格式错误: {}", path.display()))
    }

    /// 保存设置导出文档
    pub fn save_settings(path: &Path, export: &SettingsExport) -> Result<()> {
        write_json(path, export)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    // 确保目录存在
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
