//! 工作台服务
//!
//! 持有设置存储并串行化所有写操作：编译期间一直持有锁，
//! 处理句子时只在取快照的瞬间持有锁。

use crate::core::compiler::{ArtifactCompiler, CompileReport};
use crate::core::error::WorkbenchError;
use crate::core::lookup::{HttpLexicalDatabase, LexicalDatabase};
use crate::core::models::{AppConfig, CompileRequest, ParseResult, SettingsExport};
use crate::core::processor::SentenceProcessor;
use crate::core::settings::{SettingsSnapshot, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// 语法开发工作台
pub struct Workbench {
    store: Mutex<SettingsStore>,
    processor: SentenceProcessor,
}

impl Workbench {
    pub fn new() -> Self {
        Self::with_processor(SentenceProcessor::new())
    }

    pub fn with_processor(processor: SentenceProcessor) -> Self {
        Self {
            store: Mutex::new(SettingsStore::new()),
            processor,
        }
    }

    /// 按应用配置创建：配置了服务地址时启用外部词典
    pub fn from_config(config: &AppConfig) -> Self {
        let mut processor = SentenceProcessor::new()
            .with_lookup_timeout(config.lookup.timeout_ms.map(Duration::from_millis));
        if let Some(endpoint) = &config.lookup.endpoint {
            let database = HttpLexicalDatabase::new(endpoint.clone());
            tracing::info!("启用外部词典: {}", database.endpoint());
            let database: Arc<dyn LexicalDatabase> = Arc::new(database);
            processor = processor.with_lookup(database);
        }
        Self::with_processor(processor)
    }

    /// 编译（持有锁直到所有分支结束）
    pub async fn compile(&self, request: CompileRequest) -> Result<CompileReport, WorkbenchError> {
        let mut store = self.store.lock().await;
        ArtifactCompiler::compile(&mut store, request).await
    }

    /// 处理一个句子
    pub async fn process(&self, sentence: &str) -> Result<ParseResult, WorkbenchError> {
        let snapshot = self.snapshot().await;
        self.processor.process(sentence, &snapshot).await
    }

    pub async fn snapshot(&self) -> SettingsSnapshot {
        self.store.lock().await.snapshot()
    }

    pub async fn is_ready(&self) -> bool {
        self.store.lock().await.ready()
    }

    pub async fn export_settings(&self) -> SettingsExport {
        self.store.lock().await.export()
    }

    /// 导入设置：在新的存储上重新编译全部源文本，全部成功才整体替换
    ///
    /// 任一产物编译失败时保留当前存储，只返回报告。
    pub async fn import_settings(&self, export: &SettingsExport) -> Result<CompileReport, WorkbenchError> {
        let mut store = self.store.lock().await;
        let mut fresh = SettingsStore::new();
        let report = ArtifactCompiler::compile(&mut fresh, CompileRequest::from_export(export)).await?;
        if report.has_errors() {
            for (kind, error) in report.errors() {
                tracing::warn!("导入的{}编译失败: {}", kind, error);
            }
            tracing::warn!("导入失败, 保留当前设置");
            return Ok(report);
        }
        *store = fresh;
        tracing::info!("已导入设置 (导出于 {}), ready = {}", export.exported_at, report.ready);
        Ok(report)
    }

    /// 清空所有设置和产物
    pub async fn reset(&self) {
        *self.store.lock().await = SettingsStore::new();
        tracing::info!("工作台已重置");
    }
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ArtifactKind;

    fn request() -> CompileRequest {
        CompileRequest::new()
            .type_lattice("S\nNP\nVP")
            .lexicon("john: NP\nruns: VP")
            .grammar("S -> NP VP")
    }

    #[tokio::test]
    async fn test_compile_then_process() {
        let workbench = Workbench::new();
        assert!(!workbench.is_ready().await);
        let report = workbench.compile(request()).await.unwrap();
        assert!(report.ready);
        let result = workbench.process("John runs").await.unwrap();
        assert!(result.in_language);
    }

    #[tokio::test]
    async fn test_reset_clears_artifacts() {
        let workbench = Workbench::new();
        workbench.compile(request()).await.unwrap();
        workbench.reset().await;
        let err = workbench.process("John runs").await.unwrap_err();
        assert!(matches!(err, WorkbenchError::NotConfigured { ref missing } if missing.len() == 3));
    }

    #[tokio::test]
    async fn test_import_replaces_store() {
        let source = Workbench::new();
        source.compile(request()).await.unwrap();
        let export = source.export_settings().await;

        let target = Workbench::new();
        target.compile(CompileRequest::new().type_lattice("X")).await.unwrap();
        let report = target.import_settings(&export).await.unwrap();
        assert!(report.ready);
        assert_eq!(target.export_settings().await.sources, export.sources);
        assert!(target.process("john runs").await.unwrap().in_language);
    }

    #[tokio::test]
    async fn test_failed_import_keeps_current_store() {
        let workbench = Workbench::new();
        workbench.compile(request()).await.unwrap();
        let before = workbench.export_settings().await;

        let mut broken = before.clone();
        broken.sources.type_lattice = "A < Missing".to_string();
        let report = workbench.import_settings(&broken).await.unwrap();
        assert!(report.type_lattice.is_failed());
        assert!(!report.ready);

        assert!(workbench.is_ready().await);
        assert_eq!(workbench.export_settings().await.sources, before.sources);
        assert!(workbench.process("john runs").await.unwrap().in_language);
    }

    #[tokio::test]
    async fn test_from_config_enables_lookup() {
        let mut config = AppConfig::default();
        let workbench = Workbench::from_config(&config);
        assert!(!workbench.processor.has_lookup());

        config.lookup.endpoint = Some("http://127.0.0.1:9/lookup".to_string());
        let workbench = Workbench::from_config(&config);
        assert!(workbench.processor.has_lookup());
        let err = workbench.process("x").await.unwrap_err();
        assert!(matches!(err, WorkbenchError::NotConfigured { ref missing } if missing.contains(&ArtifactKind::Grammar)));
    }
}
