//! 错误类型
//!
//! 四类核心失败：源文本错误、依赖缺失、外部查询失败、未配置。
//! 所有失败都以值的形式返回给调用方，不会 panic。

use crate::formalism::SourceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 工作台中的各类组件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// 类型格
    TypeLattice,
    /// 词典/标注器
    Tagger,
    /// 语法
    Grammar,
    /// 外部词典服务（不是编译产物，但标注时需要）
    LexicalDatabase,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::TypeLattice => write!(f, "类型格"),
            ArtifactKind::Tagger => write!(f, "标注器"),
            ArtifactKind::Grammar => write!(f, "语法"),
            ArtifactKind::LexicalDatabase => write!(f, "外部词典"),
        }
    }
}

/// 工作台错误
#[derive(Debug, Error)]
pub enum WorkbenchError {
    /// 源文本格式错误
    #[error("{artifact}源文本错误: {source}")]
    SourceParse {
        artifact: ArtifactKind,
        #[source]
        source: SourceError,
    },

    /// 依赖的类型格不存在
    #[error("编译{artifact}需要类型格，但类型格尚未编译")]
    DependencyMissing { artifact: ArtifactKind },

    /// 外部词典查询失败或超时
    #[error("查询 '{token}' 失败: {message}")]
    Lookup { token: String, message: String },

    /// 产物不全，拒绝运行流水线
    #[error("工作台未配置完成，缺少: {}", join_kinds(.missing))]
    NotConfigured { missing: Vec<ArtifactKind> },

    /// 未知的策略名称
    #[error("未知的{role}: '{name}'")]
    UnknownStrategy { role: &'static str, name: String },

    /// 正则分词模式非法
    #[error("分词正则非法: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// 文件读取失败
    #[error("读取 {} 失败: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkbenchError {
    pub fn source_parse(artifact: ArtifactKind, source: SourceError) -> Self {
        WorkbenchError::SourceParse { artifact, source }
    }
}

fn join_kinds(kinds: &[ArtifactKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorkbenchError::NotConfigured {
            missing: vec![ArtifactKind::Tagger, ArtifactKind::Grammar],
        };
        assert_eq!(err.to_string(), "工作台未配置完成，缺少: 标注器, 语法");

        let err = WorkbenchError::source_parse(ArtifactKind::Grammar, SourceError::new(3, "缺少 '->'"));
        assert_eq!(err.to_string(), "语法源文本错误: 第3行: 缺少 '->'");
    }
}
