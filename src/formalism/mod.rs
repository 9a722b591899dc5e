//! 形式化模块 - 类型格、特征结构、词典、语法与线图分析器
//!
//! 对核心模块而言这些都是"外部"编译器：核心只关心编译成功与否以及产物本身，
//! 从不检查产物内部。

pub mod chart;
pub mod feature;
pub mod grammar;
pub mod lattice;
pub mod lexicon;

use sha2::{Digest, Sha256};
use thiserror::Error;

pub use chart::{create_parser, Chart, ChartParser, ItemKind, ParseItem, ParserConfig, ParsingAlgorithm, Terminal};
pub use feature::FeatureStructure;
pub use grammar::{Grammar, Rule};
pub use lattice::TypeLattice;
pub use lexicon::{FeatureLexicon, SimpleLexicon};

/// 源文本解析错误（带行号）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("第{line}行: {message}")]
pub struct SourceError {
    /// 出错行号（从1开始，0表示整体错误）
    pub line: usize,
    /// 错误描述
    pub message: String,
}

impl SourceError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// 计算产物指纹：对参与编译的所有文本做SHA-256
pub fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(&hasher.finalize()[..16])
}

/// 逐行遍历源文本，去掉 `#` 注释和空行，返回 (行号, 内容)
pub(crate) fn source_lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source.lines().enumerate().filter_map(|(idx, raw)| {
        let line = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some((idx + 1, line))
        }
    })
}

/// 类型名/符号名是否合法
pub(crate) fn is_valid_symbol(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$' | '\''))
}
