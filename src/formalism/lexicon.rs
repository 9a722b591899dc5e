//! 词典
//!
//! 两种格式：
//! - 特征结构词典：`word: Type[feat=val] | Type2`，依赖类型格
//! - 简单词典：`word TAG1 TAG2`，每个词一组类别标签

use super::feature::FeatureStructure;
use super::lattice::TypeLattice;
use super::{fingerprint, source_lines, SourceError};
use std::collections::HashMap;

/// 特征结构词典
#[derive(Debug, Clone)]
pub struct FeatureLexicon {
    entries: HashMap<String, Vec<FeatureStructure>>,
    fingerprint: String,
}

impl FeatureLexicon {
    /// 按类型格编译词典
    pub fn compile(source: &str, lattice: &TypeLattice) -> Result<Self, SourceError> {
        let mut entries: HashMap<String, Vec<FeatureStructure>> = HashMap::new();

        for (line_no, line) in source_lines(source) {
            let (word, readings) = line
                .split_once(':')
                .ok_or_else(|| SourceError::new(line_no, "缺少 ':'"))?;
            let word = word.trim();
            if word.is_empty() {
                return Err(SourceError::new(line_no, "词条为空"));
            }

            let slot = entries.entry(word.to_lowercase()).or_default();
            for reading in readings.split('|') {
                let fs = FeatureStructure::parse(reading.trim())
                    .map_err(|e| SourceError::new(line_no, e))?;
                fs.validate(lattice).map_err(|e| SourceError::new(line_no, e))?;
                if !slot.contains(&fs) {
                    slot.push(fs);
                }
            }
        }

        Ok(Self {
            entries,
            fingerprint: fingerprint(&[lattice.fingerprint(), source]),
        })
    }

    /// 查词（大小写不敏感），未收录返回空切片
    pub fn lookup(&self, word: &str) -> &[FeatureStructure] {
        self.entries
            .get(&word.to_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// 简单词典（类别标签列表）
#[derive(Debug, Clone)]
pub struct SimpleLexicon {
    entries: HashMap<String, Vec<String>>,
    fingerprint: String,
}

impl SimpleLexicon {
    pub fn parse(source: &str) -> Result<Self, SourceError> {
        let mut entries: HashMap<String, Vec<String>> = HashMap::new();

        for (line_no, line) in source_lines(source) {
            let mut parts = line.split_whitespace();
            let word = parts.next().unwrap_or_default();
            let tags: Vec<String> = parts.map(|t| t.to_string()).collect();
            if tags.is_empty() {
                return Err(SourceError::new(line_no, format!("词 '{}' 没有类别", word)));
            }
            let slot = entries.entry(word.to_string()).or_default();
            for tag in tags {
                if !slot.contains(&tag) {
                    slot.push(tag);
                }
            }
        }

        Ok(Self {
            entries,
            fingerprint: fingerprint(&[source]),
        })
    }

    /// 先按原样查，再按小写查
    pub fn lookup(&self, word: &str) -> &[String] {
        self.entries
            .get(word)
            .or_else(|| self.entries.get(&word.to_lowercase()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
