//! 特征结构
//!
//! 文本形式：`Type` 或 `Type[feat=Value, feat2=Type2[a=b]]`

use super::lattice::{TypeLattice, TOP};
use super::is_valid_symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 带类型的特征结构
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureStructure {
    /// 类型名
    #[serde(rename = "type")]
    ty: String,
    /// 特征 -> 值
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    features: BTreeMap<String, FeatureStructure>,
}

impl FeatureStructure {
    /// 创建原子特征结构（无特征）
    pub fn atomic(ty: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            features: BTreeMap::new(),
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: FeatureStructure) -> Self {
        self.features.insert(name.into(), value);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.ty
    }

    pub fn features(&self) -> &BTreeMap<String, FeatureStructure> {
        &self.features
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureStructure> {
        self.features.get(feature)
    }

    /// 解析文本形式
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut parser = FsParser {
            chars: text.char_indices().peekable(),
            text,
        };
        let fs = parser.parse_structure()?;
        parser.skip_ws();
        if let Some((pos, c)) = parser.chars.next() {
            return Err(format!("位置{}处有多余字符 '{}'", pos, c));
        }
        Ok(fs)
    }

    /// 检查所有类型都在类型格中声明过
    pub fn validate(&self, lattice: &TypeLattice) -> Result<(), String> {
        if !lattice.contains(&self.ty) {
            return Err(format!("未声明的类型: '{}'", self.ty));
        }
        self.features.values().try_for_each(|v| v.validate(lattice))
    }

    /// 合一：类型取最大下界，特征递归合并
    pub fn unify(&self, other: &FeatureStructure, lattice: &TypeLattice) -> Option<FeatureStructure> {
        let ty = lattice.unify(&self.ty, &other.ty)?;
        let mut features = self.features.clone();
        for (name, value) in &other.features {
            let merged = match features.get(name) {
                Some(existing) => existing.unify(value, lattice)?,
                None => value.clone(),
            };
            features.insert(name.clone(), merged);
        }
        Some(FeatureStructure { ty, features })
    }

    /// 去掉子节点特征 `dtrN` 后剩下的特征，类型为顶类型
    pub fn shared_features(&self) -> FeatureStructure {
        let features = self
            .features
            .iter()
            .filter(|(name, _)| !is_daughter_feature(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        FeatureStructure {
            ty: TOP.to_string(),
            features,
        }
    }

    /// 只保留类型格声明为合适的特征（递归）
    pub fn restrict_to_appropriate(&self, lattice: &TypeLattice) -> FeatureStructure {
        let allowed = lattice.appropriate_features(&self.ty);
        let features = self
            .features
            .iter()
            .filter(|(name, _)| allowed.contains(name.as_str()))
            .map(|(name, value)| (name.clone(), value.restrict_to_appropriate(lattice)))
            .collect();
        FeatureStructure {
            ty: self.ty.clone(),
            features,
        }
    }

    /// 多行缩进形式
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        out.push_str(&self.ty);
        if self.features.is_empty() {
            return;
        }
        out.push_str("[\n");
        for (name, value) in &self.features {
            out.push_str(&"  ".repeat(indent + 1));
            out.push_str(name);
            out.push_str(": ");
            value.write_pretty(out, indent + 1);
            out.push('\n');
        }
        out.push_str(&"  ".repeat(indent));
        out.push(']');
    }
}

impl fmt::Display for FeatureStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ty)?;
        if !self.features.is_empty() {
            let inner: Vec<String> = self
                .features
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", inner.join(", "))?;
        }
        Ok(())
    }
}

fn is_daughter_feature(name: &str) -> bool {
    name.strip_prefix("dtr")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

struct FsParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl<'a> FsParser<'a> {
    fn skip_ws(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn parse_name(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = match self.chars.peek() {
            Some((pos, _)) => *pos,
            None => return Err(format!("'{}' 意外结束", self.text)),
        };
        let mut end = start;
        while let Some((pos, c)) = self.chars.peek().copied() {
            if c.is_whitespace() || matches!(c, '[' | ']' | ',' | '=') {
                break;
            }
            end = pos + c.len_utf8();
            self.chars.next();
        }
        let name = &self.text[start..end];
        if !is_valid_symbol(name) {
            return Err(format!("位置{}处缺少合法名称", start));
        }
        Ok(name.to_string())
    }

    fn parse_structure(&mut self) -> Result<FeatureStructure, String> {
        let mut fs = FeatureStructure::atomic(self.parse_name()?);
        self.skip_ws();
        if !matches!(self.chars.peek(), Some((_, '['))) {
            return Ok(fs);
        }
        self.chars.next();

        loop {
            self.skip_ws();
            if matches!(self.chars.peek(), Some((_, ']'))) {
                self.chars.next();
                return Ok(fs);
            }
            let name = self.parse_name()?;
            self.skip_ws();
            match self.chars.next() {
                Some((_, '=')) => {}
                _ => return Err(format!("特征 '{}' 后缺少 '='", name)),
            }
            let value = self.parse_structure()?;
            if fs.features.insert(name.clone(), value).is_some() {
                return Err(format!("特征 '{}' 重复", name));
            }
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, ']')) => return Ok(fs),
                _ => return Err(format!("'{}' 中缺少 ',' 或 ']'", self.text)),
            }
        }
    }
}
