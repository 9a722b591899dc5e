//! 类型格
//!
//! 源文本每行一个声明：
//! - `Type`
//! - `Sub < Super1, Super2`
//! - `Type : feat1 feat2`（声明该类型上合适的特征）
//!
//! 所有类型都隐式地位于顶类型 `*top*` 之下。

use super::{fingerprint, is_valid_symbol, source_lines, SourceError};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// 隐式顶类型
pub const TOP: &str = "*top*";

/// 编译后的类型格
#[derive(Debug, Clone)]
pub struct TypeLattice {
    /// 直接父类型
    parents: HashMap<String, Vec<String>>,
    /// 在该类型上声明的特征（不含继承）
    features: HashMap<String, BTreeSet<String>>,
    /// 声明顺序
    order: Vec<String>,
    fingerprint: String,
}

impl TypeLattice {
    /// 编译类型格源文本
    pub fn compile(source: &str) -> Result<Self, SourceError> {
        let mut parents: HashMap<String, Vec<String>> = HashMap::new();
        let mut features: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut order = Vec::new();
        // 父类型可以在后面才声明，先收集再校验
        let mut pending: Vec<(usize, String, String)> = Vec::new();

        for (line_no, line) in source_lines(source) {
            let (decl, feats) = match line.split_once(':') {
                Some((decl, feats)) => (decl.trim(), Some(feats)),
                None => (line, None),
            };
            let (name, supers) = match decl.split_once('<') {
                Some((name, supers)) => (name.trim(), Some(supers)),
                None => (decl.trim(), None),
            };

            if !is_valid_symbol(name) {
                return Err(SourceError::new(line_no, format!("非法类型名: '{}'", name)));
            }
            if !parents.contains_key(name) {
                parents.insert(name.to_string(), Vec::new());
                order.push(name.to_string());
            }

            if let Some(supers) = supers {
                let names: Vec<&str> = supers
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .collect();
                if names.is_empty() {
                    return Err(SourceError::new(line_no, format!("类型 '{}' 缺少父类型", name)));
                }
                for sup in names {
                    if sup == name {
                        return Err(SourceError::new(line_no, format!("类型 '{}' 不能是自身的父类型", name)));
                    }
                    pending.push((line_no, name.to_string(), sup.to_string()));
                }
            }

            if let Some(feats) = feats {
                let entry = features.entry(name.to_string()).or_default();
                for feat in feats.split_whitespace() {
                    if !is_valid_symbol(feat) {
                        return Err(SourceError::new(line_no, format!("非法特征名: '{}'", feat)));
                    }
                    entry.insert(feat.to_string());
                }
            }
        }

        for (line_no, sub, sup) in pending {
            if sup != TOP && !parents.contains_key(&sup) {
                return Err(SourceError::new(line_no, format!("未声明的父类型: '{}'", sup)));
            }
            let list = parents.entry(sub).or_default();
            if !list.contains(&sup) {
                list.push(sup);
            }
        }

        let lattice = Self {
            parents,
            features,
            order,
            fingerprint: fingerprint(&[source]),
        };
        lattice.check_acyclic()?;
        Ok(lattice)
    }

    /// 检查继承关系中没有环
    fn check_acyclic(&self) -> Result<(), SourceError> {
        // 0 = 未访问, 1 = 访问中, 2 = 完成
        let mut state: HashMap<&str, u8> = HashMap::new();

        fn visit<'a>(
            lattice: &'a TypeLattice,
            ty: &'a str,
            state: &mut HashMap<&'a str, u8>,
        ) -> Result<(), SourceError> {
            match state.get(ty) {
                Some(1) => {
                    return Err(SourceError::new(0, format!("类型继承存在环: '{}'", ty)));
                }
                Some(2) => return Ok(()),
                _ => {}
            }
            state.insert(ty, 1);
            for parent in lattice.direct_parents(ty) {
                visit(lattice, parent, state)?;
            }
            state.insert(ty, 2);
            Ok(())
        }

        for ty in &self.order {
            visit(self, ty, &mut state)?;
        }
        Ok(())
    }

    fn direct_parents(&self, ty: &str) -> impl Iterator<Item = &str> {
        self.parents
            .get(ty)
            .into_iter()
            .flatten()
            .map(|s| s.as_str())
            .filter(|s| *s != TOP)
    }

    /// 是否声明了该类型（顶类型总是存在）
    pub fn contains(&self, ty: &str) -> bool {
        ty == TOP || self.parents.contains_key(ty)
    }

    /// 按声明顺序列出所有类型
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// 类型及其所有祖先（含自身，不含顶类型）
    fn ancestors<'a>(&'a self, ty: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ty]);
        while let Some(current) = queue.pop_front() {
            if seen.insert(current) {
                queue.extend(self.direct_parents(current));
            }
        }
        seen
    }

    /// `general` 是否包含 `specific`（general ⊒ specific）
    pub fn subsumes(&self, general: &str, specific: &str) -> bool {
        if general == specific || general == TOP {
            return true;
        }
        if !self.contains(general) || !self.contains(specific) {
            return false;
        }
        self.ancestors(specific).contains(general)
    }

    /// 两个类型的合一（最大下界）；不存在或不唯一时返回 None
    pub fn unify(&self, a: &str, b: &str) -> Option<String> {
        if self.subsumes(a, b) {
            return Some(b.to_string());
        }
        if self.subsumes(b, a) {
            return Some(a.to_string());
        }

        let common: Vec<&str> = self
            .types()
            .filter(|t| self.subsumes(a, t) && self.subsumes(b, t))
            .collect();
        let maximal: Vec<&str> = common
            .iter()
            .copied()
            .filter(|t| !common.iter().any(|o| o != t && self.subsumes(o, t)))
            .collect();

        match maximal.as_slice() {
            [single] => Some(single.to_string()),
            _ => None,
        }
    }

    /// 类型上合适的特征（含继承而来的）
    pub fn appropriate_features(&self, ty: &str) -> BTreeSet<&str> {
        self.ancestors(ty)
            .into_iter()
            .filter_map(|t| self.features.get(t))
            .flatten()
            .map(|s| s.as_str())
            .collect()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
