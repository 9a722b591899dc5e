//! 上下文无关语法
//!
//! 每行一条规则 `LHS -> RHS1 RHS2 ...`；可选 `start SYMBOL` 指定开始符号，
//! 否则取第一条规则的左部。所有符号都必须是类型格中的类型。

use super::lattice::TypeLattice;
use super::{fingerprint, is_valid_symbol, source_lines, SourceError};
use serde::Serialize;
use std::fmt;

/// 产生式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub lhs: String,
    pub rhs: Vec<String>,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs.join(" "))
    }
}

/// 编译后的语法
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
    start: String,
    fingerprint: String,
}

impl Grammar {
    pub fn compile(source: &str, lattice: &TypeLattice) -> Result<Self, SourceError> {
        let mut rules = Vec::new();
        let mut start: Option<String> = None;

        let check = |line_no: usize, symbol: &str| -> Result<(), SourceError> {
            if !is_valid_symbol(symbol) {
                return Err(SourceError::new(line_no, format!("非法符号: '{}'", symbol)));
            }
            if !lattice.contains(symbol) {
                return Err(SourceError::new(line_no, format!("符号 '{}' 不在类型格中", symbol)));
            }
            Ok(())
        };

        for (line_no, line) in source_lines(source) {
            if let Some(symbol) = line.strip_prefix("start ") {
                let symbol = symbol.trim();
                check(line_no, symbol)?;
                start = Some(symbol.to_string());
                continue;
            }

            let (lhs, rhs) = line
                .split_once("->")
                .ok_or_else(|| SourceError::new(line_no, "缺少 '->'"))?;
            let lhs = lhs.trim();
            check(line_no, lhs)?;
            let rhs: Vec<String> = rhs.split_whitespace().map(|s| s.to_string()).collect();
            if rhs.is_empty() {
                return Err(SourceError::new(line_no, format!("规则 '{}' 右部为空", lhs)));
            }
            for symbol in &rhs {
                check(line_no, symbol)?;
            }
            rules.push(Rule {
                lhs: lhs.to_string(),
                rhs,
            });
        }

        let start = match (start, rules.first()) {
            (Some(start), _) => start,
            (None, Some(first)) => first.lhs.clone(),
            (None, None) => return Err(SourceError::new(0, "语法中没有规则")),
        };

        Ok(Self {
            rules,
            start,
            fingerprint: fingerprint(&[lattice.fingerprint(), source]),
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn start_symbol(&self) -> &str {
        &self.start
    }

    /// 语法中出现过的所有符号（去重，按出现顺序）
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = Vec::new();
        for rule in &self.rules {
            for symbol in std::iter::once(&rule.lhs).chain(rule.rhs.iter()) {
                if !symbols.contains(&symbol.as_str()) {
                    symbols.push(symbol);
                }
            }
        }
        symbols
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> TypeLattice {
        TypeLattice::compile("S\nNP\nVP\nDet\nN\nV").unwrap()
    }

    #[test]
    fn test_compile_grammar() {
        let grammar = Grammar::compile("S -> NP VP\nNP -> Det N\nVP -> V", &lattice()).unwrap();
        assert_eq!(grammar.start_symbol(), "S");
        assert_eq!(grammar.rules().len(), 3);
        assert_eq!(grammar.rules()[1].to_string(), "NP -> Det N");
        assert_eq!(grammar.symbols(), vec!["S", "NP", "VP", "Det", "N", "V"]);
    }

    #[test]
    fn test_start_directive() {
        let grammar = Grammar::compile("NP -> Det N\nstart S\nS -> NP VP", &lattice()).unwrap();
        assert_eq!(grammar.start_symbol(), "S");
    }

    #[test]
    fn test_grammar_errors() {
        assert_eq!(Grammar::compile("S -> NP PP", &lattice()).unwrap_err().line, 1);
        assert!(Grammar::compile("S NP VP", &lattice()).is_err());
        assert!(Grammar::compile("S ->", &lattice()).is_err());
        assert!(Grammar::compile("# nothing", &lattice()).is_err());
    }
}
