//! 分词模块
//!
//! 所有分词器都是同步、确定性的：空输入得到空序列。

use crate::core::error::WorkbenchError;
use regex::Regex;
use std::sync::LazyLock;

static WORD_SPLITTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_']+").unwrap());

static WORD_PUNCT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").unwrap());

/// Treebank 替换规则，按顺序应用
static TREEBANK_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let table: [(&str, &'static str); 11] = [
        // 引号
        (r#"^""#, "`` "),
        (r#"([ (\[{<])""#, "$1 `` "),
        (r"\.\.\.", " ... "),
        (r"([,;:@#$%&?!])", " $1 "),
        // 句末句点
        (r#"([^.])(\.)([\]\)}>"']*)\s*$"#, "$1 $2$3 "),
        (r"([\]\[\(\)\{\}<>])", " $1 "),
        (r"--", " -- "),
        (r#"""#, " '' "),
        (r"([^' ])('[sSmMdD]|') ", "$1 $2 "),
        (r"([^' ])('ll|'LL|'re|'RE|'ve|'VE|n't|N'T) ", "$1 $2 "),
        (r"(?i)\b(can)(not)\b", "$1 $2"),
    ];
    table
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), *replacement))
        .collect()
});

/// 分词器
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// 按非单词字符切分
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        WORD_SPLITTER
            .split(text)
            .map(|t| t.trim_matches('\''))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }
}

/// Penn Treebank 风格分词：拆出标点和英语缩写（can't -> ca n't）
#[derive(Debug, Clone, Copy, Default)]
pub struct TreebankTokenizer;

impl Tokenizer for TreebankTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        // 两端补空格，使缩写规则在句末也能命中
        let mut padded = format!(" {} ", text);
        for (regex, replacement) in TREEBANK_RULES.iter() {
            padded = regex.replace_all(&padded, *replacement).into_owned();
        }
        padded.split_whitespace().map(|t| t.to_string()).collect()
    }
}

/// 按给定正则切分（正则匹配的是分隔符）
pub struct RegexpTokenizer {
    pattern: Regex,
}

impl RegexpTokenizer {
    pub const DEFAULT_PATTERN: &'static str = r"\s+";

    pub fn new(pattern: Option<&str>) -> Result<Self, WorkbenchError> {
        let pattern = pattern
            .filter(|p| !p.is_empty())
            .unwrap_or(Self::DEFAULT_PATTERN);
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Tokenizer for RegexpTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        self.pattern
            .split(text)
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }
}

/// 单词与连续标点分别成词
#[derive(Debug, Clone, Copy, Default)]
pub struct WordPunctTokenizer;

impl Tokenizer for WordPunctTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        WORD_PUNCT
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
