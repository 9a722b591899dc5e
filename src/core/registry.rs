//! 策略注册表
//!
//! 把算法名称映射到各角色（分词、词干、标注、分析算法）的具体策略。
//! 纯查表，无状态；名称在配置阶段校验。

use crate::core::error::WorkbenchError;
use crate::core::models::{
    StemmerChoice, StemmerSettings, TaggerChoice, TokenizerChoice, TokenizerSettings,
};
use crate::core::stemmer::{LancasterStemmer, PorterStemmer, Stemmer};
use crate::core::tokenizer::{
    RegexpTokenizer, Tokenizer, TreebankTokenizer, WordPunctTokenizer, WordTokenizer,
};
use crate::formalism::ParsingAlgorithm;

const TOKENIZERS: &[(&str, TokenizerChoice)] = &[
    ("word", TokenizerChoice::Word),
    ("WordTokenizer", TokenizerChoice::Word),
    ("treebank", TokenizerChoice::Treebank),
    ("TreebankWordTokenizer", TokenizerChoice::Treebank),
    ("regexp", TokenizerChoice::Regexp),
    ("RegexpTokenizer", TokenizerChoice::Regexp),
    ("word_punct", TokenizerChoice::WordPunct),
    ("WordPunctTokenizer", TokenizerChoice::WordPunct),
];

const STEMMERS: &[(&str, StemmerChoice)] = &[
    ("porter", StemmerChoice::Porter),
    ("PorterStemmer", StemmerChoice::Porter),
    ("lancaster", StemmerChoice::Lancaster),
    ("LancasterStemmer", StemmerChoice::Lancaster),
];

const TAGGERS: &[(&str, TaggerChoice)] = &[
    ("feature_structure", TaggerChoice::FeatureStructure),
    ("fs", TaggerChoice::FeatureStructure),
    ("category_list", TaggerChoice::CategoryList),
    ("brill", TaggerChoice::CategoryList),
    ("rule_based", TaggerChoice::RuleBased),
    ("lookup", TaggerChoice::Lookup),
    ("wordnet", TaggerChoice::Lookup),
];

const ALGORITHMS: &[(&str, ParsingAlgorithm)] = &[
    ("CYK", ParsingAlgorithm::Cyk),
    ("HeadCorner", ParsingAlgorithm::HeadCorner),
    ("Earley", ParsingAlgorithm::Earley),
    ("LeftCorner", ParsingAlgorithm::LeftCorner),
];

fn find<T: Copy>(table: &[(&str, T)], role: &'static str, name: &str) -> Result<T, WorkbenchError> {
    let name = name.trim();
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
        .ok_or_else(|| WorkbenchError::UnknownStrategy {
            role,
            name: name.to_string(),
        })
}

/// 策略注册表
pub struct StrategyRegistry;

impl StrategyRegistry {
    pub fn tokenizer(name: &str) -> Result<TokenizerChoice, WorkbenchError> {
        find(TOKENIZERS, "分词器", name)
    }

    pub fn stemmer(name: &str) -> Result<StemmerChoice, WorkbenchError> {
        find(STEMMERS, "词干器", name)
    }

    /// 标注器名称；未给出名称时默认特征结构标注器
    pub fn tagger(name: Option<&str>) -> Result<TaggerChoice, WorkbenchError> {
        match name {
            None => Ok(TaggerChoice::default()),
            Some(name) if name.trim().is_empty() => Ok(TaggerChoice::default()),
            Some(name) => find(TAGGERS, "标注器", name),
        }
    }

    pub fn algorithm(name: &str) -> Result<ParsingAlgorithm, WorkbenchError> {
        find(ALGORITHMS, "分析算法", name)
    }

    /// 构建分词器；正则非法时在配置阶段报错
    pub fn build_tokenizer(
        settings: &TokenizerSettings,
    ) -> Result<Box<dyn Tokenizer>, WorkbenchError> {
        Ok(match settings.choice {
            TokenizerChoice::Word => Box::new(WordTokenizer),
            TokenizerChoice::Treebank => Box::new(TreebankTokenizer),
            TokenizerChoice::Regexp => Box::new(RegexpTokenizer::new(settings.pattern.as_deref())?),
            TokenizerChoice::WordPunct => Box::new(WordPunctTokenizer),
        })
    }

    /// 构建词干器；未启用时返回 None
    pub fn build_stemmer(settings: &StemmerSettings) -> Option<Box<dyn Stemmer>> {
        if !settings.enabled {
            return None;
        }
        Some(match settings.choice {
            StemmerChoice::Porter => Box::new(PorterStemmer),
            StemmerChoice::Lancaster => Box::new(LancasterStemmer::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(StrategyRegistry::algorithm("cyk").unwrap(), ParsingAlgorithm::Cyk);
        assert_eq!(
            StrategyRegistry::tokenizer("TreebankWordTokenizer").unwrap(),
            TokenizerChoice::Treebank
        );
        assert_eq!(StrategyRegistry::stemmer(" Lancaster ").unwrap(), StemmerChoice::Lancaster);
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let err = StrategyRegistry::algorithm("GLR").unwrap_err();
        assert!(matches!(err, WorkbenchError::UnknownStrategy { name, .. } if name == "GLR"));
        assert!(StrategyRegistry::tagger(Some("hmm")).is_err());
    }

    #[test]
    fn test_tagger_defaults_to_feature_structure() {
        assert_eq!(StrategyRegistry::tagger(None).unwrap(), TaggerChoice::FeatureStructure);
        assert_eq!(StrategyRegistry::tagger(Some("")).unwrap(), TaggerChoice::FeatureStructure);
        assert_eq!(StrategyRegistry::tagger(Some("wordnet")).unwrap(), TaggerChoice::Lookup);
    }

    #[test]
    fn test_build_tokenizer_validates_pattern() {
        let settings = TokenizerSettings {
            choice: TokenizerChoice::Regexp,
            pattern: Some("[".to_string()),
        };
        assert!(matches!(
            StrategyRegistry::build_tokenizer(&settings),
            Err(WorkbenchError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_disabled_stemmer_is_none() {
        assert!(StrategyRegistry::build_stemmer(&StemmerSettings::default()).is_none());
        let enabled = StemmerSettings {
            choice: StemmerChoice::Porter,
            enabled: true,
        };
        assert_eq!(StrategyRegistry::build_stemmer(&enabled).unwrap().stem("cats"), "cat");
    }
}
