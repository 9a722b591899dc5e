//! 标注模块
//!
//! 负责标注器产物、同步标注以及标注后处理（功能词补充、删除未标注词）。
//! 外部词典标注是异步的，见 `lookup` 模块。

use crate::core::models::{TagList, TagMode, TaggedWord, TaggerChoice};
use crate::formalism::{FeatureLexicon, FeatureStructure, SimpleLexicon, TypeLattice};

/// 标注器的具体实现
#[derive(Debug, Clone)]
pub enum TaggerStrategy {
    /// 同步标注，直接查本地词典
    Local(LocalTagger),
    /// 外部词典查询，编译时不做任何工作，标注走异步路径
    Lookup,
}

/// 本地同步标注器
#[derive(Debug, Clone)]
pub enum LocalTagger {
    /// 特征结构词典
    FeatureStructure(FeatureLexicon),
    /// 简单词典
    CategoryList(SimpleLexicon),
    /// 规则标注（占位）
    RuleBased,
}

/// 编译后的标注器，构造后不可变
#[derive(Debug, Clone)]
pub struct TaggerArtifact {
    strategy: TaggerStrategy,
    fingerprint: String,
}

/// 标注的输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOutcome {
    pub words: Vec<TaggedWord>,
    /// 特征结构标注器的详细输出
    pub transcript: Option<String>,
    /// 查询失败的词
    pub failures: Vec<String>,
}

impl TaggerArtifact {
    pub fn new(strategy: TaggerStrategy, fingerprint: String) -> Self {
        Self {
            strategy,
            fingerprint,
        }
    }

    pub fn local(tagger: LocalTagger, fingerprint: String) -> Self {
        Self::new(TaggerStrategy::Local(tagger), fingerprint)
    }

    pub fn strategy(&self) -> &TaggerStrategy {
        &self.strategy
    }

    pub fn choice(&self) -> TaggerChoice {
        match &self.strategy {
            TaggerStrategy::Local(local) => local.choice(),
            TaggerStrategy::Lookup => TaggerChoice::Lookup,
        }
    }

    /// 标签表示跟随标注器产物
    pub fn mode(&self) -> TagMode {
        self.choice().mode()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl LocalTagger {
    pub fn choice(&self) -> TaggerChoice {
        match self {
            LocalTagger::FeatureStructure(_) => TaggerChoice::FeatureStructure,
            LocalTagger::CategoryList(_) => TaggerChoice::CategoryList,
            LocalTagger::RuleBased => TaggerChoice::RuleBased,
        }
    }

    /// 同步标注
    pub fn tag(&self, tokens: &[String]) -> TagOutcome {
        let words = match self {
            LocalTagger::FeatureStructure(lexicon) => {
                let words: Vec<TaggedWord> = tokens
                    .iter()
                    .map(|token| TaggedWord::new(token.clone(), TagList::Features(lexicon.lookup(token).to_vec())))
                    .collect();
                let transcript = transcript(&words);
                return TagOutcome {
                    words,
                    transcript: Some(transcript),
                    failures: Vec::new(),
                };
            }
            LocalTagger::CategoryList(lexicon) => tokens
                .iter()
                .map(|token| TaggedWord::new(token.clone(), TagList::Categories(lexicon.lookup(token).to_vec())))
                .collect(),
            LocalTagger::RuleBased => tokens
                .iter()
                .map(|token| TaggedWord::new(token.clone(), TagList::empty(self.choice().mode())))
                .collect(),
        };
        TagOutcome {
            words,
            transcript: None,
            failures: Vec::new(),
        }
    }
}

/// 特征结构标注的详细输出：每个词一段，列出所有读法
fn transcript(words: &[TaggedWord]) -> String {
    let mut out = String::new();
    for word in words {
        out.push_str(&word.token);
        out.push_str(":\n");
        if let TagList::Features(readings) = &word.tags {
            if readings.is_empty() {
                out.push_str("  (未收录)\n");
            }
            for reading in readings {
                for line in reading.pretty().lines() {
                    out.push_str("  ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }
    out
}

/// 封闭词类表
const FUNCTION_WORDS: &[(&str, &[&str])] = &[
    ("a", &["DT"]),
    ("an", &["DT"]),
    ("the", &["DT"]),
    ("this", &["DT"]),
    ("that", &["DT", "IN", "WDT"]),
    ("these", &["DT"]),
    ("those", &["DT"]),
    ("every", &["DT"]),
    ("some", &["DT"]),
    ("no", &["DT"]),
    ("and", &["CC"]),
    ("or", &["CC"]),
    ("but", &["CC"]),
    ("nor", &["CC"]),
    ("in", &["IN"]),
    ("on", &["IN"]),
    ("at", &["IN"]),
    ("of", &["IN"]),
    ("with", &["IN"]),
    ("by", &["IN"]),
    ("for", &["IN"]),
    ("from", &["IN"]),
    ("about", &["IN"]),
    ("under", &["IN"]),
    ("to", &["TO"]),
    ("i", &["PRP"]),
    ("you", &["PRP"]),
    ("he", &["PRP"]),
    ("she", &["PRP"]),
    ("it", &["PRP"]),
    ("we", &["PRP"]),
    ("they", &["PRP"]),
    ("me", &["PRP"]),
    ("him", &["PRP"]),
    ("her", &["PRP", "PRP$"]),
    ("us", &["PRP"]),
    ("them", &["PRP"]),
    ("my", &["PRP$"]),
    ("your", &["PRP$"]),
    ("his", &["PRP$"]),
    ("its", &["PRP$"]),
    ("our", &["PRP$"]),
    ("their", &["PRP$"]),
    ("who", &["WP"]),
    ("what", &["WP"]),
    ("which", &["WDT"]),
    ("can", &["MD"]),
    ("could", &["MD"]),
    ("will", &["MD"]),
    ("would", &["MD"]),
    ("shall", &["MD"]),
    ("should", &["MD"]),
    ("may", &["MD"]),
    ("might", &["MD"]),
    ("must", &["MD"]),
    ("there", &["EX"]),
    ("not", &["RB"]),
];

/// 功能词标注器（只认封闭词类）
pub struct FunctionWordTagger;

impl FunctionWordTagger {
    pub fn categories(word: &str) -> &'static [&'static str] {
        let lower = word.to_lowercase();
        FUNCTION_WORDS
            .iter()
            .find(|(w, _)| *w == lower)
            .map(|(_, tags)| *tags)
            .unwrap_or(&[])
    }

    /// 为每个词补充功能词标签，按当前表示方式；
    /// 特征结构模式下只补充类型格中存在的类别
    pub fn augment(words: &mut [TaggedWord], lattice: &TypeLattice) {
        for word in words.iter_mut() {
            let extra = Self::categories(&word.token);
            match &mut word.tags {
                TagList::Categories(tags) => {
                    for category in extra {
                        if !tags.iter().any(|t| t == category) {
                            tags.push(category.to_string());
                        }
                    }
                }
                TagList::Features(tags) => {
                    for category in extra.iter().filter(|c| lattice.contains(c)) {
                        if !tags.iter().any(|t| t.type_name() == *category) {
                            tags.push(FeatureStructure::atomic(*category));
                        }
                    }
                }
            }
        }
    }
}

/// 删除没有标签的词，返回被删除的词
pub fn strip_untagged(words: &mut Vec<TaggedWord>) -> Vec<String> {
    let mut stripped = Vec::new();
    words.retain(|word| {
        if word.tags.is_empty() {
            stripped.push(word.token.clone());
            false
        } else {
            true
        }
    });
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> TypeLattice {
        TypeLattice::compile("Cat\nDT < Cat\nN < Cat\nV < Cat").unwrap()
    }

    fn fs_tagger() -> TaggerArtifact {
        let lattice = lattice();
        let lexicon = FeatureLexicon::compile("cat: N\nsleeps: V | N", &lattice).unwrap();
        TaggerArtifact::local(LocalTagger::FeatureStructure(lexicon), "fp".to_string())
    }

    fn local(artifact: &TaggerArtifact) -> &LocalTagger {
        match artifact.strategy() {
            TaggerStrategy::Local(local) => local,
            TaggerStrategy::Lookup => panic!("expected a local tagger"),
        }
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_feature_tagger_with_transcript() {
        let tagger = fs_tagger();
        assert_eq!(tagger.mode(), TagMode::Features);
        let outcome = local(&tagger).tag(&tokens(&["the", "cat", "sleeps"]));
        assert_eq!(outcome.words.len(), 3);
        assert!(outcome.words[0].tags.is_empty());
        assert_eq!(outcome.words[2].category_summary(), "V, N");
        let transcript = outcome.transcript.unwrap();
        assert!(transcript.contains("the:\n  (未收录)"));
        assert!(transcript.contains("sleeps:\n  V\n  N\n"));
    }

    #[test]
    fn test_rule_based_tags_nothing_and_lookup_uses_categories() {
        let rule_based = TaggerArtifact::local(LocalTagger::RuleBased, String::new());
        let outcome = local(&rule_based).tag(&tokens(&["a", "b"]));
        assert!(outcome.words.iter().all(|w| w.tags.is_empty()));
        assert!(outcome.words.iter().all(|w| w.tags.mode() == rule_based.mode()));
        assert_eq!(rule_based.mode(), TagMode::Categories);

        let lookup = TaggerArtifact::new(TaggerStrategy::Lookup, String::new());
        assert_eq!(lookup.choice(), TaggerChoice::Lookup);
        assert_eq!(lookup.mode(), TagMode::Categories);
    }

    #[test]
    fn test_function_words_in_category_mode() {
        let mut words = vec![
            TaggedWord::new("The", TagList::Categories(vec!["DT".to_string()])),
            TaggedWord::new("that", TagList::Categories(Vec::new())),
            TaggedWord::new("cat", TagList::Categories(Vec::new())),
        ];
        FunctionWordTagger::augment(&mut words, &lattice());
        assert_eq!(words[0].tags, TagList::Categories(vec!["DT".to_string()]));
        assert_eq!(words[1].category_summary(), "DT, IN, WDT");
        assert!(words[2].tags.is_empty());
    }

    #[test]
    fn test_function_words_in_feature_mode_respect_lattice() {
        let mut words = vec![TaggedWord::new("that", TagList::Features(Vec::new()))];
        FunctionWordTagger::augment(&mut words, &lattice());
        // 类型格里只有 DT
        assert_eq!(words[0].tags, TagList::Features(vec![FeatureStructure::atomic("DT")]));
    }

    #[test]
    fn test_strip_untagged() {
        let mut words = vec![
            TaggedWord::new("cat", TagList::Categories(vec!["N".to_string()])),
            TaggedWord::new("zzqx", TagList::Categories(Vec::new())),
        ];
        let stripped = strip_untagged(&mut words);
        assert_eq!(words, vec![TaggedWord::new("cat", TagList::Categories(vec!["N".to_string()]))]);
        assert_eq!(stripped, vec!["zzqx"]);
    }
}
