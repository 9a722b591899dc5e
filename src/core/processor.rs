//! 句子处理流水线
//!
//! 分词 → 词干 → 标注 → 后处理 → 句法分析，每次调用处理一个句子。
//! 流水线只读取设置快照，不修改任何产物。

use crate::core::error::{ArtifactKind, WorkbenchError};
use crate::core::lookup::{tag_with_lookup, LexicalDatabase};
use crate::core::models::{ParseResult, TagList, TaggedWord};
use crate::core::registry::StrategyRegistry;
use crate::core::settings::SettingsSnapshot;
use crate::core::tagger::{strip_untagged, FunctionWordTagger, LocalTagger, TagOutcome, TaggerStrategy};
use crate::formalism::{create_parser, FeatureStructure, ParserConfig, Terminal};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 本次调用的标注方式
enum Tagging<'a> {
    Local(&'a LocalTagger),
    Lookup(&'a dyn LexicalDatabase),
}

/// 句子处理器
#[derive(Clone, Default)]
pub struct SentenceProcessor {
    /// 外部词典（仅 Lookup 标注器使用）
    lookup: Option<Arc<dyn LexicalDatabase>>,
    /// 单次查询超时
    lookup_timeout: Option<Duration>,
}

impl SentenceProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup(mut self, database: Arc<dyn LexicalDatabase>) -> Self {
        self.lookup = Some(database);
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn has_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// 处理一个句子
    pub async fn process(
        &self,
        sentence: &str,
        snapshot: &SettingsSnapshot,
    ) -> Result<ParseResult, WorkbenchError> {
        // 产物不全时在分词之前拒绝
        let (lattice, tagger, grammar) =
            match (&snapshot.lattice, &snapshot.tagger, &snapshot.grammar) {
                (Some(lattice), Some(tagger), Some(grammar)) => (lattice, tagger, grammar),
                _ => {
                    return Err(WorkbenchError::NotConfigured {
                        missing: snapshot.missing(),
                    })
                }
            };
        let tagging = match (tagger.strategy(), &self.lookup) {
            (TaggerStrategy::Local(local), _) => Tagging::Local(local),
            (TaggerStrategy::Lookup, Some(database)) => Tagging::Lookup(database.as_ref()),
            (TaggerStrategy::Lookup, None) => {
                return Err(WorkbenchError::NotConfigured {
                    missing: vec![ArtifactKind::LexicalDatabase],
                })
            }
        };

        let options = &snapshot.options;
        let mut result = ParseResult::new(sentence, options.parser.algorithm);

        // 分词
        let tokenizer = StrategyRegistry::build_tokenizer(&options.tokenizer)?;
        result.tokens = tokenizer.tokenize(sentence);
        tracing::debug!("分词: {:?}", result.tokens);

        // 词干
        result.stemmed = match StrategyRegistry::build_stemmer(&options.stemmer) {
            Some(stemmer) => result.tokens.iter().map(|t| stemmer.stem(t)).collect(),
            None => result.tokens.clone(),
        };

        // 标注
        let outcome = match tagging {
            Tagging::Local(local) => local.tag(&result.stemmed),
            Tagging::Lookup(database) => {
                tag_with_lookup(database, &result.stemmed, self.lookup_timeout).await
            }
        };
        debug_assert!(outcome.words.iter().all(|w| w.tags.mode() == tagger.mode()));
        let TagOutcome {
            mut words,
            transcript,
            failures,
        } = outcome;
        result.tagging_transcript = transcript;
        result.lookup_failures = failures;

        // 后处理
        if options.post_process.function_words {
            FunctionWordTagger::augment(&mut words, lattice);
        }
        if options.post_process.strip_untagged {
            result.stripped = strip_untagged(&mut words);
            if !result.stripped.is_empty() {
                tracing::debug!("删除未标注的词: {:?}", result.stripped);
            }
        }
        result.categories = words.iter().map(TaggedWord::category_summary).collect();

        // 句法分析
        let terminals: Vec<Terminal> = words.iter().map(to_terminal).collect();
        result.tagged = words;

        let parser = create_parser(ParserConfig {
            algorithm: options.parser.algorithm,
            grammar: grammar.clone(),
            lattice: lattice.clone(),
            unify: options.parser.unify,
            use_appropriate_function: options.parser.use_appropriate_function,
        });
        let start = Instant::now();
        let chart = parser.parse(&terminals);
        result.parsing_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        result.full_parse_items = chart
            .full_parse_items(grammar.start_symbol(), options.parser.algorithm.item_kind())
            .into_iter()
            .cloned()
            .collect();
        if options.parser.unify {
            result.full_parse_structures = result
                .full_parse_items
                .iter()
                .filter_map(|item| item.feature_structure.as_ref())
                .map(FeatureStructure::pretty)
                .collect();
        }
        result.in_language = !result.full_parse_items.is_empty();
        result.item_count = chart.item_count();
        result.chart = Some(chart);

        tracing::info!(
            "分析完成: {} 个词, {} 个线图项, {} 个完整分析, 耗时 {:.3} ms",
            result.len(),
            result.item_count,
            result.full_parse_items.len(),
            result.parsing_time_ms
        );
        Ok(result)
    }
}

/// 类别标签转成原子特征结构，交给分析器
fn to_terminal(word: &TaggedWord) -> Terminal {
    let readings = match &word.tags {
        TagList::Categories(tags) => tags.iter().map(|t| FeatureStructure::atomic(t.clone())).collect(),
        TagList::Features(tags) => tags.clone(),
    };
    Terminal {
        token: word.token.clone(),
        readings,
    }
}
