//! 核心数据模型定义
//!
//! 配置选择、源文本、标注结果、流水线结果与导出文档。

use crate::formalism::{Chart, FeatureStructure, ParseItem, ParsingAlgorithm};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// 分词算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerChoice {
    /// 按非字母数字切分
    #[default]
    Word,
    /// Penn Treebank 风格（拆分缩写与标点）
    Treebank,
    /// 按配置的正则切分
    Regexp,
    /// 词与标点分离
    WordPunct,
}

/// 词干算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StemmerChoice {
    #[default]
    Porter,
    Lancaster,
}

/// 标注器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaggerChoice {
    /// 基于类型格的特征结构词典
    #[default]
    FeatureStructure,
    /// 简单词典（类别标签列表）
    CategoryList,
    /// 基于规则（占位实现，不产生任何标签）
    RuleBased,
    /// 标注时查询外部词典
    Lookup,
}

impl TaggerChoice {
    /// 该标注器产生的标签表示
    pub fn mode(self) -> TagMode {
        match self {
            TaggerChoice::FeatureStructure => TagMode::Features,
            TaggerChoice::CategoryList | TaggerChoice::RuleBased | TaggerChoice::Lookup => {
                TagMode::Categories
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TaggerChoice::FeatureStructure => "feature_structure",
            TaggerChoice::CategoryList => "category_list",
            TaggerChoice::RuleBased => "rule_based",
            TaggerChoice::Lookup => "lookup",
        }
    }
}

impl fmt::Display for TaggerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 标签表示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagMode {
    /// 纯类别标签
    Categories,
    /// 特征结构
    Features,
}

/// 分词设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenizerSettings {
    pub choice: TokenizerChoice,
    /// 正则分词的模式（为空时使用 `\s+`）
    #[serde(default)]
    pub pattern: Option<String>,
}

/// 词干设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StemmerSettings {
    pub choice: StemmerChoice,
    /// 是否启用词干化
    #[serde(default)]
    pub enabled: bool,
}

/// 标注器设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaggerSettings {
    pub choice: TaggerChoice,
    /// 简单词典文件路径（仅 CategoryList 使用，为空时按词典源文本解析）
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,
}

impl TaggerSettings {
    /// 是否由词典源文本编译；简单词典给出文件路径时改读文件
    pub fn reads_lexicon_text(&self) -> bool {
        match self.choice {
            TaggerChoice::FeatureStructure => true,
            TaggerChoice::CategoryList => self.lexicon_path.is_none(),
            TaggerChoice::RuleBased | TaggerChoice::Lookup => false,
        }
    }
}

/// 标注后处理设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PostProcessSettings {
    /// 用功能词表补充标签
    #[serde(default)]
    pub function_words: bool,
    /// 删除没有任何标签的词
    #[serde(default)]
    pub strip_untagged: bool,
}

/// 句法分析设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParserSettings {
    pub algorithm: ParsingAlgorithm,
    /// 是否做合一
    #[serde(default)]
    pub unify: bool,
    /// 合一时是否只保留合适特征
    #[serde(default)]
    pub use_appropriate_function: bool,
}

/// 流水线的全部算法选择
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PipelineOptions {
    #[serde(default)]
    pub tokenizer: TokenizerSettings,
    #[serde(default)]
    pub stemmer: StemmerSettings,
    #[serde(default)]
    pub tagger: TaggerSettings,
    #[serde(default)]
    pub post_process: PostProcessSettings,
    #[serde(default)]
    pub parser: ParserSettings,
}

/// 三份源文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceTexts {
    #[serde(default)]
    pub type_lattice: String,
    #[serde(default)]
    pub lexicon: String,
    #[serde(default)]
    pub grammar: String,
}

/// 一个词的标签列表，表示方式在整个结果内一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "tags", rename_all = "snake_case")]
pub enum TagList {
    Categories(Vec<String>),
    Features(Vec<FeatureStructure>),
}

impl TagList {
    pub fn empty(mode: TagMode) -> Self {
        match mode {
            TagMode::Categories => TagList::Categories(Vec::new()),
            TagMode::Features => TagList::Features(Vec::new()),
        }
    }

    pub fn mode(&self) -> TagMode {
        match self {
            TagList::Categories(_) => TagMode::Categories,
            TagList::Features(_) => TagMode::Features,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TagList::Categories(tags) => tags.len(),
            TagList::Features(tags) => tags.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 每个标签的类别名
    pub fn category_names(&self) -> Vec<&str> {
        match self {
            TagList::Categories(tags) => tags.iter().map(|t| t.as_str()).collect(),
            TagList::Features(tags) => tags.iter().map(|t| t.type_name()).collect(),
        }
    }
}

/// 已标注的词
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedWord {
    pub token: String,
    pub tags: TagList,
}

impl TaggedWord {
    pub fn new(token: impl Into<String>, tags: TagList) -> Self {
        Self {
            token: token.into(),
            tags,
        }
    }

    /// 逗号分隔的类别摘要
    pub fn category_summary(&self) -> String {
        self.tags.category_names().join(", ")
    }
}

/// 单次流水线运行的结果，每次请求重新创建
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    /// 请求ID
    pub request_id: Uuid,
    /// 原始句子
    pub sentence: String,
    /// 分词结果
    pub tokens: Vec<String>,
    /// 词干结果（未启用时与分词结果相同）
    pub stemmed: Vec<String>,
    /// 标注结果（后处理之后）
    pub tagged: Vec<TaggedWord>,
    /// 特征结构标注器的详细输出
    pub tagging_transcript: Option<String>,
    /// 外部查询失败、被标为 unknown 的词
    pub lookup_failures: Vec<String>,
    /// 因未标注而被删除的词
    pub stripped: Vec<String>,
    /// 每个词的类别摘要
    pub categories: Vec<String>,
    /// 使用的分析算法
    pub algorithm: ParsingAlgorithm,
    /// 分析线图
    #[serde(skip_serializing)]
    pub chart: Option<Chart>,
    /// 完整分析项
    pub full_parse_items: Vec<ParseItem>,
    /// 完整分析项的特征结构（仅合一模式）
    pub full_parse_structures: Vec<String>,
    /// 句子是否属于语言
    pub in_language: bool,
    /// 分析耗时（毫秒）
    pub parsing_time_ms: f64,
    /// 创建的线图项数
    pub item_count: usize,
}

impl ParseResult {
    pub fn new(sentence: impl Into<String>, algorithm: ParsingAlgorithm) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            sentence: sentence.into(),
            tokens: Vec::new(),
            stemmed: Vec::new(),
            tagged: Vec::new(),
            tagging_transcript: None,
            lookup_failures: Vec::new(),
            stripped: Vec::new(),
            categories: Vec::new(),
            algorithm,
            chart: None,
            full_parse_items: Vec::new(),
            full_parse_structures: Vec::new(),
            in_language: false,
            parsing_time_ms: 0.0,
            item_count: 0,
        }
    }

    /// 句子长度（后处理之后）
    pub fn len(&self) -> usize {
        self.tagged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tagged.is_empty()
    }
}

/// 编译请求，每一项都是可选的
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    pub type_lattice: Option<String>,
    pub lexicon: Option<String>,
    pub grammar: Option<String>,
    pub tokenizer: Option<TokenizerSettings>,
    pub stemmer: Option<StemmerSettings>,
    pub tagger: Option<TaggerSettings>,
    pub post_process: Option<PostProcessSettings>,
    pub parser: Option<ParserSettings>,
}

impl CompileRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从导出文档构造：所有源文本与选择一次性重编译
    pub fn from_export(export: &SettingsExport) -> Self {
        let options = export.options.clone();
        Self {
            type_lattice: Some(export.sources.type_lattice.clone()),
            lexicon: Some(export.sources.lexicon.clone()),
            grammar: Some(export.sources.grammar.clone()),
            tokenizer: Some(options.tokenizer),
            stemmer: Some(options.stemmer),
            tagger: Some(options.tagger),
            post_process: Some(options.post_process),
            parser: Some(options.parser),
        }
    }

    pub fn type_lattice(mut self, source: impl Into<String>) -> Self {
        self.type_lattice = Some(source.into());
        self
    }

    pub fn lexicon(mut self, source: impl Into<String>) -> Self {
        self.lexicon = Some(source.into());
        self
    }

    pub fn grammar(mut self, source: impl Into<String>) -> Self {
        self.grammar = Some(source.into());
        self
    }

    pub fn tokenizer(mut self, settings: TokenizerSettings) -> Self {
        self.tokenizer = Some(settings);
        self
    }

    pub fn stemmer(mut self, settings: StemmerSettings) -> Self {
        self.stemmer = Some(settings);
        self
    }

    pub fn tagger(mut self, settings: TaggerSettings) -> Self {
        self.tagger = Some(settings);
        self
    }

    pub fn post_process(mut self, settings: PostProcessSettings) -> Self {
        self.post_process = Some(settings);
        self
    }

    pub fn parser(mut self, settings: ParserSettings) -> Self {
        self.parser = Some(settings);
        self
    }

    /// 是否需要编译标注器
    pub fn wants_tagger(&self) -> bool {
        self.lexicon.is_some() || self.tagger.is_some()
    }
}

/// 设置导出文档（不含编译产物）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsExport {
    /// 导出时间
    pub exported_at: DateTime<Utc>,
    /// 算法选择
    #[serde(default)]
    pub options: PipelineOptions,
    /// 源文本
    #[serde(default)]
    pub sources: SourceTexts,
}

/// 外部词典配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LookupConfig {
    /// HTTP 服务地址（为空时不启用外部词典）
    #[serde(default)]
    pub endpoint: Option<String>,
    /// 单次查询超时（毫秒，为空表示不超时）
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 外部词典配置
    #[serde(default)]
    pub lookup: LookupConfig,
    /// 启动时导入的设置文档
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
}
