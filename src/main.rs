//! Grammar Workbench - 合一语法开发工作台
//!
//! 编译类型格、词典和语法，然后对句子做分词、词干、标注和句法分析。

pub mod core;
pub mod formalism;
pub mod storage;

use crate::core::models::{
    CompileRequest, ParseResult, ParserSettings, PostProcessSettings, StemmerSettings,
    TaggerSettings,
};
use crate::core::registry::StrategyRegistry;
use crate::core::{Workbench, WorkbenchError};
use crate::storage::ConfigManager;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grammar-workbench")]
#[command(about = "编译合一语法并分析句子")]
struct Args {
    /// 应用配置文件（默认位于用户配置目录）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 导入的设置文档
    #[arg(long)]
    settings: Option<PathBuf>,

    /// 编译后导出设置文档
    #[arg(long)]
    export: Option<PathBuf>,

    /// 类型格源文件
    #[arg(long)]
    lattice: Option<PathBuf>,

    /// 词典源文件
    #[arg(long)]
    lexicon: Option<PathBuf>,

    /// 语法源文件
    #[arg(long)]
    grammar: Option<PathBuf>,

    /// 分词器: word, treebank, regexp, word_punct
    #[arg(long)]
    tokenizer: Option<String>,

    /// 正则分词的分隔符模式
    #[arg(long)]
    pattern: Option<String>,

    /// 启用词干化: porter, lancaster
    #[arg(long)]
    stemmer: Option<String>,

    /// 标注器: feature_structure, category_list, rule_based, lookup
    #[arg(long)]
    tagger: Option<String>,

    /// 简单词典文件（category_list 标注器）
    #[arg(long)]
    simple_lexicon: Option<PathBuf>,

    /// 分析算法: CYK, HeadCorner, Earley, LeftCorner
    #[arg(long)]
    algorithm: Option<String>,

    /// 合一
    #[arg(long)]
    unify: bool,

    /// 合一时只保留合适特征
    #[arg(long)]
    appropriate: bool,

    /// 用功能词表补充标签
    #[arg(long)]
    function_words: bool,

    /// 删除未标注的词
    #[arg(long)]
    strip_untagged: bool,

    /// 外部词典服务地址（覆盖配置文件）
    #[arg(long)]
    lookup_endpoint: Option<String>,

    /// 以 JSON 输出
    #[arg(long)]
    json: bool,

    /// 待分析的句子（为空时从标准输入逐行读取）
    sentences: Vec<String>,
}

fn read_source(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| std::fs::read_to_string(p).with_context(|| format!("读取源文件失败: {}", p.display())))
        .transpose()
}

/// 由命令行参数构造编译请求；给出设置文档时以其为基础
fn build_request(args: &Args, settings: Option<&Path>) -> Result<CompileRequest> {
    let mut request = match settings {
        Some(path) => CompileRequest::from_export(&ConfigManager::load_settings(path)?),
        None => CompileRequest::new(),
    };

    if let Some(source) = read_source(args.lattice.as_deref())? {
        request = request.type_lattice(source);
    }
    if let Some(source) = read_source(args.lexicon.as_deref())? {
        request = request.lexicon(source);
    }
    if let Some(source) = read_source(args.grammar.as_deref())? {
        request = request.grammar(source);
    }

    if args.tokenizer.is_some() || args.pattern.is_some() {
        let mut tokenizer = request.tokenizer.clone().unwrap_or_default();
        if let Some(name) = &args.tokenizer {
            tokenizer.choice = StrategyRegistry::tokenizer(name)?;
        }
        if args.pattern.is_some() {
            tokenizer.pattern = args.pattern.clone();
        }
        request = request.tokenizer(tokenizer);
    }
    if let Some(name) = &args.stemmer {
        request = request.stemmer(StemmerSettings {
            choice: StrategyRegistry::stemmer(name)?,
            enabled: true,
        });
    }
    if args.tagger.is_some() || args.simple_lexicon.is_some() {
        let mut tagger: TaggerSettings = request.tagger.clone().unwrap_or_default();
        if args.tagger.is_some() {
            tagger.choice = StrategyRegistry::tagger(args.tagger.as_deref())?;
        }
        if args.simple_lexicon.is_some() {
            tagger.lexicon_path = args.simple_lexicon.clone();
        }
        request = request.tagger(tagger);
    }
    if args.function_words || args.strip_untagged {
        let mut post: PostProcessSettings = request.post_process.unwrap_or_default();
        post.function_words |= args.function_words;
        post.strip_untagged |= args.strip_untagged;
        request = request.post_process(post);
    }
    if args.algorithm.is_some() || args.unify || args.appropriate {
        let mut parser: ParserSettings = request.parser.unwrap_or_default();
        if let Some(name) = &args.algorithm {
            parser.algorithm = StrategyRegistry::algorithm(name)?;
        }
        parser.unify |= args.unify;
        parser.use_appropriate_function |= args.appropriate;
        request = request.parser(parser);
    }
    Ok(request)
}

fn print_result(result: &ParseResult) {
    println!("句子: {}", result.sentence);
    println!("  分词: {}", result.tokens.join(" "));
    if result.stemmed != result.tokens {
        println!("  词干: {}", result.stemmed.join(" "));
    }
    for (word, summary) in result.tagged.iter().zip(&result.categories) {
        println!("  {} / {}", word.token, summary);
    }
    if !result.stripped.is_empty() {
        println!("  删除: {}", result.stripped.join(" "));
    }
    if !result.lookup_failures.is_empty() {
        println!("  查询失败: {}", result.lookup_failures.join(" "));
    }
    println!(
        "  {} ({}): {} 个线图项, 耗时 {:.3} ms",
        if result.in_language { "属于语言" } else { "不属于语言" },
        result.algorithm,
        result.item_count,
        result.parsing_time_ms
    );
    for item in &result.full_parse_items {
        println!("  {}", item);
    }
    for structure in &result.full_parse_structures {
        for line in structure.lines() {
            println!("    {}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let manager = ConfigManager::new(args.config.clone().unwrap_or_else(ConfigManager::default_path));
    let mut config = manager.load()?;
    if args.lookup_endpoint.is_some() {
        config.lookup.endpoint = args.lookup_endpoint.clone();
    }
    tracing::info!("启动 Grammar Workbench, 配置文件: {}", manager.path().display());

    let workbench = Workbench::from_config(&config);
    let settings = args.settings.clone().or_else(|| config.settings_path.clone());
    let request = build_request(&args, settings.as_deref())?;
    let report = workbench.compile(request).await?;
    for (kind, error) in report.errors() {
        eprintln!("{}编译失败: {}", kind, error);
    }

    if let Some(path) = &args.export {
        ConfigManager::save_settings(path, &workbench.export_settings().await)?;
        tracing::info!("设置已导出到 {}", path.display());
    }
    if !report.ready {
        let missing = workbench.snapshot().await.missing();
        return Err(WorkbenchError::NotConfigured { missing }.into());
    }

    let sentences = if args.sentences.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect()
    } else {
        args.sentences.clone()
    };

    for sentence in &sentences {
        let result = workbench.process(sentence).await?;
        if args.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            print_result(&result);
        }
    }

    Ok(())
}
