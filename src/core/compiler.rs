//! 产物编译器
//!
//! 按依赖顺序编译三个产物：先编译类型格，
//! 然后标注器和语法两个分支并发编译，全部结束后统一返回一份报告。
//!
//! 规则：
//! - 算法选择先校验，校验失败则整个调用失败，设置不变
//! - 类型格编译成功会作废标注器和语法
//! - 分支之间互不影响，失败的分支保留原产物
//! - 源文本只在编译成功时保存

use crate::core::error::{ArtifactKind, WorkbenchError};
use crate::core::models::{CompileRequest, TaggerChoice, TaggerSettings};
use crate::core::registry::StrategyRegistry;
use crate::core::settings::SettingsStore;
use crate::core::tagger::{LocalTagger, TaggerArtifact, TaggerStrategy};
use crate::formalism::{fingerprint, FeatureLexicon, Grammar, SimpleLexicon, TypeLattice};
use futures::future::join;
use std::sync::Arc;

/// 单个分支的结果
#[derive(Debug)]
pub enum BranchOutcome {
    /// 本次调用未请求该分支
    NotRequested,
    /// 编译成功
    Compiled { fingerprint: String },
    /// 编译失败（原产物保留）
    Failed(WorkbenchError),
}

impl BranchOutcome {
    pub fn is_compiled(&self) -> bool {
        matches!(self, BranchOutcome::Compiled { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BranchOutcome::Failed(_))
    }

    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            BranchOutcome::Compiled { fingerprint } => Some(fingerprint.as_str()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WorkbenchError> {
        match self {
            BranchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// 一次编译调用的报告
#[derive(Debug)]
pub struct CompileReport {
    pub type_lattice: BranchOutcome,
    pub tagger: BranchOutcome,
    pub grammar: BranchOutcome,
    /// 调用结束后三个产物是否齐全
    pub ready: bool,
}

impl CompileReport {
    /// 所有失败的分支
    pub fn errors(&self) -> impl Iterator<Item = (ArtifactKind, &WorkbenchError)> {
        [
            (ArtifactKind::TypeLattice, &self.type_lattice),
            (ArtifactKind::Tagger, &self.tagger),
            (ArtifactKind::Grammar, &self.grammar),
        ]
        .into_iter()
        .filter_map(|(kind, outcome)| outcome.error().map(|e| (kind, e)))
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// 产物编译器
pub struct ArtifactCompiler;

impl ArtifactCompiler {
    /// 执行一次编译请求
    pub async fn compile(
        store: &mut SettingsStore,
        request: CompileRequest,
    ) -> Result<CompileReport, WorkbenchError> {
        // 校验在任何编译之前完成
        if let Some(tokenizer) = &request.tokenizer {
            StrategyRegistry::build_tokenizer(tokenizer)?;
        }
        Self::apply_options(store, &request);

        // 第一步：类型格
        let type_lattice = match &request.type_lattice {
            None => BranchOutcome::NotRequested,
            Some(source) => match TypeLattice::compile(source) {
                Ok(lattice) => {
                    let fp = lattice.fingerprint().to_string();
                    tracing::info!("类型格编译完成: {} 个类型", lattice.types().count());
                    store.replace_lattice(lattice);
                    store.sources_mut().type_lattice = source.clone();
                    BranchOutcome::Compiled { fingerprint: fp }
                }
                Err(e) => {
                    tracing::warn!("类型格编译失败: {}", e);
                    BranchOutcome::Failed(WorkbenchError::source_parse(ArtifactKind::TypeLattice, e))
                }
            },
        };

        // 第二步：标注器与语法并发
        let lattice = store.lattice().cloned();
        let tagger_settings = request
            .tagger
            .clone()
            .unwrap_or_else(|| store.options().tagger.clone());
        let lexicon_source = request
            .lexicon
            .clone()
            .unwrap_or_else(|| store.sources().lexicon.clone());
        // 词典文本只在实际参与编译时保存
        let keep_lexicon = request.lexicon.is_some() && tagger_settings.reads_lexicon_text();

        let tagger_branch = async {
            if !request.wants_tagger() {
                return None;
            }
            Some(Self::compile_tagger(lattice.clone(), &tagger_settings, &lexicon_source).await)
        };
        let grammar_branch = async {
            let source = request.grammar.as_ref()?;
            Some(Self::compile_grammar(lattice.clone(), source))
        };
        let (tagger_result, grammar_result) = join(tagger_branch, grammar_branch).await;

        let tagger = match tagger_result {
            None => BranchOutcome::NotRequested,
            Some(Ok(artifact)) => {
                let fp = artifact.fingerprint().to_string();
                tracing::info!("标注器编译完成: {}", artifact.choice());
                store.set_tagger(artifact);
                store.options_mut().tagger = tagger_settings;
                if keep_lexicon {
                    store.sources_mut().lexicon = lexicon_source;
                }
                BranchOutcome::Compiled { fingerprint: fp }
            }
            Some(Err(e)) => {
                tracing::warn!("标注器编译失败: {}", e);
                BranchOutcome::Failed(e)
            }
        };

        let grammar = match grammar_result {
            None => BranchOutcome::NotRequested,
            Some(Ok(grammar)) => {
                let fp = grammar.fingerprint().to_string();
                tracing::info!(
                    "语法编译完成: {} 条规则, 开始符号 {}",
                    grammar.rules().len(),
                    grammar.start_symbol()
                );
                store.set_grammar(grammar);
                if let Some(source) = &request.grammar {
                    store.sources_mut().grammar = source.clone();
                }
                BranchOutcome::Compiled { fingerprint: fp }
            }
            Some(Err(e)) => {
                tracing::warn!("语法编译失败: {}", e);
                BranchOutcome::Failed(e)
            }
        };

        let report = CompileReport {
            type_lattice,
            tagger,
            grammar,
            ready: store.ready(),
        };
        tracing::debug!("编译结束, ready = {}", report.ready);
        Ok(report)
    }

    /// 非源文本的选择在校验通过后立即生效；标注器选择随标注器产物一起生效
    fn apply_options(store: &mut SettingsStore, request: &CompileRequest) {
        let options = store.options_mut();
        if let Some(tokenizer) = &request.tokenizer {
            options.tokenizer = tokenizer.clone();
        }
        if let Some(stemmer) = request.stemmer {
            options.stemmer = stemmer;
        }
        if let Some(post_process) = request.post_process {
            options.post_process = post_process;
        }
        if let Some(parser) = request.parser {
            options.parser = parser;
        }
    }

    async fn compile_tagger(
        lattice: Option<Arc<TypeLattice>>,
        settings: &TaggerSettings,
        lexicon_source: &str,
    ) -> Result<TaggerArtifact, WorkbenchError> {
        let lattice = lattice.ok_or(WorkbenchError::DependencyMissing {
            artifact: ArtifactKind::Tagger,
        })?;

        let to_error = |e| WorkbenchError::source_parse(ArtifactKind::Tagger, e);
        let artifact = match settings.choice {
            TaggerChoice::FeatureStructure => {
                let lexicon = FeatureLexicon::compile(lexicon_source, &lattice).map_err(to_error)?;
                let fp = lexicon.fingerprint().to_string();
                TaggerArtifact::local(LocalTagger::FeatureStructure(lexicon), fp)
            }
            TaggerChoice::CategoryList => {
                let text = match &settings.lexicon_path {
                    Some(path) => tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| WorkbenchError::Io {
                            path: path.clone(),
                            source,
                        })?,
                    None => lexicon_source.to_string(),
                };
                let lexicon = SimpleLexicon::parse(&text).map_err(to_error)?;
                let fp = lexicon.fingerprint().to_string();
                TaggerArtifact::local(LocalTagger::CategoryList(lexicon), fp)
            }
            TaggerChoice::RuleBased => {
                TaggerArtifact::local(LocalTagger::RuleBased, fingerprint(&[TaggerChoice::RuleBased.name()]))
            }
            TaggerChoice::Lookup => {
                TaggerArtifact::new(TaggerStrategy::Lookup, fingerprint(&[TaggerChoice::Lookup.name()]))
            }
        };
        Ok(artifact)
    }

    fn compile_grammar(
        lattice: Option<Arc<TypeLattice>>,
        source: &str,
    ) -> Result<Grammar, WorkbenchError> {
        let lattice = lattice.ok_or(WorkbenchError::DependencyMissing {
            artifact: ArtifactKind::Grammar,
        })?;
        Grammar::compile(source, &lattice)
            .map_err(|e| WorkbenchError::source_parse(ArtifactKind::Grammar, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{TokenizerChoice, TokenizerSettings};
    use std::io::Write;

    const LATTICE: &str = "S\nNP\nVP\nDet\nN\nV";
    const LEXICON: &str = "the: Det\ncat: N\nsleeps: V";
    const GRAMMAR: &str = "S -> NP VP\nNP -> Det N\nVP -> V";

    fn full_request() -> CompileRequest {
        CompileRequest::new()
            .type_lattice(LATTICE)
            .lexicon(LEXICON)
            .grammar(GRAMMAR)
    }

    #[tokio::test]
    async fn test_full_compile_is_ready() {
        let mut store = SettingsStore::new();
        let report = ArtifactCompiler::compile(&mut store, full_request()).await.unwrap();
        assert!(report.type_lattice.is_compiled());
        assert!(report.tagger.is_compiled());
        assert!(report.grammar.is_compiled());
        assert!(report.ready);
        assert!(!report.has_errors());
        assert_eq!(store.sources().grammar, GRAMMAR);
    }

    #[tokio::test]
    async fn test_compiling_twice_gives_equal_fingerprints() {
        let mut store = SettingsStore::new();
        let first = ArtifactCompiler::compile(&mut store, full_request()).await.unwrap();
        let second = ArtifactCompiler::compile(&mut store, full_request()).await.unwrap();
        assert_eq!(first.type_lattice.fingerprint(), second.type_lattice.fingerprint());
        assert_eq!(first.tagger.fingerprint(), second.tagger.fingerprint());
        assert_eq!(first.grammar.fingerprint(), second.grammar.fingerprint());
        assert!(first.tagger.fingerprint().is_some());
    }

    #[tokio::test]
    async fn test_lattice_recompile_invalidates_dependents() {
        let mut store = SettingsStore::new();
        ArtifactCompiler::compile(&mut store, full_request()).await.unwrap();
        assert!(store.ready());

        let report = ArtifactCompiler::compile(&mut store, CompileRequest::new().type_lattice(LATTICE))
            .await
            .unwrap();
        assert!(report.type_lattice.is_compiled());
        assert!(matches!(report.tagger, BranchOutcome::NotRequested));
        assert!(!report.ready);
        assert!(store.tagger().is_none());
        assert!(store.grammar().is_none());
    }

    #[tokio::test]
    async fn test_failed_lattice_keeps_previous_artifacts() {
        let mut store = SettingsStore::new();
        ArtifactCompiler::compile(&mut store, full_request()).await.unwrap();

        let report = ArtifactCompiler::compile(&mut store, CompileRequest::new().type_lattice("A < Missing"))
            .await
            .unwrap();
        assert!(matches!(
            report.type_lattice.error(),
            Some(WorkbenchError::SourceParse { artifact: ArtifactKind::TypeLattice, .. })
        ));
        assert!(report.ready);
        assert_eq!(store.sources().type_lattice, LATTICE);
    }

    #[tokio::test]
    async fn test_missing_lattice_does_not_abort_other_branch() {
        let mut store = SettingsStore::new();
        let request = CompileRequest::new()
            .lexicon(LEXICON)
            .tagger(TaggerSettings {
                choice: TaggerChoice::RuleBased,
                lexicon_path: None,
            })
            .grammar(GRAMMAR);
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();

        // 两个分支都完成并各自报告依赖缺失
        assert!(matches!(
            report.tagger.error(),
            Some(WorkbenchError::DependencyMissing { artifact: ArtifactKind::Tagger })
        ));
        assert!(matches!(
            report.grammar.error(),
            Some(WorkbenchError::DependencyMissing { artifact: ArtifactKind::Grammar })
        ));
        assert_eq!(report.errors().count(), 2);
        assert!(store.tagger().is_none());
        assert!(store.sources().grammar.is_empty());
    }

    #[tokio::test]
    async fn test_failed_grammar_keeps_tagger_and_old_grammar() {
        let mut store = SettingsStore::new();
        ArtifactCompiler::compile(&mut store, full_request()).await.unwrap();
        let old = store.grammar().unwrap().fingerprint().to_string();

        let request = CompileRequest::new().lexicon("cat: N").grammar("S -> Unknown");
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert!(report.tagger.is_compiled());
        assert!(report.grammar.is_failed());
        assert_eq!(store.grammar().unwrap().fingerprint(), old);
        assert_eq!(store.sources().grammar, GRAMMAR);
        assert_eq!(store.sources().lexicon, "cat: N");
    }

    #[tokio::test]
    async fn test_invalid_pattern_aborts_without_changes() {
        let mut store = SettingsStore::new();
        let request = full_request().tokenizer(TokenizerSettings {
            choice: TokenizerChoice::Regexp,
            pattern: Some("[".to_string()),
        });
        let err = ArtifactCompiler::compile(&mut store, request).await.unwrap_err();
        assert!(matches!(err, WorkbenchError::InvalidPattern(_)));
        assert!(store.lattice().is_none());
        assert_eq!(store.options().tokenizer.choice, TokenizerChoice::Word);
    }

    /// 文件读取至少挂起一次，语法分支总是先于标注器分支结束
    fn slow_lexicon_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..5000 {
            writeln!(file, "word{i} N").unwrap();
        }
        writeln!(file, "the DT\ncat N\nsleeps V").unwrap();
        file
    }

    #[tokio::test]
    async fn test_report_waits_for_tagger_finishing_last() {
        let file = slow_lexicon_file();
        let category_list = |path| TaggerSettings {
            choice: TaggerChoice::CategoryList,
            lexicon_path: Some(path),
        };

        // 标注器最后成功，语法先失败
        let mut store = SettingsStore::new();
        let request = CompileRequest::new()
            .type_lattice(LATTICE)
            .tagger(category_list(file.path().to_path_buf()))
            .grammar("S -> Unknown");
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert!(report.tagger.is_compiled());
        assert!(report.grammar.is_failed());
        assert!(!report.ready);
        assert!(store.tagger().is_some());

        // 标注器最后失败，语法先成功
        let mut store = SettingsStore::new();
        let request = CompileRequest::new()
            .type_lattice(LATTICE)
            .tagger(category_list(file.path().with_extension("missing")))
            .grammar(GRAMMAR);
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert!(matches!(report.tagger.error(), Some(WorkbenchError::Io { .. })));
        assert!(report.grammar.is_compiled());
        assert_eq!(report.errors().count(), 1);
        assert!(store.grammar().is_some());
    }

    #[tokio::test]
    async fn test_report_waits_for_grammar_finishing_last() {
        // 特征结构标注器同步完成，语法分支在其后结束
        let mut store = SettingsStore::new();
        let request = CompileRequest::new()
            .type_lattice(LATTICE)
            .lexicon("cat: Missing")
            .grammar(GRAMMAR);
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert!(matches!(
            report.tagger.error(),
            Some(WorkbenchError::SourceParse { artifact: ArtifactKind::Tagger, .. })
        ));
        assert!(report.grammar.is_compiled());
        assert!(store.tagger().is_none());
        assert!(store.sources().lexicon.is_empty());

        let request = CompileRequest::new().lexicon(LEXICON).grammar("S -> Unknown");
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert!(report.tagger.is_compiled());
        assert!(matches!(
            report.grammar.error(),
            Some(WorkbenchError::SourceParse { artifact: ArtifactKind::Grammar, .. })
        ));
        assert!(report.ready);
        assert_eq!(store.sources().grammar, GRAMMAR);
    }

    #[tokio::test]
    async fn test_lexicon_text_not_saved_when_file_is_compiled() {
        let file = slow_lexicon_file();
        let mut store = SettingsStore::new();
        let request = CompileRequest::new().type_lattice(LATTICE).tagger(TaggerSettings {
            choice: TaggerChoice::CategoryList,
            lexicon_path: Some(file.path().to_path_buf()),
        });
        ArtifactCompiler::compile(&mut store, request).await.unwrap();

        // 存储的标注器读文件，提交的文本不参与编译
        let report = ArtifactCompiler::compile(&mut store, CompileRequest::new().lexicon("cat N"))
            .await
            .unwrap();
        assert!(report.tagger.is_compiled());
        assert!(store.sources().lexicon.is_empty());
        assert!(store.export().sources.lexicon.is_empty());

        // 不给文件路径时按文本编译并保存
        let request = CompileRequest::new().lexicon("cat N").tagger(TaggerSettings {
            choice: TaggerChoice::CategoryList,
            lexicon_path: None,
        });
        ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert_eq!(store.sources().lexicon, "cat N");
    }

    #[tokio::test]
    async fn test_category_list_reads_lexicon_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "the DT\ncat N\nsleeps V").unwrap();

        let mut store = SettingsStore::new();
        let request = CompileRequest::new().type_lattice(LATTICE).tagger(TaggerSettings {
            choice: TaggerChoice::CategoryList,
            lexicon_path: Some(file.path().to_path_buf()),
        });
        let report = ArtifactCompiler::compile(&mut store, request).await.unwrap();
        assert!(report.tagger.is_compiled());
        assert_eq!(store.tagger().unwrap().choice(), TaggerChoice::CategoryList);
        assert_eq!(store.options().tagger.choice, TaggerChoice::CategoryList);

        let missing = CompileRequest::new().tagger(TaggerSettings {
            choice: TaggerChoice::CategoryList,
            lexicon_path: Some(file.path().with_extension("missing")),
        });
        let report = ArtifactCompiler::compile(&mut store, missing).await.unwrap();
        assert!(matches!(report.tagger.error(), Some(WorkbenchError::Io { .. })));
        // 失败时保留原标注器
        assert!(store.tagger().is_some());
    }
}
