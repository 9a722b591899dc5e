use crate::core::error::{ArtifactKind, WorkbenchError};
use crate::core::lookup::StaticLexicalDatabase;
use crate::core::models::{
    CompileRequest, ParserSettings, PostProcessSettings, TagList, TaggerChoice, TaggerSettings,
    TokenizerChoice, TokenizerSettings,
};
use crate::core::processor::SentenceProcessor;
use crate::core::workbench::Workbench;
use crate::formalism::{ItemKind, ParsingAlgorithm};
use crate::storage::ConfigManager;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const LATTICE: &str = "\
# 句法类别
S
NP
VP
Det
N
V
PP
P
";

const LEXICON: &str = "\
the: Det
a: Det
cat: N
dog: N
mat: N
sleeps: V
sees: V
on: P
";

const GRAMMAR: &str = "\
start S
S -> NP VP
NP -> Det N
NP -> NP PP
VP -> V
VP -> V NP
VP -> VP PP
PP -> P NP
";

fn full_request() -> CompileRequest {
    CompileRequest::new()
        .type_lattice(LATTICE)
        .lexicon(LEXICON)
        .grammar(GRAMMAR)
}

fn with_algorithm(request: CompileRequest, algorithm: ParsingAlgorithm) -> CompileRequest {
    request.parser(ParserSettings {
        algorithm,
        unify: false,
        use_appropriate_function: false,
    })
}

#[tokio::test]
async fn sim_every_algorithm_agrees_on_membership() {
    let sentences = [
        ("the cat sleeps", true),
        ("the cat sees a dog on the mat", true),
        ("cat the sleeps", false),
        ("sleeps", false),
    ];
    for algorithm in [
        ParsingAlgorithm::Cyk,
        ParsingAlgorithm::HeadCorner,
        ParsingAlgorithm::Earley,
        ParsingAlgorithm::LeftCorner,
    ] {
        let workbench = Workbench::new();
        let report = workbench
            .compile(with_algorithm(full_request(), algorithm))
            .await
            .unwrap();
        assert!(report.ready);

        for (sentence, expected) in sentences {
            let result = workbench.process(sentence).await.unwrap();
            assert_eq!(result.in_language, expected, "{algorithm}: {sentence}");
            assert_eq!(result.algorithm, algorithm);
            let kind = algorithm.item_kind();
            assert!(result.full_parse_items.iter().all(|item| item.kind == kind));
        }
    }
}

#[tokio::test]
async fn sim_long_sentence_with_pp_parses() {
    let workbench = Workbench::new();
    workbench
        .compile(with_algorithm(full_request(), ParsingAlgorithm::Earley))
        .await
        .unwrap();
    let result = workbench.process("the cat sees a dog on the mat").await.unwrap();
    assert!(!result.full_parse_items.is_empty());
    assert!(result.item_count > result.full_parse_items.len());
    assert!(result.parsing_time_ms >= 0.0);
    assert!(result.chart.is_some());
}

#[tokio::test]
async fn sim_lattice_edit_requires_recompiling_dependents() {
    let workbench = Workbench::new();
    workbench.compile(full_request()).await.unwrap();
    assert!(workbench.process("the cat sleeps").await.unwrap().in_language);

    // 只改类型格：标注器和语法被作废
    let report = workbench
        .compile(CompileRequest::new().type_lattice(format!("{LATTICE}Adj\n")))
        .await
        .unwrap();
    assert!(!report.ready);
    let err = workbench.process("the cat sleeps").await.unwrap_err();
    assert!(matches!(
        err,
        WorkbenchError::NotConfigured { ref missing }
            if missing == &vec![ArtifactKind::Tagger, ArtifactKind::Grammar]
    ));

    // 重新提交词典和语法后恢复
    let report = workbench
        .compile(CompileRequest::new().lexicon(LEXICON).grammar(GRAMMAR))
        .await
        .unwrap();
    assert!(report.ready);
    assert!(workbench.process("the cat sleeps").await.unwrap().in_language);
}

#[tokio::test]
async fn sim_export_import_through_settings_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let original = Workbench::new();
    original
        .compile(full_request().tokenizer(TokenizerSettings {
            choice: TokenizerChoice::Treebank,
            pattern: None,
        }))
        .await
        .unwrap();
    let export = original.export_settings().await;
    ConfigManager::save_settings(&path, &export).unwrap();

    let restored = Workbench::new();
    let loaded = ConfigManager::load_settings(&path).unwrap();
    let report = restored.import_settings(&loaded).await.unwrap();
    assert!(report.ready);

    let before = original.process("The dog sees the cat.").await.unwrap();
    let after = restored.process("The dog sees the cat.").await.unwrap();
    assert_eq!(before.tokens, after.tokens);
    assert_eq!(after.tokens.last().map(String::as_str), Some("."));
    assert_eq!(before.in_language, after.in_language);
    assert_eq!(before.categories, after.categories);
}

#[tokio::test]
async fn sim_category_list_tagger_from_file_with_post_processing() {
    let dir = tempdir().unwrap();
    let lexicon_path = dir.path().join("lexicon.txt");
    std::fs::write(&lexicon_path, "cat N\ndog N\nsleeps V\nsees V\n").unwrap();

    let workbench = Workbench::new();
    let report = workbench
        .compile(
            CompileRequest::new()
                .type_lattice("S\nNP\nVP\nDT\nN\nV")
                .tagger(TaggerSettings {
                    choice: TaggerChoice::CategoryList,
                    lexicon_path: Some(lexicon_path),
                })
                .grammar("S -> NP VP\nNP -> DT N\nVP -> V NP")
                .post_process(PostProcessSettings {
                    function_words: true,
                    strip_untagged: true,
                }),
        )
        .await
        .unwrap();
    assert!(report.ready);

    let result = workbench.process("the dog sees qqq the cat").await.unwrap();
    assert_eq!(result.stripped, vec!["qqq"]);
    assert_eq!(result.categories, vec!["DT", "N", "V", "DT", "N"]);
    assert!(result.tagged.iter().all(|w| matches!(w.tags, TagList::Categories(_))));
    assert!(result.in_language);
}

#[tokio::test(start_paused = true)]
async fn sim_lookup_tagging_waits_for_slowest_word() {
    let database = StaticLexicalDatabase::new()
        .with_entry("dogs", ["NP"])
        .with_delay("dogs", Duration::from_millis(40))
        .with_entry("bark", ["VP"])
        .with_delay("bark", Duration::from_millis(10));
    let processor = SentenceProcessor::new()
        .with_lookup(Arc::new(database))
        .with_lookup_timeout(Some(Duration::from_millis(100)));
    let workbench = Workbench::with_processor(processor);
    workbench
        .compile(
            CompileRequest::new()
                .type_lattice("S\nNP\nVP")
                .tagger(TaggerSettings {
                    choice: TaggerChoice::Lookup,
                    lexicon_path: None,
                })
                .grammar("S -> NP VP"),
        )
        .await
        .unwrap();

    let result = workbench.process("dogs bark").await.unwrap();
    assert_eq!(result.categories, vec!["NP", "VP"]);
    assert!(result.lookup_failures.is_empty());
    assert!(result.in_language);
}

#[tokio::test]
async fn sim_unification_respects_appropriate_features() {
    let lattice = "\
S : dtr1
Agr : num
NP : agr
VP
Det
N
V
";
    let lexicon = "\
the: Det
cats: N
sleep: V
";
    let grammar = "S -> NP VP\nNP -> Det N\nVP -> V";
    let request = CompileRequest::new()
        .type_lattice(lattice)
        .lexicon(lexicon)
        .grammar(grammar)
        .parser(ParserSettings {
            algorithm: ParsingAlgorithm::Cyk,
            unify: true,
            use_appropriate_function: true,
        });
    let workbench = Workbench::new();
    assert!(workbench.compile(request).await.unwrap().ready);

    let result = workbench.process("the cats sleep").await.unwrap();
    assert!(result.in_language);
    assert_eq!(result.full_parse_items[0].kind, ItemKind::CykItem);
    // S 只保留 dtr1，NP 上没有声明 dtr 特征
    assert_eq!(result.full_parse_structures, vec!["S[\n  dtr1: NP\n]".to_string()]);
}

#[tokio::test]
async fn sim_unification_enforces_number_agreement() {
    let lattice = "S\nNP\nVP\nDet\nN\nV\nSg\nPl";
    let lexicon = "\
the: Det[num=Pl] | Det[num=Sg]
these: Det[num=Pl]
cat: N[num=Sg]
cats: N[num=Pl]
sleep: V[num=Pl]
";
    let grammar = "S -> NP VP\nNP -> Det N\nVP -> V";
    let request = |unify| {
        CompileRequest::new()
            .type_lattice(lattice)
            .lexicon(lexicon)
            .grammar(grammar)
            .parser(ParserSettings {
                algorithm: ParsingAlgorithm::Earley,
                unify,
                use_appropriate_function: false,
            })
    };

    let workbench = Workbench::new();
    assert!(workbench.compile(request(true)).await.unwrap().ready);
    assert!(workbench.process("the cats sleep").await.unwrap().in_language);
    assert!(workbench.process("these cats sleep").await.unwrap().in_language);
    let rejected = workbench.process("these cat sleep").await.unwrap();
    assert!(!rejected.in_language);
    assert!(rejected.full_parse_structures.is_empty());

    // 关闭合一后只检查类别
    workbench.compile(request(false)).await.unwrap();
    assert!(workbench.process("these cat sleep").await.unwrap().in_language);
}
