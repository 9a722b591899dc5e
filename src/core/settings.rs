//! 工作台设置
//!
//! 保存当前的算法选择、源文本和三个编译产物。
//! 只有编译器可以修改产物；流水线只拿到快照。

use crate::core::error::ArtifactKind;
use crate::core::models::{PipelineOptions, SettingsExport, SourceTexts};
use crate::core::tagger::TaggerArtifact;
use crate::formalism::{Grammar, TypeLattice};
use chrono::Utc;
use std::sync::Arc;

/// 设置存储（单写者）
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    options: PipelineOptions,
    sources: SourceTexts,
    lattice: Option<Arc<TypeLattice>>,
    tagger: Option<Arc<TaggerArtifact>>,
    grammar: Option<Arc<Grammar>>,
}

/// 流水线运行时使用的只读快照
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    pub options: PipelineOptions,
    pub lattice: Option<Arc<TypeLattice>>,
    pub tagger: Option<Arc<TaggerArtifact>>,
    pub grammar: Option<Arc<Grammar>>,
}

impl SettingsSnapshot {
    /// 缺少的产物
    pub fn missing(&self) -> Vec<ArtifactKind> {
        missing_kinds(self.lattice.is_some(), self.tagger.is_some(), self.grammar.is_some())
    }
}

fn missing_kinds(lattice: bool, tagger: bool, grammar: bool) -> Vec<ArtifactKind> {
    [
        (lattice, ArtifactKind::TypeLattice),
        (tagger, ArtifactKind::Tagger),
        (grammar, ArtifactKind::Grammar),
    ]
    .into_iter()
    .filter(|(present, _)| !present)
    .map(|(_, kind)| kind)
    .collect()
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn sources(&self) -> &SourceTexts {
        &self.sources
    }

    pub fn lattice(&self) -> Option<&Arc<TypeLattice>> {
        self.lattice.as_ref()
    }

    pub fn tagger(&self) -> Option<&Arc<TaggerArtifact>> {
        self.tagger.as_ref()
    }

    pub fn grammar(&self) -> Option<&Arc<Grammar>> {
        self.grammar.as_ref()
    }

    /// 三个产物是否都已编译
    pub fn ready(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn missing(&self) -> Vec<ArtifactKind> {
        missing_kinds(self.lattice.is_some(), self.tagger.is_some(), self.grammar.is_some())
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            options: self.options.clone(),
            lattice: self.lattice.clone(),
            tagger: self.tagger.clone(),
            grammar: self.grammar.clone(),
        }
    }

    /// 导出算法选择和源文本，不含编译产物
    pub fn export(&self) -> SettingsExport {
        SettingsExport {
            exported_at: Utc::now(),
            options: self.options.clone(),
            sources: self.sources.clone(),
        }
    }

    pub(crate) fn options_mut(&mut self) -> &mut PipelineOptions {
        &mut self.options
    }

    pub(crate) fn sources_mut(&mut self) -> &mut SourceTexts {
        &mut self.sources
    }

    /// 替换类型格，同时作废依赖它的两个产物
    pub(crate) fn replace_lattice(&mut self, lattice: TypeLattice) {
        self.lattice = Some(Arc::new(lattice));
        self.tagger = None;
        self.grammar = None;
    }

    pub(crate) fn set_tagger(&mut self, tagger: TaggerArtifact) {
        self.tagger = Some(Arc::new(tagger));
    }

    pub(crate) fn set_grammar(&mut self, grammar: Grammar) {
        self.grammar = Some(Arc::new(grammar));
    }
}
