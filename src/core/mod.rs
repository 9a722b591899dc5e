//! Core模块 - 编译与句子处理的核心逻辑

pub mod compiler;
pub mod error;
pub mod lookup;
pub mod models;
pub mod processor;
pub mod registry;
pub mod settings;
pub mod stemmer;
pub mod tagger;
pub mod tokenizer;
pub mod workbench;

#[cfg(test)]
mod sim_integration_tests;

pub use compiler::{ArtifactCompiler, BranchOutcome, CompileReport};
pub use error::{ArtifactKind, WorkbenchError};
pub use processor::SentenceProcessor;
pub use settings::{SettingsSnapshot, SettingsStore};
pub use workbench::Workbench;
