//! 外部词典标注
//!
//! 每个词独立查询外部词典服务，全部查询并发发出，
//! 在所有查询结束（成功、失败或超时）之后统一汇总。
//! 单个词失败不会让整句失败：该词被标为 `unknown` 并记录下来。

use crate::core::error::WorkbenchError;
use crate::core::models::{TagList, TaggedWord};
use crate::core::tagger::TagOutcome;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// 查询失败时使用的占位标签
pub const UNKNOWN_TAG: &str = "unknown";

/// 外部词典返回的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalEntry {
    /// 词性
    pub pos: String,
}

/// 外部词典服务
#[async_trait]
pub trait LexicalDatabase: Send + Sync {
    /// 查询一个词的全部词性记录
    async fn lookup(&self, token: &str) -> Result<Vec<LexicalEntry>, WorkbenchError>;
}

/// 基于 HTTP 的外部词典：`GET {endpoint}?word=...`，返回 `[{"pos": "n"}, ...]`
pub struct HttpLexicalDatabase {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpLexicalDatabase {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// 使用自定义客户端（代理、超时等）
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch(&self, token: &str) -> reqwest::Result<Vec<LexicalEntry>> {
        self.client
            .get(&self.endpoint)
            .query(&[("word", token)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<LexicalEntry>>()
            .await
    }
}

#[async_trait]
impl LexicalDatabase for HttpLexicalDatabase {
    async fn lookup(&self, token: &str) -> Result<Vec<LexicalEntry>, WorkbenchError> {
        self.fetch(token).await.map_err(|e| WorkbenchError::Lookup {
            token: token.to_string(),
            message: e.to_string(),
        })
    }
}

/// 内存中的外部词典，可以为单个词设置延迟或失败
#[derive(Debug, Clone, Default)]
pub struct StaticLexicalDatabase {
    entries: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
}

impl StaticLexicalDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry<I, S>(mut self, word: &str, pos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .insert(word.to_lowercase(), pos.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_delay(mut self, word: &str, delay: Duration) -> Self {
        self.delays.insert(word.to_lowercase(), delay);
        self
    }

    pub fn with_failure(mut self, word: &str) -> Self {
        self.failing.insert(word.to_lowercase());
        self
    }
}

#[async_trait]
impl LexicalDatabase for StaticLexicalDatabase {
    async fn lookup(&self, token: &str) -> Result<Vec<LexicalEntry>, WorkbenchError> {
        let key = token.to_lowercase();
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(&key) {
            return Err(WorkbenchError::Lookup {
                token: token.to_string(),
                message: "服务不可用".to_string(),
            });
        }
        Ok(self
            .entries
            .get(&key)
            .map(|pos| pos.iter().map(|p| LexicalEntry { pos: p.clone() }).collect())
            .unwrap_or_default())
    }
}

async fn lookup_one(
    db: &dyn LexicalDatabase,
    token: &str,
    timeout: Option<Duration>,
) -> Result<Vec<LexicalEntry>, WorkbenchError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, db.lookup(token))
            .await
            .unwrap_or_else(|_| {
                Err(WorkbenchError::Lookup {
                    token: token.to_string(),
                    message: format!("超时 ({} ms)", limit.as_millis()),
                })
            }),
        None => db.lookup(token).await,
    }
}

/// 并发查询所有词，全部结束后按原顺序返回标注结果
pub async fn tag_with_lookup(
    db: &dyn LexicalDatabase,
    tokens: &[String],
    timeout: Option<Duration>,
) -> TagOutcome {
    let results = join_all(tokens.iter().map(|token| lookup_one(db, token, timeout))).await;

    let mut words = Vec::with_capacity(tokens.len());
    let mut failures = Vec::new();
    for (token, result) in tokens.iter().zip(results) {
        let tags = match result {
            Ok(entries) => {
                let mut tags: Vec<String> = Vec::new();
                for entry in entries {
                    if !tags.contains(&entry.pos) {
                        tags.push(entry.pos);
                    }
                }
                tags
            }
            Err(e) => {
                tracing::warn!("外部词典查询失败，标为 {}: {}", UNKNOWN_TAG, e);
                failures.push(token.clone());
                vec![UNKNOWN_TAG.to_string()]
            }
        };
        words.push(TaggedWord::new(token.clone(), TagList::Categories(tags)));
    }

    tracing::debug!("外部词典查询完成: {} 个词, {} 个失败", words.len(), failures.len());
    TagOutcome {
        words,
        transcript: None,
        failures,
    }
}
