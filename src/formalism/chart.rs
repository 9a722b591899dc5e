//! 线图分析器
//!
//! - CYK / HeadCorner：自底向上按跨度填表，产生 `CykItem`
//! - Earley / LeftCorner：Earley 预测-扫描-完成，产生 `EarleyItem`

use super::feature::FeatureStructure;
use super::grammar::Grammar;
use super::lattice::{TypeLattice, TOP};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// 分析算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ParsingAlgorithm {
    #[default]
    #[serde(rename = "CYK")]
    Cyk,
    HeadCorner,
    Earley,
    LeftCorner,
}

impl ParsingAlgorithm {
    /// 该算法在线图中产生的项类型
    pub fn item_kind(self) -> ItemKind {
        match self {
            ParsingAlgorithm::Cyk | ParsingAlgorithm::HeadCorner => ItemKind::CykItem,
            ParsingAlgorithm::Earley | ParsingAlgorithm::LeftCorner => ItemKind::EarleyItem,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParsingAlgorithm::Cyk => "CYK",
            ParsingAlgorithm::HeadCorner => "HeadCorner",
            ParsingAlgorithm::Earley => "Earley",
            ParsingAlgorithm::LeftCorner => "LeftCorner",
        }
    }
}

impl fmt::Display for ParsingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 线图项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    CykItem,
    EarleyItem,
}

/// 分析器输入：一个词及其所有读法
#[derive(Debug, Clone)]
pub struct Terminal {
    pub token: String,
    pub readings: Vec<FeatureStructure>,
}

/// 线图项
#[derive(Debug, Clone, Serialize)]
pub struct ParseItem {
    pub id: usize,
    pub kind: ItemKind,
    pub lhs: String,
    /// 词汇项的右部是词本身
    pub rhs: Vec<String>,
    pub dot: usize,
    pub from: usize,
    pub to: usize,
    pub children: Vec<usize>,
    pub lexical: bool,
    /// 仅在合一模式下的完整项上存在
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_structure: Option<FeatureStructure>,
    #[serde(skip)]
    rule: Option<usize>,
}

impl ParseItem {
    pub fn is_complete(&self) -> bool {
        self.dot == self.rhs.len()
    }

    fn next_symbol(&self) -> Option<&str> {
        self.rhs.get(self.dot).map(|s| s.as_str())
    }
}

impl fmt::Display for ParseItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rhs: Vec<&str> = self.rhs.iter().map(|s| s.as_str()).collect();
        if self.kind == ItemKind::EarleyItem {
            rhs.insert(self.dot, "•");
        }
        write!(f, "[{} -> {}, {}, {}]", self.lhs, rhs.join(" "), self.from, self.to)
    }
}

/// 分析线图
#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    items: Vec<ParseItem>,
    input_len: usize,
}

impl Chart {
    fn new(input_len: usize) -> Self {
        Self {
            items: Vec::new(),
            input_len,
        }
    }

    fn push(&mut self, mut item: ParseItem) -> usize {
        let id = self.items.len();
        item.id = id;
        self.items.push(item);
        id
    }

    /// 覆盖整个输入、以开始符号为根的完整项
    pub fn full_parse_items(&self, start: &str, kind: ItemKind) -> Vec<&ParseItem> {
        self.items
            .iter()
            .filter(|item| {
                item.kind == kind
                    && item.is_complete()
                    && item.lhs == start
                    && item.from == 0
                    && item.to == self.input_len
                    && self.input_len > 0
            })
            .collect()
    }

    /// 分析过程中创建的项总数
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[ParseItem] {
        &self.items
    }
}

/// 子项之间的特征冲突
struct FeatureClash;

/// 分析器配置
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub algorithm: ParsingAlgorithm,
    pub grammar: Arc<Grammar>,
    pub lattice: Arc<TypeLattice>,
    pub unify: bool,
    pub use_appropriate_function: bool,
}

impl ParserConfig {
    /// 读法能否作为语法符号：合一模式下按类型包含，否则按名称相等
    fn matches(&self, symbol: &str, reading: &FeatureStructure) -> bool {
        if self.unify {
            self.lattice.subsumes(symbol, reading.type_name())
        } else {
            symbol == reading.type_name()
        }
    }

    /// 可作为 `symbol` 的读法及其下标；非合一模式只取第一个
    fn readings_for<'t>(&self, symbol: &str, terminal: &'t Terminal) -> Vec<(usize, &'t FeatureStructure)> {
        let limit = if self.unify { usize::MAX } else { 1 };
        terminal
            .readings
            .iter()
            .enumerate()
            .filter(|(_, r)| self.matches(symbol, r))
            .take(limit)
            .collect()
    }

    fn restrict(&self, fs: FeatureStructure) -> FeatureStructure {
        if self.use_appropriate_function {
            fs.restrict_to_appropriate(&self.lattice)
        } else {
            fs
        }
    }

    /// 词汇项的结构：语法符号与读法合一
    fn lexical_structure(&self, symbol: &str, reading: &FeatureStructure) -> Option<FeatureStructure> {
        if !self.unify {
            return None;
        }
        FeatureStructure::atomic(symbol)
            .unify(reading, &self.lattice)
            .map(|fs| self.restrict(fs))
    }

    /// 子项除 `dtrN` 以外的特征逐个合一
    fn agreement(&self, children: &[&ParseItem]) -> Result<FeatureStructure, FeatureClash> {
        children
            .iter()
            .filter_map(|child| child.feature_structure.as_ref())
            .try_fold(FeatureStructure::atomic(TOP), |shared, fs| {
                shared.unify(&fs.shared_features(), &self.lattice).ok_or(FeatureClash)
            })
    }

    /// 母节点结构
    ///
    /// 各子项除 `dtrN` 以外的特征逐个合一后上传到母节点，子项本身挂在 `dtrN` 下。
    /// 任意两个子项的特征冲突时返回 `FeatureClash`，该项不进入线图。
    fn node_structure(
        &self,
        lhs: &str,
        children: &[&ParseItem],
    ) -> Result<Option<FeatureStructure>, FeatureClash> {
        if !self.unify {
            return Ok(None);
        }
        let mother = self
            .agreement(children)?
            .features()
            .iter()
            .fold(FeatureStructure::atomic(lhs), |fs, (name, value)| {
                fs.with_feature(name.clone(), value.clone())
            });
        let fs = children.iter().enumerate().fold(mother, |fs, (i, child)| {
            let value = child
                .feature_structure
                .clone()
                .unwrap_or_else(|| FeatureStructure::atomic(child.lhs.clone()));
            fs.with_feature(format!("dtr{}", i + 1), value)
        });
        Ok(Some(self.restrict(fs)))
    }
}

/// 线图分析器
pub trait ChartParser: Send + Sync {
    fn parse(&self, input: &[Terminal]) -> Chart;
}

/// 按配置创建分析器
pub fn create_parser(config: ParserConfig) -> Box<dyn ChartParser> {
    match config.algorithm.item_kind() {
        ItemKind::CykItem => Box::new(BottomUpParser { config }),
        ItemKind::EarleyItem => Box::new(EarleyParser { config }),
    }
}

/// 自底向上跨度分析（CYK 推广到任意长度右部）
struct BottomUpParser {
    config: ParserConfig,
}

type SpanIndex = HashMap<(String, usize, usize), Vec<usize>>;

/// 规则在某个跨度上的一种成功组合
struct Derivation {
    children: Vec<usize>,
    feature_structure: Option<FeatureStructure>,
}

struct SpanSearch<'a> {
    config: &'a ParserConfig,
    chart: &'a Chart,
    index: &'a SpanIndex,
    lhs: &'a str,
}

impl SpanSearch<'_> {
    /// 为 rhs 在 [from, to) 上找第一种切分和子项选择，使母节点结构能够建立
    fn find(&self, rhs: &[String], from: usize, to: usize, prefix: &mut Vec<usize>) -> Option<Derivation> {
        let Some((first, rest)) = rhs.split_first() else {
            if from != to {
                return None;
            }
            let children: Vec<&ParseItem> = prefix.iter().map(|&c| &self.chart.items[c]).collect();
            let feature_structure = self.config.node_structure(self.lhs, &children).ok()?;
            return Some(Derivation {
                children: prefix.clone(),
                feature_structure,
            });
        };
        for mid in (from + 1)..=(to - rest.len()) {
            let Some(ids) = self.index.get(&(first.clone(), from, mid)) else {
                continue;
            };
            for &id in ids {
                prefix.push(id);
                if let Some(found) = self.find(rest, mid, to, prefix) {
                    return Some(found);
                }
                prefix.pop();
            }
        }
        None
    }
}

impl ChartParser for BottomUpParser {
    fn parse(&self, input: &[Terminal]) -> Chart {
        let n = input.len();
        let grammar = &self.config.grammar;
        let mut chart = Chart::new(n);
        let mut index: SpanIndex = HashMap::new();
        let mut built: HashSet<(usize, usize, usize)> = HashSet::new();

        for (i, terminal) in input.iter().enumerate() {
            for symbol in grammar.symbols() {
                for (_, reading) in self.config.readings_for(symbol, terminal) {
                    let id = chart.push(ParseItem {
                        id: 0,
                        kind: ItemKind::CykItem,
                        lhs: symbol.to_string(),
                        rhs: vec![terminal.token.clone()],
                        dot: 1,
                        from: i,
                        to: i + 1,
                        children: Vec::new(),
                        lexical: true,
                        feature_structure: self.config.lexical_structure(symbol, reading),
                        rule: None,
                    });
                    index.entry((symbol.to_string(), i, i + 1)).or_default().push(id);
                }
            }
        }

        for width in 1..=n {
            for from in 0..=(n - width) {
                let to = from + width;
                // 单元规则可能在同一跨度上连锁，直到不再产生新项
                loop {
                    let mut added = false;
                    for (r, rule) in grammar.rules().iter().enumerate() {
                        if rule.rhs.len() > width || built.contains(&(r, from, to)) {
                            continue;
                        }
                        let search = SpanSearch {
                            config: &self.config,
                            chart: &chart,
                            index: &index,
                            lhs: &rule.lhs,
                        };
                        let Some(Derivation {
                            children,
                            feature_structure,
                        }) = search.find(&rule.rhs, from, to, &mut Vec::new())
                        else {
                            continue;
                        };
                        built.insert((r, from, to));
                        let id = chart.push(ParseItem {
                            id: 0,
                            kind: ItemKind::CykItem,
                            lhs: rule.lhs.clone(),
                            rhs: rule.rhs.clone(),
                            dot: rule.rhs.len(),
                            from,
                            to,
                            children,
                            lexical: false,
                            feature_structure,
                            rule: Some(r),
                        });
                        index.entry((rule.lhs.clone(), from, to)).or_default().push(id);
                        added = true;
                    }
                    if !added {
                        break;
                    }
                }
            }
        }

        chart
    }
}

/// Earley 分析
struct EarleyParser {
    config: ParserConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ItemOrigin {
    Rule(usize),
    /// 语法符号和读法下标
    Lexical(String, usize),
}

/// 去重键；合一模式下子项的共享特征也计入
type ItemKey = (ItemOrigin, usize, usize, usize, Option<FeatureStructure>);

struct EarleyState<'a> {
    config: &'a ParserConfig,
    chart: Chart,
    sets: Vec<Vec<usize>>,
    seen: HashSet<ItemKey>,
}

impl<'a> EarleyState<'a> {
    /// 去重后加入第 `item.to` 个状态集
    fn add(&mut self, item: ParseItem, origin: ItemOrigin, agreement: Option<FeatureStructure>) {
        if !self.seen.insert((origin, item.dot, item.from, item.to, agreement)) {
            return;
        }
        let to = item.to;
        let id = self.chart.push(item);
        self.sets[to].push(id);
    }

    fn predict(&mut self, symbol: &str, k: usize) {
        for (r, rule) in self.config.grammar.rules().iter().enumerate() {
            if rule.lhs == symbol {
                self.add(
                    ParseItem {
                        id: 0,
                        kind: ItemKind::EarleyItem,
                        lhs: rule.lhs.clone(),
                        rhs: rule.rhs.clone(),
                        dot: 0,
                        from: k,
                        to: k,
                        children: Vec::new(),
                        lexical: false,
                        feature_structure: None,
                        rule: Some(r),
                    },
                    ItemOrigin::Rule(r),
                    None,
                );
            }
        }
    }

    fn scan(&mut self, symbol: &str, k: usize, terminal: &Terminal) {
        for (r, reading) in self.config.readings_for(symbol, terminal) {
            self.add(
                ParseItem {
                    id: 0,
                    kind: ItemKind::EarleyItem,
                    lhs: symbol.to_string(),
                    rhs: vec![terminal.token.clone()],
                    dot: 1,
                    from: k,
                    to: k + 1,
                    children: Vec::new(),
                    lexical: true,
                    feature_structure: self.config.lexical_structure(symbol, reading),
                    rule: None,
                },
                ItemOrigin::Lexical(symbol.to_string(), r),
                None,
            );
        }
    }

    fn complete(&mut self, completed: usize, k: usize) {
        let (lhs, from) = {
            let item = &self.chart.items[completed];
            (item.lhs.clone(), item.from)
        };
        let waiting: Vec<usize> = self.sets[from]
            .iter()
            .copied()
            .filter(|&w| self.chart.items[w].next_symbol() == Some(lhs.as_str()))
            .collect();

        for w in waiting {
            let mut advanced = self.chart.items[w].clone();
            advanced.dot += 1;
            advanced.to = k;
            advanced.children.push(completed);
            let child_items: Vec<&ParseItem> =
                advanced.children.iter().map(|&c| &self.chart.items[c]).collect();
            // 部分项上的冲突也能提前剪掉
            let agreement = if self.config.unify {
                match self.config.agreement(&child_items) {
                    Ok(shared) => Some(shared),
                    Err(FeatureClash) => continue,
                }
            } else {
                None
            };
            if advanced.is_complete() {
                match self.config.node_structure(&advanced.lhs, &child_items) {
                    Ok(fs) => advanced.feature_structure = fs,
                    Err(FeatureClash) => continue,
                }
            }
            let Some(r) = advanced.rule else {
                continue;
            };
            self.add(advanced, ItemOrigin::Rule(r), agreement);
        }
    }
}

impl ChartParser for EarleyParser {
    fn parse(&self, input: &[Terminal]) -> Chart {
        let n = input.len();
        let mut state = EarleyState {
            config: &self.config,
            chart: Chart::new(n),
            sets: vec![Vec::new(); n + 1],
            seen: HashSet::new(),
        };

        state.predict(self.config.grammar.start_symbol(), 0);

        for k in 0..=n {
            let mut idx = 0;
            while idx < state.sets[k].len() {
                let id = state.sets[k][idx];
                idx += 1;

                let next = state.chart.items[id].next_symbol().map(|s| s.to_string());
                match next {
                    None => state.complete(id, k),
                    Some(symbol) => {
                        state.predict(&symbol, k);
                        if k < n {
                            state.scan(&symbol, k, &input[k]);
                        }
                    }
                }
            }
        }

        state.chart
    }
}
