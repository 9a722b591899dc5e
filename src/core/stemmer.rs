//! 词干模块
//!
//! 两种可互换的算法：Porter 与 Lancaster（Paice/Husk）。
//! 输入统一转为小写；含非 ASCII 字母的词原样（小写）返回。

/// 词干器
pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// Porter 词干器
#[derive(Debug, Clone, Copy, Default)]
pub struct PorterStemmer;

impl Stemmer for PorterStemmer {
    fn stem(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if lower.len() <= 2 || !lower.bytes().all(|b| b.is_ascii_lowercase()) {
            return lower;
        }
        let mut state = PorterState {
            k: lower.len(),
            b: lower.into_bytes(),
            j: 0,
        };
        state.step1ab();
        if state.k > 1 {
            state.step1c();
            state.step2();
            state.step3();
            state.step4();
            state.step5();
        }
        state.b.truncate(state.k);
        String::from_utf8(state.b).unwrap_or_default()
    }
}

/// Porter 算法状态：`b[..k]` 为当前词，`b[..j]` 为当前词干
struct PorterState {
    b: Vec<u8>,
    k: usize,
    j: usize,
}

impl PorterState {
    fn cons(&self, i: usize) -> bool {
        match self.b[i] {
            b'a' | b'e' | b'i' | b'o' | b'u' => false,
            b'y' => i == 0 || !self.cons(i - 1),
            _ => true,
        }
    }

    /// 词干 `b[..j]` 中 VC 序列的个数
    fn m(&self) -> usize {
        let j = self.j;
        let mut i = 0;
        while i < j && self.cons(i) {
            i += 1;
        }
        let mut n = 0;
        loop {
            while i < j && !self.cons(i) {
                i += 1;
            }
            if i >= j {
                return n;
            }
            while i < j && self.cons(i) {
                i += 1;
            }
            n += 1;
            if i >= j {
                return n;
            }
        }
    }

    fn vowel_in_stem(&self) -> bool {
        (0..self.j).any(|i| !self.cons(i))
    }

    fn double_consonant(&self, i: usize) -> bool {
        i >= 1 && self.b[i] == self.b[i - 1] && self.cons(i)
    }

    /// `b[i-2..=i]` 是否为 辅音-元音-辅音，且末尾不是 w/x/y
    fn cvc(&self, i: usize) -> bool {
        if i < 2 || !self.cons(i) || self.cons(i - 1) || !self.cons(i - 2) {
            return false;
        }
        !matches!(self.b[i], b'w' | b'x' | b'y')
    }

    fn ends(&mut self, suffix: &str) -> bool {
        let suffix = suffix.as_bytes();
        if suffix.len() > self.k || &self.b[self.k - suffix.len()..self.k] != suffix {
            return false;
        }
        self.j = self.k - suffix.len();
        true
    }

    fn set_to(&mut self, replacement: &str) {
        self.b.truncate(self.j);
        self.b.extend_from_slice(replacement.as_bytes());
        self.k = self.b.len();
    }

    fn replace_if_measured(&mut self, replacement: &str) {
        if self.m() > 0 {
            self.set_to(replacement);
        }
    }

    /// 第一个命中的后缀决定结果（即使 m 条件不满足也不再尝试后面的）
    fn apply_first(&mut self, rules: &[(&str, &str)]) {
        for (suffix, replacement) in rules {
            if self.ends(suffix) {
                self.replace_if_measured(replacement);
                return;
            }
        }
    }

    fn step1ab(&mut self) {
        if self.b[self.k - 1] == b's' {
            if self.ends("sses") {
                self.k -= 2;
            } else if self.ends("ies") {
                self.set_to("i");
            } else if self.k >= 2 && self.b[self.k - 2] != b's' {
                self.k -= 1;
            }
        }
        self.b.truncate(self.k);

        if self.ends("eed") {
            if self.m() > 0 {
                self.k -= 1;
            }
        } else if (self.ends("ed") || self.ends("ing")) && self.vowel_in_stem() {
            self.k = self.j;
            if self.ends("at") {
                self.set_to("ate");
            } else if self.ends("bl") {
                self.set_to("ble");
            } else if self.ends("iz") {
                self.set_to("ize");
            } else if self.double_consonant(self.k - 1) {
                self.k -= 1;
                if matches!(self.b[self.k - 1], b'l' | b's' | b'z') {
                    self.k += 1;
                }
            } else {
                self.j = self.k;
                if self.m() == 1 && self.cvc(self.k - 1) {
                    self.set_to("e");
                }
            }
        }
        self.b.truncate(self.k);
    }

    fn step1c(&mut self) {
        if self.ends("y") && self.vowel_in_stem() {
            let last = self.k - 1;
            self.b[last] = b'i';
        }
    }

    fn step2(&mut self) {
        let rules: &[(&str, &str)] = match self.b[self.k - 2] {
            b'a' => &[("ational", "ate"), ("tional", "tion")],
            b'c' => &[("enci", "ence"), ("anci", "ance")],
            b'e' => &[("izer", "ize")],
            b'l' => &[("bli", "ble"), ("alli", "al"), ("entli", "ent"), ("eli", "e"), ("ousli", "ous")],
            b'o' => &[("ization", "ize"), ("ation", "ate"), ("ator", "ate")],
            b's' => &[("alism", "al"), ("iveness", "ive"), ("fulness", "ful"), ("ousness", "ous")],
            b't' => &[("aliti", "al"), ("iviti", "ive"), ("biliti", "ble")],
            b'g' => &[("logi", "log")],
            _ => &[],
        };
        self.apply_first(rules);
    }

    fn step3(&mut self) {
        let rules: &[(&str, &str)] = match self.b[self.k - 1] {
            b'e' => &[("icate", "ic"), ("ative", ""), ("alize", "al")],
            b'i' => &[("iciti", "ic")],
            b'l' => &[("ical", "ic"), ("ful", "")],
            b's' => &[("ness", "")],
            _ => &[],
        };
        self.apply_first(rules);
    }

    fn step4(&mut self) {
        if self.k < 2 {
            return;
        }
        let suffixes: &[&str] = match self.b[self.k - 2] {
            b'a' => &["al"],
            b'c' => &["ance", "ence"],
            b'e' => &["er"],
            b'i' => &["ic"],
            b'l' => &["able", "ible"],
            b'n' => &["ant", "ement", "ment", "ent"],
            b'o' => &["ion", "ou"],
            b's' => &["ism"],
            b't' => &["ate", "iti"],
            b'u' => &["ous"],
            b'v' => &["ive"],
            b'z' => &["ize"],
            _ => return,
        };
        let mut matched = false;
        for suffix in suffixes {
            if self.ends(suffix) {
                // -ion 只在 s/t 之后删除
                if *suffix == "ion" && !(self.j >= 1 && matches!(self.b[self.j - 1], b's' | b't')) {
                    continue;
                }
                matched = true;
                break;
            }
        }
        if matched && self.m() > 1 {
            self.k = self.j;
            self.b.truncate(self.k);
        }
    }

    fn step5(&mut self) {
        self.j = self.k;
        if self.b[self.k - 1] == b'e' {
            let m = self.m();
            if m > 1 || (m == 1 && !self.cvc(self.k - 2)) {
                self.k -= 1;
            }
        }
        if self.b[self.k - 1] == b'l' && self.double_consonant(self.k - 1) && self.m() > 1 {
            self.k -= 1;
        }
        self.b.truncate(self.k);
    }
}

/// Lancaster（Paice/Husk）词干器
///
/// 规则格式：倒序词尾、可选 `*`（仅对未改动过的词生效）、删除字符数、
/// 追加串、`>` 继续或 `.` 停止。
pub struct LancasterStemmer {
    rules: Vec<LancasterRule>,
}

struct LancasterRule {
    /// 正序词尾
    ending: String,
    intact_only: bool,
    remove: usize,
    append: String,
    stop: bool,
}

const LANCASTER_RULES: &[&str] = &[
    "ai*2.", "a*1.", "bb1.", "city3s.", "ci2>", "cn1t>", "dd1.", "dei3y>", "deec2ss.", "dee1.",
    "de2>", "dooh4>", "e1>", "feil1v.", "fi2>", "gni3>", "gai3y.", "ga2>", "gg1.", "ht*2.",
    "hsiug5ct.", "hsi3>", "i*1.", "i1y>", "ji1d.", "juf1s.", "ju1d.", "jo1d.", "jeh1r.",
    "jrev1t.", "jsim2t.", "jn1d.", "j1s.", "lbaifi6.", "lbai4y.", "lba3>", "lbi3.", "lib2l>",
    "lc1.", "lufi4y.", "luf3>", "lu2.", "lai3>", "lau3>", "la2>", "ll1.", "mui3.", "mu*2.",
    "msi3>", "mm1.", "nois4j>", "noix4ct.", "noi3>", "nai3>", "na2>", "nee0.", "ne2>", "nn1.",
    "pihs4>", "pp1.", "re2>", "rae0.", "ra2.", "ro2>", "ru2>", "rr1.", "rt1>", "rei3y>",
    "sei3y>", "sis2.", "si2>", "ssen4>", "ss0.", "suo3>", "su*2.", "s*1>", "s0.", "tacilp4y.",
    "ta2>", "tnem4>", "tne3>", "tna3>", "tpir2b.", "tpro2b.", "tcud1.", "tpmus2.", "tpec2iv.",
    "tulo2v.", "tsis0.", "tsi3>", "tt1.", "uqi3.", "ugo1.", "vis3j>", "vie0.", "vi2>", "ylb1>",
    "yli3y>", "ylp0.", "yl2>", "ygo1.", "yhp1.", "ymo1.", "ypo1.", "yti3>", "yte3>", "ytl2.",
    "yrtsi5.", "yra3>", "yro3>", "yfi3.", "ycn2t>", "yca3>", "zi2>", "zy1s.",
];

impl LancasterStemmer {
    pub fn new() -> Self {
        let rules = LANCASTER_RULES.iter().filter_map(|r| Self::parse_rule(r)).collect();
        Self { rules }
    }

    fn parse_rule(rule: &str) -> Option<LancasterRule> {
        let digit = rule.find(|c: char| c.is_ascii_digit())?;
        let (head, tail) = rule.split_at(digit);
        let intact_only = head.ends_with('*');
        let reversed = head.trim_end_matches('*');
        let remove = tail[..1].parse().ok()?;
        let rest = &tail[1..];
        let stop = rest.ends_with('.');
        let append = rest.trim_end_matches(['.', '>']).to_string();
        Some(LancasterRule {
            ending: reversed.chars().rev().collect(),
            intact_only,
            remove,
            append,
            stop,
        })
    }

    fn acceptable(word: &str, remove: usize) -> bool {
        let bytes = word.as_bytes();
        let is_vowel = |b: u8| matches!(b, b'a' | b'e' | b'i' | b'o' | b'u' | b'y');
        if bytes.len() < remove {
            return false;
        }
        let remaining = bytes.len() - remove;
        if is_vowel(bytes[0]) {
            remaining >= 2
        } else {
            remaining >= 3 && (is_vowel(bytes[1]) || is_vowel(bytes[2]))
        }
    }
}

impl Default for LancasterStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer for LancasterStemmer {
    fn stem(&self, word: &str) -> String {
        let intact = word.to_lowercase();
        if intact.is_empty() || !intact.bytes().all(|b| b.is_ascii_lowercase()) {
            return intact;
        }
        let mut current = intact.clone();

        loop {
            let Some(last) = current.chars().last() else {
                break;
            };
            let applied = self
                .rules
                .iter()
                .filter(|rule| rule.ending.ends_with(last))
                .find(|rule| {
                    current.ends_with(&rule.ending)
                        && (!rule.intact_only || current == intact)
                        && Self::acceptable(&current, rule.remove)
                });
            match applied {
                Some(rule) => {
                    current.truncate(current.len() - rule.remove);
                    current.push_str(&rule.append);
                    if rule.stop {
                        break;
                    }
                }
                None => break,
            }
        }
        current
    }
}
