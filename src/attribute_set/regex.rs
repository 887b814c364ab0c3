//! Possibly infinite string sets given by regular expressions.
//!
//! A [`RegexSet`] denotes the language of a single anchored pattern over the
//! byte alphabet. Decision procedures (membership, emptiness, containment,
//! universality) walk `regex-automata` dense DFAs and are sound and complete.
//! Intersection, difference and complement go through an explicit finite
//! automaton: product construction, Moore minimization, and state-elimination
//! extraction back to a pattern. Extracted patterns are deterministic but not
//! syntactically minimal; they are language-equivalent to the exact result.
//!
//! Patterns are compiled non-Unicode and non-UTF-8, so the alphabet is the
//! 256 bytes and complement is taken relative to the set of all byte strings.
//!
//! # Citations
//! - Product construction & closure properties: Hopcroft & Ullman,
//!   "Introduction to Automata Theory, Languages, and Computation" (1979)
//! - DFA minimization: Moore, "Gedanken-experiments on sequential machines" (1956)
//! - State elimination: Brzozowski & McCluskey, "Signal flow graph techniques
//!   for sequential circuit state diagrams" (1963)

use super::AttributeSetError;
use regex_automata::{
    dfa::{dense, Automaton, StartKind},
    util::syntax,
    Anchored, Input,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

type Dfa = dense::DFA<Vec<u32>>;

/// A set of strings defined by a regular expression.
///
/// Holds the pattern together with its compiled DFA; construction validates
/// the pattern, so every held pattern is compilable. Structural equality is
/// on the pattern text (a fast path); language equality is
/// [`RegexSet::is_subset`] both ways.
#[derive(Debug, Clone)]
pub struct RegexSet {
    pattern: String,
    dfa: Dfa,
}

impl PartialEq for RegexSet {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for RegexSet {}

impl Serialize for RegexSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.pattern)
    }
}

impl<'de> Deserialize<'de> for RegexSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        RegexSet::new(&pattern).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for RegexSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/", self.pattern)
    }
}

impl RegexSet {
    /// Compiles a pattern, validating it.
    pub fn new(pattern: &str) -> Result<Self, AttributeSetError> {
        let dfa = compile(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            dfa,
        })
    }

    /// Builds the finite language of the given literals (as an alternation).
    ///
    /// The iterator must be non-empty: the empty language has no pattern and
    /// is represented by the `Empty` attribute-set variant instead.
    pub fn from_literals<'a>(
        literals: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AttributeSetError> {
        let parts: Vec<String> = literals.into_iter().map(escape_literal).collect();
        if parts.is_empty() {
            return Err(AttributeSetError::MalformedRegex {
                pattern: String::new(),
                reason: "cannot build a pattern for an empty literal set".to_string(),
            });
        }
        RegexSet::new(&parts.join("|"))
    }

    /// The underlying pattern text.
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whole-string membership test.
    pub fn accepts(&self, text: &str) -> bool {
        let input = Input::new(text).anchored(Anchored::Yes);
        let mut state = match self.dfa.start_state_forward(&input) {
            Ok(state) => state,
            Err(_) => return false,
        };
        for &byte in text.as_bytes() {
            state = self.dfa.next_state(state, byte);
            if self.dfa.is_dead_state(state) || self.dfa.is_quit_state(state) {
                return false;
            }
        }
        self.dfa.is_match_state(self.dfa.next_eoi_state(state))
    }

    /// Whether the language is empty.
    pub fn is_empty(&self) -> bool {
        !explore(&self.dfa).accept.iter().any(|&a| a)
    }

    /// Whether the language is all byte strings.
    pub fn is_universal(&self) -> bool {
        explore(&self.dfa).accept.iter().all(|&a| a)
    }

    /// Regular-language containment `L(self) ⊆ L(other)`.
    ///
    /// Product walk over the two DFAs: the containment fails exactly when
    /// some reachable state pair accepts on the left and rejects on the
    /// right.
    pub fn is_subset(&self, other: &RegexSet) -> bool {
        let left = explore(&self.dfa);
        let right = explore(&other.dfa);
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert((0usize, 0usize));
        queue.push_back((0usize, 0usize));
        while let Some((i, j)) = queue.pop_front() {
            if left.accept[i] && !right.accept[j] {
                return false;
            }
            for byte in 0..=255usize {
                let pair = (left.next[i][byte], right.next[j][byte]);
                if seen.insert(pair) {
                    queue.push_back(pair);
                }
            }
        }
        true
    }

    /// Language equality.
    pub fn same_language(&self, other: &RegexSet) -> bool {
        self.is_subset(other) && other.is_subset(self)
    }

    /// Union, as an alternation of the two patterns.
    pub fn union(&self, other: &RegexSet) -> Result<RegexSet, AttributeSetError> {
        RegexSet::new(&format!("(?:{})|(?:{})", self.pattern, other.pattern))
    }

    /// Intersection. `None` when the result language is empty.
    pub fn intersection(&self, other: &RegexSet) -> Result<Option<RegexSet>, AttributeSetError> {
        let table = product(&explore(&self.dfa), &explore(&other.dfa), |a, b| a && b);
        extract(&table)
    }

    /// Difference `L(self) ∖ L(other)`. `None` when the result is empty.
    pub fn difference(&self, other: &RegexSet) -> Result<Option<RegexSet>, AttributeSetError> {
        let table = product(&explore(&self.dfa), &explore(&other.dfa), |a, b| a && !b);
        extract(&table)
    }

    /// Complement relative to all byte strings. `None` when the result is
    /// empty (i.e. the set was universal).
    pub fn complement(&self) -> Result<Option<RegexSet>, AttributeSetError> {
        let mut table = explore(&self.dfa);
        for flag in table.accept.iter_mut() {
            *flag = !*flag;
        }
        extract(&table)
    }
}

fn compile(pattern: &str) -> Result<Dfa, AttributeSetError> {
    dense::Builder::new()
        .configure(
            dense::Config::new()
                .start_kind(StartKind::Anchored)
                .minimize(true),
        )
        .syntax(syntax::Config::new().unicode(false).utf8(false))
        .build(pattern)
        .map_err(|err| AttributeSetError::MalformedRegex {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })
}

/// A complete, explicit transition table. State 0 is the start state.
struct Table {
    next: Vec<Vec<usize>>,
    accept: Vec<bool>,
}

/// Walks a dense DFA into an explicit table.
///
/// States are numbered in BFS discovery order (bytes ascending), which makes
/// the numbering, and everything derived from it, deterministic. Quit states
/// are folded into a synthetic dead state.
fn explore(dfa: &Dfa) -> Table {
    let input = Input::new("").anchored(Anchored::Yes);
    let start = match dfa.start_state_forward(&input) {
        Ok(state) => state,
        Err(_) => {
            // Unreachable for anchored builds; degrade to the empty language.
            return Table {
                next: vec![vec![0; 256]],
                accept: vec![false],
            };
        }
    };

    let mut index = HashMap::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    let mut dead_idx: Option<usize> = None;

    index.insert(start, 0usize);
    order.push(start);
    queue.push_back(start);

    let mut next = Vec::new();
    let mut accept = Vec::new();

    while let Some(sid) = queue.pop_front() {
        let mut row = Vec::with_capacity(256);
        for byte in 0..=255u8 {
            let target = dfa.next_state(sid, byte);
            let idx = if dfa.is_quit_state(target) {
                *dead_idx.get_or_insert_with(|| {
                    // Synthetic dead state appended after everything explored;
                    // patched below.
                    usize::MAX
                })
            } else {
                match index.get(&target) {
                    Some(&idx) => idx,
                    None => {
                        let idx = order.len();
                        index.insert(target, idx);
                        order.push(target);
                        queue.push_back(target);
                        idx
                    }
                }
            };
            row.push(idx);
        }
        next.push(row);
        accept.push(dfa.is_match_state(dfa.next_eoi_state(sid)));
    }

    if dead_idx == Some(usize::MAX) {
        let idx = next.len();
        for row in next.iter_mut() {
            for cell in row.iter_mut() {
                if *cell == usize::MAX {
                    *cell = idx;
                }
            }
        }
        next.push(vec![idx; 256]);
        accept.push(false);
    }

    Table { next, accept }
}

/// Product automaton of two complete tables, acceptance decided by `keep`.
fn product(left: &Table, right: &Table, keep: impl Fn(bool, bool) -> bool) -> Table {
    let mut index = BTreeMap::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    index.insert((0usize, 0usize), 0usize);
    order.push((0usize, 0usize));
    queue.push_back((0usize, 0usize));

    let mut next = Vec::new();
    let mut accept = Vec::new();

    while let Some((i, j)) = queue.pop_front() {
        let mut row = Vec::with_capacity(256);
        for byte in 0..=255usize {
            let pair = (left.next[i][byte], right.next[j][byte]);
            let idx = match index.get(&pair) {
                Some(&idx) => idx,
                None => {
                    let idx = order.len();
                    index.insert(pair, idx);
                    order.push(pair);
                    queue.push_back(pair);
                    idx
                }
            };
            row.push(idx);
        }
        next.push(row);
        accept.push(keep(left.accept[i], right.accept[j]));
    }

    Table { next, accept }
}

/// Moore partition refinement.
///
/// Classes are numbered by the lowest state index they contain, so the start
/// state's class is 0 and the output is deterministic.
fn minimize(table: &Table) -> Table {
    let n = table.next.len();
    let mut class: Vec<usize> = table.accept.iter().map(|&a| usize::from(a)).collect();
    loop {
        let mut signature_ids: BTreeMap<(usize, Vec<usize>), usize> = BTreeMap::new();
        let mut new_class = vec![0usize; n];
        for state in 0..n {
            let signature = (
                class[state],
                table.next[state].iter().map(|&t| class[t]).collect::<Vec<_>>(),
            );
            let next_id = signature_ids.len();
            let id = *signature_ids.entry(signature).or_insert(next_id);
            new_class[state] = id;
        }
        let stable = new_class == class;
        class = new_class;
        if stable {
            break;
        }
    }

    // Renumber classes so the start state's class is 0 and the rest follow
    // in order of their lowest member.
    let mut renumber: BTreeMap<usize, usize> = BTreeMap::new();
    renumber.insert(class[0], 0);
    for state in 0..n {
        let next_id = renumber.len();
        renumber.entry(class[state]).or_insert(next_id);
    }

    let class_count = renumber.len();
    let mut next = vec![Vec::new(); class_count];
    let mut accept = vec![false; class_count];
    for state in 0..n {
        let c = renumber[&class[state]];
        if next[c].is_empty() {
            next[c] = table.next[state].iter().map(|&t| renumber[&class[t]]).collect();
            accept[c] = table.accept[state];
        }
    }

    Table { next, accept }
}

/// Converts a table to an equivalent pattern, or `None` for the empty
/// language.
fn extract(table: &Table) -> Result<Option<RegexSet>, AttributeSetError> {
    let table = minimize(table);
    let n = table.next.len();

    // Productive states: those from which an accepting state is reachable.
    let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (state, row) in table.next.iter().enumerate() {
        for &target in row {
            reverse[target].push(state);
        }
    }
    let mut productive = vec![false; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&s| table.accept[s]).collect();
    for &s in &queue {
        productive[s] = true;
    }
    while let Some(state) = queue.pop_front() {
        for &source in &reverse[state] {
            if !productive[source] {
                productive[source] = true;
                queue.push_back(source);
            }
        }
    }
    if !productive[0] {
        return Ok(None);
    }

    // Renumber the productive states; transitions into unproductive states
    // are simply absent in the generalized automaton.
    let mut renumber = vec![usize::MAX; n];
    let mut kept = 0usize;
    for state in 0..n {
        if productive[state] {
            renumber[state] = kept;
            kept += 1;
        }
    }

    // Byte-labeled edges between kept states.
    let mut byte_edges: BTreeMap<(usize, usize), BTreeSet<u8>> = BTreeMap::new();
    for state in 0..n {
        if !productive[state] {
            continue;
        }
        for byte in 0..=255usize {
            let target = table.next[state][byte];
            if productive[target] {
                byte_edges
                    .entry((renumber[state], renumber[target]))
                    .or_default()
                    .insert(byte as u8);
            }
        }
    }

    // Generalized NFA with a virtual start and accept state.
    let start = kept;
    let finish = kept + 1;
    let size = kept + 2;
    let mut matrix = vec![vec![Label::Never; size]; size];
    matrix[start][0] = Label::Epsilon;
    for state in 0..n {
        if productive[state] && table.accept[state] {
            let s = renumber[state];
            matrix[s][finish] = Label::Epsilon;
        }
    }
    for ((from, to), bytes) in &byte_edges {
        let label = Label::Pat(class_pattern(bytes));
        matrix[*from][*to] = Label::alt(matrix[*from][*to].clone(), label);
    }

    // Eliminate internal states in ascending order.
    for k in 0..kept {
        let loop_star = Label::star(matrix[k][k].clone());
        let incoming: Vec<Label> = (0..size).map(|i| matrix[i][k].clone()).collect();
        let outgoing: Vec<Label> = (0..size).map(|j| matrix[k][j].clone()).collect();
        for i in 0..size {
            if i == k || matches!(incoming[i], Label::Never) {
                continue;
            }
            for j in 0..size {
                if j == k || matches!(outgoing[j], Label::Never) {
                    continue;
                }
                let through = Label::cat(
                    Label::cat(incoming[i].clone(), loop_star.clone()),
                    outgoing[j].clone(),
                );
                matrix[i][j] = Label::alt(matrix[i][j].clone(), through);
            }
        }
        for x in 0..size {
            matrix[x][k] = Label::Never;
            matrix[k][x] = Label::Never;
        }
    }

    match &matrix[start][finish] {
        Label::Never => Ok(None),
        Label::Epsilon => RegexSet::new("").map(Some),
        Label::Pat(pattern) => RegexSet::new(pattern).map(Some),
    }
}

/// An edge label of the generalized automaton.
#[derive(Debug, Clone)]
enum Label {
    /// No transition.
    Never,
    /// The empty string.
    Epsilon,
    /// A pattern fragment at alternation level.
    Pat(String),
}

impl Label {
    fn alt(a: Label, b: Label) -> Label {
        match (a, b) {
            (Label::Never, x) | (x, Label::Never) => x,
            (Label::Epsilon, Label::Epsilon) => Label::Epsilon,
            (Label::Epsilon, Label::Pat(p)) | (Label::Pat(p), Label::Epsilon) => {
                Label::Pat(format!("(?:{})?", p))
            }
            (Label::Pat(p), Label::Pat(q)) => {
                if p == q {
                    Label::Pat(p)
                } else {
                    Label::Pat(format!("{}|{}", p, q))
                }
            }
        }
    }

    fn cat(a: Label, b: Label) -> Label {
        match (a, b) {
            (Label::Never, _) | (_, Label::Never) => Label::Never,
            (Label::Epsilon, x) => x,
            (x, Label::Epsilon) => x,
            (Label::Pat(p), Label::Pat(q)) => Label::Pat(format!("{}{}", group(&p), group(&q))),
        }
    }

    fn star(a: Label) -> Label {
        match a {
            Label::Never | Label::Epsilon => Label::Epsilon,
            Label::Pat(p) => Label::Pat(format!("(?:{})*", p)),
        }
    }
}

/// Wraps a fragment so it can be concatenated safely.
fn group(fragment: &str) -> String {
    if is_atomic(fragment) {
        fragment.to_string()
    } else {
        format!("(?:{})", fragment)
    }
}

/// Whether a fragment binds tighter than concatenation by itself.
fn is_atomic(fragment: &str) -> bool {
    let bytes = fragment.as_bytes();
    match bytes.len() {
        1 => !is_meta(bytes[0]),
        2 => bytes[0] == b'\\',
        4 => bytes.starts_with(b"\\x"),
        _ => {
            if bytes.first() != Some(&b'[') || bytes.last() != Some(&b']') {
                return false;
            }
            // A class is atomic when its closing bracket is the final byte.
            let mut escaped = false;
            for &byte in &bytes[1..bytes.len() - 1] {
                if escaped {
                    escaped = false;
                } else if byte == b'\\' {
                    escaped = true;
                } else if byte == b']' {
                    return false;
                }
            }
            true
        }
    }
}

fn is_meta(byte: u8) -> bool {
    matches!(
        byte,
        b'.' | b'^'
            | b'$'
            | b'*'
            | b'+'
            | b'?'
            | b'('
            | b')'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b'|'
            | b'\\'
    )
}

/// Renders a byte set as a pattern fragment.
fn class_pattern(bytes: &BTreeSet<u8>) -> String {
    let sorted: Vec<u8> = bytes.iter().copied().collect();
    if sorted.len() == 256 {
        return "(?s:.)".to_string();
    }
    if let [byte] = sorted.as_slice() {
        return escape_byte_outside_class(*byte);
    }

    let mut items = String::new();
    let mut run_start = 0usize;
    while run_start < sorted.len() {
        let mut run_end = run_start;
        while run_end + 1 < sorted.len() && sorted[run_end + 1] == sorted[run_end] + 1 {
            run_end += 1;
        }
        if run_end - run_start >= 2 {
            items.push_str(&escape_byte_in_class(sorted[run_start]));
            items.push('-');
            items.push_str(&escape_byte_in_class(sorted[run_end]));
        } else {
            for &byte in &sorted[run_start..=run_end] {
                items.push_str(&escape_byte_in_class(byte));
            }
        }
        run_start = run_end + 1;
    }
    format!("[{}]", items)
}

fn escape_byte_outside_class(byte: u8) -> String {
    if is_meta(byte) {
        format!("\\{}", byte as char)
    } else if (0x20..0x7f).contains(&byte) {
        (byte as char).to_string()
    } else {
        format!("\\x{:02X}", byte)
    }
}

fn escape_byte_in_class(byte: u8) -> String {
    match byte {
        b'\\' | b']' | b'^' | b'-' | b'[' => format!("\\{}", byte as char),
        0x20..=0x7e => (byte as char).to_string(),
        _ => format!("\\x{:02X}", byte),
    }
}

/// Escapes a literal string for use inside a pattern.
fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii() && is_meta(ch as u8) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rx(pattern: &str) -> RegexSet {
        RegexSet::new(pattern).expect("valid pattern")
    }

    #[test]
    fn membership_is_whole_string() {
        let set = rx("ab*");
        assert!(set.accepts("a"));
        assert!(set.accepts("abbb"));
        assert!(!set.accepts("ab c"));
        assert!(!set.accepts("xab"));
    }

    #[test]
    fn malformed_pattern_rejected() {
        assert!(RegexSet::new("(unclosed").is_err());
    }

    #[test]
    fn containment_sound_and_complete() {
        assert!(rx("a|b").is_subset(&rx("[a-c]")));
        assert!(!rx("ab*").is_subset(&rx("a")));
        assert!(rx("abc").is_subset(&rx("ab.")));
        assert!(!rx("[a-c]").is_subset(&rx("a|b")));
    }

    #[test]
    fn emptiness_and_universality() {
        assert!(rx("a").difference(&rx("a")).unwrap().is_none());
        assert!(rx("(?s:.)*").is_universal());
        assert!(!rx("a*").is_universal());
        assert!(!rx("a").is_empty());
    }

    #[test]
    fn union_covers_both_sides() {
        let u = rx("ab").union(&rx("cd")).unwrap();
        assert!(u.accepts("ab"));
        assert!(u.accepts("cd"));
        assert!(!u.accepts("ac"));
    }

    #[test]
    fn intersection_by_probing() {
        let left = rx("[a-m]+");
        let right = rx("[h-z]+");
        let meet = left.intersection(&right).unwrap().expect("non-empty");
        assert!(meet.accepts("h"));
        assert!(meet.accepts("him"));
        assert!(!meet.accepts("a"));
        assert!(!meet.accepts("z"));
        // The extracted pattern is equivalent to the exact intersection.
        assert!(meet.same_language(&rx("[h-m]+")));
    }

    #[test]
    fn disjoint_intersection_is_none() {
        assert!(rx("a+").intersection(&rx("b+")).unwrap().is_none());
    }

    #[test]
    fn difference_by_probing() {
        let diff = rx("a|b|c").difference(&rx("b")).unwrap().expect("non-empty");
        assert!(diff.accepts("a"));
        assert!(diff.accepts("c"));
        assert!(!diff.accepts("b"));
        assert!(diff.same_language(&rx("a|c")));
    }

    #[test]
    fn complement_probes() {
        let comp = rx("a").complement().unwrap().expect("non-universal input");
        assert!(!comp.accepts("a"));
        assert!(comp.accepts(""));
        assert!(comp.accepts("aa"));
        assert!(comp.accepts("b"));
        // Complement of the complement is the original language.
        let back = comp.complement().unwrap().expect("non-empty");
        assert!(back.same_language(&rx("a")));
    }

    #[test]
    fn complement_of_universal_is_none() {
        assert!(rx("(?s:.)*").complement().unwrap().is_none());
    }

    #[test]
    fn literals_escape_metacharacters() {
        let set = RegexSet::from_literals(["a.b", "c"]).unwrap();
        assert!(set.accepts("a.b"));
        assert!(!set.accepts("axb"));
        assert!(set.accepts("c"));
    }

    #[test]
    fn epsilon_language_extraction() {
        let meet = rx("a*").intersection(&rx("b*")).unwrap().expect("contains ε");
        assert!(meet.accepts(""));
        assert!(!meet.accepts("a"));
        assert!(!meet.accepts("b"));
    }
}
