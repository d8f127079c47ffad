//! Context-free grammar over edge labels
//!
//! Holds the symbol tables, variant markers and the three rule tables
//! (empty, unary, binary) the fixpoint loop consults.
//!
//! # Text format
//!
//! One production per line, tab separated:
//!
//! ```text
//! V
//! A       a
//! A       A       A
//! FV_i    fbar_i  V
//! ```
//!
//! reads as `V ::= ε`, `A ::= a`, `A ::= A A` (A is transitive) and
//! `FV_i ::= fbar_i V`; variant symbols end in `_i`.
//!
//! Longer right-hand sides (`M ::= a V abar`) are split left to right into
//! binary rules through generated intermediate symbols. Empty lines and lines
//! starting with `#` are skipped.
//!
//! # Variant matching
//!
//! `X ::= Y Z` over variant operands only fires when both indices agree (or one
//! operand is non-variant); a variant left-hand side inherits that index.

use super::label::{Label, SymbolId, FAULT};
use crate::errors::{CflError, Result};
use super::scc_detector::tarjan_scc;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use tracing::debug;

/// Name suffix marking an index-carrying symbol
pub const VARIANT_SUFFIX: &str = "_i";

/// Grammar with symbol tables and rule tables
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    /// name -> id (ids start at 1)
    symbol_ids: FxHashMap<String, SymbolId>,
    /// id -> name; slot 0 is the fault sentinel
    symbol_names: Vec<String>,
    variants: FxHashSet<SymbolId>,
    transitive: BTreeSet<SymbolId>,
    empty_rules: BTreeSet<SymbolId>,
    /// rhs -> lhs list
    unary_rules: FxHashMap<SymbolId, Vec<SymbolId>>,
    /// (rhs1, rhs2) -> lhs list
    binary_rules: FxHashMap<(SymbolId, SymbolId), Vec<SymbolId>>,
    /// Counter for generated intermediate symbols
    aux_symbols: u32,
}

/// Rule-table sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrammarStats {
    pub symbols: usize,
    pub variants: usize,
    pub transitive: usize,
    pub empty_rules: usize,
    pub unary_rules: usize,
    pub binary_rules: usize,
}

impl Grammar {
    pub fn new() -> Self {
        Self {
            symbol_names: vec![String::new()],
            ..Default::default()
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Symbols
    // ═══════════════════════════════════════════════════════════════════════

    /// Register a symbol (idempotent). Names ending in `_i` are variant.
    pub fn add_symbol(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.symbol_ids.get(name) {
            return id;
        }
        if self.symbol_names.is_empty() {
            self.symbol_names.push(String::new());
        }
        let id = self.symbol_names.len() as SymbolId;
        self.symbol_names.push(name.to_string());
        self.symbol_ids.insert(name.to_string(), id);
        if is_variant_name(name) {
            self.variants.insert(id);
        }
        id
    }

    #[inline]
    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbol_ids.contains_key(name)
    }

    /// Look up a registered symbol; never registers on miss
    pub fn symbol_id(&self, name: &str) -> Result<SymbolId> {
        self.symbol_ids
            .get(name)
            .copied()
            .ok_or_else(|| CflError::UnknownSymbol(name.to_string()))
    }

    pub fn symbol_name(&self, id: SymbolId) -> Option<&str> {
        if id == FAULT {
            return None;
        }
        self.symbol_names.get(id as usize).map(String::as_str)
    }

    /// `(id, name)` pairs in declaration order
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &str)> + '_ {
        self.symbol_names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(id, name)| (id as SymbolId, name.as_str()))
    }

    pub fn num_symbols(&self) -> usize {
        self.symbol_names.len().saturating_sub(1)
    }

    /// First declared symbol, if any
    pub fn start_symbol(&self) -> Option<SymbolId> {
        (self.num_symbols() > 0).then_some(1)
    }

    #[inline]
    pub fn is_variant(&self, id: SymbolId) -> bool {
        self.variants.contains(&id)
    }

    #[inline]
    pub fn is_transitive(&self, id: SymbolId) -> bool {
        self.transitive.contains(&id)
    }

    /// Transitive symbols in ascending id order
    pub fn transitive_symbols(&self) -> Vec<SymbolId> {
        self.transitive.iter().copied().collect()
    }

    /// Label for `id`, keeping `index` only when the symbol is variant
    #[inline]
    pub fn label(&self, id: SymbolId, index: u32) -> Label {
        if self.is_variant(id) {
            Label::new(id, index)
        } else {
            Label::plain(id)
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Rules
    // ═══════════════════════════════════════════════════════════════════════

    pub fn add_empty_rule(&mut self, lhs: SymbolId) {
        self.empty_rules.insert(lhs);
    }

    pub fn add_unary_rule(&mut self, lhs: SymbolId, rhs: SymbolId) {
        let entry = self.unary_rules.entry(rhs).or_default();
        if !entry.contains(&lhs) {
            entry.push(lhs);
        }
    }

    /// Add `lhs ::= rhs1 rhs2`; the exact shape `X ::= X X` marks X transitive
    pub fn add_binary_rule(&mut self, lhs: SymbolId, rhs1: SymbolId, rhs2: SymbolId) {
        let entry = self.binary_rules.entry((rhs1, rhs2)).or_default();
        if !entry.contains(&lhs) {
            entry.push(lhs);
        }
        if lhs == rhs1 && lhs == rhs2 {
            self.transitive.insert(lhs);
        }
    }

    /// Add a production by symbol names, registering every name
    pub fn add_rule(&mut self, lhs: &str, rhs: &[&str]) {
        let lhs_id = self.add_symbol(lhs);
        let rhs_ids: Vec<SymbolId> = rhs.iter().map(|name| self.add_symbol(name)).collect();
        self.add_rule_ids(lhs, lhs_id, &rhs_ids);
    }

    fn add_rule_ids(&mut self, lhs_name: &str, lhs: SymbolId, rhs: &[SymbolId]) {
        match rhs {
            [] => self.add_empty_rule(lhs),
            [single] => self.add_unary_rule(lhs, *single),
            [first, second] => self.add_binary_rule(lhs, *first, *second),
            [first, second, rest @ ..] => {
                let mut left = self.intermediate(lhs_name, *first, *second);
                self.add_binary_rule(left, *first, *second);
                for (pos, &next) in rest.iter().enumerate() {
                    if pos + 1 == rest.len() {
                        self.add_binary_rule(lhs, left, next);
                    } else {
                        let joined = self.intermediate(lhs_name, left, next);
                        self.add_binary_rule(joined, left, next);
                        left = joined;
                    }
                }
            }
        }
    }

    /// Fresh symbol standing for the prefix `a b` of a long production.
    /// Variant when either operand is, so the index flows through.
    fn intermediate(&mut self, lhs_name: &str, a: SymbolId, b: SymbolId) -> SymbolId {
        let base = lhs_name.strip_suffix(VARIANT_SUFFIX).unwrap_or(lhs_name);
        let suffix = if self.is_variant(a) || self.is_variant(b) {
            VARIANT_SUFFIX
        } else {
            ""
        };
        loop {
            self.aux_symbols += 1;
            let name = format!("{}.{}{}", base, self.aux_symbols, suffix);
            if !self.has_symbol(&name) {
                return self.add_symbol(&name);
            }
        }
    }

    /// Drop `sym ::= sym sym` from the binary table once an accelerator owns
    /// the closure of `sym`. The symbol stays transitive.
    pub fn remove_transitive_self_rule(&mut self, sym: SymbolId) -> bool {
        let key = (sym, sym);
        let Some(lhs) = self.binary_rules.get_mut(&key) else {
            return false;
        };
        let before = lhs.len();
        lhs.retain(|&l| l != sym);
        let removed = lhs.len() != before;
        if lhs.is_empty() {
            self.binary_rules.remove(&key);
        }
        removed
    }

    pub fn empty_rules(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.empty_rules.iter().copied()
    }

    pub fn has_binary_rule(&self, lhs: SymbolId, rhs1: SymbolId, rhs2: SymbolId) -> bool {
        self.binary_rules
            .get(&(rhs1, rhs2))
            .map_or(false, |l| l.contains(&lhs))
    }

    pub fn has_unary_rule(&self, lhs: SymbolId, rhs: SymbolId) -> bool {
        self.unary_rules
            .get(&rhs)
            .map_or(false, |l| l.contains(&lhs))
    }

    /// Sorted `(lhs, rhs)` unary rules
    pub fn unary_rule_list(&self) -> Vec<(SymbolId, SymbolId)> {
        let mut rules: Vec<_> = self
            .unary_rules
            .iter()
            .flat_map(|(&rhs, lhs)| lhs.iter().map(move |&l| (l, rhs)))
            .collect();
        rules.sort_unstable();
        rules
    }

    /// Sorted `(lhs, rhs1, rhs2)` binary rules
    pub fn binary_rule_list(&self) -> Vec<(SymbolId, SymbolId, SymbolId)> {
        let mut rules: Vec<_> = self
            .binary_rules
            .iter()
            .flat_map(|(&(r1, r2), lhs)| lhs.iter().map(move |&l| (l, r1, r2)))
            .collect();
        rules.sort_unstable();
        rules
    }

    pub fn stats(&self) -> GrammarStats {
        GrammarStats {
            symbols: self.num_symbols(),
            variants: self.variants.len(),
            transitive: self.transitive.len(),
            empty_rules: self.empty_rules.len(),
            unary_rules: self.unary_rules.values().map(Vec::len).sum(),
            binary_rules: self.binary_rules.values().map(Vec::len).sum(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Summarization
    // ═══════════════════════════════════════════════════════════════════════

    /// Labels derivable from one edge labeled `label`
    pub fn unary_summ(&self, label: Label) -> impl Iterator<Item = Label> + '_ {
        let rhs_variant = self.is_variant(label.symbol);
        self.unary_rules
            .get(&label.symbol)
            .into_iter()
            .flatten()
            .filter(|&&lhs| lhs != FAULT)
            .map(move |&lhs| {
                if rhs_variant && self.is_variant(lhs) {
                    Label::new(lhs, label.index)
                } else {
                    Label::plain(lhs)
                }
            })
    }

    /// Labels derivable from the path `left right`
    pub fn binary_summ(&self, left: Label, right: Label) -> impl Iterator<Item = Label> + '_ {
        let left_variant = self.is_variant(left.symbol);
        let right_variant = self.is_variant(right.symbol);
        let fires = !(left_variant && right_variant) || left.index == right.index;
        let inherited = if left_variant {
            Some(left.index)
        } else if right_variant {
            Some(right.index)
        } else {
            None
        };

        self.binary_rules
            .get(&(left.symbol, right.symbol))
            .filter(|_| fires)
            .into_iter()
            .flatten()
            .filter(|&&lhs| lhs != FAULT)
            .map(move |&lhs| match inherited {
                Some(index) if self.is_variant(lhs) => Label::new(lhs, index),
                _ => Label::plain(lhs),
            })
    }

    /// Symbols that appear on some left-hand side
    pub fn nonterminals(&self) -> BTreeSet<SymbolId> {
        let mut out: BTreeSet<SymbolId> = self.empty_rules.clone();
        out.extend(self.unary_rules.values().flatten().copied());
        out.extend(self.binary_rules.values().flatten().copied());
        out.remove(&FAULT);
        out
    }

    /// Whether any binary rule takes `sym` as its left operand
    pub fn has_left_operand(&self, sym: SymbolId) -> bool {
        self.binary_rules.keys().any(|&(r1, _)| r1 == sym)
    }

    /// Cycles in the unary-rule graph (`rhs -> lhs`), including `X ::= X`
    ///
    /// They terminate under deduplication but are almost always an authoring
    /// mistake, so callers warn or reject.
    pub fn unary_cycles(&self) -> Vec<Vec<SymbolId>> {
        let edges: Vec<(u32, u32)> = self.unary_rule_list().into_iter().map(|(l, r)| (r, l)).collect();
        let result = tarjan_scc(&edges);
        let mut cycles = result.sccs;
        cycles.extend(result.self_loops.into_iter().map(|s| vec![s]));
        cycles.sort();
        cycles
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Text format
    // ═══════════════════════════════════════════════════════════════════════

    /// Parse the tab-separated grammar text
    pub fn parse(text: &str) -> Result<Self> {
        let mut grammar = Grammar::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            if fields.iter().any(|f| f.is_empty()) {
                return Err(CflError::parse(lineno + 1, "empty symbol name"));
            }
            let lhs = grammar.add_symbol(fields[0]);
            let rhs: Vec<SymbolId> = fields[1..].iter().map(|f| grammar.add_symbol(f)).collect();
            grammar.add_rule_ids(fields[0], lhs, &rhs);
        }

        let stats = grammar.stats();
        debug!(
            symbols = stats.symbols,
            variants = stats.variants,
            transitive = stats.transitive,
            empty = stats.empty_rules,
            unary = stats.unary_rules,
            binary = stats.binary_rules,
            "grammar parsed"
        );
        Ok(grammar)
    }

    /// Serialize the rule tables back to the text format, one sorted line
    /// per rule (empty, then unary, then binary)
    pub fn to_text(&self) -> String {
        let mut empty: Vec<&str> = self.empty_rules.iter().map(|&l| self.name_or_fault(l)).collect();
        empty.sort_unstable();
        let mut unary: Vec<(&str, &str)> = self
            .unary_rule_list()
            .into_iter()
            .map(|(l, r)| (self.name_or_fault(l), self.name_or_fault(r)))
            .collect();
        unary.sort_unstable();
        let mut binary: Vec<(&str, &str, &str)> = self
            .binary_rule_list()
            .into_iter()
            .map(|(l, r1, r2)| (self.name_or_fault(l), self.name_or_fault(r1), self.name_or_fault(r2)))
            .collect();
        binary.sort_unstable();

        let mut out = String::new();
        for lhs in empty {
            let _ = writeln!(out, "{}", lhs);
        }
        for (lhs, rhs) in unary {
            let _ = writeln!(out, "{}\t{}", lhs, rhs);
        }
        for (lhs, r1, r2) in binary {
            let _ = writeln!(out, "{}\t{}\t{}", lhs, r1, r2);
        }
        out
    }

    fn name_or_fault(&self, id: SymbolId) -> &str {
        self.symbol_name(id).unwrap_or("<fault>")
    }
}

/// Whether a symbol name marks an index-carrying symbol
pub fn is_variant_name(name: &str) -> bool {
    name.len() > VARIANT_SUFFIX.len() && name.ends_with(VARIANT_SUFFIX)
}

/// Shortcut `result ::= open[i] inner close[i]`
///
/// The grammar already derives the same edges through its binarized
/// rules; the solver fires the shortcut once per new `inner` pair so a
/// matched call/return spans in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketRule {
    pub open: SymbolId,
    pub inner: SymbolId,
    pub close: SymbolId,
    pub result: SymbolId,
}

impl BracketRule {
    /// Resolve the four symbols by name
    pub fn from_names(grammar: &Grammar, result: &str, open: &str, inner: &str, close: &str) -> Result<Self> {
        Ok(Self {
            open: grammar.symbol_id(open)?,
            inner: grammar.symbol_id(inner)?,
            close: grammar.symbol_id(close)?,
            result: grammar.symbol_id(result)?,
        })
    }
}
