use crate::grammar::Grammar;
use crate::symbol::{Symbol, SymbolNode};
use ahash::AHashMap as HashMap;
use slotmap::DefaultKey;

/// Grammar inference engine for one block of input.
///
/// Every byte pushed is appended to the main rule, after which the grammar
/// constraints are re-enforced:
/// 1. Digram Uniqueness: no digram appears more than once
/// 2. Rule Utility: every rule except the main rule is used at least twice
///
/// One `Sequitur` value covers one block; dropping it discards the arena,
/// the digram index, and the registry, so nonterminal numbering restarts
/// with the next block.
pub struct Sequitur {
    pub(crate) grammar: Grammar,

    /// Head of the main rule (the start rule of this block's grammar).
    pub(crate) main_rule: DefaultKey,

    /// Tail sentinel of the main rule; bytes are appended just before it.
    pub(crate) sequence_end: DefaultKey,

    /// Number of bytes pushed.
    length: usize,
}

impl Sequitur {
    /// Creates an empty engine with a fresh main rule.
    pub fn new() -> Self {
        let mut grammar = Grammar::new();

        let main_rule = grammar.new_rule();
        let sequence_end = grammar.symbols[main_rule]
            .next
            .expect("fresh rule head links to its tail");

        Self {
            grammar,
            main_rule,
            sequence_end,
            length: 0,
        }
    }

    /// Appends a byte to the main rule and re-enforces the constraints.
    pub fn push(&mut self, byte: u8) {
        let new_key = self
            .grammar
            .insert_symbol(SymbolNode::new(Symbol::Byte(byte)));

        // Insert just before the tail sentinel
        let tail = self.sequence_end;
        let prev = self.grammar.symbols[tail]
            .prev
            .expect("main rule tail is linked");

        self.grammar.symbols[new_key].next = Some(tail);
        self.grammar.symbols[new_key].prev = Some(prev);
        self.grammar.symbols[tail].prev = Some(new_key);
        self.grammar.symbols[prev].next = Some(new_key);

        self.length += 1;

        // For the first byte of a block this inspects a head-adjacent pair,
        // which the enforcement step ignores
        self.grammar.check_digram(prev);
    }

    /// Appends every byte of the iterator.
    pub fn extend<I: IntoIterator<Item = u8>>(&mut self, iter: I) {
        for byte in iter {
            self.push(byte);
        }
    }

    /// Returns the number of bytes pushed.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if no bytes have been pushed.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the rule registry (rule id -> head key). The main rule is
    /// always present.
    pub fn rules(&self) -> &HashMap<u32, DefaultKey> {
        &self.grammar.rule_index
    }

    /// Returns compression statistics for the current grammar.
    pub fn stats(&self) -> CompressionStats {
        let mut total_symbols = 0;

        for &rule_id in &self.grammar.rule_order {
            let head_key = self.grammar.rule_index[&rule_id];
            let mut current = self.grammar.symbols[head_key].next;
            while let Some(key) = current {
                if self.grammar.symbols[key].symbol.is_tail() {
                    break;
                }
                total_symbols += 1;
                current = self.grammar.symbols[key].next;
            }
        }

        CompressionStats {
            input_length: self.length,
            grammar_symbols: total_symbols,
            num_rules: self.grammar.rule_order.len(),
        }
    }
}

/// Statistics about one block's grammar.
#[derive(Debug, Clone, Copy)]
pub struct CompressionStats {
    /// Number of input bytes pushed
    pub input_length: usize,
    /// Total body symbols across all rules
    pub grammar_symbols: usize,
    /// Number of rules, the main rule included
    pub num_rules: usize,
}

impl CompressionStats {
    /// Returns the grammar size relative to the input, as a percentage.
    pub fn compression_ratio(&self) -> f64 {
        if self.input_length == 0 {
            0.0
        } else {
            (self.grammar_symbols as f64 / self.input_length as f64) * 100.0
        }
    }
}

impl Default for Sequitur {
    fn default() -> Self {
        Self::new()
    }
}
