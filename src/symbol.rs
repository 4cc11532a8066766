use slotmap::DefaultKey;

/// Values below this bound are terminal symbols (literal input bytes);
/// values at or above it name rules.
pub const FIRST_NONTERMINAL: u32 = 256;

/// Symbol kinds in the grammar.
///
/// A rule is a chain `RuleHead -> body symbols -> RuleTail` threaded through
/// [`SymbolNode`] links; the sentinel pair makes "is a sentinel" a variant
/// test rather than a pointer comparison.
#[derive(Debug, Clone)]
pub(crate) enum Symbol {
    /// A terminal symbol holding a literal input byte.
    Byte(u8),

    /// A nonterminal occurrence referencing the rule named `rule_id`.
    RuleRef { rule_id: u32 },

    /// Marks the beginning of a rule definition. `count` is the number of
    /// `RuleRef` symbols currently referencing this rule.
    RuleHead {
        rule_id: u32,
        count: u32,
        tail: DefaultKey,
    },

    /// Marks the end of a rule definition.
    RuleTail,
}

impl Symbol {
    /// Wire value of a body symbol: the byte itself for terminals, the rule
    /// id for nonterminal references. Sentinels never reach the wire.
    pub(crate) fn value(&self) -> u32 {
        match self {
            Symbol::Byte(b) => *b as u32,
            Symbol::RuleRef { rule_id } => *rule_id,
            Symbol::RuleHead { .. } | Symbol::RuleTail => {
                unreachable!("sentinels have no wire value")
            }
        }
    }

    pub(crate) fn is_head(&self) -> bool {
        matches!(self, Symbol::RuleHead { .. })
    }

    pub(crate) fn is_tail(&self) -> bool {
        matches!(self, Symbol::RuleTail)
    }
}

/// A node in the doubly-linked list of symbols.
#[derive(Debug)]
pub(crate) struct SymbolNode {
    pub symbol: Symbol,
    pub prev: Option<DefaultKey>,
    pub next: Option<DefaultKey>,
}

impl SymbolNode {
    pub(crate) fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            prev: None,
            next: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_value_is_byte() {
        assert_eq!(Symbol::Byte(0).value(), 0);
        assert_eq!(Symbol::Byte(0xFF).value(), 0xFF);
    }

    #[test]
    fn test_rule_ref_value_is_rule_id() {
        let sym = Symbol::RuleRef { rule_id: 300 };
        assert_eq!(sym.value(), 300);
        assert!(sym.value() >= FIRST_NONTERMINAL);
    }

    #[test]
    fn test_symbol_node_creation() {
        let node = SymbolNode::new(Symbol::Byte(b'x'));
        assert!(matches!(node.symbol, Symbol::Byte(b'x')));
        assert_eq!(node.prev, None);
        assert_eq!(node.next, None);
    }
}
