use crate::id_gen::RuleIds;
use crate::symbol::{Symbol, SymbolNode};
use ahash::AHashMap as HashMap;
use slotmap::{DefaultKey, SlotMap};

/// Upper bound on live symbol cells, sized generously for the largest
/// (1 MiB) block. Exceeding it is a fatal invariant violation.
pub(crate) const MAX_SYMBOLS: usize = 1 << 22;

/// Grammar storage plus the enforcement algorithm.
///
/// Maintains two constraints across all rules simultaneously:
/// 1. Digram Uniqueness: no digram appears more than once, except for
///    occurrences that overlap (share a symbol)
/// 2. Rule Utility: every rule except the main rule is referenced at least
///    twice
pub(crate) struct Grammar {
    /// Symbol arena. Generational keys double as the recycle free-list:
    /// a removed key fails the liveness check, which is how stale
    /// digram-index entries are detected.
    pub symbols: SlotMap<DefaultKey, SymbolNode>,

    /// At most one entry per (value, value) pair across the entire grammar,
    /// mapping to the left symbol of the occurrence.
    pub digram_index: HashMap<(u32, u32), DefaultKey>,

    /// Rule id -> head symbol, for O(1) lookup.
    pub rule_index: HashMap<u32, DefaultKey>,

    /// Rule ids in creation order. The main rule is created first, so it is
    /// always `rule_order[0]`; serialization walks this list.
    pub rule_order: Vec<u32>,

    pub id_gen: RuleIds,
}

impl Grammar {
    pub(crate) fn new() -> Self {
        Self {
            symbols: SlotMap::new(),
            digram_index: HashMap::new(),
            rule_index: HashMap::new(),
            rule_order: Vec::new(),
            id_gen: RuleIds::new(),
        }
    }

    /// Allocates a symbol cell, enforcing the arena capacity bound.
    pub(crate) fn insert_symbol(&mut self, node: SymbolNode) -> DefaultKey {
        assert!(self.symbols.len() < MAX_SYMBOLS, "symbol arena exhausted");
        self.symbols.insert(node)
    }

    /// Allocates an empty rule (head linked straight to tail) with a fresh
    /// id and registers it. Returns the head key.
    pub(crate) fn new_rule(&mut self) -> DefaultKey {
        let rule_id = self.id_gen.get();

        let tail_key = self.insert_symbol(SymbolNode::new(Symbol::RuleTail));
        let head_key = self.insert_symbol(SymbolNode::new(Symbol::RuleHead {
            rule_id,
            count: 0,
            tail: tail_key,
        }));

        self.symbols[head_key].next = Some(tail_key);
        self.symbols[tail_key].prev = Some(head_key);

        self.rule_index.insert(rule_id, head_key);
        self.rule_order.push(rule_id);

        head_key
    }

    /// Links `key` into a body between `before` and `after`.
    fn link_between(&mut self, key: DefaultKey, before: Option<DefaultKey>, after: Option<DefaultKey>) {
        self.symbols[key].prev = before;
        self.symbols[key].next = after;
        if let Some(b) = before {
            self.symbols[b].next = Some(key);
        }
        if let Some(a) = after {
            self.symbols[a].prev = Some(key);
        }
    }

    /// The digram starting at `left`, if one exists that does not straddle
    /// a rule sentinel: its value pair and its right half.
    fn pair_at(&self, left: DefaultKey) -> Option<((u32, u32), DefaultKey)> {
        let node = &self.symbols[left];
        if node.symbol.is_head() {
            return None;
        }
        let right = node.next?;
        let right_sym = &self.symbols[right].symbol;
        if right_sym.is_tail() {
            return None;
        }
        Some(((node.symbol.value(), right_sym.value()), right))
    }

    /// Unindexes the digram at `left`, but only while the index still maps
    /// its pair here. Stale drops are no-ops; splicing and recycling depend
    /// on that.
    fn drop_digram(&mut self, left: DefaultKey) {
        if let Some((pair, _)) = self.pair_at(left) {
            if self.digram_index.get(&pair) == Some(&left) {
                self.digram_index.remove(&pair);
            }
        }
    }

    /// Enforcement entry point: inspects the digram beginning at `left`.
    ///
    /// Runs after every append and recursively after every structural
    /// change. A first occurrence is indexed and nothing more happens. A
    /// duplicate is factored through a rule: an existing rule is reused
    /// when its body is exactly this digram, otherwise a fresh rule is
    /// minted and both occurrences are rewritten to reference it.
    pub(crate) fn check_digram(&mut self, left: DefaultKey) {
        let Some((pair, right)) = self.pair_at(left) else {
            return;
        };

        let held = self.digram_index.get(&pair).copied();
        let older = match held {
            None => {
                self.digram_index.insert(pair, left);
                return;
            }
            Some(held) if held == left => return,
            // A position consumed by an earlier rewrite leaves a dead key
            // behind; this occurrence takes over the entry.
            Some(held) if !self.symbols.contains_key(held) => {
                self.digram_index.insert(pair, left);
                return;
            }
            Some(held) => held,
        };

        // Occurrences sharing a cell, as in a run of one byte, stay put
        let older_right = self.symbols[older]
            .next
            .expect("indexed digram has a successor");
        if older_right == left || older == right {
            return;
        }

        match self.whole_body_rule(older) {
            Some(rule_head) => {
                let site = self.substitute(left, rule_head);
                self.rescan_around(site);
            }
            None => {
                let rule_head = self.mint_rule_from(older);
                let old_site = self.substitute(older, rule_head);
                let new_site = self.substitute(left, rule_head);
                self.rescan_around(old_site);
                self.rescan_around(new_site);
            }
        }
    }

    /// If the digram at `at` spans an entire rule body, returns that rule's
    /// head.
    fn whole_body_rule(&self, at: DefaultKey) -> Option<DefaultKey> {
        let node = &self.symbols[at];
        let head = node.prev.filter(|&p| self.symbols[p].symbol.is_head())?;
        let right = node.next?;
        let after = self.symbols[right]
            .next
            .filter(|&a| self.symbols[a].symbol.is_tail())?;

        // The sentinels on both sides must belong to the same rule
        match self.symbols[head].symbol {
            Symbol::RuleHead { tail, .. } if tail == after => Some(head),
            _ => None,
        }
    }

    /// Mints a rule whose two-symbol body copies the digram at `at`, and
    /// reassigns the pair's index entry to the copy inside the rule.
    fn mint_rule_from(&mut self, at: DefaultKey) -> DefaultKey {
        let right = self.symbols[at].next.expect("digram has a right half");
        let left_copy = self.symbols[at].symbol.clone();
        let right_copy = self.symbols[right].symbol.clone();

        let head = self.new_rule();
        let tail = self.symbols[head].next.expect("a fresh rule is empty");

        let body_left = self.insert_symbol(SymbolNode::new(left_copy));
        let body_right = self.insert_symbol(SymbolNode::new(right_copy));
        self.link_between(body_left, Some(head), Some(tail));
        self.link_between(body_right, Some(body_left), Some(tail));

        let pair = (
            self.symbols[body_left].symbol.value(),
            self.symbols[body_right].symbol.value(),
        );
        self.digram_index.insert(pair, body_left);

        // Copies of nonterminal occurrences count as references too
        self.adjust_ref_if_nonterminal(body_left, 1);
        self.adjust_ref_if_nonterminal(body_right, 1);

        head
    }

    /// Rewrites the digram at `at` into a single reference to `rule_head`,
    /// then checks whether the rewrite starved any rule named in the
    /// substituted body.
    fn substitute(&mut self, at: DefaultKey, rule_head: DefaultKey) -> DefaultKey {
        let right = self.symbols[at].next.expect("digram has a right half");
        let before = self.symbols[at].prev;
        let after = self.symbols[right].next;

        // Index entries reaching into the span being replaced go stale now
        if let Some(b) = before {
            self.drop_digram(b);
        }
        self.drop_digram(right);

        self.adjust_ref_if_nonterminal(at, -1);
        self.adjust_ref_if_nonterminal(right, -1);

        let Symbol::RuleHead { rule_id, .. } = self.symbols[rule_head].symbol else {
            unreachable!("substitution target must be a rule head");
        };

        let site = self.insert_symbol(SymbolNode::new(Symbol::RuleRef { rule_id }));
        self.link_between(site, before, after);
        self.adjust_refcount(rule_head, 1);

        self.symbols.remove(at);
        self.symbols.remove(right);

        // The decrements above may have left some rule with a single use;
        // that use sits in this rule's body, since the body mirrors the
        // values just removed.
        let body_left = self.symbols[rule_head]
            .next
            .expect("rule body is never empty");
        let body_right = self.symbols[body_left]
            .next
            .expect("rule bodies hold at least two symbols");
        self.enforce_utility(body_left);
        self.enforce_utility(body_right);

        site
    }

    /// Rule utility enforcement: a rule whose reference count falls to one
    /// no longer pays for itself, so its body is spliced over the last
    /// remaining reference and the rule is deleted.
    fn enforce_utility(&mut self, at: DefaultKey) {
        // Cascades may have rewritten this position already
        let Some(node) = self.symbols.get(at) else {
            return;
        };
        let Symbol::RuleRef { rule_id } = node.symbol else {
            return;
        };
        let Some(&head) = self.rule_index.get(&rule_id) else {
            return;
        };

        let Symbol::RuleHead { count, tail, .. } = self.symbols[head].symbol else {
            unreachable!("registry entries are rule heads");
        };
        assert!(count > 0, "rule {rule_id} is registered but unreferenced");
        if count > 1 {
            return;
        }

        let body_first = self.symbols[head].next.expect("rule body is never empty");
        let body_last = self.symbols[tail].prev.expect("rule body is never empty");
        let before = self.symbols[at].prev;
        let after = self.symbols[at].next;

        if let Some(b) = before {
            self.drop_digram(b);
        }
        self.drop_digram(at);

        // The rule is gone: registry entry, id, sentinels, and the
        // reference itself
        self.rule_index.remove(&rule_id);
        self.rule_order.retain(|&id| id != rule_id);
        self.id_gen.free(rule_id);
        self.symbols.remove(head);
        self.symbols.remove(tail);
        self.symbols.remove(at);

        // Splice the orphaned body into the gap
        self.symbols[body_first].prev = before;
        self.symbols[body_last].next = after;
        if let Some(b) = before {
            self.symbols[b].next = Some(body_first);
        }
        if let Some(a) = after {
            self.symbols[a].prev = Some(body_last);
        }

        // Both seams of the splice are fresh adjacencies
        if let Some(b) = before {
            self.check_digram(b);
        }
        if self.symbols.contains_key(body_last) {
            self.check_digram(body_last);
        }
    }

    /// Re-checks the digrams on either side of a substitution site. The
    /// left check can rewrite the whole neighborhood, so the site is
    /// revalidated before the right check; `check_digram` itself filters
    /// out sentinel-straddling pairs.
    fn rescan_around(&mut self, site: DefaultKey) {
        if let Some(before) = self.symbols.get(site).and_then(|node| node.prev) {
            self.check_digram(before);
        }
        if self.symbols.contains_key(site) {
            self.check_digram(site);
        }
    }

    /// Applies `delta` to a rule's reference count. Going negative is a
    /// fatal bookkeeping bug.
    fn adjust_refcount(&mut self, head_key: DefaultKey, delta: i32) {
        let Symbol::RuleHead {
            rule_id,
            count,
            tail,
        } = self.symbols[head_key].symbol
        else {
            unreachable!("reference counts live on rule heads");
        };

        let count = count as i64 + delta as i64;
        assert!(count >= 0, "rule {rule_id} reference count went negative");

        self.symbols[head_key].symbol = Symbol::RuleHead {
            rule_id,
            count: count as u32,
            tail,
        };
    }

    /// Forwards `delta` to the referenced rule when the symbol at `key` is
    /// a nonterminal occurrence; terminals are left alone.
    fn adjust_ref_if_nonterminal(&mut self, key: DefaultKey, delta: i32) {
        if let Symbol::RuleRef { rule_id } = self.symbols[key].symbol {
            if let Some(&head) = self.rule_index.get(&rule_id) {
                self.adjust_refcount(head, delta);
            }
        }
    }
}
