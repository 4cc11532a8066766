use crate::symbol::FIRST_NONTERMINAL;
use crate::wire::{self, Leading};
use ahash::AHashMap as HashMap;
use anyhow::{bail, ensure, Context, Result};
use std::io::{Bytes, Read, Write};
use tracing::{debug, trace};

/// Block decompressor.
///
/// Parses the framed transmission, rebuilds each block's rule table, and
/// expands the main rule back into raw bytes. All state lives in this
/// value; per-block state is dropped before the next block is parsed.
pub struct Decompressor<R, W> {
    input: Bytes<R>,
    output: W,
    written: u64,
}

/// One parsed block: rule bodies keyed by head value, plus the head value
/// of the main rule (the first rule in the block).
struct Block {
    rules: HashMap<u32, Vec<u32>>,
    main: u32,
}

/// One parsed unit at a value-start position.
enum Item {
    Value(u32),
    Marker(u8),
}

impl<R: Read, W: Write> Decompressor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: input.bytes(),
            output,
            written: 0,
        }
    }

    /// Decompresses the whole transmission. Returns the number of raw bytes
    /// written.
    pub fn run(mut self) -> Result<u64> {
        let first = self.require_byte()?;
        ensure!(
            first == wire::SOT,
            "transmission does not begin with SOT (found {first:#04x})"
        );

        loop {
            let byte = self.require_byte()?;
            match byte {
                wire::SOB => {
                    let block = self.read_block()?;
                    let bytes_out = self.expand(&block)?;
                    debug!(rules = block.rules.len(), bytes_out, "decompressed block");
                }
                wire::EOT => break,
                other => bail!("expected SOB or EOT, found byte {other:#04x}"),
            }
        }

        ensure!(self.next_byte()?.is_none(), "trailing bytes after EOT");

        self.output.flush().context("flushing decompressed output")?;
        Ok(self.written)
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        self.input
            .next()
            .transpose()
            .context("reading compressed input")
    }

    fn require_byte(&mut self) -> Result<u8> {
        self.next_byte()?
            .context("unexpected end of compressed stream")
    }

    /// Reads one value or marker starting at the current position.
    fn read_item(&mut self) -> Result<Item> {
        let byte = self.require_byte()?;
        match wire::classify(byte) {
            Leading::Value1(v) => Ok(Item::Value(v)),
            Leading::Marker(m) => {
                ensure!(
                    wire::is_marker(m),
                    "continuation byte {m:#04x} where a value or marker was expected"
                );
                Ok(Item::Marker(m))
            }
            Leading::Start { span, bits } => {
                let mut value = bits;
                for _ in 0..span {
                    let b = self.require_byte()?;
                    ensure!(
                        wire::is_continuation(b),
                        "expected a continuation byte, found {b:#04x}"
                    );
                    value = (value << 6) | (b & 0x3F) as u32;
                }
                Ok(Item::Value(value))
            }
            Leading::Invalid => bail!("invalid leading byte {byte:#04x}"),
        }
    }

    /// Parses the rules of one block, up to and including its EOB.
    fn read_block(&mut self) -> Result<Block> {
        let mut rules: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut main = None;

        loop {
            let (head, body, terminator) = self.read_rule(main.is_none())?;
            trace!(head, body_len = body.len(), "parsed rule");

            if rules.insert(head, body).is_some() {
                bail!("rule {head} defined twice within a block");
            }
            if main.is_none() {
                main = Some(head);
            }
            if terminator == wire::EOB {
                break;
            }
        }

        Ok(Block {
            rules,
            main: main.expect("a block holds at least one rule"),
        })
    }

    /// Parses one rule: head value, body values, and the marker (RD or EOB)
    /// that ended it.
    ///
    /// The main rule only needs a non-empty body; any other rule the engine
    /// can produce has at least two body symbols, and shorter is malformed.
    fn read_rule(&mut self, is_main: bool) -> Result<(u32, Vec<u32>, u8)> {
        let head = match self.read_item()? {
            Item::Value(v) if v >= FIRST_NONTERMINAL => v,
            Item::Value(v) => bail!("rule head {v} is not a nonterminal"),
            Item::Marker(m) => bail!("expected a rule head, found marker {m:#04x}"),
        };

        let mut body = Vec::new();
        loop {
            match self.read_item()? {
                Item::Value(v) => body.push(v),
                Item::Marker(m @ (wire::RD | wire::EOB)) => {
                    let min_body = if is_main { 1 } else { 2 };
                    ensure!(
                        body.len() >= min_body,
                        "rule {head} has an undersized body ({} symbols)",
                        body.len()
                    );
                    return Ok((head, body, m));
                }
                Item::Marker(m) => bail!("unexpected marker {m:#04x} inside a block"),
            }
        }
    }

    /// Expands the block's main rule depth-first and writes the bytes out.
    ///
    /// The walk keeps an explicit stack of body cursors. A reference chain
    /// deeper than the block's rule count necessarily revisits a rule, so
    /// it is rejected as cyclic rather than expanded forever.
    fn expand(&mut self, block: &Block) -> Result<u64> {
        let main_body = block
            .rules
            .get(&block.main)
            .expect("the main rule was parsed");

        let before = self.written;
        let mut stack: Vec<std::slice::Iter<'_, u32>> = vec![main_body.iter()];

        while let Some(top) = stack.last_mut() {
            match top.next() {
                None => {
                    stack.pop();
                }
                Some(&v) if v < FIRST_NONTERMINAL => {
                    self.output
                        .write_all(&[v as u8])
                        .context("writing decompressed output")?;
                    self.written += 1;
                }
                Some(&v) => {
                    ensure!(
                        v <= wire::MAX_RULE_VALUE,
                        "nonterminal {v} is out of range"
                    );
                    let body = block
                        .rules
                        .get(&v)
                        .with_context(|| format!("undefined nonterminal {v}"))?;
                    ensure!(
                        stack.len() < block.rules.len(),
                        "cyclic reference through nonterminal {v}"
                    );
                    stack.push(body.iter());
                }
            }
        }

        Ok(self.written - before)
    }
}

/// Decompresses `input` into `output`. Returns the number of raw bytes
/// written.
pub fn decompress<R: Read, W: Write>(input: R, output: W) -> Result<u64> {
    Decompressor::new(input, output).run()
}
