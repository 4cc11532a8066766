use crate::sequitur::Sequitur;
use crate::wire;
use anyhow::{ensure, Context, Result};
use std::io::{Bytes, Read, Write};
use tracing::debug;

/// Block compressor.
///
/// Reads raw bytes, builds a grammar per block with [`Sequitur`], and writes
/// the framed transmission. All state lives in this value, so independent
/// compressions can run side by side.
pub struct Compressor<R, W> {
    input: Bytes<R>,
    output: W,
    block_bytes: usize,
    written: u64,
}

impl<R: Read, W: Write> Compressor<R, W> {
    /// Creates a compressor that reads at most `block_kib` KiB per block.
    pub fn new(input: R, output: W, block_kib: u32) -> Result<Self> {
        ensure!(block_kib >= 1, "block size must be at least 1 KiB");
        Ok(Self {
            input: input.bytes(),
            output,
            block_bytes: block_kib as usize * 1024,
            written: 0,
        })
    }

    /// Compresses the whole input stream. Returns the number of compressed
    /// bytes written.
    pub fn run(mut self) -> Result<u64> {
        self.put(wire::SOT)?;

        let mut carry = self.next_input_byte()?;
        while let Some(byte) = carry.take() {
            let mut seq = Sequitur::new();
            seq.push(byte);
            for _ in 1..self.block_bytes {
                match self.next_input_byte()? {
                    Some(b) => seq.push(b),
                    None => break,
                }
            }
            // A full block may be followed by more input
            if seq.len() == self.block_bytes {
                carry = self.next_input_byte()?;
            }

            self.write_block(&seq)?;
            debug!(
                bytes = seq.len(),
                rules = seq.rules().len(),
                "compressed block"
            );
        }

        self.put(wire::EOT)?;
        self.output.flush().context("flushing compressed output")?;
        Ok(self.written)
    }

    fn next_input_byte(&mut self) -> Result<Option<u8>> {
        self.input.next().transpose().context("reading input")
    }

    fn put(&mut self, byte: u8) -> Result<()> {
        self.output
            .write_all(&[byte])
            .context("writing compressed output")?;
        self.written += 1;
        Ok(())
    }

    fn write_block(&mut self, seq: &Sequitur) -> Result<()> {
        self.put(wire::SOB)?;
        for i in 0..seq.grammar.rule_order.len() {
            if i > 0 {
                self.put(wire::RD)?;
            }
            let rule_id = seq.grammar.rule_order[i];
            self.write_rule(seq, rule_id)?;
        }
        self.put(wire::EOB)?;
        Ok(())
    }

    /// Emits the head value followed by each body symbol's value in order.
    fn write_rule(&mut self, seq: &Sequitur, rule_id: u32) -> Result<()> {
        self.written += wire::write_value(rule_id, &mut self.output)? as u64;

        let head_key = seq.grammar.rule_index[&rule_id];
        let mut current = seq.grammar.symbols[head_key].next;
        while let Some(key) = current {
            let node = &seq.grammar.symbols[key];
            if node.symbol.is_tail() {
                break;
            }
            self.written += wire::write_value(node.symbol.value(), &mut self.output)? as u64;
            current = node.next;
        }
        Ok(())
    }
}

/// Compresses `input` into `output` with the given block size in KiB.
/// Returns the number of compressed bytes written.
pub fn compress<R: Read, W: Write>(input: R, output: W, block_kib: u32) -> Result<u64> {
    Compressor::new(input, output, block_kib)?.run()
}
