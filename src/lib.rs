//! # gramzip - Block-Oriented Grammar Compression
//!
//! A grammar-based compressor and its symmetric decompressor. Input is
//! split into fixed-size blocks; each block's bytes are fed through an
//! incremental Sequitur engine that infers a context-free grammar while
//! enforcing two constraints:
//! 1. **Digram Uniqueness**: no pair of adjacent symbols appears more than
//!    once across the grammar
//! 2. **Rule Utility**: every rule except the start rule is used at least
//!    twice
//!
//! The resulting rule set is serialized in a UTF-8-shaped variable-width
//! integer code framed by marker bytes; decompression parses the framing,
//! rebuilds the rule table per block, and expands the start rule.
//!
//! ## Example
//!
//! ```
//! let data = b"abcabcabcabc".to_vec();
//!
//! let mut compressed = Vec::new();
//! gramzip::compress(&data[..], &mut compressed, 1024).unwrap();
//!
//! let mut restored = Vec::new();
//! gramzip::decompress(&compressed[..], &mut restored).unwrap();
//! assert_eq!(restored, data);
//! ```
//!
//! ## Using the engine directly
//!
//! ```
//! use gramzip::Sequitur;
//!
//! let mut seq = Sequitur::new();
//! seq.extend(*b"abcabcabc");
//!
//! // Reconstructs the original sequence
//! let reconstructed: Vec<u8> = seq.iter().collect();
//! assert_eq!(reconstructed, b"abcabcabc");
//!
//! println!("Created {} rules", seq.rules().len());
//! ```

pub mod cli;
mod decode;
mod encode;
mod grammar;
mod id_gen;
mod iter;
mod sequitur;
mod symbol;
mod wire;

#[cfg(test)]
mod tests;

pub use decode::{decompress, Decompressor};
pub use encode::{compress, Compressor};
pub use iter::SequiturIter;
pub use sequitur::{CompressionStats, Sequitur};
pub use symbol::FIRST_NONTERMINAL;
