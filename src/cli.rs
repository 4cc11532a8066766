//! Command-line validation.
//!
//! Options are packed into a single bitmap word: bit 0 requests help, bit 1
//! selects compression, bit 2 selects decompression, and for compression
//! bits 16-31 carry the block size in KiB.

use anyhow::{bail, Result};

/// Help was requested.
pub const OPT_HELP: u32 = 1 << 0;
/// Compress standard input to standard output.
pub const OPT_COMPRESS: u32 = 1 << 1;
/// Decompress standard input to standard output.
pub const OPT_DECOMPRESS: u32 = 1 << 2;

pub const DEFAULT_BLOCK_KIB: u32 = 1024;
pub const MAX_BLOCK_KIB: u32 = 1024;

/// Block size in KiB carried in the bitmap's high 16 bits.
pub fn block_kib(options: u32) -> u32 {
    options >> 16
}

/// Validates `argv` (program name included at index 0) and returns the
/// option bitmap.
///
/// Accepted invocations: `-h` first (anything may follow), `-c` alone,
/// `-d` alone, or `-c -b N` with N a decimal block size in
/// [1, [`MAX_BLOCK_KIB`]] without leading zeros. Anything else is a usage
/// error.
pub fn validate_args<S: AsRef<str>>(argv: &[S]) -> Result<u32> {
    let args: Vec<&str> = argv.iter().map(AsRef::as_ref).collect();

    // -h in first position wins regardless of what follows
    if args.len() > 1 && args[1] == "-h" {
        return Ok(OPT_HELP);
    }

    if args.len() == 2 {
        if args[1] == "-d" {
            return Ok(OPT_DECOMPRESS);
        }
        if args[1] == "-c" {
            return Ok(OPT_COMPRESS | (DEFAULT_BLOCK_KIB << 16));
        }
    }

    if args.len() == 4 && args[1] == "-c" && args[2] == "-b" {
        if let Some(kib) = parse_block_kib(args[3]) {
            return Ok(OPT_COMPRESS | (kib << 16));
        }
        bail!("invalid block size {:?}", args[3]);
    }

    bail!("unrecognized arguments");
}

/// Parses a block size: decimal digits only, no leading zeros, in range.
fn parse_block_kib(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    let kib: u32 = s.parse().ok()?;
    (1..=MAX_BLOCK_KIB).contains(&kib).then_some(kib)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<u32> {
        validate_args(args)
    }

    #[test]
    fn test_help_first_position() {
        assert_eq!(parse(&["prog", "-h"]).unwrap(), OPT_HELP);
        assert_eq!(parse(&["prog", "-h", "-c", "-b", "99"]).unwrap(), OPT_HELP);
    }

    #[test]
    fn test_help_elsewhere_fails() {
        assert!(parse(&["prog", "-c", "-h"]).is_err());
        assert!(parse(&["prog", "-d", "-h"]).is_err());
    }

    #[test]
    fn test_compress_default_block() {
        let options = parse(&["prog", "-c"]).unwrap();
        assert_eq!(options & 0xFFFF, OPT_COMPRESS);
        assert_eq!(block_kib(options), DEFAULT_BLOCK_KIB);
    }

    #[test]
    fn test_decompress() {
        assert_eq!(parse(&["prog", "-d"]).unwrap(), OPT_DECOMPRESS);
    }

    #[test]
    fn test_compress_with_block_size() {
        let options = parse(&["prog", "-c", "-b", "512"]).unwrap();
        assert_eq!(options & 0xFFFF, OPT_COMPRESS);
        assert_eq!(block_kib(options), 512);

        assert_eq!(block_kib(parse(&["prog", "-c", "-b", "1"]).unwrap()), 1);
        assert_eq!(
            block_kib(parse(&["prog", "-c", "-b", "1024"]).unwrap()),
            1024
        );
    }

    #[test]
    fn test_bad_block_sizes() {
        assert!(parse(&["prog", "-c", "-b", "0"]).is_err());
        assert!(parse(&["prog", "-c", "-b", "1025"]).is_err());
        assert!(parse(&["prog", "-c", "-b", "01"]).is_err());
        assert!(parse(&["prog", "-c", "-b", "12a"]).is_err());
        assert!(parse(&["prog", "-c", "-b", ""]).is_err());
        assert!(parse(&["prog", "-c", "-b", "-5"]).is_err());
        assert!(parse(&["prog", "-c", "-b", "99999999999"]).is_err());
    }

    #[test]
    fn test_unrecognized_combinations() {
        assert!(parse(&["prog"]).is_err());
        assert!(parse(&["prog", "-x"]).is_err());
        assert!(parse(&["prog", "-c", "-d"]).is_err());
        assert!(parse(&["prog", "-d", "-b", "512"]).is_err());
        assert!(parse(&["prog", "-b", "512"]).is_err());
        assert!(parse(&["prog", "-c", "-b"]).is_err());
        assert!(parse(&["prog", "-c", "512", "-b"]).is_err());
    }
}
