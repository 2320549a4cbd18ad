//! Machine geometry constants.
//!
//! Sizes and widths of the target machine's storage and registers. These are
//! fixed properties of the board, not tunables; runtime knobs live in
//! [`crate::config`].

/// Number of instruction words in ROM (64 Ki).
pub const ROM_WORDS: usize = 64 * 1024;

/// ROM size in bytes. Each instruction word is an opcode/operand byte pair.
pub const ROM_BYTES: usize = 2 * ROM_WORDS;

/// RAM size in bytes (32 KiB).
pub const RAM_BYTES: usize = 32 * 1024;

/// Number of RAM address bits actually decoded. The 16-bit address bus is
/// masked to this width; the top bit is ignored by the board.
pub const RAM_ADDR_BITS: u32 = 15;

/// Width of the program counter in bits.
pub const PC_BITS: u32 = 16;

/// Width of the data registers (AC, X, Y, IN, OUT, XOUT, IR, D) in bits.
pub const REG_BITS: u32 = 8;

/// Page size implied by the split program counter: in-page branches replace
/// only the low byte, so control flow pages are 256 words.
pub const PAGE_WORDS: usize = 256;
