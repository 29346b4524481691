//! keycode: Platform-neutral key identifiers and chord specs.
//!
//! - `Key`: Named modifier/function/navigation keys plus `Key::Char` for
//!   printable characters.
//! - Spec helpers: `Key::from_spec`, `Key::to_spec` used by the bindings
//!   file parser.
//! - `Chord`: an order-insensitive set of keys held together.
//!
//! Key identifiers are positional in spirit: `Key::Char('s')` is the S key
//! whether or not shift is held.

mod key;
pub use key::Key;

mod spec;

mod chord;
pub use chord::Chord;
