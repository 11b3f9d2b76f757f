//! Translation state: the value stack mirroring the wasm evaluation stack.

use kestrel_ir::{Block, TrapCode, Value};
use std::collections::HashMap;

/// Contains information passed along during a function's translation.
///
/// The `stack` mimics the execution of the WebAssembly stack machine: every
/// operator's arguments are popped off it and its result pushed back on.
/// Underflow is a decoder contract violation and panics; validated code never
/// gets here with a short stack.
pub struct FuncTranslationState {
    pub(crate) stack: Vec<Value>,
    /// Shared trap targets, one block per trap code, created lazily.
    pub(crate) trap_blocks: HashMap<TrapCode, Block>,
}

impl FuncTranslationState {
    /// Create an empty state.
    pub fn new() -> Self {
        FuncTranslationState {
            stack: Vec::new(),
            trap_blocks: HashMap::new(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
        self.trap_blocks.clear();
    }

    /// Push a value.
    pub fn push1(&mut self, val: Value) {
        self.stack.push(val);
    }

    /// Pop one value.
    pub fn pop1(&mut self) -> Value {
        self.stack
            .pop()
            .expect("attempted to pop a value from an empty stack")
    }

    /// Pop two values. Return them in the order they were pushed.
    pub fn pop2(&mut self) -> (Value, Value) {
        let v2 = self.pop1();
        let v1 = self.pop1();
        (v1, v2)
    }

    /// Pop three values. Return them in the order they were pushed.
    pub fn pop3(&mut self) -> (Value, Value, Value) {
        let v3 = self.pop1();
        let v2 = self.pop1();
        let v1 = self.pop1();
        (v1, v2, v3)
    }
}

impl Default for FuncTranslationState {
    fn default() -> Self {
        Self::new()
    }
}
