//! Stand-alone function translation driver.
//!
//! Control flow, locals, and calls are lowered by the surrounding machinery;
//! what this driver covers is the straight-line numeric case: the entry
//! block's parameters seed the operand stack, the operator sequence is
//! translated one by one, and whatever the sequence leaves on the stack is
//! returned. The translation tests are its main user.

use crate::code_translator::{optionally_bitcast_vector, translate_operator};
use crate::operators::Operator;
use crate::state::FuncTranslationState;
use crate::WasmResult;
use kestrel_ir::{Function, FunctionBuilder};

/// WebAssembly to Kestrel IR function translator.
///
/// A `FuncTranslator` keeps the translation state so it can be reused across
/// functions in the same compilation job.
pub struct FuncTranslator {
    state: FuncTranslationState,
}

impl FuncTranslator {
    /// Create a new translator.
    pub fn new() -> Self {
        FuncTranslator {
            state: FuncTranslationState::new(),
        }
    }

    /// Translate the straight-line sequence `operators` into `func`.
    ///
    /// The entry block gets one parameter per signature parameter, seeding
    /// the operand stack. After the last operator the remaining stack must
    /// match the signature's returns; vector values are re-typed to the
    /// declared return types before the `return`.
    pub fn translate(&mut self, operators: &[Operator], func: &mut Function) -> WasmResult<()> {
        log::trace!("translating function {} ({} operators)", func.name, operators.len());
        self.state.clear();

        let mut builder = FunctionBuilder::new(func);
        let entry = builder.create_block();
        for ty in builder.func.signature.params.clone() {
            let param = builder.append_block_param(entry, ty);
            self.state.push1(param);
        }
        builder.switch_to_block(entry);

        for op in operators {
            translate_operator(op, &mut builder, &mut self.state)?;
        }

        let return_types = builder.func.signature.returns.clone();
        assert_eq!(
            self.state.stack.len(),
            return_types.len(),
            "operand stack does not match the signature's returns"
        );
        let mut results = std::mem::take(&mut self.state.stack);
        for (value, &ty) in results.iter_mut().zip(&return_types) {
            if ty.is_vector() {
                *value = optionally_bitcast_vector(*value, ty, &mut builder);
            }
        }
        builder.ins().return_(&results);
        Ok(())
    }
}

impl Default for FuncTranslator {
    fn default() -> Self {
        Self::new()
    }
}
