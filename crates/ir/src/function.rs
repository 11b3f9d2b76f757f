//! Functions and their dataflow graphs.

use crate::entities::{Block, FuncRef, Inst, Value};
use crate::instructions::InstructionData;
use crate::libcall::LibCall;
use crate::types::Type;
use core::ops::Index;

/// A function signature: parameter and return types.
#[derive(Clone, PartialEq, Debug)]
pub struct Signature {
    /// Parameter types.
    pub params: Vec<Type>,
    /// Return types.
    pub returns: Vec<Type>,
}

impl Signature {
    /// Create a signature.
    pub fn new(params: Vec<Type>, returns: Vec<Type>) -> Self {
        Signature { params, returns }
    }
}

/// Where a value comes from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ValueDef {
    /// The value is the result of an instruction.
    Result(Inst),
    /// The value is a block parameter.
    Param(Block),
}

#[derive(Clone, Debug)]
struct ValueData {
    ty: Type,
    def: ValueDef,
}

/// The instructions of a function and the values they define.
#[derive(Clone, Debug, Default)]
pub struct DataFlowGraph {
    insts: Vec<InstructionData>,
    results: Vec<Option<Value>>,
    values: Vec<ValueData>,
}

impl DataFlowGraph {
    /// The type of an SSA value.
    pub fn value_type(&self, value: Value) -> Type {
        self.values[value.index()].ty
    }

    /// Where a value comes from.
    pub fn value_def(&self, value: Value) -> ValueDef {
        self.values[value.index()].def
    }

    /// The result defined by `inst`, if it defines one.
    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.results[inst.index()]
    }

    /// The result defined by `inst`; panics if it defines none.
    pub fn first_result(&self, inst: Inst) -> Value {
        self.results[inst.index()]
            .expect("instruction has no result")
    }

    /// Number of values created so far.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// Number of instructions created so far.
    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    pub(crate) fn make_inst(&mut self, data: InstructionData) -> Inst {
        let inst = Inst::from_u32(self.insts.len() as u32);
        self.insts.push(data);
        self.results.push(None);
        inst
    }

    pub(crate) fn make_value(&mut self, ty: Type, def: ValueDef) -> Value {
        let value = Value::from_u32(self.values.len() as u32);
        self.values.push(ValueData { ty, def });
        value
    }

    pub(crate) fn attach_result(&mut self, inst: Inst, ty: Type) -> Value {
        debug_assert!(self.results[inst.index()].is_none());
        let value = self.make_value(ty, ValueDef::Result(inst));
        self.results[inst.index()] = Some(value);
        value
    }
}

impl Index<Inst> for DataFlowGraph {
    type Output = InstructionData;

    fn index(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst.index()]
    }
}

/// An out-of-line runtime routine imported into a function.
#[derive(Clone, Debug)]
pub struct ExtFuncData {
    /// Which routine this is.
    pub libcall: LibCall,
    /// The routine's signature.
    pub signature: Signature,
}

#[derive(Clone, Debug, Default)]
struct BlockData {
    params: Vec<Value>,
    insts: Vec<Inst>,
    cold: bool,
}

/// An IR function under construction.
#[derive(Clone, Debug)]
pub struct Function {
    /// The function's symbol name.
    pub name: String,
    /// The function's signature.
    pub signature: Signature,
    /// The instructions and values of the function.
    pub dfg: DataFlowGraph,
    blocks: Vec<BlockData>,
    ext_funcs: Vec<ExtFuncData>,
}

impl Function {
    /// Create a function with the given name and signature.
    pub fn with_name_signature(name: impl Into<String>, signature: Signature) -> Self {
        Function {
            name: name.into(),
            signature,
            dfg: DataFlowGraph::default(),
            blocks: Vec::new(),
            ext_funcs: Vec::new(),
        }
    }

    /// Create a new, empty block.
    pub fn create_block(&mut self) -> Block {
        let block = Block::from_u32(self.blocks.len() as u32);
        self.blocks.push(BlockData::default());
        block
    }

    /// The first block created, which is where execution enters.
    pub fn entry_block(&self) -> Option<Block> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(Block::from_u32(0))
        }
    }

    /// Append a parameter to `block` and return the value bound to it.
    pub fn append_block_param(&mut self, block: Block, ty: Type) -> Value {
        let value = self.dfg.make_value(ty, ValueDef::Param(block));
        self.blocks[block.index()].params.push(value);
        value
    }

    /// The parameters of `block`.
    pub fn block_params(&self, block: Block) -> &[Value] {
        &self.blocks[block.index()].params
    }

    /// The instructions of `block`, in order.
    pub fn block_insts(&self, block: Block) -> &[Inst] {
        &self.blocks[block.index()].insts
    }

    /// Iterate over all blocks in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> {
        (0..self.blocks.len() as u32).map(Block::from_u32)
    }

    /// Mark `block` as rarely executed.
    pub fn set_cold(&mut self, block: Block) {
        self.blocks[block.index()].cold = true;
    }

    /// Whether `block` is marked as rarely executed.
    pub fn is_block_cold(&self, block: Block) -> bool {
        self.blocks[block.index()].cold
    }

    /// Import an out-of-line runtime routine, reusing an existing import of
    /// the same routine.
    pub fn import_intrinsic(&mut self, libcall: LibCall) -> FuncRef {
        if let Some(idx) = self.ext_funcs.iter().position(|f| f.libcall == libcall) {
            return FuncRef::from_u32(idx as u32);
        }
        let func_ref = FuncRef::from_u32(self.ext_funcs.len() as u32);
        self.ext_funcs.push(ExtFuncData {
            libcall,
            signature: libcall.signature(),
        });
        func_ref
    }

    /// The import data for `func_ref`.
    pub fn ext_func(&self, func_ref: FuncRef) -> &ExtFuncData {
        &self.ext_funcs[func_ref.index()]
    }

    pub(crate) fn append_inst(&mut self, block: Block, inst: Inst) {
        self.blocks[block.index()].insts.push(inst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{F32, I32};

    #[test]
    fn intrinsic_imports_dedup() {
        let mut func =
            Function::with_name_signature("test", Signature::new(vec![F32], vec![F32]));
        let a = func.import_intrinsic(LibCall::F32Min);
        let b = func.import_intrinsic(LibCall::F32Max);
        let c = func.import_intrinsic(LibCall::F32Min);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(func.ext_func(a).signature.params.len(), 2);
    }

    #[test]
    fn block_params() {
        let mut func = Function::with_name_signature("test", Signature::new(vec![], vec![]));
        let block = func.create_block();
        let v = func.append_block_param(block, I32);
        assert_eq!(func.block_params(block), &[v]);
        assert_eq!(func.dfg.value_type(v), I32);
        assert_eq!(func.dfg.value_def(v), ValueDef::Param(block));
        assert_eq!(func.entry_block(), Some(block));
    }
}
