use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::ir::{
    BasicBlock, BinaryOpcode, BlockId, FloatPredicate, Function, Instruction, IntPredicate,
    Signature, Terminator, Type, Value,
};

const ENTRY: &str = "entry";

/// What a name in the local environment refers to.
#[derive(Debug, Clone)]
pub(crate) enum Local {
    /// A parameter used directly as a value.
    Param(Value),
    /// A stack slot; `ptr` has type `ty*`.
    Slot { ptr: Value, ty: Type },
}

/// Branch targets of the innermost active `while`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopContext {
    pub condition: BlockId,
    pub body: BlockId,
    pub end: BlockId,
}

/// Builds one function: owns its blocks, the insertion point, the local
/// environment and the loop-context stack. Dropped once the function is done,
/// so nothing leaks into the next one.
pub(crate) struct FunctionBuilder {
    function: Function,
    current: BlockId,
    locals: HashMap<String, Local>,
    loops: Vec<LoopContext>,
    names: HashSet<String>,
    next_temp: usize,
    next_construct: usize,
    prologue_len: usize,
}

impl FunctionBuilder {
    pub fn new(mut function: Function) -> Self {
        function.blocks.push(BasicBlock::new(ENTRY));

        let mut builder = Self {
            function,
            current: BlockId(0),
            locals: HashMap::new(),
            loops: Vec::new(),
            names: HashSet::new(),
            next_temp: 0,
            next_construct: 0,
            prologue_len: 0,
        };
        builder.names.insert(ENTRY.to_string());

        // Labels and values share one namespace, so a parameter may be renamed
        // in the output while its source name stays bound.
        for index in 0..builder.function.params.len() {
            let source = builder.function.params[index].name.clone();
            let name = builder.fresh_name(&source);
            let param = &mut builder.function.params[index];
            param.name = name.clone();
            let value = Value::local(name, param.ty.clone());
            builder.locals.insert(source, Local::Param(value));
        }
        builder
    }

    pub fn return_type(&self) -> &Type {
        &self.function.ret
    }

    // ---- blocks ----

    /// Fresh suffix shared by the blocks of one control-flow construct.
    pub fn next_construct_id(&mut self) -> usize {
        let id = self.next_construct;
        self.next_construct += 1;
        id
    }

    pub fn append_block(&mut self, label: String) -> BlockId {
        let label = self.fresh_name(&label);
        trace!(function = %self.function.name, %label, "append block");
        self.function.blocks.push(BasicBlock::new(label));
        BlockId(self.function.blocks.len() - 1)
    }

    pub fn position_at(&mut self, block: BlockId) {
        self.current = block;
    }

    pub fn is_terminated(&self) -> bool {
        self.function.block(self.current).is_terminated()
    }

    /// Code after a terminator goes into a fresh, unreachable block.
    fn ensure_open(&mut self) {
        if self.is_terminated() {
            let id = self.next_construct_id();
            let block = self.append_block(format!("dead.{id}"));
            self.position_at(block);
        }
    }

    pub fn terminate(&mut self, terminator: Terminator) {
        self.ensure_open();
        self.function.blocks[self.current.0].terminator = Some(terminator);
    }

    fn push(&mut self, instruction: Instruction) {
        self.ensure_open();
        self.function.blocks[self.current.0]
            .instructions
            .push(instruction);
    }

    /// Insert at the head of the entry block, after earlier slots.
    fn push_prologue(&mut self, instruction: Instruction) {
        self.function.blocks[0]
            .instructions
            .insert(self.prologue_len, instruction);
        self.prologue_len += 1;
    }

    // ---- names and locals ----

    fn fresh_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut n = 0;
        while self.names.contains(&name) {
            n += 1;
            name = format!("{base}.{n}");
        }
        self.names.insert(name.clone());
        name
    }

    fn temp(&mut self) -> String {
        let name = format!(".t{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    pub fn lookup(&self, name: &str) -> Option<&Local> {
        self.locals.get(name)
    }

    /// Bind `name`, replacing any previous binding in this function.
    pub fn bind(&mut self, name: &str, local: Local) {
        self.locals.insert(name.to_string(), local);
    }

    /// Allocate a named stack slot in the entry block and return its pointer.
    pub fn alloca(&mut self, name: &str, ty: Type) -> Value {
        let dest = self.fresh_name(name);
        self.push_prologue(Instruction::Alloca {
            dest: dest.clone(),
            ty: ty.clone(),
        });
        Value::local(dest, ty.pointer_to())
    }

    /// Move a parameter into a stack slot initialised on entry, so it can be
    /// assigned. Returns the slot, or `None` if `name` is not a direct parameter.
    pub fn materialize_param(&mut self, name: &str) -> Option<(Value, Type)> {
        let Some(Local::Param(value)) = self.locals.get(name).cloned() else {
            return None;
        };
        let ty = value.ty.clone();
        let ptr = self.alloca(&format!("{name}.addr"), ty.clone());
        self.push_prologue(Instruction::Store {
            value,
            ptr: ptr.clone(),
        });
        self.bind(
            name,
            Local::Slot {
                ptr: ptr.clone(),
                ty: ty.clone(),
            },
        );
        Some((ptr, ty))
    }

    // ---- loops ----

    pub fn push_loop(&mut self, context: LoopContext) {
        self.loops.push(context);
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    pub fn innermost_loop(&self) -> Option<LoopContext> {
        self.loops.last().copied()
    }

    // ---- instructions ----

    pub fn load(&mut self, ptr: &Value, ty: Type) -> Value {
        let dest = self.temp();
        self.push(Instruction::Load {
            dest: dest.clone(),
            ty: ty.clone(),
            ptr: ptr.clone(),
        });
        Value::local(dest, ty)
    }

    pub fn store(&mut self, value: Value, ptr: Value) {
        self.push(Instruction::Store { value, ptr });
    }

    /// Result has the type of `lhs`.
    pub fn binary(&mut self, op: BinaryOpcode, lhs: Value, rhs: Value) -> Value {
        let dest = self.temp();
        let ty = lhs.ty.clone();
        self.push(Instruction::Binary {
            dest: dest.clone(),
            op,
            lhs,
            rhs,
        });
        Value::local(dest, ty)
    }

    pub fn icmp(&mut self, pred: IntPredicate, lhs: Value, rhs: Value) -> Value {
        let dest = self.temp();
        self.push(Instruction::ICmp {
            dest: dest.clone(),
            pred,
            lhs,
            rhs,
        });
        Value::local(dest, Type::I1)
    }

    pub fn fcmp(&mut self, pred: FloatPredicate, lhs: Value, rhs: Value) -> Value {
        let dest = self.temp();
        self.push(Instruction::FCmp {
            dest: dest.clone(),
            pred,
            lhs,
            rhs,
        });
        Value::local(dest, Type::I1)
    }

    pub fn fneg(&mut self, operand: Value) -> Value {
        let dest = self.temp();
        let ty = operand.ty.clone();
        self.push(Instruction::FNeg {
            dest: dest.clone(),
            operand,
        });
        Value::local(dest, ty)
    }

    pub fn zext(&mut self, value: Value, to: Type) -> Value {
        let dest = self.temp();
        self.push(Instruction::ZExt {
            dest: dest.clone(),
            value,
            to: to.clone(),
        });
        Value::local(dest, to)
    }

    /// Calls to `void` functions produce [`Value::unit`].
    pub fn call(&mut self, callee: &str, signature: Signature, args: Vec<Value>) -> Value {
        if signature.ret == Type::Void {
            self.push(Instruction::Call {
                dest: None,
                callee: callee.to_string(),
                signature,
                args,
            });
            return Value::unit();
        }

        let dest = self.temp();
        let ty = signature.ret.clone();
        self.push(Instruction::Call {
            dest: Some(dest.clone()),
            callee: callee.to_string(),
            signature,
            args,
        });
        Value::local(dest, ty)
    }

    /// Give every unterminated block a return and hand back the function.
    pub fn finish(mut self) -> Function {
        let fallback = Value::zero(&self.function.ret);
        for block in &mut self.function.blocks {
            if block.terminator.is_none() {
                trace!(function = %self.function.name, label = %block.label, "default return");
                block.terminator = Some(Terminator::Ret(fallback.clone()));
            }
        }
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Param;

    fn builder() -> FunctionBuilder {
        FunctionBuilder::new(Function::new(
            "f",
            Type::I32,
            vec![Param {
                name: "a".into(),
                ty: Type::I32,
            }],
        ))
    }

    #[test]
    fn slot_names_never_collide_with_parameters() {
        let mut b = builder();
        let first = b.alloca("a", Type::I32);
        let second = b.alloca("a", Type::I32);
        assert_eq!(first.local_name(), Some("a.1"));
        assert_eq!(second.local_name(), Some("a.2"));
    }

    #[test]
    fn parameter_named_like_entry_label_is_renamed() {
        let b = FunctionBuilder::new(Function::new(
            "f",
            Type::I32,
            vec![Param {
                name: "entry".into(),
                ty: Type::I32,
            }],
        ));
        let Some(Local::Param(value)) = b.lookup("entry") else {
            panic!("parameter not bound");
        };
        assert_eq!(value.local_name(), Some("entry.1"));
        let function = b.finish();
        assert_eq!(function.params[0].name, "entry.1");
        assert_eq!(function.blocks[0].label, "entry");
    }

    #[test]
    fn emitting_after_terminator_opens_dead_block() {
        let mut b = builder();
        b.terminate(Terminator::Ret(Some(Value::int(1))));
        b.store(Value::int(2), Value::local("x", Type::I32.pointer_to()));
        let function = b.finish();
        assert_eq!(function.blocks.len(), 2);
        assert_eq!(function.blocks[1].label, "dead.0");
        assert!(function.blocks.iter().all(BasicBlock::is_terminated));
    }

    #[test]
    fn materialized_parameter_is_stored_on_entry() {
        let mut b = builder();
        let (ptr, ty) = b.materialize_param("a").unwrap();
        assert_eq!(ty, Type::I32);
        assert_eq!(ptr.local_name(), Some("a.addr"));
        assert!(matches!(b.lookup("a"), Some(Local::Slot { .. })));
        assert!(b.materialize_param("a").is_none());

        let function = b.finish();
        assert!(matches!(function.blocks[0].instructions[0], Instruction::Alloca { .. }));
        assert!(matches!(function.blocks[0].instructions[1], Instruction::Store { .. }));
    }
}
