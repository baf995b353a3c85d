//! Typed, basic-block structured intermediate representation.
//!
//! A [`Module`] is what the code generator produces and what
//! [`render`](self::render) serialises into LLVM assembly for the external
//! backend. Each [`BasicBlock`] holds straight-line instructions and at most
//! one [`Terminator`]; a verified module has exactly one per block.

use std::collections::HashSet;
use std::fmt;

use crate::error::{CompileError, CompileResult};

pub mod render;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    /// Comparison results and branch conditions.
    I1,
    I8,
    I32,
    Double,
    Pointer(Box<Type>),
    Array(usize, Box<Type>),
}

impl Type {
    pub fn pointer_to(self) -> Type {
        Type::Pointer(Box::new(self))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::I1 => f.write_str("i1"),
            Type::I8 => f.write_str("i8"),
            Type::I32 => f.write_str("i32"),
            Type::Double => f.write_str("double"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Array(len, inner) => write!(f, "[{len} x {inner}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
    /// `%name`: a parameter, stack slot or temporary.
    Local(String),
    /// Pointer to the first element of a global array (`getelementptr` constant).
    GlobalElement { global: String, array: Type },
    /// Result of a call to a `void` function; never rendered.
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub ty: Type,
    pub operand: Operand,
}

impl Value {
    pub fn int(value: i32) -> Self {
        Self {
            ty: Type::I32,
            operand: Operand::Int(value.into()),
        }
    }

    pub fn bool(value: bool) -> Self {
        Self {
            ty: Type::I1,
            operand: Operand::Int(value.into()),
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            ty: Type::Double,
            operand: Operand::Float(value),
        }
    }

    pub fn local(name: impl Into<String>, ty: Type) -> Self {
        Self {
            ty,
            operand: Operand::Local(name.into()),
        }
    }

    pub fn unit() -> Self {
        Self {
            ty: Type::Void,
            operand: Operand::Unit,
        }
    }

    /// Zero of an integer or floating type.
    pub fn zero(ty: &Type) -> Option<Self> {
        match ty {
            Type::I1 => Some(Value::bool(false)),
            Type::I32 => Some(Value::int(0)),
            Type::Double => Some(Value::float(0.0)),
            _ => None,
        }
    }

    /// The name of a `%local` operand.
    pub fn local_name(&self) -> Option<&str> {
        match &self.operand {
            Operand::Local(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpcode {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    And,
    Or,
    Xor,
    Shl,
    AShr,
}

impl BinaryOpcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOpcode::Add => "add",
            BinaryOpcode::Sub => "sub",
            BinaryOpcode::Mul => "mul",
            BinaryOpcode::SDiv => "sdiv",
            BinaryOpcode::SRem => "srem",
            BinaryOpcode::FAdd => "fadd",
            BinaryOpcode::FSub => "fsub",
            BinaryOpcode::FMul => "fmul",
            BinaryOpcode::FDiv => "fdiv",
            BinaryOpcode::FRem => "frem",
            BinaryOpcode::And => "and",
            BinaryOpcode::Or => "or",
            BinaryOpcode::Xor => "xor",
            BinaryOpcode::Shl => "shl",
            BinaryOpcode::AShr => "ashr",
        }
    }
}

/// Signed integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl IntPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
        }
    }
}

/// Ordered floating-point comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatPredicate {
    Oeq,
    One,
    Olt,
    Ole,
    Ogt,
    Oge,
}

impl FloatPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Alloca {
        dest: String,
        ty: Type,
    },
    Load {
        dest: String,
        ty: Type,
        ptr: Value,
    },
    Store {
        value: Value,
        ptr: Value,
    },
    Binary {
        dest: String,
        op: BinaryOpcode,
        lhs: Value,
        rhs: Value,
    },
    ICmp {
        dest: String,
        pred: IntPredicate,
        lhs: Value,
        rhs: Value,
    },
    FCmp {
        dest: String,
        pred: FloatPredicate,
        lhs: Value,
        rhs: Value,
    },
    FNeg {
        dest: String,
        operand: Value,
    },
    ZExt {
        dest: String,
        value: Value,
        to: Type,
    },
    Call {
        dest: Option<String>,
        callee: String,
        signature: Signature,
        args: Vec<Value>,
    },
}

impl Instruction {
    /// The `%name` this instruction defines, if any.
    pub fn dest(&self) -> Option<&str> {
        match self {
            Instruction::Alloca { dest, .. }
            | Instruction::Load { dest, .. }
            | Instruction::Binary { dest, .. }
            | Instruction::ICmp { dest, .. }
            | Instruction::FCmp { dest, .. }
            | Instruction::FNeg { dest, .. }
            | Instruction::ZExt { dest, .. } => Some(dest),
            Instruction::Call { dest, .. } => dest.as_deref(),
            Instruction::Store { .. } => None,
        }
    }
}

/// Index of a block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        condition: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    Ret(Option<Value>),
}

impl Terminator {
    /// Blocks this terminator may transfer control to.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Br(target) => vec![*target],
            Terminator::CondBr {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Ret(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            terminator: None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }
}

/// Return and parameter types of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub ret: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret: Type,
    pub params: Vec<Param>,
    pub variadic: bool,
    /// Empty for external declarations; otherwise `blocks[0]` is the entry.
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: impl Into<String>, ret: Type, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            ret,
            params,
            variadic: false,
            blocks: Vec::new(),
        }
    }

    pub fn signature(&self) -> Signature {
        Signature {
            ret: self.ret.clone(),
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            variadic: self.variadic,
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_by_label(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    /// Check the block-termination invariant, branch targets, and that
    /// parameters, labels and instruction results are named uniquely.
    pub fn verify(&self) -> CompileResult<()> {
        let mut names = HashSet::new();
        let defined = self
            .params
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.blocks.iter().flat_map(|b| {
                std::iter::once(b.label.as_str())
                    .chain(b.instructions.iter().filter_map(Instruction::dest))
            }));
        for name in defined {
            if !names.insert(name) {
                return Err(CompileError::structural(
                    None,
                    format!("`%{name}` is defined twice in function `{}`", self.name),
                ));
            }
        }

        for block in &self.blocks {
            let terminator = block.terminator.as_ref().ok_or_else(|| {
                CompileError::structural(
                    None,
                    format!(
                        "block `{}` in function `{}` has no terminator",
                        block.label, self.name
                    ),
                )
            })?;
            if let Some(target) = terminator
                .successors()
                .into_iter()
                .find(|t| t.0 >= self.blocks.len())
            {
                return Err(CompileError::structural(
                    None,
                    format!(
                        "block `{}` in function `{}` branches to missing block #{}",
                        block.label, self.name, target.0
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    /// Raw bytes of an `[N x i8]` array, terminator included.
    Bytes(Vec<u8>),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Constant::Int(_) => Type::I32,
            Constant::Bytes(bytes) => Type::Array(bytes.len(), Box::new(Type::I8)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    /// Named module constants (`#define`).
    Internal,
    /// Compiler-synthesised data such as `printf` format strings.
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub linkage: Linkage,
    pub init: Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub target_triple: Option<String>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_triple: None,
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }

    /// Insert a global, replacing an existing one with the same name.
    pub fn set_global(&mut self, global: Global) {
        match self.globals.iter_mut().find(|g| g.name == global.name) {
            Some(existing) => *existing = global,
            None => self.globals.push(global),
        }
    }

    /// Verify every defined function.
    pub fn verify(&self) -> CompileResult<()> {
        self.functions
            .iter()
            .filter(|f| !f.is_declaration())
            .try_for_each(Function::verify)
    }
}
