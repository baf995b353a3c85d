//! LLVM assembly text for a [`Module`].
//!
//! Output uses typed-pointer syntax (`i8*`) so it is accepted by `llc`
//! releases that predate opaque pointers.

use std::fmt::{self, Display, Formatter, Write as _};

use super::*;

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(value) => write!(f, "{value}"),
            // Hex form is exact for every double.
            Operand::Float(value) => write!(f, "0x{:016X}", value.to_bits()),
            Operand::Local(name) => write!(f, "%{name}"),
            Operand::GlobalElement { global, array } => write!(
                f,
                "getelementptr inbounds ({array}, {array}* @{global}, i64 0, i64 0)"
            ),
            Operand::Unit => f.write_str("undef"),
        }
    }
}

/// Bare operand, with booleans spelled `true`/`false`.
struct Bare<'a>(&'a Value);

impl Display for Bare<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.0.ty, &self.0.operand) {
            (Type::I1, Operand::Int(v)) => f.write_str(if *v != 0 { "true" } else { "false" }),
            (_, operand) => operand.fmt(f),
        }
    }
}

/// `type operand`, as used in argument lists and stores.
struct Typed<'a>(&'a Value);

impl Display for Typed<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0.ty, Bare(self.0))
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty } => write!(f, "%{dest} = alloca {ty}"),
            Instruction::Load { dest, ty, ptr } => {
                write!(f, "%{dest} = load {ty}, {}", Typed(ptr))
            }
            Instruction::Store { value, ptr } => {
                write!(f, "store {}, {}", Typed(value), Typed(ptr))
            }
            Instruction::Binary { dest, op, lhs, rhs } => write!(
                f,
                "%{dest} = {} {}, {}",
                op.mnemonic(),
                Typed(lhs),
                Bare(rhs)
            ),
            Instruction::ICmp {
                dest,
                pred,
                lhs,
                rhs,
            } => write!(
                f,
                "%{dest} = icmp {} {}, {}",
                pred.mnemonic(),
                Typed(lhs),
                Bare(rhs)
            ),
            Instruction::FCmp {
                dest,
                pred,
                lhs,
                rhs,
            } => write!(
                f,
                "%{dest} = fcmp {} {}, {}",
                pred.mnemonic(),
                Typed(lhs),
                Bare(rhs)
            ),
            Instruction::FNeg { dest, operand } => write!(f, "%{dest} = fneg {}", Typed(operand)),
            Instruction::ZExt { dest, value, to } => {
                write!(f, "%{dest} = zext {} to {to}", Typed(value))
            }
            Instruction::Call {
                dest,
                callee,
                signature,
                args,
            } => {
                if let Some(dest) = dest {
                    write!(f, "%{dest} = ")?;
                }
                write!(f, "call {}", signature.ret)?;
                if signature.variadic {
                    write!(f, " ({})", ParamTypes(signature))?;
                }
                write!(f, " @{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Typed(arg).fmt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// `i8*, ...` style parameter type list.
struct ParamTypes<'a>(&'a Signature);

impl Display for ParamTypes<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.0.params.iter().map(Type::to_string).collect();
        if self.0.variadic {
            parts.push("...".to_string());
        }
        f.write_str(&parts.join(", "))
    }
}

struct TerminatorIn<'a> {
    terminator: &'a Terminator,
    function: &'a Function,
}

impl Display for TerminatorIn<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = |id: BlockId| block_label(self.function, id);
        match self.terminator {
            Terminator::Br(target) => write!(f, "br label %{}", label(*target)),
            Terminator::CondBr {
                condition,
                then_block,
                else_block,
            } => write!(
                f,
                "br {}, label %{}, label %{}",
                Typed(condition),
                label(*then_block),
                label(*else_block)
            ),
            Terminator::Ret(None) => f.write_str("ret void"),
            Terminator::Ret(Some(value)) => write!(f, "ret {}", Typed(value)),
        }
    }
}

fn block_label(function: &Function, id: BlockId) -> String {
    function.block(id).label.clone()
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_declaration() {
            return writeln!(
                f,
                "declare {} @{}({})",
                self.ret,
                self.name,
                ParamTypes(&self.signature())
            );
        }

        let params = self
            .params
            .iter()
            .map(|p| format!("{} %{}", p.ty, p.name))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "define {} @{}({params}) {{", self.ret, self.name)?;

        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}:", block.label)?;
            for instruction in &block.instructions {
                writeln!(f, "  {instruction}")?;
            }
            if let Some(terminator) = &block.terminator {
                writeln!(
                    f,
                    "  {}",
                    TerminatorIn {
                        terminator,
                        function: self,
                    }
                )?;
            }
        }

        writeln!(f, "}}")
    }
}

impl Display for Global {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let linkage = match self.linkage {
            Linkage::Internal => "internal",
            Linkage::Private => "private unnamed_addr",
        };
        write!(f, "@{} = {linkage} constant {} ", self.name, self.init.ty())?;
        match &self.init {
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Bytes(bytes) => write!(f, "c\"{}\"", escape_bytes(bytes)),
        }
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;
        if let Some(triple) = &self.target_triple {
            writeln!(f, "target triple = \"{triple}\"")?;
        }

        if !self.globals.is_empty() {
            writeln!(f)?;
            for global in &self.globals {
                writeln!(f, "{global}")?;
            }
        }

        for function in &self.functions {
            writeln!(f)?;
            function.fmt(f)?;
        }
        Ok(())
    }
}

/// Escape bytes for an LLVM `c"..."` string literal.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\{b:02X}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_newline_nul_and_quotes() {
        assert_eq!(escape_bytes(b"%d\n\0"), "%d\\0A\\00");
        assert_eq!(escape_bytes(b"a\"b\\"), "a\\22b\\5C");
    }

    #[test]
    fn float_operands_render_as_exact_hex() {
        assert_eq!(Operand::Float(1.0).to_string(), "0x3FF0000000000000");
    }

    #[test]
    fn variadic_call_spells_out_function_type() {
        let call = Instruction::Call {
            dest: Some(".t0".into()),
            callee: "printf".into(),
            signature: Signature {
                ret: Type::I32,
                params: vec![Type::I8.pointer_to()],
                variadic: true,
            },
            args: vec![
                Value {
                    ty: Type::I8.pointer_to(),
                    operand: Operand::GlobalElement {
                        global: ".fmt.0".into(),
                        array: Type::Array(4, Box::new(Type::I8)),
                    },
                },
                Value::int(7),
            ],
        };
        assert_eq!(
            call.to_string(),
            "%.t0 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([4 x i8], [4 x i8]* @.fmt.0, i64 0, i64 0), i32 7)"
        );
    }
}
