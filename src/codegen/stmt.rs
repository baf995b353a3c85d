use std::collections::BTreeSet;

use crate::ast::{
    AssignOp, Assignment, Block, Conditional, ElseArm, Expr, Initializer, Stmt, StmtKind, VarDecl,
    WhileLoop,
};
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOpcode, Terminator, Type};
use crate::token::Position;

use super::builder::{FunctionBuilder, Local, LoopContext};
use super::expr::coerce;
use super::{resolve_type, CodeGenerator};

#[derive(Clone, Copy)]
enum Jump {
    Break,
    Continue,
}

impl CodeGenerator {
    pub(super) fn lower_block(&mut self, f: &mut FunctionBuilder, block: &Block) -> CompileResult<()> {
        block
            .statements
            .iter()
            .try_for_each(|stmt| self.lower_stmt(f, stmt))
    }

    fn lower_stmt(&mut self, f: &mut FunctionBuilder, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Declaration(decl) => self.lower_declaration(f, decl, stmt.position),
            StmtKind::Assignment(assignment) => self.lower_assignment(f, assignment, stmt.position),
            StmtKind::Return(value) => self.lower_return(f, value.as_ref(), stmt.position),
            StmtKind::If(conditional) => self.lower_conditional(f, conditional),
            StmtKind::While(while_loop) => self.lower_while(f, while_loop),
            StmtKind::Break => lower_jump(f, Jump::Break, stmt.position),
            StmtKind::Continue => lower_jump(f, Jump::Continue, stmt.position),
            StmtKind::Call(call) => self.lower_call(f, call, stmt.position).map(drop),
        }
    }

    fn lower_declaration(
        &mut self,
        f: &mut FunctionBuilder,
        decl: &VarDecl,
        position: Position,
    ) -> CompileResult<()> {
        let ty = resolve_type(&decl.ty)?;

        let init = match &decl.init {
            None => None,
            Some(Initializer::Expr(expr)) => {
                let value = self.lower_expr(f, expr)?;
                let context = format!("initializer of `{}`", decl.name);
                Some(coerce(f, value, &ty, expr.position, &context)?)
            }
            Some(Initializer::Array(_)) => {
                return Err(CompileError::structural(
                    Some(position),
                    "array initializers are not supported",
                ))
            }
        };

        let ptr = f.alloca(&decl.name, ty.clone());
        if let Some(value) = init {
            f.store(value, ptr.clone());
        }
        f.bind(&decl.name, Local::Slot { ptr, ty });
        Ok(())
    }

    fn lower_assignment(
        &mut self,
        f: &mut FunctionBuilder,
        assignment: &Assignment,
        position: Position,
    ) -> CompileResult<()> {
        let target = &assignment.target;
        let (ptr, ty) = match f.lookup(target).cloned() {
            Some(Local::Slot { ptr, ty }) => (ptr, ty),
            Some(Local::Param(_)) => f.materialize_param(target).ok_or_else(|| {
                CompileError::structural(Some(position), format!("cannot assign to `{target}`"))
            })?,
            None if self.globals.contains_key(target) => {
                return Err(CompileError::structural(
                    Some(position),
                    format!("cannot assign to constant `{target}`"),
                ))
            }
            None => {
                return Err(CompileError::name(
                    Some(position),
                    format!("unknown identifier `{target}`"),
                ))
            }
        };

        let rhs = self.lower_expr(f, &assignment.value)?;
        let context = format!("assignment to `{target}`");
        let rhs = coerce(f, rhs, &ty, assignment.value.position, &context)?;

        let value = match assignment.op {
            AssignOp::Assign => rhs,
            op => {
                let opcode = compound_opcode(op, &ty, position)?;
                let current = f.load(&ptr, ty.clone());
                f.binary(opcode, current, rhs)
            }
        };
        f.store(value, ptr);
        Ok(())
    }

    fn lower_return(
        &mut self,
        f: &mut FunctionBuilder,
        value: Option<&Expr>,
        position: Position,
    ) -> CompileResult<()> {
        let ret = f.return_type().clone();
        let terminator = match (value, ret) {
            (None, Type::Void) => Terminator::Ret(None),
            (None, ret) => {
                return Err(CompileError::type_error(
                    Some(position),
                    format!("missing return value in function returning `{ret}`"),
                ))
            }
            (Some(expr), Type::Void) => {
                return Err(CompileError::type_error(
                    Some(expr.position),
                    "cannot return a value from a `void` function",
                ))
            }
            (Some(expr), ret) => {
                let value = self.lower_expr(f, expr)?;
                Terminator::Ret(Some(coerce(f, value, &ret, expr.position, "return value")?))
            }
        };
        f.terminate(terminator);
        Ok(())
    }

    fn lower_conditional(
        &mut self,
        f: &mut FunctionBuilder,
        conditional: &Conditional,
    ) -> CompileResult<()> {
        let condition = self.lower_condition(f, &conditional.condition)?;

        let id = f.next_construct_id();
        let then_block = f.append_block(format!("if.then.{id}"));
        let else_block = conditional.else_branch.as_ref().map(|arm| {
            f.append_block(match arm {
                ElseArm::ElseIf(_) => format!("if.elseif.{id}"),
                ElseArm::Else(_) => format!("if.else.{id}"),
            })
        });
        let end = f.append_block(format!("if.end.{id}"));

        f.terminate(Terminator::CondBr {
            condition,
            then_block,
            else_block: else_block.unwrap_or(end),
        });

        f.position_at(then_block);
        self.lower_block(f, &conditional.then_branch)?;
        if !f.is_terminated() {
            f.terminate(Terminator::Br(end));
        }

        if let (Some(arm), Some(else_block)) = (&conditional.else_branch, else_block) {
            f.position_at(else_block);
            match arm {
                ElseArm::ElseIf(nested) => self.lower_conditional(f, nested)?,
                ElseArm::Else(block) => self.lower_block(f, block)?,
            }
            if !f.is_terminated() {
                f.terminate(Terminator::Br(end));
            }
        }

        f.position_at(end);
        Ok(())
    }

    fn lower_while(&mut self, f: &mut FunctionBuilder, while_loop: &WhileLoop) -> CompileResult<()> {
        let id = f.next_construct_id();
        let context = LoopContext {
            condition: f.append_block(format!("while.cond.{id}")),
            body: f.append_block(format!("while.body.{id}")),
            end: f.append_block(format!("while.end.{id}")),
        };

        f.terminate(Terminator::Br(context.condition));
        f.position_at(context.condition);
        let condition = self.lower_condition(f, &while_loop.condition)?;
        f.terminate(Terminator::CondBr {
            condition,
            then_block: context.body,
            else_block: context.end,
        });

        f.push_loop(context);
        f.position_at(context.body);
        let body = self.lower_block(f, &while_loop.body);
        f.pop_loop();
        body?;

        if !f.is_terminated() {
            f.terminate(Terminator::Br(context.condition));
        }
        f.position_at(context.end);
        Ok(())
    }
}

fn lower_jump(f: &mut FunctionBuilder, jump: Jump, position: Position) -> CompileResult<()> {
    let (keyword, target) = match (jump, f.innermost_loop()) {
        (Jump::Break, Some(context)) => ("break", Some(context.end)),
        (Jump::Continue, Some(context)) => ("continue", Some(context.condition)),
        (Jump::Break, None) => ("break", None),
        (Jump::Continue, None) => ("continue", None),
    };
    let target = target.ok_or_else(|| {
        CompileError::structural(Some(position), format!("`{keyword}` outside of a loop"))
    })?;
    f.terminate(Terminator::Br(target));
    Ok(())
}

fn compound_opcode(op: AssignOp, ty: &Type, position: Position) -> CompileResult<BinaryOpcode> {
    let opcode = match (ty, op) {
        (Type::I32, AssignOp::Add) => BinaryOpcode::Add,
        (Type::I32, AssignOp::Sub) => BinaryOpcode::Sub,
        (Type::I32, AssignOp::Mul) => BinaryOpcode::Mul,
        (Type::I32, AssignOp::Div) => BinaryOpcode::SDiv,
        (Type::I32, AssignOp::Rem) => BinaryOpcode::SRem,
        (Type::I32, AssignOp::BitAnd) => BinaryOpcode::And,
        (Type::I32, AssignOp::BitOr) => BinaryOpcode::Or,
        (Type::I32, AssignOp::BitXor) => BinaryOpcode::Xor,
        (Type::I32, AssignOp::Shl) => BinaryOpcode::Shl,
        (Type::I32, AssignOp::Shr) => BinaryOpcode::AShr,
        (Type::Double, AssignOp::Add) => BinaryOpcode::FAdd,
        (Type::Double, AssignOp::Sub) => BinaryOpcode::FSub,
        (Type::Double, AssignOp::Mul) => BinaryOpcode::FMul,
        (Type::Double, AssignOp::Div) => BinaryOpcode::FDiv,
        (Type::Double, AssignOp::Rem) => BinaryOpcode::FRem,
        (ty, op) => {
            return Err(CompileError::type_error(
                Some(position),
                format!("operator `{}` does not support `{ty}` operands", op.symbol()),
            ))
        }
    };
    Ok(opcode)
}

/// Names assigned anywhere in `block`, nested blocks included.
pub(super) fn assigned_names(block: &Block) -> BTreeSet<String> {
    fn walk(block: &Block, out: &mut BTreeSet<String>) {
        for stmt in &block.statements {
            match &stmt.kind {
                StmtKind::Assignment(assignment) => {
                    out.insert(assignment.target.clone());
                }
                StmtKind::If(conditional) => walk_conditional(conditional, out),
                StmtKind::While(while_loop) => walk(&while_loop.body, out),
                _ => {}
            }
        }
    }

    fn walk_conditional(conditional: &Conditional, out: &mut BTreeSet<String>) {
        walk(&conditional.then_branch, out);
        match &conditional.else_branch {
            Some(ElseArm::ElseIf(nested)) => walk_conditional(nested, out),
            Some(ElseArm::Else(block)) => walk(block, out),
            None => {}
        }
    }

    let mut out = BTreeSet::new();
    walk(block, &mut out);
    out
}
