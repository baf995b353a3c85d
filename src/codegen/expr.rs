use crate::ast::{BinaryOp, Call, Expr, ExprKind, UnaryOp};
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryOpcode, FloatPredicate, IntPredicate, Operand, Signature, Type, Value};
use crate::token::Position;

use super::builder::{FunctionBuilder, Local};
use super::{CodeGenerator, PRINTF};

/// How a binary operator lowers for one operand type.
enum Lowering {
    Arith(BinaryOpcode),
    ICmp(IntPredicate),
    FCmp(FloatPredicate),
}

impl CodeGenerator {
    pub(super) fn lower_expr(&mut self, f: &mut FunctionBuilder, expr: &Expr) -> CompileResult<Value> {
        match &expr.kind {
            ExprKind::Number(text) => literal(text, expr.position),
            ExprKind::Identifier(name) => self.lower_identifier(f, name, expr.position),
            ExprKind::Call(call) => self.lower_call(f, call, expr.position),
            ExprKind::Unary { op, operand } => self.lower_unary(f, *op, operand, expr.position),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(f, *op, lhs, rhs, expr.position),
        }
    }

    /// Lower `expr` to an `i1` branch condition.
    pub(super) fn lower_condition(&mut self, f: &mut FunctionBuilder, expr: &Expr) -> CompileResult<Value> {
        let value = self.lower_expr(f, expr)?;
        to_condition(f, value, expr.position)
    }

    fn lower_identifier(
        &mut self,
        f: &mut FunctionBuilder,
        name: &str,
        position: Position,
    ) -> CompileResult<Value> {
        match f.lookup(name).cloned() {
            Some(Local::Param(value)) => Ok(value),
            Some(Local::Slot { ptr, ty }) => Ok(f.load(&ptr, ty)),
            None => self.globals.get(name).cloned().ok_or_else(|| {
                CompileError::name(Some(position), format!("unknown identifier `{name}`"))
            }),
        }
    }

    fn lower_unary(
        &mut self,
        f: &mut FunctionBuilder,
        op: UnaryOp,
        operand: &Expr,
        position: Position,
    ) -> CompileResult<Value> {
        let value = self.lower_expr(f, operand)?;
        let ty = value.ty.clone();
        match (op, &ty) {
            (UnaryOp::Neg, Type::I32) => Ok(f.binary(BinaryOpcode::Sub, Value::int(0), value)),
            (UnaryOp::Neg, Type::Double) => Ok(f.fneg(value)),
            (UnaryOp::Not, _) => {
                let condition = to_condition(f, value, operand.position)?;
                Ok(f.binary(BinaryOpcode::Xor, condition, Value::bool(true)))
            }
            (UnaryOp::BitNot, Type::I32) => Ok(f.binary(BinaryOpcode::Xor, value, Value::int(-1))),
            (op, ty) => Err(CompileError::type_error(
                Some(position),
                format!("operator `{}` does not support `{ty}` operands", op.symbol()),
            )),
        }
    }

    fn lower_binary(
        &mut self,
        f: &mut FunctionBuilder,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        position: Position,
    ) -> CompileResult<Value> {
        let left = self.lower_expr(f, lhs)?;
        let right = self.lower_expr(f, rhs)?;

        if left.ty != right.ty {
            return Err(CompileError::type_error(
                Some(position),
                format!(
                    "operands of `{}` have different types: `{}` and `{}`",
                    op.symbol(),
                    left.ty,
                    right.ty
                ),
            ));
        }

        let ty = left.ty.clone();
        match (op, &ty) {
            (BinaryOp::And | BinaryOp::Or, _) => {
                let left = to_condition(f, left, lhs.position)?;
                let right = to_condition(f, right, rhs.position)?;
                let opcode = if op == BinaryOp::And {
                    BinaryOpcode::And
                } else {
                    BinaryOpcode::Or
                };
                return Ok(f.binary(opcode, left, right));
            }
            (BinaryOp::Eq, Type::I1) => return Ok(f.icmp(IntPredicate::Eq, left, right)),
            (BinaryOp::Ne, Type::I1) => return Ok(f.icmp(IntPredicate::Ne, left, right)),
            _ => {}
        }

        let lowering = match &ty {
            Type::I32 => int_lowering(op),
            Type::Double => float_lowering(op),
            ty => {
                return Err(CompileError::type_error(
                    Some(position),
                    format!("operator `{}` does not support `{ty}` operands", op.symbol()),
                ))
            }
        };

        match lowering {
            Some(Lowering::Arith(opcode)) => Ok(f.binary(opcode, left, right)),
            Some(Lowering::ICmp(pred)) => Ok(f.icmp(pred, left, right)),
            Some(Lowering::FCmp(pred)) => Ok(f.fcmp(pred, left, right)),
            None => Err(CompileError::structural(
                Some(position),
                format!("unsupported binary operator `{}`", op.symbol()),
            )),
        }
    }

    pub(super) fn lower_call(
        &mut self,
        f: &mut FunctionBuilder,
        call: &Call,
        position: Position,
    ) -> CompileResult<Value> {
        if call.callee == PRINTF && !self.signatures.contains_key(PRINTF) {
            self.declare_printf();
        }
        let signature = self.signatures.get(&call.callee).cloned().ok_or_else(|| {
            CompileError::name(
                Some(position),
                format!("function `{}` not found", call.callee),
            )
        })?;

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push((self.lower_expr(f, arg)?, arg.position));
        }

        if call.callee == PRINTF && self.implicit_printf {
            return self.lower_printf(f, args, signature);
        }

        if args.len() != signature.params.len() {
            return Err(CompileError::type_error(
                Some(position),
                format!(
                    "function `{}` expects {} argument(s), found {}",
                    call.callee,
                    signature.params.len(),
                    args.len()
                ),
            ));
        }

        let mut values = Vec::with_capacity(args.len());
        for (i, ((value, arg_position), expected)) in
            args.into_iter().zip(&signature.params).enumerate()
        {
            let context = format!("argument {} of `{}`", i + 1, call.callee);
            values.push(coerce(f, value, expected, arg_position, &context)?);
        }

        Ok(f.call(&call.callee, signature, values))
    }

    /// `printf(a, b)` prints each argument with `%d` or `%f` and a newline.
    fn lower_printf(
        &mut self,
        f: &mut FunctionBuilder,
        args: Vec<(Value, Position)>,
        signature: Signature,
    ) -> CompileResult<Value> {
        let mut format = String::new();
        let mut values = Vec::with_capacity(args.len() + 1);
        for (value, position) in args {
            match value.ty {
                Type::I32 => format.push_str("%d"),
                Type::I1 => {
                    format.push_str("%d");
                    values.push(f.zext(value, Type::I32));
                    continue;
                }
                Type::Double => format.push_str("%f"),
                ref ty => {
                    return Err(CompileError::type_error(
                        Some(position),
                        format!("cannot print a value of type `{ty}`"),
                    ))
                }
            }
            values.push(value);
        }

        let mut bytes = format.into_bytes();
        bytes.extend_from_slice(b"\n\0");
        let (global, array) = self.add_format_string(bytes);
        values.insert(
            0,
            Value {
                ty: Type::I8.pointer_to(),
                operand: Operand::GlobalElement { global, array },
            },
        );

        Ok(f.call(PRINTF, signature, values))
    }
}

/// Widen `i1` to `i32` where an integer is expected; any other mismatch is
/// a type error.
pub(super) fn coerce(
    f: &mut FunctionBuilder,
    value: Value,
    expected: &Type,
    position: Position,
    context: &str,
) -> CompileResult<Value> {
    if &value.ty == expected {
        return Ok(value);
    }
    if value.ty == Type::I1 && *expected == Type::I32 {
        return Ok(f.zext(value, Type::I32));
    }
    Err(CompileError::type_error(
        Some(position),
        format!("{context}: expected `{expected}`, found `{}`", value.ty),
    ))
}

fn to_condition(f: &mut FunctionBuilder, value: Value, position: Position) -> CompileResult<Value> {
    match value.ty {
        Type::I1 => Ok(value),
        Type::I32 => Ok(f.icmp(IntPredicate::Ne, value, Value::int(0))),
        Type::Double => Ok(f.fcmp(FloatPredicate::One, value, Value::float(0.0))),
        ref ty => Err(CompileError::type_error(
            Some(position),
            format!("a `{ty}` value cannot be used as a condition"),
        )),
    }
}

/// Numbers with a `.` are doubles; everything else must fit in an `i32`.
fn literal(text: &str, position: Position) -> CompileResult<Value> {
    if text.contains('.') {
        return text.parse::<f64>().map(Value::float).map_err(|_| {
            CompileError::type_error(Some(position), format!("invalid float literal `{text}`"))
        });
    }
    text.parse::<i32>().map(Value::int).map_err(|_| {
        CompileError::type_error(
            Some(position),
            format!("integer literal `{text}` does not fit in 32 bits"),
        )
    })
}

fn int_lowering(op: BinaryOp) -> Option<Lowering> {
    Some(match op {
        BinaryOp::Add => Lowering::Arith(BinaryOpcode::Add),
        BinaryOp::Sub => Lowering::Arith(BinaryOpcode::Sub),
        BinaryOp::Mul => Lowering::Arith(BinaryOpcode::Mul),
        BinaryOp::Div => Lowering::Arith(BinaryOpcode::SDiv),
        BinaryOp::Rem => Lowering::Arith(BinaryOpcode::SRem),
        BinaryOp::Eq => Lowering::ICmp(IntPredicate::Eq),
        BinaryOp::Ne => Lowering::ICmp(IntPredicate::Ne),
        BinaryOp::Lt => Lowering::ICmp(IntPredicate::Slt),
        BinaryOp::Le => Lowering::ICmp(IntPredicate::Sle),
        BinaryOp::Gt => Lowering::ICmp(IntPredicate::Sgt),
        BinaryOp::Ge => Lowering::ICmp(IntPredicate::Sge),
        BinaryOp::Pow | BinaryOp::And | BinaryOp::Or => return None,
    })
}

fn float_lowering(op: BinaryOp) -> Option<Lowering> {
    Some(match op {
        BinaryOp::Add => Lowering::Arith(BinaryOpcode::FAdd),
        BinaryOp::Sub => Lowering::Arith(BinaryOpcode::FSub),
        BinaryOp::Mul => Lowering::Arith(BinaryOpcode::FMul),
        BinaryOp::Div => Lowering::Arith(BinaryOpcode::FDiv),
        BinaryOp::Rem => Lowering::Arith(BinaryOpcode::FRem),
        BinaryOp::Eq => Lowering::FCmp(FloatPredicate::Oeq),
        BinaryOp::Ne => Lowering::FCmp(FloatPredicate::One),
        BinaryOp::Lt => Lowering::FCmp(FloatPredicate::Olt),
        BinaryOp::Le => Lowering::FCmp(FloatPredicate::Ole),
        BinaryOp::Gt => Lowering::FCmp(FloatPredicate::Ogt),
        BinaryOp::Ge => Lowering::FCmp(FloatPredicate::Oge),
        BinaryOp::Pow | BinaryOp::And | BinaryOp::Or => return None,
    })
}
