//! Lowering of a parsed [`Program`] into an IR [`Module`].
//!
//! The generator walks items in source order: `#define` directives become
//! global integer constants and every function is lowered into typed basic
//! blocks. Calls can only reach functions declared earlier (or the function
//! itself), plus the implicitly declared variadic `printf`.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::{Directive, DirectiveOperand, FunctionDecl, Item, Program, TypeName};
use crate::error::{CompileError, CompileResult};
use crate::ir::{Constant, Function, Global, Linkage, Module, Param, Signature, Type, Value};

mod builder;
mod expr;
mod stmt;

use builder::FunctionBuilder;

const PRINTF: &str = "printf";

/// Module-level lowering state: the module under construction, global
/// constants and the signatures of functions declared so far.
pub struct CodeGenerator {
    module: Module,
    globals: HashMap<String, Value>,
    signatures: HashMap<String, Signature>,
    implicit_printf: bool,
    format_strings: usize,
}

impl CodeGenerator {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: Module::new(module_name),
            globals: HashMap::new(),
            signatures: HashMap::new(),
            implicit_printf: false,
            format_strings: 0,
        }
    }

    pub fn with_target_triple(mut self, triple: impl Into<String>) -> Self {
        self.module.target_triple = Some(triple.into());
        self
    }

    /// Lower every item and hand back the finished module.
    pub fn lower_program(mut self, program: &Program) -> CompileResult<Module> {
        for item in &program.items {
            match item {
                Item::Directive(directive) => self.lower_directive(directive)?,
                Item::Function(function) => self.lower_function(function)?,
            }
        }

        debug!(
            functions = self.module.functions.len(),
            globals = self.module.globals.len(),
            "lowered module"
        );
        Ok(self.module)
    }

    /// Only `#define NAME <integer>` is supported.
    fn lower_directive(&mut self, directive: &Directive) -> CompileResult<()> {
        let unsupported = || {
            CompileError::structural(
                Some(directive.position),
                format!(
                    "unsupported preprocessor directive `{} {}`",
                    directive.name, directive.target
                ),
            )
        };

        let value = match (directive.name.as_str(), &directive.operand) {
            ("#define", Some(DirectiveOperand::Number(text))) => {
                text.parse::<i32>().map_err(|_| unsupported())?
            }
            _ => return Err(unsupported()),
        };

        if self.signatures.contains_key(&directive.target) {
            return Err(CompileError::name(
                Some(directive.position),
                format!("`{}` is already defined as a function", directive.target),
            ));
        }

        self.globals
            .insert(directive.target.clone(), Value::int(value));
        self.module.set_global(Global {
            name: directive.target.clone(),
            linkage: Linkage::Internal,
            init: Constant::Int(value),
        });
        Ok(())
    }

    fn lower_function(&mut self, decl: &FunctionDecl) -> CompileResult<()> {
        if self.signatures.contains_key(&decl.name) || self.globals.contains_key(&decl.name) {
            return Err(CompileError::name(
                Some(decl.position),
                format!("`{}` is already defined", decl.name),
            ));
        }

        let ret = resolve_type(&decl.return_type)?;
        let mut seen = HashSet::new();
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = resolve_type(&param.ty)?;
            if ty == Type::Void {
                return Err(CompileError::type_error(
                    Some(param.position),
                    format!("parameter `{}` cannot have type `void`", param.name),
                ));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(CompileError::name(
                    Some(param.position),
                    format!("duplicate parameter `{}`", param.name),
                ));
            }
            params.push(Param {
                name: param.name.clone(),
                ty,
            });
        }

        let function = Function::new(&decl.name, ret, params);
        // Registered before the body so the function can call itself.
        self.signatures
            .insert(decl.name.clone(), function.signature());

        let mut builder = FunctionBuilder::new(function);
        for name in stmt::assigned_names(&decl.body) {
            builder.materialize_param(&name);
        }
        self.lower_block(&mut builder, &decl.body)?;

        let function = builder.finish();
        debug!(
            function = %function.name,
            blocks = function.blocks.len(),
            "lowered function"
        );
        self.module.functions.push(function);
        Ok(())
    }

    fn declare_printf(&mut self) {
        let mut printf = Function::new(
            PRINTF,
            Type::I32,
            vec![Param {
                name: "format".to_string(),
                ty: Type::I8.pointer_to(),
            }],
        );
        printf.variadic = true;
        self.signatures
            .insert(PRINTF.to_string(), printf.signature());
        self.module.functions.push(printf);
        self.implicit_printf = true;
    }

    /// Add a NUL-terminated format string global; returns its name and array type.
    fn add_format_string(&mut self, bytes: Vec<u8>) -> (String, Type) {
        let name = format!(".fmt.{}", self.format_strings);
        self.format_strings += 1;
        let init = Constant::Bytes(bytes);
        let ty = init.ty();
        self.module.set_global(Global {
            name: name.clone(),
            linkage: Linkage::Private,
            init,
        });
        (name, ty)
    }
}

/// Map a source type name onto an IR type.
pub fn resolve_type(ty: &TypeName) -> CompileResult<Type> {
    if ty.is_array {
        return Err(CompileError::structural(
            Some(ty.position),
            format!("array type `{}` is not supported", ty.spelling()),
        ));
    }
    match ty.name.as_str() {
        "int" => Ok(Type::I32),
        "float" => Ok(Type::Double),
        "void" => Ok(Type::Void),
        other => Err(CompileError::type_error(
            Some(ty.position),
            format!("unsupported type `{other}`"),
        )),
    }
}

/// Lower `program` into a module named `velox`.
pub fn lower(program: &Program, target_triple: Option<&str>) -> CompileResult<Module> {
    let mut generator = CodeGenerator::new("velox");
    if let Some(triple) = target_triple {
        generator = generator.with_target_triple(triple);
    }
    generator.lower_program(program)
}
