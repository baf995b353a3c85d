//! Uniform `Kind(name) { children }` view of the AST, used for the indented
//! text dump.

use std::fmt::Write as _;

use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub kind: &'static str,
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(kind: &'static str, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            children: Vec::new(),
        }
    }

    fn node(kind: &'static str, name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            kind,
            name: name.into(),
            children,
        }
    }

    /// Render with four spaces per nesting level.
    pub fn to_indented_string(&self) -> String {
        let mut out = String::new();
        self.write_indented(&mut out, 0);
        out
    }

    fn write_indented(&self, out: &mut String, depth: usize) {
        let _ = write!(out, "{}({})", self.kind, self.name);
        if self.children.is_empty() {
            return;
        }
        out.push_str(" {\n");
        for child in &self.children {
            out.push_str(&"    ".repeat(depth + 1));
            child.write_indented(out, depth + 1);
            out.push('\n');
        }
        out.push_str(&"    ".repeat(depth));
        out.push('}');
    }
}

impl Program {
    pub fn to_tree(&self) -> TreeNode {
        let children = self
            .items
            .iter()
            .map(|item| match item {
                Item::Directive(d) => directive_tree(d),
                Item::Function(f) => function_tree(f),
            })
            .collect();
        TreeNode::node("Program", "Program", children)
    }
}

fn directive_tree(directive: &Directive) -> TreeNode {
    let mut children = vec![TreeNode::leaf("Identifier", &directive.target)];
    if let Some(operand) = &directive.operand {
        let text = match operand {
            DirectiveOperand::Number(text) | DirectiveOperand::String(text) => text,
        };
        children.push(TreeNode::leaf("Literal", text));
    }
    TreeNode::node("PreprocessorDirective", &directive.name, children)
}

fn function_tree(function: &FunctionDecl) -> TreeNode {
    let params = function
        .params
        .iter()
        .map(|p| {
            TreeNode::node(
                "VariableDeclaration",
                &p.name,
                vec![TreeNode::leaf("Identifier", p.ty.spelling())],
            )
        })
        .collect();
    TreeNode::node(
        "FunctionDeclaration",
        &function.name,
        vec![
            TreeNode::leaf("Identifier", function.return_type.spelling()),
            TreeNode::node("Parameters", "Parameters", params),
            block_tree(&function.body),
        ],
    )
}

fn block_tree(block: &Block) -> TreeNode {
    TreeNode::node(
        "Block",
        "Block",
        block.statements.iter().map(stmt_tree).collect(),
    )
}

fn stmt_tree(stmt: &Stmt) -> TreeNode {
    match &stmt.kind {
        StmtKind::Declaration(decl) => {
            let mut children = vec![TreeNode::leaf("Identifier", decl.ty.spelling())];
            match &decl.init {
                Some(Initializer::Expr(expr)) => children.push(expr_tree(expr)),
                Some(Initializer::Array(items)) => children.push(TreeNode::node(
                    "ArrayInitializer",
                    "ArrayInitializer",
                    items.iter().map(expr_tree).collect(),
                )),
                None => {}
            }
            TreeNode::node("VariableDeclaration", &decl.name, children)
        }
        StmtKind::Assignment(assign) => TreeNode::node(
            "Assignment",
            &assign.target,
            vec![
                TreeNode::leaf("Identifier", assign.op.symbol()),
                expr_tree(&assign.value),
            ],
        ),
        StmtKind::Return(value) => TreeNode::node(
            "ReturnStatement",
            "return",
            value.iter().map(expr_tree).collect(),
        ),
        StmtKind::If(conditional) => conditional_tree(conditional),
        StmtKind::While(lp) => TreeNode::node(
            "WhileStatement",
            "while",
            vec![expr_tree(&lp.condition), block_tree(&lp.body)],
        ),
        StmtKind::Break => TreeNode::leaf("Statement", "break"),
        StmtKind::Continue => TreeNode::leaf("Statement", "continue"),
        StmtKind::Call(call) => call_tree(call),
    }
}

fn conditional_tree(conditional: &Conditional) -> TreeNode {
    let mut children = vec![
        expr_tree(&conditional.condition),
        block_tree(&conditional.then_branch),
    ];
    match &conditional.else_branch {
        Some(ElseArm::ElseIf(nested)) => children.push(conditional_tree(nested)),
        Some(ElseArm::Else(block)) => children.push(block_tree(block)),
        None => {}
    }
    TreeNode::node("Statement", "if", children)
}

fn call_tree(call: &Call) -> TreeNode {
    TreeNode::node(
        "FunctionCall",
        &call.callee,
        call.args.iter().map(expr_tree).collect(),
    )
}

fn expr_tree(expr: &Expr) -> TreeNode {
    match &expr.kind {
        ExprKind::Number(text) => TreeNode::leaf("Literal", text),
        ExprKind::Identifier(name) => TreeNode::leaf("Identifier", name),
        ExprKind::Call(call) => call_tree(call),
        ExprKind::Unary { op, operand } => {
            TreeNode::node("UnaryExpression", op.symbol(), vec![expr_tree(operand)])
        }
        ExprKind::Binary { op, lhs, rhs } => TreeNode::node(
            "BinaryExpression",
            op.symbol(),
            vec![expr_tree(lhs), expr_tree(rhs)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indented_dump_nests_children() {
        let tree = TreeNode::node(
            "BinaryExpression",
            "+",
            vec![TreeNode::leaf("Literal", "1"), TreeNode::leaf("Literal", "2")],
        );
        assert_eq!(
            tree.to_indented_string(),
            "BinaryExpression(+) {\n    Literal(1)\n    Literal(2)\n}"
        );
    }
}
