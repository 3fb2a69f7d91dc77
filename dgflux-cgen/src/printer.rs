//! Rendering of the code representation to C++ source text.
//!
//! Expressions are parenthesized according to C++ operator precedence, and right operands of
//! equal precedence keep their grouping. Statements are indented by two spaces per nesting level.
use crate::ast::{
    BinaryOp, Block, Declarator, Expr, For, ForEach, FunctionBody, FunctionDeclaration, Module, ModuleItem,
    Statement, UnaryOp,
};
use itertools::Itertools;
use std::fmt;
use std::fmt::{Display, Formatter, Write};

pub const PREC_NONE: u8 = 0;
pub const PREC_COMPARISON: u8 = 1;
pub const PREC_SUM: u8 = 2;
pub const PREC_PRODUCT: u8 = 3;
pub const PREC_UNARY: u8 = 4;
pub const PREC_POSTFIX: u8 = 5;
pub const PREC_ATOM: u8 = 6;

const INDENT: &str = "  ";

impl BinaryOp {
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Less => PREC_COMPARISON,
            BinaryOp::Add | BinaryOp::Sub => PREC_SUM,
            BinaryOp::Mul | BinaryOp::Div => PREC_PRODUCT,
        }
    }
}

impl Expr {
    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Ident(_) => PREC_ATOM,
            // A negative literal prints with a leading minus and binds like a unary expression
            Expr::Int(value) if *value < 0 => PREC_UNARY,
            Expr::Real(value) if value.is_sign_negative() => PREC_UNARY,
            Expr::Int(_) | Expr::Real(_) => PREC_ATOM,
            Expr::Member(..) | Expr::Index(..) | Expr::Call(..) | Expr::MethodCall(..) => PREC_POSTFIX,
            Expr::Unary(..) => PREC_UNARY,
            Expr::Binary(op, _, _) => op.precedence(),
        }
    }

    /// Renders the expression as it would appear inside a context of the given precedence.
    pub fn to_code(&self, enclosing_prec: u8) -> String {
        let mut out = String::new();
        write_expr(&mut out, self, enclosing_prec).expect("Internal error: writing to a String cannot fail");
        out
    }
}

fn write_args(out: &mut impl Write, args: &[Expr]) -> fmt::Result {
    write!(out, "(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(out, ", ")?;
        }
        write_expr(out, arg, PREC_NONE)?;
    }
    write!(out, ")")
}

fn write_expr(out: &mut impl Write, expr: &Expr, enclosing_prec: u8) -> fmt::Result {
    let parenthesize = expr.precedence() < enclosing_prec;
    if parenthesize {
        write!(out, "(")?;
    }

    match expr {
        Expr::Ident(name) => write!(out, "{}", name)?,
        Expr::Int(value) => write!(out, "{}", value)?,
        // Debug formatting always includes a decimal point or exponent, so the literal
        // stays floating point in C++
        Expr::Real(value) => write!(out, "{:?}", value)?,
        Expr::Member(base, name) => {
            write_expr(out, base, PREC_POSTFIX)?;
            write!(out, ".{}", name)?;
        }
        Expr::Index(base, index) => {
            write_expr(out, base, PREC_POSTFIX)?;
            write!(out, "[")?;
            write_expr(out, index, PREC_NONE)?;
            write!(out, "]")?;
        }
        Expr::Call(function, args) => {
            write!(out, "{}", function)?;
            write_args(out, args)?;
        }
        Expr::MethodCall(receiver, name, args) => {
            write_expr(out, receiver, PREC_POSTFIX)?;
            write!(out, ".{}", name)?;
            write_args(out, args)?;
        }
        Expr::Unary(UnaryOp::Neg, operand) => {
            write!(out, "-")?;
            // Binding tighter than unary keeps us from ever printing `--x`
            write_expr(out, operand, PREC_UNARY + 1)?;
        }
        Expr::Binary(op, lhs, rhs) => {
            let prec = op.precedence();
            // `a*(b*c)` and `a*b*c` round differently, so right operands of equal precedence keep parentheses
            write_expr(out, lhs, prec)?;
            match op {
                BinaryOp::Mul | BinaryOp::Div => write!(out, "{}", op.symbol())?,
                _ => write!(out, " {} ", op.symbol())?,
            }
            write_expr(out, rhs, prec + 1)?;
        }
    }

    if parenthesize {
        write!(out, ")")?;
    }
    Ok(())
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expr(f, self, PREC_NONE)
    }
}

impl Display for Declarator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_type())?;
        if self.is_const() {
            write!(f, " const")?;
        }
        write!(f, " ")?;
        if self.is_reference() {
            write!(f, "&")?;
        }
        write!(f, "{}", self.name())?;
        if self.is_maybe_unused() {
            write!(f, " __attribute__ ((unused))")?;
        }
        Ok(())
    }
}

impl Display for FunctionDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.result, self.params.iter().join(", "))
    }
}

fn write_line(out: &mut String, indent: usize, line: impl Display) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
    writeln!(out, "{}", line).expect("Internal error: writing to a String cannot fail");
}

fn write_block(out: &mut String, block: &Block, indent: usize) {
    write_line(out, indent, "{");
    for statement in block.statements() {
        write_statement(out, statement, indent + 1);
    }
    write_line(out, indent, "}");
}

fn write_statement(out: &mut String, statement: &Statement, indent: usize) {
    match statement {
        Statement::Line => out.push('\n'),
        Statement::Raw(text) => write_line(out, indent, format_args!("{};", text)),
        Statement::Initializer(decl, value) => write_line(out, indent, format_args!("{} = {};", decl, value)),
        Statement::Assign(target, value) => write_line(out, indent, format_args!("{} = {};", target, value)),
        Statement::Block(block) => write_block(out, block, indent),
        Statement::For(For {
            counter,
            start,
            end,
            body,
        }) => {
            let condition = Expr::ident(counter.as_str()).less(end.clone());
            write_line(
                out,
                indent,
                format_args!("for (unsigned {c} = {start}; {condition}; ++{c})", c = counter),
            );
            write_block(out, body, indent);
        }
        Statement::ForEach(ForEach { element, range, body }) => {
            write_line(out, indent, format_args!("BOOST_FOREACH({}, {})", element, range));
            write_block(out, body, indent);
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_statement(&mut out, self, 0);
        f.write_str(&out)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_block(&mut out, self, 0);
        f.write_str(&out)
    }
}

impl Display for FunctionBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_line(&mut out, 0, &self.declaration);
        write_block(&mut out, &self.body, 0);
        f.write_str(&out)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for item in self.items() {
            match item {
                ModuleItem::Include(path) => writeln!(f, "#include <{}>", path)?,
                ModuleItem::Line => writeln!(f)?,
                ModuleItem::Statement(text) => writeln!(f, "{};", text)?,
                ModuleItem::Typedef(decl) => writeln!(f, "typedef {};", decl)?,
                ModuleItem::Function(function) => write!(f, "{}", function)?,
            }
        }
        Ok(())
    }
}
