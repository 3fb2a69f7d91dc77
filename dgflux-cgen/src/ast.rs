use std::ops::{Add, Div, Mul, Neg, Sub};

/// An expression in the generated C++ code.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Int(i64),
    Real(f64),
    /// Member access `base.name`.
    Member(Box<Expr>, String),
    /// Subscript `base[index]`.
    Index(Box<Expr>, Box<Expr>),
    /// Free function call, which also covers functional casts such as `value_type(x)`.
    Call(String, Vec<Expr>),
    /// Method call `receiver.name(args...)`.
    MethodCall(Box<Expr>, String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
        }
    }
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call(function.into(), args)
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member(Box::new(self), name.into())
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index(Box::new(self), Box::new(index))
    }

    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::MethodCall(Box::new(self), name.into(), args)
    }

    pub fn less(self, rhs: Expr) -> Self {
        Expr::Binary(BinaryOp::Less, Box::new(self), Box::new(rhs))
    }

    /// Visits this expression and all of its subexpressions in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Ident(_) | Expr::Int(_) | Expr::Real(_) => {}
            Expr::Member(base, _) => base.walk(visit),
            Expr::Index(base, index) => {
                base.walk(visit);
                index.walk(visit);
            }
            Expr::Call(_, args) => args.iter().for_each(|arg| arg.walk(visit)),
            Expr::MethodCall(receiver, _, args) => {
                receiver.walk(visit);
                args.iter().for_each(|arg| arg.walk(visit));
            }
            Expr::Unary(_, operand) => operand.walk(visit),
            Expr::Binary(_, lhs, rhs) => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::Binary($op, Box::new(self), Box::new(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary(UnaryOp::Neg, Box::new(self))
    }
}

/// A declarator, i.e. a type together with the name being declared.
///
/// Qualifiers are applied by wrapping, mirroring how the declaration reads:
/// `Declarator::value("face_group", "fg").constant().reference()` is `face_group const &fg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Declarator {
    Value { ty: String, name: String },
    Const(Box<Declarator>),
    Reference(Box<Declarator>),
    MaybeUnused(Box<Declarator>),
}

impl Declarator {
    pub fn value(ty: impl Into<String>, name: impl Into<String>) -> Self {
        Declarator::Value {
            ty: ty.into(),
            name: name.into(),
        }
    }

    pub fn constant(self) -> Self {
        Declarator::Const(Box::new(self))
    }

    pub fn reference(self) -> Self {
        Declarator::Reference(Box::new(self))
    }

    pub fn maybe_unused(self) -> Self {
        Declarator::MaybeUnused(Box::new(self))
    }

    fn innermost(&self) -> (&str, &str) {
        match self {
            Declarator::Value { ty, name } => (ty, name),
            Declarator::Const(inner) | Declarator::Reference(inner) | Declarator::MaybeUnused(inner) => {
                inner.innermost()
            }
        }
    }

    pub fn name(&self) -> &str {
        self.innermost().1
    }

    pub fn base_type(&self) -> &str {
        self.innermost().0
    }

    pub fn is_const(&self) -> bool {
        match self {
            Declarator::Value { .. } => false,
            Declarator::Const(_) => true,
            Declarator::Reference(inner) | Declarator::MaybeUnused(inner) => inner.is_const(),
        }
    }

    pub fn is_reference(&self) -> bool {
        match self {
            Declarator::Value { .. } => false,
            Declarator::Reference(_) => true,
            Declarator::Const(inner) | Declarator::MaybeUnused(inner) => inner.is_reference(),
        }
    }

    pub fn is_maybe_unused(&self) -> bool {
        match self {
            Declarator::Value { .. } => false,
            Declarator::MaybeUnused(_) => true,
            Declarator::Const(inner) | Declarator::Reference(inner) => inner.is_maybe_unused(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block(pub Vec<Statement>);

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.0.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.0
    }
}

impl FromIterator<Statement> for Block {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        Block(iter.into_iter().collect())
    }
}

impl Extend<Statement> for Block {
    fn extend<I: IntoIterator<Item = Statement>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

/// A counting loop `for (unsigned counter = start; counter < end; ++counter)`.
#[derive(Debug, Clone, PartialEq)]
pub struct For {
    pub counter: String,
    pub start: Expr,
    pub end: Expr,
    pub body: Block,
}

/// A range loop `BOOST_FOREACH(element, range)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEach {
    pub element: Declarator,
    pub range: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An empty line.
    Line,
    /// A verbatim statement, terminated by a semicolon when printed.
    Raw(String),
    Initializer(Declarator, Expr),
    Assign(Expr, Expr),
    Block(Block),
    For(For),
    ForEach(ForEach),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// Return type and function name.
    pub result: Declarator,
    pub params: Vec<Declarator>,
}

impl FunctionDeclaration {
    pub fn new(result: Declarator, params: Vec<Declarator>) -> Self {
        Self { result, params }
    }

    pub fn name(&self) -> &str {
        self.result.name()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBody {
    pub declaration: FunctionDeclaration,
    pub body: Block,
}

impl FunctionBody {
    pub fn new(declaration: FunctionDeclaration, body: Block) -> Self {
        Self { declaration, body }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    /// `#include <path>`
    Include(String),
    Line,
    /// A verbatim top-level statement such as `using namespace hedge`.
    Statement(String),
    Typedef(Declarator),
    Function(FunctionBody),
}

/// A translation unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    items: Vec<ModuleItem>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ModuleItem) {
        self.items.push(item);
    }

    pub fn add_function(&mut self, function: FunctionBody) {
        self.items.push(ModuleItem::Function(function));
    }

    pub fn items(&self) -> &[ModuleItem] {
        &self.items
    }

    pub fn function(&self, name: &str) -> Option<&FunctionBody> {
        self.items.iter().find_map(|item| match item {
            ModuleItem::Function(function) if function.declaration.name() == name => Some(function),
            _ => None,
        })
    }

    /// Returns the type aliased by the typedef declaring `name`, if any.
    pub fn typedef(&self, name: &str) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            ModuleItem::Typedef(decl) if decl.name() == name => Some(decl.base_type()),
            _ => None,
        })
    }
}

impl Extend<ModuleItem> for Module {
    fn extend<I: IntoIterator<Item = ModuleItem>>(&mut self, iter: I) {
        self.items.extend(iter)
    }
}
