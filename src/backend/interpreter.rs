use crate::backend::{BuildError, GatherKernel, KernelError, NativeModuleBuilder, Platform};
use crate::discretization::ScalarType;
use crate::face_group::{FaceGroup, FacePair, FaceSide};
use dgflux_cgen::{BinaryOp, Block, Expr, For, ForEach, FunctionBody, Module, Statement, UnaryOp};
use log::debug;
use nalgebra::DVector;

const FACE_GROUP_TYPE: &str = "face_group";
const ARRAY_TYPE: &str = "numpy_array<value_type>";

const KNOWN_FUNCTIONS: &[&str] = &["value_type", "pow"];
const KNOWN_METHODS: &[&str] = &["begin", "face_length", "index_list"];
const KNOWN_MEMBERS: &[&str] = &[
    "face_pairs",
    "face_count",
    "loc",
    "opp",
    "opp_native_write_map",
    "el_base_index",
    "face_index_list_number",
    "local_el_number",
    "face_id",
    "normal",
    "face_jacobian",
    "order",
    "h",
];

/// Builds gather kernels by executing their code representation directly.
///
/// The builder performs the checks a C++ compiler would report for the generated code
/// (signature, `value_type`, declared names, known functions and members) and fails with
/// a [`BuildError`] if any of them fail. It does not need a toolchain, which makes it the
/// reference backend for testing code generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpreterBuilder;

impl NativeModuleBuilder for InterpreterBuilder {
    fn build(
        &self,
        module: &Module,
        platform: &Platform,
        entry_point: &str,
    ) -> Result<Box<dyn GatherKernel>, BuildError> {
        debug!("Building `{}` for platform `{}` (interpreted)", entry_point, platform.name);
        let fail = |diagnostics: Vec<String>| BuildError {
            generated_source: module.to_string(),
            diagnostics,
        };

        let function = module
            .function(entry_point)
            .ok_or_else(|| fail(vec![format!("no function named `{}`", entry_point)]))?;

        let mut diagnostics = Vec::new();
        let scalar_type = match module.typedef("value_type") {
            Some(name) => ScalarType::from_c_name(name).unwrap_or_else(|| {
                diagnostics.push(format!("unsupported value_type `{}`", name));
                ScalarType::Float64
            }),
            None => {
                diagnostics.push("`value_type` is not declared".to_string());
                ScalarType::Float64
            }
        };

        let signature = Signature::from_function(function, &mut diagnostics);
        let mut validator = Validator {
            scope: function
                .declaration
                .params
                .iter()
                .map(|param| param.name().to_string())
                .collect(),
            diagnostics,
        };
        validator.check_block(&function.body);

        if !validator.diagnostics.is_empty() {
            return Err(fail(validator.diagnostics));
        }

        Ok(Box::new(InterpretedKernel {
            function: function.clone(),
            signature,
            scalar_type,
        }))
    }
}

/// The parameter layout `(face_group, outputs..., inputs...)` of a gather entry point.
#[derive(Debug, Clone, Default)]
struct Signature {
    face_group: String,
    outputs: Vec<String>,
    inputs: Vec<String>,
}

impl Signature {
    fn from_function(function: &FunctionBody, diagnostics: &mut Vec<String>) -> Self {
        let mut signature = Signature::default();
        let mut params = function.declaration.params.iter();

        match params.next() {
            Some(param) if param.base_type() == FACE_GROUP_TYPE => signature.face_group = param.name().to_string(),
            _ => diagnostics.push(format!("first parameter must be a `{}`", FACE_GROUP_TYPE)),
        }

        for param in params {
            if param.base_type() != ARRAY_TYPE {
                diagnostics.push(format!(
                    "parameter `{}` has unsupported type `{}`",
                    param.name(),
                    param.base_type()
                ));
            } else if param.is_const() {
                signature.inputs.push(param.name().to_string());
            } else if signature.inputs.is_empty() {
                signature.outputs.push(param.name().to_string());
            } else {
                diagnostics.push(format!(
                    "output parameter `{}` must precede all input parameters",
                    param.name()
                ));
            }
        }
        signature
    }
}

struct Validator {
    scope: Vec<String>,
    diagnostics: Vec<String>,
}

impl Validator {
    fn check_block(&mut self, block: &Block) {
        let mark = self.scope.len();
        for statement in block.statements() {
            self.check_statement(statement);
        }
        self.scope.truncate(mark);
    }

    fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Line => {}
            Statement::Raw(text) => self
                .diagnostics
                .push(format!("verbatim statement `{}` cannot be checked", text)),
            Statement::Initializer(decl, value) => {
                self.check_expr(value);
                self.scope.push(decl.name().to_string());
            }
            Statement::Assign(target, value) => {
                if !matches!(target, Expr::Index(base, _) if matches!(base.as_ref(), Expr::Ident(_))) {
                    self.diagnostics
                        .push(format!("assignment target `{}` is not an array element", target));
                }
                self.check_expr(target);
                self.check_expr(value);
            }
            Statement::Block(block) => self.check_block(block),
            Statement::For(For {
                counter,
                start,
                end,
                body,
            }) => {
                self.check_expr(start);
                self.scope.push(counter.clone());
                self.check_expr(end);
                self.check_block(body);
                self.scope.pop();
            }
            Statement::ForEach(ForEach { element, range, body }) => {
                self.check_expr(range);
                self.scope.push(element.name().to_string());
                self.check_block(body);
                self.scope.pop();
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        let mut problems = Vec::new();
        expr.walk(&mut |e| match e {
            Expr::Ident(name) if !self.scope.contains(name) => {
                problems.push(format!("use of undeclared identifier `{}`", name))
            }
            Expr::Call(function, _) if !KNOWN_FUNCTIONS.contains(&function.as_str()) => {
                problems.push(format!("call to unknown function `{}`", function))
            }
            Expr::MethodCall(_, method, _) if !KNOWN_METHODS.contains(&method.as_str()) => {
                problems.push(format!("no method named `{}`", method))
            }
            Expr::Member(_, member) if !KNOWN_MEMBERS.contains(&member.as_str()) => {
                problems.push(format!("no member named `{}`", member))
            }
            _ => {}
        });
        self.diagnostics.extend(problems);
    }
}

#[derive(Debug)]
struct InterpretedKernel {
    function: FunctionBody,
    signature: Signature,
    scalar_type: ScalarType,
}

impl GatherKernel for InterpretedKernel {
    fn call(&self, face_group: &FaceGroup, outputs: &mut [&mut [f64]], inputs: &[&[f64]]) -> Result<(), KernelError> {
        let signature = &self.signature;
        if outputs.len() != signature.outputs.len() || inputs.len() != signature.inputs.len() {
            return Err(KernelError::ArgumentCount {
                expected_outputs: signature.outputs.len(),
                expected_inputs: signature.inputs.len(),
                outputs: outputs.len(),
                inputs: inputs.len(),
            });
        }

        let mut env = vec![(signature.face_group.as_str(), Value::FaceGroup(face_group))];
        env.extend(
            signature
                .outputs
                .iter()
                .enumerate()
                .map(|(k, name)| (name.as_str(), Value::Output(k))),
        );
        env.extend(
            signature
                .inputs
                .iter()
                .enumerate()
                .map(|(j, name)| (name.as_str(), Value::Input(j))),
        );

        let mut machine = Machine {
            scalar_type: self.scalar_type,
            env,
            inputs,
        };
        machine.exec_block(&self.function.body, outputs)
    }
}

#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Int(i64),
    Real(f64),
    FaceGroup(&'a FaceGroup),
    FacePairs(&'a [FacePair]),
    FacePair(&'a FacePair),
    FaceSide(&'a FaceSide),
    Normal(&'a DVector<f64>),
    IndexList(&'a [usize]),
    Input(usize),
    InputIter(usize),
    Output(usize),
    OutputIter(usize),
}

impl<'a> Value<'a> {
    fn as_real(&self) -> Result<f64, KernelError> {
        match *self {
            Value::Int(value) => Ok(value as f64),
            Value::Real(value) => Ok(value),
            other => Err(KernelError::Type(format!("expected a number, found {:?}", other))),
        }
    }

    fn as_int(&self) -> Result<i64, KernelError> {
        match *self {
            Value::Int(value) => Ok(value),
            other => Err(KernelError::Type(format!("expected an integer, found {:?}", other))),
        }
    }
}

fn checked_index(index: i64, len: usize, array: impl FnOnce() -> String) -> Result<usize, KernelError> {
    if index >= 0 && (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(KernelError::OutOfBounds {
            array: array(),
            index,
            len,
        })
    }
}

fn to_int(value: usize) -> Value<'static> {
    Value::Int(value as i64)
}

struct Machine<'k, 'a> {
    scalar_type: ScalarType,
    env: Vec<(&'k str, Value<'a>)>,
    inputs: &'a [&'a [f64]],
}

impl<'k, 'a> Machine<'k, 'a> {
    fn lookup(&self, name: &str) -> Result<Value<'a>, KernelError> {
        self.env
            .iter()
            .rev()
            .find(|(bound, _)| *bound == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| KernelError::Type(format!("undeclared identifier `{}`", name)))
    }

    fn exec_block(&mut self, block: &'k Block, outputs: &mut [&mut [f64]]) -> Result<(), KernelError> {
        let mark = self.env.len();
        for statement in block.statements() {
            self.exec_statement(statement, outputs)?;
        }
        self.env.truncate(mark);
        Ok(())
    }

    fn exec_statement(&mut self, statement: &'k Statement, outputs: &mut [&mut [f64]]) -> Result<(), KernelError> {
        match statement {
            Statement::Line => {}
            Statement::Raw(text) => {
                return Err(KernelError::Type(format!("cannot execute verbatim statement `{}`", text)));
            }
            Statement::Initializer(decl, value) => {
                let value = self.eval(value)?;
                self.env.push((decl.name(), value));
            }
            Statement::Assign(target, value) => {
                let value = self.scalar_type.round(self.eval(value)?.as_real()?);
                self.store(target, value, outputs)?;
            }
            Statement::Block(block) => self.exec_block(block, outputs)?,
            Statement::For(For {
                counter,
                start,
                end,
                body,
            }) => {
                let mut i = self.eval(start)?.as_int()?;
                loop {
                    self.env.push((counter.as_str(), Value::Int(i)));
                    // The bound is re-evaluated on every iteration, as in C++
                    let proceed = i < self.eval(end)?.as_int()?;
                    if proceed {
                        self.exec_block(body, outputs)?;
                    }
                    self.env.pop();
                    if !proceed {
                        break;
                    }
                    i += 1;
                }
            }
            Statement::ForEach(ForEach { element, range, body }) => {
                let pairs = match self.eval(range)? {
                    Value::FacePairs(pairs) => pairs,
                    other => return Err(KernelError::Type(format!("cannot iterate over {:?}", other))),
                };
                for pair in pairs {
                    self.env.push((element.name(), Value::FacePair(pair)));
                    self.exec_block(body, outputs)?;
                    self.env.pop();
                }
            }
        }
        Ok(())
    }

    fn store(&mut self, target: &Expr, value: f64, outputs: &mut [&mut [f64]]) -> Result<(), KernelError> {
        let (base, index) = match target {
            Expr::Index(base, index) => (base, index),
            _ => return Err(KernelError::Type(format!("cannot assign to `{}`", target))),
        };
        let k = match self.eval(base)? {
            Value::Output(k) | Value::OutputIter(k) => k,
            other => return Err(KernelError::Type(format!("cannot assign into {:?}", other))),
        };
        let output = &mut outputs[k];
        let index = checked_index(self.eval(index)?.as_int()?, output.len(), || format!("output array {}", k))?;
        output[index] = value;
        Ok(())
    }

    fn eval(&self, expr: &Expr) -> Result<Value<'a>, KernelError> {
        let value = match expr {
            Expr::Ident(name) => self.lookup(name)?,
            Expr::Int(value) => Value::Int(*value),
            Expr::Real(value) => Value::Real(*value),
            Expr::Member(base, member) => self.eval_member(self.eval(base)?, member)?,
            Expr::Index(base, index) => {
                let index = self.eval(index)?.as_int()?;
                match self.eval(base)? {
                    Value::IndexList(list) => {
                        to_int(list[checked_index(index, list.len(), || "index list".to_string())?])
                    }
                    Value::Normal(normal) => {
                        Value::Real(normal[checked_index(index, normal.len(), || "face normal".to_string())?])
                    }
                    Value::Input(j) | Value::InputIter(j) => {
                        let input = self.inputs[j];
                        Value::Real(input[checked_index(index, input.len(), || format!("input array {}", j))?])
                    }
                    other => return Err(KernelError::Type(format!("cannot index into {:?}", other))),
                }
            }
            Expr::Call(function, args) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg)?.as_real())
                    .collect::<Result<Vec<_>, _>>()?;
                match (function.as_str(), args.as_slice()) {
                    ("value_type", [x]) => Value::Real(self.scalar_type.round(*x)),
                    ("pow", [base, exponent]) => Value::Real(base.powf(*exponent)),
                    _ => {
                        return Err(KernelError::Type(format!(
                            "no function `{}` taking {} arguments",
                            function,
                            args.len()
                        )))
                    }
                }
            }
            Expr::MethodCall(receiver, method, args) => {
                let receiver = self.eval(receiver)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match (receiver, method.as_str(), args.as_slice()) {
                    (Value::Input(j), "begin", []) => Value::InputIter(j),
                    (Value::Output(k), "begin", []) => Value::OutputIter(k),
                    (Value::FaceGroup(fg), "face_length", []) => to_int(fg.face_length()),
                    (Value::FaceGroup(fg), "index_list", [number]) => {
                        let number = number.as_int()?;
                        let list = usize::try_from(number)
                            .ok()
                            .and_then(|number| fg.index_list(number))
                            .ok_or_else(|| KernelError::OutOfBounds {
                                array: "index lists".to_string(),
                                index: number,
                                len: fg.index_lists.len(),
                            })?;
                        Value::IndexList(list)
                    }
                    (receiver, method, _) => {
                        return Err(KernelError::Type(format!("no method `{}` on {:?}", method, receiver)))
                    }
                }
            }
            Expr::Unary(UnaryOp::Neg, operand) => match self.eval(operand)? {
                Value::Int(value) => Value::Int(-value),
                other => Value::Real(-other.as_real()?),
            },
            Expr::Binary(op, lhs, rhs) => eval_binary(*op, self.eval(lhs)?, self.eval(rhs)?)?,
        };
        Ok(value)
    }

    fn eval_member(&self, base: Value<'a>, member: &str) -> Result<Value<'a>, KernelError> {
        let value = match (base, member) {
            (Value::FaceGroup(fg), "face_pairs") => Value::FacePairs(&fg.face_pairs),
            (Value::FaceGroup(fg), "face_count") => to_int(fg.face_count),
            (Value::FacePair(fp), "loc") => Value::FaceSide(&fp.loc),
            (Value::FacePair(fp), "opp") => Value::FaceSide(&fp.opp),
            (Value::FacePair(fp), "opp_native_write_map") => to_int(fp.opp_native_write_map),
            (Value::FaceSide(side), "el_base_index") => to_int(side.el_base_index),
            (Value::FaceSide(side), "face_index_list_number") => to_int(side.face_index_list_number),
            (Value::FaceSide(side), "local_el_number") => to_int(side.local_el_number),
            (Value::FaceSide(side), "face_id") => to_int(side.face_id),
            (Value::FaceSide(side), "normal") => Value::Normal(&side.normal),
            (Value::FaceSide(side), "face_jacobian") => Value::Real(side.face_jacobian),
            (Value::FaceSide(side), "order") => to_int(side.order),
            (Value::FaceSide(side), "h") => Value::Real(side.h),
            (base, member) => return Err(KernelError::Type(format!("no member `{}` on {:?}", member, base))),
        };
        Ok(value)
    }
}

fn eval_binary<'a>(op: BinaryOp, lhs: Value<'a>, rhs: Value<'a>) -> Result<Value<'a>, KernelError> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a
                .checked_div(b)
                .ok_or_else(|| KernelError::Type("integer division by zero".to_string()))?,
            BinaryOp::Less => (a < b) as i64,
        };
        return Ok(Value::Int(value));
    }

    let (a, b) = (lhs.as_real()?, rhs.as_real()?);
    let value = match op {
        BinaryOp::Add => Value::Real(a + b),
        BinaryOp::Sub => Value::Real(a - b),
        BinaryOp::Mul => Value::Real(a * b),
        BinaryOp::Div => Value::Real(a / b),
        BinaryOp::Less => Value::Int((a < b) as i64),
    };
    Ok(value)
}
