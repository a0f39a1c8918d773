//! Async tree-walking interpreter for the output language.
//!
//! The interpreter has no side effects of its own: console output, input,
//! progress and variable notifications all go through a [`Bridge`]. It is async
//! so that a prompt or a step notification can suspend the program until the
//! host answers.

use crate::ast::{
    AssignOp, BinaryOp, Expr, FunctionDecl, LogicalOp, Program, Stmt, Target, UnaryOp, Value,
};
use crate::error::RuntimeError;
use ahash::AHashMap;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use itertools::Itertools;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::trace;

mod builtins;
mod scope;

use scope::Environment;

/// Default bound on nested user-function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Bound on nested statements and expressions being evaluated at once, summed
/// across calls.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Largest array an index assignment or `push` may grow.
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

/// Statements executed between two voluntary yields to the scheduler.
const YIELD_INTERVAL: u64 = 256;

/// The minimal set of capabilities a running program can reach.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// `console.log`. One-way.
    fn log(&self, text: String) -> Result<(), RuntimeError>;

    /// `prompt(message)`. Suspends until the host supplies a value.
    async fn prompt(&self, message: String) -> Result<String, RuntimeError>;

    /// `__onNode(id)`. Suspends until the host authorizes the next step.
    async fn node_enter(&self, node_id: String) -> Result<(), RuntimeError>;

    /// `__onVar(name, value)`. One-way.
    fn var_update(&self, name: String, value: Value) -> Result<(), RuntimeError>;
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tunables for one interpreter instance.
#[derive(Debug, Clone, Copy)]
pub struct InterpreterOptions {
    /// Seed for `Math.random`; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub max_call_depth: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            seed: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

type Eval<'s, T> = BoxFuture<'s, Result<T, RuntimeError>>;

pub struct Interpreter<B: Bridge> {
    bridge: B,
    env: Environment,
    functions: AHashMap<String, Arc<FunctionDecl>>,
    rng: StdRng,
    depth: usize,
    max_call_depth: usize,
    nesting: usize,
    ticks: u64,
}

impl<B: Bridge> Interpreter<B> {
    pub fn new(bridge: B, options: InterpreterOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            bridge,
            env: Environment::new(),
            functions: AHashMap::new(),
            rng,
            depth: 0,
            max_call_depth: options.max_call_depth,
            nesting: 0,
            ticks: 0,
        }
    }

    /// Hands the bridge back once the run is over.
    pub fn into_bridge(self) -> B {
        self.bridge
    }

    /// Runs `program` to completion.
    pub async fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for decl in program.functions() {
            self.functions.insert(decl.name.clone(), Arc::clone(decl));
        }
        match self.exec_block(&program.body).await? {
            Flow::Normal | Flow::Return(_) => Ok(()),
            Flow::Break => Err(RuntimeError::Syntax("Illegal break statement".to_string())),
            Flow::Continue => Err(RuntimeError::Syntax(
                "Illegal continue statement: no surrounding iteration statement".to_string(),
            )),
        }
    }

    /// Runs statements in order, stopping at the first non-normal flow.
    fn exec_block<'s>(&'s mut self, stmts: &'s [Stmt]) -> Eval<'s, Flow> {
        async move {
            for stmt in stmts {
                let flow = self.exec(stmt).await?;
                if flow != Flow::Normal {
                    return Ok(flow);
                }
            }
            Ok(Flow::Normal)
        }
        .boxed()
    }

    /// Runs statements inside a fresh block scope.
    fn exec_scoped<'s>(&'s mut self, stmts: &'s [Stmt]) -> Eval<'s, Flow> {
        async move {
            self.env.push();
            let result = self.exec_block(stmts).await;
            self.env.pop();
            result
        }
        .boxed()
    }

    fn exec<'s>(&'s mut self, stmt: &'s Stmt) -> Eval<'s, Flow> {
        async move {
            self.descend()?;
            let result = self.exec_node(stmt).await;
            self.nesting -= 1;
            result
        }
        .boxed()
    }

    async fn exec_node(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.tick().await;
        match stmt {
            Stmt::Let { name, value } => {
                let value = match value {
                    Some(expr) => self.eval(expr).await?,
                    None => Value::Undefined,
                };
                self.env.declare(name, value)?;
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, op, value } => {
                let value = self.eval(value).await?;
                self.assign(target, *op, value).await?;
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval(expr).await?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition).await?.is_truthy() {
                    self.exec_scoped(then_branch).await
                } else if let Some(else_branch) = else_branch {
                    self.exec_scoped(else_branch).await
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition).await?.is_truthy() {
                    self.tick().await;
                    match self.exec_scoped(body).await? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                self.env.push();
                let result = self.exec_for(init, condition, update, body).await;
                self.env.pop();
                result
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr).await?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Block(body) => self.exec_scoped(body).await,
            Stmt::Function(decl) => {
                self.functions.insert(decl.name.clone(), Arc::clone(decl));
                Ok(Flow::Normal)
            }
        }
    }

    /// Enters one more level of statement or expression nesting.
    fn descend(&mut self) -> Result<(), RuntimeError> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(stack_overflow());
        }
        self.nesting += 1;
        Ok(())
    }

    /// Counts one unit of work and periodically hands the thread back to the
    /// scheduler, so an aborted run stops even inside a tight loop.
    async fn tick(&mut self) {
        self.ticks += 1;
        if self.ticks % YIELD_INTERVAL == 0 {
            tokio::task::yield_now().await;
        }
    }

    async fn exec_for(
        &mut self,
        init: &Option<Box<Stmt>>,
        condition: &Option<Expr>,
        update: &Option<Box<Stmt>>,
        body: &[Stmt],
    ) -> Result<Flow, RuntimeError> {
        if let Some(init) = init {
            self.exec(init).await?;
        }
        loop {
            self.tick().await;
            if let Some(condition) = condition
                && !self.eval(condition).await?.is_truthy()
            {
                break;
            }
            match self.exec_scoped(body).await? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
            if let Some(update) = update {
                self.exec(update).await?;
            }
        }
        Ok(Flow::Normal)
    }

    async fn assign(&mut self, target: &Target, op: AssignOp, value: Value) -> Result<(), RuntimeError> {
        match target {
            Target::Variable(name) => {
                let value = match op {
                    AssignOp::Assign => value,
                    compound => {
                        let current = self
                            .env
                            .get(name)
                            .cloned()
                            .ok_or_else(|| RuntimeError::Reference(name.clone()))?;
                        let operator = match compound {
                            AssignOp::Subtract => BinaryOp::Subtract,
                            _ => BinaryOp::Add,
                        };
                        binary(operator, &current, &value)
                    }
                };
                self.env.assign(name, value);
                Ok(())
            }
            Target::Element { name, index } => {
                let index = self.eval(index).await?;
                let slot = self
                    .env
                    .get_mut(name)
                    .ok_or_else(|| RuntimeError::Reference(name.clone()))?;
                let element = element_mut(slot, &index, name)?;
                *element = match op {
                    AssignOp::Assign => value,
                    AssignOp::Add => binary(BinaryOp::Add, element, &value),
                    AssignOp::Subtract => binary(BinaryOp::Subtract, element, &value),
                };
                Ok(())
            }
        }
    }

    fn eval<'s>(&'s mut self, expr: &'s Expr) -> Eval<'s, Value> {
        async move {
            self.descend()?;
            let result = self.eval_node(expr).await;
            self.nesting -= 1;
            result
        }
        .boxed()
    }

    async fn eval_node(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Identifier(name) => match self.env.get(name) {
                Some(value) => Ok(value.clone()),
                None => match name.as_str() {
                    "NaN" => Ok(Value::Number(f64::NAN)),
                    "Infinity" => Ok(Value::Number(f64::INFINITY)),
                    _ => Err(RuntimeError::Reference(name.clone())),
                },
            },
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item).await?);
                }
                Ok(Value::Array(values))
            }
            Expr::Object(fields) => {
                let mut values = Vec::with_capacity(fields.len());
                for (key, value) in fields {
                    values.push((key.clone(), self.eval(value).await?));
                }
                Ok(Value::Object(values))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand).await?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Negate => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left).await?;
                let right = self.eval(right).await?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left).await?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right).await,
                }
            }
            Expr::Member { object, property } => self.member(object, property).await,
            Expr::Index { object, index } => {
                let object = self.eval(object).await?;
                let index = self.eval(index).await?;
                read_element(&object, &index)
            }
            Expr::Call { callee, arguments } => self.call(callee, arguments).await,
            Expr::Await(inner) => self.eval(inner).await,
        }
    }

    async fn member(&mut self, object: &Expr, property: &str) -> Result<Value, RuntimeError> {
        if let Expr::Identifier(name) = object
            && name == "Math"
            && self.env.get(name).is_none()
        {
            return match property {
                "PI" => Ok(Value::Number(std::f64::consts::PI)),
                "E" => Ok(Value::Number(std::f64::consts::E)),
                _ => Err(RuntimeError::Type(format!("Math.{property} is not supported"))),
            };
        }

        let value = self.eval(object).await?;
        match (&value, property) {
            (Value::Array(items), "length") => Ok(Value::Number(items.len() as f64)),
            (Value::Str(s), "length") => Ok(Value::Number(s.chars().count() as f64)),
            (Value::Object(fields), key) => Ok(fields
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()),
            (Value::Undefined | Value::Null, key) => Err(RuntimeError::Type(format!(
                "Cannot read properties of {value} (reading '{key}')"
            ))),
            _ => Ok(Value::Undefined),
        }
    }

    async fn call(&mut self, callee: &Expr, arguments: &[Expr]) -> Result<Value, RuntimeError> {
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.eval(argument).await?);
        }

        match callee {
            Expr::Identifier(name) => self.call_named(name, args).await,
            Expr::Member { object, property } => match (object.as_ref(), property.as_str()) {
                (Expr::Identifier(receiver), "log") if receiver == "console" => {
                    let text = args.iter().join(" ");
                    self.bridge.log(text)?;
                    Ok(Value::Undefined)
                }
                (Expr::Identifier(receiver), method)
                    if receiver == "Math" && self.env.get(receiver).is_none() =>
                {
                    builtins::math(method, &args, &mut self.rng)
                }
                (Expr::Identifier(receiver), "push" | "pop") => {
                    let slot = self
                        .env
                        .get_mut(receiver)
                        .ok_or_else(|| RuntimeError::Reference(receiver.clone()))?;
                    array_method(slot, property, args, receiver)
                }
                (receiver, "push" | "pop") => {
                    // Mutates a temporary copy; the result is still returned.
                    let mut value = self.eval(receiver).await?;
                    array_method(&mut value, property, args, &receiver.describe())
                }
                (_, _) => Err(RuntimeError::Type(format!(
                    "{} is not a function",
                    callee.describe()
                ))),
            },
            other => Err(RuntimeError::Type(format!(
                "{} is not a function",
                other.describe()
            ))),
        }
    }

    async fn call_named(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if let Some(decl) = self.functions.get(name).cloned() {
            return self.call_function(decl, args).await;
        }
        if self.env.get(name).is_some() {
            return Err(RuntimeError::Type(format!("{name} is not a function")));
        }

        match name {
            "prompt" => {
                let message = args.first().map(ToString::to_string).unwrap_or_default();
                let answer = self.bridge.prompt(message).await?;
                Ok(Value::Str(answer))
            }
            "parseFloat" => Ok(Value::Number(
                args.first().map_or(f64::NAN, builtins::parse_float),
            )),
            "Number" => Ok(builtins::to_number(&args)),
            "String" => Ok(builtins::to_string(&args)),
            "__onNode" => {
                let node_id = args.first().map(ToString::to_string).unwrap_or_default();
                self.bridge.node_enter(node_id).await?;
                Ok(Value::Undefined)
            }
            "__onVar" => {
                let mut args = args.into_iter();
                let name = args.next().map(|v| v.to_string()).unwrap_or_default();
                let value = args.next().unwrap_or_default();
                self.bridge.var_update(name, value)?;
                Ok(Value::Undefined)
            }
            _ => Err(RuntimeError::Reference(name.to_string())),
        }
    }

    async fn call_function(
        &mut self,
        decl: Arc<FunctionDecl>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= self.max_call_depth {
            return Err(stack_overflow());
        }
        trace!(function = %decl.name, depth = self.depth, "call");

        let saved = self.env.enter_call();
        let mut args = args.into_iter();
        let mut outcome = Ok(Flow::Normal);
        for param in &decl.params {
            if let Err(error) = self.env.declare(param, args.next().unwrap_or_default()) {
                outcome = Err(error);
                break;
            }
        }

        self.depth += 1;
        if outcome.is_ok() {
            outcome = self.exec_block(&decl.body).await;
        }
        self.depth -= 1;
        self.env.leave_call(saved);

        match outcome? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }
}

fn stack_overflow() -> RuntimeError {
    RuntimeError::Range("Maximum call stack size exceeded".to_string())
}

/// Applies a binary operator with the output language's coercions.
fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let numeric = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (Value::Str(_) | Value::Array(_) | Value::Object(_), _)
            | (_, Value::Str(_) | Value::Array(_) | Value::Object(_)) => {
                Value::Str(format!("{left}{right}"))
            }
            _ => numeric(|a, b| a + b),
        },
        BinaryOp::Subtract => numeric(|a, b| a - b),
        BinaryOp::Multiply => numeric(|a, b| a * b),
        BinaryOp::Divide => numeric(|a, b| a / b),
        BinaryOp::Modulo => numeric(|a, b| a % b),
        BinaryOp::Less => Value::Bool(compare(left, right, |o| o.is_lt())),
        BinaryOp::LessEqual => Value::Bool(compare(left, right, |o| o.is_le())),
        BinaryOp::Greater => Value::Bool(compare(left, right, |o| o.is_gt())),
        BinaryOp::GreaterEqual => Value::Bool(compare(left, right, |o| o.is_ge())),
        BinaryOp::StrictEqual => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEqual => Value::Bool(!left.strict_equals(right)),
        BinaryOp::LooseEqual => Value::Bool(left.loose_equals(right)),
        BinaryOp::LooseNotEqual => Value::Bool(!left.loose_equals(right)),
    }
}

/// Relational comparison: strings compare lexically, everything else
/// numerically. Any comparison involving `NaN` is false.
fn compare(left: &Value, right: &Value, accept: fn(std::cmp::Ordering) -> bool) -> bool {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    ordering.is_some_and(accept)
}

fn array_index(index: &Value) -> Option<usize> {
    let n = index.to_number();
    (n >= 0.0 && n.fract() == 0.0 && n < u32::MAX as f64).then_some(n as usize)
}

fn read_element(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match object {
        Value::Array(items) => Ok(array_index(index)
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        Value::Str(s) => Ok(array_index(index)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or_default()),
        Value::Object(fields) => {
            let key = index.to_string();
            Ok(fields
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.clone())
                .unwrap_or_default())
        }
        Value::Undefined | Value::Null => Err(RuntimeError::Type(format!(
            "Cannot read properties of {object} (reading '{index}')"
        ))),
        _ => Ok(Value::Undefined),
    }
}

fn element_mut<'v>(
    slot: &'v mut Value,
    index: &Value,
    name: &str,
) -> Result<&'v mut Value, RuntimeError> {
    match slot {
        Value::Array(items) => {
            let i = array_index(index).ok_or_else(|| {
                RuntimeError::Range(format!("Invalid array index {index} for {name}"))
            })?;
            if i >= items.len() {
                if i >= MAX_ARRAY_LENGTH {
                    return Err(invalid_length());
                }
                items.resize(i + 1, Value::Undefined);
            }
            Ok(&mut items[i])
        }
        Value::Object(fields) => {
            let key = index.to_string();
            let position = match fields.iter().position(|(field, _)| *field == key) {
                Some(position) => position,
                None => {
                    fields.push((key, Value::Undefined));
                    fields.len() - 1
                }
            };
            Ok(&mut fields[position].1)
        }
        other => Err(RuntimeError::Type(format!(
            "Cannot set properties of {} ({name})",
            other.type_name()
        ))),
    }
}

fn array_method(
    target: &mut Value,
    method: &str,
    args: Vec<Value>,
    name: &str,
) -> Result<Value, RuntimeError> {
    let Value::Array(items) = target else {
        return Err(RuntimeError::Type(format!("{name}.{method} is not a function")));
    };
    match method {
        "push" => {
            if items.len() + args.len() > MAX_ARRAY_LENGTH {
                return Err(invalid_length());
            }
            items.extend(args);
            Ok(Value::Number(items.len() as f64))
        }
        _ => Ok(items.pop().unwrap_or_default()),
    }
}

fn invalid_length() -> RuntimeError {
    RuntimeError::Range("Invalid array length".to_string())
}
