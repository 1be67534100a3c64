//! Tree-walking interpreter for the script language.
//!
//! Scripts never reach the host: the only names a script can see are the
//! ones bound in the [`Scope`] it runs in, and the only effects it can have
//! are through the functions installed there.

use crate::builtins;
use crate::value::{Function, ObjectMap, Value};
use genui_parser::ast::*;
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Script call depth allowed before a call fails
pub const DEFAULT_MAX_CALL_DEPTH: usize = 400;

/// Largest length an array may be given (`2^32 - 1`)
pub const MAX_ARRAY_LENGTH: f64 = 4_294_967_295.0;

/// Largest length an array may grow to through holes (`new Array(n)`,
/// `a.length = n`, `a[n] = x`)
pub const MAX_DENSE_LENGTH: usize = 1 << 24;

/// Native stack a script call chain may use before calls fail. Leaves
/// headroom on the 2 MiB stacks spawned threads get by default.
pub const DEFAULT_STACK_BUDGET: usize = 1536 * 1024;

/// Iterations a single loop may run
pub const MAX_LOOP_ITERATIONS: usize = 1_000_000;

#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    #[error("ReferenceError: {name} is not defined")]
    Reference { name: String },

    #[error("TypeError: {message}")]
    Type { message: String },

    #[error("Uncaught {}", describe_thrown(.0))]
    Thrown(Value),

    #[error("Maximum call depth of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("Maximum call stack size exceeded at depth {depth}")]
    StackExhausted { depth: usize },

    #[error("Loop exceeded {limit} iterations")]
    LoopLimit { limit: usize },

    #[error("SyntaxError: {message}")]
    Syntax { message: String },

    #[error("RangeError: {message}")]
    Range { message: String },
}

impl RuntimeError {
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference { name: name.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::Range {
            message: message.into(),
        }
    }

    /// Guards against runaway scripts cannot be swallowed by `catch`
    pub fn is_catchable(&self) -> bool {
        !matches!(
            self,
            RuntimeError::CallDepthExceeded { .. }
                | RuntimeError::StackExhausted { .. }
                | RuntimeError::LoopLimit { .. }
        )
    }

    /// Value bound to the `catch` parameter
    pub fn to_value(&self) -> Value {
        let (name, message) = match self {
            RuntimeError::Thrown(value) => return value.clone(),
            RuntimeError::Reference { name } => ("ReferenceError", format!("{} is not defined", name)),
            RuntimeError::Type { message } => ("TypeError", message.clone()),
            RuntimeError::Syntax { message } => ("SyntaxError", message.clone()),
            RuntimeError::Range { message } => ("RangeError", message.clone()),
            other => ("RangeError", other.to_string()),
        };
        builtins::error_object(name, &message)
    }
}

fn describe_thrown(value: &Value) -> String {
    if let Value::Object(fields) = value {
        let fields = fields.borrow();
        if let Some(message) = fields.get("message") {
            let name = fields
                .get("name")
                .map(Value::to_display_string)
                .unwrap_or_else(|| "Error".to_string());
            return format!("{}: {}", name, message.to_display_string());
        }
    }
    value.to_display_string()
}

/// Outcome of executing a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

struct Binding {
    value: Value,
    mutable: bool,
}

#[derive(Default)]
struct ScopeInner {
    vars: RefCell<IndexMap<String, Binding>>,
    parent: Option<Scope>,
}

/// Lexical scope. Cloning shares the same frame.
#[derive(Clone, Default)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(ScopeInner {
            vars: RefCell::new(IndexMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.bind(name.into(), value, true);
    }

    pub fn declare_const(&self, name: impl Into<String>, value: Value) {
        self.bind(name.into(), value, false);
    }

    fn bind(&self, name: String, value: Value, mutable: bool) {
        self.0
            .vars
            .borrow_mut()
            .insert(name, Binding { value, mutable });
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.0.vars.borrow().contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(binding) = scope.0.vars.borrow().get(name) {
                return Some(binding.value.clone());
            }
            current = scope.0.parent.as_ref();
        }
        None
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(binding) = scope.0.vars.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(RuntimeError::type_error(format!(
                        "Assignment to constant variable '{}'",
                        name
                    )));
                }
                binding.value = value;
                return Ok(());
            }
            current = scope.0.parent.as_ref();
        }
        Err(RuntimeError::reference(name))
    }

    /// Names bound directly in this frame, in declaration order
    pub fn own_names(&self) -> Vec<String> {
        self.0.vars.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("names", &self.own_names())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Validate a script-supplied array length
pub fn array_length(length: f64) -> Result<usize, RuntimeError> {
    if !(0.0..=MAX_ARRAY_LENGTH).contains(&length) || length.fract() != 0.0 {
        return Err(RuntimeError::range("Invalid array length"));
    }
    if length as usize > MAX_DENSE_LENGTH {
        return Err(RuntimeError::range(format!(
            "Array length {} exceeds the supported maximum of {}",
            length, MAX_DENSE_LENGTH
        )));
    }
    Ok(length as usize)
}

/// Address of a local in the caller's frame
#[inline(never)]
fn stack_position() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}

#[derive(Debug)]
pub struct Interpreter {
    depth: Cell<usize>,
    max_depth: usize,
    /// Stack position of the outermost active call
    stack_base: Cell<usize>,
    stack_budget: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_CALL_DEPTH)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self::with_limits(max_depth, DEFAULT_STACK_BUDGET)
    }

    /// Interpreter for threads with a known stack size; `stack_budget`
    /// must stay below it
    pub fn with_limits(max_depth: usize, stack_budget: usize) -> Self {
        Self {
            depth: Cell::new(0),
            max_depth,
            stack_base: Cell::new(0),
            stack_budget,
        }
    }

    fn enter(&self) -> Result<DepthGuard<'_>, RuntimeError> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.max_depth,
            });
        }
        let position = stack_position();
        if depth == 0 {
            self.stack_base.set(position);
        } else if self.stack_base.get().abs_diff(position) > self.stack_budget {
            return Err(RuntimeError::StackExhausted { depth });
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard(&self.depth))
    }

    /// Call any function value
    pub fn call(&self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let Value::Function(function) = callee else {
            return Err(RuntimeError::type_error(format!(
                "{} is not a function",
                callee.to_display_string()
            )));
        };
        let _guard = self.enter()?;
        match function.as_ref() {
            Function::Native { call, .. } => call(self, this, args),
            Function::Closure { decl, env } => self.call_closure(decl, env, args),
        }
    }

    pub fn construct(&self, callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => match function.as_ref() {
                Function::Native {
                    construct: Some(construct),
                    ..
                } => {
                    let _guard = self.enter()?;
                    construct(self, &Value::Undefined, args)
                }
                Function::Native { .. } => self.call(callee, &Value::Undefined, args),
                Function::Closure { decl, .. } => Err(RuntimeError::type_error(format!(
                    "{} is not a constructor",
                    decl.name.as_deref().unwrap_or("anonymous function")
                ))),
            },
            other => Err(RuntimeError::type_error(format!(
                "{} is not a constructor",
                other.to_display_string()
            ))),
        }
    }

    fn call_closure(
        &self,
        decl: &Rc<FunctionDecl>,
        env: &Scope,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let scope = env.child();
        for (index, param) in decl.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.iter().skip(index).cloned().collect())
            } else {
                match (args.get(index), &param.default) {
                    (Some(value), _) if !value.is_undefined() => value.clone(),
                    (_, Some(default)) => self.evaluate(default, &scope)?,
                    _ => Value::Undefined,
                }
            };
            self.bind_pattern(&param.pattern, value, &scope, true)?;
        }

        match &decl.body {
            FunctionBody::Expression(expr) => self.evaluate(expr, &scope),
            FunctionBody::Block(statements) => match self.execute_block(statements, &scope)? {
                Completion::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }

    /// Property read including built-in methods (`items.map`, `name.trim`)
    pub fn get_property(&self, object: &Value, key: &str) -> Result<Value, RuntimeError> {
        match object {
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_display_string(),
                key
            ))),
            Value::Object(fields) => {
                if let Some(value) = fields.borrow().get(key) {
                    return Ok(value.clone());
                }
                Ok(builtins::prototype_method(object, key).unwrap_or_default())
            }
            _ => {
                let own = object.get_own(key);
                if !own.is_undefined() {
                    return Ok(own);
                }
                Ok(builtins::prototype_method(object, key).unwrap_or_default())
            }
        }
    }

    pub fn set_property(&self, object: &Value, key: &str, value: Value) -> Result<(), RuntimeError> {
        match object {
            Value::Object(fields) => {
                fields.borrow_mut().insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                if key == "length" {
                    let length = array_length(value.to_number())?;
                    items.resize(length, Value::Undefined);
                } else if let Ok(index) = key.parse::<usize>() {
                    if index >= items.len() {
                        items.resize(array_length(index as f64 + 1.0)?, Value::Undefined);
                    }
                    items[index] = value;
                }
                Ok(())
            }
            Value::Undefined | Value::Null => Err(RuntimeError::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                object.to_display_string(),
                key
            ))),
            // Writes to primitives are dropped
            _ => Ok(()),
        }
    }

    pub fn evaluate(&self, expr: &Expr, scope: &Scope) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),

            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => out.push_str(text),
                        TemplatePart::Expression(expr) => {
                            out.push_str(&self.evaluate(expr, scope)?.to_display_string())
                        }
                    }
                }
                Ok(Value::String(out))
            }

            Expr::Identifier(name) => scope
                .lookup(name)
                .ok_or_else(|| RuntimeError::reference(name.as_str())),

            Expr::Array(elements) => Ok(Value::array(self.evaluate_elements(elements, scope)?)),

            Expr::Object(properties) => {
                let mut fields = ObjectMap::new();
                for property in properties {
                    match property {
                        ObjectProperty::Property { key, value } => {
                            let key = match key {
                                PropertyKey::Static(name) => name.clone(),
                                PropertyKey::Computed(expr) => {
                                    self.evaluate(expr, scope)?.to_display_string()
                                }
                            };
                            let value = self.evaluate(value, scope)?;
                            fields.insert(key, value);
                        }
                        ObjectProperty::Spread(expr) => {
                            spread_into_object(&self.evaluate(expr, scope)?, &mut fields)
                        }
                    }
                }
                Ok(Value::object(fields))
            }

            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.evaluate(object, scope)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                self.get_property(&object, property)
            }

            Expr::Index {
                object,
                index,
                optional,
            } => {
                let object = self.evaluate(object, scope)?;
                if *optional && object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = self.evaluate(index, scope)?.to_display_string();
                self.get_property(&object, &key)
            }

            Expr::Call {
                callee,
                arguments,
                optional,
            } => {
                let (function, this) = match callee.as_ref() {
                    Expr::Member {
                        object,
                        property,
                        optional: member_optional,
                    } => {
                        let object = self.evaluate(object, scope)?;
                        if *member_optional && object.is_nullish() {
                            return Ok(Value::Undefined);
                        }
                        (self.get_property(&object, property)?, object)
                    }
                    Expr::Index {
                        object,
                        index,
                        optional: index_optional,
                    } => {
                        let object = self.evaluate(object, scope)?;
                        if *index_optional && object.is_nullish() {
                            return Ok(Value::Undefined);
                        }
                        let key = self.evaluate(index, scope)?.to_display_string();
                        (self.get_property(&object, &key)?, object)
                    }
                    other => (self.evaluate(other, scope)?, Value::Undefined),
                };

                if *optional && function.is_nullish() {
                    return Ok(Value::Undefined);
                }
                if !function.is_function() {
                    return Err(RuntimeError::type_error(format!(
                        "{} is not a function",
                        describe(callee)
                    )));
                }
                let args = self.evaluate_elements(arguments, scope)?;
                self.call(&function, &this, &args)
            }

            Expr::New { callee, arguments } => {
                let constructor = self.evaluate(callee, scope)?;
                let args = self.evaluate_elements(arguments, scope)?;
                self.construct(&constructor, &args)
            }

            Expr::Unary { operator, operand } => {
                if let (UnaryOp::Typeof, Expr::Identifier(name)) = (operator, operand.as_ref()) {
                    let value = scope.lookup(name).unwrap_or_default();
                    return Ok(Value::string(value.type_of()));
                }
                let value = self.evaluate(operand, scope)?;
                Ok(match operator {
                    UnaryOp::Not => Value::Boolean(!value.is_truthy()),
                    UnaryOp::Negate => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::string(value.type_of()),
                })
            }

            Expr::Update {
                operator,
                prefix,
                target,
            } => {
                let old = self.evaluate(target, scope)?.to_number();
                let new = match operator {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.assign_to(target, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, scope)?;
                let right = self.evaluate(right, scope)?;
                Ok(binary_op(*operator, &left, &right))
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, scope)?;
                let short_circuits = match operator {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right, scope)
                }
            }

            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test, scope)?.is_truthy() {
                    self.evaluate(consequent, scope)
                } else {
                    self.evaluate(alternate, scope)
                }
            }

            Expr::Assign {
                target,
                operator,
                value,
            } => {
                let value = match operator.binary() {
                    None => self.evaluate(value, scope)?,
                    Some(op) => {
                        let current = self.evaluate(target, scope)?;
                        let rhs = self.evaluate(value, scope)?;
                        binary_op(op, &current, &rhs)
                    }
                };
                self.assign_to(target, value.clone(), scope)?;
                Ok(value)
            }

            Expr::Sequence(expressions) => {
                let mut last = Value::Undefined;
                for expression in expressions {
                    last = self.evaluate(expression, scope)?;
                }
                Ok(last)
            }

            Expr::Function(decl) => Ok(closure(decl, scope)),
        }
    }

    fn evaluate_elements(
        &self,
        elements: &[ArrayElement],
        scope: &Scope,
    ) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                ArrayElement::Item(expr) => values.push(self.evaluate(expr, scope)?),
                ArrayElement::Spread(expr) => {
                    let spread = self.evaluate(expr, scope)?;
                    values.extend(iterate(&spread)?);
                }
            }
        }
        Ok(values)
    }

    fn assign_to(&self, target: &Expr, value: Value, scope: &Scope) -> Result<(), RuntimeError> {
        match target {
            Expr::Identifier(name) => scope.assign(name, value),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.evaluate(object, scope)?;
                self.set_property(&object, property, value)
            }
            Expr::Index { object, index, .. } => {
                let object = self.evaluate(object, scope)?;
                let key = self.evaluate(index, scope)?.to_display_string();
                self.set_property(&object, &key, value)
            }
            _ => Err(RuntimeError::syntax("Invalid left-hand side in assignment")),
        }
    }

    /// Bind a destructuring pattern in `scope`
    pub fn bind_pattern(
        &self,
        pattern: &Pattern,
        value: Value,
        scope: &Scope,
        mutable: bool,
    ) -> Result<(), RuntimeError> {
        match pattern {
            Pattern::Identifier(name) => {
                if mutable {
                    scope.declare(name.as_str(), value);
                } else {
                    scope.declare_const(name.as_str(), value);
                }
                Ok(())
            }
            Pattern::Array(items) => {
                let values = iterate(&value)?;
                for (index, item) in items.iter().enumerate() {
                    if let Some(item) = item {
                        let element = values.get(index).cloned().unwrap_or_default();
                        self.bind_pattern(item, element, scope, mutable)?;
                    }
                }
                Ok(())
            }
            Pattern::Object(entries) => {
                if value.is_nullish() {
                    return Err(RuntimeError::type_error(format!(
                        "Cannot destructure '{}' as it is {}",
                        value.to_display_string(),
                        value.to_display_string()
                    )));
                }
                for (key, item) in entries {
                    let element = self.get_property(&value, key)?;
                    self.bind_pattern(item, element, scope, mutable)?;
                }
                Ok(())
            }
        }
    }

    /// Run a statement list in `scope`, hoisting function declarations first
    pub fn execute_block(&self, statements: &[Stmt], scope: &Scope) -> Result<Completion, RuntimeError> {
        for statement in statements {
            if let Stmt::Function(decl) = statement {
                if let Some(name) = &decl.name {
                    scope.declare(name.as_str(), closure(decl, scope));
                }
            }
        }

        for statement in statements {
            match self.execute(statement, scope)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    pub fn execute(&self, statement: &Stmt, scope: &Scope) -> Result<Completion, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr, scope)?;
                Ok(Completion::Normal)
            }

            Stmt::VarDecl { kind, declarations } => {
                for (pattern, init) in declarations {
                    let value = match init {
                        Some(expr) => self.evaluate(expr, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, scope, *kind != VarKind::Const)?;
                }
                Ok(Completion::Normal)
            }

            // Bound when the enclosing block was entered
            Stmt::Function(_) => Ok(Completion::Normal),

            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test, scope)?.is_truthy() {
                    self.execute(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.execute(alternate, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let loop_scope = scope.child();
                if let Some(init) = init {
                    self.execute(init, &loop_scope)?;
                }
                let mut iterations = 0;
                loop {
                    if let Some(test) = test {
                        if !self.evaluate(test, &loop_scope)?.is_truthy() {
                            break;
                        }
                    }
                    iterations = check_iterations(iterations)?;
                    match self.execute(body, &loop_scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                    if let Some(update) = update {
                        self.evaluate(update, &loop_scope)?;
                    }
                }
                Ok(Completion::Normal)
            }

            Stmt::ForOf {
                pattern,
                iterable,
                body,
            } => {
                let items = iterate(&self.evaluate(iterable, scope)?)?;
                self.run_each(pattern, items, body, scope)
            }

            Stmt::ForIn {
                pattern,
                object,
                body,
            } => {
                let target = self.evaluate(object, scope)?;
                let keys = match &target {
                    Value::Object(fields) => fields.borrow().keys().cloned().map(Value::String).collect(),
                    Value::Array(items) => (0..items.borrow().len())
                        .map(|index| Value::String(index.to_string()))
                        .collect(),
                    Value::String(text) => (0..text.chars().count())
                        .map(|index| Value::String(index.to_string()))
                        .collect(),
                    _ => Vec::new(),
                };
                self.run_each(pattern, keys, body, scope)
            }

            Stmt::While { test, body } => {
                let mut iterations = 0;
                while self.evaluate(test, scope)?.is_truthy() {
                    iterations = check_iterations(iterations)?;
                    match self.execute(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }

            Stmt::Block(statements) => self.execute_block(statements, &scope.child()),

            Stmt::Return(value) => Ok(Completion::Return(match value {
                Some(expr) => self.evaluate(expr, scope)?,
                None => Value::Undefined,
            })),

            Stmt::Break => Ok(Completion::Break),
            Stmt::Continue => Ok(Completion::Continue),

            Stmt::Throw(expr) => Err(RuntimeError::Thrown(self.evaluate(expr, scope)?)),

            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let mut result = self.execute_block(block, &scope.child());
                if let Some(handler) = handler {
                    let caught = match &result {
                        Err(err) if err.is_catchable() => Some(err.to_value()),
                        _ => None,
                    };
                    if let Some(error_value) = caught {
                        let catch_scope = scope.child();
                        if let Some(param) = param {
                            self.bind_pattern(param, error_value, &catch_scope, true)?;
                        }
                        result = self.execute_block(handler, &catch_scope);
                    }
                }
                if let Some(finalizer) = finalizer {
                    match self.execute_block(finalizer, &scope.child())? {
                        Completion::Normal => {}
                        other => return Ok(other),
                    }
                }
                result
            }

            Stmt::Empty => Ok(Completion::Normal),
        }
    }

    fn run_each(
        &self,
        pattern: &Pattern,
        items: Vec<Value>,
        body: &Stmt,
        scope: &Scope,
    ) -> Result<Completion, RuntimeError> {
        let mut iterations = 0;
        for item in items {
            iterations = check_iterations(iterations)?;
            let iteration_scope = scope.child();
            self.bind_pattern(pattern, item, &iteration_scope, true)?;
            match self.execute(body, &iteration_scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
        }
        Ok(Completion::Normal)
    }
}

pub(crate) fn closure(decl: &Rc<FunctionDecl>, scope: &Scope) -> Value {
    Value::Function(Rc::new(Function::Closure {
        decl: Rc::clone(decl),
        env: scope.clone(),
    }))
}

fn check_iterations(iterations: usize) -> Result<usize, RuntimeError> {
    if iterations >= MAX_LOOP_ITERATIONS {
        return Err(RuntimeError::LoopLimit {
            limit: MAX_LOOP_ITERATIONS,
        });
    }
    Ok(iterations + 1)
}

/// Elements produced by spreading or `for...of`
pub(crate) fn iterate(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::String(text) => Ok(text.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(RuntimeError::type_error(format!(
            "{} is not iterable",
            other.to_display_string()
        ))),
    }
}

fn spread_into_object(value: &Value, fields: &mut ObjectMap) {
    match value {
        Value::Object(source) => {
            for (key, value) in source.borrow().iter() {
                fields.insert(key.clone(), value.clone());
            }
        }
        Value::Array(items) => {
            for (index, item) in items.borrow().iter().enumerate() {
                fields.insert(index.to_string(), item.clone());
            }
        }
        Value::String(text) => {
            for (index, c) in text.chars().enumerate() {
                fields.insert(index.to_string(), Value::String(c.to_string()));
            }
        }
        // Spreading null, undefined or a number adds nothing
        _ => {}
    }
}

pub(crate) fn binary_op(operator: BinaryOp, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOp::Add => {
            let concatenates = matches!(left, Value::String(_))
                || matches!(right, Value::String(_))
                || !left.is_primitive()
                || !right.is_primitive();
            if concatenates {
                Value::String(left.to_display_string() + &right.to_display_string())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Exponent => Value::Number(left.to_number().powf(right.to_number())),
        BinaryOp::Equals => Value::Boolean(left.loose_equals(right)),
        BinaryOp::NotEquals => Value::Boolean(!left.loose_equals(right)),
        BinaryOp::StrictEquals => Value::Boolean(left.strict_equals(right)),
        BinaryOp::StrictNotEquals => Value::Boolean(!left.strict_equals(right)),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => Value::Boolean(compare(operator, left, right)),
    }
}

fn compare(operator: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match operator {
            BinaryOp::LessThan => a < b,
            BinaryOp::LessThanOrEqual => a <= b,
            BinaryOp::GreaterThan => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match operator {
        BinaryOp::LessThan => a < b,
        BinaryOp::LessThanOrEqual => a <= b,
        BinaryOp::GreaterThan => a > b,
        _ => a >= b,
    }
}

/// Short source-like rendering of a callee for error messages
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{}", describe(object), property),
        Expr::Index { object, .. } => format!("{}[...]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}
