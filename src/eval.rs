use crate::error::RenderError;
use crate::node::{Arg, Branch, Command, List, Node, Pipe, Variable};
use crate::scope::Scope;
use crate::value::Value;

static NULL: Value = Value::Null;

/// Render a canonical tree against `data`.
///
/// The tree is only read, so one tree can be rendered concurrently from any
/// number of threads; each call gets its own variable frames.
#[tracing::instrument(level = "debug", skip_all)]
pub fn render(tree: &Node, data: &Value) -> Result<String, RenderError> {
    let mut evaluator = Evaluator::new(data);
    evaluator.walk(tree, data)?;
    tracing::debug!(bytes = evaluator.output.len(), "rendered template");
    Ok(evaluator.output)
}

struct Evaluator<'a> {
    scope: Scope<'a>,
    output: String,
}

impl<'a> Evaluator<'a> {
    fn new(root: &'a Value) -> Self {
        Self {
            scope: Scope::new(root),
            output: String::new(),
        }
    }

    fn walk(&mut self, node: &Node, dot: &Value) -> Result<(), RenderError> {
        match node {
            Node::Text { content } => self.output.push_str(content),
            Node::List { items } => self.walk_items(items, dot)?,
            Node::Action { pipe } => {
                let value = self.eval_pipe(pipe, dot)?;
                // Declarations and assignments print nothing.
                if pipe.decl.is_empty() {
                    self.print(&value)?;
                }
            }
            Node::If(branch) => self.walk_if(branch, dot)?,
            Node::Range(branch) => self.walk_range(branch, dot)?,
        }
        Ok(())
    }

    fn walk_items(&mut self, items: &[Node], dot: &Value) -> Result<(), RenderError> {
        for item in items {
            self.walk(item, dot)?;
        }
        Ok(())
    }

    fn walk_list(&mut self, list: &List, dot: &Value) -> Result<(), RenderError> {
        self.scope.push();
        self.walk_items(&list.items, dot)?;
        self.scope.pop();
        Ok(())
    }

    fn walk_if(&mut self, branch: &Branch, dot: &Value) -> Result<(), RenderError> {
        // Variables declared by the condition are visible in both bodies.
        self.scope.push();
        let value = self.eval_pipe(&branch.pipe, dot)?;
        if value.is_truthy() {
            self.walk_list(&branch.list, dot)?;
        } else if let Some(else_list) = &branch.else_list {
            self.walk_list(else_list, dot)?;
        }
        self.scope.pop();
        Ok(())
    }

    fn walk_range(&mut self, branch: &Branch, dot: &Value) -> Result<(), RenderError> {
        self.scope.push();
        let value = self.eval_chain(&branch.pipe, dot)?;
        let is_empty = match &value {
            Value::Sequence(items) => items.is_empty(),
            Value::Mapping(entries) => entries.is_empty(),
            other => {
                return Err(RenderError::InvalidRangeTarget {
                    found: other.kind(),
                })
            }
        };

        if is_empty {
            if let Some(else_list) = &branch.else_list {
                self.walk_list(else_list, dot)?;
            }
        } else if let Value::Sequence(items) = &value {
            for (i, item) in items.iter().enumerate() {
                self.range_step(branch, Value::from(i), item)?;
            }
        } else if let Value::Mapping(entries) = &value {
            // BTreeMap iteration is byte-wise key order.
            for (key, item) in entries {
                self.range_step(branch, Value::from(key.as_str()), item)?;
            }
        }

        self.scope.pop();
        Ok(())
    }

    /// One iteration: bind `$elem` or `$key, $elem`, then render the body
    /// with the element as the dot.
    fn range_step(&mut self, branch: &Branch, key: Value, elem: &Value) -> Result<(), RenderError> {
        self.scope.push();
        let pipe = &branch.pipe;
        match pipe.decl.as_slice() {
            [] => {}
            [elem_var] => self.bind(pipe, elem_var, elem.clone())?,
            [key_var, elem_var, ..] => {
                self.bind(pipe, key_var, key)?;
                self.bind(pipe, elem_var, elem.clone())?;
            }
        }
        self.walk_items(&branch.list.items, elem)?;
        self.scope.pop();
        Ok(())
    }

    /// Runs the command chain and binds any declared variables to the result.
    fn eval_pipe(&mut self, pipe: &Pipe, dot: &Value) -> Result<Value, RenderError> {
        let value = self.eval_chain(pipe, dot)?;
        for var in &pipe.decl {
            self.bind(pipe, var, value.clone())?;
        }
        Ok(value)
    }

    /// Each command runs with the previous command's result as its context.
    fn eval_chain(&self, pipe: &Pipe, dot: &Value) -> Result<Value, RenderError> {
        let mut current = dot.clone();
        for cmd in &pipe.cmds {
            current = self.eval_command(cmd, &current)?;
        }
        Ok(current)
    }

    fn eval_command(&self, cmd: &Command, context: &Value) -> Result<Value, RenderError> {
        match cmd.args.as_slice() {
            [arg] => self.eval_arg(arg, context),
            args => Err(RenderError::CommandArity { count: args.len() }),
        }
    }

    fn eval_arg(&self, arg: &Arg, context: &Value) -> Result<Value, RenderError> {
        match arg {
            Arg::Field { ident } => lookup(context, ident).cloned(),
            Arg::Variable { ident } => {
                let (name, path) = match ident.split_first() {
                    Some((name, path)) => (name.as_str(), path),
                    None => ("", &[][..]),
                };
                let value = self
                    .scope
                    .get(name)
                    .ok_or_else(|| RenderError::UndefinedVariable {
                        name: name.to_string(),
                    })?;
                lookup(value, path).cloned()
            }
        }
    }

    fn bind(&mut self, pipe: &Pipe, var: &Variable, value: Value) -> Result<(), RenderError> {
        let name = var.ident.first().map_or("", String::as_str);
        if pipe.is_assign {
            self.scope.assign(name, value)
        } else {
            self.scope.declare(name, value);
            Ok(())
        }
    }

    fn print(&mut self, value: &Value) -> Result<(), RenderError> {
        let text = value
            .to_output()
            .ok_or(RenderError::UnprintableValue {
                found: value.kind(),
            })?;
        self.output.push_str(&text);
        Ok(())
    }
}

/// Field chain lookup. Missing mapping keys are null; anything that is not a
/// mapping cannot be looked into.
fn lookup<'v>(mut value: &'v Value, path: &[String]) -> Result<&'v Value, RenderError> {
    for field in path {
        value = match value {
            Value::Mapping(entries) => entries.get(field).unwrap_or(&NULL),
            other => {
                return Err(RenderError::InvalidFieldTarget {
                    field: field.clone(),
                    found: other.kind(),
                })
            }
        };
    }
    Ok(value)
}
