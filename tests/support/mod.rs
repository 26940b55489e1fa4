//! Reference renderer for equivalence tests.
//!
//! Walks the parser's syntax tree directly over `serde_json::Value` data,
//! sharing no code with the canonical tree evaluator.

use std::collections::HashMap;

use serde_json::Value as Json;
use tmplwire::ast::{self, Node, Operand};

pub fn render_reference(source: &str, data: &Json) -> Result<String, String> {
    let tree = tmplwire::parse(source).map_err(|e| e.to_string())?;
    let mut r = Reference {
        root: data.clone(),
        vars: vec![HashMap::new()],
        out: String::new(),
    };
    r.list(&tree.root, data)?;
    Ok(r.out)
}

struct Reference {
    root: Json,
    vars: Vec<HashMap<String, Json>>,
    out: String,
}

impl Reference {
    fn list(&mut self, list: &ast::ListNode, dot: &Json) -> Result<(), String> {
        for node in &list.nodes {
            self.node(node, dot)?;
        }
        Ok(())
    }

    fn scoped(&mut self, list: &ast::ListNode, dot: &Json) -> Result<(), String> {
        self.vars.push(HashMap::new());
        let res = self.list(list, dot);
        self.vars.pop();
        res
    }

    fn node(&mut self, node: &Node, dot: &Json) -> Result<(), String> {
        match node {
            Node::Text(t) => self.out.push_str(&t.text),
            Node::Action(a) => {
                let v = self.pipe(&a.pipe, dot)?;
                if a.pipe.decl.is_empty() {
                    self.out.push_str(&print(&v)?);
                }
            }
            Node::If(b) => {
                self.vars.push(HashMap::new());
                let v = self.pipe(&b.pipe, dot)?;
                let res = if truthy(&v) {
                    self.scoped(&b.list, dot)
                } else if let Some(e) = &b.else_list {
                    self.scoped(e, dot)
                } else {
                    Ok(())
                };
                self.vars.pop();
                res?;
            }
            Node::Range(b) => {
                self.vars.push(HashMap::new());
                let v = self.chain(&b.pipe, dot)?;
                let steps: Vec<(Json, Json)> = match v {
                    Json::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, x)| (Json::from(i), x))
                        .collect(),
                    Json::Object(map) => {
                        let mut entries: Vec<_> = map.into_iter().collect();
                        entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
                        entries.into_iter().map(|(k, x)| (Json::from(k), x)).collect()
                    }
                    other => return Err(format!("cannot range over {other}")),
                };
                if steps.is_empty() {
                    if let Some(e) = &b.else_list {
                        self.scoped(e, dot)?;
                    }
                }
                for (key, elem) in steps {
                    let mut frame = HashMap::new();
                    match b.pipe.decl.as_slice() {
                        [] => {}
                        [e] => {
                            frame.insert(e.ident[0].clone(), elem.clone());
                        }
                        [k, e, ..] => {
                            frame.insert(k.ident[0].clone(), key);
                            frame.insert(e.ident[0].clone(), elem.clone());
                        }
                    }
                    self.vars.push(frame);
                    let res = self.list(&b.list, &elem);
                    self.vars.pop();
                    res?;
                }
                self.vars.pop();
            }
            other => return Err(format!("reference renderer has no {}", other.kind_name())),
        }
        Ok(())
    }

    fn pipe(&mut self, pipe: &ast::PipeNode, dot: &Json) -> Result<Json, String> {
        let v = self.chain(pipe, dot)?;
        for var in &pipe.decl {
            let name = &var.ident[0];
            if pipe.is_assign {
                let slot = self
                    .vars
                    .iter_mut()
                    .rev()
                    .find_map(|f| f.get_mut(name))
                    .ok_or_else(|| format!("undefined variable {name}"))?;
                *slot = v.clone();
            } else if let Some(frame) = self.vars.last_mut() {
                frame.insert(name.clone(), v.clone());
            }
        }
        Ok(v)
    }

    fn chain(&self, pipe: &ast::PipeNode, dot: &Json) -> Result<Json, String> {
        let mut cur = dot.clone();
        for cmd in &pipe.cmds {
            let [arg] = cmd.args.as_slice() else {
                return Err(format!("command with {} args", cmd.args.len()));
            };
            cur = self.operand(arg, &cur)?;
        }
        Ok(cur)
    }

    fn operand(&self, op: &Operand, dot: &Json) -> Result<Json, String> {
        match op {
            Operand::Dot(_) => Ok(dot.clone()),
            Operand::Field(f) => walk(dot, &f.ident),
            Operand::Variable(v) => {
                let name = &v.ident[0];
                let base = self
                    .vars
                    .iter()
                    .rev()
                    .find_map(|f| f.get(name))
                    .or((name == "$").then_some(&self.root))
                    .ok_or_else(|| format!("undefined variable {name}"))?;
                walk(base, &v.ident[1..])
            }
            other => Err(format!("reference renderer has no {}", other.kind_name())),
        }
    }
}

fn walk(v: &Json, path: &[String]) -> Result<Json, String> {
    let mut cur = v.clone();
    for key in path {
        cur = match cur {
            Json::Object(mut map) => map.remove(key).unwrap_or(Json::Null),
            other => return Err(format!("can't evaluate field {key} in {other}")),
        };
    }
    Ok(cur)
}

fn truthy(v: &Json) -> bool {
    match v {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64() != Some(0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(a) => !a.is_empty(),
        Json::Object(o) => !o.is_empty(),
    }
}

fn print(v: &Json) -> Result<String, String> {
    Ok(match v {
        Json::Null => String::new(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        Json::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => "0".to_string(),
            Some(f) => shortest_g(f),
            None => n.to_string(),
        },
        Json::String(s) => s.clone(),
        other => return Err(format!("can't print {other}")),
    })
}

fn shortest_g(f: f64) -> String {
    let sci = format!("{f:e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(exp) if exp < -4 || exp >= 6 => {
                format!("{mantissa}e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs())
            }
            _ => f.to_string(),
        },
        None => f.to_string(),
    }
}
