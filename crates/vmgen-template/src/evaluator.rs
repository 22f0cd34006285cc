/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! This module implements the evaluation of parsed templates against a
//! [`Scope`]. Output is accumulated into a string; helper functions are looked
//! up in a caller-supplied [`FunctionTable`].

use indexmap::IndexMap;

use crate::ast::{
    BinaryOp, Conditional, Expr, Loop, LoopKind, Span, StatementKind, TemplateNode, UnaryOp,
};
use crate::context::Scope;
use crate::error::{Location, TemplateError, TemplateResult};
use crate::functions::{FunctionTable, NoFunctions};
use crate::methods::{call_method, compare, list_index};
use crate::parser::Template;
use crate::value::TemplateValue;

impl Template {
    /// Render this template against `scope` with no helper functions.
    ///
    /// Assignments made by the template are left in `scope`.
    pub fn render(&self, scope: &mut Scope) -> TemplateResult<String> {
        self.render_with_functions(scope, &mut NoFunctions)
    }

    /// Render this template against `scope`, dispatching function calls the
    /// template makes to `functions`.
    pub fn render_with_functions(
        &self,
        scope: &mut Scope,
        functions: &mut dyn FunctionTable,
    ) -> TemplateResult<String> {
        let mut evaluator = Evaluator {
            template: self,
            scope,
            functions,
            out: String::new(),
            span: Span::default(),
        };
        evaluator.eval_nodes(&self.nodes)?;
        Ok(evaluator.out)
    }
}

struct Evaluator<'t, 's, 'f> {
    template: &'t Template,
    scope: &'s mut Scope,
    functions: &'f mut dyn FunctionTable,
    out: String,
    /// Span of the node being evaluated, for error locations.
    span: Span,
}

impl Evaluator<'_, '_, '_> {
    fn location(&self) -> Location {
        self.template.location(self.span)
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::EvaluationError {
            message: message.into(),
            location: self.location(),
        }
    }

    fn eval_nodes(&mut self, nodes: &[TemplateNode]) -> TemplateResult<()> {
        for node in nodes {
            self.eval_node(node)?;
        }
        Ok(())
    }

    fn eval_node(&mut self, node: &TemplateNode) -> TemplateResult<()> {
        match node {
            TemplateNode::Literal(lit) => self.out.push_str(&lit.text),

            TemplateNode::Output(output) => {
                self.span = output.span;
                let value = self.eval(&output.expr)?;
                self.out.push_str(&value.render());
            }

            TemplateNode::Statement(stmt) => {
                self.span = stmt.span;
                match &stmt.kind {
                    StatementKind::Assign { name, op, value } => {
                        let mut value = self.eval(value)?;
                        if let Some(op) = op {
                            let current = self.scope.get(name).cloned().unwrap_or_default();
                            value = self.binary(*op, current, value)?;
                        }
                        self.scope.assign(name.clone(), value);
                    }
                    StatementKind::Expr(expr) => {
                        self.eval(expr)?;
                    }
                }
            }

            TemplateNode::Conditional(cond) => self.eval_conditional(cond)?,

            TemplateNode::Loop(lp) => self.eval_loop(lp)?,
        }
        Ok(())
    }

    fn eval_conditional(&mut self, cond: &Conditional) -> TemplateResult<()> {
        let Conditional {
            branches,
            else_branch,
            span,
        } = cond;

        for (condition, body) in branches {
            self.span = *span;
            if self.eval(condition)?.is_truthy() {
                return self.eval_nodes(body);
            }
        }
        match else_branch {
            Some(body) => self.eval_nodes(body),
            None => Ok(()),
        }
    }

    fn eval_loop(&mut self, lp: &Loop) -> TemplateResult<()> {
        self.span = lp.span;
        let iterable = self.eval(&lp.iterable)?;
        let method = match lp.kind {
            LoopKind::Each | LoopKind::For => "each",
            LoopKind::EachWithIndex => "each_with_index",
            LoopKind::EachPair => "each_pair",
            LoopKind::Times => "times",
        };

        // One row of block arguments per iteration
        let rows: Vec<Vec<TemplateValue>> = match (lp.kind, iterable) {
            (LoopKind::Times, TemplateValue::Integer(n)) => {
                (0..n.max(0)).map(|i| vec![TemplateValue::Integer(i)]).collect()
            }
            (LoopKind::Each | LoopKind::For, TemplateValue::List(items)) => items
                .into_iter()
                .map(|item| destructure(item, lp.params.len()))
                .collect(),
            (LoopKind::Each | LoopKind::EachPair | LoopKind::For, TemplateValue::Map(map)) => map
                .into_iter()
                .map(|(k, v)| vec![TemplateValue::String(k), v])
                .map(|pair| pair_args(pair, lp.params.len()))
                .collect(),
            (LoopKind::EachWithIndex, TemplateValue::List(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| vec![item, index_value(i)])
                .collect(),
            (LoopKind::EachWithIndex, TemplateValue::Map(map)) => map
                .into_iter()
                .enumerate()
                .map(|(i, (k, v))| {
                    vec![
                        TemplateValue::List(vec![TemplateValue::String(k), v]),
                        index_value(i),
                    ]
                })
                .collect(),
            (_, other) => {
                return Err(TemplateError::UnknownMethod {
                    method: method.to_string(),
                    receiver: other.type_name(),
                    location: self.location(),
                });
            }
        };

        for row in rows {
            if lp.kind == LoopKind::For {
                // `for` does not open a scope
                self.bind_params(&lp.params, row, false);
                self.eval_nodes(&lp.body)?;
            } else {
                self.scope.push_frame();
                self.bind_params(&lp.params, row, true);
                let result = self.eval_nodes(&lp.body);
                self.scope.pop_frame();
                result?;
            }
        }
        Ok(())
    }

    fn bind_params(&mut self, params: &[String], row: Vec<TemplateValue>, block_local: bool) {
        let mut values = row.into_iter();
        for param in params {
            let value = values.next().unwrap_or_default();
            if block_local {
                self.scope.define(param.clone(), value);
            } else {
                self.scope.assign(param.clone(), value);
            }
        }
    }

    fn eval(&mut self, expr: &Expr) -> TemplateResult<TemplateValue> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::Variable(name) => {
                if let Some(value) = self.scope.get(name) {
                    return Ok(value.clone());
                }
                match self.functions.call(name, Vec::new()) {
                    Some(result) => self.function_result(name, result),
                    None => Err(TemplateError::UndefinedVariable {
                        name: name.clone(),
                        location: self.location(),
                    }),
                }
            }

            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<TemplateResult<Vec<_>>>()?;
                Ok(TemplateValue::List(values))
            }

            Expr::Hash(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = self.eval(key)?.render();
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(TemplateValue::Map(map))
            }

            Expr::Call { name, args } => {
                let args = self.eval_args(args)?;
                match self.functions.call(name, args) {
                    Some(result) => self.function_result(name, result),
                    None => Err(TemplateError::UnknownFunction {
                        name: name.clone(),
                        location: self.location(),
                    }),
                }
            }

            Expr::Method {
                receiver,
                name,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let args = self.eval_args(args)?;
                match call_method(&receiver, name, &args) {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => Err(TemplateError::UnknownMethod {
                        method: name.clone(),
                        receiver: receiver.type_name(),
                        location: self.location(),
                    }),
                    Err(message) => Err(self.error(message)),
                }
            }

            Expr::Index { receiver, index } => {
                let receiver = self.eval(receiver)?;
                let index = self.eval(index)?;
                self.index(receiver, index)
            }

            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(TemplateValue::Bool(!value.is_truthy())),
                    UnaryOp::Neg => match value {
                        TemplateValue::Integer(i) => i
                            .checked_neg()
                            .map(TemplateValue::Integer)
                            .ok_or_else(|| self.error("integer overflow")),
                        other => Err(TemplateError::UnknownMethod {
                            method: "-@".to_string(),
                            receiver: other.type_name(),
                            location: self.location(),
                        }),
                    },
                }
            }

            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                match op {
                    // Short-circuit; the result is the deciding operand
                    BinaryOp::And if !lhs.is_truthy() => Ok(lhs),
                    BinaryOp::Or if lhs.is_truthy() => Ok(lhs),
                    BinaryOp::And | BinaryOp::Or => self.eval(rhs),
                    _ => {
                        let rhs = self.eval(rhs)?;
                        self.binary(*op, lhs, rhs)
                    }
                }
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> TemplateResult<Vec<TemplateValue>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn function_result(
        &self,
        name: &str,
        result: crate::functions::FunctionResult,
    ) -> TemplateResult<TemplateValue> {
        result.map_err(|source| TemplateError::FunctionFailed {
            name: name.to_string(),
            location: self.location(),
            source,
        })
    }

    fn index(&self, receiver: TemplateValue, index: TemplateValue) -> TemplateResult<TemplateValue> {
        match (&receiver, &index) {
            (TemplateValue::List(items), TemplateValue::Integer(i)) => {
                Ok(list_index(items, *i).cloned().unwrap_or_default())
            }
            (TemplateValue::Map(map), key) => Ok(map.get(&key.render()).cloned().unwrap_or_default()),
            (TemplateValue::List(_), other) => Err(self.error(format!(
                "no implicit conversion of {} into integer",
                other.type_name()
            ))),
            (other, _) => Err(TemplateError::UnknownMethod {
                method: "[]".to_string(),
                receiver: other.type_name(),
                location: self.location(),
            }),
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        lhs: TemplateValue,
        rhs: TemplateValue,
    ) -> TemplateResult<TemplateValue> {
        use TemplateValue::{Integer, List, String as Str};

        let overflow = || self.error("integer overflow");
        let value = match (op, lhs, rhs) {
            (BinaryOp::Eq, l, r) => TemplateValue::Bool(l == r),
            (BinaryOp::Ne, l, r) => TemplateValue::Bool(l != r),
            (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, l, r) => {
                let ordering = compare(&l, &r).map_err(|m| self.error(m))?;
                TemplateValue::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                })
            }

            (BinaryOp::Add, Integer(a), Integer(b)) => Integer(a.checked_add(b).ok_or_else(overflow)?),
            (BinaryOp::Add, Str(a), Str(b)) => Str(a + &b),
            (BinaryOp::Add, List(mut a), List(b)) => {
                a.extend(b);
                List(a)
            }

            (BinaryOp::Sub, Integer(a), Integer(b)) => Integer(a.checked_sub(b).ok_or_else(overflow)?),

            (BinaryOp::Mul, Integer(a), Integer(b)) => Integer(a.checked_mul(b).ok_or_else(overflow)?),
            (BinaryOp::Mul, Str(s), Integer(n)) => {
                let n = usize::try_from(n).map_err(|_| self.error("negative argument"))?;
                if s.len().checked_mul(n).is_none() {
                    return Err(overflow());
                }
                Str(s.repeat(n))
            }
            (BinaryOp::Mul, List(items), Integer(n)) => {
                let n = usize::try_from(n).map_err(|_| self.error("negative argument"))?;
                let len = items.len().checked_mul(n).ok_or_else(overflow)?;
                let mut repeated = Vec::with_capacity(len);
                while repeated.len() < len {
                    repeated.extend(items.iter().cloned());
                }
                List(repeated)
            }

            (op, l, r) => {
                return Err(self.error(format!(
                    "undefined operator `{}` for {} and {}",
                    op.symbol(),
                    l.type_name(),
                    r.type_name()
                )));
            }
        };
        Ok(value)
    }
}

/// Split a list item across several block parameters (`|a, b|`).
fn destructure(item: TemplateValue, params: usize) -> Vec<TemplateValue> {
    match item {
        TemplateValue::List(parts) if params > 1 => parts,
        other => vec![other],
    }
}

/// A map entry yields `key, value` for two parameters and `[key, value]`
/// for one.
fn pair_args(pair: Vec<TemplateValue>, params: usize) -> Vec<TemplateValue> {
    if params > 1 {
        pair
    } else {
        vec![TemplateValue::List(pair)]
    }
}

fn index_value(i: usize) -> TemplateValue {
    TemplateValue::Integer(i64::try_from(i).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionMap;
    use pretty_assertions::assert_eq;

    fn render(source: &str) -> String {
        let template = Template::compile(source).unwrap();
        template.render(&mut Scope::new()).unwrap()
    }

    fn render_with(source: &str, vars: &[(&str, TemplateValue)]) -> String {
        let template = Template::compile(source).unwrap();
        let mut scope = Scope::new();
        for (name, value) in vars {
            scope.assign(*name, value.clone());
        }
        template.render(&mut scope).unwrap()
    }

    fn render_err(source: &str) -> TemplateError {
        let template = Template::compile_with_filename(source, "t.erb").unwrap();
        template.render(&mut Scope::new()).unwrap_err()
    }

    #[test]
    fn test_literal_and_output() {
        assert_eq!(
            render_with("VALUE <%= name %>;", &[("name", TemplateValue::from("foo"))]),
            "VALUE foo;"
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(render("<%= 1 + 2 * 3 %>"), "7");
        assert_eq!(render("<%= 2 - -3 %>"), "5");
        assert_eq!(render("<%= 'ab' * 2 %>|<%= 'a' + 'b' %>"), "abab|ab");
        assert_eq!(render("<%= [1] + [2] %>|<%= [0] * 2 %>"), "[1, 2]|[0, 0]");
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(render("<%= nil || 'x' %>"), "x");
        assert_eq!(render("<%= 1 && 2 %>"), "2");
        assert_eq!(render("<%= false && undefined_thing %>"), "false");
        assert_eq!(render("<%= !nil %>"), "true");
    }

    #[test]
    fn test_conditionals() {
        let source = "% if n > 1\nmany\n% elsif n == 1\none\n% else\nnone\n% end\n";
        assert_eq!(render_with(source, &[("n", TemplateValue::Integer(2))]), "many\n");
        assert_eq!(render_with(source, &[("n", TemplateValue::Integer(1))]), "one\n");
        assert_eq!(render_with(source, &[("n", TemplateValue::Integer(0))]), "none\n");
        assert_eq!(render("<% unless nil %>yes<% end %>"), "yes");
    }

    #[test]
    fn test_each_loops() {
        assert_eq!(render("<% [1, 2].each do |x| %><%= x %>,<% end %>"), "1,2,");
        assert_eq!(
            render("<% ['a', 'b'].each_with_index do |x, i| %><%= i %>=<%= x %> <% end %>"),
            "0=a 1=b "
        );
        assert_eq!(
            render("<% { a: 1, b: 2 }.each_pair do |k, v| %><%= k %><%= v %><% end %>"),
            "a1b2"
        );
        assert_eq!(render("<% 3.times do |i| %><%= i %><% end %>"), "012");
        assert_eq!(render("<% [[1, 2]].each do |a, b| %><%= b %><%= a %><% end %>"), "21");
    }

    #[test]
    fn test_block_params_are_block_local() {
        let out = render("<% x = 'outer' %><% [1].each do |x| %><%= x %><% end %><%= x %>");
        assert_eq!(out, "1outer");
    }

    #[test]
    fn test_block_assigns_outer_variable() {
        let out = render("<% total = 0 %><% [1, 2, 3].each do |n| %><% total += n %><% end %><%= total %>");
        assert_eq!(out, "6");
    }

    #[test]
    fn test_for_loop_leaks_variable() {
        assert_eq!(render("<% for x in [1, 2] %><% end %><%= x %>"), "2");
    }

    #[test]
    fn test_method_chains() {
        assert_eq!(
            render_with(
                "<%= insn.name.upcase + '_' + insn.operands.size.to_s %>",
                &[(
                    "insn",
                    TemplateValue::from(serde_json::json!({ "name": "nop", "operands": [] }))
                )]
            ),
            "NOP_0"
        );
    }

    #[test]
    fn test_indexing() {
        assert_eq!(render("<%= [1, 2, 3][-1] %>"), "3");
        assert_eq!(render("<%= { 'k' => 'v' }['k'] %>"), "v");
        assert_eq!(render("<%= [1][5].nil? %>"), "true");
    }

    #[test]
    fn test_output_of_collections() {
        assert_eq!(render("<%= [1, 'a', nil] %>"), "[1, \"a\", nil]");
        assert_eq!(render("<%= nil %>"), "");
    }

    #[test]
    fn test_assignments_remain_in_scope() {
        let template = Template::compile("<% x = 1 %>").unwrap();
        let mut scope = Scope::new();
        template.render(&mut scope).unwrap();
        assert_eq!(scope.get("x"), Some(&TemplateValue::Integer(1)));
    }

    #[test]
    fn test_helper_functions() {
        let template = Template::compile("<%= shout 'hi' %>|<%= answer %>").unwrap();
        let mut functions = FunctionMap::new()
            .with("shout", |args| {
                Ok(TemplateValue::String(
                    args.first().map(|v| v.render()).unwrap_or_default().to_uppercase(),
                ))
            })
            .with("answer", |_| Ok(TemplateValue::Integer(42)));
        let out = template
            .render_with_functions(&mut Scope::new(), &mut functions)
            .unwrap();
        assert_eq!(out, "HI|42");
    }

    #[test]
    fn test_keyword_arguments_arrive_as_map() {
        let template = Template::compile("<%= f 1, key: 'v' %>").unwrap();
        let mut functions = FunctionMap::new().with("f", |args| {
            Ok(TemplateValue::String(TemplateValue::List(args).inspect()))
        });
        let out = template
            .render_with_functions(&mut Scope::new(), &mut functions)
            .unwrap();
        assert_eq!(out, "[1, {\"key\" => \"v\"}]");
    }

    #[test]
    fn test_function_failure_keeps_source() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let template = Template::compile_with_filename("\n<%= explode(1) %>", "t.erb").unwrap();
        let mut functions = FunctionMap::new().with("explode", |_| Err(Box::new(Boom)));
        let err = template
            .render_with_functions(&mut Scope::new(), &mut functions)
            .unwrap_err();
        match err {
            TemplateError::FunctionFailed {
                name,
                location,
                source,
            } => {
                assert_eq!(name, "explode");
                assert_eq!(location.line, 2);
                assert!(source.downcast_ref::<Boom>().is_some());
            }
            other => panic!("expected FunctionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_variable() {
        let err = render_err("line one\n<%= missing %>");
        assert_eq!(err.to_string(), "t.erb:2:4: undefined local variable or function `missing`");
    }

    #[test]
    fn test_unknown_function() {
        let err = render_err("<%= nope(1) %>");
        assert!(matches!(err, TemplateError::UnknownFunction { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_unknown_method() {
        let err = render_err("<%= 1.upcase %>");
        assert_eq!(err.to_string(), "t.erb:1:4: undefined method `upcase` for integer");
    }

    #[test]
    fn test_type_errors() {
        assert!(render_err("<%= 1 + 'a' %>").to_string().contains("undefined operator `+`"));
        assert!(render_err("<%= 'a'[0] %>").to_string().contains("undefined method `[]` for string"));
        assert!(render_err("<%= 1 < 'a' %>").to_string().contains("comparison of integer with string failed"));
        assert!(render_err("<% nil.each do |x| %><% end %>").to_string().contains("undefined method `each` for nil"));
    }

    #[test]
    fn test_loop_frames_are_popped_on_error() {
        let template = Template::compile("<% [1].each do |x| %><%= missing %><% end %>").unwrap();
        let mut scope = Scope::new();
        assert!(template.render(&mut scope).is_err());
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_repetition_overflow_is_an_error() {
        let err = render_err("<%= [1, 2] * 9223372036854775807 %>");
        assert_eq!(err.to_string(), "t.erb:1:4: integer overflow");
        let err = render_err("<%= 'ab' * 9223372036854775807 %>");
        assert_eq!(err.to_string(), "t.erb:1:4: integer overflow");
        assert!(render_err("<%= [1] * -1 %>").to_string().contains("negative argument"));
    }

    #[test]
    fn test_integer_overflow() {
        let err = render_err("<%= 9223372036854775807 + 1 %>");
        assert!(err.to_string().ends_with("integer overflow"), "{}", err);
    }
}
