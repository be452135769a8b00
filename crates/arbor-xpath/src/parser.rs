//! Single-pass stack-machine parser.
//!
//! Every token either pushes a frame, completes the frame on top, or folds
//! the frames down to the nearest opener. Binary operators stay pending
//! until their right operand is complete; a new operator first absorbs the
//! pending ones that bind at least as tightly, which yields left
//! associativity and XPath 1.0 precedence.
use smallvec::SmallVec;

use crate::ast::{AxisKind, AxisStep, Expr, Literal, NodeTest, NodeType, OperatorKind, Predicate};
use crate::error::XPathError;
use crate::functions::FunctionTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Root,
    Paren,
    Argument,
    Predicate,
    TypeTestArgs,
}

#[derive(Debug)]
enum Frame {
    /// Opener that operands and operators fold down to.
    Group(GroupKind),
    /// Marks a predicate under construction; its content group sits above.
    Predicate,
    Function { name: String, args: Vec<Expr> },
    Axis { axis: AxisKind, test: Option<NodeTest>, predicates: Vec<Predicate> },
    /// Location path whose step after the last `/` is still missing.
    Path { root: bool, steps: Vec<Expr> },
    /// Operator waiting for its right operand. `left` is `None` for negation.
    Operator { op: OperatorKind, left: Option<Expr> },
    QNamePrefix(String),
    Operand(Expr),
}

/// What the next `(` opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Call,
    TypeTest,
}

struct Parser<'a> {
    functions: FunctionTable<'a>,
    stack: SmallVec<[Frame; 16]>,
    after_operand: bool,
    pending: Pending,
}

/// Parses a token stream produced by [`tokenize`](crate::tokenize).
pub(crate) fn parse(tokens: &[String], functions: FunctionTable<'_>) -> Result<Expr, XPathError> {
    let mut parser = Parser { functions, stack: SmallVec::new(), after_operand: false, pending: Pending::None };
    parser.stack.push(Frame::Group(GroupKind::Root));
    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1).map(String::as_str);
        tracing::trace!(token = token.as_str(), depth = parser.stack.len(), "parser token");
        parser.token(token, next)?;
    }
    parser.finish()
}

fn make_operator(op: OperatorKind, left: Option<Expr>, right: Expr) -> Expr {
    let mut children = Vec::with_capacity(2);
    children.extend(left);
    children.push(right);
    Expr::Operator { op, children }
}

fn path_expr(root: bool, steps: Vec<Expr>) -> Expr {
    if root { Expr::RootStep(steps) } else { Expr::Step(steps) }
}

fn unquote(token: &str) -> String {
    token[1..token.len() - 1].to_string()
}

impl Parser<'_> {
    fn token(&mut self, token: &str, next: Option<&str>) -> Result<(), XPathError> {
        match token {
            "(" => self.open_paren(),
            ")" => self.close_paren(),
            "[" => self.open_predicate(),
            "]" => self.close_predicate(),
            "," => self.argument_separator(),
            "/" => self.slash(),
            "::" => match self.stack.last() {
                Some(Frame::Axis { test: None, .. }) => Ok(()),
                _ => Err(XPathError::syntax("unexpected '::'")),
            },
            ":" => match self.stack.last() {
                Some(Frame::QNamePrefix(_)) => Ok(()),
                _ => Err(XPathError::syntax("unexpected ':'")),
            },
            "*" if self.after_operand => self.binary(OperatorKind::Multiply),
            "*" => self.wildcard(),
            "-" if self.after_operand => self.binary(OperatorKind::Subtract),
            "-" => self.negate(),
            t if t.starts_with(['"', '\'']) => self.push_operand(Expr::Literal(Literal::String(unquote(t)))),
            t if t.starts_with(|c: char| c.is_ascii_digit() || c == '.') => {
                let n = t.parse::<f64>().map_err(|_| XPathError::syntax(format!("invalid number '{t}'")))?;
                self.push_operand(Expr::Literal(Literal::Number(n)))
            }
            t if t.starts_with('$') => self.push_operand(Expr::Variable(t[1..].to_string())),
            t => match OperatorKind::from_token(t) {
                Some(op) if !op.is_word() || self.after_operand => self.binary(op),
                _ => self.bareword(t, next),
            },
        }
    }

    fn awaiting_step(&self) -> bool {
        matches!(self.stack.last(), Some(Frame::Axis { test: None, .. } | Frame::Path { .. }))
    }

    fn push_operand(&mut self, expr: Expr) -> Result<(), XPathError> {
        if self.after_operand {
            return Err(XPathError::syntax(format!("unexpected {expr} after an operand")));
        }
        if self.awaiting_step() || matches!(self.stack.last(), Some(Frame::QNamePrefix(_))) {
            return Err(XPathError::syntax(format!("{expr} cannot be a location step")));
        }
        self.stack.push(Frame::Operand(expr));
        self.after_operand = true;
        Ok(())
    }

    /// Makes sure an axis waiting for its node test is on top, pushing an
    /// implicit `child` axis when none is.
    fn step_axis(&mut self) -> Result<(), XPathError> {
        match self.stack.last() {
            Some(Frame::Axis { test: None, .. }) => Ok(()),
            _ if self.after_operand => Err(XPathError::syntax("unexpected location step after an operand")),
            _ => {
                self.stack.push(Frame::Axis { axis: AxisKind::Child, test: None, predicates: Vec::new() });
                Ok(())
            }
        }
    }

    fn set_test(&mut self, test: NodeTest) -> Result<(), XPathError> {
        self.step_axis()?;
        if let Some(Frame::Axis { test: slot, .. }) = self.stack.last_mut() {
            *slot = Some(test);
        }
        self.after_operand = true;
        Ok(())
    }

    fn bareword(&mut self, word: &str, next: Option<&str>) -> Result<(), XPathError> {
        if matches!(self.stack.last(), Some(Frame::QNamePrefix(_))) {
            let Some(Frame::QNamePrefix(prefix)) = self.stack.pop() else {
                return Err(XPathError::parse_state("lost qualified name prefix"));
            };
            return self.set_test(NodeTest::QName { prefix, local: word.to_string() });
        }
        match next {
            Some("::") => {
                let axis = AxisKind::from_name(word).ok_or_else(|| XPathError::syntax(format!("unknown axis '{word}'")))?;
                if self.after_operand || matches!(self.stack.last(), Some(Frame::Axis { test: None, .. })) {
                    return Err(XPathError::syntax(format!("unexpected axis '{word}'")));
                }
                self.stack.push(Frame::Axis { axis, test: None, predicates: Vec::new() });
                Ok(())
            }
            Some("(") => {
                if let Some(kind) = NodeType::from_name(word) {
                    self.set_test(NodeTest::Type { kind, target: None })?;
                    self.pending = Pending::TypeTest;
                    return Ok(());
                }
                if self.functions.get(word).is_none() {
                    return Err(XPathError::syntax(format!("unknown function {word}()")));
                }
                if self.after_operand || self.awaiting_step() {
                    return Err(XPathError::syntax(format!("unexpected call to {word}()")));
                }
                self.stack.push(Frame::Function { name: word.to_string(), args: Vec::new() });
                self.pending = Pending::Call;
                Ok(())
            }
            Some(":") => {
                self.step_axis()?;
                self.stack.push(Frame::QNamePrefix(word.to_string()));
                Ok(())
            }
            _ if !self.awaiting_step() => match word {
                "true" => self.push_operand(Expr::Literal(Literal::Boolean(true))),
                "false" => self.push_operand(Expr::Literal(Literal::Boolean(false))),
                "Infinity" => self.push_operand(Expr::Literal(Literal::Number(f64::INFINITY))),
                "NaN" => self.push_operand(Expr::Literal(Literal::Number(f64::NAN))),
                _ => self.set_test(NodeTest::NCName(word.to_string())),
            },
            _ => self.set_test(NodeTest::NCName(word.to_string())),
        }
    }

    fn wildcard(&mut self) -> Result<(), XPathError> {
        if matches!(self.stack.last(), Some(Frame::QNamePrefix(_))) {
            let Some(Frame::QNamePrefix(prefix)) = self.stack.pop() else {
                return Err(XPathError::parse_state("lost qualified name prefix"));
            };
            return self.set_test(NodeTest::PrefixWildcard(prefix));
        }
        self.set_test(NodeTest::Any)
    }

    fn negate(&mut self) -> Result<(), XPathError> {
        if self.awaiting_step() {
            return Err(XPathError::syntax("unexpected '-' in a location path"));
        }
        self.stack.push(Frame::Operator { op: OperatorKind::Negate, left: None });
        Ok(())
    }

    fn binary(&mut self, op: OperatorKind) -> Result<(), XPathError> {
        let bare_root =
            matches!(self.stack.last(), Some(Frame::Path { root: true, steps }) if steps.is_empty());
        if !self.after_operand && !bare_root {
            return Err(XPathError::syntax(format!("operator '{}' is missing its left operand", op.symbol())));
        }
        let mut left = self.take_operand()?;
        while let Some(Frame::Operator { op: pending, .. }) = self.stack.last() {
            if pending.precedence() < op.precedence() {
                break;
            }
            let Some(Frame::Operator { op: pending, left: pending_left }) = self.stack.pop() else { break };
            left = make_operator(pending, pending_left, left);
        }
        self.stack.push(Frame::Operator { op, left: Some(left) });
        self.after_operand = false;
        Ok(())
    }

    fn slash(&mut self) -> Result<(), XPathError> {
        if !self.after_operand {
            if self.awaiting_step() {
                return Err(XPathError::syntax("unexpected '/'"));
            }
            self.stack.push(Frame::Path { root: true, steps: Vec::new() });
            return Ok(());
        }
        let (root, steps) = match self.take_operand()? {
            Expr::Step(steps) => (false, steps),
            Expr::RootStep(steps) => (true, steps),
            other => (false, vec![other]),
        };
        self.stack.push(Frame::Path { root, steps });
        self.after_operand = false;
        Ok(())
    }

    /// Pops the completed operand on top, closing a pending location path
    /// beneath it.
    fn take_operand(&mut self) -> Result<Expr, XPathError> {
        let expr = match self.stack.pop() {
            Some(Frame::Operand(expr)) => expr,
            Some(Frame::Axis { axis, test: Some(test), predicates }) => Expr::Axis(AxisStep { axis, test, predicates }),
            Some(Frame::Axis { axis, test: None, .. }) => {
                return Err(XPathError::syntax(format!("axis '{axis}' is missing its node test")));
            }
            Some(Frame::Path { root: true, steps }) if steps.is_empty() => return Ok(Expr::RootStep(steps)),
            Some(Frame::Path { .. }) => return Err(XPathError::syntax("expected a location step after '/'")),
            Some(Frame::QNamePrefix(prefix)) => {
                return Err(XPathError::syntax(format!("incomplete qualified name '{prefix}:'")));
            }
            Some(other) => {
                self.stack.push(other);
                return Err(XPathError::syntax("missing operand"));
            }
            None => return Err(XPathError::parse_state("parser stack is empty")),
        };
        if matches!(self.stack.last(), Some(Frame::Path { .. })) {
            if let Some(Frame::Path { root, mut steps, .. }) = self.stack.pop() {
                steps.push(expr);
                return Ok(path_expr(root, steps));
            }
        }
        Ok(expr)
    }

    /// Folds everything above the nearest group into one expression. `None`
    /// when the group is empty.
    fn reduce(&mut self) -> Result<Option<Expr>, XPathError> {
        let mut operand = match self.stack.last() {
            Some(Frame::Group(_)) => None,
            _ => Some(self.take_operand()?),
        };
        while matches!(self.stack.last(), Some(Frame::Operator { .. })) {
            if let Some(Frame::Operator { op, left }) = self.stack.pop() {
                let right = operand
                    .take()
                    .ok_or_else(|| XPathError::syntax(format!("operator '{}' is missing its right operand", op.symbol())))?;
                operand = Some(make_operator(op, left, right));
            }
        }
        match self.stack.last() {
            Some(Frame::Group(_)) => Ok(operand),
            Some(other) => Err(XPathError::syntax(format!("unexpected {other:?} in expression"))),
            None => Err(XPathError::parse_state("parser stack is empty")),
        }
    }

    fn open_paren(&mut self) -> Result<(), XPathError> {
        let kind = match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::Call => GroupKind::Argument,
            Pending::TypeTest => GroupKind::TypeTestArgs,
            Pending::None => {
                if self.after_operand || self.awaiting_step() {
                    return Err(XPathError::syntax("unexpected '('"));
                }
                GroupKind::Paren
            }
        };
        self.stack.push(Frame::Group(kind));
        self.after_operand = false;
        Ok(())
    }

    fn close_paren(&mut self) -> Result<(), XPathError> {
        let inner = self.reduce()?;
        match self.stack.pop() {
            Some(Frame::Group(GroupKind::Paren)) => {
                if let Some(inner) = inner {
                    self.stack.push(Frame::Operand(Expr::Expression(Box::new(inner))));
                    self.after_operand = true;
                }
                Ok(())
            }
            Some(Frame::Group(GroupKind::Argument)) => {
                let Some(Frame::Function { name, mut args }) = self.stack.pop() else {
                    return Err(XPathError::parse_state("argument list without function"));
                };
                match inner {
                    Some(arg) => args.push(arg),
                    None if !args.is_empty() => {
                        return Err(XPathError::syntax(format!("empty argument in call to {name}()")));
                    }
                    None => {}
                }
                self.functions.check_arity(&name, args.len())?;
                self.stack.push(Frame::Operand(Expr::Function { name, args }));
                self.after_operand = true;
                Ok(())
            }
            Some(Frame::Group(GroupKind::TypeTestArgs)) => {
                let Some(Frame::Axis { test: Some(NodeTest::Type { kind, target }), .. }) = self.stack.last_mut() else {
                    return Err(XPathError::parse_state("node type test without axis"));
                };
                match inner {
                    None => {}
                    Some(Expr::Literal(Literal::String(literal))) if *kind == NodeType::ProcessingInstruction => {
                        *target = Some(literal);
                    }
                    Some(other) => {
                        return Err(XPathError::syntax(format!("{}() does not take argument {other}", kind.name())));
                    }
                }
                self.after_operand = true;
                Ok(())
            }
            _ => Err(XPathError::syntax("mismatched ')'")),
        }
    }

    fn open_predicate(&mut self) -> Result<(), XPathError> {
        self.stack.push(Frame::Predicate);
        self.stack.push(Frame::Group(GroupKind::Predicate));
        self.after_operand = false;
        Ok(())
    }

    fn close_predicate(&mut self) -> Result<(), XPathError> {
        let inner = self.reduce()?;
        if !matches!(self.stack.pop(), Some(Frame::Group(GroupKind::Predicate))) {
            return Err(XPathError::syntax("mismatched ']'"));
        }
        if !matches!(self.stack.pop(), Some(Frame::Predicate)) {
            return Err(XPathError::parse_state("predicate content without predicate"));
        }
        match self.stack.last_mut() {
            Some(Frame::Axis { test: Some(_), predicates, .. }) => predicates.extend(inner.map(|expr| Predicate { expr })),
            Some(Frame::Operand(_)) => {
                let Some(expr) = inner else {
                    self.after_operand = true;
                    return Ok(());
                };
                let Some(Frame::Operand(primary)) = self.stack.pop() else {
                    return Err(XPathError::parse_state("lost filter expression"));
                };
                let predicate = Predicate { expr };
                let filter = match primary {
                    Expr::Filter { primary, mut predicates } => {
                        predicates.push(predicate);
                        Expr::Filter { primary, predicates }
                    }
                    other => Expr::Filter { primary: Box::new(other), predicates: vec![predicate] },
                };
                self.stack.push(Frame::Operand(filter));
            }
            _ => return Err(XPathError::parse_state("predicate must follow a location step or a primary expression")),
        }
        self.after_operand = true;
        Ok(())
    }

    fn argument_separator(&mut self) -> Result<(), XPathError> {
        let inner = self.reduce()?;
        if !matches!(self.stack.last(), Some(Frame::Group(GroupKind::Argument))) {
            return Err(XPathError::syntax("',' outside of a function call"));
        }
        let arg = inner.ok_or_else(|| XPathError::syntax("empty function argument"))?;
        self.stack.pop();
        let Some(Frame::Function { args, .. }) = self.stack.last_mut() else {
            return Err(XPathError::parse_state("argument list without function"));
        };
        args.push(arg);
        self.stack.push(Frame::Group(GroupKind::Argument));
        self.after_operand = false;
        Ok(())
    }

    fn finish(mut self) -> Result<Expr, XPathError> {
        let inner = self.reduce()?;
        match self.stack.pop() {
            Some(Frame::Group(GroupKind::Root)) if self.stack.is_empty() => {}
            _ => return Err(XPathError::syntax("expression is not closed")),
        }
        inner.ok_or_else(|| XPathError::syntax("empty expression"))
    }
}
