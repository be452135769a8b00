//! Expression tree produced by the parser.
use std::fmt;

use arbor_dom::NodeKind;

use crate::value::number_to_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl AxisKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "attribute" => Self::Attribute,
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "following" => Self::Following,
            "following-sibling" => Self::FollowingSibling,
            "namespace" => Self::Namespace,
            "parent" => Self::Parent,
            "preceding" => Self::Preceding,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ancestor => "ancestor",
            Self::AncestorOrSelf => "ancestor-or-self",
            Self::Attribute => "attribute",
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::Following => "following",
            Self::FollowingSibling => "following-sibling",
            Self::Namespace => "namespace",
            Self::Parent => "parent",
            Self::Preceding => "preceding",
            Self::PrecedingSibling => "preceding-sibling",
            Self::SelfAxis => "self",
        }
    }

    /// Reverse axes deliver nodes nearest-first, i.e. in reverse document
    /// order.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor | Self::AncestorOrSelf | Self::Parent | Self::Preceding | Self::PrecedingSibling
        )
    }

    /// Node kind matched by `*` and name tests on this axis.
    pub fn principal_kind(self) -> NodeKind {
        match self {
            Self::Attribute => NodeKind::Attribute,
            Self::Namespace => NodeKind::Namespace,
            _ => NodeKind::Element,
        }
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Negate,
    Union,
}

impl OperatorKind {
    /// Binary operator spelled by `token`. `-` maps to subtraction and `*`
    /// to multiplication; the parser decides from position whether they
    /// are operators at all.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "or" => Self::Or,
            "and" => Self::And,
            "=" => Self::Equal,
            "!=" => Self::NotEqual,
            "<" => Self::Less,
            "<=" => Self::LessEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterEqual,
            "+" => Self::Add,
            "-" => Self::Subtract,
            "*" => Self::Multiply,
            "div" => Self::Divide,
            "mod" => Self::Modulo,
            "|" => Self::Union,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Add => "+",
            Self::Subtract | Self::Negate => "-",
            Self::Multiply => "*",
            Self::Divide => "div",
            Self::Modulo => "mod",
            Self::Union => "|",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal | Self::NotEqual => 3,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual => 4,
            Self::Add | Self::Subtract => 5,
            Self::Multiply | Self::Divide | Self::Modulo => 6,
            Self::Negate => 7,
            Self::Union => 8,
        }
    }

    /// Spelled with letters, so a name test when no operand precedes it.
    pub fn is_word(self) -> bool {
        matches!(self, Self::Or | Self::And | Self::Divide | Self::Modulo)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Node,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "node" => Self::Node,
            "text" => Self::Text,
            "comment" => Self::Comment,
            "processing-instruction" => Self::ProcessingInstruction,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Text => "text",
            Self::Comment => "comment",
            Self::ProcessingInstruction => "processing-instruction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `*`
    Any,
    /// Unprefixed name, matched against the local name.
    NCName(String),
    /// `prefix:local`, matched against the expanded name.
    QName { prefix: String, local: String },
    /// `prefix:*`
    PrefixWildcard(String),
    /// `node()`, `text()`, `comment()`, `processing-instruction('target'?)`
    Type { kind: NodeType, target: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisStep {
    pub axis: AxisKind,
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    /// Parenthesized expression.
    Expression(Box<Expr>),
    /// Operator with its operands; one for negation, two otherwise.
    Operator { op: OperatorKind, children: Vec<Expr> },
    Function { name: String, args: Vec<Expr> },
    Axis(AxisStep),
    /// Relative location path; each part evaluates against the nodes the
    /// previous part selected.
    Step(Vec<Expr>),
    /// Absolute location path, starting at the document node.
    RootStep(Vec<Expr>),
    /// Primary expression filtered by predicates.
    Filter { primary: Box<Expr>, predicates: Vec<Predicate> },
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Expr], sep: &str) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{part}")?;
    }
    Ok(())
}

fn write_predicates(f: &mut fmt::Formatter<'_>, predicates: &[Predicate]) -> fmt::Result {
    predicates.iter().try_for_each(|p| write!(f, "[{}]", p.expr))
}

impl fmt::Display for NodeTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeTest::Any => f.write_str("*"),
            NodeTest::NCName(name) => f.write_str(name),
            NodeTest::QName { prefix, local } => write!(f, "{prefix}:{local}"),
            NodeTest::PrefixWildcard(prefix) => write!(f, "{prefix}:*"),
            NodeTest::Type { kind, target: Some(target) } => write!(f, "{}('{target}')", kind.name()),
            NodeTest::Type { kind, target: None } => write!(f, "{}()", kind.name()),
        }
    }
}

/// Fully parenthesized, unabbreviated rendering.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::String(s)) if s.contains('"') => write!(f, "'{s}'"),
            Expr::Literal(Literal::String(s)) => write!(f, "\"{s}\""),
            Expr::Literal(Literal::Number(n)) => f.write_str(&number_to_string(*n)),
            Expr::Literal(Literal::Boolean(b)) => write!(f, "{b}"),
            Expr::Variable(name) => write!(f, "${name}"),
            Expr::Expression(inner) => write!(f, "({inner})"),
            Expr::Operator { op: OperatorKind::Negate, children } => {
                f.write_str("-(")?;
                write_joined(f, children, "")?;
                f.write_str(")")
            }
            Expr::Operator { op, children } => {
                f.write_str("(")?;
                write_joined(f, children, &format!(" {} ", op.symbol()))?;
                f.write_str(")")
            }
            Expr::Function { name, args } => {
                write!(f, "{name}(")?;
                write_joined(f, args, ", ")?;
                f.write_str(")")
            }
            Expr::Axis(step) => {
                write!(f, "{}::{}", step.axis, step.test)?;
                write_predicates(f, &step.predicates)
            }
            Expr::Step(parts) => write_joined(f, parts, "/"),
            Expr::RootStep(parts) => {
                f.write_str("/")?;
                write_joined(f, parts, "/")
            }
            Expr::Filter { primary, predicates } => {
                write!(f, "{primary}")?;
                write_predicates(f, predicates)
            }
        }
    }
}
