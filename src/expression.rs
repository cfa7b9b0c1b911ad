use std::fmt;

use bitvec::vec::BitVec;
use num_traits::Float;
use smallvec::{smallvec, SmallVec};

use crate::bindings::{BindingId, Bindings};
use crate::real::Real;

/// A parsed, `Real`-valued calculation.
///
/// Each child is exclusively owned by its parent. Variables are stored as
/// [`BindingId`]s so the tree can be evaluated again and again against
/// changing [`Bindings`].
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    // Constant.
    Literal(Real),

    // Input variable.
    Binding(BindingId),

    Unary(UnaryFunction, Box<Expression>),
    Binary(BinaryOperator, Box<Expression>, Box<Expression>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol {
            b'+' => Some(Self::Add),
            b'-' => Some(Self::Sub),
            b'*' => Some(Self::Mul),
            b'/' => Some(Self::Div),
            b'^' => Some(Self::Pow),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
            Self::Pow => '^',
        }
    }

    pub fn apply<T: Float>(self, lhs: T, rhs: T) -> T {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Pow => lhs.powf(rhs),
        }
    }
}

/// Single-operand functions, in the order their names are matched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryFunction {
    Cos,
    Sin,
    Tan,
    Acos,
    Asin,
    Atan,
    /// Natural logarithm.
    Log,
}

impl UnaryFunction {
    pub const ALL: [Self; 7] = [
        Self::Cos,
        Self::Sin,
        Self::Tan,
        Self::Acos,
        Self::Asin,
        Self::Atan,
        Self::Log,
    ];

    /// Accepted spellings, uppercase. Input is matched case-insensitively.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Cos => &["COS", "COSINE"],
            Self::Sin => &["SIN", "SINE"],
            Self::Tan => &["TAN", "TANGENT"],
            Self::Acos => &["ACOS", "ARCCOS", "ACOSINE", "ARCCOSINE"],
            Self::Asin => &["ASIN", "ARCSIN", "ASINE", "ARCSINE"],
            Self::Atan => &["ATAN", "ARCTAN", "ATANGENT", "ARCTANGENT"],
            Self::Log => &["LOG"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Tan => "tan",
            Self::Acos => "acos",
            Self::Asin => "asin",
            Self::Atan => "atan",
            Self::Log => "log",
        }
    }

    /// Finds the function `text` starts with, and the length of the spelling
    /// that matched.
    ///
    /// Functions are tried in [`Self::ALL`] order and the first one with a
    /// matching alias wins. Within that function the longest matching alias
    /// is used, so `cosine(x)` leaves `(x)` rather than `ine(x)`.
    pub fn match_prefix(text: &str) -> Option<(Self, usize)> {
        Self::ALL.into_iter().find_map(|function| {
            function
                .aliases()
                .iter()
                .filter(|alias| {
                    text.get(..alias.len())
                        .is_some_and(|head| head.eq_ignore_ascii_case(alias))
                })
                .map(|alias| alias.len())
                .max()
                .map(|len| (function, len))
        })
    }

    pub fn apply<T: Float>(self, only: T) -> T {
        match self {
            Self::Cos => only.cos(),
            Self::Sin => only.sin(),
            Self::Tan => only.tan(),
            Self::Acos => only.acos(),
            Self::Asin => only.asin(),
            Self::Atan => only.atan(),
            Self::Log => only.ln(),
        }
    }
}

impl Expression {
    pub fn unary(function: UnaryFunction, only: Self) -> Self {
        Self::Unary(function, Box::new(only))
    }

    pub fn binary(op: BinaryOperator, lhs: Self, rhs: Self) -> Self {
        Self::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Bit `i` is set if evaluation reads binding `i`. The vector is only as
    /// long as the highest binding read.
    pub fn referenced_bindings(&self) -> BitVec {
        let mut used = BitVec::new();
        self.visit_bindings(|id| {
            if used.len() <= id {
                used.resize(id + 1, false);
            }
            used.set(id, true);
        });
        used
    }

    /// True if no variable is read, so every evaluation gives the same result.
    pub fn is_constant(&self) -> bool {
        self.referenced_bindings().not_any()
    }

    fn visit_bindings(&self, mut visit: impl FnMut(BindingId)) {
        let mut pending: SmallVec<[&Self; 16]> = smallvec![self];
        while let Some(node) = pending.pop() {
            match node {
                Self::Literal(_) => {}
                Self::Binding(id) => visit(*id),
                Self::Unary(_, only) => pending.push(only),
                Self::Binary(_, lhs, rhs) => {
                    pending.push(rhs);
                    pending.push(lhs);
                }
            }
        }
    }

    /// Moves non-leaf children out into `out`, leaving literals behind.
    fn detach_children(&mut self, out: &mut Vec<Self>) {
        let mut detach = |child: &mut Box<Self>| {
            if matches!(**child, Self::Unary(..) | Self::Binary(..)) {
                out.push(std::mem::replace(&mut **child, Self::Literal(0.0)));
            }
        };
        match self {
            Self::Literal(_) | Self::Binding(_) => {}
            Self::Unary(_, only) => detach(only),
            Self::Binary(_, lhs, rhs) => {
                detach(lhs);
                detach(rhs);
            }
        }
    }

    /// Fully parenthesised rendering, with variable names taken from
    /// `bindings`.
    pub fn display<'a>(&'a self, bindings: &'a Bindings) -> ExpressionDisplay<'a> {
        ExpressionDisplay {
            expression: self,
            bindings,
        }
    }
}

// The derived drop glue recurses once per level; a parsed `1+1+...+1` can be
// deep enough to overflow the stack that way.
impl Drop for Expression {
    fn drop(&mut self) {
        let mut detached = Vec::new();
        self.detach_children(&mut detached);
        while let Some(mut node) = detached.pop() {
            node.detach_children(&mut detached);
        }
    }
}

pub struct ExpressionDisplay<'a> {
    expression: &'a Expression,
    bindings: &'a Bindings,
}

impl<'a> ExpressionDisplay<'a> {
    fn nested(&self, expression: &'a Expression) -> Self {
        Self {
            expression,
            bindings: self.bindings,
        }
    }
}

impl fmt::Display for ExpressionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expression {
            Expression::Literal(value) => write!(f, "{value}"),
            Expression::Binding(id) => match self.bindings.name(*id) {
                Some(name) => write!(f, "{name}"),
                None => write!(f, "${id}"),
            },
            Expression::Unary(function, only) => {
                write!(f, "{}({})", function.name(), self.nested(only))
            }
            Expression::Binary(op, lhs, rhs) => {
                write!(
                    f,
                    "({} {} {})",
                    self.nested(lhs),
                    op.symbol(),
                    self.nested(rhs)
                )
            }
        }
    }
}
