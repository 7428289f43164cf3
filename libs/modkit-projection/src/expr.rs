//! Projection tree.
//!
//! A projection describes how destination objects are built from a source
//! row: member reads, conditionals, object construction with member
//! bindings, list literals and collection pipelines (`Where`, `Select`,
//! `ToList`). Every node knows its static [`Ty`].

use std::fmt;

use crate::types::{Ty, TypeInfo};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    /// `source.Where(predicate)`
    Where,
    /// `source.Select(selector)`
    Select,
    /// `source.ToList()`
    ToList,
    Named(String),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Where => f.write_str("Where"),
            Method::Select => f.write_str("Select"),
            Method::ToList => f.write_str("ToList"),
            Method::Named(name) => f.write_str(name),
        }
    }
}

/// `member = value` inside an object construction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Binding {
    pub member: &'static str,
    pub value: Expr,
}

impl Binding {
    #[must_use]
    pub fn new(member: &'static str, value: Expr) -> Self {
        Self { member, value }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Parameter {
        name: String,
        ty: Ty,
    },
    Member {
        target: Box<Expr>,
        member: &'static str,
        ty: Ty,
    },
    Constant {
        value: Literal,
        ty: Ty,
    },
    /// Zero value of a type.
    Default(Ty),
    Not(Box<Expr>),
    Equal(Box<Expr>, Box<Expr>),
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Member-init construction.
    New {
        ty: &'static TypeInfo,
        bindings: Vec<Binding>,
    },
    ListInit {
        element: &'static TypeInfo,
        items: Vec<Expr>,
    },
    /// Method-style call; the receiver, if any, is the first argument.
    Call {
        method: Method,
        args: Vec<Expr>,
        ty: Ty,
    },
    Lambda {
        param: String,
        param_ty: Ty,
        body: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn param(name: impl Into<String>, ty: Ty) -> Self {
        Expr::Parameter {
            name: name.into(),
            ty,
        }
    }

    /// Read `member` from this expression, typed from the target's metadata.
    ///
    /// Returns `None` when the target is not an object or has no such member.
    #[must_use]
    pub fn access(self, member: &str) -> Option<Self> {
        let m = self.ty().object()?.member(member)?;
        Some(Expr::Member {
            target: Box::new(self),
            member: m.name,
            ty: m.ty,
        })
    }

    #[must_use]
    pub fn member(self, member: &'static str, ty: Ty) -> Self {
        Expr::Member {
            target: Box::new(self),
            member,
            ty,
        }
    }

    #[must_use]
    pub fn constant(value: Literal, ty: Ty) -> Self {
        Expr::Constant { value, ty }
    }

    #[must_use]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    #[must_use]
    pub fn equal(self, other: Expr) -> Self {
        Expr::Equal(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn conditional(test: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    #[must_use]
    pub fn new_object(ty: &'static TypeInfo, bindings: Vec<Binding>) -> Self {
        Expr::New { ty, bindings }
    }

    #[must_use]
    pub fn list_init(element: &'static TypeInfo, items: Vec<Expr>) -> Self {
        Expr::ListInit { element, items }
    }

    #[must_use]
    pub fn lambda(param: impl Into<String>, param_ty: Ty, body: Expr) -> Self {
        Expr::Lambda {
            param: param.into(),
            param_ty,
            body: Box::new(body),
        }
    }

    #[must_use]
    pub fn call(method: Method, args: Vec<Expr>, ty: Ty) -> Self {
        Expr::Call { method, args, ty }
    }

    /// `self.Where(predicate)`; keeps the source's type.
    #[must_use]
    pub fn where_(self, predicate: Expr) -> Self {
        let ty = self.ty();
        Expr::call(Method::Where, vec![self, predicate], ty)
    }

    /// `self.Select(selector)`; the element type follows the selector body.
    #[must_use]
    pub fn select(self, selector: Expr) -> Self {
        let ty = match &selector {
            Expr::Lambda { body, .. } => body.ty().object().map_or(Ty::Func, Ty::Seq),
            _ => Ty::Func,
        };
        Expr::call(Method::Select, vec![self, selector], ty)
    }

    #[must_use]
    pub fn to_list(self) -> Self {
        let ty = self.ty().element().map_or(Ty::Func, Ty::List);
        Expr::call(Method::ToList, vec![self], ty)
    }

    /// Static type of this node.
    #[must_use]
    pub fn ty(&self) -> Ty {
        match self {
            Expr::Parameter { ty, .. }
            | Expr::Member { ty, .. }
            | Expr::Constant { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::Default(ty) => *ty,
            Expr::Not(_) | Expr::Equal(..) => Ty::Bool,
            Expr::Conditional { then, .. } => then.ty(),
            Expr::New { ty, .. } => Ty::Object(*ty),
            Expr::ListInit { element, .. } => Ty::List(*element),
            Expr::Lambda { .. } => Ty::Func,
        }
    }

    /// Binding for `member` if this is an object construction.
    #[must_use]
    pub fn binding(&self, member: &str) -> Option<&Binding> {
        match self {
            Expr::New { bindings, .. } => bindings.iter().find(|b| b.member == member),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Parameter { name, .. } => f.write_str(name),
            Expr::Member { target, member, .. } => write!(f, "{target}.{member}"),
            Expr::Constant { value, .. } => write!(f, "{value}"),
            Expr::Default(ty) => write!(f, "default({ty})"),
            Expr::Not(inner) => write!(f, "!{inner}"),
            Expr::Equal(a, b) => write!(f, "({a} == {b})"),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => write!(f, "({test} ? {then} : {otherwise})"),
            Expr::New { ty, bindings } => {
                write!(f, "new {} {{", ty.name)?;
                for (i, b) in bindings.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{} = {}", b.member, b.value)?;
                }
                f.write_str(" }")
            }
            Expr::ListInit { element, items } => {
                write!(f, "new List<{}> {{", element.name)?;
                for (i, item) in items.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{item}")?;
                }
                f.write_str(" }")
            }
            Expr::Call { method, args, .. } => match args.split_first() {
                Some((receiver, rest)) => {
                    write!(f, "{receiver}.{method}(")?;
                    for (i, a) in rest.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    f.write_str(")")
                }
                None => write!(f, "{method}()"),
            },
            Expr::Lambda { param, body, .. } => write!(f, "{param} => {body}"),
        }
    }
}
