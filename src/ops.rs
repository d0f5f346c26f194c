pub mod map;

use crate::error::Error;
use crate::tensor::{Tensor, TensorDesc};
use crate::var::Var;
use smallvec::{smallvec, SmallVec};
use std::cmp;
use std::fmt::{Debug, Formatter};

/// A primitive with `N` inputs. Knows how to compute itself on host tensors
/// and how to express its gradient as new graph nodes.
pub trait NaryOperator<const N: usize>: Debug {
    fn input(&self) -> &[TensorDesc; N];
    fn output(&self) -> &TensorDesc;

    fn grad(&self, x: [&Var; N], y: &Var, gy: &Var) -> [Option<Var>; N];
    fn compute(&self, x: [&Tensor; N]) -> Result<Tensor, Error>;

    // Name used in the printed IR
    fn primitive(&self) -> &'static str;

    fn params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

pub enum Operator {
    Unary(Box<dyn NaryOperator<1>>),
    Binary(Box<dyn NaryOperator<2>>),
}

impl Operator {
    pub fn compute(&self, x: &[Tensor]) -> Result<Tensor, Error> {
        if x.len() != self.arity() {
            return Err(Error::Arity {
                expected: self.arity(),
                found: x.len(),
            });
        }

        for (xi, desc) in x.iter().zip(self.input().iter()) {
            // only types are checked; rank-0 literals stand in for any extents
            if xi.data_type() != desc.data_type() {
                return Err(Error::DataType {
                    expected: desc.data_type(),
                    found: xi.data_type(),
                });
            }
        }

        match self {
            Operator::Unary(opr) => opr.compute([&x[0]]),
            Operator::Binary(opr) => opr.compute([&x[0], &x[1]]),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Operator::Unary(_) => 1,
            Operator::Binary(_) => 2,
        }
    }

    pub fn input(&self) -> &[TensorDesc] {
        match self {
            Operator::Unary(opr) => opr.input(),
            Operator::Binary(opr) => opr.input(),
        }
    }

    pub fn output(&self) -> &TensorDesc {
        match self {
            Operator::Unary(opr) => opr.output(),
            Operator::Binary(opr) => opr.output(),
        }
    }

    pub fn primitive(&self) -> &'static str {
        match self {
            Operator::Unary(opr) => opr.primitive(),
            Operator::Binary(opr) => opr.primitive(),
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Operator::Unary(opr) => opr.params(),
            Operator::Binary(opr) => opr.params(),
        }
    }
}

impl Debug for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Unary(opr) => write!(f, "unary.{:?}", opr),
            Operator::Binary(opr) => write!(f, "binary.{:?}", opr),
        }
    }
}

pub struct Operation {
    opr: Operator,
    t_order: usize,
    x: SmallVec<[Var; 2]>,
}

impl Operation {
    pub fn unary<O>(opr: O, x: Var) -> Self
    where
        O: NaryOperator<1> + 'static,
    {
        Operation {
            opr: Operator::Unary(Box::new(opr)),
            t_order: x.t_order() + 1,
            x: smallvec![x],
        }
    }

    pub fn binary<O>(opr: O, x1: Var, x2: Var) -> Self
    where
        O: NaryOperator<2> + 'static,
    {
        Operation {
            opr: Operator::Binary(Box::new(opr)),
            t_order: cmp::max(x1.t_order(), x2.t_order()) + 1,
            x: smallvec![x1, x2],
        }
    }

    pub fn t_order(&self) -> usize {
        self.t_order
    }

    pub fn input(&self) -> &[Var] {
        &self.x
    }

    pub fn opr(&self) -> &Operator {
        &self.opr
    }

    pub fn grad(&self, y: &Var, gy: &Var) -> Vec<Option<Var>> {
        match &self.opr {
            Operator::Unary(opr) => opr.grad([&self.x[0]], y, gy).to_vec(),
            Operator::Binary(opr) => opr.grad([&self.x[0], &self.x[1]], y, gy).to_vec(),
        }
    }
}

impl Debug for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.opr)
    }
}
