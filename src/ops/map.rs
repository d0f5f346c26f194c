use crate::error::Error;
use crate::ops::NaryOperator;
use crate::shape;
use crate::shape::ShapeError;
use crate::tensor::data::{Map1, Map2};
use crate::tensor::{Tensor, TensorDesc};
use crate::var::{Var, Variable};
use num_traits::Float;
use std::ops;

#[derive(Clone, Debug)]
pub struct UnaryMapOperator {
    pub input: [TensorDesc; 1],
    pub output: TensorDesc,
    pub map: UnaryMap,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnaryMap {
    Neg,
    Sin,
    Cos,
    Exp,
    Log,
    // x^n for a fixed integer n
    IntegerPow(i32),
}

#[derive(Clone, Debug)]
pub struct BinaryMapOperator {
    pub input: [TensorDesc; 2],
    pub output: TensorDesc,
    pub map: BinaryMap,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BinaryMap {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Map1 for UnaryMap {
    fn apply<T: Float>(&self, x: T) -> T {
        match self {
            UnaryMap::Neg => -x,
            UnaryMap::Sin => x.sin(),
            UnaryMap::Cos => x.cos(),
            UnaryMap::Exp => x.exp(),
            UnaryMap::Log => x.ln(),
            UnaryMap::IntegerPow(n) => x.powi(*n),
        }
    }
}

impl Map2 for BinaryMap {
    fn apply<T: Float>(&self, x0: T, x1: T) -> T {
        match self {
            BinaryMap::Add => x0 + x1,
            BinaryMap::Sub => x0 - x1,
            BinaryMap::Mul => x0 * x1,
            BinaryMap::Div => x0 / x1,
            BinaryMap::Pow => x0.powf(x1),
        }
    }
}

impl NaryOperator<1> for UnaryMapOperator {
    fn input(&self) -> &[TensorDesc; 1] {
        &self.input
    }

    fn output(&self) -> &TensorDesc {
        &self.output
    }

    fn grad(&self, x: [&Var; 1], y: &Var, gy: &Var) -> [Option<Var>; 1] {
        let x = x[0];

        let gx = match self.map {
            UnaryMap::Neg => Some(-gy),
            UnaryMap::Sin => Some(gy * x.cos()),
            UnaryMap::Cos => Some(gy * -x.sin()),
            UnaryMap::Exp => Some(gy * y),
            UnaryMap::Log => Some(gy / x),
            UnaryMap::IntegerPow(0) => None,
            UnaryMap::IntegerPow(n) => {
                // x^(n-1) is x^n / x when n - 1 underflows i32
                let dx = match n.checked_sub(1) {
                    Some(m) => x.powi(m),
                    None => x.powi(n) / x,
                };
                Some(gy * (n as f64 * dx))
            }
        };
        [gx]
    }

    fn compute(&self, x: [&Tensor; 1]) -> Result<Tensor, Error> {
        let data = x[0].data().map(self.map);
        Ok(Tensor::from_host(self.output.clone(), data))
    }

    fn primitive(&self) -> &'static str {
        match self.map {
            UnaryMap::Neg => "neg",
            UnaryMap::Sin => "sin",
            UnaryMap::Cos => "cos",
            UnaryMap::Exp => "exp",
            UnaryMap::Log => "log",
            UnaryMap::IntegerPow(_) => "integer_pow",
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match self.map {
            UnaryMap::IntegerPow(n) => vec![("y", n.to_string())],
            _ => Vec::new(),
        }
    }
}

impl NaryOperator<2> for BinaryMapOperator {
    fn input(&self) -> &[TensorDesc; 2] {
        &self.input
    }

    fn output(&self) -> &TensorDesc {
        &self.output
    }

    fn grad(&self, x: [&Var; 2], y: &Var, gy: &Var) -> [Option<Var>; 2] {
        match self.map {
            BinaryMap::Add => [Some(gy.clone()), Some(gy.clone())],
            BinaryMap::Sub => [Some(gy.clone()), Some(-gy)],
            BinaryMap::Mul => [Some(gy * x[1]), Some(gy * x[0])],
            BinaryMap::Div => [Some(gy / x[1]), Some(gy * (-x[0] / x[1].square()))],
            BinaryMap::Pow => [
                Some(gy * x[1] * x[0].pow(x[1] - 1.0)),
                Some(gy * y * x[0].log()),
            ],
        }
    }

    fn compute(&self, x: [&Tensor; 2]) -> Result<Tensor, Error> {
        let data = x[0]
            .data()
            .zip_map(x[1].data(), self.map)
            .ok_or(Error::DataType {
                expected: x[0].data_type(),
                found: x[1].data_type(),
            })?;

        Ok(Tensor::from_host(self.output.clone(), data))
    }

    fn primitive(&self) -> &'static str {
        match self.map {
            BinaryMap::Add => "add",
            BinaryMap::Sub => "sub",
            BinaryMap::Mul => "mul",
            BinaryMap::Div => "div",
            BinaryMap::Pow => "pow",
        }
    }
}

pub fn unary_map<V>(x: V, map: UnaryMap) -> Var
where
    V: Variable,
{
    let x = x.into_var();

    Var::from_unary_op(
        UnaryMapOperator {
            input: [x.desc().clone()],
            output: x.desc().clone(),
            map,
        },
        x,
    )
}

/// Checked elementwise combination of two variables.
///
/// A weak literal takes the type of the other operand. Rank-0 literals combine
/// with operands of any extents; other operands must agree in extents and type.
pub fn try_binary_map<V1, V2>(x1: V1, x2: V2, map: BinaryMap) -> Result<Var, Error>
where
    V1: Variable,
    V2: Variable,
{
    let mut x1 = x1.into_var();
    let mut x2 = x2.into_var();

    if x1.is_weak() && !x2.is_weak() {
        x1 = Var::literal(x1.literal_value().unwrap_or_default(), x2.data_type());
    }
    if x2.is_weak() && !x1.is_weak() {
        x2 = Var::literal(x2.literal_value().unwrap_or_default(), x1.data_type());
    }

    if x1.data_type() != x2.data_type() {
        return Err(Error::DataType {
            expected: x1.data_type(),
            found: x2.data_type(),
        });
    }

    let extents = if x1.is_literal() || x2.is_literal() {
        shape::union(x1.extents(), x2.extents())?
    } else if x1.extents() == x2.extents() {
        x1.extents().into()
    } else {
        return Err(ShapeError::Mismatch(x1.extents().to_vec(), x2.extents().to_vec()).into());
    };

    Ok(Var::from_binary_op(
        BinaryMapOperator {
            input: [x1.desc().clone(), x2.desc().clone()],
            output: TensorDesc::new(extents, x1.data_type()),
            map,
        },
        x1,
        x2,
    ))
}

/// Like [`try_binary_map`], but an invalid combination aborts.
pub fn binary_map<V1, V2>(x1: V1, x2: V2, map: BinaryMap) -> Var
where
    V1: Variable,
    V2: Variable,
{
    match try_binary_map(x1, x2, map) {
        Ok(y) => y,
        Err(e) => panic!("invalid operands for {:?}: {}", map, e),
    }
}

////// Unary ops

pub fn neg<V>(x: V) -> Var
where
    V: Variable,
{
    unary_map(x, UnaryMap::Neg)
}

pub fn sin<V>(x: V) -> Var
where
    V: Variable,
{
    unary_map(x, UnaryMap::Sin)
}

pub fn cos<V>(x: V) -> Var
where
    V: Variable,
{
    unary_map(x, UnaryMap::Cos)
}

pub fn exp<V>(x: V) -> Var
where
    V: Variable,
{
    unary_map(x, UnaryMap::Exp)
}

pub fn log<V>(x: V) -> Var
where
    V: Variable,
{
    unary_map(x, UnaryMap::Log)
}

pub fn integer_pow<V>(x: V, n: i32) -> Var
where
    V: Variable,
{
    unary_map(x, UnaryMap::IntegerPow(n))
}

// binary maps

pub fn add<V1, V2>(x1: V1, x2: V2) -> Var
where
    V1: Variable,
    V2: Variable,
{
    binary_map(x1, x2, BinaryMap::Add)
}

pub fn sub<V1, V2>(x1: V1, x2: V2) -> Var
where
    V1: Variable,
    V2: Variable,
{
    binary_map(x1, x2, BinaryMap::Sub)
}

pub fn mul<V1, V2>(x1: V1, x2: V2) -> Var
where
    V1: Variable,
    V2: Variable,
{
    binary_map(x1, x2, BinaryMap::Mul)
}

pub fn div<V1, V2>(x1: V1, x2: V2) -> Var
where
    V1: Variable,
    V2: Variable,
{
    binary_map(x1, x2, BinaryMap::Div)
}

pub fn pow<V1, V2>(x1: V1, x2: V2) -> Var
where
    V1: Variable,
    V2: Variable,
{
    binary_map(x1, x2, BinaryMap::Pow)
}

// Operator overloading for Var, &Var and float scalars on the left.

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $func:ident) => {
        impl<T> ops::$trait<T> for Var
        where
            T: Variable,
        {
            type Output = Var;
            fn $method(self, x: T) -> Self::Output {
                $func(self, x)
            }
        }

        impl<T> ops::$trait<T> for &Var
        where
            T: Variable,
        {
            type Output = Var;
            fn $method(self, x: T) -> Self::Output {
                $func(self, x)
            }
        }

        impl ops::$trait<Var> for f64 {
            type Output = Var;
            fn $method(self, x: Var) -> Self::Output {
                $func(self, x)
            }
        }

        impl ops::$trait<&Var> for f64 {
            type Output = Var;
            fn $method(self, x: &Var) -> Self::Output {
                $func(self, x)
            }
        }

        impl ops::$trait<Var> for f32 {
            type Output = Var;
            fn $method(self, x: Var) -> Self::Output {
                $func(self, x)
            }
        }

        impl ops::$trait<&Var> for f32 {
            type Output = Var;
            fn $method(self, x: &Var) -> Self::Output {
                $func(self, x)
            }
        }
    };
}

impl_binary_op!(Add, add, add);
impl_binary_op!(Sub, sub, sub);
impl_binary_op!(Mul, mul, mul);
impl_binary_op!(Div, div, div);

impl ops::Neg for Var {
    type Output = Var;
    fn neg(self) -> Self::Output {
        neg(self)
    }
}

impl ops::Neg for &Var {
    type Output = Var;
    fn neg(self) -> Self::Output {
        neg(self)
    }
}
