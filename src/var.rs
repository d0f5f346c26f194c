use crate::error::Error;
use crate::grad::grad;
use crate::ops;
use crate::ops::{NaryOperator, Operation};
use crate::tensor::data::DataType;
use crate::tensor::{Tensor, TensorDesc};
use core::fmt;
use log::trace;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

pub enum Origin {
    Operation(Operation),
    // Concrete input
    Data(Tensor),
    // Placeholder carrying only a type, used while tracing
    Abstract,
    // Scalar constant inlined into the IR. A weak literal has no type of its
    // own and takes the type of the operand it is combined with.
    Literal { value: f64, weak: bool },
}

/// Node of a lazily built computation graph.
#[derive(Clone)]
pub struct Var {
    desc: TensorDesc,
    origin: Rc<Origin>,
}

impl Var {
    // ******************************** Constructors ******************************** //

    pub fn new<T>(data: T) -> Self
    where
        T: AsRef<Tensor>,
    {
        let data = data.as_ref().clone();

        Var {
            desc: data.desc().clone(),
            origin: Rc::new(Origin::Data(data)),
        }
    }

    pub fn placeholder(desc: TensorDesc) -> Self {
        Var {
            desc,
            origin: Rc::new(Origin::Abstract),
        }
    }

    pub fn literal(value: f64, data_type: DataType) -> Self {
        Var {
            desc: TensorDesc::scalar(data_type),
            origin: Rc::new(Origin::Literal {
                value: data_type.round(value),
                weak: false,
            }),
        }
    }

    pub(crate) fn weak_literal(value: f64) -> Self {
        Var {
            desc: TensorDesc::scalar(DataType::F32),
            origin: Rc::new(Origin::Literal { value, weak: true }),
        }
    }

    pub fn from_unary_op<O>(opr: O, x: Var) -> Self
    where
        O: NaryOperator<1> + 'static,
    {
        Var {
            desc: opr.output().clone(),
            origin: Rc::new(Origin::Operation(Operation::unary(opr, x))),
        }
    }

    pub fn from_binary_op<O>(opr: O, x1: Var, x2: Var) -> Self
    where
        O: NaryOperator<2> + 'static,
    {
        Var {
            desc: opr.output().clone(),
            origin: Rc::new(Origin::Operation(Operation::binary(opr, x1, x2))),
        }
    }

    // ******************************** Properties ******************************** //

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn extents(&self) -> &[usize] {
        self.desc.extents()
    }

    pub fn rank(&self) -> usize {
        self.desc.rank()
    }

    pub fn size(&self) -> usize {
        self.desc.size()
    }

    pub fn data_type(&self) -> DataType {
        self.desc.data_type()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn op(&self) -> Option<&Operation> {
        if let Origin::Operation(op) = self.origin.as_ref() {
            return Some(op);
        }
        None
    }

    pub fn data(&self) -> Option<&Tensor> {
        if let Origin::Data(t) = self.origin.as_ref() {
            return Some(t);
        }
        None
    }

    pub fn literal_value(&self) -> Option<f64> {
        if let Origin::Literal { value, .. } = self.origin.as_ref() {
            return Some(*value);
        }
        None
    }

    pub fn is_op(&self) -> bool {
        self.op().is_some()
    }

    pub fn is_data(&self) -> bool {
        self.data().is_some()
    }

    pub fn is_literal(&self) -> bool {
        self.literal_value().is_some()
    }

    pub fn is_weak(&self) -> bool {
        matches!(self.origin.as_ref(), Origin::Literal { weak: true, .. })
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.origin.as_ref(), Origin::Abstract)
    }

    pub fn t_order(&self) -> usize {
        match self.op() {
            Some(op) => op.t_order(),
            None => 0,
        }
    }

    // ******************************** grad ******************************** //

    /// Gradient of the scalar `y` with respect to this variable.
    pub fn grad(&self, y: &Var) -> Result<Var, Error> {
        let mut gx = grad(y, &[self])?;
        Ok(gx.remove(0))
    }

    // ******************************** Data ******************************** //

    pub fn eval(&self) -> Result<Tensor, Error> {
        let mut y = eval(core::slice::from_ref(self))?;
        Ok(y.remove(0))
    }

    /// Evaluates with `x` replaced by `data`.
    pub fn eval_with(&self, x: &Var, data: Tensor) -> Result<Tensor, Error> {
        if data.desc() != x.desc() {
            return Err(Error::Signature {
                index: 0,
                expected: x.desc().clone(),
                found: data.desc().clone(),
            });
        }

        let mut y = eval_in(core::slice::from_ref(self), HashMap::from([(x.clone(), data)]))?;
        Ok(y.remove(0))
    }

    // ******************************** Core Utilities ******************************** //

    pub fn neg(&self) -> Var {
        ops::map::neg(self)
    }

    pub fn sin(&self) -> Var {
        ops::map::sin(self)
    }

    pub fn cos(&self) -> Var {
        ops::map::cos(self)
    }

    pub fn exp(&self) -> Var {
        ops::map::exp(self)
    }

    pub fn log(&self) -> Var {
        ops::map::log(self)
    }

    pub fn powi(&self, n: i32) -> Var {
        ops::map::integer_pow(self, n)
    }

    pub fn square(&self) -> Var {
        ops::map::integer_pow(self, 2)
    }

    pub fn pow<V>(&self, x: V) -> Var
    where
        V: Variable,
    {
        ops::map::pow(self, x)
    }
}

/// Evaluates several variables at once, sharing their common subgraphs.
pub fn eval(vars: &[Var]) -> Result<Vec<Tensor>, Error> {
    eval_in(vars, HashMap::new())
}

// `data` holds values already known, which take precedence over the graph.
fn eval_in(vars: &[Var], mut data: HashMap<Var, Tensor>) -> Result<Vec<Tensor>, Error> {
    for v in topological_order(vars) {
        if data.contains_key(&v) {
            continue;
        }

        let t = match v.origin() {
            Origin::Data(t) => t.clone(),
            Origin::Literal { value, .. } => Tensor::scalar(*value, v.data_type()),
            Origin::Abstract => return Err(Error::Abstract),
            Origin::Operation(op) => {
                let x = op.input().iter().map(|x| data[x].clone()).collect::<Vec<_>>();
                let y = op.opr().compute(&x)?;
                trace!("{} -> {:?}", op.opr().primitive(), y);
                y
            }
        };
        data.insert(v, t);
    }

    Ok(vars.iter().map(|v| data[v].clone()).collect())
}

/// Nodes reachable from `vars`, every node after all of its inputs. Inputs
/// are visited left to right, so the order is stable for a given graph.
pub fn topological_order(vars: &[Var]) -> Vec<Var> {
    let mut visited = HashSet::<Var>::new();
    let mut order = Vec::new();

    // (node, inputs already pushed)
    let mut stack = vars.iter().rev().map(|v| (v.clone(), false)).collect::<Vec<_>>();

    while let Some((v, expanded)) = stack.pop() {
        if expanded {
            order.push(v);
            continue;
        }
        if !visited.insert(v.clone()) {
            continue;
        }
        stack.push((v.clone(), true));

        if let Some(op) = v.op() {
            for x in op.input().iter().rev() {
                if !visited.contains(x) {
                    stack.push((x.clone(), false));
                }
            }
        }
    }
    order
}

impl Eq for Var {}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.origin, &other.origin)
    }
}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.origin).hash(state);
    }
}

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let origin = match self.origin.as_ref() {
            Origin::Operation(opr) => format!("{:?}", opr),
            Origin::Data(_) => "data".to_string(),
            Origin::Abstract => "abstract".to_string(),
            Origin::Literal { value, .. } => format!("literal({})", value),
        };

        write!(f, "{} -> {:?}", origin, &self.desc)
    }
}

pub struct Ranked<T> {
    inner: T,
    rank: usize,
}

impl<T> Ranked<T> {
    pub fn new(inner: T, rank: usize) -> Self {
        Ranked { inner, rank }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank.cmp(&other.rank)
    }
}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub trait Variable {
    fn into_var(self) -> Var;
}

impl Variable for Var {
    fn into_var(self) -> Var {
        self
    }
}

impl Variable for &Var {
    fn into_var(self) -> Var {
        (*self).clone()
    }
}

impl Variable for Tensor {
    fn into_var(self) -> Var {
        Var::new(self)
    }
}

impl Variable for &Tensor {
    fn into_var(self) -> Var {
        Var::new(self)
    }
}

impl Variable for f32 {
    fn into_var(self) -> Var {
        Var::weak_literal(self as f64)
    }
}

impl Variable for f64 {
    fn into_var(self) -> Var {
        Var::weak_literal(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::tensor::data::DataType;
    use crate::tensor::{Tensor, TensorDesc};
    use crate::var::{eval, topological_order, Ranked, Var};
    use std::collections::BinaryHeap;

    #[test]
    fn test_identity() {
        let x = Var::new(Tensor::scalar(1.0, DataType::F32));
        let x2 = x.clone();
        let y = Var::new(Tensor::scalar(1.0, DataType::F32));

        assert_eq!(x, x2);
        assert_ne!(x, y);

        assert!(x.is_data());
        assert!(!(&x + &y).is_data());
        assert!(!Var::literal(1.0, DataType::F32).is_data());
    }

    #[test]
    fn test_ranked() {
        let r = Ranked::new("a", 3);
        assert!(r == r);
        assert!(Ranked::new("a", 1) == Ranked::new("b", 1));
        assert!(Ranked::new("a", 1) < Ranked::new("b", 2));

        let mut heap = BinaryHeap::new();
        heap.push(Ranked::new("low", 1));
        heap.push(Ranked::new("high", 5));
        heap.push(Ranked::new("mid", 3));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(Ranked::into_inner)).collect();
        assert_eq!(order, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_eval_literal() {
        let x = Var::literal(0.1, DataType::F32);

        assert!(x.is_literal());
        assert!(!x.is_weak());
        assert_eq!(x.literal_value(), Some(0.1_f32 as f64));
        assert_eq!(x.eval().unwrap().to_scalar().unwrap(), 0.1_f32 as f64);
    }

    #[test]
    fn test_eval_abstract() {
        let x = Var::placeholder(TensorDesc::scalar(DataType::F32));
        let y = &x + 1.0;

        assert!(x.is_abstract());
        assert_eq!(y.eval().expect_err(""), Error::Abstract);
    }

    #[test]
    fn test_eval_shared() {
        let x = Var::new(Tensor::scalar(3.0, DataType::F64));
        let s = &x * &x;
        let y1 = &s + 1.0;
        let y2 = &s - &x;

        let t = eval(&[y1, y2]).unwrap();
        assert_eq!(t[0].to_scalar().unwrap(), 10.0);
        assert_eq!(t[1].to_scalar().unwrap(), 6.0);
    }

    #[test]
    fn test_eval_with() {
        let x = Var::placeholder(TensorDesc::new([2], DataType::F32));
        let y = &x * 3.0;

        let t = Tensor::new([2], &[1.0, 2.0], DataType::F32).unwrap();
        assert_eq!(y.eval_with(&x, t).unwrap().to_vec(), vec![3.0, 6.0]);

        let t = Tensor::new([2], &[1.0, 2.0], DataType::F64).unwrap();
        assert!(matches!(y.eval_with(&x, t), Err(Error::Signature { .. })));
    }

    #[test]
    fn test_t_order() {
        let x = Var::new(Tensor::scalar(3.0, DataType::F32));
        let y = (&x * 2.0).sin();

        assert_eq!(x.t_order(), 0);
        assert_eq!(y.t_order(), 2);
    }

    #[test]
    fn test_topological_order() {
        let a = Var::placeholder(TensorDesc::scalar(DataType::F32));
        let b = Var::placeholder(TensorDesc::scalar(DataType::F32));
        let c = a.square();
        let d = &c + &b;
        let e = &d * &c;

        let order = topological_order(&[e.clone()]);
        assert_eq!(order, vec![a, c, b, d, e]);
    }
}
