//! Reverse-mode differentiation over [`Var`] graphs.
//!
//! Gradients are themselves graphs, built from the gradient rules of each
//! operator, so they can be evaluated, differentiated again, or traced.

use crate::error::Error;
use crate::shape::ShapeError;
use crate::tensor::Tensor;
use crate::var::{Ranked, Var};
use log::{debug, trace};
use std::collections::binary_heap::BinaryHeap;
use std::collections::HashMap;

/// Differentiates the scalar `y` with respect to each of `x`.
pub fn grad(y: &Var, x: &[&Var]) -> Result<Vec<Var>, Error> {
    if y.rank() != 0 {
        return Err(Error::NonScalarOutput(y.extents().to_vec()));
    }

    // The 'genesis' gy/gy, (which always equals to 1)
    let gy = Var::literal(1.0, y.data_type());
    vjp(y, &gy, x)
}

/// Pulls the cotangent `gy` of `y` back to each of `x`.
///
/// Variables that `y` does not depend on receive zeros.
pub fn vjp(y: &Var, gy: &Var, x: &[&Var]) -> Result<Vec<Var>, Error> {
    let mut queue = BinaryHeap::<Ranked<Var>>::new();
    let mut grads = HashMap::<Var, Var>::new();

    grads.insert(y.clone(), gy.clone());
    queue.push(Ranked::new(y.clone(), y.t_order()));

    while let Some(ranked) = queue.pop() {
        let y = ranked.into_inner();

        let op = match y.op() {
            Some(op) => op,
            None => continue,
        };

        let gy = grads[&y].clone();
        let gx = op.grad(&y, &gy);

        trace!("backprop through {}", op.opr().primitive());

        // insert (x, gx) pairs into grads hashmap
        for (x, gx) in op.input().iter().zip(gx.into_iter()) {
            // skip non-differentiable variables.
            let gx = match gx {
                Some(gx) if !x.is_literal() => gx,
                _ => continue,
            };

            if gx.extents() != x.extents() {
                let e = ShapeError::Mismatch(x.extents().to_vec(), gx.extents().to_vec());
                return Err(e.into());
            }

            if !grads.contains_key(x) {
                queue.push(Ranked::new(x.clone(), x.t_order()))
            }
            grads
                .entry(x.clone())
                .and_modify(|v| *v = &gx + &*v)
                .or_insert_with(|| gx);
        }
    }

    debug!("computed {} gradient node(s)", grads.len());

    let mut grads_retained = Vec::with_capacity(x.len());
    for v in x {
        let gx = match grads.get(*v) {
            Some(gx) => gx.clone(),
            None => zeros_like(v),
        };
        grads_retained.push(gx);
    }

    Ok(grads_retained)
}

fn zeros_like(x: &Var) -> Var {
    if x.rank() == 0 {
        Var::literal(0.0, x.data_type())
    } else {
        Var::new(Tensor::zeros(x.extents(), x.data_type()))
    }
}

/** Gradient checking using numerical gradient by finite differences.
 **/
pub fn grad_check(y: &Var, x: &Var, err: f64) -> Result<bool, Error> {
    let ones = Var::new(Tensor::full(y.extents(), 1.0, y.data_type()));
    let gx_gt = vjp(y, &ones, &[x])?.remove(0).eval()?.to_vec();

    let d = x.eval()?;
    let eps = 1e-4;

    let mut b = d.to_vec();
    for (i, val_gt) in gx_gt.into_iter().enumerate() {
        let val = b[i];

        // + eps
        b[i] = val + eps;
        let y1 = y.eval_with(x, Tensor::new(d.extents(), &b, d.data_type())?)?;

        // -eps
        b[i] = val - eps;
        let y2 = y.eval_with(x, Tensor::new(d.extents(), &b, d.data_type())?)?;

        b[i] = val;

        let gx = y1
            .to_vec()
            .iter()
            .zip(y2.to_vec().iter())
            .map(|(v1, v2)| v1 - v2)
            .sum::<f64>()
            / (2.0 * eps);

        debug!("{} vs {}", val_gt, gx);

        if (val_gt - gx).abs() > err {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::grad::{grad, grad_check};
    use crate::tensor::data::DataType;
    use crate::tensor::{Tensor, TensorDesc};
    use crate::var::Var;
    use rand::Rng;

    fn scalar(val: f64) -> Var {
        Var::new(Tensor::scalar(val, DataType::F64))
    }

    #[test]
    fn test_grad_square_plus() {
        let x = scalar(1.0);
        let y = scalar(4.0);
        let z = x.powi(2) + &y;

        let g = grad(&z, &[&x, &y]).unwrap();

        assert_eq!(g[0].eval().unwrap().to_scalar().unwrap(), 2.0);
        assert_eq!(g[1].eval().unwrap().to_scalar().unwrap(), 1.0);
        assert!(g[1].is_literal());
    }

    #[test]
    fn test_grad_accumulates() {
        // y = x * x + x  =>  dy/dx = 2x + 1
        let x = scalar(3.0);
        let y = &x * &x + &x;

        let gx = x.grad(&y).unwrap();
        assert_eq!(gx.eval().unwrap().to_scalar().unwrap(), 7.0);
    }

    #[test]
    fn test_grad_unrelated() {
        let x = scalar(3.0);
        let w = Var::new(Tensor::zeros([2], DataType::F32));
        let s = scalar(5.0);
        let y = x.sin();

        let g = grad(&y, &[&s, &w]).unwrap();
        assert_eq!(g[0].literal_value(), Some(0.0));
        assert_eq!(g[1].eval().unwrap().to_vec(), vec![0.0, 0.0]);
        assert_eq!(g[1].data_type(), DataType::F32);
    }

    #[test]
    fn test_grad_second_order() {
        // d2/dx2 x^3 = 6x
        let x = scalar(2.0);
        let y = x.powi(3);

        let gx = x.grad(&y).unwrap();
        let ggx = x.grad(&gx).unwrap();
        assert_eq!(ggx.eval().unwrap().to_scalar().unwrap(), 12.0);
    }

    #[test]
    fn test_grad_abstract() {
        let x = Var::placeholder(TensorDesc::scalar(DataType::F32));
        let y = x.exp();

        let gx = x.grad(&y).unwrap();
        assert!(gx.is_op());
        assert_eq!(gx.eval().expect_err(""), Error::Abstract);
    }

    #[test]
    fn test_grad_err_non_scalar() {
        let x = Var::new(Tensor::zeros([3], DataType::F32));
        let y = x.sin();

        assert_eq!(grad(&y, &[&x]).expect_err(""), Error::NonScalarOutput(vec![3]));
    }

    #[test]
    fn test_grad_check_random() {
        let mut rng = rand::thread_rng();

        for _ in 0..10 {
            let x = scalar(rng.gen_range(0.1..3.0));
            let w = scalar(rng.gen_range(-2.0..2.0));

            let y = (&x * &w).sin() + x.log() / &w.exp() - x.powi(3);
            assert!(grad_check(&y, &x, 0.01).unwrap());
            assert!(grad_check(&y, &w, 0.01).unwrap());
        }
    }
}
