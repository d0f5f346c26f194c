use crate::error::Error;
use crate::grad::grad;
use crate::tensor::Tensor;
use crate::var::{eval, Var};
use itertools::Itertools;
use log::debug;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

type Body = dyn Fn(&[Var]) -> Result<Vec<Var>, Error>;

/// A pure function over variables that can be called, traced and
/// transformed. Cloning is cheap.
#[derive(Clone)]
pub struct Function {
    name: String,
    arity: usize,
    body: Rc<Body>,
}

impl Function {
    pub fn new<S, F>(name: S, arity: usize, f: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&[Var]) -> Vec<Var> + 'static,
    {
        Function::fallible(name, arity, move |x| Ok(f(x)))
    }

    fn fallible<S, F>(name: S, arity: usize, f: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&[Var]) -> Result<Vec<Var>, Error> + 'static,
    {
        Function {
            name: name.as_ref().to_string(),
            arity,
            body: Rc::new(f),
        }
    }

    pub fn unary<S, F>(name: S, f: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&Var) -> Var + 'static,
    {
        Function::new(name, 1, move |x| vec![f(&x[0])])
    }

    pub fn binary<S, F>(name: S, f: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&Var, &Var) -> Var + 'static,
    {
        Function::new(name, 2, move |x| vec![f(&x[0], &x[1])])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Applies the function to variables, extending their graph.
    pub fn apply(&self, x: &[Var]) -> Result<Vec<Var>, Error> {
        if x.len() != self.arity {
            return Err(Error::Arity {
                expected: self.arity,
                found: x.len(),
            });
        }
        (self.body)(x)
    }

    /// Applies the function to concrete tensors and evaluates the result.
    pub fn call(&self, x: &[Tensor]) -> Result<Vec<Tensor>, Error> {
        let x = x.iter().map(Var::new).collect_vec();
        eval(&self.apply(&x)?)
    }

    /// The function computing the partial derivatives of this function with
    /// respect to the arguments at `argnums`, one output per argnum.
    ///
    /// This function must have a single, scalar output.
    pub fn grad(&self, argnums: &[usize]) -> Result<Function, Error> {
        self.check_argnums(argnums)?;

        let f = self.clone();
        let argnums = argnums.to_vec();

        debug!("grad({}) w.r.t. {:?}", self.name, argnums);

        Ok(Function::fallible(
            format!("grad({})", self.name),
            self.arity,
            move |x| {
                let y = single_output(f.apply(x)?)?;
                let wrt = argnums.iter().map(|&i| &x[i]).collect_vec();
                grad(&y, &wrt)
            },
        ))
    }

    /// Like [`Function::grad`], with the function value as the first output.
    pub fn value_and_grad(&self, argnums: &[usize]) -> Result<Function, Error> {
        self.check_argnums(argnums)?;

        let f = self.clone();
        let argnums = argnums.to_vec();

        Ok(Function::fallible(
            format!("value_and_grad({})", self.name),
            self.arity,
            move |x| {
                let y = single_output(f.apply(x)?)?;
                let wrt = argnums.iter().map(|&i| &x[i]).collect_vec();
                let mut out = vec![y.clone()];
                out.extend(grad(&y, &wrt)?);
                Ok(out)
            },
        ))
    }

    fn check_argnums(&self, argnums: &[usize]) -> Result<(), Error> {
        if argnums.is_empty() {
            return Err(Error::EmptyArgNums);
        }

        for (i, &argnum) in argnums.iter().enumerate() {
            if argnum >= self.arity {
                return Err(Error::ArgNum {
                    argnum,
                    arity: self.arity,
                });
            }
            if argnums[..i].contains(&argnum) {
                return Err(Error::DuplicateArgNum(argnum));
            }
        }
        Ok(())
    }
}

fn single_output(mut y: Vec<Var>) -> Result<Var, Error> {
    if y.len() != 1 {
        return Err(Error::MultipleOutputs(y.len()));
    }
    Ok(y.remove(0))
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::function::Function;
    use crate::tensor::data::DataType;
    use crate::tensor::Tensor;
    use crate::var::Var;

    fn scalar(val: f64) -> Tensor {
        Tensor::scalar(val, DataType::F32)
    }

    fn poly() -> Function {
        // x^2 * y + y
        Function::binary("poly", |x, y| x.square() * y + y)
    }

    #[test]
    fn test_call() {
        let y = poly().call(&[scalar(3.0), scalar(2.0)]).unwrap();

        assert_eq!(y.len(), 1);
        assert_eq!(y[0].to_scalar().unwrap(), 20.0);
        assert_eq!(format!("{:?}", poly()), "poly/2");
    }

    #[test]
    fn test_call_err_arity() {
        assert_eq!(
            poly().call(&[scalar(3.0)]).expect_err(""),
            Error::Arity {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_grad() {
        let g = poly().grad(&[0, 1]).unwrap();
        let gx = g.call(&[scalar(3.0), scalar(2.0)]).unwrap();

        assert_eq!(g.name(), "grad(poly)");
        assert_eq!(g.arity(), 2);
        // (2xy, x^2 + 1)
        assert_eq!(gx[0].to_scalar().unwrap(), 12.0);
        assert_eq!(gx[1].to_scalar().unwrap(), 10.0);

        let g = poly().grad(&[1]).unwrap();
        let gx = g.call(&[scalar(3.0), scalar(2.0)]).unwrap();
        assert_eq!(gx.len(), 1);
        assert_eq!(gx[0].to_scalar().unwrap(), 10.0);
    }

    #[test]
    fn test_grad_of_grad() {
        let f = Function::unary("cube", |x| x.powi(3));
        let gg = f.grad(&[0]).unwrap().grad(&[0]).unwrap();

        let y = gg.call(&[scalar(2.0)]).unwrap();
        assert_eq!(y[0].to_scalar().unwrap(), 12.0);
    }

    #[test]
    fn test_value_and_grad() {
        let vg = poly().value_and_grad(&[0]).unwrap();
        let y = vg.call(&[scalar(3.0), scalar(2.0)]).unwrap();

        assert_eq!(y.len(), 2);
        assert_eq!(y[0].to_scalar().unwrap(), 20.0);
        assert_eq!(y[1].to_scalar().unwrap(), 12.0);
    }

    #[test]
    fn test_grad_err_argnums() {
        assert_eq!(poly().grad(&[]).expect_err(""), Error::EmptyArgNums);
        assert_eq!(
            poly().grad(&[2]).expect_err(""),
            Error::ArgNum {
                argnum: 2,
                arity: 2
            }
        );
        assert_eq!(
            poly().grad(&[1, 1]).expect_err(""),
            Error::DuplicateArgNum(1)
        );
    }

    #[test]
    fn test_grad_err_outputs() {
        let f = Function::new("pair", 1, |x: &[Var]| vec![x[0].sin(), x[0].cos()]);
        let g = f.grad(&[0]).unwrap();
        assert_eq!(
            g.call(&[scalar(1.0)]).expect_err(""),
            Error::MultipleOutputs(2)
        );

        let v = Function::unary("id", |x| x.clone());
        let g = v.grad(&[0]).unwrap();
        let t = Tensor::zeros([2], DataType::F32);
        assert_eq!(g.call(&[t]).expect_err(""), Error::NonScalarOutput(vec![2]));
    }
}
