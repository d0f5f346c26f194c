use crate::error::Error;
use crate::function::Function;
use crate::ir::Jaxpr;
use crate::tensor::{Tensor, TensorDesc};
use crate::var::Var;
use itertools::Itertools;
use log::debug;

/// Traces `f` on the types of `args` into a [`Jaxpr`].
///
/// Only the types are read; the values of `args` never enter the trace.
pub fn make_jaxpr(f: &Function, args: &[Tensor]) -> Result<Jaxpr, Error> {
    let descs = args.iter().map(|t| t.desc().clone()).collect_vec();
    make_jaxpr_abstract(f, &descs)
}

pub fn make_jaxpr_abstract(f: &Function, args: &[TensorDesc]) -> Result<Jaxpr, Error> {
    debug!(
        "tracing {} on ({})",
        f.name(),
        args.iter().map(|d| d.to_string()).join(", ")
    );

    let x = args.iter().cloned().map(Var::placeholder).collect_vec();
    let y = f.apply(&x)?;

    Jaxpr::from_graph(&x, &y)
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::function::Function;
    use crate::tensor::data::DataType;
    use crate::tensor::{Tensor, TensorDesc};
    use crate::trace::{make_jaxpr, make_jaxpr_abstract};

    fn scalar(val: f64) -> Tensor {
        Tensor::scalar(val, DataType::F32)
    }

    #[test]
    fn test_values_do_not_matter() {
        let f = Function::binary("f", |x, y| x * y.sin());

        let j1 = make_jaxpr(&f, &[scalar(1.0), scalar(2.0)]).unwrap();
        let j2 = make_jaxpr(&f, &[scalar(-7.0), scalar(0.5)]).unwrap();
        assert_eq!(j1.to_string(), j2.to_string());
    }

    #[test]
    fn test_types_matter() {
        let f = Function::unary("f", |x| x.exp() * 2.0);

        let j = make_jaxpr_abstract(&f, &[TensorDesc::new([2, 2], DataType::F64)]).unwrap();
        assert_eq!(
            j.to_string(),
            "{ lambda ; a:f64[2,2]. let\n    \
             b:f64[2,2] = exp a\n    \
             c:f64[2,2] = mul b 2.0\n  \
             in (c,) }"
        );
    }

    #[test]
    fn test_closure_consts() {
        let w = Tensor::new([2], &[1.0, 2.0], DataType::F32).unwrap();
        let f = Function::unary("f", move |x| x + &w);

        let x = Tensor::new([2], &[3.0, 4.0], DataType::F32).unwrap();
        let j = make_jaxpr(&f, &[x.clone()]).unwrap();

        assert_eq!(
            j.to_string(),
            "{ lambda a:f32[2] ; b:f32[2]. let\n    \
             c:f32[2] = add b a\n  \
             in (c,) }"
        );
        assert_eq!(j.eval(&[x]).unwrap()[0].to_vec(), vec![4.0, 6.0]);
    }

    #[test]
    fn test_grad_trace() {
        let f = Function::unary("f", |x| x.sin());
        let g = f.grad(&[0]).unwrap();

        let j = make_jaxpr(&g, &[scalar(0.3)]).unwrap();
        assert_eq!(
            j.to_string(),
            "{ lambda ; a:f32[]. let\n    \
             b:f32[] = cos a\n    \
             c:f32[] = mul 1.0 b\n  \
             in (c,) }"
        );
    }

    #[test]
    fn test_arity() {
        let f = Function::unary("f", |x| x.sin());
        assert_eq!(
            make_jaxpr(&f, &[scalar(1.0), scalar(2.0)]).err(),
            Some(Error::Arity {
                expected: 1,
                found: 2
            })
        );
    }
}
