use sage_trace::error::Error;
use sage_trace::function::Function;
use sage_trace::tensor::data::DataType;
use sage_trace::tensor::Tensor;
use sage_trace::trace::make_jaxpr;
use sage_trace::var::Var;

fn simple_function(x: &Var, y: &Var) -> Var {
    x.powi(2) + y
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let f = Function::binary("simple_function", simple_function);

    let x = Tensor::scalar(1.0, DataType::F32);
    let y = Tensor::scalar(4.0, DataType::F32);

    let _z = f.call(&[x.clone(), y.clone()])?;

    // Show z's computation graph
    println!("{}", make_jaxpr(&f, &[x.clone(), y.clone()])?);

    // Show how the gradient is computed
    println!("\nGradient computation (w.r.t. x):");
    println!("{}", make_jaxpr(&f.grad(&[0, 1])?, &[x, y])?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::simple_function;
    use sage_trace::function::Function;
    use sage_trace::tensor::data::DataType;
    use sage_trace::tensor::Tensor;
    use sage_trace::trace::make_jaxpr;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn f() -> Function {
        Function::binary("simple_function", simple_function)
    }

    fn args(x: f64, y: f64) -> [Tensor; 2] {
        [
            Tensor::scalar(x, DataType::F32),
            Tensor::scalar(y, DataType::F32),
        ]
    }

    #[test]
    fn test_value() {
        init();

        let z = f().call(&args(1.0, 4.0)).unwrap();
        assert_eq!(z[0].to_scalar().unwrap(), 5.0);

        let z = f().call(&args(2.0, 3.0)).unwrap();
        assert_eq!(z[0].to_scalar().unwrap(), 7.0);
    }

    #[test]
    fn test_forward_trace() {
        init();

        let jaxpr = make_jaxpr(&f(), &args(1.0, 4.0)).unwrap();

        assert_eq!(jaxpr.num_inputs(), 2);
        assert_eq!(jaxpr.num_outputs(), 1);
        assert_eq!(jaxpr.primitives(), vec!["integer_pow", "add"]);
        assert_eq!(
            jaxpr.to_string(),
            "{ lambda ; a:f32[] b:f32[]. let\n    \
             c:f32[] = integer_pow[y=2] a\n    \
             d:f32[] = add c b\n  \
             in (d,) }"
        );
    }

    #[test]
    fn test_gradient_trace() {
        init();

        let g = f().grad(&[0, 1]).unwrap();
        let jaxpr = make_jaxpr(&g, &args(1.0, 4.0)).unwrap();

        assert_eq!(jaxpr.num_outputs(), 2);
        assert_eq!(
            jaxpr.to_string(),
            "{ lambda ; a:f32[] b:f32[]. let\n    \
             c:f32[] = integer_pow[y=1] a\n    \
             d:f32[] = mul 2.0 c\n    \
             e:f32[] = mul 1.0 d\n  \
             in (e, 1.0) }"
        );

        // 2x and 1
        let out = jaxpr.eval(&args(1.0, 4.0)).unwrap();
        assert_eq!(out[0].to_scalar().unwrap(), 2.0);
        assert_eq!(out[1].to_scalar().unwrap(), 1.0);

        let out = g.call(&args(3.0, 4.0)).unwrap();
        assert_eq!(out[0].to_scalar().unwrap(), 6.0);
        assert_eq!(out[1].to_scalar().unwrap(), 1.0);
    }

    #[test]
    fn test_deterministic() {
        init();

        let g = f().grad(&[0, 1]).unwrap();

        let forward = make_jaxpr(&f(), &args(1.0, 4.0)).unwrap().to_string();
        let backward = make_jaxpr(&g, &args(1.0, 4.0)).unwrap().to_string();

        for _ in 0..5 {
            assert_eq!(make_jaxpr(&f(), &args(1.0, 4.0)).unwrap().to_string(), forward);
            assert_eq!(make_jaxpr(&g, &args(1.0, 4.0)).unwrap().to_string(), backward);
        }
    }
}
