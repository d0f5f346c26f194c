use crate::shape::ShapeError;
use crate::tensor::data::DataType;
use crate::tensor::TensorDesc;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),
    #[error("data type mismatch: expected {expected}, found {found}")]
    DataType { expected: DataType, found: DataType },
    #[error("function takes {expected} argument(s) but {found} were given")]
    Arity { expected: usize, found: usize },
    #[error("argnum {argnum} is out of range for a function of {arity} argument(s)")]
    ArgNum { argnum: usize, arity: usize },
    #[error("argnum {0} appears more than once")]
    DuplicateArgNum(usize),
    #[error("input {0} is the same variable as an earlier input")]
    DuplicateInput(usize),
    #[error("at least one argnum is required")]
    EmptyArgNums,
    #[error("gradient only defined for scalar-output functions, output had extents {0:?}")]
    NonScalarOutput(Vec<usize>),
    #[error("gradient only defined for single-output functions, found {0} outputs")]
    MultipleOutputs(usize),
    #[error("cannot evaluate an abstract variable")]
    Abstract,
    #[error("argument {index} should be {expected} but was {found}")]
    Signature {
        index: usize,
        expected: TensorDesc,
        found: TensorDesc,
    },
}
