use itertools::Itertools;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

pub mod data;

use crate::error::Error;
use crate::shape;
use crate::shape::{display_comma, Array, Extent, ShapeError};
use crate::tensor::data::{DataType, HostData};

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct TensorDesc {
    extents: Array,
    data_type: DataType,
}

impl TensorDesc {
    pub fn new<E>(extents: E, data_type: DataType) -> Self
    where
        E: Extent,
    {
        TensorDesc {
            extents: extents.to_arr(),
            data_type,
        }
    }

    pub fn scalar(data_type: DataType) -> Self {
        TensorDesc::new(Array::new(), data_type)
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    pub fn size(&self) -> usize {
        shape::size(&self.extents)
    }

    pub fn is_scalar(&self) -> bool {
        self.extents.is_empty()
    }
}

// jaxpr style, e.g. f32[] or f32[2,3]
impl Display for TensorDesc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.data_type, display_comma(&self.extents))
    }
}

impl Debug for TensorDesc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Immutable host array.
#[derive(Clone)]
pub struct Tensor {
    desc: TensorDesc,
    data: Rc<HostData>,
}

impl Tensor {
    // ******************************** Constructors ******************************** //

    pub fn new<E>(extents: E, values: &[f64], data_type: DataType) -> Result<Self, Error>
    where
        E: Extent,
    {
        let desc = TensorDesc::new(extents, data_type);

        if desc.size() != values.len() {
            return Err(ShapeError::SizeMismatch(desc.size(), values.len()).into());
        }

        Ok(Tensor {
            desc,
            data: Rc::new(HostData::from_f64(values, data_type)),
        })
    }

    pub fn scalar(val: f64, data_type: DataType) -> Self {
        Tensor::full(Array::new(), val, data_type)
    }

    pub fn full<E>(extents: E, val: f64, data_type: DataType) -> Self
    where
        E: Extent,
    {
        let desc = TensorDesc::new(extents, data_type);
        let data = HostData::full(val, desc.size(), data_type);

        Tensor {
            desc,
            data: Rc::new(data),
        }
    }

    pub fn zeros<E>(extents: E, data_type: DataType) -> Self
    where
        E: Extent,
    {
        Tensor::full(extents, 0.0, data_type)
    }

    pub(crate) fn from_host(desc: TensorDesc, data: HostData) -> Self {
        debug_assert_eq!(desc.size(), data.len());
        debug_assert_eq!(desc.data_type(), data.data_type());

        Tensor {
            desc,
            data: Rc::new(data),
        }
    }

    // ******************************** Getters ******************************** //

    pub fn desc(&self) -> &TensorDesc {
        &self.desc
    }

    pub fn data(&self) -> &HostData {
        &self.data
    }

    pub fn data_type(&self) -> DataType {
        self.desc.data_type()
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

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.to_f64()
    }

    pub fn to_scalar(&self) -> Result<f64, Error> {
        if self.size() != 1 {
            return Err(ShapeError::NotScalar(self.extents().to_vec()).into());
        }
        Ok(self.to_vec()[0])
    }

    pub fn all_close(t1: &Tensor, t2: &Tensor, eps: f64) -> bool {
        (t1.extents() == t2.extents())
            && t1
                .to_vec()
                .iter()
                .zip(t2.to_vec().iter())
                .all(|(v1, v2)| (v1 - v2).abs() < eps)
    }
}

impl AsRef<Tensor> for Tensor {
    fn as_ref(&self) -> &Tensor {
        self
    }
}

impl Debug for Tensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor({}, {:?})", self, self.desc)
    }
}

impl Display for Tensor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let values = match self.data.as_ref() {
            HostData::F32(v) => v.iter().map(|x| format!("{:?}", x)).collect_vec(),
            HostData::F64(v) => v.iter().map(|x| format!("{:?}", x)).collect_vec(),
        };
        write_nested(f, self.extents(), &values)
    }
}

fn write_nested(f: &mut Formatter<'_>, extents: &[usize], values: &[String]) -> fmt::Result {
    match extents.split_first() {
        None => write!(f, "{}", values[0]),
        Some((&n, rest)) => {
            let stride = shape::size(rest);
            write!(f, "[")?;
            for i in 0..n {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_nested(f, rest, &values[i * stride..(i + 1) * stride])?;
            }
            write!(f, "]")
        }
    }
}
