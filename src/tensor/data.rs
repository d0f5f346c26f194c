use num_traits::Float;
use std::fmt;
use std::fmt::{Display, Formatter};

// Floating point element types. Names follow the jaxpr notation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DataType {
    F32,
    F64,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }

    /// Rounds a value to what this type can represent.
    pub fn round(&self, val: f64) -> f64 {
        match self {
            DataType::F32 => val as f32 as f64,
            DataType::F64 => val,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HostData {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl HostData {
    pub fn from_f64(values: &[f64], data_type: DataType) -> Self {
        match data_type {
            DataType::F32 => HostData::F32(values.iter().map(|&v| v as f32).collect()),
            DataType::F64 => HostData::F64(values.to_vec()),
        }
    }

    pub fn full(val: f64, size: usize, data_type: DataType) -> Self {
        match data_type {
            DataType::F32 => HostData::F32(vec![val as f32; size]),
            DataType::F64 => HostData::F64(vec![val; size]),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            HostData::F32(_) => DataType::F32,
            HostData::F64(_) => DataType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostData::F32(v) => v.len(),
            HostData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            HostData::F32(v) => v.iter().map(|&x| x as f64).collect(),
            HostData::F64(v) => v.clone(),
        }
    }

    pub fn map<M>(&self, m: M) -> HostData
    where
        M: Map1,
    {
        match self {
            HostData::F32(v) => HostData::F32(map1(v, &m)),
            HostData::F64(v) => HostData::F64(map1(v, &m)),
        }
    }

    /// Elementwise combination. A length-1 operand is repeated over the other.
    /// Both sides must hold the same element type.
    pub fn zip_map<M>(&self, other: &HostData, m: M) -> Option<HostData>
    where
        M: Map2,
    {
        match (self, other) {
            (HostData::F32(a), HostData::F32(b)) => Some(HostData::F32(map2(a, b, &m))),
            (HostData::F64(a), HostData::F64(b)) => Some(HostData::F64(map2(a, b, &m))),
            _ => None,
        }
    }
}

pub trait Map1 {
    fn apply<T: Float>(&self, x: T) -> T;
}

pub trait Map2 {
    fn apply<T: Float>(&self, x0: T, x1: T) -> T;
}

fn map1<T: Float, M: Map1>(x: &[T], m: &M) -> Vec<T> {
    x.iter().map(|&v| m.apply(v)).collect()
}

fn map2<T: Float, M: Map2>(x0: &[T], x1: &[T], m: &M) -> Vec<T> {
    match (x0.len(), x1.len()) {
        (1, n) if n != 1 => x1.iter().map(|&b| m.apply(x0[0], b)).collect(),
        (n, 1) if n != 1 => x0.iter().map(|&a| m.apply(a, x1[0])).collect(),
        _ => x0.iter().zip(x1.iter()).map(|(&a, &b)| m.apply(a, b)).collect(),
    }
}
