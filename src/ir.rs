//! Jaxpr, a flat and printable form of a traced computation.
//!
//! ```text
//! { lambda ; a:f32[] b:f32[]. let
//!     c:f32[] = integer_pow[y=2] a
//!     d:f32[] = add c b
//!   in (d,) }
//! ```

use crate::error::Error;
use crate::tensor::data::DataType;
use crate::tensor::{Tensor, TensorDesc};
use crate::var::{topological_order, Origin, Var};
use itertools::Itertools;
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

pub type BinderId = usize;

#[derive(Clone, Debug, PartialEq)]
pub enum Atom {
    Binder(BinderId),
    Literal(f64, DataType),
}

pub struct Equation {
    // Operation node the equation was read from
    node: Var,
    inputs: SmallVec<[Atom; 2]>,
    output: BinderId,
}

impl Equation {
    pub fn primitive(&self) -> &'static str {
        self.opr().primitive()
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        self.opr().params()
    }

    pub fn inputs(&self) -> &[Atom] {
        &self.inputs
    }

    pub fn output(&self) -> BinderId {
        self.output
    }

    fn opr(&self) -> &crate::ops::Operator {
        // equations are only built from operation nodes
        match self.node.origin() {
            Origin::Operation(op) => op.opr(),
            _ => unreachable!("equation without an operation"),
        }
    }
}

pub struct Jaxpr {
    // Types of all binders, indexed by BinderId
    binders: Vec<TensorDesc>,
    constvars: Vec<BinderId>,
    consts: Vec<Tensor>,
    invars: Vec<BinderId>,
    eqns: Vec<Equation>,
    outvars: Vec<Atom>,
}

impl Jaxpr {
    /// Flattens the graph between `inputs` and `outputs`.
    ///
    /// Concrete data reached from the outputs, other than the inputs, becomes
    /// a constant. Abstract variables must be among the inputs.
    pub fn from_graph(inputs: &[Var], outputs: &[Var]) -> Result<Self, Error> {
        let order = topological_order(outputs);

        let mut ids = HashMap::<Var, BinderId>::new();
        let mut binders = Vec::new();

        let mut bind = |v: &Var, ids: &mut HashMap<Var, BinderId>| -> BinderId {
            let id = binders.len();
            binders.push(v.desc().clone());
            ids.insert(v.clone(), id);
            id
        };

        let mut constvars = Vec::new();
        let mut consts = Vec::new();

        for v in order.iter() {
            if let Some(t) = v.data() {
                if !inputs.contains(v) && !ids.contains_key(v) {
                    constvars.push(bind(v, &mut ids));
                    consts.push(t.clone());
                }
            }
        }

        let mut invars = Vec::with_capacity(inputs.len());
        for v in inputs {
            if ids.contains_key(v) {
                return Err(Error::DuplicateInput(invars.len()));
            }
            invars.push(bind(v, &mut ids));
        }

        let mut eqns = Vec::new();

        for v in order.iter() {
            let op = match v.op() {
                Some(op) => op,
                None => {
                    if v.is_abstract() && !ids.contains_key(v) {
                        return Err(Error::Abstract);
                    }
                    continue;
                }
            };

            let inputs = op
                .input()
                .iter()
                .map(|x| atom(x, &ids))
                .collect::<SmallVec<[Atom; 2]>>();

            let output = bind(v, &mut ids);

            eqns.push(Equation {
                node: v.clone(),
                inputs,
                output,
            });
        }

        let outvars = outputs.iter().map(|v| atom(v, &ids)).collect_vec();

        debug!(
            "built jaxpr with {} input(s), {} equation(s), {} output(s)",
            invars.len(),
            eqns.len(),
            outvars.len()
        );

        Ok(Jaxpr {
            binders,
            constvars,
            consts,
            invars,
            eqns,
            outvars,
        })
    }

    pub fn in_descs(&self) -> Vec<&TensorDesc> {
        self.invars.iter().map(|&id| &self.binders[id]).collect()
    }

    pub fn out_descs(&self) -> Vec<TensorDesc> {
        self.outvars
            .iter()
            .map(|a| match a {
                Atom::Binder(id) => self.binders[*id].clone(),
                Atom::Literal(_, data_type) => TensorDesc::scalar(*data_type),
            })
            .collect()
    }

    pub fn consts(&self) -> &[Tensor] {
        &self.consts
    }

    pub fn eqns(&self) -> &[Equation] {
        &self.eqns
    }

    pub fn outvars(&self) -> &[Atom] {
        &self.outvars
    }

    pub fn num_inputs(&self) -> usize {
        self.invars.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outvars.len()
    }

    pub fn num_eqns(&self) -> usize {
        self.eqns.len()
    }

    pub fn primitives(&self) -> Vec<&'static str> {
        self.eqns.iter().map(|e| e.primitive()).collect()
    }

    /// Interprets the equations on concrete arguments.
    pub fn eval(&self, args: &[Tensor]) -> Result<Vec<Tensor>, Error> {
        if args.len() != self.invars.len() {
            return Err(Error::Arity {
                expected: self.invars.len(),
                found: args.len(),
            });
        }

        let mut env = HashMap::<BinderId, Tensor>::new();

        for (&id, t) in self.constvars.iter().zip(self.consts.iter()) {
            env.insert(id, t.clone());
        }

        for (index, (&id, t)) in self.invars.iter().zip(args.iter()).enumerate() {
            if &self.binders[id] != t.desc() {
                return Err(Error::Signature {
                    index,
                    expected: self.binders[id].clone(),
                    found: t.desc().clone(),
                });
            }
            env.insert(id, t.clone());
        }

        let read = |a: &Atom, env: &HashMap<BinderId, Tensor>| match a {
            Atom::Binder(id) => env[id].clone(),
            Atom::Literal(v, data_type) => Tensor::scalar(*v, *data_type),
        };

        for eqn in self.eqns.iter() {
            let x = eqn.inputs.iter().map(|a| read(a, &env)).collect_vec();
            let y = eqn.opr().compute(&x)?;
            trace!("{} = {} -> {}", binder_name(eqn.output), eqn.primitive(), y);
            env.insert(eqn.output, y);
        }

        Ok(self.outvars.iter().map(|a| read(a, &env)).collect())
    }

    fn fmt_atom(&self, a: &Atom) -> String {
        match a {
            Atom::Binder(id) => binder_name(*id),
            Atom::Literal(v, data_type) => format_literal(*v, *data_type),
        }
    }

    fn fmt_binder(&self, id: BinderId) -> String {
        format!("{}:{}", binder_name(id), self.binders[id])
    }
}

fn atom(v: &Var, ids: &HashMap<Var, BinderId>) -> Atom {
    match v.literal_value() {
        Some(value) => Atom::Literal(value, v.data_type()),
        None => Atom::Binder(ids[v]),
    }
}

/// a, b, ..., z, ba, bb, ...
pub fn binder_name(id: BinderId) -> String {
    let mut digits = Vec::new();
    let mut n = id;
    loop {
        digits.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

fn format_literal(v: f64, data_type: DataType) -> String {
    match data_type {
        DataType::F32 => format!("{:?}", v as f32),
        DataType::F64 => format!("{:?}", v),
    }
}

impl Display for Jaxpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let constvars = self.constvars.iter().map(|&id| self.fmt_binder(id)).join(" ");
        let invars = self.invars.iter().map(|&id| self.fmt_binder(id)).join(" ");

        let lead = if constvars.is_empty() {
            "{ lambda ;".to_string()
        } else {
            format!("{{ lambda {} ;", constvars)
        };

        if invars.is_empty() {
            writeln!(f, "{}. let", lead)?;
        } else {
            writeln!(f, "{} {}. let", lead, invars)?;
        }

        for eqn in self.eqns.iter() {
            let params = eqn.params();
            let params = if params.is_empty() {
                String::new()
            } else {
                format!(
                    "[{}]",
                    params.iter().map(|(k, v)| format!("{}={}", k, v)).join(" ")
                )
            };

            let inputs = eqn.inputs.iter().map(|a| self.fmt_atom(a)).join(" ");

            writeln!(
                f,
                "    {} = {}{} {}",
                self.fmt_binder(eqn.output),
                eqn.primitive(),
                params,
                inputs
            )?;
        }

        let outvars = self.outvars.iter().map(|a| self.fmt_atom(a)).collect_vec();
        let outvars = if outvars.len() == 1 {
            format!("({},)", outvars[0])
        } else {
            format!("({})", outvars.join(", "))
        };

        write!(f, "  in {} }}", outvars)
    }
}
