use smallvec::{smallvec, SmallVec};

use crate::bindings::{BindingId, Bindings};
use crate::expression::{BinaryOperator, Expression, UnaryFunction};
use crate::real::Real;

#[cfg(feature = "rayon")]
use rayon::prelude::{IntoParallelIterator, ParallelExtend, ParallelIterator};

impl Expression {
    /// Calculates the result using the current values in `bindings`.
    ///
    /// Never fails: domain errors come out as NaN or infinity, e.g. `log(0)`
    /// is `-inf` and `1/0` is `inf`.
    ///
    /// # Panics
    ///
    /// If the tree was parsed against a table with more slots than
    /// `bindings`.
    pub fn evaluate(&self, bindings: &Bindings) -> Real {
        self.evaluate_with(bindings.values())
    }

    /// Like [`Expression::evaluate`], reading binding `i` from `values[i]`.
    pub fn evaluate_with(&self, values: &[Real]) -> Real {
        self.evaluate_reading(&|binding| values[binding])
    }

    /// Calculates one result per row of `columns`, where binding `i` reads
    /// from `columns[i]`.
    ///
    /// # Panics
    ///
    /// If the columns differ in length, or a binding the tree reads has no
    /// column.
    pub fn evaluate_batch<R: AsRef<[Real]> + Sync>(&self, columns: &[R]) -> Vec<Real> {
        let rows = columns.first().map_or(0, |column| column.as_ref().len());
        validate_bindings(columns, rows);

        let row_value =
            |row: usize| self.evaluate_reading(&|binding| columns[binding].as_ref()[row]);

        let mut output = Vec::with_capacity(rows);
        #[cfg(feature = "rayon")]
        {
            output.par_extend((0..rows).into_par_iter().map(row_value));
        }
        #[cfg(not(feature = "rayon"))]
        {
            output.extend((0..rows).map(row_value));
        }
        output
    }

    /// Samples the surface `y = f(x, z)` over `grid`.
    ///
    /// Output is row-major with `x` in the outer loop: entry
    /// `i * grid.side() + j` holds the value at `x = grid.coordinate(i)`,
    /// `z = grid.coordinate(j)`. Bindings other than `x` and `z` keep their
    /// current values.
    pub fn sample_grid(
        &self,
        bindings: &Bindings,
        x: BindingId,
        z: BindingId,
        grid: &Grid,
    ) -> Vec<Real> {
        if self.is_constant() {
            return vec![self.evaluate(bindings); grid.len()];
        }

        let side = grid.side();
        let values = bindings.values();
        let cell_value = |cell: usize| {
            let x_value = grid.coordinate(cell / side);
            let z_value = grid.coordinate(cell % side);
            self.evaluate_reading(&|binding| {
                if binding == x {
                    x_value
                } else if binding == z {
                    z_value
                } else {
                    values[binding]
                }
            })
        };

        let mut output = Vec::with_capacity(grid.len());
        #[cfg(feature = "rayon")]
        {
            output.par_extend((0..grid.len()).into_par_iter().map(cell_value));
        }
        #[cfg(not(feature = "rayon"))]
        {
            output.extend((0..grid.len()).map(cell_value));
        }
        output
    }

    /// Post-order walk with explicit stacks, so tree depth is bounded by
    /// memory rather than by the thread's stack. Typical trees stay within
    /// the inline capacity and never touch the heap.
    fn evaluate_reading(&self, read: &impl Fn(BindingId) -> Real) -> Real {
        let mut pending: SmallVec<[Pending<'_>; 32]> = smallvec![Pending::Node(self)];
        let mut values: SmallVec<[Real; 32]> = SmallVec::new();
        while let Some(step) = pending.pop() {
            match step {
                Pending::Node(Self::Literal(value)) => values.push(*value),
                Pending::Node(Self::Binding(binding)) => values.push(read(*binding)),
                Pending::Node(Self::Unary(function, only)) => {
                    pending.push(Pending::Unary(*function));
                    pending.push(Pending::Node(only));
                }
                Pending::Node(Self::Binary(op, lhs, rhs)) => {
                    pending.push(Pending::Binary(*op));
                    pending.push(Pending::Node(rhs));
                    pending.push(Pending::Node(lhs));
                }
                Pending::Unary(function) => {
                    let only = pop_value(&mut values);
                    values.push(function.apply(only));
                }
                Pending::Binary(op) => {
                    let rhs = pop_value(&mut values);
                    let lhs = pop_value(&mut values);
                    values.push(op.apply(lhs, rhs));
                }
            }
        }
        pop_value(&mut values)
    }
}

enum Pending<'e> {
    Node(&'e Expression),
    Unary(UnaryFunction),
    Binary(BinaryOperator),
}

// Every operator is queued after its operands, so the stack is never short.
fn pop_value(values: &mut SmallVec<[Real; 32]>) -> Real {
    values.pop().unwrap_or(Real::NAN)
}

fn validate_bindings<B: AsRef<[Real]>>(input_bindings: &[B], expected_length: usize) {
    for b in input_bindings.iter() {
        assert_eq!(b.as_ref().len(), expected_length);
    }
}

/// Square sampling lattice centred on the origin.
///
/// Each axis takes `2 * samples` positions, `-samples * spacing` up to
/// `(samples - 1) * spacing`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid {
    pub samples: u32,
    pub spacing: Real,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            samples: 30,
            spacing: 1.0,
        }
    }
}

impl Grid {
    /// Positions along one axis.
    pub fn side(&self) -> usize {
        2 * self.samples as usize
    }

    pub fn len(&self) -> usize {
        self.side() * self.side()
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Axis value of position `index`, which counts from the negative end.
    pub fn coordinate(&self, index: usize) -> Real {
        (index as i64 - i64::from(self.samples)) as Real * self.spacing
    }
}
