//! Adept-style two-stack tape for reverse-mode AD.
//!
//! Stores precomputed partial derivatives (multipliers) and operand indices during the
//! forward pass. The reverse sweep is a single multiply-accumulate loop with zero-adjoint
//! skipping, no opcode dispatch.
//!
//! The tape is an explicit context: every [`Reverse`](crate::Reverse) variable borrows
//! the tape it was recorded on, so independent recordings never share state and there is
//! no ambient "active tape" to install or restore.

use std::cell::RefCell;

use crate::Scalar;

/// Sentinel index indicating a constant (not recorded on tape).
pub const CONSTANT: u32 = u32::MAX;

/// A recorded operation: its result lives at `lhs_index`, and its operands'
/// multipliers/indices span `[prev.end_plus_one .. self.end_plus_one)`.
#[derive(Clone, Copy, Debug)]
struct Statement {
    lhs_index: u32,
    end_plus_one: u32,
}

#[derive(Debug)]
struct Stacks<T> {
    statements: Vec<Statement>,
    multipliers: Vec<T>,
    indices: Vec<u32>,
    num_variables: u32,
}

/// Reverse-mode recording context.
///
/// Recording goes through `&self` (interior mutability), which lets many
/// `Copy` variables hold a shared borrow of the same tape while arithmetic
/// appends to it.
#[derive(Debug)]
pub struct Tape<T> {
    stacks: RefCell<Stacks<T>>,
}

impl<T: Scalar> Default for Tape<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Tape<T> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tape with pre-allocated capacity.
    pub fn with_capacity(est_ops: usize) -> Self {
        let mut statements = Vec::with_capacity(est_ops + 1);
        // Sentinel statement at index 0 so that `statements[i-1].end_plus_one`
        // is always valid for i >= 1.
        statements.push(Statement {
            lhs_index: 0,
            end_plus_one: 0,
        });
        Tape {
            stacks: RefCell::new(Stacks {
                statements,
                multipliers: Vec::with_capacity(est_ops * 2),
                indices: Vec::with_capacity(est_ops * 2),
                num_variables: 0,
            }),
        }
    }

    /// Register a new independent variable. Returns `(gradient_index, value)`.
    ///
    /// No statement is pushed for input variables: they are leaf nodes
    /// whose adjoints must survive the reverse sweep.
    #[inline]
    pub fn new_variable(&self, value: T) -> (u32, T) {
        let mut stacks = self.stacks.borrow_mut();
        let idx = stacks.num_variables;
        stacks.num_variables += 1;
        (idx, value)
    }

    /// Record a unary operation: `result = f(operand)` with precomputed `multiplier = df/d(operand)`.
    #[inline]
    pub fn push_unary(&self, operand_idx: u32, multiplier: T) -> u32 {
        let mut stacks = self.stacks.borrow_mut();
        let result_idx = stacks.num_variables;
        stacks.num_variables += 1;

        if operand_idx != CONSTANT {
            stacks.multipliers.push(multiplier);
            stacks.indices.push(operand_idx);
        }

        let end_plus_one = stacks.multipliers.len() as u32;
        stacks.statements.push(Statement {
            lhs_index: result_idx,
            end_plus_one,
        });
        result_idx
    }

    /// Record a binary operation with precomputed partial derivatives.
    #[inline]
    pub fn push_binary(&self, lhs_idx: u32, lhs_mult: T, rhs_idx: u32, rhs_mult: T) -> u32 {
        let mut stacks = self.stacks.borrow_mut();
        let result_idx = stacks.num_variables;
        stacks.num_variables += 1;

        if lhs_idx != CONSTANT {
            stacks.multipliers.push(lhs_mult);
            stacks.indices.push(lhs_idx);
        }
        if rhs_idx != CONSTANT {
            stacks.multipliers.push(rhs_mult);
            stacks.indices.push(rhs_idx);
        }

        let end_plus_one = stacks.multipliers.len() as u32;
        stacks.statements.push(Statement {
            lhs_index: result_idx,
            end_plus_one,
        });
        result_idx
    }

    /// Number of variables (inputs and intermediates) recorded so far.
    pub fn num_variables(&self) -> usize {
        self.stacks.borrow().num_variables as usize
    }

    /// Run the reverse sweep, seeding the adjoint of `seed_index` with 1.
    /// Returns the full adjoint vector.
    pub fn reverse(&self, seed_index: u32) -> Vec<T> {
        self.reverse_seeded(&[(seed_index, T::one())])
    }

    /// Run the reverse sweep with custom adjoint seeds. Seeds on
    /// [`CONSTANT`] are ignored; repeated indices accumulate.
    pub fn reverse_seeded(&self, seeds: &[(u32, T)]) -> Vec<T> {
        let stacks = self.stacks.borrow();
        let mut adjoints = vec![T::zero(); stacks.num_variables as usize];
        for &(idx, seed) in seeds {
            if idx != CONSTANT {
                adjoints[idx as usize] += seed;
            }
        }

        for i in (1..stacks.statements.len()).rev() {
            let stmt = stacks.statements[i];
            let a = adjoints[stmt.lhs_index as usize];
            if a.is_zero() {
                continue;
            }
            adjoints[stmt.lhs_index as usize] = T::zero();
            let start = stacks.statements[i - 1].end_plus_one as usize;
            let end = stmt.end_plus_one as usize;
            for j in start..end {
                let k = stacks.indices[j] as usize;
                adjoints[k] += stacks.multipliers[j] * a;
            }
        }
        adjoints
    }
}
