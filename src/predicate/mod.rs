pub use self::builder::{PartialPredicate, PredicateBuilder};
pub use self::pruner::Pruner;

use crate::codevalue::CodeValue;

mod builder;
mod pruner;

/// Boolean expression over the bits of a code value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Predicate {
    Constant(bool),
    /// `(input & mask) == (value & mask)`, negated unless `equals`.
    BitTest {
        mask: CodeValue,
        value: CodeValue,
        equals: bool,
    },
    Conjunction(Box<Predicate>, Box<Predicate>),
    Disjunction(Box<Predicate>, Box<Predicate>),
    /// One-bit branch: `on` when `input & bit != 0`, `off` otherwise.
    Conditional {
        bit: CodeValue,
        on: Box<Predicate>,
        off: Box<Predicate>,
    },
}

impl Predicate {
    pub fn bit_test(mask: CodeValue, value: CodeValue, equals: bool) -> Self {
        Self::BitTest {
            mask,
            value,
            equals,
        }
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::Conjunction(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::Disjunction(Box::new(lhs), Box::new(rhs))
    }

    pub fn conditional(bit: CodeValue, on: Self, off: Self) -> Self {
        Self::Conditional {
            bit,
            on: Box::new(on),
            off: Box::new(off),
        }
    }

    pub fn evaluate(&self, input: CodeValue) -> bool {
        let mut node = self;
        loop {
            match node {
                &Self::Constant(value) => return value,
                &Self::BitTest {
                    mask,
                    value,
                    equals,
                } => return ((input & mask) == (value & mask)) == equals,
                Self::Conjunction(lhs, rhs) => {
                    if !lhs.evaluate(input) {
                        return false;
                    }
                    node = rhs.as_ref();
                }
                Self::Disjunction(lhs, rhs) => {
                    if lhs.evaluate(input) {
                        return true;
                    }
                    node = rhs.as_ref();
                }
                Self::Conditional { bit, on, off } => {
                    node = if input & bit != 0 { on.as_ref() } else { off.as_ref() };
                }
            }
        }
    }

    /// Total number of compare/jumps in the expression.
    pub fn comparisons(&self) -> usize {
        match self {
            Self::Constant(_) => 0,
            Self::BitTest { .. } => 1,
            Self::Conjunction(lhs, rhs) | Self::Disjunction(lhs, rhs) => {
                lhs.comparisons() + rhs.comparisons()
            }
            Self::Conditional { on, off, .. } => 1 + on.comparisons() + off.comparisons(),
        }
    }

    /// Compare/jumps executed to classify `input`.
    pub fn path_comparisons(&self, input: CodeValue) -> usize {
        match self {
            Self::Constant(_) => 0,
            Self::BitTest { .. } => 1,
            Self::Conjunction(lhs, rhs) => {
                let n = lhs.path_comparisons(input);
                if lhs.evaluate(input) {
                    n + rhs.path_comparisons(input)
                } else {
                    n
                }
            }
            Self::Disjunction(lhs, rhs) => {
                let n = lhs.path_comparisons(input);
                if lhs.evaluate(input) {
                    n
                } else {
                    n + rhs.path_comparisons(input)
                }
            }
            Self::Conditional { bit, on, off } => {
                1 + if input & bit != 0 {
                    on.path_comparisons(input)
                } else {
                    off.path_comparisons(input)
                }
            }
        }
    }

    /// Longest chain of compare/jumps over all inputs.
    pub fn worst_case(&self) -> usize {
        match self {
            Self::Constant(_) => 0,
            Self::BitTest { .. } => 1,
            Self::Conjunction(lhs, rhs) | Self::Disjunction(lhs, rhs) => {
                lhs.worst_case() + rhs.worst_case()
            }
            Self::Conditional { on, off, .. } => 1 + on.worst_case().max(off.worst_case()),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant(value) => write!(f, "{value}"),
            &Self::BitTest {
                mask,
                value,
                equals,
            } => {
                let op = if equals { "==" } else { "!=" };
                write!(f, "(c & {mask:#x}) {op} {:#x}", value & mask)
            }
            Self::Conjunction(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            Self::Disjunction(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
            Self::Conditional { bit, on, off } => {
                write!(f, "(c & {bit:#x} ? {on} : {off})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate() {
        let p = Predicate::bit_test(0xe, 0x0, true);
        assert!(p.evaluate(0) && p.evaluate(1));
        assert!(!p.evaluate(2));

        let p = Predicate::bit_test(0xe, 0x0, false);
        assert!(!p.evaluate(1));
        assert!(p.evaluate(0x10 | 2));

        // empty mask degenerates to a constant
        assert!(Predicate::bit_test(0, 0x5, true).evaluate(0xff));
        assert!(!Predicate::bit_test(0, 0x5, false).evaluate(0xff));

        let p = Predicate::conditional(
            0x8,
            Predicate::bit_test(0x1, 0x1, true),
            Predicate::or(
                Predicate::bit_test(0xf, 0x2, true),
                Predicate::Constant(false),
            ),
        );
        println!("{p}");
        let matched = (0..16).filter(|&c| p.evaluate(c)).collect::<Vec<_>>();
        assert_eq!(matched, [2, 9, 11, 13, 15]);
    }

    #[test]
    fn comparisons() {
        let p = Predicate::and(
            Predicate::bit_test(0xc, 0x0, true),
            Predicate::conditional(
                0x2,
                Predicate::bit_test(0xf, 0x3, true),
                Predicate::Constant(true),
            ),
        );
        assert_eq!(p.comparisons(), 3);
        assert_eq!(p.worst_case(), 3);
        assert_eq!(p.path_comparisons(0x8), 1);
        assert_eq!(p.path_comparisons(0x1), 2);
        assert_eq!(p.path_comparisons(0x3), 3);
    }
}
