use super::Predicate;
use crate::codevalue::CodeValue;

/// Predicate whose child slots may still be empty.
///
/// Fragments are appended with [`PartialPredicate::push`], which fills the
/// first empty slot found depth-first, left to right.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PartialPredicate {
    Constant(bool),
    BitTest {
        mask: CodeValue,
        value: CodeValue,
        equals: bool,
    },
    Conjunction(Slot, Slot),
    Disjunction(Slot, Slot),
    /// Branches are filled `off` first.
    Conditional { bit: CodeValue, off: Slot, on: Slot },
}

type Slot = Option<Box<PartialPredicate>>;

impl PartialPredicate {
    pub fn bit_test(mask: CodeValue, value: CodeValue, equals: bool) -> Self {
        Self::BitTest {
            mask,
            value,
            equals,
        }
    }

    /// Conjunction with an open right-hand side.
    pub fn and(lhs: Self) -> Self {
        Self::Conjunction(Some(Box::new(lhs)), None)
    }

    /// Disjunction with an open right-hand side.
    pub fn or(lhs: Self) -> Self {
        Self::Disjunction(Some(Box::new(lhs)), None)
    }

    /// Conditional with both branches open.
    pub fn conditional(bit: CodeValue) -> Self {
        Self::Conditional {
            bit,
            off: None,
            on: None,
        }
    }

    /// Appends a fragment to the first open slot.
    ///
    /// Gives the fragment back if no slot is open in this subtree.
    pub fn push(&mut self, fragment: Self) -> Result<(), Self> {
        match self {
            Self::Constant(_) | Self::BitTest { .. } => Err(fragment),
            Self::Conjunction(lhs, rhs) | Self::Disjunction(lhs, rhs) => {
                push_slots([lhs, rhs], fragment)
            }
            Self::Conditional { off, on, .. } => push_slots([off, on], fragment),
        }
    }

    pub fn is_complete(&self) -> bool {
        fn filled(slot: &Slot) -> bool {
            matches!(slot, Some(child) if child.is_complete())
        }

        match self {
            Self::Constant(_) | Self::BitTest { .. } => true,
            Self::Conjunction(lhs, rhs) | Self::Disjunction(lhs, rhs) => {
                filled(lhs) && filled(rhs)
            }
            Self::Conditional { off, on, .. } => filled(off) && filled(on),
        }
    }

    /// Converts a complete tree, `None` if any slot is still open.
    pub fn into_predicate(self) -> Option<Predicate> {
        Some(match self {
            Self::Constant(value) => Predicate::Constant(value),
            Self::BitTest {
                mask,
                value,
                equals,
            } => Predicate::bit_test(mask, value, equals),
            Self::Conjunction(Some(lhs), Some(rhs)) => {
                Predicate::and(lhs.into_predicate()?, rhs.into_predicate()?)
            }
            Self::Disjunction(Some(lhs), Some(rhs)) => {
                Predicate::or(lhs.into_predicate()?, rhs.into_predicate()?)
            }
            Self::Conditional {
                bit,
                off: Some(off),
                on: Some(on),
            } => Predicate::conditional(bit, on.into_predicate()?, off.into_predicate()?),
            _ => return None,
        })
    }
}

fn push_slots(slots: [&mut Slot; 2], mut fragment: PartialPredicate) -> Result<(), PartialPredicate> {
    for slot in slots {
        match slot {
            None => {
                *slot = Some(Box::new(fragment));
                return Ok(());
            }
            Some(child) => match child.push(fragment) {
                Ok(()) => return Ok(()),
                Err(rejected) => fragment = rejected,
            },
        }
    }
    Err(fragment)
}

impl From<Predicate> for PartialPredicate {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::Constant(value) => Self::Constant(value),
            Predicate::BitTest {
                mask,
                value,
                equals,
            } => Self::bit_test(mask, value, equals),
            Predicate::Conjunction(lhs, rhs) => {
                Self::Conjunction(Some(Box::new((*lhs).into())), Some(Box::new((*rhs).into())))
            }
            Predicate::Disjunction(lhs, rhs) => {
                Self::Disjunction(Some(Box::new((*lhs).into())), Some(Box::new((*rhs).into())))
            }
            Predicate::Conditional { bit, on, off } => Self::Conditional {
                bit,
                off: Some(Box::new((*off).into())),
                on: Some(Box::new((*on).into())),
            },
        }
    }
}

/// Root of an incrementally built predicate.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    root: Option<PartialPredicate>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    ///
    /// Panics if the predicate is already complete.
    pub fn push(&mut self, fragment: impl Into<PartialPredicate>) {
        let fragment = fragment.into();
        match self.root.as_mut() {
            Some(root) => {
                if root.push(fragment).is_err() {
                    panic!("pushed a fragment into a complete predicate");
                }
            }
            None => self.root = Some(fragment),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(&self.root, Some(root) if root.is_complete())
    }

    /// # Panics
    ///
    /// Panics if any slot is still open.
    pub fn finish(self) -> Predicate {
        match self.root.and_then(PartialPredicate::into_predicate) {
            Some(predicate) => predicate,
            None => panic!("finished an incomplete predicate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_push() {
        let mut builder = PredicateBuilder::new();
        builder.push(PartialPredicate::and(PartialPredicate::bit_test(0xc, 0x0, true)));
        builder.push(PartialPredicate::or(PartialPredicate::bit_test(0xf, 0x3, true)));
        assert!(!builder.is_complete());

        builder.push(PartialPredicate::conditional(0x2));
        builder.push(PartialPredicate::bit_test(0xf, 0x0, true));
        assert!(!builder.is_complete());
        builder.push(Predicate::Constant(false));
        assert!(builder.is_complete());

        let predicate = builder.finish();
        println!("{predicate:#?}");

        assert_eq!(
            predicate,
            Predicate::and(
                Predicate::bit_test(0xc, 0x0, true),
                Predicate::or(
                    Predicate::bit_test(0xf, 0x3, true),
                    Predicate::conditional(
                        0x2,
                        Predicate::Constant(false),
                        Predicate::bit_test(0xf, 0x0, true),
                    ),
                ),
            )
        );
    }

    #[test]
    fn single_leaf() {
        let mut builder = PredicateBuilder::new();
        builder.push(Predicate::bit_test(0x1, 0x0, true));
        assert!(builder.is_complete());
        assert_eq!(builder.finish(), Predicate::bit_test(0x1, 0x0, true));
    }

    #[test]
    fn leaves_reject_fragments() {
        let mut leaf = PartialPredicate::Constant(true);
        assert_eq!(
            leaf.push(PartialPredicate::Constant(false)),
            Err(PartialPredicate::Constant(false))
        );

        let mut node = PartialPredicate::and(PartialPredicate::Constant(true));
        assert!(node.push(PartialPredicate::Constant(false)).is_ok());
        assert!(node.is_complete());
        assert!(node.push(PartialPredicate::Constant(false)).is_err());
    }

    #[test]
    fn round_trip_complete_tree() {
        let predicate = Predicate::conditional(
            0x4,
            Predicate::bit_test(0x7, 0x5, false),
            Predicate::or(Predicate::Constant(true), Predicate::bit_test(0x1, 0x1, true)),
        );
        let partial = PartialPredicate::from(predicate.clone());
        assert!(partial.is_complete());
        assert_eq!(partial.into_predicate(), Some(predicate));
    }

    #[test]
    #[should_panic(expected = "complete predicate")]
    fn push_into_complete() {
        let mut builder = PredicateBuilder::new();
        builder.push(Predicate::Constant(true));
        builder.push(Predicate::Constant(false));
    }

    #[test]
    #[should_panic(expected = "incomplete predicate")]
    fn finish_incomplete() {
        let mut builder = PredicateBuilder::new();
        builder.push(PartialPredicate::conditional(0x1));
        builder.push(Predicate::Constant(false));
        builder.finish();
    }

    #[test]
    #[should_panic(expected = "incomplete predicate")]
    fn finish_empty() {
        PredicateBuilder::new().finish();
    }
}
