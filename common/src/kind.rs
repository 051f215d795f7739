//! The scalar type lattice shared by the code generator and the VM.

use std::fmt;

/// A scalar's width and domain tag, used as the single-letter prefix in the
/// image (`I_LOAD`, `D_ADD`, ...) and as the sticky type of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Void,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Ref,
}

impl ScalarKind {
    /// Width rank used by [`promote`]. `Void` never participates in
    /// arithmetic; its rank only exists so comparisons stay total.
    pub fn rank(self) -> u8 {
        match self {
            ScalarKind::Void => 0,
            ScalarKind::Byte => 1,
            ScalarKind::Short => 2,
            ScalarKind::Int => 3,
            ScalarKind::Long => 4,
            ScalarKind::Float => 5,
            ScalarKind::Double => 6,
            ScalarKind::Ref => 7,
        }
    }

    /// The single-letter tag used in the textual image and in diagnostics.
    pub fn tag(self) -> char {
        match self {
            ScalarKind::Void => 'V',
            ScalarKind::Byte => 'B',
            ScalarKind::Short => 'S',
            ScalarKind::Int => 'I',
            ScalarKind::Long => 'L',
            ScalarKind::Float => 'F',
            ScalarKind::Double => 'D',
            ScalarKind::Ref => 'R',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        Some(match tag {
            'V' => ScalarKind::Void,
            'B' => ScalarKind::Byte,
            'S' => ScalarKind::Short,
            'I' => ScalarKind::Int,
            'L' => ScalarKind::Long,
            'F' => ScalarKind::Float,
            'D' => ScalarKind::Double,
            'R' => ScalarKind::Ref,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ScalarKind::Void | ScalarKind::Ref)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            ScalarKind::Byte | ScalarKind::Short | ScalarKind::Int | ScalarKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, ScalarKind::Float | ScalarKind::Double)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Widen `a` and `b` to their common kind. Ties (equal rank) favor the left
/// operand, so `promote` is order-agnostic only on the resulting rank, not on
/// which of the two equal-rank values is returned — matching spec.md §8's
/// invariant that the emitted opcode depends only on the widened rank.
pub fn promote(a: ScalarKind, b: ScalarKind) -> ScalarKind {
    if a.rank() >= b.rank() {
        a
    } else {
        b
    }
}

/// The 30-entry scalar conversion table. `X2X` is never emitted by the code
/// generator (spec.md §8), but this function is total so handlers and tests
/// can call it uniformly; it returns `None` only for non-numeric kinds.
pub fn conversion_name(from: ScalarKind, to: ScalarKind) -> Option<String> {
    if from == to || !from.is_numeric() || !to.is_numeric() {
        return None;
    }
    Some(format!("{}2{}", from.tag(), to.tag()))
}

pub const NUMERIC_KINDS: [ScalarKind; 6] = [
    ScalarKind::Byte,
    ScalarKind::Short,
    ScalarKind::Int,
    ScalarKind::Long,
    ScalarKind::Float,
    ScalarKind::Double,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_is_order_agnostic_on_rank() {
        for &a in &NUMERIC_KINDS {
            for &b in &NUMERIC_KINDS {
                assert_eq!(promote(a, b).rank(), promote(b, a).rank());
            }
        }
    }

    #[test]
    fn conversion_table_has_thirty_entries() {
        let mut count = 0;
        for &from in &NUMERIC_KINDS {
            for &to in &NUMERIC_KINDS {
                if conversion_name(from, to).is_some() {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 30);
    }

    #[test]
    fn no_op_conversion_is_never_named() {
        for &k in &NUMERIC_KINDS {
            assert_eq!(conversion_name(k, k), None);
        }
    }

    #[test]
    fn tag_round_trips() {
        for &k in &NUMERIC_KINDS {
            assert_eq!(ScalarKind::from_tag(k.tag()), Some(k));
        }
        assert_eq!(ScalarKind::from_tag(ScalarKind::Ref.tag()), Some(ScalarKind::Ref));
        assert_eq!(ScalarKind::from_tag(ScalarKind::Void.tag()), Some(ScalarKind::Void));
    }
}
