use crate::error::WidthError;

/// Integer being classified, e.g. a Unicode scalar value.
pub type CodeValue = u32;

/// Bit width `W` of the classified domain `[0, 2^W - 1]`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct CodeWidth(u32);

impl CodeWidth {
    pub const MAX: Self = Self(CodeValue::BITS);

    pub fn new(bits: u32) -> Result<Self, WidthError> {
        if (1..=CodeValue::BITS).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(WidthError(bits))
        }
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Largest code value of the domain.
    pub fn max_value(&self) -> CodeValue {
        CodeValue::MAX >> (CodeValue::BITS - self.0)
    }

    /// Mask of the most significant bit, tested first.
    pub fn high_bit(&self) -> CodeValue {
        1 << (self.0 - 1)
    }

    pub fn contains(&self, value: CodeValue) -> bool {
        value <= self.max_value()
    }
}

impl Default for CodeWidth {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<u32> for CodeWidth {
    type Error = WidthError;

    #[inline]
    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Self::new(bits)
    }
}

impl std::fmt::Display for CodeWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bits", self.0)
    }
}
