//! Participating media are opaque to the geometric layer: shapes and interactions only carry
//! handles to them so that rays know which medium they travel through.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediumId(pub usize);

/// The media on both sides of a surface. `None` stands for vacuum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediumInterface {
    pub inside: Option<MediumId>,
    pub outside: Option<MediumId>,
}

impl MediumInterface {
    /// Interface where both sides are the same medium
    pub fn new(medium: Option<MediumId>) -> Self {
        Self {
            inside: medium,
            outside: medium,
        }
    }

    pub fn is_transition(&self) -> bool {
        self.inside != self.outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition() {
        assert!(!MediumInterface::default().is_transition());
        assert!(!MediumInterface::new(Some(MediumId(1))).is_transition());
        let interface = MediumInterface {
            inside: Some(MediumId(2)),
            outside: None,
        };
        assert!(interface.is_transition());
    }
}
