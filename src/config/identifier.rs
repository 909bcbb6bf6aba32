use crate::errors::{FilterCalcError, Result};

/// Width of a standard (CAN 2.0A) identifier.
pub const STD_ID_WIDTH: u32 = 11;
/// Width of an extended (CAN 2.0B) identifier.
pub const EXT_ID_WIDTH: u32 = 29;
pub const MAX_ID_WIDTH: u32 = 32;

/// All bits of a `width` bit identifier set.
pub fn width_mask(width: u32) -> u32 {
    if width >= MAX_ID_WIDTH {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// The identifiers a filter bank has to accept, together with their bit width.
///
/// Order is kept as loaded and duplicates stay separate entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSet {
    ids: Vec<u32>,
    width: u32,
}

impl IdentifierSet {
    pub fn new(ids: Vec<u32>, width: u32) -> Result<Self> {
        if width == 0 || width > MAX_ID_WIDTH {
            return Err(FilterCalcError::invalid_argument(format!(
                "identifier width must be within 1..={MAX_ID_WIDTH} bits, got {width}"
            )));
        }
        if ids.is_empty() {
            return Err(FilterCalcError::invalid_argument(
                "at least one identifier is required",
            ));
        }
        let mask = width_mask(width);
        if let Some(id) = ids.iter().find(|&&id| id & !mask != 0) {
            return Err(FilterCalcError::invalid_argument(format!(
                "identifier {id:#X} does not fit into {width} bits"
            )));
        }
        Ok(Self { ids, width })
    }

    pub fn standard(ids: Vec<u32>) -> Result<Self> {
        Self::new(ids, STD_ID_WIDTH)
    }

    pub fn extended(ids: Vec<u32>) -> Result<Self> {
        Self::new(ids, EXT_ID_WIDTH)
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of distinct identifiers representable with this width.
    pub fn id_space(&self) -> u64 {
        1u64 << self.width
    }

    /// Upper bound for the cost of any partition into `filter_count` groups.
    /// No real partition reaches it.
    pub fn max_cost(&self, filter_count: usize) -> u64 {
        (filter_count as u64).saturating_mul(self.id_space())
    }

    pub fn check_filter_count(&self, filter_count: usize) -> Result<()> {
        if filter_count == 0 {
            return Err(FilterCalcError::invalid_argument(
                "the number of filters must be positive",
            ));
        }
        if filter_count > self.ids.len() {
            return Err(FilterCalcError::invalid_argument(format!(
                "cannot distribute {} identifiers over {filter_count} filters",
                self.ids.len()
            )));
        }
        Ok(())
    }

    /// Renders `id` as a binary string of this width, most significant bit first.
    pub fn format_id(&self, id: u32) -> String {
        format!("{:0width$b}", id, width = self.width as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_masks() {
        assert_eq!(width_mask(STD_ID_WIDTH), 0x7FF);
        assert_eq!(width_mask(EXT_ID_WIDTH), 0x1FFF_FFFF);
        assert_eq!(width_mask(32), u32::MAX);
        assert_eq!(width_mask(1), 1);
    }

    #[test]
    fn rejects_out_of_range_identifier() {
        let err = IdentifierSet::standard(vec![0x7FF, 0x800]).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn rejects_bad_width_and_empty_input() {
        assert!(IdentifierSet::new(vec![1], 0).unwrap_err().is_invalid_argument());
        assert!(IdentifierSet::new(vec![1], 33).unwrap_err().is_invalid_argument());
        assert!(IdentifierSet::new(vec![], 11).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn keeps_duplicates() {
        let ids = IdentifierSet::standard(vec![0x10, 0x10, 0x11]).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids.ids(), &[0x10, 0x10, 0x11]);
    }

    #[test]
    fn filter_count_bounds() {
        let ids = IdentifierSet::standard(vec![1, 2, 3]).unwrap();
        assert!(ids.check_filter_count(0).unwrap_err().is_invalid_argument());
        assert!(ids.check_filter_count(4).unwrap_err().is_invalid_argument());
        assert!(ids.check_filter_count(3).is_ok());
        assert_eq!(ids.max_cost(2), 2 * 2048);
    }

    #[test]
    fn formats_binary() {
        let ids = IdentifierSet::standard(vec![0x3F]).unwrap();
        assert_eq!(ids.format_id(0x3F), "00000111111");
    }
}
