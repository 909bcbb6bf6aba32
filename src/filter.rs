use serde::Serialize;

use crate::config::{width_mask, MAX_ID_WIDTH};

/// A CAN acceptance filter.
///
/// Bits set in `mask` are "don't care", every other bit of an identifier has
/// to equal the corresponding bit of `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Filter {
    mask: u32,
    value: u32,
}

impl Filter {
    pub fn new(mask: u32, value: u32) -> Self {
        Self { mask, value }
    }

    /// Filter accepting exactly `id`.
    pub fn exact(id: u32) -> Self {
        Self { mask: 0, value: id }
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn accepts(&self, id: u32) -> bool {
        id & !self.mask == self.value
    }

    pub fn dont_care_bits(&self) -> u32 {
        self.mask.count_ones()
    }

    /// Number of identifiers passing this filter.
    pub fn accepted_count(&self) -> u64 {
        1u64 << self.dont_care_bits()
    }

    /// Mask in the form CAN controllers expect it: a set bit has to match.
    pub fn acceptance_mask(&self, width: u32) -> u32 {
        !self.mask & width_mask(width)
    }

    /// Renders the filter MSB first, `X` marking a don't care bit. Widths
    /// beyond 32 bit are clamped.
    pub fn pattern(&self, width: u32) -> String {
        (0..width.min(MAX_ID_WIDTH))
            .rev()
            .map(|bit| {
                if (self.mask >> bit) & 1 == 1 {
                    'X'
                } else if (self.value >> bit) & 1 == 1 {
                    '1'
                } else {
                    '0'
                }
            })
            .collect()
    }
}

/// Identifiers a filter lets through although they are not part of the group
/// it was synthesized for.
///
/// Singletons get an exact filter and never pass anything else. Duplicated
/// identifiers count as separate entries, so the count saturates at zero.
pub fn pass_count(filter: &Filter, group_len: usize) -> u64 {
    if group_len > 1 {
        filter.accepted_count().saturating_sub(group_len as u64)
    } else {
        0
    }
}

/// Synthesizes the narrowest filter accepting every identifier of `group`,
/// returning it with its pass-through count.
pub fn synthesize(group: &[u32]) -> (Filter, u64) {
    debug_assert!(!group.is_empty(), "can't synthesize a filter for an empty group");
    synthesize_from(group.iter().copied())
}

pub(crate) fn synthesize_from<I>(ids: I) -> (Filter, u64)
where
    I: IntoIterator<Item = u32>,
{
    let (value, spread, len) = ids
        .into_iter()
        .fold((u32::MAX, 0u32, 0usize), |(and, or, len), id| {
            (and & id, or | id, len + 1)
        });
    let filter = Filter::new(spread ^ value, value);
    (filter, pass_count(&filter, len))
}

/// The filters of a partition, one per group, and their summed cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterBank {
    filters: Vec<Filter>,
    pass_counts: Vec<u64>,
    cost: u64,
}

impl FilterBank {
    pub fn synthesize<G: AsRef<[u32]>>(groups: &[G]) -> Self {
        let (filters, pass_counts): (Vec<Filter>, Vec<u64>) =
            groups.iter().map(|group| synthesize(group.as_ref())).unzip();
        let cost = pass_counts.iter().sum();
        Self {
            filters,
            pass_counts,
            cost,
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn pass_counts(&self) -> &[u64] {
        &self.pass_counts
    }

    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn into_parts(self) -> (Vec<Filter>, Vec<u64>, u64) {
        (self.filters, self.pass_counts, self.cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_is_exact() {
        for id in [0, 0x2, 0x7FF, 0x1FFF_FFFF] {
            let (filter, pass) = synthesize(&[id]);
            assert_eq!(filter.mask(), 0);
            assert_eq!(filter.value(), id);
            assert_eq!(pass, 0);
        }
    }

    #[test]
    fn mask_marks_differing_bits() {
        let (filter, pass) = synthesize(&[0x3F, 0x15]);
        assert_eq!(filter.value(), 0x15);
        assert_eq!(filter.mask(), 0x2A);
        assert_eq!(filter.pattern(11), "00000X1X1X1");
        assert_eq!(pass, 6);
    }

    #[test]
    fn adjacent_ids_have_no_slack() {
        let (filter, pass) = synthesize(&[0x18004100, 0x18004101]);
        assert_eq!(filter.pattern(29), "1100000000000010000010000000X");
        assert_eq!(pass, 0);
    }

    #[test]
    fn pattern_is_clamped_to_32_bit() {
        let filter = Filter::new(0x8000_0000, 0x1);
        assert_eq!(filter.pattern(40), format!("X{}1", "0".repeat(30)));
        assert_eq!(filter.pattern(0), "");
    }

    #[test]
    fn accepts_whole_group() {
        let group = [0x100, 0x123, 0x1F0, 0x0AA];
        let (filter, _) = synthesize(&group);
        assert!(group.iter().all(|&id| filter.accepts(id)));
    }

    #[test]
    fn duplicates_never_go_negative() {
        let (filter, pass) = synthesize(&[0x55, 0x55]);
        assert_eq!(filter.mask(), 0);
        assert_eq!(pass, 0);
    }

    #[test]
    fn acceptance_mask_is_inverted() {
        let filter = Filter::new(0x2A, 0x15);
        assert_eq!(filter.acceptance_mask(11), 0x7D5);
        assert_eq!(Filter::exact(0x15).acceptance_mask(11), 0x7FF);
    }

    #[test]
    fn bank_sums_group_costs() {
        let bank = FilterBank::synthesize(&[vec![0x3F, 0x15], vec![0x2]]);
        assert_eq!(bank.filters().len(), 2);
        assert_eq!(bank.pass_counts(), &[6, 0]);
        assert_eq!(bank.cost(), 6);
    }
}
