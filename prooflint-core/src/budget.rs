//! Sequential token-budget allocation across a batch of properties.

/// Hard per-conversation ceiling imposed by the service, regardless of any
/// configured budget. Some endpoints advertise more but reject requests
/// above this.
pub const MAX_CONTEXT_LENGTH: u64 = 100_000;

/// Ceiling for the next property's conversation, or `None` when no budget
/// is configured at all (an unconfigured ceiling must not synthesize an
/// artificial cap; the service's own limit still applies server-side).
///
/// `tokens_used` is the actual consumption of every prior property in the
/// run, threaded in by the caller. Properties are processed in extraction
/// order, so earlier properties can starve later ones when a total budget
/// is set.
pub fn ceiling_for_next(
    max_tokens_total: Option<u64>,
    max_tokens_per_property: Option<u64>,
    tokens_used: u64,
) -> Option<u64> {
    match (max_tokens_total, max_tokens_per_property) {
        (None, None) => None,
        (None, Some(per_property)) => Some(per_property.min(MAX_CONTEXT_LENGTH)),
        (Some(total), None) => Some(total.saturating_sub(tokens_used).min(MAX_CONTEXT_LENGTH)),
        (Some(total), Some(per_property)) => Some(
            per_property
                .min(total.saturating_sub(tokens_used))
                .min(MAX_CONTEXT_LENGTH),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_when_nothing_configured() {
        assert_eq!(ceiling_for_next(None, None, 12_345), None);
    }

    #[test]
    fn per_property_only() {
        assert_eq!(ceiling_for_next(None, Some(100), 0), Some(100));
        // Prior consumption is irrelevant without a total budget.
        assert_eq!(ceiling_for_next(None, Some(100), 1_000_000), Some(100));
        assert_eq!(
            ceiling_for_next(None, Some(10_000_000), 0),
            Some(MAX_CONTEXT_LENGTH)
        );
    }

    #[test]
    fn total_only_shrinks_with_consumption() {
        assert_eq!(ceiling_for_next(Some(5_000), None, 0), Some(5_000));
        assert_eq!(ceiling_for_next(Some(5_000), None, 4_000), Some(1_000));
        assert_eq!(ceiling_for_next(Some(5_000), None, 5_000), Some(0));
        // Overconsumption saturates instead of wrapping.
        assert_eq!(ceiling_for_next(Some(5_000), None, 9_000), Some(0));
        assert_eq!(
            ceiling_for_next(Some(10_000_000), None, 0),
            Some(MAX_CONTEXT_LENGTH)
        );
    }

    #[test]
    fn both_take_the_minimum() {
        assert_eq!(ceiling_for_next(Some(5_000), Some(100), 0), Some(100));
        assert_eq!(ceiling_for_next(Some(5_000), Some(100), 4_950), Some(50));
        assert_eq!(
            ceiling_for_next(Some(10_000_000), Some(10_000_000), 0),
            Some(MAX_CONTEXT_LENGTH)
        );
    }
}
