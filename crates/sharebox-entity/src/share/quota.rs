//! Quota planning for item uploads.
//!
//! Pure arithmetic turning (current share size, configured limits, declared
//! upload size) into a write window or a pass/fail decision. No I/O happens
//! here; backends must consult the planner before transferring a byte.

/// Which configured limit bounds a write window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaLimit {
    /// The per-share aggregate limit.
    Share,
    /// The per-item limit.
    Item,
}

/// A quota decision made before any byte is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaViolation {
    /// The share has no remaining capacity, or the declared size does not
    /// fit in what remains.
    ShareFull,
    /// The declared size exceeds the per-item limit.
    ItemTooLarge,
}

/// The maximum number of bytes a single upload may write given current
/// aggregate usage and the configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteWindow {
    /// Bytes the transfer may write (`None` = unlimited).
    pub allowed: Option<u64>,
    /// The limit that produced `allowed`.
    pub bounded_by: Option<QuotaLimit>,
}

impl WriteWindow {
    /// Plan an upload.
    ///
    /// `max_share_bytes` / `max_item_bytes` of 0 mean unlimited;
    /// `declared_size` of 0 means the caller does not know the size upfront.
    /// A declared size exactly equal to the window passes: an item that
    /// exactly fills remaining capacity is accepted.
    pub fn plan(
        share_size: u64,
        max_share_bytes: u64,
        max_item_bytes: u64,
        declared_size: u64,
    ) -> Result<Self, QuotaViolation> {
        let mut allowed: Option<u64> = None;
        let mut bounded_by: Option<QuotaLimit> = None;

        if max_share_bytes > 0 {
            if share_size >= max_share_bytes {
                return Err(QuotaViolation::ShareFull);
            }
            allowed = Some(max_share_bytes - share_size);
            bounded_by = Some(QuotaLimit::Share);
        }

        if max_item_bytes > 0 {
            if declared_size > max_item_bytes {
                return Err(QuotaViolation::ItemTooLarge);
            }
            if allowed.is_none_or(|a| max_item_bytes < a) {
                allowed = Some(max_item_bytes);
                bounded_by = Some(QuotaLimit::Item);
            }
        }

        if let Some(a) = allowed {
            if declared_size > a {
                return Err(match bounded_by {
                    Some(QuotaLimit::Item) => QuotaViolation::ItemTooLarge,
                    _ => QuotaViolation::ShareFull,
                });
            }
        }

        Ok(Self { allowed, bounded_by })
    }

    /// Byte bound for the transfer reader: one past the window, so an
    /// oversized source is detected without reading it to the end.
    pub fn read_limit(&self) -> Option<u64> {
        self.allowed.map(|a| a + 1)
    }

    /// Whether a completed transfer of `written` bytes overflowed the window.
    pub fn overflowed(&self, written: u64) -> bool {
        self.allowed.is_some_and(|a| written > a)
    }

    /// The violation to report when [`WriteWindow::overflowed`] is true.
    pub fn overflow_violation(&self) -> QuotaViolation {
        match self.bounded_by {
            Some(QuotaLimit::Item) => QuotaViolation::ItemTooLarge,
            _ => QuotaViolation::ShareFull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_unlimited_when_no_limits() {
        let window = WriteWindow::plan(123, 0, 0, 0).unwrap();
        assert_eq!(window.allowed, None);
        assert_eq!(window.read_limit(), None);
        assert!(!window.overflowed(u64::MAX));
    }

    #[test]
    fn test_declared_over_item_limit_fails_fast() {
        let err = WriteWindow::plan(0, 5 * MIB, 4 * MIB, 5 * MIB).unwrap_err();
        assert_eq!(err, QuotaViolation::ItemTooLarge);
    }

    #[test]
    fn test_full_share_fails_before_io() {
        let err = WriteWindow::plan(5 * MIB, 5 * MIB, 0, 1).unwrap_err();
        assert_eq!(err, QuotaViolation::ShareFull);
    }

    #[test]
    fn test_window_clamped_to_tighter_limit() {
        // Plenty of share capacity left: the item limit is tighter.
        let window = WriteWindow::plan(0, 5 * MIB, 4 * MIB, 3 * MIB).unwrap();
        assert_eq!(window.allowed, Some(4 * MIB));
        assert_eq!(window.bounded_by, Some(QuotaLimit::Item));

        // 3 MiB used, 2 MiB remain: the share limit is tighter.
        let window = WriteWindow::plan(3 * MIB, 5 * MIB, 4 * MIB, 0).unwrap();
        assert_eq!(window.allowed, Some(2 * MIB));
        assert_eq!(window.bounded_by, Some(QuotaLimit::Share));
    }

    #[test]
    fn test_declared_over_remaining_share_capacity() {
        let err = WriteWindow::plan(3 * MIB, 5 * MIB, 4 * MIB, 3 * MIB).unwrap_err();
        assert_eq!(err, QuotaViolation::ShareFull);
    }

    #[test]
    fn test_exactly_at_limit_passes() {
        let window = WriteWindow::plan(3 * MIB, 5 * MIB, 4 * MIB, 2 * MIB).unwrap();
        assert_eq!(window.allowed, Some(2 * MIB));
        assert!(!window.overflowed(2 * MIB));
        assert!(window.overflowed(2 * MIB + 1));
        assert_eq!(window.overflow_violation(), QuotaViolation::ShareFull);
    }

    #[test]
    fn test_read_limit_is_one_past_window() {
        let window = WriteWindow::plan(0, 0, 4 * MIB, 0).unwrap();
        assert_eq!(window.read_limit(), Some(4 * MIB + 1));
        assert_eq!(window.overflow_violation(), QuotaViolation::ItemTooLarge);
    }
}
