use serde::{Deserialize, Serialize};

use crate::models::{ClassificationStatus, ClassifiedItem};

/// Aggregate sovereignty score for one scan.
///
/// Derived, never stored: recomputed from the classified list whenever
/// the list changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SovereigntyScore {
    /// Total apps considered
    pub total: usize,
    /// Per-status counts
    pub counts: StatusCounts,
    /// Qualitative bucket derived from the FOSS percentage
    pub level: SovereigntyLevel,
}

/// How many apps landed in each status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub foss: usize,
    pub proprietary: usize,
    pub unknown: usize,
    pub pending: usize,
    pub ignored: usize,
}

impl StatusCounts {
    pub fn get(&self, status: ClassificationStatus) -> usize {
        match status {
            ClassificationStatus::Foss => self.foss,
            ClassificationStatus::Proprietary => self.proprietary,
            ClassificationStatus::Unknown => self.unknown,
            ClassificationStatus::Pending => self.pending,
            ClassificationStatus::Ignored => self.ignored,
        }
    }
}

/// Qualitative sovereignty bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SovereigntyLevel {
    /// FOSS share >= 80%
    Sovereign,
    /// FOSS share >= 40%
    Transitioning,
    /// Everything else (including an empty device)
    Captured,
}

impl SovereigntyLevel {
    /// Thresholds are boundary-inclusive: exactly 80% is Sovereign,
    /// exactly 40% is Transitioning.
    pub fn from_foss_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            SovereigntyLevel::Sovereign
        } else if percentage >= 40.0 {
            SovereigntyLevel::Transitioning
        } else {
            SovereigntyLevel::Captured
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SovereigntyLevel::Sovereign => "Sovereign",
            SovereigntyLevel::Transitioning => "Transitioning",
            SovereigntyLevel::Captured => "Captured",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SovereigntyLevel::Sovereign => "Most of this device runs free software",
            SovereigntyLevel::Transitioning => "Good progress, proprietary apps remain",
            SovereigntyLevel::Captured => "This device mostly runs proprietary software",
        }
    }
}

impl SovereigntyScore {
    /// Pure aggregation over a classified list. Always defined: an empty
    /// list scores 0% across the board and lands in Captured.
    pub fn from_items(items: &[ClassifiedItem]) -> Self {
        let mut counts = StatusCounts::default();
        for item in items {
            match item.status {
                ClassificationStatus::Foss => counts.foss += 1,
                ClassificationStatus::Proprietary => counts.proprietary += 1,
                ClassificationStatus::Unknown => counts.unknown += 1,
                ClassificationStatus::Pending => counts.pending += 1,
                ClassificationStatus::Ignored => counts.ignored += 1,
            }
        }

        let total = items.len();
        let level =
            SovereigntyLevel::from_foss_percentage(percentage_of(counts.foss, total));

        Self {
            total,
            counts,
            level,
        }
    }

    /// Share of apps with the given status, in percent. Zero when the
    /// device has no apps at all - no division-by-zero surprises.
    pub fn percentage(&self, status: ClassificationStatus) -> f64 {
        percentage_of(self.counts.get(status), self.total)
    }

    pub fn foss_percentage(&self) -> f64 {
        self.percentage(ClassificationStatus::Foss)
    }
}

fn percentage_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstalledPackage;

    fn items_with(foss: usize, other: usize) -> Vec<ClassifiedItem> {
        let mut items = Vec::new();
        for i in 0..foss {
            let pkg = InstalledPackage::new(format!("org.foss.app{}", i), "app");
            items.push(ClassifiedItem::new(&pkg, ClassificationStatus::Foss, 0));
        }
        for i in 0..other {
            let pkg = InstalledPackage::new(format!("com.prop.app{}", i), "app");
            items.push(ClassifiedItem::new(
                &pkg,
                ClassificationStatus::Proprietary,
                1,
            ));
        }
        items
    }

    #[test]
    fn empty_device_scores_zero_without_panicking() {
        let score = SovereigntyScore::from_items(&[]);

        assert_eq!(score.total, 0);
        assert_eq!(score.level, SovereigntyLevel::Captured);
        assert_eq!(score.percentage(ClassificationStatus::Foss), 0.0);
        assert_eq!(score.percentage(ClassificationStatus::Proprietary), 0.0);
        assert_eq!(score.percentage(ClassificationStatus::Unknown), 0.0);
        assert_eq!(score.percentage(ClassificationStatus::Pending), 0.0);
        assert_eq!(score.percentage(ClassificationStatus::Ignored), 0.0);
    }

    #[test]
    fn exactly_eighty_percent_is_sovereign() {
        // 4 of 5 = 80.0% on the nose
        let score = SovereigntyScore::from_items(&items_with(4, 1));
        assert_eq!(score.foss_percentage(), 80.0);
        assert_eq!(score.level, SovereigntyLevel::Sovereign);
    }

    #[test]
    fn just_under_eighty_is_transitioning() {
        assert_eq!(
            SovereigntyLevel::from_foss_percentage(79.999),
            SovereigntyLevel::Transitioning
        );
        assert_eq!(
            SovereigntyLevel::from_foss_percentage(40.0),
            SovereigntyLevel::Transitioning
        );
    }

    #[test]
    fn just_under_forty_is_captured() {
        assert_eq!(
            SovereigntyLevel::from_foss_percentage(39.999),
            SovereigntyLevel::Captured
        );
        assert_eq!(
            SovereigntyLevel::from_foss_percentage(0.0),
            SovereigntyLevel::Captured
        );
    }

    #[test]
    fn counts_track_every_status() {
        let pkg = InstalledPackage::new("a.b.c", "app");
        let items = vec![
            ClassifiedItem::new(&pkg, ClassificationStatus::Foss, 0),
            ClassifiedItem::new(&pkg, ClassificationStatus::Proprietary, 2),
            ClassifiedItem::new(&pkg, ClassificationStatus::Unknown, 0),
            ClassifiedItem::new(&pkg, ClassificationStatus::Pending, 0),
            ClassifiedItem::new(&pkg, ClassificationStatus::Ignored, 0),
        ];
        let score = SovereigntyScore::from_items(&items);

        assert_eq!(score.total, 5);
        assert_eq!(score.counts.foss, 1);
        assert_eq!(score.counts.proprietary, 1);
        assert_eq!(score.counts.unknown, 1);
        assert_eq!(score.counts.pending, 1);
        assert_eq!(score.counts.ignored, 1);
        assert_eq!(score.percentage(ClassificationStatus::Foss), 20.0);
    }
}
