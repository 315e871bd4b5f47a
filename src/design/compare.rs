use serde::Serialize;
use crate::models::DesignType;

/// Qualitative attributes of a design family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignProfile {
    pub design_type: DesignType,
    pub min_arms: u32,
    /// Subjects needed relative to a two-arm parallel study.
    pub relative_sample_size: f64,
    pub typical_duration_days: u32,
    pub requires_washout: bool,
    pub advantages: &'static [&'static str],
    pub disadvantages: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignComparison {
    pub first: DesignProfile,
    pub second: DesignProfile,
    /// Sample-size factor of `second` relative to `first`; below 1 means smaller.
    pub sample_size_ratio: f64,
    /// Typical duration of `second` minus `first`, in days.
    pub duration_difference_days: i64,
}

pub fn design_profile(design_type: DesignType) -> DesignProfile {
    match design_type {
        DesignType::Parallel => DesignProfile {
            design_type,
            min_arms: 1,
            relative_sample_size: 1.0,
            typical_duration_days: 28,
            requires_washout: false,
            advantages: &["Simple", "No carryover effects", "Suitable for long-term studies"],
            disadvantages: &["Larger sample size", "Between-subject variability"],
        },
        DesignType::Crossover => DesignProfile {
            design_type,
            min_arms: 2,
            relative_sample_size: 0.25,
            typical_duration_days: 56,
            requires_washout: true,
            advantages: &["Smaller sample size", "Within-subject comparison"],
            disadvantages: &["Carryover effects possible", "Longer duration", "Dropout risk"],
        },
        DesignType::Bioequivalence => DesignProfile {
            design_type,
            min_arms: 2,
            relative_sample_size: 0.25,
            typical_duration_days: 28,
            requires_washout: false,
            advantages: &["Accepted regulatory pathway for generics", "Log-scale equivalence margins"],
            disadvantages: &["Needs low within-subject variability", "Healthy-volunteer populations only"],
        },
    }
}

pub fn compare_design_types(first: DesignType, second: DesignType) -> DesignComparison {
    let first = design_profile(first);
    let second = design_profile(second);
    
    DesignComparison {
        sample_size_ratio: second.relative_sample_size / first.relative_sample_size,
        duration_difference_days: second.typical_duration_days as i64 - first.typical_duration_days as i64,
        first,
        second,
    }
}
