pub mod stage2_eligibility;
pub mod stage3_normalize;
pub mod stage4_impute;
pub mod stage5_rescale;
pub mod stage6_index;
pub mod stage7_report;
