/// World Bank income classification used to build the eligibility set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IncomeGroup {
    Low,
    LowerMiddle,
    UpperMiddle,
    High,
}

impl IncomeGroup {
    /// Accepts World Bank labels ("Lower middle income", "Upper-middle-income")
    /// and the short codes (LIC, LMC, UMC, HIC).
    pub fn parse(raw: &str) -> Option<Self> {
        let norm = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['-', '_'], " ")
            .replace("economies", "")
            .replace("countries", "")
            .replace("income", "");
        let norm = norm.split_whitespace().collect::<Vec<_>>().join(" ");
        match norm.as_str() {
            "low" | "lic" | "l" => Some(IncomeGroup::Low),
            "lower middle" | "lmc" | "lm" => Some(IncomeGroup::LowerMiddle),
            "upper middle" | "umc" | "um" => Some(IncomeGroup::UpperMiddle),
            "high" | "hic" | "h" => Some(IncomeGroup::High),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IncomeGroup::Low => "low",
            IncomeGroup::LowerMiddle => "lower_middle",
            IncomeGroup::UpperMiddle => "upper_middle",
            IncomeGroup::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryRecord {
    pub iso_code: String,
    pub name: String,
    pub income_group: IncomeGroup,
    /// Row position in the classification table; the stable tie-break key.
    pub order: usize,
}
