#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndicatorId {
    InsufficientFood,
    Inflation,
    Wasting,
    Reserves,
    DebtService,
    FoodSecurity,
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorDef {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub more_is_worse: bool,
    pub core: bool,
}

const INDICATORS: &[IndicatorDef] = &[
    IndicatorDef {
        key: "insufficient_food",
        label: "Insufficient Food Consumption (% of population)",
        unit: "%",
        more_is_worse: true,
        core: true,
    },
    IndicatorDef {
        key: "inflation",
        label: "Headline Inflation (%)",
        unit: "%",
        more_is_worse: true,
        core: true,
    },
    IndicatorDef {
        key: "wasting",
        label: "Prevalence of Wasting (% of children under 5)",
        unit: "%",
        more_is_worse: true,
        core: true,
    },
    IndicatorDef {
        key: "reserves_per_capita",
        label: "Total reserves minus gold (USD per capita)",
        unit: "USD",
        more_is_worse: false,
        core: false,
    },
    IndicatorDef {
        key: "debt_service_ratio",
        label: "External debt service (% of government expenditure)",
        unit: "%",
        more_is_worse: true,
        core: false,
    },
    IndicatorDef {
        key: "food_security_index",
        label: "Global Food Security Index (overall score)",
        unit: "score",
        more_is_worse: false,
        core: false,
    },
];

pub const CORE_INDICATORS: [IndicatorId; 3] = [
    IndicatorId::InsufficientFood,
    IndicatorId::Inflation,
    IndicatorId::Wasting,
];

pub const CONTEXT_INDICATORS: [IndicatorId; 3] = [
    IndicatorId::Reserves,
    IndicatorId::DebtService,
    IndicatorId::FoodSecurity,
];

impl IndicatorId {
    pub fn def(self) -> &'static IndicatorDef {
        let idx = match self {
            IndicatorId::InsufficientFood => 0,
            IndicatorId::Inflation => 1,
            IndicatorId::Wasting => 2,
            IndicatorId::Reserves => 3,
            IndicatorId::DebtService => 4,
            IndicatorId::FoodSecurity => 5,
        };
        &INDICATORS[idx]
    }

    pub fn key(self) -> &'static str {
        self.def().key
    }

    pub fn more_is_worse(self) -> bool {
        self.def().more_is_worse
    }
}

pub fn builtin_indicators() -> &'static [IndicatorDef] {
    INDICATORS
}
