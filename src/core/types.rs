use serde::Serialize;

/// Account tax treatment. Closed set; withdrawal ordering works on
/// `WithdrawalSource` buckets, not on these directly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccountKind {
    Taxable,
    TaxDeferred,
    TaxFree,
    HealthSavings,
    Cash,
    Education,
    Other,
}

impl AccountKind {
    /// Kinds that never incur an early-withdrawal penalty.
    pub fn unrestricted(self) -> bool {
        matches!(
            self,
            AccountKind::Cash | AccountKind::Taxable | AccountKind::Education | AccountKind::Other
        )
    }

    /// Bucket this kind belongs to in the priority order. Cash is drawn
    /// before any bucket and maps to none.
    pub fn source(self) -> Option<WithdrawalSource> {
        match self {
            AccountKind::Taxable | AccountKind::Education | AccountKind::Other => {
                Some(WithdrawalSource::Taxable)
            }
            AccountKind::TaxDeferred => Some(WithdrawalSource::TaxDeferred),
            AccountKind::TaxFree => Some(WithdrawalSource::TaxFree),
            AccountKind::HealthSavings => Some(WithdrawalSource::HealthSavings),
            AccountKind::Cash => None,
        }
    }
}

/// Withdrawal-order bucket. Taxable pools the taxable-like kinds
/// (taxable, education, other).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WithdrawalSource {
    Taxable,
    TaxDeferred,
    TaxFree,
    HealthSavings,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Owner {
    Primary,
    Spouse,
    Joint,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub name: String,
    pub kind: AccountKind,
    pub owner: Owner,
    pub balance: f64,
    /// Taxable accounts only; never exceeds balance. None means unknown
    /// (the waterfall assumes a 60% basis fraction).
    pub cost_basis: Option<f64>,
    pub employer_plan: bool,
    pub separated_at_55: bool,
    pub annual_contribution: f64,
    pub contribution_start_age: Option<u32>,
    pub contribution_end_age: Option<u32>,
}

/// Per-item inflation policy. `General` tracks the plan-wide inflation
/// assumption.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Inflation {
    Fixed,
    General,
    Rate(f64),
}

#[derive(Debug, Clone)]
pub struct ExpenseItem {
    pub name: String,
    pub category: String,
    pub annual_amount: f64,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub inflation: Inflation,
}

#[derive(Debug, Clone)]
pub struct Mortgage {
    pub original_balance: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    pub origination_year: i32,
    pub monthly_payment_override: Option<f64>,
    pub payoff_year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Housing {
    pub property_tax_annual: f64,
    pub insurance_annual: f64,
    /// Falls back to the general inflation rate when unset.
    pub inflation_rate: Option<f64>,
    pub mortgage: Option<Mortgage>,
}

/// A claiming-age-adjusted benefit (primary or spouse).
#[derive(Debug, Clone)]
pub struct BenefitStream {
    /// Monthly amount at the full/reference claiming age.
    pub monthly_at_full: f64,
    pub claiming_age: u32,
    pub cola_rate: f64,
}

#[derive(Debug, Clone)]
pub struct Pension {
    pub annual_benefit: f64,
    pub start_age: u32,
    pub cola_rate: f64,
}

#[derive(Debug, Clone)]
pub struct IncomeItem {
    pub name: String,
    pub annual_amount: f64,
    pub start_age: u32,
    pub end_age: Option<u32>,
    pub inflates: bool,
    pub taxable: bool,
}

#[derive(Debug, Clone)]
pub struct Employment {
    pub gross_annual: f64,
    /// Effective combined tax rate on employment income.
    pub tax_rate: f64,
    pub growth_rate: f64,
}

/// One-off cash flow at a calendar year. Positive = expense,
/// negative = windfall.
#[derive(Debug, Clone)]
pub struct LifeEvent {
    pub name: String,
    pub year: i32,
    pub amount: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SurplusRouting {
    Spend,
    ToCash,
    ToTaxable,
}

#[derive(Debug, Clone)]
pub struct Assumptions {
    pub accumulation_return: f64,
    /// Distinct post-FI return; accumulation rate applies when unset.
    pub fi_return: Option<f64>,
    pub inflation_rate: f64,
    pub ordinary_tax_rate: f64,
    pub state_ordinary_tax_rate: f64,
    pub capital_gains_tax_rate: f64,
    pub state_capital_gains_tax_rate: f64,
    pub withdrawal_order: Vec<WithdrawalSource>,
    pub early_penalty_rate: f64,
    pub hsa_penalty_rate: f64,
    pub rule_of_55: bool,
    pub terminal_target: Option<f64>,
    pub surplus_routing: SurplusRouting,
    /// What-if scaling of recurring spending; never scales a payoff lump.
    pub spending_multiplier: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilingStatus {
    Single,
    MarriedJoint,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub current_age: u32,
    pub spouse_age: Option<u32>,
    pub life_expectancy: u32,
    pub filing: FilingStatus,
    /// Explicit plan-start calendar year; the engine never reads a clock.
    pub as_of_year: i32,
}

/// Optional overrides applied to a cloned snapshot before a run.
#[derive(Debug, Clone, Default)]
pub struct WhatIf {
    pub spending_multiplier: Option<f64>,
    pub accumulation_return: Option<f64>,
    pub primary_claiming_age: Option<u32>,
    pub spouse_claiming_age: Option<u32>,
}

/// One immutable input snapshot; every run is a pure function of this.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub profile: Profile,
    /// Target FI age driving the accumulating/FI phase switch.
    pub fi_age: u32,
    pub accounts: Vec<Account>,
    pub employment: Option<Employment>,
    pub spouse_employment: Option<Employment>,
    /// Years the spouse keeps working past the primary's FI age.
    pub spouse_extra_years: u32,
    pub income_items: Vec<IncomeItem>,
    pub primary_benefit: Option<BenefitStream>,
    pub spouse_benefit: Option<BenefitStream>,
    pub pension: Option<Pension>,
    pub expenses: Vec<ExpenseItem>,
    pub housing: Option<Housing>,
    pub life_events: Vec<LifeEvent>,
    pub assumptions: Assumptions,
    pub what_if: Option<WhatIf>,
}

impl PlanInput {
    /// Apply the what-if block to a clone, leaving the base untouched.
    pub fn resolved(&self) -> PlanInput {
        let mut plan = self.clone();
        if let Some(what_if) = plan.what_if.take() {
            if let Some(m) = what_if.spending_multiplier {
                plan.assumptions.spending_multiplier = m;
            }
            if let Some(r) = what_if.accumulation_return {
                plan.assumptions.accumulation_return = r;
            }
            if let Some(age) = what_if.primary_claiming_age
                && let Some(benefit) = plan.primary_benefit.as_mut()
            {
                benefit.claiming_age = age;
            }
            if let Some(age) = what_if.spouse_claiming_age
                && let Some(benefit) = plan.spouse_benefit.as_mut()
            {
                benefit.claiming_age = age;
            }
        }
        plan
    }

    pub fn with_fi_age(&self, fi_age: u32) -> PlanInput {
        let mut plan = self.resolved();
        plan.fi_age = fi_age;
        plan
    }

    /// Calendar year in which the FI phase begins.
    pub fn fi_start_year(&self) -> i32 {
        let years_until = self.fi_age.saturating_sub(self.profile.current_age);
        self.profile.as_of_year + years_until as i32
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Accumulating,
    Fi,
}

/// One simulated year. Plain data, safe to serialize.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: i32,
    pub age: u32,
    pub phase: Phase,
    pub expenses: f64,
    pub passive_income: f64,
    pub employment_income: f64,
    pub contributions: f64,
    pub gap: f64,
    pub gross_withdrawal: f64,
    pub penalty: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub withdrawal_sources: Option<String>,
    pub end_taxable: f64,
    pub end_tax_deferred: f64,
    pub end_tax_free: f64,
    pub end_health_savings: f64,
    pub end_cash: f64,
    pub end_education: f64,
    pub end_other: f64,
    pub net_worth: f64,
    pub shortfall: bool,
    pub mortgage_balance: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub fi_number: f64,
    pub net_worth: f64,
    pub funding_gap: f64,
    pub last_solvent_age: Option<u32>,
    pub shortfall: bool,
    pub first_shortfall_age: Option<u32>,
    pub surplus_at_life_expectancy: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Moderate,
    Tight,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortfallGuidance {
    pub depletion_age: Option<u32>,
    pub spending_cut_needed: Option<f64>,
    pub additional_savings_needed: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub achievable_age: Option<u32>,
    pub already_fi: bool,
    pub confidence: Option<ConfidenceTier>,
    pub buffer_years: u32,
    pub years_until_fi: Option<u32>,
    pub shortfall: Option<ShortfallGuidance>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    OnTrack,
    AheadOfGoal,
    BehindGoal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayBenefitLever {
    pub from_age: u32,
    pub sufficient: bool,
}

/// Corrective levers vs. the user's target age. Levers are independent,
/// each from a single-variable re-probe; they are never combined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalGuidance {
    pub status: GoalStatus,
    pub target_age: u32,
    pub achievable_age: Option<u32>,
    pub surplus_at_life_expectancy: Option<f64>,
    pub spending_increase_room: Option<f64>,
    pub extra_buffer_years: Option<u32>,
    pub spending_cut_percent: Option<f64>,
    pub spending_cut_amount: Option<f64>,
    pub required_return: Option<f64>,
    pub delay_benefits: Option<DelayBenefitLever>,
}
