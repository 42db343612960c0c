use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::types::{
    Account, AccountKind, Assumptions, BenefitStream, Employment, ExpenseItem, FilingStatus,
    GoalGuidance, Housing, IncomeItem, Inflation, LifeEvent, Mortgage, Owner, Pension, Profile,
    SurplusRouting, WhatIf, WithdrawalSource,
};
use crate::core::{
    PlanInput, SearchResult, Summary, YearRecord, find_fi_age, goal_guidance, run_projection,
    summarize,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiAccountKind {
    Taxable,
    #[serde(alias = "taxDeferred", alias = "tax_deferred")]
    TaxDeferred,
    #[serde(alias = "taxFree", alias = "tax_free")]
    TaxFree,
    #[serde(alias = "healthSavings", alias = "health_savings", alias = "hsa")]
    HealthSavings,
    Cash,
    Education,
    Other,
}

impl From<ApiAccountKind> for AccountKind {
    fn from(value: ApiAccountKind) -> Self {
        match value {
            ApiAccountKind::Taxable => AccountKind::Taxable,
            ApiAccountKind::TaxDeferred => AccountKind::TaxDeferred,
            ApiAccountKind::TaxFree => AccountKind::TaxFree,
            ApiAccountKind::HealthSavings => AccountKind::HealthSavings,
            ApiAccountKind::Cash => AccountKind::Cash,
            ApiAccountKind::Education => AccountKind::Education,
            ApiAccountKind::Other => AccountKind::Other,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiOwner {
    #[default]
    Primary,
    Spouse,
    Joint,
}

impl From<ApiOwner> for Owner {
    fn from(value: ApiOwner) -> Self {
        match value {
            ApiOwner::Primary => Owner::Primary,
            ApiOwner::Spouse => Owner::Spouse,
            ApiOwner::Joint => Owner::Joint,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiWithdrawalSource {
    Taxable,
    #[serde(alias = "taxDeferred", alias = "tax_deferred")]
    TaxDeferred,
    #[serde(alias = "taxFree", alias = "tax_free")]
    TaxFree,
    #[serde(alias = "healthSavings", alias = "health_savings", alias = "hsa")]
    HealthSavings,
}

impl From<ApiWithdrawalSource> for WithdrawalSource {
    fn from(value: ApiWithdrawalSource) -> Self {
        match value {
            ApiWithdrawalSource::Taxable => WithdrawalSource::Taxable,
            ApiWithdrawalSource::TaxDeferred => WithdrawalSource::TaxDeferred,
            ApiWithdrawalSource::TaxFree => WithdrawalSource::TaxFree,
            ApiWithdrawalSource::HealthSavings => WithdrawalSource::HealthSavings,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiFilingStatus {
    #[default]
    Single,
    #[serde(alias = "marriedJoint", alias = "married_joint", alias = "married")]
    MarriedJoint,
}

impl From<ApiFilingStatus> for FilingStatus {
    fn from(value: ApiFilingStatus) -> Self {
        match value {
            ApiFilingStatus::Single => FilingStatus::Single,
            ApiFilingStatus::MarriedJoint => FilingStatus::MarriedJoint,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSurplusRouting {
    #[default]
    Spend,
    #[serde(alias = "toCash", alias = "to_cash", alias = "cash")]
    ToCash,
    #[serde(alias = "toTaxable", alias = "to_taxable", alias = "invest")]
    ToTaxable,
}

impl From<ApiSurplusRouting> for SurplusRouting {
    fn from(value: ApiSurplusRouting) -> Self {
        match value {
            ApiSurplusRouting::Spend => SurplusRouting::Spend,
            ApiSurplusRouting::ToCash => SurplusRouting::ToCash,
            ApiSurplusRouting::ToTaxable => SurplusRouting::ToTaxable,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiInflationMode {
    Fixed,
    #[default]
    General,
    #[serde(alias = "rate")]
    Custom,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AccountPayload {
    name: String,
    kind: Option<ApiAccountKind>,
    owner: ApiOwner,
    balance: f64,
    cost_basis: Option<f64>,
    employer_plan: bool,
    separated_at_55: bool,
    annual_contribution: f64,
    contribution_start_age: Option<u32>,
    contribution_end_age: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EmploymentPayload {
    gross_annual: f64,
    tax_rate: f64,
    growth_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IncomePayload {
    name: String,
    annual_amount: f64,
    start_age: u32,
    end_age: Option<u32>,
    inflates: bool,
    taxable: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BenefitPayload {
    monthly_at_full: f64,
    claiming_age: Option<u32>,
    cola_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PensionPayload {
    annual_benefit: f64,
    start_age: u32,
    cola_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ExpensePayload {
    name: String,
    category: String,
    annual_amount: f64,
    start_year: Option<i32>,
    end_year: Option<i32>,
    inflation: ApiInflationMode,
    inflation_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MortgagePayload {
    original_balance: f64,
    annual_rate: f64,
    term_years: u32,
    origination_year: i32,
    monthly_payment: Option<f64>,
    payoff_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct HousingPayload {
    property_tax_annual: f64,
    insurance_annual: f64,
    inflation_rate: Option<f64>,
    mortgage: Option<MortgagePayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LifeEventPayload {
    name: String,
    year: i32,
    amount: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WhatIfPayload {
    spending_multiplier: Option<f64>,
    accumulation_return: Option<f64>,
    primary_claiming_age: Option<u32>,
    spouse_claiming_age: Option<u32>,
}

/// Wire shape for one plan evaluation. Rates arrive in percent, ages in
/// whole years; everything except `currentAge` and `asOfYear` defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    current_age: Option<u32>,
    spouse_age: Option<u32>,
    life_expectancy: Option<u32>,
    filing: ApiFilingStatus,
    as_of_year: Option<i32>,
    fi_age: Option<u32>,
    target_fi_age: Option<u32>,

    accounts: Vec<AccountPayload>,
    employment: Option<EmploymentPayload>,
    spouse_employment: Option<EmploymentPayload>,
    spouse_extra_years: Option<u32>,
    income_items: Vec<IncomePayload>,
    primary_benefit: Option<BenefitPayload>,
    spouse_benefit: Option<BenefitPayload>,
    pension: Option<PensionPayload>,
    expenses: Vec<ExpensePayload>,
    housing: Option<HousingPayload>,
    life_events: Vec<LifeEventPayload>,

    accumulation_return: Option<f64>,
    fi_return: Option<f64>,
    inflation_rate: Option<f64>,
    ordinary_tax_rate: Option<f64>,
    state_ordinary_tax_rate: Option<f64>,
    capital_gains_tax_rate: Option<f64>,
    state_capital_gains_tax_rate: Option<f64>,
    withdrawal_order: Option<Vec<ApiWithdrawalSource>>,
    early_penalty_rate: Option<f64>,
    hsa_penalty_rate: Option<f64>,
    rule_of_55: Option<bool>,
    terminal_target: Option<f64>,
    surplus_routing: ApiSurplusRouting,
    spending_multiplier: Option<f64>,

    what_if: Option<WhatIfPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    years: Vec<YearRecord>,
    summary: Summary,
    search: SearchResult,
    guidance: Option<GoalGuidance>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

const DEFAULT_LIFE_EXPECTANCY: u32 = 90;
const DEFAULT_CLAIMING_AGE: u32 = 67;
const DEFAULT_EARLY_PENALTY_PERCENT: f64 = 10.0;
const DEFAULT_HSA_PENALTY_PERCENT: f64 = 20.0;

fn percent_rate(name: &str, value: f64) -> Result<f64, String> {
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{name} must be between 0 and 100"));
    }
    Ok(value / 100.0)
}

fn signed_rate(name: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() || value <= -100.0 {
        return Err(format!("{name} must be > -100"));
    }
    Ok(value / 100.0)
}

fn nonnegative(name: &str, value: f64) -> Result<f64, String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{name} must be >= 0"));
    }
    Ok(value)
}

fn claiming_age(name: &str, value: Option<u32>) -> Result<u32, String> {
    let age = value.unwrap_or(DEFAULT_CLAIMING_AGE);
    if !(62..=70).contains(&age) {
        return Err(format!("{name} must be between 62 and 70"));
    }
    Ok(age)
}

fn build_benefit(name: &str, payload: &BenefitPayload) -> Result<BenefitStream, String> {
    Ok(BenefitStream {
        monthly_at_full: nonnegative(&format!("{name}.monthlyAtFull"), payload.monthly_at_full)?,
        claiming_age: claiming_age(&format!("{name}.claimingAge"), payload.claiming_age)?,
        cola_rate: signed_rate(&format!("{name}.colaRate"), payload.cola_rate)?,
    })
}

fn build_employment(name: &str, payload: &EmploymentPayload) -> Result<Employment, String> {
    Ok(Employment {
        gross_annual: nonnegative(&format!("{name}.grossAnnual"), payload.gross_annual)?,
        tax_rate: percent_rate(&format!("{name}.taxRate"), payload.tax_rate)?,
        growth_rate: signed_rate(&format!("{name}.growthRate"), payload.growth_rate)?,
    })
}

fn build_account(payload: &AccountPayload) -> Result<Account, String> {
    if payload.name.trim().is_empty() {
        return Err("every account needs a name".to_string());
    }
    let Some(kind) = payload.kind else {
        return Err(format!("account '{}' is missing a kind", payload.name));
    };
    let balance = nonnegative(&format!("account '{}' balance", payload.name), payload.balance)?;
    if let Some(basis) = payload.cost_basis
        && !(0.0..=balance).contains(&basis)
    {
        return Err(format!(
            "account '{}' costBasis must be between 0 and its balance",
            payload.name
        ));
    }
    if let (Some(start), Some(end)) = (payload.contribution_start_age, payload.contribution_end_age)
        && end < start
    {
        return Err(format!(
            "account '{}' contributionEndAge must be >= contributionStartAge",
            payload.name
        ));
    }
    Ok(Account {
        name: payload.name.clone(),
        kind: kind.into(),
        owner: payload.owner.into(),
        balance,
        cost_basis: payload.cost_basis,
        employer_plan: payload.employer_plan,
        separated_at_55: payload.separated_at_55,
        annual_contribution: nonnegative(
            &format!("account '{}' annualContribution", payload.name),
            payload.annual_contribution,
        )?,
        contribution_start_age: payload.contribution_start_age,
        contribution_end_age: payload.contribution_end_age,
    })
}

fn build_housing(payload: &HousingPayload) -> Result<Housing, String> {
    let mortgage = match &payload.mortgage {
        Some(m) => {
            if m.original_balance > 0.0 && m.term_years == 0 {
                return Err("mortgage.termYears must be > 0".to_string());
            }
            if let Some(payoff) = m.payoff_year
                && payoff < m.origination_year
            {
                return Err("mortgage.payoffYear must be >= originationYear".to_string());
            }
            Some(Mortgage {
                original_balance: nonnegative("mortgage.originalBalance", m.original_balance)?,
                annual_rate: percent_rate("mortgage.annualRate", m.annual_rate)?,
                term_years: m.term_years,
                origination_year: m.origination_year,
                monthly_payment_override: m.monthly_payment,
                payoff_year: m.payoff_year,
            })
        }
        None => None,
    };
    Ok(Housing {
        property_tax_annual: nonnegative("housing.propertyTaxAnnual", payload.property_tax_annual)?,
        insurance_annual: nonnegative("housing.insuranceAnnual", payload.insurance_annual)?,
        inflation_rate: payload
            .inflation_rate
            .map(|r| signed_rate("housing.inflationRate", r))
            .transpose()?,
        mortgage,
    })
}

fn build_expense(payload: &ExpensePayload) -> Result<ExpenseItem, String> {
    if let (Some(start), Some(end)) = (payload.start_year, payload.end_year)
        && end < start
    {
        return Err(format!(
            "expense '{}' endYear must be >= startYear",
            payload.name
        ));
    }
    let inflation = match payload.inflation {
        ApiInflationMode::Fixed => Inflation::Fixed,
        ApiInflationMode::General => Inflation::General,
        ApiInflationMode::Custom => {
            let Some(rate) = payload.inflation_rate else {
                return Err(format!(
                    "expense '{}' uses custom inflation but has no inflationRate",
                    payload.name
                ));
            };
            Inflation::Rate(signed_rate(
                &format!("expense '{}' inflationRate", payload.name),
                rate,
            )?)
        }
    };
    Ok(ExpenseItem {
        name: payload.name.clone(),
        category: payload.category.clone(),
        annual_amount: nonnegative(
            &format!("expense '{}' annualAmount", payload.name),
            payload.annual_amount,
        )?,
        start_year: payload.start_year,
        end_year: payload.end_year,
        inflation,
    })
}

fn build_plan(payload: &PlanPayload) -> Result<PlanInput, String> {
    let Some(current_age) = payload.current_age else {
        return Err("currentAge is required".to_string());
    };
    let Some(as_of_year) = payload.as_of_year else {
        return Err("asOfYear is required".to_string());
    };
    let life_expectancy = payload.life_expectancy.unwrap_or(DEFAULT_LIFE_EXPECTANCY);
    if life_expectancy <= current_age {
        return Err("lifeExpectancy must be > currentAge".to_string());
    }
    if let Some(fi_age) = payload.fi_age
        && !(current_age..=life_expectancy).contains(&fi_age)
    {
        return Err("fiAge must be between currentAge and lifeExpectancy".to_string());
    }
    if payload.spouse_age.is_none()
        && (payload.spouse_benefit.is_some() || payload.spouse_employment.is_some())
    {
        return Err("spouseAge is required when spouse income or benefits are set".to_string());
    }

    let accounts = payload
        .accounts
        .iter()
        .map(build_account)
        .collect::<Result<Vec<_>, _>>()?;
    let expenses = payload
        .expenses
        .iter()
        .map(build_expense)
        .collect::<Result<Vec<_>, _>>()?;

    let ordinary_percent = payload.ordinary_tax_rate.unwrap_or(0.0);
    let state_ordinary_percent = payload.state_ordinary_tax_rate.unwrap_or(0.0);
    let early_penalty_percent = payload
        .early_penalty_rate
        .unwrap_or(DEFAULT_EARLY_PENALTY_PERCENT);
    let ordinary_tax_rate = percent_rate("ordinaryTaxRate", ordinary_percent)?;
    let state_ordinary_tax_rate = percent_rate("stateOrdinaryTaxRate", state_ordinary_percent)?;
    let early_penalty_rate = percent_rate("earlyPenaltyRate", early_penalty_percent)?;
    let hsa_penalty_rate = percent_rate(
        "hsaPenaltyRate",
        payload
            .hsa_penalty_rate
            .unwrap_or(DEFAULT_HSA_PENALTY_PERCENT),
    )?;
    // The gross-up divides by 1 - rate, so stacked rates must stay under
    // 100. Summed in percent space, where boundary payloads add up exactly.
    if ordinary_percent + state_ordinary_percent + early_penalty_percent >= 100.0 {
        return Err(
            "combined ordinary tax and penalty rates must be below 100".to_string(),
        );
    }

    let withdrawal_order = match &payload.withdrawal_order {
        Some(order) if order.is_empty() => {
            return Err("withdrawalOrder cannot be empty".to_string());
        }
        Some(order) => {
            let mut seen = Vec::new();
            for source in order {
                if seen.contains(source) {
                    return Err("withdrawalOrder cannot repeat a source".to_string());
                }
                seen.push(*source);
            }
            order.iter().map(|s| WithdrawalSource::from(*s)).collect()
        }
        None => vec![
            WithdrawalSource::Taxable,
            WithdrawalSource::TaxDeferred,
            WithdrawalSource::TaxFree,
        ],
    };

    let spending_multiplier = payload.spending_multiplier.unwrap_or(1.0);
    if !spending_multiplier.is_finite() || spending_multiplier < 0.0 {
        return Err("spendingMultiplier must be >= 0".to_string());
    }

    let assumptions = Assumptions {
        accumulation_return: signed_rate(
            "accumulationReturn",
            payload.accumulation_return.unwrap_or(0.0),
        )?,
        fi_return: payload
            .fi_return
            .map(|r| signed_rate("fiReturn", r))
            .transpose()?,
        inflation_rate: signed_rate("inflationRate", payload.inflation_rate.unwrap_or(0.0))?,
        ordinary_tax_rate,
        state_ordinary_tax_rate,
        capital_gains_tax_rate: percent_rate(
            "capitalGainsTaxRate",
            payload.capital_gains_tax_rate.unwrap_or(0.0),
        )?,
        state_capital_gains_tax_rate: percent_rate(
            "stateCapitalGainsTaxRate",
            payload.state_capital_gains_tax_rate.unwrap_or(0.0),
        )?,
        withdrawal_order,
        early_penalty_rate,
        hsa_penalty_rate,
        rule_of_55: payload.rule_of_55.unwrap_or(false),
        terminal_target: payload.terminal_target,
        surplus_routing: payload.surplus_routing.into(),
        spending_multiplier,
    };

    let what_if = match &payload.what_if {
        Some(w) => Some(WhatIf {
            spending_multiplier: w.spending_multiplier,
            accumulation_return: w
                .accumulation_return
                .map(|r| signed_rate("whatIf.accumulationReturn", r))
                .transpose()?,
            primary_claiming_age: w
                .primary_claiming_age
                .map(|age| claiming_age("whatIf.primaryClaimingAge", Some(age)))
                .transpose()?,
            spouse_claiming_age: w
                .spouse_claiming_age
                .map(|age| claiming_age("whatIf.spouseClaimingAge", Some(age)))
                .transpose()?,
        }),
        None => None,
    };

    Ok(PlanInput {
        profile: Profile {
            current_age,
            spouse_age: payload.spouse_age,
            life_expectancy,
            filing: payload.filing.into(),
            as_of_year,
        },
        fi_age: payload.fi_age.unwrap_or(life_expectancy),
        accounts,
        employment: payload
            .employment
            .as_ref()
            .map(|e| build_employment("employment", e))
            .transpose()?,
        spouse_employment: payload
            .spouse_employment
            .as_ref()
            .map(|e| build_employment("spouseEmployment", e))
            .transpose()?,
        spouse_extra_years: payload.spouse_extra_years.unwrap_or(0),
        income_items: payload
            .income_items
            .iter()
            .map(|item| {
                Ok::<_, String>(IncomeItem {
                    name: item.name.clone(),
                    annual_amount: nonnegative(
                        &format!("income '{}' annualAmount", item.name),
                        item.annual_amount,
                    )?,
                    start_age: item.start_age,
                    end_age: item.end_age,
                    inflates: item.inflates,
                    taxable: item.taxable,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        primary_benefit: payload
            .primary_benefit
            .as_ref()
            .map(|b| build_benefit("primaryBenefit", b))
            .transpose()?,
        spouse_benefit: payload
            .spouse_benefit
            .as_ref()
            .map(|b| build_benefit("spouseBenefit", b))
            .transpose()?,
        pension: payload
            .pension
            .as_ref()
            .map(|p| {
                Ok::<_, String>(Pension {
                    annual_benefit: nonnegative("pension.annualBenefit", p.annual_benefit)?,
                    start_age: p.start_age,
                    cola_rate: signed_rate("pension.colaRate", p.cola_rate)?,
                })
            })
            .transpose()?,
        expenses,
        housing: payload.housing.as_ref().map(build_housing).transpose()?,
        life_events: payload
            .life_events
            .iter()
            .map(|e| LifeEvent {
                name: e.name.clone(),
                year: e.year,
                amount: e.amount,
            })
            .collect(),
        assumptions,
        what_if,
    })
}

fn plan_response_from_payload(payload: PlanPayload) -> Result<PlanResponse, String> {
    let explicit_fi_age = payload.fi_age;
    let target_age = payload.target_fi_age;

    let mut plan = build_plan(&payload)?;
    let search = find_fi_age(&plan);
    // Without an explicit FI age, project the searched one.
    if explicit_fi_age.is_none() {
        plan.fi_age = search
            .achievable_age
            .unwrap_or(plan.profile.life_expectancy);
    }

    let years = run_projection(&plan);
    let summary = summarize(&plan, &years);
    let guidance = target_age.map(|age| goal_guidance(&plan, age));

    Ok(PlanResponse {
        years,
        summary,
        search,
        guidance,
    })
}

/// Evaluate a JSON plan payload and return the response as pretty JSON.
/// Shared by the CLI `run` subcommand and the HTTP handlers.
pub fn evaluate_plan_json(json: &str) -> Result<String, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid plan JSON payload: {e}"))?;
    let response = plan_response_from_payload(payload)?;
    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("FI plan HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/plan");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_get_handler(Query(payload): Query<PlanPayload>) -> Response {
    plan_handler_impl(payload).await
}

async fn plan_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    plan_handler_impl(payload).await
}

async fn plan_handler_impl(payload: PlanPayload) -> Response {
    match plan_response_from_payload(payload) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
