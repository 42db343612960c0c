use super::engine::{resolve_expenses, run_projection, run_projection_to};
use super::types::{
    Account, AccountKind, ConfidenceTier, DelayBenefitLever, GoalGuidance, GoalStatus, Owner,
    PlanInput, SearchResult, ShortfallGuidance,
};

/// Years past the stated life expectancy a plan must stay solvent.
pub(crate) const SAFETY_BUFFER_YEARS: u32 = 5;
/// How far past life expectancy the buffer probe looks.
pub(crate) const BUFFER_PROBE_YEARS: u32 = 20;

const HIGH_BUFFER_YEARS: u32 = 10;
const MODERATE_BUFFER_YEARS: u32 = 5;

const BISECTION_STEPS: usize = 32;
const RETURN_PROBE_STEP: f64 = 0.0025;
const RETURN_PROBE_CEILING: f64 = 0.10;
const SAVINGS_PROBE_CEILING: f64 = 1_000_000.0;
const LATEST_CLAIMING_AGE: u32 = 70;

/// A hypothesized FI age passes when the run stays solvent for the safety
/// buffer beyond life expectancy and meets the terminal target, if any.
pub fn is_viable(plan: &PlanInput, fi_age: u32) -> bool {
    let candidate = plan.with_fi_age(fi_age);
    let life_expectancy = candidate.profile.life_expectancy;
    let records = run_projection_to(&candidate, life_expectancy + SAFETY_BUFFER_YEARS);
    if records.iter().any(|r| r.shortfall) {
        return false;
    }
    if let Some(target) = candidate.assumptions.terminal_target
        && let Some(at_le) = records.iter().find(|r| r.age == life_expectancy)
        && at_le.net_worth < target
    {
        return false;
    }
    true
}

/// How many years past life expectancy funds actually last, capped at the
/// probe horizon.
pub fn buffer_years(plan: &PlanInput, fi_age: u32) -> u32 {
    let candidate = plan.with_fi_age(fi_age);
    let life_expectancy = candidate.profile.life_expectancy;
    let records = run_projection_to(&candidate, life_expectancy + BUFFER_PROBE_YEARS);
    match records.iter().find(|r| r.shortfall) {
        Some(record) if record.age <= life_expectancy => 0,
        Some(record) => record.age - 1 - life_expectancy,
        None => BUFFER_PROBE_YEARS,
    }
}

/// Viable ages always carry the five-year safety buffer, so ages reported
/// by the search bottom out at Moderate; Tight labels buffers below that
/// floor and stays in the output vocabulary for callers probing raw
/// buffer counts.
fn confidence_for(buffer: u32) -> ConfidenceTier {
    if buffer >= HIGH_BUFFER_YEARS {
        ConfidenceTier::High
    } else if buffer >= MODERATE_BUFFER_YEARS {
        ConfidenceTier::Moderate
    } else {
        ConfidenceTier::Tight
    }
}

/// Smallest viable FI age between now and life expectancy.
///
/// Relies on viability being monotonic in age: once solvent at age A,
/// solvent at every later age. Claiming cliffs can violate this on
/// adversarial inputs; the search reports the bracket it converged to.
pub fn find_fi_age(plan: &PlanInput) -> SearchResult {
    let plan = plan.resolved();
    let current_age = plan.profile.current_age;
    let latest = plan
        .profile
        .life_expectancy
        .saturating_sub(1)
        .max(current_age);

    if is_viable(&plan, current_age) {
        let buffer = buffer_years(&plan, current_age);
        return SearchResult {
            achievable_age: Some(current_age),
            already_fi: true,
            confidence: Some(confidence_for(buffer)),
            buffer_years: buffer,
            years_until_fi: Some(0),
            shortfall: None,
        };
    }

    if !is_viable(&plan, latest) {
        return SearchResult {
            achievable_age: None,
            already_fi: false,
            confidence: None,
            buffer_years: 0,
            years_until_fi: None,
            shortfall: Some(shortfall_guidance(&plan, latest)),
        };
    }

    // Invariant: lo fails, hi passes.
    let mut lo = current_age;
    let mut hi = latest;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if is_viable(&plan, mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    let buffer = buffer_years(&plan, hi);
    SearchResult {
        achievable_age: Some(hi),
        already_fi: false,
        confidence: Some(confidence_for(buffer)),
        buffer_years: buffer,
        years_until_fi: Some(hi - current_age),
        shortfall: None,
    }
}

fn savings_probe_account(annual: f64) -> Account {
    Account {
        name: "additional savings".to_string(),
        kind: AccountKind::Taxable,
        owner: Owner::Primary,
        balance: 0.0,
        cost_basis: Some(0.0),
        employer_plan: false,
        separated_at_55: false,
        annual_contribution: annual,
        contribution_start_age: None,
        contribution_end_age: None,
    }
}

/// Corrective numbers for a plan that fails even at the latest FI age:
/// where the money runs out, and the cut or extra savings that would
/// close the gap. Each number comes from re-probing the simulation.
fn shortfall_guidance(plan: &PlanInput, latest: u32) -> ShortfallGuidance {
    let best_case = plan.with_fi_age(latest);
    let depletion_age = run_projection(&best_case)
        .iter()
        .find(|r| r.shortfall)
        .map(|r| r.age);

    let with_spending_kept = |keep: f64| {
        let mut probe = plan.clone();
        probe.assumptions.spending_multiplier *= keep;
        probe
    };
    let spending_cut_needed = if is_viable(&with_spending_kept(0.0), latest) {
        // Invariant: lo passes, hi fails.
        let mut lo = 0.0_f64;
        let mut hi = 1.0_f64;
        for _ in 0..BISECTION_STEPS {
            let mid = (lo + hi) / 2.0;
            if is_viable(&with_spending_kept(mid), latest) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(1.0 - lo)
    } else {
        None
    };

    let with_savings = |annual: f64| {
        let mut probe = plan.clone();
        probe.accounts.push(savings_probe_account(annual));
        probe
    };
    let additional_savings_needed = if is_viable(&with_savings(SAVINGS_PROBE_CEILING), latest) {
        // Invariant: lo fails, hi passes.
        let mut lo = 0.0_f64;
        let mut hi = SAVINGS_PROBE_CEILING;
        for _ in 0..BISECTION_STEPS {
            let mid = (lo + hi) / 2.0;
            if is_viable(&with_savings(mid), latest) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        Some(hi)
    } else {
        None
    };

    ShortfallGuidance {
        depletion_age,
        spending_cut_needed,
        additional_savings_needed,
    }
}

/// Compare the user's target FI age against the searched achievable age
/// and quantify the slack or the gap. Behind-goal levers are evaluated one
/// variable at a time, never combined.
pub fn goal_guidance(plan: &PlanInput, target_age: u32) -> GoalGuidance {
    let plan = plan.resolved();
    let search = find_fi_age(&plan);
    let annual_spending = resolve_expenses(&plan, plan.profile.as_of_year).recurring;

    let mut guidance = GoalGuidance {
        status: GoalStatus::BehindGoal,
        target_age,
        achievable_age: search.achievable_age,
        surplus_at_life_expectancy: None,
        spending_increase_room: None,
        extra_buffer_years: None,
        spending_cut_percent: None,
        spending_cut_amount: None,
        required_return: None,
        delay_benefits: None,
    };

    match search.achievable_age {
        Some(achievable) if target_age == achievable => {
            guidance.status = GoalStatus::OnTrack;
            let records = run_projection(&plan.with_fi_age(target_age));
            if !records.iter().any(|r| r.shortfall) {
                guidance.surplus_at_life_expectancy = records.last().map(|r| r.net_worth);
            }
        }
        Some(achievable) if target_age > achievable => {
            guidance.status = GoalStatus::AheadOfGoal;
            guidance.spending_increase_room =
                Some(spending_increase_room(&plan, target_age) * annual_spending);
            guidance.extra_buffer_years = Some(
                buffer_years(&plan, target_age).saturating_sub(buffer_years(&plan, achievable)),
            );
        }
        _ => {
            guidance.spending_cut_percent = spending_cut_for(&plan, target_age);
            guidance.spending_cut_amount = guidance
                .spending_cut_percent
                .map(|cut| cut * annual_spending);
            guidance.spending_cut_percent = guidance.spending_cut_percent.map(|cut| cut * 100.0);
            guidance.required_return = required_return_for(&plan, target_age);
            guidance.delay_benefits = delay_benefits_lever(&plan, target_age);
        }
    }
    guidance
}

/// Largest spending multiple (above 1.0, capped at 3x) that keeps the
/// target age viable, expressed as the extra fraction of spending.
fn spending_increase_room(plan: &PlanInput, target_age: u32) -> f64 {
    let with_multiple = |multiple: f64| {
        let mut probe = plan.clone();
        probe.assumptions.spending_multiplier *= multiple;
        probe
    };
    if is_viable(&with_multiple(3.0), target_age) {
        return 2.0;
    }
    // Invariant: lo passes, hi fails.
    let mut lo = 1.0_f64;
    let mut hi = 3.0_f64;
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / 2.0;
        if is_viable(&with_multiple(mid), target_age) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo - 1.0
}

/// Spending cut (as a fraction) that would make the target age viable on
/// its own, or None when no cut suffices.
fn spending_cut_for(plan: &PlanInput, target_age: u32) -> Option<f64> {
    let with_spending_kept = |keep: f64| {
        let mut probe = plan.clone();
        probe.assumptions.spending_multiplier *= keep;
        probe
    };
    if !is_viable(&with_spending_kept(0.0), target_age) {
        return None;
    }
    // Invariant: lo passes, hi fails.
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    for _ in 0..BISECTION_STEPS {
        let mid = (lo + hi) / 2.0;
        if is_viable(&with_spending_kept(mid), target_age) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(1.0 - lo)
}

/// Smallest return assumption, probed upward in quarter-point steps, that
/// makes the target age viable on its own.
fn required_return_for(plan: &PlanInput, target_age: u32) -> Option<f64> {
    let base = plan.assumptions.accumulation_return;
    let mut delta = RETURN_PROBE_STEP;
    while delta <= RETURN_PROBE_CEILING {
        let mut probe = plan.clone();
        probe.assumptions.accumulation_return = base + delta;
        probe.assumptions.fi_return = probe.assumptions.fi_return.map(|r| r + delta);
        if is_viable(&probe, target_age) {
            return Some(base + delta);
        }
        delta += RETURN_PROBE_STEP;
    }
    None
}

/// Delaying every benefit claim to 70, offered only when some stream is
/// claiming earlier than that.
fn delay_benefits_lever(plan: &PlanInput, target_age: u32) -> Option<DelayBenefitLever> {
    let claims_early = |stream: &Option<super::types::BenefitStream>| {
        stream
            .as_ref()
            .is_some_and(|b| b.claiming_age < LATEST_CLAIMING_AGE)
    };
    if !claims_early(&plan.primary_benefit) && !claims_early(&plan.spouse_benefit) {
        return None;
    }
    let mut probe = plan.clone();
    if let Some(benefit) = probe.primary_benefit.as_mut() {
        benefit.claiming_age = benefit.claiming_age.max(LATEST_CLAIMING_AGE);
    }
    if let Some(benefit) = probe.spouse_benefit.as_mut() {
        benefit.claiming_age = benefit.claiming_age.max(LATEST_CLAIMING_AGE);
    }
    Some(DelayBenefitLever {
        from_age: LATEST_CLAIMING_AGE,
        sufficient: is_viable(&probe, target_age),
    })
}
