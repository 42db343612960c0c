use super::types::Mortgage;

/// Standard amortized monthly payment. Degenerate inputs resolve to 0.
pub fn monthly_payment(principal: f64, annual_rate: f64, term_years: u32) -> f64 {
    if principal <= 0.0 || term_years == 0 {
        return 0.0;
    }
    let months = (term_years * 12) as f64;
    if annual_rate <= 0.0 {
        return principal / months;
    }
    let i = annual_rate / 12.0;
    principal * i / (1.0 - (1.0 + i).powf(-months))
}

/// Closed-form balance after `years_elapsed` years of payments; 0 once
/// elapsed reaches the term. Zero-rate mortgages reduce linearly.
pub fn remaining_balance(principal: f64, annual_rate: f64, term_years: u32, years_elapsed: u32) -> f64 {
    if principal <= 0.0 || term_years == 0 {
        return 0.0;
    }
    if years_elapsed >= term_years {
        return 0.0;
    }
    let total_months = (term_years * 12) as f64;
    let elapsed_months = (years_elapsed * 12) as f64;
    if annual_rate <= 0.0 {
        return principal * (1.0 - elapsed_months / total_months);
    }
    let i = annual_rate / 12.0;
    let growth_full = (1.0 + i).powf(total_months);
    let growth_elapsed = (1.0 + i).powf(elapsed_months);
    principal * (growth_full - growth_elapsed) / (growth_full - 1.0)
}

impl Mortgage {
    pub fn monthly_payment(&self) -> f64 {
        self.monthly_payment_override
            .unwrap_or_else(|| monthly_payment(self.original_balance, self.annual_rate, self.term_years))
    }

    /// Outstanding balance during `year`, zeroed from the scheduled
    /// payoff year onward.
    pub fn balance_for_year(&self, year: i32) -> f64 {
        if let Some(payoff) = self.payoff_year
            && year >= payoff
        {
            return 0.0;
        }
        self.scheduled_balance(year)
    }

    /// Balance ignoring any scheduled payoff; the payoff year's lump is
    /// exactly this amount.
    pub fn scheduled_balance(&self, year: i32) -> f64 {
        let elapsed = year - self.origination_year;
        if elapsed < 0 {
            return 0.0;
        }
        remaining_balance(
            self.original_balance,
            self.annual_rate,
            self.term_years,
            elapsed as u32,
        )
    }

    /// Whether the regular payment stream is still running in `year`.
    pub fn payment_active(&self, year: i32) -> bool {
        let elapsed = year - self.origination_year;
        if elapsed < 0 || elapsed >= self.term_years as i32 {
            return false;
        }
        match self.payoff_year {
            Some(payoff) => year < payoff,
            None => true,
        }
    }
}
