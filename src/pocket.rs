//! Discretionary spending, or "pocket money": what is left of the month's
//! income after expenses, the savings goal and active budget allocations.

use std::fmt::Display;

use serde::Serialize;

use crate::Error;

/// The income and savings goal the pocket money is worked out from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PocketMoneySettings {
    monthly_income: f64,
    savings_goal: f64,
}

impl PocketMoneySettings {
    /// Create settings from a monthly income and a monthly savings goal.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `monthly_income` is not a finite number greater than zero,
    /// - `savings_goal` is not a finite number of at least zero.
    pub fn new(monthly_income: f64, savings_goal: f64) -> Result<Self, Error> {
        if !(monthly_income.is_finite() && monthly_income > 0.0) {
            return Err(Error::InvalidIncome(monthly_income));
        }

        if !(savings_goal.is_finite() && savings_goal >= 0.0) {
            return Err(Error::InvalidSavingsGoal(savings_goal));
        }

        Ok(Self {
            monthly_income,
            savings_goal,
        })
    }

    pub fn monthly_income(&self) -> f64 {
        self.monthly_income
    }

    pub fn savings_goal(&self) -> f64 {
        self.savings_goal
    }
}

/// How comfortable the remaining pocket money is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PocketTier {
    /// More than 1000 left.
    Comfortable,
    /// More than 500 left.
    Moderate,
    /// Something left.
    Limited,
    /// Nothing left.
    Warning,
}

impl PocketTier {
    /// Pick the tier for a (floored) pocket money amount.
    pub fn for_amount(pocket: f64) -> Self {
        if pocket > 1000.0 {
            Self::Comfortable
        } else if pocket > 500.0 {
            Self::Moderate
        } else if pocket > 0.0 {
            Self::Limited
        } else {
            Self::Warning
        }
    }
}

impl Display for PocketTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Comfortable => "comfortable",
            Self::Moderate => "moderate",
            Self::Limited => "limited",
            Self::Warning => "warning",
        };

        f.write_str(label)
    }
}

/// Each step of the pocket money calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PocketMoney {
    pub after_expenses: f64,
    pub after_savings: f64,
    /// May be negative; see [PocketMoney::is_deficit].
    pub after_budgets: f64,
    /// `after_budgets` floored at zero.
    pub pocket: f64,
    pub tier: PocketTier,
}

impl PocketMoney {
    /// Work out the pocket money for the current period.
    ///
    /// `expenses` is the period's total spending and `budget_allocation` the
    /// summed maximum of the budgets active now.
    pub fn calculate(settings: &PocketMoneySettings, expenses: f64, budget_allocation: f64) -> Self {
        let after_expenses = settings.monthly_income - expenses;
        let after_savings = after_expenses - settings.savings_goal;
        let after_budgets = after_savings - budget_allocation;
        let pocket = after_budgets.max(0.0);

        Self {
            after_expenses,
            after_savings,
            after_budgets,
            pocket,
            tier: PocketTier::for_amount(pocket),
        }
    }

    /// Whether the commitments exceed the income.
    pub fn is_deficit(&self) -> bool {
        self.after_budgets < 0.0
    }

    /// Whether the commitments use up the income exactly.
    pub fn is_break_even(&self) -> bool {
        self.after_budgets == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::{PocketMoney, PocketMoneySettings, PocketTier};
    use crate::Error;

    #[test]
    fn settings_reject_non_positive_income() {
        assert_eq!(
            PocketMoneySettings::new(0.0, 0.0),
            Err(Error::InvalidIncome(0.0))
        );
        assert_eq!(
            PocketMoneySettings::new(-10.0, 0.0),
            Err(Error::InvalidIncome(-10.0))
        );
        assert!(PocketMoneySettings::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn settings_reject_negative_savings_goal() {
        assert_eq!(
            PocketMoneySettings::new(100.0, -1.0),
            Err(Error::InvalidSavingsGoal(-1.0))
        );
        assert!(PocketMoneySettings::new(100.0, 0.0).is_ok());
    }

    #[test]
    fn comfortable_pocket_money() {
        let settings = PocketMoneySettings::new(2000.0, 200.0).unwrap();

        let money = PocketMoney::calculate(&settings, 300.0, 400.0);

        assert_eq!(money.after_expenses, 1700.0);
        assert_eq!(money.after_savings, 1500.0);
        assert_eq!(money.after_budgets, 1100.0);
        assert_eq!(money.pocket, 1100.0);
        assert_eq!(money.tier, PocketTier::Comfortable);
        assert!(!money.is_deficit());
    }

    #[test]
    fn deficit_is_floored_but_distinguishable() {
        let settings = PocketMoneySettings::new(500.0, 0.0).unwrap();

        let money = PocketMoney::calculate(&settings, 600.0, 0.0);

        assert_eq!(money.after_expenses, -100.0);
        assert_eq!(money.after_budgets, -100.0);
        assert_eq!(money.pocket, 0.0);
        assert_eq!(money.tier, PocketTier::Warning);
        assert!(money.is_deficit());
        assert!(!money.is_break_even());
    }

    #[test]
    fn break_even_is_not_a_deficit() {
        let settings = PocketMoneySettings::new(500.0, 100.0).unwrap();

        let money = PocketMoney::calculate(&settings, 300.0, 100.0);

        assert_eq!(money.pocket, 0.0);
        assert_eq!(money.tier, PocketTier::Warning);
        assert!(money.is_break_even());
        assert!(!money.is_deficit());
    }

    #[test]
    fn pocket_is_never_negative() {
        let settings = PocketMoneySettings::new(1000.0, 250.0).unwrap();

        for expenses in [0.0, 10.0, 999.0, 1000.0, 5000.0] {
            for allocation in [0.0, 50.0, 750.0, 10_000.0] {
                let money = PocketMoney::calculate(&settings, expenses, allocation);
                assert!(money.pocket >= 0.0);
                assert_eq!(money.pocket, money.after_budgets.max(0.0));
            }
        }
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(PocketTier::for_amount(1000.01), PocketTier::Comfortable);
        assert_eq!(PocketTier::for_amount(1000.0), PocketTier::Moderate);
        assert_eq!(PocketTier::for_amount(500.0), PocketTier::Limited);
        assert_eq!(PocketTier::for_amount(0.01), PocketTier::Limited);
        assert_eq!(PocketTier::for_amount(0.0), PocketTier::Warning);
    }
}
