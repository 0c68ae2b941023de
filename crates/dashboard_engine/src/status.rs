use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health of a budget envelope, judged on the share of budget still available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Healthy,
    Warning,
    Critical,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Healthy => "healthy",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "healthy" => Ok(BudgetStatus::Healthy),
            "warning" => Ok(BudgetStatus::Warning),
            "critical" => Ok(BudgetStatus::Critical),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusInfo {
    pub status: BudgetStatus,
    /// Available budget in percent of the total. May be negative when over budget.
    pub percentage: f64,
}

const HEALTHY_ABOVE: f64 = 50.0;
const WARNING_ABOVE: f64 = 20.0;

/// Classifies a credit by `available / budget`.
///
/// Above 50% is healthy, above 20% up to and including 50% is warning, 20% and
/// below is critical. A zero budget is reported as healthy with 0%.
pub fn classify(available: f64, budget: f64) -> StatusInfo {
    if budget == 0.0 || !budget.is_finite() || !available.is_finite() {
        return StatusInfo {
            status: BudgetStatus::Healthy,
            percentage: 0.0,
        };
    }

    let percentage = available / budget * 100.0;
    let status = if percentage > HEALTHY_ABOVE {
        BudgetStatus::Healthy
    } else if percentage > WARNING_ABOVE {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Critical
    };

    StatusInfo { status, percentage }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_example_credits() {
        let first = classify(1000.0 - 200.0_f64.abs(), 1000.0);
        assert_eq!(first.status, BudgetStatus::Healthy);
        assert!((first.percentage - 80.0).abs() < 1e-9);

        let second = classify(2000.0 - 2200.0_f64.abs(), 2000.0);
        assert_eq!(second.status, BudgetStatus::Critical);
        assert!((second.percentage + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(50.0, 100.0).status, BudgetStatus::Warning);
        assert_eq!(classify(50.01, 100.0).status, BudgetStatus::Healthy);
        assert_eq!(classify(20.0, 100.0).status, BudgetStatus::Critical);
        assert_eq!(classify(20.01, 100.0).status, BudgetStatus::Warning);
    }

    #[test]
    fn test_classify_zero_budget_is_defined() {
        let info = classify(0.0, 0.0);
        assert_eq!(info.status, BudgetStatus::Healthy);
        assert_eq!(info.percentage, 0.0);

        let info = classify(-300.0, 0.0);
        assert!(info.percentage.is_finite());
    }

    #[test]
    fn test_classify_is_monotonic() {
        fn rank(status: BudgetStatus) -> u8 {
            match status {
                BudgetStatus::Critical => 0,
                BudgetStatus::Warning => 1,
                BudgetStatus::Healthy => 2,
            }
        }

        let mut previous = rank(classify(-500.0, 1000.0).status);
        for available in (-500..=1000).step_by(5) {
            let current = rank(classify(available as f64, 1000.0).status);
            assert!(current >= previous, "status regressed at available={available}");
            previous = current;
        }
    }

    #[test]
    fn test_status_parses_case_insensitive() {
        assert_eq!("Critical".parse::<BudgetStatus>(), Ok(BudgetStatus::Critical));
        assert!("unknown".parse::<BudgetStatus>().is_err());
    }
}
