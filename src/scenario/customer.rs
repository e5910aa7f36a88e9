//! Customer types — fee schedule, usage model, churn, and the lead funnel.
//!
//! A customer type describes one product tier. Leads enter the funnel at the
//! first stage (sized by sales capacity), move through each stage after its
//! duration with its conversion rate, and become customers after the last
//! stage. Fees and COGS are uncertain quantities; funnel parameters are plain
//! numbers.
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ForecastError, ForecastResult},
    predicting::usage::UsagePredictor,
    scenario::validation::{
        validate_fraction, validate_non_negative, validate_positive, validate_unique_names,
    },
    uncertainty::UFloat,
};

/// One step of the lead-to-customer pipeline.
///
/// Fields
/// ------
/// - `name`: unique within the funnel.
/// - `duration_days`: time a lead spends in the stage before converting.
/// - `conversion_rate`: fraction of leads that move on to the next stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub name: String,
    #[serde(alias = "duration")]
    pub duration_days: f64,
    pub conversion_rate: f64,
}

/// Funnel stages plus the cost of generating leads for the first stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadConfig {
    pub stages: Vec<FunnelStage>,
    pub cost_per_ad_click: f64,
    pub qualified_lead_to_click_ratio: f64,
}

/// Cost of goods sold: a flat monthly amount plus a per-usage-unit amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cogs {
    pub monthly: UFloat,
    pub per_usage: UFloat,
}

/// CustomerType — one product tier and how customers of it are acquired,
/// billed, and lost.
///
/// Fields
/// ------
/// - `monthly_fee`, `setup_fee`, `usage_fee`: billed per active customer,
///   per new customer, and per usage unit respectively.
/// - `usage_predictor`: per-customer usage as a function of customer age.
/// - `fraction_of_leads`: share of leads routed to this tier; the shares of
///   all tiers in a scenario sum to one.
/// - `churn`: fraction of every cohort lost each month.
/// - `payment_months_behind`: billing lag; revenue in month `m` is what was
///   billed in `m - payment_months_behind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerType {
    pub name: String,
    pub monthly_fee: UFloat,
    pub setup_fee: UFloat,
    pub usage_fee: UFloat,
    pub usage_predictor: UsagePredictor,
    pub fraction_of_leads: f64,
    pub cogs: Cogs,
    pub lead_config: LeadConfig,
    pub churn: f64,
    pub payment_months_behind: u32,
}

impl CustomerType {
    /// Check every numeric field and the funnel layout.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidParameter`] for out-of-range rates, durations,
    ///   or costs.
    /// - [`ForecastError::DuplicateName`] for repeated stage names.
    pub fn validate(&self) -> ForecastResult<()> {
        let field = |suffix: &str| format!("{}.{suffix}", self.name);

        validate_fraction(&field("fraction_of_leads"), self.fraction_of_leads)?;
        validate_fraction(&field("churn"), self.churn)?;
        validate_non_negative(
            &field("lead_config.cost_per_ad_click"),
            self.lead_config.cost_per_ad_click,
        )?;
        validate_positive(
            &field("lead_config.qualified_lead_to_click_ratio"),
            self.lead_config.qualified_lead_to_click_ratio,
        )?;
        for stage in &self.lead_config.stages {
            let duration = field(&format!("{}.duration_days", stage.name));
            validate_non_negative(&duration, stage.duration_days)?;
            let conversion = field(&format!("{}.conversion_rate", stage.name));
            validate_fraction(&conversion, stage.conversion_rate)?;
        }
        let stage_names = self.lead_config.stages.iter().map(|s| s.name.as_str());
        validate_unique_names("funnel stage", stage_names)?;
        self.usage_predictor.validate(&self.name)
    }

    /// First funnel stage, if the funnel has any.
    pub fn entry_stage(&self) -> Option<&FunnelStage> {
        self.lead_config.stages.first()
    }

    /// Position of the named stage in the funnel.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::UnknownFunnelStage`] if no stage has that name.
    pub fn stage_index(&self, stage: &str) -> ForecastResult<usize> {
        self.lead_config.stages.iter().position(|s| s.name == stage).ok_or_else(|| {
            ForecastError::UnknownFunnelStage {
                customer_type: self.name.clone(),
                stage: stage.to_string(),
            }
        })
    }
}
