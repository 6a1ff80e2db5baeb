use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Jurisdiction;

/// Age amount parameters for one jurisdiction and year.
///
/// The credit base is `max_credit`, reduced by `reduction_rate` for every
/// dollar of income above `income_threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeCredit {
    pub max_credit: Decimal,
    pub income_threshold: Decimal,
    pub reduction_rate: Decimal,
}

/// Non-refundable credit amounts for one jurisdiction and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCreditAmounts {
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,
    pub basic_amount: Decimal,
    pub age_credit: AgeCredit,
}

/// Government benefit reference figures for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitReferenceAmounts {
    pub tax_year: i32,
    /// Maximum pensionable earnings (the CPP wage ceiling).
    pub ceiling_earnings: Decimal,
    /// Maximum CPP monthly amount at age 65.
    pub cpp_max_monthly: Decimal,
    /// Maximum OAS monthly amount at age 65.
    pub oas_max_monthly: Decimal,
    /// Net income above which the OAS recovery tax applies.
    pub oas_recovery_threshold: Decimal,
    pub oas_recovery_rate: Decimal,
}
