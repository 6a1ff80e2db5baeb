mod accounts;
mod jurisdiction;
mod reference;
mod results;
mod scenario;
mod tax_bracket;

pub use accounts::{AccountBalances, AccountClass, Withdrawals};
pub use jurisdiction::{Jurisdiction, Province};
pub use reference::{AgeCredit, BenefitReferenceAmounts, TaxCreditAmounts};
pub use results::{CalculationResults, Phase, YearIncome, YearResult};
pub use scenario::{
    AccountDefinition, Assets, Assumptions, BasicInfo, BenefitElection, EmploymentIncome,
    ExpenseChange, Expenses, IncomeSources, OtherIncome, Scenario, TaxableAccountDefinition,
};
pub use tax_bracket::TaxBracket;
