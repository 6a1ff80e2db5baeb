use std::collections::{BTreeMap, HashMap};

use retire_core::{
    AgeCredit, BenefitReferenceAmounts, Jurisdiction, ProviderError, TaxBracket, TaxCreditAmounts,
    TaxDataProvider,
};
use rust_decimal::Decimal;

/// Reference tables held in memory after loading.
///
/// Lookups never fall back to another year; a missing table is reported as
/// [`ProviderError::NotFound`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    brackets: HashMap<(Jurisdiction, i32), Vec<TaxBracket>>,
    credits: HashMap<(Jurisdiction, i32), TaxCreditAmounts>,
    benefits: HashMap<i32, BenefitReferenceAmounts>,
    minimum_withdrawals: BTreeMap<u32, Decimal>,
}

impl InMemoryReferenceData {
    pub fn new(
        brackets: HashMap<(Jurisdiction, i32), Vec<TaxBracket>>,
        credits: HashMap<(Jurisdiction, i32), TaxCreditAmounts>,
        benefits: HashMap<i32, BenefitReferenceAmounts>,
        minimum_withdrawals: BTreeMap<u32, Decimal>,
    ) -> Self {
        Self {
            brackets,
            credits,
            benefits,
            minimum_withdrawals,
        }
    }

    fn credits_for(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<&TaxCreditAmounts, ProviderError> {
        self.credits
            .get(&(jurisdiction, tax_year))
            .ok_or_else(|| ProviderError::NotFound(format!("credits for {jurisdiction} {tax_year}")))
    }
}

impl TaxDataProvider for InMemoryReferenceData {
    fn list_tax_years(&self) -> Result<Vec<i32>, ProviderError> {
        let mut years: Vec<i32> = self.brackets.keys().map(|(_, year)| *year).collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    fn get_bracket_table(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, ProviderError> {
        self.brackets
            .get(&(jurisdiction, tax_year))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("brackets for {jurisdiction} {tax_year}")))
    }

    fn get_basic_credit(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Decimal, ProviderError> {
        Ok(self.credits_for(jurisdiction, tax_year)?.basic_amount)
    }

    fn get_age_credit(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<AgeCredit, ProviderError> {
        Ok(self.credits_for(jurisdiction, tax_year)?.age_credit.clone())
    }

    /// Rate for the nearest listed age at or below `age`. Ages past the end
    /// of the table use the last rate; ages before the first entry owe nothing.
    fn get_minimum_withdrawal_percentage(
        &self,
        age: u32,
    ) -> Result<Decimal, ProviderError> {
        if self.minimum_withdrawals.is_empty() {
            return Err(ProviderError::NotFound("minimum withdrawal table".to_string()));
        }
        Ok(self
            .minimum_withdrawals
            .range(..=age)
            .next_back()
            .map_or(Decimal::ZERO, |(_, pct)| *pct))
    }

    fn get_benefit_reference_amounts(
        &self,
        tax_year: i32,
    ) -> Result<BenefitReferenceAmounts, ProviderError> {
        self.benefits
            .get(&tax_year)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("benefit amounts for {tax_year}")))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use retire_core::Province;
    use rust_decimal_macros::dec;

    use super::*;

    fn bracket(
        jurisdiction: Jurisdiction,
        max_income: Option<Decimal>,
        tax_rate: Decimal,
    ) -> TaxBracket {
        TaxBracket {
            tax_year: 2025,
            jurisdiction,
            max_income,
            tax_rate,
        }
    }

    fn sample() -> InMemoryReferenceData {
        let ontario = Jurisdiction::Provincial(Province::Ontario);
        let brackets = HashMap::from([
            (
                (Jurisdiction::Federal, 2025),
                vec![
                    bracket(Jurisdiction::Federal, Some(dec!(57375)), dec!(0.15)),
                    bracket(Jurisdiction::Federal, None, dec!(0.205)),
                ],
            ),
            ((ontario, 2025), vec![bracket(ontario, None, dec!(0.0505))]),
            ((ontario, 2024), vec![bracket(ontario, None, dec!(0.0505))]),
        ]);
        let credits = HashMap::from([(
            (Jurisdiction::Federal, 2025),
            TaxCreditAmounts {
                tax_year: 2025,
                jurisdiction: Jurisdiction::Federal,
                basic_amount: dec!(16129),
                age_credit: AgeCredit {
                    max_credit: dec!(9028),
                    income_threshold: dec!(45522),
                    reduction_rate: dec!(0.15),
                },
            },
        )]);
        let minimums = BTreeMap::from([(55, dec!(0.0286)), (71, dec!(0.0528)), (95, dec!(0.20))]);

        InMemoryReferenceData::new(brackets, credits, HashMap::new(), minimums)
    }

    // ============================================================
    // Lookups
    // ============================================================

    #[test]
    fn tax_years_are_sorted_and_unique() {
        assert_eq!(sample().list_tax_years().unwrap(), vec![2024, 2025]);
    }

    #[test]
    fn bracket_table_is_returned_in_order() {
        let table = sample()
            .get_bracket_table(Jurisdiction::Federal, 2025)
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table[0].max_income, Some(dec!(57375)));
    }

    #[test]
    fn missing_year_is_not_found() {
        let err = sample()
            .get_bracket_table(Jurisdiction::Federal, 2024)
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound(msg) if msg.contains("FED 2024")));
    }

    #[test]
    fn credits_come_from_same_row() {
        let data = sample();

        assert_eq!(data.get_basic_credit(Jurisdiction::Federal, 2025).unwrap(), dec!(16129));
        assert_eq!(
            data.get_age_credit(Jurisdiction::Federal, 2025)
                .unwrap()
                .income_threshold,
            dec!(45522)
        );
    }

    #[test]
    fn missing_benefit_amounts_are_not_found() {
        assert!(matches!(
            sample().get_benefit_reference_amounts(2025),
            Err(ProviderError::NotFound(_))
        ));
    }

    // ============================================================
    // Minimum withdrawal table
    // ============================================================

    #[test]
    fn minimum_withdrawal_uses_nearest_lower_age() {
        let data = sample();

        assert_eq!(data.get_minimum_withdrawal_percentage(71).unwrap(), dec!(0.0528));
        assert_eq!(data.get_minimum_withdrawal_percentage(80).unwrap(), dec!(0.0528));
        assert_eq!(data.get_minimum_withdrawal_percentage(60).unwrap(), dec!(0.0286));
    }

    #[test]
    fn minimum_withdrawal_past_table_end_uses_last_rate() {
        assert_eq!(
            sample().get_minimum_withdrawal_percentage(101).unwrap(),
            dec!(0.20)
        );
    }

    #[test]
    fn minimum_withdrawal_before_table_start_is_zero() {
        assert_eq!(
            sample().get_minimum_withdrawal_percentage(50).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn empty_minimum_withdrawal_table_is_not_found() {
        let data = InMemoryReferenceData::default();

        assert!(data.get_minimum_withdrawal_percentage(71).is_err());
    }
}
