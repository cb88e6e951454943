//! Price history keyed by date and instrument.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::error::SigfolioError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFrame {
    rows: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
}

impl PriceFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a price. Prices must be finite and strictly positive, and each
    /// (date, instrument) pair may be set once.
    pub fn insert(
        &mut self,
        date: NaiveDate,
        instrument: &str,
        price: f64,
    ) -> Result<(), SigfolioError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(SigfolioError::alignment(format!(
                "invalid price {price} for {instrument} on {date}"
            )));
        }
        let row = self.rows.entry(date).or_default();
        if row.contains_key(instrument) {
            return Err(SigfolioError::alignment(format!(
                "duplicate price for {instrument} on {date}"
            )));
        }
        row.insert(instrument.to_string(), price);
        Ok(())
    }

    pub fn get(&self, date: NaiveDate, instrument: &str) -> Option<f64> {
        self.rows.get(&date).and_then(|row| row.get(instrument)).copied()
    }

    pub fn row(&self, date: NaiveDate) -> Option<&BTreeMap<String, f64>> {
        self.rows.get(&date)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.rows.contains_key(&date)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &BTreeMap<String, f64>)> {
        self.rows.iter().map(|(d, row)| (*d, row))
    }

    /// Ordered close series for one instrument, skipping dates it is absent.
    pub fn series(&self, instrument: &str) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|(d, row)| row.get(instrument).map(|&p| (*d, p)))
            .collect()
    }

    pub fn instruments(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn insert_and_get() {
        let mut prices = PriceFrame::new();
        prices.insert(date(1), "BHP", 45.5).unwrap();
        prices.insert(date(1), "CBA", 110.0).unwrap();
        assert_eq!(prices.get(date(1), "BHP"), Some(45.5));
        assert_eq!(prices.get(date(2), "BHP"), None);
        assert_eq!(prices.len(), 1);
    }

    #[test]
    fn non_positive_price_rejected() {
        let mut prices = PriceFrame::new();
        assert!(prices.insert(date(1), "BHP", 0.0).is_err());
        assert!(prices.insert(date(1), "BHP", -3.0).is_err());
        assert!(prices.insert(date(1), "BHP", f64::NAN).is_err());
    }

    #[test]
    fn duplicate_price_rejected() {
        let mut prices = PriceFrame::new();
        prices.insert(date(1), "BHP", 45.0).unwrap();
        let err = prices.insert(date(1), "BHP", 46.0).unwrap_err();
        assert!(matches!(err, SigfolioError::DataAlignment { .. }));
    }

    #[test]
    fn series_skips_missing_dates() {
        let mut prices = PriceFrame::new();
        prices.insert(date(1), "BHP", 10.0).unwrap();
        prices.insert(date(2), "CBA", 20.0).unwrap();
        prices.insert(date(3), "BHP", 11.0).unwrap();
        assert_eq!(prices.series("BHP"), vec![(date(1), 10.0), (date(3), 11.0)]);
        assert_eq!(prices.instruments(), vec!["BHP".to_string(), "CBA".to_string()]);
    }
}
