//! The recurrence engine: expands a plan's cadence into concrete instance
//! dates and computes per-installment amounts.

use chrono::{Datelike, Duration, NaiveDate};

use crate::domain::{Frequency, Payment};
use crate::errors::CoreError;
use crate::schedule::calendar::{days_in_month, shift_month, shift_year};

/// Materialization cap for open-ended plans: 60 periods (five years of
/// monthly occurrences) instead of an infinite series.
pub const INDEFINITE_CAP_PERIODS: u32 = 60;

/// Rounds a currency amount to the cent.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Even per-installment share for a finite plan. The rounding remainder is
/// not assigned here; it is corrected during batch edits.
pub fn installment_amount(total_amount: f64, installments: u32) -> f64 {
    round2(total_amount / installments as f64)
}

/// Validated recurrence parameters of a recurring plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub payment_day: Option<u32>,
    pub installments: Option<u32>,
}

impl RecurrenceSpec {
    /// Extracts the recurrence parameters of a plan. One-off plans have none.
    pub fn for_payment(payment: &Payment) -> Option<Self> {
        payment.frequency.map(|frequency| Self {
            frequency,
            start_date: payment.start_date,
            payment_day: payment.payment_day,
            installments: payment.installments,
        })
    }

    /// Rejects invalid parameter combinations before any date is generated.
    /// A caller never receives a partial list from a bad spec.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(0) = self.installments {
            return Err(CoreError::InvalidRecurrence(
                "installments must be at least 1".into(),
            ));
        }
        match self.frequency {
            Frequency::Monthly => match self.payment_day {
                None => Err(CoreError::InvalidRecurrence(
                    "monthly plans require a payment day".into(),
                )),
                Some(day) if !(1..=31).contains(&day) => Err(CoreError::InvalidRecurrence(
                    format!("day of month {day} out of range 1-31"),
                )),
                Some(_) => Ok(()),
            },
            Frequency::Weekly | Frequency::Biweekly => match self.payment_day {
                None => Err(CoreError::InvalidRecurrence(
                    "weekly and biweekly plans require a weekday".into(),
                )),
                Some(day) if !(1..=7).contains(&day) => Err(CoreError::InvalidRecurrence(
                    format!("weekday {day} out of range 1-7 (1 = Monday)"),
                )),
                Some(_) => Ok(()),
            },
            Frequency::Daily | Frequency::Yearly => match self.payment_day {
                Some(_) => Err(CoreError::InvalidRecurrence(format!(
                    "{} plans take no payment day",
                    self.frequency
                ))),
                None => Ok(()),
            },
        }
    }

    /// First generated date. Not necessarily the start date: monthly plans
    /// snap to the payment day within the start month, weekly/biweekly plans
    /// search forward (0-6 days) for the target weekday.
    pub fn anchor_date(&self) -> NaiveDate {
        match (self.frequency, self.payment_day) {
            (Frequency::Monthly, Some(day)) => clamp_day(
                self.start_date.year(),
                self.start_date.month(),
                day,
            ),
            (Frequency::Weekly | Frequency::Biweekly, Some(weekday)) => {
                let current = self.start_date.weekday().number_from_monday();
                let diff = (weekday + 7 - current) % 7;
                self.start_date + Duration::days(diff as i64)
            }
            _ => self.start_date,
        }
    }

    /// Advances one period. Monthly re-clamps to the payment day every step,
    /// so a day-31 plan lands on the 28th/29th/30th in shorter months and
    /// returns to the 31st afterwards without drifting.
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        match self.frequency {
            Frequency::Daily => date + Duration::days(1),
            Frequency::Weekly => date + Duration::days(7),
            Frequency::Biweekly => date + Duration::days(14),
            Frequency::Monthly => {
                let next = shift_month(date.with_day(1).expect("day 1 valid"), 1);
                clamp_day(next.year(), next.month(), self.payment_day.unwrap_or(date.day()))
            }
            Frequency::Yearly => shift_year(date, 1),
        }
    }

    /// Emits exactly `installments` dates: the anchor plus N-1 advances.
    pub fn generate_finite_dates(&self) -> Result<Vec<NaiveDate>, CoreError> {
        self.validate()?;
        let count = self.installments.ok_or_else(|| {
            CoreError::InvalidRecurrence("finite generation requires an installment count".into())
        })?;
        let mut dates = Vec::with_capacity(count as usize);
        let mut current = self.anchor_date();
        for _ in 0..count {
            dates.push(current);
            current = self.advance(current);
        }
        Ok(dates)
    }

    /// Emits dates from the anchor while they fall on or before `horizon`.
    /// Used to back-fill an open-ended plan up to today. Never returns an
    /// empty set: when no date qualifies, the start date alone is emitted.
    pub fn generate_dates_until(&self, horizon: NaiveDate) -> Result<Vec<NaiveDate>, CoreError> {
        self.validate()?;
        let mut dates = Vec::new();
        let mut current = self.anchor_date();
        while current <= horizon {
            dates.push(current);
            current = self.advance(current);
        }
        if dates.is_empty() {
            dates.push(self.start_date);
        }
        Ok(dates)
    }

    /// Emits a capped window of periods from the anchor forward, regardless
    /// of today. Used to pre-materialize an open-ended plan at creation.
    pub fn generate_capped_dates(&self) -> Result<Vec<NaiveDate>, CoreError> {
        self.validate()?;
        let mut dates = Vec::with_capacity(INDEFINITE_CAP_PERIODS as usize);
        let mut current = self.anchor_date();
        for _ in 0..INDEFINITE_CAP_PERIODS {
            dates.push(current);
            current = self.advance(current);
        }
        Ok(dates)
    }
}

fn clamp_day(year: i32, month: u32, day: u32) -> NaiveDate {
    let clamped = day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, clamped).expect("clamped day valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(start: NaiveDate, day: u32, installments: Option<u32>) -> RecurrenceSpec {
        RecurrenceSpec {
            frequency: Frequency::Monthly,
            start_date: start,
            payment_day: Some(day),
            installments,
        }
    }

    #[test]
    fn monthly_anchor_snaps_to_payment_day() {
        let spec = monthly(date(2024, 1, 1), 15, Some(3));
        assert_eq!(spec.anchor_date(), date(2024, 1, 15));
    }

    #[test]
    fn weekly_anchor_searches_forward_only() {
        // 2024-01-03 is a Wednesday; Monday = 1 lands on the following Monday.
        let spec = RecurrenceSpec {
            frequency: Frequency::Weekly,
            start_date: date(2024, 1, 3),
            payment_day: Some(1),
            installments: None,
        };
        assert_eq!(spec.anchor_date(), date(2024, 1, 8));

        // A start already on the target weekday anchors on itself.
        let aligned = RecurrenceSpec {
            start_date: date(2024, 1, 1),
            ..spec
        };
        assert_eq!(aligned.anchor_date(), date(2024, 1, 1));
    }

    #[test]
    fn finite_generation_emits_exactly_n_dates() {
        let spec = monthly(date(2024, 1, 15), 15, Some(3));
        let dates = spec.generate_finite_dates().unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 1, 15), date(2024, 2, 15), date(2024, 3, 15)]
        );
    }

    #[test]
    fn monthly_day_31_clamps_without_drifting() {
        let spec = monthly(date(2024, 1, 31), 31, Some(4));
        let dates = spec.generate_finite_dates().unwrap();
        assert_eq!(
            dates,
            vec![
                date(2024, 1, 31),
                date(2024, 2, 29),
                date(2024, 3, 31),
                date(2024, 4, 30),
            ]
        );
    }

    #[test]
    fn horizon_generation_stops_inclusively_and_never_returns_empty() {
        let spec = RecurrenceSpec {
            frequency: Frequency::Weekly,
            start_date: date(2024, 1, 1),
            payment_day: Some(3),
            installments: None,
        };
        let dates = spec.generate_dates_until(date(2024, 1, 20)).unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 1, 3), date(2024, 1, 10), date(2024, 1, 17)]
        );

        // Horizon before the anchor falls back to the start date alone.
        let dates = spec.generate_dates_until(date(2023, 12, 1)).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 1)]);
    }

    #[test]
    fn capped_generation_emits_the_full_window() {
        let spec = monthly(date(2024, 1, 10), 10, None);
        let dates = spec.generate_capped_dates().unwrap();
        assert_eq!(dates.len(), INDEFINITE_CAP_PERIODS as usize);
        assert_eq!(dates[0], date(2024, 1, 10));
        assert_eq!(dates[12], date(2025, 1, 10));
    }

    #[test]
    fn generation_is_deterministic() {
        let spec = monthly(date(2024, 1, 31), 31, Some(12));
        assert_eq!(
            spec.generate_finite_dates().unwrap(),
            spec.generate_finite_dates().unwrap()
        );
    }

    #[test]
    fn invalid_specs_are_rejected_before_generation() {
        let zero = monthly(date(2024, 1, 1), 15, Some(0));
        assert!(matches!(
            zero.generate_finite_dates(),
            Err(CoreError::InvalidRecurrence(_))
        ));

        let missing_day = RecurrenceSpec {
            frequency: Frequency::Monthly,
            start_date: date(2024, 1, 1),
            payment_day: None,
            installments: Some(3),
        };
        assert!(missing_day.validate().is_err());

        let bad_weekday = RecurrenceSpec {
            frequency: Frequency::Biweekly,
            start_date: date(2024, 1, 1),
            payment_day: Some(8),
            installments: None,
        };
        assert!(bad_weekday.validate().is_err());

        let daily_with_day = RecurrenceSpec {
            frequency: Frequency::Daily,
            start_date: date(2024, 1, 1),
            payment_day: Some(3),
            installments: Some(5),
        };
        assert!(daily_with_day.validate().is_err());
    }

    #[test]
    fn yearly_advance_keeps_month_and_day() {
        let spec = RecurrenceSpec {
            frequency: Frequency::Yearly,
            start_date: date(2024, 2, 29),
            payment_day: None,
            installments: Some(3),
        };
        let dates = spec.generate_finite_dates().unwrap();
        assert_eq!(
            dates,
            vec![date(2024, 2, 29), date(2025, 2, 28), date(2026, 2, 28)]
        );
    }

    #[test]
    fn installment_amount_rounds_to_cents() {
        assert_eq!(installment_amount(1000.0, 3), 333.33);
        assert_eq!(installment_amount(100.0, 4), 25.0);
    }
}
