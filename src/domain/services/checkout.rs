//! Booking quantity rules and the simulated card payment.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::domain::services::money::percent_of;

pub const SERVICE_FEE_PERCENT: i64 = 5;

/// Why a requested quantity cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    TooFew,
    OverLimit(i64),
    NotEnoughSeats,
}

impl QuantityError {
    pub fn message(&self) -> String {
        match self {
            QuantityError::TooFew => "Please select at least one ticket".to_string(),
            QuantityError::OverLimit(max) => format!("You can book at most {} tickets at a time", max),
            QuantityError::NotEnoughSeats => "Not enough tickets available".to_string(),
        }
    }
}

pub fn check_quantity(quantity: i64, max_per_booking: i64, available: i64) -> Result<(), QuantityError> {
    if quantity < 1 {
        return Err(QuantityError::TooFew);
    }
    if quantity > max_per_booking {
        return Err(QuantityError::OverLimit(max_per_booking));
    }
    if quantity > available {
        return Err(QuantityError::NotEnoughSeats);
    }
    Ok(())
}

/// Upper bound for the quantity selector on an event page.
pub fn max_selectable(available: i64, max_per_booking: i64) -> i64 {
    available.min(max_per_booking).max(0)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub subtotal_cents: i64,
    pub service_fee_cents: i64,
    pub total_cents: i64,
}

/// Display-only totals; the stored booking total never includes the fee.
pub fn summarize(subtotal_cents: i64) -> CheckoutSummary {
    let service_fee_cents = percent_of(subtotal_cents, SERVICE_FEE_PERCENT);
    CheckoutSummary {
        subtotal_cents,
        service_fee_cents,
        total_cents: subtotal_cents + service_fee_cents,
    }
}

pub struct CardInput<'a> {
    pub cardholder_name: &'a str,
    pub card_number: &'a str,
    pub expiry: &'a str,
    pub cvv: &'a str,
    pub accept_terms: bool,
}

pub fn validate_card(card: &CardInput<'_>, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();

    if card.cardholder_name.trim().is_empty() {
        errors.push("Cardholder name is required".to_string());
    }

    let digits: String = card.card_number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
        errors.push("Card number must be 16 digits".to_string());
    }

    match parse_expiry(card.expiry) {
        None => errors.push("Expiry date must be in MM/YY format".to_string()),
        Some((year, month)) => {
            if (year, month) < (today.year(), today.month()) {
                errors.push("Card has expired".to_string());
            }
        }
    }

    let cvv = card.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        errors.push("CVV must be 3 or 4 digits".to_string());
    }

    if !card.accept_terms {
        errors.push("You must accept the terms and conditions".to_string());
    }

    errors
}

fn parse_expiry(value: &str) -> Option<(i32, u32)> {
    let (mm, yy) = value.trim().split_once('/')?;
    let (mm, yy) = (mm.trim(), yy.trim());
    if mm.len() != 2 || yy.len() != 2 {
        return None;
    }
    let month: u32 = mm.parse().ok()?;
    let year: i32 = yy.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((2000 + year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card<'a>(number: &'a str, expiry: &'a str, cvv: &'a str) -> CardInput<'a> {
        CardInput { cardholder_name: "Ana Lee", card_number: number, expiry, cvv, accept_terms: true }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn quantity_rules_in_order() {
        assert_eq!(check_quantity(0, 10, 5), Err(QuantityError::TooFew));
        assert_eq!(check_quantity(11, 10, 50), Err(QuantityError::OverLimit(10)));
        assert_eq!(check_quantity(6, 10, 5), Err(QuantityError::NotEnoughSeats));
        assert_eq!(check_quantity(5, 10, 5), Ok(()));
    }

    #[test]
    fn selector_bound() {
        assert_eq!(max_selectable(3, 10), 3);
        assert_eq!(max_selectable(40, 10), 10);
        assert_eq!(max_selectable(0, 10), 0);
    }

    #[test]
    fn fee_is_five_percent() {
        let s = summarize(10_000);
        assert_eq!(s.service_fee_cents, 500);
        assert_eq!(s.total_cents, 10_500);
    }

    #[test]
    fn accepts_valid_card() {
        assert!(validate_card(&card("4242 4242 4242 4242", "06/25", "123"), today()).is_empty());
        assert!(validate_card(&card("4242424242424242", "01/30", "1234"), today()).is_empty());
    }

    #[test]
    fn rejects_bad_card_fields() {
        assert_eq!(validate_card(&card("4242", "06/25", "123"), today()).len(), 1);
        assert_eq!(validate_card(&card("4242424242424242", "05/25", "123"), today()), vec!["Card has expired".to_string()]);
        assert_eq!(validate_card(&card("4242424242424242", "13/25", "123"), today()).len(), 1);
        assert_eq!(validate_card(&card("4242424242424242", "06/25", "12"), today()).len(), 1);
        let mut no_terms = card("4242424242424242", "06/25", "123");
        no_terms.accept_terms = false;
        assert_eq!(validate_card(&no_terms, today()).len(), 1);
    }
}
