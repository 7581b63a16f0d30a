use crate::dto::PaymentMethod;
use sea_orm::prelude::Decimal;

/// Fixed platform rate: 1 token = 1 point = 1 vote = 1 USD.
const NGN_PER_TOKEN: i64 = 1500;
const MINOR_UNITS_PER_MAJOR: i64 = 100;

pub const CURRENCY_USD: &str = "USD";
pub const CURRENCY_NGN: &str = "NGN";

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayPrice {
    pub amount: Decimal,
    pub currency: String,
}

/// Paystack charges Nigerian payers in naira at the fixed rate, rounded to
/// the nearest whole unit; every other method/country pair stays in USD.
pub fn quote(token_cost: i64, method: PaymentMethod, country: Option<&str>) -> DisplayPrice {
    let nigerian = match country {
        Some(country) => country.eq_ignore_ascii_case("nigeria"),
        None => false,
    };

    if PaymentMethod::Paystack.eq(&method) && nigerian {
        let amount = (Decimal::from(token_cost) * Decimal::from(NGN_PER_TOKEN)).round();
        DisplayPrice {
            amount,
            currency: CURRENCY_NGN.to_owned(),
        }
    } else {
        DisplayPrice {
            amount: Decimal::from(token_cost),
            currency: CURRENCY_USD.to_owned(),
        }
    }
}

/// Paystack initialize wants the charge in minor units (kobo/cents).
pub fn to_minor_units(amount: Decimal) -> i64 {
    let minor = (amount * Decimal::from(MINOR_UNITS_PER_MAJOR)).round();
    i64::from_str_radix(&minor.to_string(), 10).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paystack_nigeria_converts_at_fixed_rate() {
        let price = quote(50, PaymentMethod::Paystack, Some("Nigeria"));
        assert_eq!(price.amount, Decimal::from(75_000));
        assert_eq!(price.currency, CURRENCY_NGN);
    }

    #[test]
    fn paystack_nigeria_is_case_insensitive() {
        let price = quote(10, PaymentMethod::Paystack, Some("nigeria"));
        assert_eq!(price.currency, CURRENCY_NGN);
    }

    #[test]
    fn paystack_elsewhere_stays_in_usd() {
        let price = quote(50, PaymentMethod::Paystack, Some("Ghana"));
        assert_eq!(price.amount, Decimal::from(50));
        assert_eq!(price.currency, CURRENCY_USD);
    }

    #[test]
    fn paypal_nigeria_stays_in_usd() {
        let price = quote(50, PaymentMethod::Paypal, Some("Nigeria"));
        assert_eq!(price.amount, Decimal::from(50));
        assert_eq!(price.currency, CURRENCY_USD);
    }

    #[test]
    fn missing_country_stays_in_usd() {
        let price = quote(25, PaymentMethod::Paystack, None);
        assert_eq!(price.currency, CURRENCY_USD);
    }

    #[test]
    fn minor_units_multiply_by_hundred() {
        assert_eq!(to_minor_units(Decimal::from(75_000)), 7_500_000);
        assert_eq!(to_minor_units(Decimal::from(50)), 5_000);
    }
}
