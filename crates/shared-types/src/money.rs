//! Money arithmetic on whole francs.
//!
//! Amounts are `i64` francs; rates are percentages (`18.0` means 18 %).
//! Percentages round half away from zero to the nearest franc.

/// Upper bound accepted for any single amount in a request.
/// Request validators repeat this literal.
pub const MONTANT_MAX: i64 = 1_000_000_000_000;

/// `amount × rate / 100`, rounded to the franc.
pub fn percentage_of(amount: i64, rate: f64) -> i64 {
    ((amount as f64) * rate / 100.0).round() as i64
}

/// VAT on an excluded-tax amount.
pub fn montant_tva(montant_ht: i64, taux_tva: f64) -> i64 {
    percentage_of(montant_ht, taux_tva)
}

/// `(tva, ttc)` for an excluded-tax amount, `None` when the total does not fit.
pub fn montants_facture(montant_ht: i64, taux_tva: f64) -> Option<(i64, i64)> {
    let tva = montant_tva(montant_ht, taux_tva);
    Some((tva, montant_ht.checked_add(tva)?))
}

/// `(commission, net)` on a rent collection.
pub fn commission_loyer(montant: i64, taux_commission: f64) -> (i64, i64) {
    let commission = percentage_of(montant, taux_commission);
    (commission, montant.saturating_sub(commission))
}

/// Remaining balance, never negative.
pub fn reste(du: i64, paye: i64) -> i64 {
    du.saturating_sub(paye).max(0)
}

/// Recovered share of the amount due, in percent with two decimals.
/// Zero when nothing is due.
pub fn taux(recouvre: i64, du: i64) -> f64 {
    if du <= 0 {
        return 0.0;
    }
    ((recouvre as f64) * 10000.0 / (du as f64)).round() / 100.0
}

/// Integer average, zero on an empty set.
pub fn moyenne(total: i64, count: i64) -> i64 {
    if count <= 0 {
        0
    } else {
        ((total as f64) / (count as f64)).round() as i64
    }
}

/// `1234567` → `"1 234 567"` (space-grouped thousands, as printed on invoices).
pub fn format_montant(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Amount followed by the currency label, e.g. `"150 000 FCFA"`.
pub fn format_montant_devise(amount: i64, devise: &str) -> String {
    format!("{} {}", format_montant(amount), devise)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_franc() {
        assert_eq!(percentage_of(100_000, 10.0), 10_000);
        assert_eq!(percentage_of(155, 10.0), 16);
        assert_eq!(percentage_of(154, 10.0), 15);
        assert_eq!(percentage_of(0, 18.0), 0);
        assert_eq!(percentage_of(1_000, 0.0), 0);
    }

    #[test]
    fn invoice_totals() {
        assert_eq!(montants_facture(500_000, 18.0), Some((90_000, 590_000)));
        assert_eq!(montants_facture(333, 18.0), Some((60, 393)));
        assert_eq!(montants_facture(1_000, 0.0), Some((0, 1_000)));
    }

    #[test]
    fn invoice_total_overflow_is_reported() {
        assert_eq!(montants_facture(i64::MAX - 10, 18.0), None);
        let (tva, ttc) = montants_facture(MONTANT_MAX, 100.0).unwrap();
        assert_eq!(tva, MONTANT_MAX);
        assert_eq!(ttc, 2 * MONTANT_MAX);
    }

    #[test]
    fn extreme_amounts_do_not_panic() {
        assert_eq!(reste(i64::MIN, i64::MAX), 0);
        let (commission, net) = commission_loyer(i64::MAX, 0.0);
        assert_eq!((commission, net), (0, i64::MAX));
    }

    #[test]
    fn rent_commission_splits_amount() {
        let (commission, net) = commission_loyer(250_000, 8.5);
        assert_eq!(commission, 21_250);
        assert_eq!(net, 228_750);
        assert_eq!(commission + net, 250_000);
    }

    #[test]
    fn reste_is_never_negative() {
        assert_eq!(reste(1_000, 400), 600);
        assert_eq!(reste(1_000, 1_000), 0);
        assert_eq!(reste(1_000, 1_500), 0);
    }

    #[test]
    fn taux_handles_zero_due() {
        assert_eq!(taux(0, 0), 0.0);
        assert_eq!(taux(500, 0), 0.0);
        assert_eq!(taux(500, 1_000), 50.0);
        assert_eq!(taux(1, 3), 33.33);
        assert_eq!(taux(1_000, 1_000), 100.0);
    }

    #[test]
    fn moyenne_of_empty_set() {
        assert_eq!(moyenne(0, 0), 0);
        assert_eq!(moyenne(10, 4), 3);
        assert_eq!(moyenne(900, 3), 300);
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(format_montant(0), "0");
        assert_eq!(format_montant(999), "999");
        assert_eq!(format_montant(1_000), "1 000");
        assert_eq!(format_montant(1_234_567), "1 234 567");
        assert_eq!(format_montant(-45_000), "-45 000");
        assert_eq!(format_montant_devise(150_000, "FCFA"), "150 000 FCFA");
    }
}
