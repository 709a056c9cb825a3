use chrono::Datelike;

/// Kinds of records that carry a sequential human-readable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Affaire,
    Recouvrement,
    Facture,
    Immeuble,
    ClientConseil,
}

impl ReferenceKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceKind::Affaire => "AFF",
            ReferenceKind::Recouvrement => "REC",
            ReferenceKind::Facture => "FAC",
            ReferenceKind::Immeuble => "IMM",
            ReferenceKind::ClientConseil => "CLC",
        }
    }

    pub fn width(&self) -> usize {
        match self {
            ReferenceKind::Immeuble => 3,
            _ => 4,
        }
    }

    /// Whether numbering restarts every calendar year.
    pub fn yearly(&self) -> bool {
        matches!(
            self,
            ReferenceKind::Affaire | ReferenceKind::Recouvrement | ReferenceKind::Facture
        )
    }

    /// Counter scope for a given date: the year for yearly kinds, empty otherwise.
    pub fn scope_for(&self, date: chrono::NaiveDate) -> String {
        if self.yearly() {
            date.year().to_string()
        } else {
            String::new()
        }
    }
}

/// `PREFIX-SCOPE-000N`, or `PREFIX-000N` without a scope.
///
/// The sequence is zero-padded to `width`; wider numbers are kept whole.
pub fn format_reference(prefix: &str, scope: Option<&str>, seq: i64, width: usize) -> String {
    match scope.filter(|s| !s.is_empty()) {
        Some(scope) => format!("{prefix}-{scope}-{seq:0width$}"),
        None => format!("{prefix}-{seq:0width$}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn formats_with_scope() {
        assert_eq!(format_reference("DIAG", Some("TEST"), 1, 3), "DIAG-TEST-001");
        assert_eq!(format_reference("AFF", Some("2024"), 42, 4), "AFF-2024-0042");
    }

    #[test]
    fn formats_without_scope() {
        assert_eq!(format_reference("IMM", None, 7, 3), "IMM-007");
        assert_eq!(format_reference("CLC", Some(""), 12, 4), "CLC-0012");
    }

    #[test]
    fn never_truncates_wide_sequences() {
        assert_eq!(format_reference("IMM", None, 1234, 3), "IMM-1234");
        assert_eq!(format_reference("FAC", Some("2025"), 10000, 4), "FAC-2025-10000");
    }

    #[test]
    fn scope_follows_kind() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(ReferenceKind::Affaire.scope_for(date), "2025");
        assert_eq!(ReferenceKind::Facture.scope_for(date), "2025");
        assert_eq!(ReferenceKind::Immeuble.scope_for(date), "");
        assert_eq!(ReferenceKind::ClientConseil.scope_for(date), "");
        assert_eq!(ReferenceKind::Immeuble.width(), 3);
        assert_eq!(ReferenceKind::Recouvrement.prefix(), "REC");
    }
}
