//! Spreadsheet-compatible CSV: export writers and import row parsers.
//!
//! Everything here is pure; database access lives in `rest::export`.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use shared_types::{
    check_vocabulary, format_periode, Affaire, AppError, ClientConseil, CreateClientConseilRequest,
    CreateDossierRequest, CreateLocataireRequest, CreateLotRequest, DossierResponse,
    FactureResponse, Locataire, Lot, CLIENT_STATUTS, CLIENT_TYPES, LOCATAIRE_TYPES, LOT_STATUTS,
    LOT_TYPES, RECOUVREMENT_STATUTS,
};
use uuid::Uuid;
use validator::Validate;

use crate::repo::encaissement::EncaissementDetail;

const BOM: char = '\u{feff}';

// ── Entities ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEntite {
    Affaires,
    DossiersRecouvrement,
    Lots,
    Locataires,
    Encaissements,
    ClientsConseil,
    Factures,
}

impl ExportEntite {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "affaires" => Some(Self::Affaires),
            "dossiers-recouvrement" => Some(Self::DossiersRecouvrement),
            "lots" => Some(Self::Lots),
            "locataires" => Some(Self::Locataires),
            "encaissements" => Some(Self::Encaissements),
            "clients-conseil" => Some(Self::ClientsConseil),
            "factures" => Some(Self::Factures),
            _ => None,
        }
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            Self::Affaires => AFFAIRE_HEADERS,
            Self::DossiersRecouvrement => DOSSIER_HEADERS,
            Self::Lots => LOT_HEADERS,
            Self::Locataires => LOCATAIRE_HEADERS,
            Self::Encaissements => ENCAISSEMENT_HEADERS,
            Self::ClientsConseil => CLIENT_HEADERS,
            Self::Factures => FACTURE_HEADERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportEntite {
    Locataires,
    ClientsConseil,
    DossiersRecouvrement,
    Lots,
}

impl ImportEntite {
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "locataires" => Some(Self::Locataires),
            "clients-conseil" => Some(Self::ClientsConseil),
            "dossiers-recouvrement" => Some(Self::DossiersRecouvrement),
            "lots" => Some(Self::Lots),
            _ => None,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Locataires => "locataires",
            Self::ClientsConseil => "clients-conseil",
            Self::DossiersRecouvrement => "dossiers-recouvrement",
            Self::Lots => "lots",
        }
    }

    /// Columns the header line must carry.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Locataires => &["type_locataire"],
            Self::ClientsConseil => &["type_client", "nom"],
            Self::DossiersRecouvrement => &["creancier_nom", "debiteur_nom", "montant_principal"],
            Self::Lots => &["immeuble_reference", "numero", "type_lot", "loyer_mensuel"],
        }
    }
}

// ── Export ──────────────────────────────────────────────────────

pub const AFFAIRE_HEADERS: &[&str] = &[
    "reference",
    "intitule",
    "nature",
    "juridiction",
    "client_nom",
    "partie_adverse",
    "avocat_adverse",
    "statut",
    "date_ouverture",
    "date_cloture",
];

pub const DOSSIER_HEADERS: &[&str] = &[
    "reference",
    "creancier_nom",
    "creancier_contact",
    "debiteur_nom",
    "debiteur_contact",
    "debiteur_adresse",
    "montant_principal",
    "frais",
    "interets",
    "montant_du",
    "montant_recouvre",
    "reste_du",
    "statut",
    "date_ouverture",
];

pub const LOT_HEADERS: &[&str] = &[
    "immeuble_reference",
    "numero",
    "type_lot",
    "etage",
    "surface",
    "loyer_mensuel",
    "statut",
    "date_entree",
];

pub const LOCATAIRE_HEADERS: &[&str] = &[
    "type_locataire",
    "nom",
    "prenom",
    "raison_sociale",
    "telephone",
    "email",
    "piece_identite",
    "notes",
];

pub const ENCAISSEMENT_HEADERS: &[&str] = &[
    "periode",
    "immeuble_reference",
    "lot_numero",
    "locataire",
    "montant",
    "commission_capco",
    "montant_net",
    "date_encaissement",
    "mode_paiement",
    "reference",
];

pub const CLIENT_HEADERS: &[&str] = &[
    "reference",
    "type_client",
    "nom",
    "raison_sociale",
    "contact_nom",
    "telephone",
    "email",
    "adresse",
    "honoraire_mensuel",
    "statut",
    "notes",
];

pub const FACTURE_HEADERS: &[&str] = &[
    "numero",
    "client",
    "objet",
    "date_emission",
    "date_echeance",
    "montant_ht",
    "taux_tva",
    "montant_tva",
    "montant_ttc",
    "montant_paye",
    "reste_a_payer",
    "statut",
];

fn opt(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

pub fn affaire_record(a: &Affaire) -> Vec<String> {
    vec![
        a.reference.clone(),
        a.intitule.clone(),
        a.nature.clone(),
        a.juridiction.clone(),
        a.client_nom.clone(),
        opt(a.partie_adverse.as_deref()),
        opt(a.avocat_adverse.as_deref()),
        a.statut.clone(),
        a.date_ouverture.to_string(),
        opt_date(a.date_cloture),
    ]
}

pub fn dossier_record(r: &DossierResponse) -> Vec<String> {
    let d = &r.dossier;
    vec![
        d.reference.clone(),
        d.creancier_nom.clone(),
        opt(d.creancier_contact.as_deref()),
        d.debiteur_nom.clone(),
        opt(d.debiteur_contact.as_deref()),
        opt(d.debiteur_adresse.as_deref()),
        d.montant_principal.to_string(),
        d.frais.to_string(),
        d.interets.to_string(),
        r.situation.montant_du.to_string(),
        r.situation.montant_recouvre.to_string(),
        r.situation.reste_du.to_string(),
        d.statut.clone(),
        d.date_ouverture.to_string(),
    ]
}

pub fn lot_record(lot: &Lot, immeuble_reference: &str) -> Vec<String> {
    vec![
        immeuble_reference.to_string(),
        lot.numero.clone(),
        lot.type_lot.clone(),
        opt(lot.etage.as_deref()),
        lot.surface.map(|s| s.to_string()).unwrap_or_default(),
        lot.loyer_mensuel.to_string(),
        lot.statut.clone(),
        opt_date(lot.date_entree),
    ]
}

pub fn locataire_record(l: &Locataire) -> Vec<String> {
    vec![
        l.type_locataire.clone(),
        opt(l.nom.as_deref()),
        opt(l.prenom.as_deref()),
        opt(l.raison_sociale.as_deref()),
        opt(l.telephone.as_deref()),
        opt(l.email.as_deref()),
        opt(l.piece_identite.as_deref()),
        opt(l.notes.as_deref()),
    ]
}

pub fn encaissement_record(d: &EncaissementDetail) -> Vec<String> {
    let e = &d.encaissement;
    vec![
        format_periode(e.periode),
        d.immeuble_reference.clone(),
        d.lot_numero.clone(),
        d.locataire(),
        e.montant.to_string(),
        e.commission_capco.to_string(),
        e.montant_net.to_string(),
        e.date_encaissement.to_string(),
        e.mode_paiement.clone(),
        opt(e.reference.as_deref()),
    ]
}

pub fn client_record(c: &ClientConseil) -> Vec<String> {
    vec![
        c.reference.clone(),
        c.type_client.clone(),
        c.nom.clone(),
        opt(c.raison_sociale.as_deref()),
        opt(c.contact_nom.as_deref()),
        opt(c.telephone.as_deref()),
        opt(c.email.as_deref()),
        opt(c.adresse.as_deref()),
        c.honoraire_mensuel.to_string(),
        c.statut.clone(),
        opt(c.notes.as_deref()),
    ]
}

pub fn facture_record(r: &FactureResponse) -> Vec<String> {
    let f = &r.facture;
    vec![
        f.numero.clone(),
        r.client_nom.clone(),
        f.objet.clone(),
        f.date_emission.to_string(),
        opt_date(f.date_echeance),
        f.montant_ht.to_string(),
        f.taux_tva.to_string(),
        f.montant_tva.to_string(),
        f.montant_ttc.to_string(),
        r.montant_paye.to_string(),
        r.reste_a_payer.to_string(),
        f.statut.clone(),
    ]
}

/// Write a comma-separated document with a header line.
pub fn write_csv<I>(headers: &[&str], records: I) -> Result<Vec<u8>, AppError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    let csv_error = |e: csv::Error| AppError::internal(format!("CSV write failed: {e}"));

    writer.write_record(headers).map_err(csv_error)?;
    for record in records {
        writer.write_record(&record).map_err(csv_error)?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::internal(format!("CSV write failed: {e}")))
}

// ── Import ──────────────────────────────────────────────────────

/// `;` when the header line has more semicolons than commas.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// One data row. `ligne` counts the header as line 1.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub ligne: usize,
    values: HashMap<String, String>,
}

/// A parsed upload: normalized header names, the readable rows and the
/// lines that could not be read at all.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
    pub unreadable: Vec<(usize, String)>,
}

impl CsvTable {
    /// 400 naming every required column the header lacks.
    pub fn require(&self, columns: &[&str]) -> Result<(), AppError> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !self.headers.iter().any(|h| h == c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::bad_request(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )))
        }
    }
}

pub fn parse_csv(body: &str) -> Result<CsvTable, AppError> {
    let body = body.trim_start_matches(BOM);
    let header_line = body.lines().next().unwrap_or_default();
    if header_line.trim().is_empty() {
        return Err(AppError::bad_request("CSV body is empty"));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(sniff_delimiter(header_line))
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::bad_request(format!("Unreadable CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    let mut unreadable = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                if record.iter().all(|v| v.trim().is_empty()) {
                    continue;
                }
                let ligne = record.position().map(|p| p.line() as usize).unwrap_or(0);
                let values = headers
                    .iter()
                    .cloned()
                    .zip(record.iter().map(|v| v.trim().to_string()))
                    .collect();
                rows.push(CsvRow { ligne, values });
            }
            Err(e) => {
                let ligne = e.position().map(|p| p.line() as usize).unwrap_or(0);
                unreadable.push((ligne, format!("Unreadable row: {e}")));
                if !matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) {
                    break;
                }
            }
        }
    }

    Ok(CsvTable {
        headers,
        rows,
        unreadable,
    })
}

impl CsvRow {
    /// Trimmed value, `None` when the column is absent or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.values
            .get(column)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    pub fn required(&self, column: &str) -> Result<String, String> {
        self.text(column)
            .ok_or_else(|| format!("{column} is required"))
    }

    /// Integer amount; spaces used as thousands separators are accepted.
    pub fn integer(&self, column: &str) -> Result<Option<i64>, String> {
        self.text(column)
            .map(|v| {
                v.replace([' ', '\u{a0}'], "")
                    .parse::<i64>()
                    .map_err(|_| format!("{column}: '{v}' is not a whole number"))
            })
            .transpose()
    }

    /// Decimal number; a comma decimal separator is accepted.
    pub fn decimal(&self, column: &str) -> Result<Option<f64>, String> {
        self.text(column)
            .map(|v| {
                v.replace(' ', "")
                    .replace(',', ".")
                    .parse::<f64>()
                    .map_err(|_| format!("{column}: '{v}' is not a number"))
            })
            .transpose()
    }

    /// `YYYY-MM-DD` or `DD/MM/YYYY`.
    pub fn date(&self, column: &str) -> Result<Option<NaiveDate>, String> {
        self.text(column)
            .map(|v| {
                NaiveDate::parse_from_str(&v, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(&v, "%d/%m/%Y"))
                    .map_err(|_| format!("{column}: '{v}' is not a date"))
            })
            .transpose()
    }

    fn vocab(&self, column: &str, allowed: &[&str]) -> Result<Option<String>, String> {
        match self.text(column) {
            Some(v) => {
                let v = v.to_lowercase();
                check_vocabulary(column, &v, allowed)?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }
}

/// `field: message` pairs of a failed validation, in field order.
fn validation_message(errors: validator::ValidationErrors) -> String {
    let mut fields: Vec<(String, String)> = AppError::from(errors).field_errors.into_iter().collect();
    fields.sort();
    fields
        .into_iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn locataire_from_row(row: &CsvRow) -> Result<CreateLocataireRequest, String> {
    let type_locataire = row
        .vocab("type_locataire", LOCATAIRE_TYPES)?
        .ok_or("type_locataire is required")?;
    let req = CreateLocataireRequest {
        type_locataire,
        nom: row.text("nom"),
        prenom: row.text("prenom"),
        raison_sociale: row.text("raison_sociale"),
        telephone: row.text("telephone"),
        email: row.text("email"),
        piece_identite: row.text("piece_identite"),
        notes: row.text("notes"),
    };
    req.check().map_err(|(_, message)| message)?;
    Ok(req)
}

pub fn client_from_row(row: &CsvRow) -> Result<CreateClientConseilRequest, String> {
    let type_client = row
        .vocab("type_client", CLIENT_TYPES)?
        .ok_or("type_client is required")?;
    let req = CreateClientConseilRequest {
        type_client,
        nom: row.required("nom")?,
        raison_sociale: row.text("raison_sociale"),
        contact_nom: row.text("contact_nom"),
        telephone: row.text("telephone"),
        email: row.text("email"),
        adresse: row.text("adresse"),
        honoraire_mensuel: row.integer("honoraire_mensuel")?.unwrap_or(0),
        statut: row.vocab("statut", CLIENT_STATUTS)?,
        notes: row.text("notes"),
    };
    req.validate().map_err(validation_message)?;
    Ok(req)
}

pub fn dossier_from_row(row: &CsvRow) -> Result<CreateDossierRequest, String> {
    let req = CreateDossierRequest {
        creancier_nom: row.required("creancier_nom")?,
        creancier_contact: row.text("creancier_contact"),
        debiteur_nom: row.required("debiteur_nom")?,
        debiteur_contact: row.text("debiteur_contact"),
        debiteur_adresse: row.text("debiteur_adresse"),
        montant_principal: row
            .integer("montant_principal")?
            .ok_or("montant_principal is required")?,
        frais: row.integer("frais")?.unwrap_or(0),
        interets: row.integer("interets")?.unwrap_or(0),
        statut: row.vocab("statut", RECOUVREMENT_STATUTS)?,
        date_ouverture: row.date("date_ouverture")?,
        notes: row.text("notes"),
    };
    req.validate().map_err(validation_message)?;
    Ok(req)
}

/// A lot row; the building is resolved from its reference at import time.
#[derive(Debug, Clone)]
pub struct LotImport {
    pub immeuble_reference: String,
    pub lot: CreateLotRequest,
}

pub fn lot_from_row(row: &CsvRow) -> Result<LotImport, String> {
    let statut = row.vocab("statut", LOT_STATUTS)?;
    if statut.as_deref() == Some("occupe") {
        return Err("statut: lots are imported libre or travaux".to_string());
    }
    let lot = CreateLotRequest {
        immeuble_id: Uuid::nil(),
        numero: row.required("numero")?,
        type_lot: row
            .vocab("type_lot", LOT_TYPES)?
            .ok_or("type_lot is required")?,
        etage: row.text("etage"),
        surface: row.decimal("surface")?,
        loyer_mensuel: row
            .integer("loyer_mensuel")?
            .ok_or("loyer_mensuel is required")?,
        statut,
    };
    lot.validate().map_err(validation_message)?;
    Ok(LotImport {
        immeuble_reference: row.required("immeuble_reference")?,
        lot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn delimiter_is_sniffed_from_the_header() {
        assert_eq!(sniff_delimiter("nom;prenom;email"), b';');
        assert_eq!(sniff_delimiter("nom,prenom"), b',');
        assert_eq!(sniff_delimiter("nom"), b',');
    }

    #[test]
    fn parse_strips_bom_and_numbers_lines_from_the_header() {
        let body = "\u{feff}Type_Locataire;Nom;Prenom\nparticulier;Kone;Awa\n\nentreprise;;\n";
        let table = parse_csv(body).unwrap();

        assert_eq!(table.headers, vec!["type_locataire", "nom", "prenom"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].ligne, 2);
        assert_eq!(table.rows[0].text("nom").as_deref(), Some("Kone"));
        assert_eq!(table.rows[1].ligne, 4);
        assert_eq!(table.rows[1].text("nom"), None);
    }

    #[test]
    fn missing_columns_are_a_bad_request() {
        let table = parse_csv("nom,numero\nA,1\n").unwrap();
        let err = table
            .require(ImportEntite::Lots.required_columns())
            .unwrap_err();
        assert_eq!(err.status_code_u16(), 400);
        assert!(err.message.contains("immeuble_reference"));
        assert!(err.message.contains("loyer_mensuel"));
        assert!(!err.message.contains("numero"));
    }

    #[test]
    fn empty_body_is_rejected() {
        assert_eq!(parse_csv("").unwrap_err().status_code_u16(), 400);
        assert_eq!(parse_csv("\u{feff}\n").unwrap_err().status_code_u16(), 400);
    }

    #[test]
    fn locataire_rows_follow_the_identity_rule() {
        let table = parse_csv(
            "type_locataire,nom,raison_sociale\nparticulier,Kone,\nentreprise,,\nsociete,X,\n",
        )
        .unwrap();

        let ok = locataire_from_row(&table.rows[0]).unwrap();
        assert_eq!(ok.nom.as_deref(), Some("Kone"));
        assert!(locataire_from_row(&table.rows[1]).is_err());
        let err = locataire_from_row(&table.rows[2]).unwrap_err();
        assert!(err.contains("type_locataire"));
    }

    #[test]
    fn dossier_rows_parse_amounts_and_dates() {
        let table = parse_csv(
            "creancier_nom;debiteur_nom;montant_principal;frais;date_ouverture;statut\n\
             Banque;Yao;1 500 000;25000;05/02/2025;Amiable\n\
             Banque;Yao;beaucoup;;;\n",
        )
        .unwrap();

        let req = dossier_from_row(&table.rows[0]).unwrap();
        assert_eq!(req.montant_principal, 1_500_000);
        assert_eq!(req.frais, 25_000);
        assert_eq!(req.interets, 0);
        assert_eq!(req.statut.as_deref(), Some("amiable"));
        assert_eq!(req.date_ouverture, NaiveDate::from_ymd_opt(2025, 2, 5));

        let err = dossier_from_row(&table.rows[1]).unwrap_err();
        assert!(err.contains("montant_principal"));
    }

    #[test]
    fn client_rows_are_validated() {
        let table = parse_csv(
            "type_client,nom,email,honoraire_mensuel\n\
             entreprise,SIFCA,contact@sifca.ci,150000\n\
             entreprise,SIFCA,pas-un-email,0\n",
        )
        .unwrap();

        let req = client_from_row(&table.rows[0]).unwrap();
        assert_eq!(req.honoraire_mensuel, 150_000);
        let err = client_from_row(&table.rows[1]).unwrap_err();
        assert!(err.starts_with("email:"));
    }

    #[test]
    fn lot_rows_cannot_be_occupied() {
        let table = parse_csv(
            "immeuble_reference,numero,type_lot,loyer_mensuel,surface,statut\n\
             IMM-001,A1,appartement,250000,\"72,5\",libre\n\
             IMM-001,A2,appartement,250000,,occupe\n",
        )
        .unwrap();

        let lot = lot_from_row(&table.rows[0]).unwrap();
        assert_eq!(lot.immeuble_reference, "IMM-001");
        assert_eq!(lot.lot.surface, Some(72.5));
        assert!(lot_from_row(&table.rows[1]).unwrap_err().starts_with("statut"));
    }

    #[test]
    fn export_writes_a_header_and_quotes_when_needed() {
        let bytes = write_csv(
            &["numero", "objet"],
            vec![vec!["FAC-2025-0001".to_string(), "Conseil, audit".to_string()]],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "numero,objet\nFAC-2025-0001,\"Conseil, audit\"\n"
        );
    }

    #[test]
    fn slugs_resolve() {
        assert_eq!(ExportEntite::from_slug("factures"), Some(ExportEntite::Factures));
        assert_eq!(ExportEntite::from_slug("audiences"), None);
        assert_eq!(ImportEntite::from_slug("lots").map(|e| e.slug()), Some("lots"));
        assert_eq!(ImportEntite::from_slug("affaires"), None);
    }
}
