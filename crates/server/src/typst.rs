use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use ecow::EcoVec;
use shared_types::money::format_montant_devise;
use shared_types::{
    ActionRecouvrement, Affaire, AppError, CabinetSettings, ClientConseil, DepensesAffaire,
    DossierResponse, FactureResponse, HonorairesResponse, Immeuble, PaiementConseil,
    PaiementHonoraires, PaiementRecouvrement,
};
use typst::diag::{FileError, FileResult, SourceDiagnostic};
use typst::foundations::{Bytes, Datetime};
use typst::layout::PagedDocument;
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use uuid::Uuid;

use crate::repo::encaissement::EncaissementDetail;

const BASE_TEMPLATE: &str = include_str!("../../../templates/base.typ");

const MOIS: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

/// Escape a value for use inside a Typst string literal.
pub fn escape_typst(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn date_fr(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `2025-03-01` → `"mars 2025"`.
pub fn mois_fr(date: NaiveDate) -> String {
    format!("{} {}", MOIS[date.month0() as usize], date.year())
}

/// Human label for an optional month range.
pub fn periode_label(du: Option<NaiveDate>, au: Option<NaiveDate>) -> String {
    match (du, au) {
        (Some(du), Some(au)) if du == au => mois_fr(du),
        (Some(du), Some(au)) => format!("{} à {}", mois_fr(du), mois_fr(au)),
        (Some(du), None) => format!("depuis {}", mois_fr(du)),
        (None, Some(au)) => format!("jusqu'à {}", mois_fr(au)),
        (None, None) => "toutes périodes".to_string(),
    }
}

fn taux_label(taux: f64) -> String {
    format!("{taux} %")
}

fn vocab_label(value: &str) -> String {
    value.replace('_', " ")
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("-")
        .to_string()
}

/// `#let` bindings written ahead of the shared layout and a report template.
struct Bindings {
    out: String,
    devise: String,
}

impl Bindings {
    fn new(cabinet: &CabinetSettings, titre: &str, date_edition: NaiveDate) -> Self {
        let bindings = Self {
            out: String::new(),
            devise: cabinet.devise.clone(),
        };
        bindings
            .text("cabinet_nom", &cabinet.nom)
            .text("cabinet_ville", &cabinet.ville)
            .text("date_edition", &date_fr(date_edition))
            .text("titre_document", titre)
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.out
            .push_str(&format!("#let {name} = \"{}\"\n", escape_typst(value)));
        self
    }

    fn montant(self, name: &str, amount: i64) -> Self {
        let value = format_montant_devise(amount, &self.devise);
        self.text(name, &value)
    }

    fn rows(mut self, name: &str, rows: &[Vec<String>]) -> Self {
        self.out.push_str(&format!("#let {name} = {}\n", typst_rows(rows)));
        self
    }

    fn render(self, template: &str) -> String {
        format!("{}\n{BASE_TEMPLATE}\n{template}", self.out)
    }
}

/// Array of arrays of strings. The trailing commas keep one-element
/// arrays from being read as parenthesized expressions.
fn typst_rows(rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return "()".to_string();
    }
    let mut out = String::from("(");
    for row in rows {
        out.push('(');
        for cell in row {
            out.push_str(&format!("\"{}\", ", escape_typst(cell)));
        }
        out.push_str("), ");
    }
    out.push(')');
    out
}

/// Monthly management statement of a building: rents collected, CAPCO
/// commission and net amount due to the owner.
pub fn releve_encaissements_source(
    cabinet: &CabinetSettings,
    today: NaiveDate,
    immeuble: &Immeuble,
    periode: &str,
    lignes: &[EncaissementDetail],
) -> String {
    let devise = &cabinet.devise;
    let rows: Vec<Vec<String>> = lignes
        .iter()
        .map(|l| {
            let e = &l.encaissement;
            vec![
                mois_fr(e.periode),
                l.lot_numero.clone(),
                or_dash(Some(&l.locataire())),
                date_fr(e.date_encaissement),
                format_montant_devise(e.montant, devise),
                format_montant_devise(e.commission_capco, devise),
                format_montant_devise(e.montant_net, devise),
            ]
        })
        .collect();
    let total = |f: fn(&EncaissementDetail) -> i64| lignes.iter().map(f).sum::<i64>();

    let adresse = match immeuble.ville.as_deref() {
        Some(ville) if !ville.trim().is_empty() => format!("{}, {}", immeuble.adresse, ville),
        _ => immeuble.adresse.clone(),
    };

    Bindings::new(cabinet, "Relevé de gérance", today)
        .text("immeuble_nom", &immeuble.nom)
        .text("immeuble_reference", &immeuble.reference)
        .text("proprietaire", &immeuble.proprietaire_nom)
        .text("adresse", &adresse)
        .text("periode", periode)
        .text("taux_commission", &taux_label(immeuble.taux_commission))
        .rows("lignes", &rows)
        .montant("total_encaisse", total(|l| l.encaissement.montant))
        .montant("total_commission", total(|l| l.encaissement.commission_capco))
        .montant("total_net", total(|l| l.encaissement.montant_net))
        .render(include_str!("../../../templates/releve-encaissements.typ"))
}

/// Statement of a debt-collection file: amounts, actions taken, payments.
pub fn releve_recouvrement_source(
    cabinet: &CabinetSettings,
    today: NaiveDate,
    dossier: &DossierResponse,
    actions: &[ActionRecouvrement],
    paiements: &[PaiementRecouvrement],
) -> String {
    let d = &dossier.dossier;
    let s = &dossier.situation;
    let devise = &cabinet.devise;

    let actions: Vec<Vec<String>> = actions
        .iter()
        .map(|a| {
            vec![
                date_fr(a.date_action),
                vocab_label(&a.type_action),
                a.description.clone(),
                or_dash(a.resultat.as_deref()),
            ]
        })
        .collect();
    let paiements: Vec<Vec<String>> = paiements
        .iter()
        .map(|p| {
            vec![
                date_fr(p.date_paiement),
                vocab_label(&p.mode_paiement),
                or_dash(p.reference.as_deref()),
                format_montant_devise(p.montant, devise),
            ]
        })
        .collect();

    Bindings::new(cabinet, "Relevé de recouvrement", today)
        .text("reference", &d.reference)
        .text("creancier", &d.creancier_nom)
        .text("debiteur", &d.debiteur_nom)
        .text("debiteur_adresse", &or_dash(d.debiteur_adresse.as_deref()))
        .text("date_ouverture", &date_fr(d.date_ouverture))
        .text("statut", &vocab_label(&d.statut))
        .montant("montant_principal", d.montant_principal)
        .montant("frais", d.frais)
        .montant("interets", d.interets)
        .montant("montant_du", s.montant_du)
        .montant("montant_recouvre", s.montant_recouvre)
        .montant("reste_du", s.reste_du)
        .text("taux_recouvrement", &format!("{:.1} %", s.taux_recouvrement))
        .rows("actions", &actions)
        .rows("paiements", &paiements)
        .render(include_str!("../../../templates/releve-recouvrement.typ"))
}

/// Printable advisory invoice with its payments.
pub fn facture_source(
    cabinet: &CabinetSettings,
    today: NaiveDate,
    facture: &FactureResponse,
    client: &ClientConseil,
    paiements: &[PaiementConseil],
) -> String {
    let f = &facture.facture;
    let devise = &cabinet.devise;
    let titre = if f.statut == "brouillon" {
        "Facture (brouillon)"
    } else {
        "Facture"
    };

    let paiements: Vec<Vec<String>> = paiements
        .iter()
        .map(|p| {
            vec![
                date_fr(p.date_paiement),
                vocab_label(&p.mode_paiement),
                or_dash(p.reference.as_deref()),
                format_montant_devise(p.montant, devise),
            ]
        })
        .collect();

    Bindings::new(cabinet, titre, today)
        .text("numero", &f.numero)
        .text("date_emission", &date_fr(f.date_emission))
        .text("date_echeance", &f.date_echeance.map(date_fr).unwrap_or_else(|| "-".into()))
        .text("statut", &vocab_label(&f.statut))
        .text("client", client.designation())
        .text("client_adresse", &or_dash(client.adresse.as_deref()))
        .text("objet", &f.objet)
        .text("taux_tva", &taux_label(f.taux_tva))
        .montant("montant_ht", f.montant_ht)
        .montant("montant_tva", f.montant_tva)
        .montant("montant_ttc", f.montant_ttc)
        .montant("montant_paye", facture.montant_paye)
        .montant("reste_a_payer", facture.reste_a_payer)
        .rows("paiements", &paiements)
        .render(include_str!("../../../templates/facture.typ"))
}

/// Fee statement of an affaire: agreements, payments received, expenses.
pub fn honoraires_source(
    cabinet: &CabinetSettings,
    today: NaiveDate,
    affaire: &Affaire,
    conventions: &[HonorairesResponse],
    paiements: &[PaiementHonoraires],
    depenses: &DepensesAffaire,
) -> String {
    let devise = &cabinet.devise;

    let libelle_convention = |id: Uuid| {
        conventions
            .iter()
            .find(|c| c.honoraires.id == id)
            .map(|c| c.honoraires.libelle.clone())
            .unwrap_or_default()
    };

    let lignes_conventions: Vec<Vec<String>> = conventions
        .iter()
        .map(|c| {
            vec![
                c.honoraires.libelle.clone(),
                vocab_label(&c.honoraires.mode_facturation),
                date_fr(c.honoraires.date_convention),
                format_montant_devise(c.honoraires.montant_convenu, devise),
                format_montant_devise(c.montant_paye, devise),
                format_montant_devise(c.reste_a_payer, devise),
            ]
        })
        .collect();
    let lignes_paiements: Vec<Vec<String>> = paiements
        .iter()
        .map(|p| {
            vec![
                date_fr(p.date_paiement),
                libelle_convention(p.honoraires_id),
                vocab_label(&p.mode_paiement),
                or_dash(p.reference.as_deref()),
                format_montant_devise(p.montant, devise),
            ]
        })
        .collect();
    let lignes_depenses: Vec<Vec<String>> = depenses
        .depenses
        .iter()
        .map(|d| {
            vec![
                date_fr(d.date_depense),
                vocab_label(&d.categorie),
                d.libelle.clone(),
                format_montant_devise(d.montant, devise),
            ]
        })
        .collect();

    Bindings::new(cabinet, "Relevé d'honoraires", today)
        .text("reference", &affaire.reference)
        .text("intitule", &affaire.intitule)
        .text("client", &affaire.client_nom)
        .text("juridiction", &affaire.juridiction)
        .text("statut", &vocab_label(&affaire.statut))
        .rows("conventions", &lignes_conventions)
        .rows("paiements", &lignes_paiements)
        .rows("depenses", &lignes_depenses)
        .montant("total_convenu", conventions.iter().map(|c| c.honoraires.montant_convenu).sum())
        .montant("total_paye", conventions.iter().map(|c| c.montant_paye).sum())
        .montant("total_reste", conventions.iter().map(|c| c.reste_a_payer).sum())
        .montant("total_depenses", depenses.total)
        .render(include_str!("../../../templates/honoraires.typ"))
}

// ---------------------------------------------------------------------------
// Fonts and standard library, loaded once per process
// ---------------------------------------------------------------------------

static FONTS: LazyLock<Vec<Font>> = LazyLock::new(|| {
    typst_assets::fonts()
        .flat_map(|data| Font::iter(Bytes::new(data)))
        .collect()
});

static FONT_BOOK: LazyLock<LazyHash<FontBook>> = LazyLock::new(|| {
    LazyHash::new(FontBook::from_fonts(FONTS.iter()))
});

static LIBRARY: LazyLock<LazyHash<Library>> = LazyLock::new(|| {
    LazyHash::new(Library::default())
});

// ---------------------------------------------------------------------------
// World implementation for in-process Typst compilation
// ---------------------------------------------------------------------------

struct CapcoWorld {
    source: Source,
}

impl CapcoWorld {
    fn new(source_text: &str) -> Self {
        Self {
            source: Source::detached(source_text),
        }
    }
}

impl World for CapcoWorld {
    fn library(&self) -> &LazyHash<Library> {
        &LIBRARY
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &FONT_BOOK
    }

    fn main(&self) -> FileId {
        self.source.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.source.id() {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rooted_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rooted_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        FONTS.get(index).cloned()
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let now = chrono::Utc::now();
        let naive = if let Some(hours) = offset {
            let tz = chrono::FixedOffset::east_opt((hours as i32) * 3600)?;
            now.with_timezone(&tz).naive_local()
        } else {
            now.naive_utc()
        };
        Datetime::from_ymd(
            naive.year(),
            (naive.month0() + 1) as u8,
            (naive.day0() + 1) as u8,
        )
    }
}

// ---------------------------------------------------------------------------
// Public compilation entry point
// ---------------------------------------------------------------------------

/// Compile a Typst source string into PDF bytes using the in-process library.
///
/// Compilation is offloaded to a blocking thread since it is CPU-bound.
pub async fn compile_typst(source: &str) -> Result<Vec<u8>, AppError> {
    let source = source.to_owned();

    tokio::task::spawn_blocking(move || compile_typst_sync(&source))
        .await
        .map_err(|e| AppError::internal(format!("Typst task panicked: {e}")))?
}

fn compile_typst_sync(source: &str) -> Result<Vec<u8>, AppError> {
    let world = CapcoWorld::new(source);

    let warned = typst::compile::<PagedDocument>(&world);
    let document = warned.output.map_err(|diagnostics| {
        format_diagnostics("Typst compilation failed", &diagnostics)
    })?;

    typst_pdf::pdf(&document, &typst_pdf::PdfOptions::default()).map_err(|diagnostics| {
        format_diagnostics("PDF export failed", &diagnostics)
    })
}

fn format_diagnostics(prefix: &str, diagnostics: &EcoVec<SourceDiagnostic>) -> AppError {
    let msgs: Vec<String> = diagnostics
        .iter()
        .map(|d| d.message.to_string())
        .collect();
    AppError::internal(format!("{prefix}: {}", msgs.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{DossierRecouvrement, FactureConseil, SituationRecouvrement};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn client() -> ClientConseil {
        ClientConseil {
            id: Uuid::new_v4(),
            reference: "CLI-0001".into(),
            type_client: "entreprise".into(),
            nom: "Kouassi".into(),
            raison_sociale: Some("Société \"Ivoire\" Négoce".into()),
            contact_nom: None,
            telephone: None,
            email: None,
            adresse: Some("Plateau\nAbidjan".into()),
            honoraire_mensuel: 0,
            statut: "actif".into(),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn facture(client_id: Uuid) -> FactureResponse {
        FactureResponse {
            facture: FactureConseil {
                id: Uuid::new_v4(),
                numero: "FAC-2025-0007".into(),
                client_id,
                objet: "Consultation #1".into(),
                date_emission: today(),
                date_echeance: None,
                montant_ht: 100_000,
                taux_tva: 18.0,
                montant_tva: 18_000,
                montant_ttc: 118_000,
                statut: "partiellement_payee".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            client_nom: "Société Ivoire Négoce".into(),
            montant_paye: 50_000,
            reste_a_payer: 68_000,
            en_retard: false,
        }
    }

    #[test]
    fn escape_quotes_backslashes_and_control_chars() {
        assert_eq!(escape_typst(r#"a "b" c\d"#), r#"a \"b\" c\\d"#);
        assert_eq!(escape_typst("l1\nl2\tx\r"), "l1\\nl2\\tx\\r");
        assert_eq!(escape_typst("#strong[x]"), "#strong[x]");
    }

    #[test]
    fn rows_are_always_arrays() {
        assert_eq!(typst_rows(&[]), "()");
        assert_eq!(
            typst_rows(&[vec!["seul".to_string()]]),
            r#"(("seul", ), )"#
        );
    }

    #[test]
    fn periode_labels() {
        let jan = NaiveDate::from_ymd_opt(2025, 1, 1);
        let mar = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(periode_label(jan, jan), "janvier 2025");
        assert_eq!(periode_label(jan, mar), "janvier 2025 à mars 2025");
        assert_eq!(periode_label(None, None), "toutes périodes");
        assert_eq!(mois_fr(NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()), "août 2024");
    }

    #[test]
    fn facture_source_binds_amounts_and_escaped_client() {
        let client = client();
        let facture = facture(client.id);
        let source = facture_source(&CabinetSettings::default(), today(), &facture, &client, &[]);

        assert!(source.starts_with("#let cabinet_nom = \"CAPCO\"\n"));
        assert!(source.contains("#let date_edition = \"15/03/2025\""));
        assert!(source.contains("#let client = \"Société \\\"Ivoire\\\" Négoce\""));
        assert!(source.contains("#let client_adresse = \"Plateau\\nAbidjan\""));
        assert!(source.contains("#let montant_ttc = \"118 000 FCFA\""));
        assert!(source.contains("#let reste_a_payer = \"68 000 FCFA\""));
        assert!(source.contains("#let date_echeance = \"-\""));
        assert!(source.contains("#let paiements = ()"));
        assert!(source.contains("#entete(\"N° \" + numero)"));
    }

    #[test]
    fn recouvrement_source_lists_actions() {
        let dossier = DossierResponse {
            dossier: DossierRecouvrement {
                id: Uuid::new_v4(),
                reference: "REC-2025-0001".into(),
                creancier_nom: "Banque Atlantique".into(),
                creancier_contact: None,
                debiteur_nom: "Yao".into(),
                debiteur_contact: None,
                debiteur_adresse: None,
                montant_principal: 1_000_000,
                frais: 50_000,
                interets: 0,
                statut: "amiable".into(),
                date_ouverture: today(),
                date_cloture: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            situation: SituationRecouvrement::compute(1_000_000, 50_000, 0, 262_500),
        };
        let action = ActionRecouvrement {
            id: Uuid::new_v4(),
            dossier_id: dossier.dossier.id,
            type_action: "mise_en_demeure".into(),
            date_action: today(),
            description: "Courrier recommandé".into(),
            resultat: None,
            prochaine_etape: None,
            date_prochaine_etape: None,
            created_at: Utc::now(),
        };

        let source = releve_recouvrement_source(
            &CabinetSettings::default(),
            today(),
            &dossier,
            &[action],
            &[],
        );
        assert!(source.contains("#let montant_du = \"1 050 000 FCFA\""));
        assert!(source.contains("#let taux_recouvrement = \"25.0 %\""));
        assert!(source.contains(
            r#"#let actions = (("15/03/2025", "mise en demeure", "Courrier recommandé", "-", ), )"#
        ));
    }

    #[test]
    fn facture_compiles_to_pdf() {
        let client = client();
        let paiement = PaiementConseil {
            id: Uuid::new_v4(),
            facture_id: Uuid::new_v4(),
            montant: 50_000,
            date_paiement: today(),
            mode_paiement: "mobile_money".into(),
            reference: None,
            created_at: Utc::now(),
        };
        let source = facture_source(
            &CabinetSettings::default(),
            today(),
            &facture(client.id),
            &client,
            &[paiement],
        );
        let pdf = compile_typst_sync(&source).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
