use std::sync::{Mutex, OnceLock};

use shared_types::{
    Affaire, AppError, ClientConseil, DossierRecouvrement, FactureConseil, Immeuble, Locataire,
    SearchResult,
};
use sqlx::{Pool, Postgres};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

/// Global search index, initialized once during server startup.
static SEARCH_INDEX: OnceLock<SearchIndex> = OnceLock::new();

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// One record as it is stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDocument {
    pub id: String,
    pub entity_type: &'static str,
    pub title: String,
    pub subtitle: String,
}

impl SearchDocument {
    fn key(&self) -> String {
        document_key(self.entity_type, &self.id)
    }
}

fn document_key(entity_type: &str, id: &str) -> String {
    format!("{entity_type}:{id}")
}

fn join_non_empty(parts: &[Option<&str>], sep: &str) -> String {
    parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

impl From<&Affaire> for SearchDocument {
    fn from(a: &Affaire) -> Self {
        Self {
            id: a.id.to_string(),
            entity_type: "affaire",
            title: format!("{} - {}", a.reference, a.intitule),
            subtitle: join_non_empty(
                &[
                    Some(&a.client_nom),
                    a.partie_adverse.as_deref(),
                    Some(&a.juridiction),
                ],
                " | ",
            ),
        }
    }
}

impl From<&DossierRecouvrement> for SearchDocument {
    fn from(d: &DossierRecouvrement) -> Self {
        Self {
            id: d.id.to_string(),
            entity_type: "dossier_recouvrement",
            title: format!("{} - {}", d.reference, d.debiteur_nom),
            subtitle: format!("Créancier {} | {}", d.creancier_nom, d.statut),
        }
    }
}

impl From<&Immeuble> for SearchDocument {
    fn from(i: &Immeuble) -> Self {
        Self {
            id: i.id.to_string(),
            entity_type: "immeuble",
            title: format!("{} - {}", i.reference, i.nom),
            subtitle: join_non_empty(
                &[Some(&i.adresse), i.ville.as_deref(), Some(&i.proprietaire_nom)],
                " | ",
            ),
        }
    }
}

impl From<&Locataire> for SearchDocument {
    fn from(l: &Locataire) -> Self {
        Self {
            id: l.id.to_string(),
            entity_type: "locataire",
            title: l.designation(),
            subtitle: join_non_empty(&[l.telephone.as_deref(), l.email.as_deref()], " | "),
        }
    }
}

impl From<&ClientConseil> for SearchDocument {
    fn from(c: &ClientConseil) -> Self {
        Self {
            id: c.id.to_string(),
            entity_type: "client_conseil",
            title: format!("{} - {}", c.reference, c.designation()),
            subtitle: join_non_empty(
                &[c.contact_nom.as_deref(), c.email.as_deref(), c.telephone.as_deref()],
                " | ",
            ),
        }
    }
}

impl From<&FactureConseil> for SearchDocument {
    fn from(f: &FactureConseil) -> Self {
        Self {
            id: f.id.to_string(),
            entity_type: "facture",
            title: format!("{} - {}", f.numero, f.objet),
            subtitle: format!("{} | {} F TTC", f.statut, f.montant_ttc),
        }
    }
}

/// Schema field handles for the Tantivy index.
struct SearchFields {
    key: Field,
    id: Field,
    entity_type: Field,
    title: Field,
    subtitle: Field,
}

/// In-memory Tantivy index over the firm's main records.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: SearchFields,
}

impl SearchIndex {
    /// Create a new in-RAM search index with the standard schema.
    pub fn new() -> tantivy::Result<Self> {
        let mut schema_builder = Schema::builder();
        let key = schema_builder.add_text_field("key", STRING);
        let id = schema_builder.add_text_field("id", STORED);
        let entity_type = schema_builder.add_text_field("entity_type", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT | STORED);
        let subtitle = schema_builder.add_text_field("subtitle", TEXT | STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(WRITER_HEAP_BYTES)?;

        Ok(SearchIndex {
            index,
            reader,
            writer: Mutex::new(writer),
            fields: SearchFields {
                key,
                id,
                entity_type,
                title,
                subtitle,
            },
        })
    }

    fn to_tantivy(&self, d: &SearchDocument) -> TantivyDocument {
        let f = &self.fields;
        doc!(
            f.key => d.key(),
            f.id => d.id.as_str(),
            f.entity_type => d.entity_type,
            f.title => d.title.as_str(),
            f.subtitle => d.subtitle.as_str(),
        )
    }

    /// Replace the whole content of the index.
    pub fn rebuild(&self, docs: &[SearchDocument]) -> tantivy::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| tantivy::TantivyError::SystemError("search writer poisoned".into()))?;
        writer.delete_all_documents()?;
        for d in docs {
            writer.add_document(self.to_tantivy(d))?;
        }
        writer.commit()?;
        self.reader.reload()
    }

    /// Insert a record, replacing any previous version of it.
    pub fn upsert(&self, d: &SearchDocument) -> tantivy::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| tantivy::TantivyError::SystemError("search writer poisoned".into()))?;
        writer.delete_term(Term::from_field_text(self.fields.key, &d.key()));
        writer.add_document(self.to_tantivy(d))?;
        writer.commit()?;
        self.reader.reload()
    }

    pub fn remove(&self, entity_type: &str, id: &str) -> tantivy::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| tantivy::TantivyError::SystemError("search writer poisoned".into()))?;
        writer.delete_term(Term::from_field_text(
            self.fields.key,
            &document_key(entity_type, id),
        ));
        writer.commit()?;
        self.reader.reload()
    }

    /// Full-text search over titles and subtitles.
    ///
    /// `entity_types` restricts the hits to those types; empty means all.
    /// Syntax errors in the query are tolerated.
    pub fn search(&self, query_str: &str, entity_types: &[String], limit: usize) -> Vec<SearchResult> {
        if query_str.trim().is_empty() {
            return Vec::new();
        }

        let searcher = self.reader.searcher();
        let query_parser =
            QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.subtitle]);
        let (text_query, _errors) = query_parser.parse_query_lenient(query_str);

        let query: Box<dyn Query> = if entity_types.is_empty() {
            text_query
        } else {
            let types: Vec<(Occur, Box<dyn Query>)> = entity_types
                .iter()
                .map(|t| {
                    let q: Box<dyn Query> = Box::new(TermQuery::new(
                        Term::from_field_text(self.fields.entity_type, t),
                        IndexRecordOption::Basic,
                    ));
                    (Occur::Should, q)
                })
                .collect();
            Box::new(BooleanQuery::new(vec![
                (Occur::Must, text_query),
                (Occur::Must, Box::new(BooleanQuery::new(types))),
            ]))
        };

        let top_docs = match searcher.search(&query, &TopDocs::with_limit(limit)) {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Search query failed");
                return Vec::new();
            }
        };

        let text = |doc: &TantivyDocument, field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string()
        };

        top_docs
            .into_iter()
            .filter_map(|(_score, address)| searcher.doc::<TantivyDocument>(address).ok())
            .map(|doc| SearchResult {
                id: text(&doc, self.fields.id),
                entity_type: text(&doc, self.fields.entity_type),
                title: text(&doc, self.fields.title),
                subtitle: text(&doc, self.fields.subtitle),
            })
            .collect()
    }
}

/// Get the global SearchIndex, if search is enabled and initialized.
pub fn get_search() -> Option<&'static SearchIndex> {
    SEARCH_INDEX.get()
}

/// Initialize the global SearchIndex. Should be called once at startup.
pub fn init_search() -> Result<&'static SearchIndex, AppError> {
    if let Some(existing) = SEARCH_INDEX.get() {
        return Ok(existing);
    }
    let index = SearchIndex::new()
        .map_err(|e| AppError::internal(format!("Search index creation failed: {}", e)))?;
    Ok(SEARCH_INDEX.get_or_init(|| index))
}

/// (Re)index one record. No-op when search is disabled.
pub fn index<T>(record: &T)
where
    for<'a> &'a T: Into<SearchDocument>,
{
    if let Some(search) = get_search() {
        let d: SearchDocument = record.into();
        if let Err(e) = search.upsert(&d) {
            tracing::warn!(entity_type = d.entity_type, id = %d.id, error = %e, "Failed to index record");
        }
    }
}

/// Drop one record from the index. No-op when search is disabled.
pub fn unindex(entity_type: &str, id: impl ToString) {
    if let Some(search) = get_search() {
        let id = id.to_string();
        if let Err(e) = search.remove(entity_type, &id) {
            tracing::warn!(entity_type, id = %id, error = %e, "Failed to remove record from index");
        }
    }
}

/// Load every indexed entity from the database.
pub async fn load_documents(pool: &Pool<Postgres>) -> Result<Vec<SearchDocument>, AppError> {
    let mut docs = Vec::new();

    let affaires = crate::repo::affaire::list_all(pool, &Default::default()).await?;
    docs.extend(affaires.iter().map(SearchDocument::from));

    let dossiers = crate::repo::recouvrement::list_all(pool, &Default::default()).await?;
    docs.extend(dossiers.iter().map(|row| SearchDocument::from(&row.dossier)));

    let immeubles = crate::repo::immobilier::list_all_immeubles(pool).await?;
    docs.extend(immeubles.iter().map(SearchDocument::from));

    let locataires = crate::repo::immobilier::list_all_locataires(pool, &Default::default()).await?;
    docs.extend(locataires.iter().map(SearchDocument::from));

    let clients = crate::repo::conseil::list_all_clients(pool, &Default::default()).await?;
    docs.extend(clients.iter().map(SearchDocument::from));

    let factures = crate::repo::conseil::list_all_factures(pool, &Default::default()).await?;
    docs.extend(factures.iter().map(|row| SearchDocument::from(&row.facture)));

    Ok(docs)
}

/// Build the full-text search index from the database.
/// Should be called once at server startup after migrations complete.
pub async fn build_index(pool: &Pool<Postgres>, search: &SearchIndex) -> Result<usize, AppError> {
    let docs = load_documents(pool).await?;
    search
        .rebuild(&docs)
        .map_err(|e| AppError::internal(format!("Search index build failed: {}", e)))?;
    Ok(docs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(entity_type: &'static str, id: &str, title: &str, subtitle: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            entity_type,
            title: title.to_string(),
            subtitle: subtitle.to_string(),
        }
    }

    fn sample_index() -> SearchIndex {
        let index = SearchIndex::new().unwrap();
        index
            .rebuild(&[
                document("affaire", "a1", "AFF-2025-0001 - SCI Plateau c/ Diallo", "SCI Plateau | Diallo"),
                document("dossier_recouvrement", "d1", "REC-2025-0001 - Diallo Import", "Créancier SGBCI | ouvert"),
                document("locataire", "l1", "Awa Kone", "0707070707"),
                document("facture", "f1", "FAC-2025-0003 - Assistance fiscale", "emise | 590000 F TTC"),
            ])
            .unwrap();
        index
    }

    #[test]
    fn finds_records_by_title_words() {
        let index = sample_index();
        let hits = index.search("diallo", &[], 10);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(hits.len(), 2);
        assert!(ids.contains(&"a1"));
        assert!(ids.contains(&"d1"));
    }

    #[test]
    fn filters_by_entity_type() {
        let index = sample_index();
        let hits = index.search("diallo", &["dossier_recouvrement".to_string()], 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_type, "dossier_recouvrement");
        assert_eq!(hits[0].subtitle, "Créancier SGBCI | ouvert");
    }

    #[test]
    fn blank_query_returns_nothing() {
        let index = sample_index();
        assert!(index.search("   ", &[], 10).is_empty());
    }

    #[test]
    fn tolerates_query_syntax_errors() {
        let index = sample_index();
        let hits = index.search("kone AND (", &[], 10);
        assert!(hits.iter().all(|h| h.id == "l1"));
    }

    #[test]
    fn upsert_replaces_previous_version() {
        let index = sample_index();
        index
            .upsert(&document("locataire", "l1", "Awa Traore", "0707070707"))
            .unwrap();
        assert!(index.search("kone", &[], 10).is_empty());
        assert_eq!(index.search("traore", &[], 10).len(), 1);

        index.remove("locataire", "l1").unwrap();
        assert!(index.search("traore", &[], 10).is_empty());
    }

    #[test]
    fn limit_caps_the_hits() {
        let index = sample_index();
        assert_eq!(index.search("diallo", &[], 1).len(), 1);
    }

    #[test]
    fn subtitle_skips_missing_parts() {
        assert_eq!(join_non_empty(&[Some("a"), None, Some(" "), Some("b")], " | "), "a | b");
    }
}
