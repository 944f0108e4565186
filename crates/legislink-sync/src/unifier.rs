//! Assembly of a [`Project`] from a [`LinkResult`].
//!
//! Base fields come from the government record and, when linked, the
//! matched process. Enrichment lookups then run one by one, each in its own
//! failure boundary: a failed lookup leaves its field unset. The phase is
//! resolved last.

use std::future::Future;
use std::sync::Arc;

use legislink_core::{
    Committee, LinkResult, Origin, PhaseResolver, ProcessRecord, Project, Publication,
    Rapporteur, SenatePosition, TribunalCase, Voting, normalize, timeline,
};
use tracing::{debug, warn};

use crate::{FetchError, ParliamentRegistry, PublicationRegistry, TribunalRegistry};

const GOVERNMENT_PROJECT_URL: &str = "https://legislacja.rcl.gov.pl/projekt";
const DEFAULT_DOCUMENT_TYPE: &str = "projekt ustawy";

/// The outcome of one successful enrichment lookup.
#[derive(Debug, Clone, PartialEq)]
enum Enrichment {
    FinalVoting(Option<Voting>),
    Committees(Vec<Committee>),
    Rapporteurs(Vec<Rapporteur>),
    SenatePosition(Option<SenatePosition>),
    SignatureDate(Option<String>),
    Publication(Option<Publication>),
    TribunalCases(Vec<TribunalCase>),
}

impl Enrichment {
    fn apply(self, project: &mut Project) {
        match self {
            // Without a final voting, the last stage voting stays in place.
            Self::FinalVoting(voting) => {
                if voting.is_some() {
                    project.voting = voting;
                }
            }
            Self::Committees(committees) => project.committees = committees,
            Self::Rapporteurs(rapporteurs) => project.rapporteurs = rapporteurs,
            Self::SenatePosition(position) => project.senate_position = position,
            Self::SignatureDate(date) => project.signature_date = date,
            Self::Publication(publication) => {
                if let Some(url) = publication.as_ref().and_then(|p| p.publication_url.clone()) {
                    project.publication_url = Some(url);
                }
                project.publication = publication;
            }
            Self::TribunalCases(cases) => project.tribunal_cases = cases,
        }
    }
}

/// Await one lookup; a failure is logged and becomes `None`.
async fn attempt<T>(
    label: &'static str,
    key: &str,
    lookup: impl Future<Output = Result<T, FetchError>>,
    wrap: fn(T) -> Enrichment,
) -> Option<Enrichment> {
    match lookup.await {
        Ok(value) => Some(wrap(value)),
        Err(e) => {
            warn!(lookup = label, key, error = %e, "enrichment lookup failed, field left unset");
            None
        }
    }
}

pub struct Unifier {
    resolver: PhaseResolver,
    enrich: bool,
    parliament: Option<Arc<dyn ParliamentRegistry>>,
    publications: Option<Arc<dyn PublicationRegistry>>,
    tribunal: Option<Arc<dyn TribunalRegistry>>,
}

impl Unifier {
    /// A unifier without lookup collaborators. Attach them with the
    /// `with_*` builders; enrichment is on by default.
    pub fn new(resolver: PhaseResolver) -> Self {
        Self {
            resolver,
            enrich: true,
            parliament: None,
            publications: None,
            tribunal: None,
        }
    }

    pub fn with_parliament(mut self, registry: Arc<dyn ParliamentRegistry>) -> Self {
        self.parliament = Some(registry);
        self
    }

    pub fn with_publications(mut self, registry: Arc<dyn PublicationRegistry>) -> Self {
        self.publications = Some(registry);
        self
    }

    pub fn with_tribunal(mut self, registry: Arc<dyn TribunalRegistry>) -> Self {
        self.tribunal = Some(registry);
        self
    }

    pub fn enrich(mut self, enabled: bool) -> Self {
        self.enrich = enabled;
        self
    }

    pub async fn unify(&self, link: &LinkResult) -> Project {
        let mut project = base_project(link);
        if let Some(process) = &link.process {
            apply_process(&mut project, process);
            if self.enrich {
                for enrichment in self.enrichments(&project, process).await {
                    enrichment.apply(&mut project);
                }
            }
        }
        let phase = project.refresh_phase(&self.resolver);
        debug!(id = %project.government_id, phase = %phase, stages = project.stages.len(), "unified");
        project
    }

    /// Unify each link result in input order.
    pub async fn unify_all(&self, links: &[LinkResult]) -> Vec<Project> {
        let mut projects = Vec::with_capacity(links.len());
        for link in links {
            projects.push(self.unify(link).await);
        }
        projects
    }

    async fn enrichments(&self, project: &Project, process: &ProcessRecord) -> Vec<Enrichment> {
        let mut attempts: Vec<Option<Enrichment>> = Vec::new();

        if let (Some(registry), Some(term)) = (&self.parliament, project.term) {
            let print = process.number.as_str();
            attempts.push(
                attempt(
                    "final_voting",
                    print,
                    registry.fetch_final_voting(print, term),
                    Enrichment::FinalVoting,
                )
                .await,
            );
            attempts.push(
                attempt(
                    "committees",
                    print,
                    registry.fetch_committees(print, term),
                    Enrichment::Committees,
                )
                .await,
            );
            attempts.push(
                attempt(
                    "rapporteurs",
                    print,
                    registry.fetch_rapporteurs(print, term),
                    Enrichment::Rapporteurs,
                )
                .await,
            );
            attempts.push(
                attempt(
                    "senate_position",
                    print,
                    registry.fetch_senate_position(print, term),
                    Enrichment::SenatePosition,
                )
                .await,
            );
            attempts.push(
                attempt(
                    "signature_date",
                    print,
                    registry.fetch_signature_date(print, term),
                    Enrichment::SignatureDate,
                )
                .await,
            );
        }

        if let Some(key) = project.publication_key.as_deref() {
            if let Some(registry) = &self.publications {
                attempts.push(
                    attempt(
                        "publication",
                        key,
                        registry.fetch_publication(key),
                        Enrichment::Publication,
                    )
                    .await,
                );
            }
            if let Some(registry) = &self.tribunal {
                attempts.push(
                    attempt(
                        "tribunal_cases",
                        key,
                        registry.fetch_tribunal_cases(key),
                        Enrichment::TribunalCases,
                    )
                    .await,
                );
            }
        }

        attempts.into_iter().flatten().collect()
    }
}

/// Fields every project has, linked or not.
fn base_project(link: &LinkResult) -> Project {
    let record = &link.record;
    let government = normalize::government_stages(record);
    let parliamentary = link
        .process
        .as_ref()
        .map(normalize::parliamentary_stages)
        .unwrap_or_default();

    Project {
        government_id: record.id.clone(),
        cross_reference: Some(link.cross_reference.clone()).filter(|k| !k.is_empty()),
        print_key: link.print_key.clone(),
        term: link.term,
        title: record.title.clone(),
        initiator: record.initiator.clone(),
        document_type: record
            .document_type
            .clone()
            .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
        creation_date: record.creation_date.clone(),
        last_modified: record.modification_date.clone(),
        government_status: record.status.clone(),
        government_url: Some(format!("{GOVERNMENT_PROJECT_URL}/{}", record.id)),
        parliament_url: record.parliament_url.clone(),
        link_method: Some(link.method),
        stages: timeline::merge(government, parliamentary),
        ..Default::default()
    }
}

/// Top-level fields of the matched process.
fn apply_process(project: &mut Project, process: &ProcessRecord) {
    if project.term.is_none() {
        project.term = process.term;
    }
    if project.print_key.is_none() {
        project.print_key = Some(process.number.clone());
    }
    if let Some(term) = project.term {
        project.parliament_url = Some(format!(
            "https://www.sejm.gov.pl/sejm{term}.nsf/PrzebiegProc.xsp?nr={}",
            process.number
        ));
    }
    if project.title.is_empty() {
        project.title = process.title.clone();
    }
    project.description = process.description.clone();
    project.passed = process.passed;
    project.closure_date = process.closure_date.clone();
    if project.last_modified.is_none() {
        project.last_modified = process.change_date.clone();
    }
    project.publication_key = process.eli.clone();
    project.publication_url = process.link("eli").map(str::to_string);
    project.voting = project
        .stages_from(Origin::Parliamentary)
        .filter_map(|s| s.voting.as_ref())
        .last()
        .cloned();
}
