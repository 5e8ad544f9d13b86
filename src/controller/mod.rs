
use crate::api::Backend;
use crate::config::AppConfig;
use crate::error::ClientError;
use crate::models::{
    lenient, list_field, Candidate, HealthResponse, RegisterRequest, RegisterResponse, ResultRow,
    Session, VoteRequest, VoteResponse, VoterState,
};
use crate::session::SessionStore;
use crate::view::{
    CandidateOption, Panel, PillState, Pills, Severity, ViewModel, EMPTY_CANDIDATES_LABEL,
    SELECT_CANDIDATE_LABEL,
};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

lazy_static! {
    static ref CITIZEN_CARD_RE: Regex = Regex::new(r"^[0-9]{6,12}$").unwrap();
}

pub fn is_likely_citizen_card(value: &str) -> bool {
    CITIZEN_CARD_RE.is_match(value.trim())
}

// Actions that talk to the backend; each may have one request in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    LoadCandidates,
    Vote,
    LoadResults,
}

#[derive(Debug, Default, Clone, Copy)]
struct Busy {
    register: bool,
    load_candidates: bool,
    vote: bool,
    load_results: bool,
}

impl Busy {
    fn flag(&mut self, action: Action) -> &mut bool {
        match action {
            Action::Register => &mut self.register,
            Action::LoadCandidates => &mut self.load_candidates,
            Action::Vote => &mut self.vote,
            Action::LoadResults => &mut self.load_results,
        }
    }
}

/// In-memory application state. The session half is mirrored into storage.
#[derive(Debug, Default, Clone)]
pub struct AppState {
    pub session: Session,
    pub candidates: Vec<Candidate>,
    pub selected: Option<i64>,
    busy: Busy,
}

struct Inner {
    state: AppState,
    store: SessionStore,
    view: ViewModel,
}

// Clears the busy flag even if the action's future is dropped mid-request
struct BusyGuard<'a> {
    inner: &'a Mutex<Inner>,
    action: Action,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner.state.busy.flag(self.action) = false;
    }
}

pub struct VotingController<B: Backend> {
    backend: B,
    config: AppConfig,
    inner: Mutex<Inner>,
    revision: watch::Sender<u64>,
}

impl<B: Backend> VotingController<B> {
    pub fn new(backend: B, config: AppConfig, store: SessionStore) -> Self {
        let view = ViewModel::new(&config.backend_base_url, config.is_online_demo);
        let (revision, _) = watch::channel(0);
        Self {
            backend,
            config,
            inner: Mutex::new(Inner {
                state: AppState::default(),
                store,
                view,
            }),
            revision,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    // Bumped after every visible change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn view(&self) -> ViewModel {
        self.lock().view.clone()
    }

    pub fn session(&self) -> Session {
        self.lock().state.session.clone()
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.lock().state.candidates.clone()
    }

    pub fn voter_state(&self) -> VoterState {
        self.lock().state.session.voter_state()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Apply a change to state and view, then resync controls and notify renderers
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let result = {
            let mut inner = self.lock();
            let result = f(&mut inner);
            sync_ui(&mut inner);
            result
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    fn report(&self, panel: Panel, context: &str, error: &ClientError) {
        match error {
            ClientError::Validation(message) => {
                warn!("{}", message);
                self.update(|inner| inner.view.set_status(panel, Severity::Warn, message.clone()));
            }
            other => {
                let text = format!("{}: {}", context, other);
                self.update(|inner| inner.view.set_status(panel, Severity::Error, text));
            }
        }
    }

    fn begin(&self, action: Action) -> Result<BusyGuard<'_>, ClientError> {
        let mut inner = self.lock();
        let flag = inner.state.busy.flag(action);
        if *flag {
            return Err(ClientError::Validation(
                "Pedido em curso. Aguarde a resposta.".to_string(),
            ));
        }
        *flag = true;
        Ok(BusyGuard {
            inner: &self.inner,
            action,
        })
    }

    /// Load the persisted session and reflect it on screen.
    pub fn hydrate(&self) {
        self.update(|inner| {
            inner.state.session = inner.store.load();
            let session = &inner.state.session;
            info!("Hydrated session in state {:?}", session.voter_state());
            if session.credential.is_some() && !session.has_voted {
                inner.view.set_status(
                    Panel::Registration,
                    Severity::Ok,
                    "Credencial encontrada na sessão. Pode carregar candidatos e votar.",
                );
                inner.view.set_status(Panel::Voting, Severity::Neutral, "Carregue candidatos e submeta o voto.");
            }
        });
    }

    pub async fn register(&self, id_number: &str) {
        let cc = id_number.trim();
        if !is_likely_citizen_card(cc) {
            let err = ClientError::Validation("Introduza um número válido (apenas dígitos).".to_string());
            self.report(Panel::Registration, "Falha no registo", &err);
            return;
        }
        let _guard = match self.begin(Action::Register) {
            Ok(guard) => guard,
            Err(e) => return self.report(Panel::Registration, "Falha no registo", &e),
        };

        self.update(|inner| inner.view.set_status(Panel::Registration, Severity::Neutral, "A emitir credencial..."));
        info!("Requesting voting credential");

        let body = serde_json::to_value(RegisterRequest { citizen_card_number: cc }).unwrap_or_default();
        match self.backend.post("/register", body).await {
            Ok(body) => {
                let response: RegisterResponse = lenient(body);
                let credential = response.voting_credential.filter(|c| !c.is_empty());
                self.update(|inner| match credential {
                    Some(credential) if response.is_eligible => {
                        info!("Voter eligible, credential issued");
                        inner.view.set_status(
                            Panel::Registration,
                            Severity::Ok,
                            format!("Eleitor elegível. Credencial emitida: {}", credential),
                        );
                        inner.view.set_status(Panel::Voting, Severity::Neutral, "Carregue candidatos e submeta o voto.");
                        inner.state.session = Session {
                            credential: Some(credential),
                            has_voted: false,
                        };
                        inner.store.save(&inner.state.session);
                    }
                    _ => {
                        info!("Voter not eligible");
                        inner.state.session = Session::default();
                        inner.store.save(&inner.state.session);
                        inner.view.set_status(
                            Panel::Registration,
                            Severity::Warn,
                            "Eleitor não elegível (mock). Repita com outro número.",
                        );
                    }
                });
            }
            Err(e) => self.report(Panel::Registration, "Falha no registo", &e),
        }
    }

    pub async fn load_candidates(&self) {
        let _guard = match self.begin(Action::LoadCandidates) {
            Ok(guard) => guard,
            Err(e) => return self.report(Panel::Voting, "Falha ao obter candidatos", &e),
        };

        self.update(|inner| inner.view.set_status(Panel::Voting, Severity::Neutral, "A carregar candidatos..."));

        match self.backend.get("/candidates").await {
            Ok(body) => {
                let list: Vec<Candidate> = list_field(&body, "candidates");
                info!("Loaded {} candidates", list.len());
                self.update(|inner| {
                    let mut options = vec![CandidateOption::placeholder(SELECT_CANDIDATE_LABEL)];
                    options.extend(list.iter().map(CandidateOption::for_candidate));
                    inner.view.candidate_options = options;
                    inner.view.set_status(
                        Panel::Voting,
                        Severity::Ok,
                        format!("Candidatos carregados: {}.", list.len()),
                    );
                    inner.state.candidates = list;
                    inner.state.selected = None;
                });
            }
            Err(e) => self.report(Panel::Voting, "Falha ao obter candidatos", &e),
        }
    }

    // A trigger whose control is disabled only gets a warning
    pub fn refuse(&self, panel: Panel, message: &str) {
        let err = ClientError::Validation(message.to_string());
        self.report(panel, "", &err);
    }

    /// Pick a candidate from the loaded list, or clear the pick with `None`.
    /// Returns whether the selection was accepted.
    pub fn select_candidate(&self, candidate_id: Option<i64>) -> bool {
        let result = self.update(|inner| -> Result<(), ClientError> {
            if inner.state.session.credential.is_none() {
                return Err(ClientError::Validation("Sem credencial. Faça primeiro o registo.".to_string()));
            }
            match candidate_id {
                None => {
                    inner.state.selected = None;
                    Ok(())
                }
                Some(id) if id != 0 && inner.state.candidates.iter().any(|c| c.id == id) => {
                    inner.state.selected = Some(id);
                    Ok(())
                }
                Some(id) => {
                    inner.state.selected = None;
                    Err(ClientError::Validation(format!("Candidato {} não está na lista carregada.", id)))
                }
            }
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                self.report(Panel::Voting, "Falha ao selecionar", &e);
                false
            }
        }
    }

    // Local preconditions for casting a vote
    fn check_vote(&self) -> Result<(String, i64), ClientError> {
        let inner = self.lock();
        let credential = inner
            .state
            .session
            .credential
            .clone()
            .ok_or_else(|| ClientError::Validation("Sem credencial. Faça primeiro o registo.".to_string()))?;
        if inner.state.session.has_voted {
            return Err(ClientError::Validation("Voto já submetido nesta sessão.".to_string()));
        }
        let candidate_id = inner
            .state
            .selected
            .filter(|id| *id != 0)
            .ok_or_else(|| ClientError::Validation("Selecione um candidato.".to_string()))?;
        Ok((credential, candidate_id))
    }

    pub async fn vote(&self) {
        let (credential, candidate_id) = match self.check_vote() {
            Ok(ready) => ready,
            Err(e) => return self.report(Panel::Voting, "Falha ao votar", &e),
        };
        let _guard = match self.begin(Action::Vote) {
            Ok(guard) => guard,
            Err(e) => return self.report(Panel::Voting, "Falha ao votar", &e),
        };

        self.update(|inner| inner.view.set_status(Panel::Voting, Severity::Neutral, "A submeter voto..."));
        info!("Submitting vote for candidate {}", candidate_id);

        let body = serde_json::to_value(VoteRequest {
            voting_credential: &credential,
            candidate_id,
        })
        .unwrap_or_default();
        match self.backend.post("/vote", body).await {
            Ok(body) => {
                let response: VoteResponse = lenient(body);
                let message = response.message.filter(|m| !m.is_empty());
                self.update(|inner| {
                    if !response.success {
                        warn!("Vote rejected");
                        inner.view.set_status(
                            Panel::Voting,
                            Severity::Warn,
                            message.unwrap_or_else(|| "Voto recusado.".to_string()),
                        );
                        return;
                    }
                    // A clear or re-registration while the request was out wins
                    if inner.state.session.credential.as_deref() != Some(credential.as_str()) {
                        warn!("Session changed while the vote was in flight; not marking it as voted");
                    } else {
                        inner.state.session.has_voted = true;
                        inner.store.save(&inner.state.session);
                    }
                    info!("Vote accepted");
                    inner.view.set_status(
                        Panel::Voting,
                        Severity::Ok,
                        message.unwrap_or_else(|| "Voto aceite.".to_string()),
                    );
                });
            }
            Err(e) => self.report(Panel::Voting, "Falha ao votar", &e),
        }
    }

    pub async fn load_results(&self) {
        let _guard = match self.begin(Action::LoadResults) {
            Ok(guard) => guard,
            Err(e) => return self.report(Panel::Results, "Falha ao obter resultados", &e),
        };

        self.update(|inner| inner.view.set_status(Panel::Results, Severity::Neutral, "A obter resultados..."));

        match self.backend.get("/results").await {
            Ok(body) => {
                let rows: Vec<ResultRow> = list_field(&body, "results");
                info!("Loaded results for {} candidates", rows.len());
                self.update(|inner| {
                    inner.view.set_status(
                        Panel::Results,
                        Severity::Ok,
                        format!("Resultados carregados: {} candidatos.", rows.len()),
                    );
                    inner.view.results_table = if rows.is_empty() { None } else { Some(rows) };
                });
            }
            Err(e) => {
                self.update(|inner| inner.view.results_table = None);
                self.report(Panel::Results, "Falha ao obter resultados", &e);
            }
        }
    }

    pub async fn health(&self) {
        self.update(|inner| inner.view.set_status(Panel::Backend, Severity::Neutral, "A verificar backend..."));
        match self.backend.get("/health").await {
            Ok(body) => {
                let response: HealthResponse = lenient(body);
                let status = response.status.unwrap_or_else(|| "desconhecido".to_string());
                self.update(|inner| {
                    inner.view.set_status(Panel::Backend, Severity::Ok, format!("Backend disponível (estado: {}).", status))
                });
            }
            Err(e) => self.report(Panel::Backend, "Backend indisponível", &e),
        }
    }

    pub fn clear_session(&self) {
        info!("Clearing session");
        self.update(|inner| {
            inner.store.clear();
            let busy = inner.state.busy;
            inner.state = AppState {
                busy,
                ..AppState::default()
            };
            inner.view.candidate_options = vec![CandidateOption::placeholder(EMPTY_CANDIDATES_LABEL)];
            inner.view.set_status(Panel::Registration, Severity::Neutral, "Sessão limpa. Pode iniciar novo registo.");
            inner.view.set_status(Panel::Voting, Severity::Neutral, "Sem ações de votação.");
            inner.view.set_status(Panel::Results, Severity::Neutral, "Sem resultados carregados.");
            inner.view.results_table = None;
        });
    }
}

// Derive control availability and step indicators from state
fn sync_ui(inner: &mut Inner) {
    let session = &inner.state.session;
    let has_credential = session.credential.is_some();
    let view = &mut inner.view;

    view.credential_field = session.credential.clone().unwrap_or_default();
    view.selected = inner.state.selected;
    view.controls.load_candidates = has_credential;
    view.controls.candidate_select = has_credential;
    view.controls.vote = has_credential && !session.has_voted && inner.state.selected.is_some();

    view.voting_notice = if session.has_voted {
        Some("Voto já submetido nesta sessão. Para nova simulação, limpe a sessão.".to_string())
    } else {
        None
    };

    view.pills = Pills {
        registration: if has_credential { PillState::Done } else { PillState::Active },
        voting: match session.voter_state() {
            VoterState::Registered => PillState::Active,
            VoterState::Voted => PillState::Done,
            VoterState::Unregistered => PillState::Idle,
        },
        results: PillState::Active,
    };
}
