use crate::models::{Candidate, ResultRow};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Neutral,
    Ok,
    Warn,
    Error,
}

impl Severity {
    fn marker(self) -> &'static str {
        match self {
            Severity::Neutral => "   ",
            Severity::Ok => "[+]",
            Severity::Warn => "[!]",
            Severity::Error => "[x]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub severity: Severity,
    pub text: String,
}

impl StatusLine {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Backend,
    Registration,
    Voting,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillState {
    Idle,
    Active,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pills {
    pub registration: PillState,
    pub voting: PillState,
    pub results: PillState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub load_candidates: bool,
    pub candidate_select: bool,
    pub vote: bool,
}

// An entry of the candidate selection control; `None` is the placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOption {
    pub value: Option<i64>,
    pub label: String,
}

impl CandidateOption {
    pub fn placeholder(label: &str) -> Self {
        Self {
            value: None,
            label: label.to_string(),
        }
    }

    pub fn for_candidate(candidate: &Candidate) -> Self {
        Self {
            value: Some(candidate.id),
            label: format!("{} - {}", candidate.id, candidate.name),
        }
    }
}

/// Everything the screen shows. The controller is the only writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    pub backend_url: String,
    pub is_online_demo: bool,
    pub backend_msg: Option<StatusLine>,
    pub registration_msg: StatusLine,
    pub voting_msg: StatusLine,
    pub voting_notice: Option<String>,
    pub results_msg: StatusLine,
    pub credential_field: String,
    pub candidate_options: Vec<CandidateOption>,
    pub selected: Option<i64>,
    pub results_table: Option<Vec<ResultRow>>,
    pub controls: Controls,
    pub pills: Pills,
}

pub const EMPTY_CANDIDATES_LABEL: &str = "(carregar candidatos)";
pub const SELECT_CANDIDATE_LABEL: &str = "(selecionar candidato)";

impl ViewModel {
    pub fn new(backend_url: &str, is_online_demo: bool) -> Self {
        Self {
            backend_url: backend_url.to_string(),
            is_online_demo,
            backend_msg: None,
            registration_msg: StatusLine::new(Severity::Neutral, "Introduza o número do cartão de cidadão."),
            voting_msg: StatusLine::new(Severity::Neutral, "Sem ações de votação."),
            voting_notice: None,
            results_msg: StatusLine::new(Severity::Neutral, "Sem resultados carregados."),
            credential_field: String::new(),
            candidate_options: vec![CandidateOption::placeholder(EMPTY_CANDIDATES_LABEL)],
            selected: None,
            results_table: None,
            controls: Controls::default(),
            pills: Pills {
                registration: PillState::Active,
                voting: PillState::Idle,
                results: PillState::Active,
            },
        }
    }

    pub fn status_mut(&mut self, panel: Panel) -> &mut StatusLine {
        match panel {
            Panel::Backend => self
                .backend_msg
                .get_or_insert_with(|| StatusLine::new(Severity::Neutral, "")),
            Panel::Registration => &mut self.registration_msg,
            Panel::Voting => &mut self.voting_msg,
            Panel::Results => &mut self.results_msg,
        }
    }

    pub fn set_status(&mut self, panel: Panel, severity: Severity, text: impl Into<String>) {
        *self.status_mut(panel) = StatusLine::new(severity, text);
    }

    // Values a user can pick, without the placeholder
    #[cfg(test)]
    pub fn selectable_ids(&self) -> Vec<i64> {
        self.candidate_options.iter().filter_map(|opt| opt.value).collect()
    }
}

fn pill(label: &str, state: PillState) -> String {
    match state {
        PillState::Idle => format!("  {}  ", label),
        PillState::Active => format!("> {} <", label),
        PillState::Done => format!("[{} ok]", label),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag { "" } else { " (indisponível)" }
}

fn status(out: &mut String, line: &StatusLine) {
    let _ = writeln!(out, "  {} {}", line.severity.marker(), line.text);
}

// Fixed-width table; every cell is plain text
pub fn render_table(rows: &[ResultRow]) -> String {
    let header = ["ID", "Candidato", "Votos"];
    let cells: Vec<[String; 3]> = rows.iter().map(ResultRow::cells).collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |out: &mut String, row: [&str; 3]| {
        let _ = writeln!(
            out,
            "  | {:<w0$} | {:<w1$} | {:>w2$} |",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        );
    };

    let mut out = String::new();
    line(&mut out, header);
    let _ = writeln!(
        out,
        "  |{}|{}|{}|",
        "-".repeat(widths[0] + 2),
        "-".repeat(widths[1] + 2),
        "-".repeat(widths[2] + 2)
    );
    for row in &cells {
        line(&mut out, [row[0].as_str(), row[1].as_str(), row[2].as_str()]);
    }
    out
}

pub fn render(view: &ViewModel) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Backend: {}", view.backend_url);
    if view.is_online_demo {
        let _ = writeln!(out, "  Demo online: o backend pode não estar acessível a partir deste ambiente.");
    }
    if let Some(msg) = &view.backend_msg {
        status(&mut out, msg);
    }
    let _ = writeln!(
        out,
        "{}  {}  {}",
        pill("1. Registo", view.pills.registration),
        pill("2. Votação", view.pills.voting),
        pill("3. Apuramento", view.pills.results)
    );

    let _ = writeln!(out, "\n[1] Registo");
    status(&mut out, &view.registration_msg);

    let _ = writeln!(out, "\n[2] Votação{}", enabled(view.controls.load_candidates));
    let credential = if view.credential_field.is_empty() { "-" } else { view.credential_field.as_str() };
    let _ = writeln!(out, "  Credencial: {}", credential);
    let _ = writeln!(out, "  Candidatos{}:", enabled(view.controls.candidate_select));
    for option in &view.candidate_options {
        let mark = if option.value.is_some() && option.value == view.selected { "*" } else { " " };
        let _ = writeln!(out, "   {} {}", mark, option.label);
    }
    let _ = writeln!(out, "  Votar{}", enabled(view.controls.vote));
    status(&mut out, &view.voting_msg);
    if let Some(notice) = &view.voting_notice {
        let _ = writeln!(out, "  {} {}", Severity::Ok.marker(), notice);
    }

    let _ = writeln!(out, "\n[3] Apuramento");
    status(&mut out, &view.results_msg);
    if let Some(rows) = &view.results_table {
        out.push_str(&render_table(rows));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_renders_one_line_per_row() {
        let table = render_table(&[ResultRow::new(1, "A", 10)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("| 1  | A         |    10 |"), "got {:?}", lines[2]);
    }

    #[test]
    fn hidden_table_is_not_rendered() {
        let view = ViewModel::new("http://127.0.0.1:8000", false);
        let screen = render(&view);
        assert!(!screen.contains("Candidato |"));
        assert!(!screen.contains("Demo online"));
    }

    #[test]
    fn demo_mode_changes_messaging() {
        let view = ViewModel::new("https://andremaciel.pt/IS2026/api", true);
        assert!(render(&view).contains("Demo online"));
    }

    #[test]
    fn placeholder_is_not_selectable() {
        let mut view = ViewModel::new("http://127.0.0.1:8000", false);
        assert!(view.selectable_ids().is_empty());

        view.candidate_options.push(CandidateOption::for_candidate(&Candidate {
            id: 7,
            name: "Maria".to_string(),
        }));
        assert_eq!(view.selectable_ids(), vec![7]);
        assert_eq!(view.candidate_options[1].label, "7 - Maria");
    }
}
