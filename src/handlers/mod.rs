use crate::api::Backend;
use crate::commands::{parse_command, Command, HELP};
use crate::controller::VotingController;
use crate::view::{self, Panel};
use log::{error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const NO_CREDENTIAL: &str = "Sem credencial. Faça primeiro o registo.";

// Route one terminal command to the controller. Every action reports its own outcome
// on screen, so nothing is returned.
pub async fn handle_command<B: Backend>(controller: &VotingController<B>, command: Command) {
    info!("Received command: {:?}", command);
    match command {
        Command::Register(number) => controller.register(&number).await,
        Command::Candidates => {
            // The command is the trigger, so it honours the control's enabled state
            if !controller.view().controls.load_candidates {
                return controller.refuse(Panel::Voting, NO_CREDENTIAL);
            }
            controller.load_candidates().await;
        }
        Command::Select(choice) => {
            if !controller.view().controls.candidate_select {
                return controller.refuse(Panel::Voting, NO_CREDENTIAL);
            }
            controller.select_candidate(choice);
        }
        Command::Vote(choice) => {
            if choice.is_some() && !controller.select_candidate(choice) {
                return;
            }
            controller.vote().await;
        }
        Command::Results => controller.load_results().await,
        Command::Clear => controller.clear_session(),
        Command::Health => controller.health().await,
        // Handled by the input loop
        Command::Status | Command::Help | Command::Quit => {}
    }
}

/// Read commands line by line and run each to completion before the next one.
///
/// Returns on `quit` or end of input; nothing is left in flight.
pub async fn run_commands<B, R>(controller: &VotingController<B>, input: R)
where
    B: Backend,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Rejected input '{}': {}", line.trim(), e);
                println!("{}", e);
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Status => println!("{}", view::render(&controller.view())),
            command => handle_command(controller, command).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve;
    use crate::error::ClientError;
    use crate::models::VoterState;
    use crate::session::SessionStore;
    use crate::view::Severity;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    // Hands out canned bodies in order, yielding to the runtime before each reply
    struct Canned {
        bodies: Mutex<Vec<Value>>,
        paths: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(bodies: Vec<Value>) -> Self {
            Self {
                bodies: Mutex::new(bodies),
                paths: Mutex::new(Vec::new()),
            }
        }

        fn paths(&self) -> Vec<String> {
            self.paths.lock().unwrap().clone()
        }

        async fn reply(&self, path: &str) -> Result<Value, ClientError> {
            self.paths.lock().unwrap().push(path.to_string());
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            Ok(self.bodies.lock().unwrap().remove(0))
        }
    }

    #[async_trait]
    impl Backend for Canned {
        async fn get(&self, path: &str) -> Result<Value, ClientError> {
            self.reply(path).await
        }

        async fn post(&self, path: &str, _body: Value) -> Result<Value, ClientError> {
            self.reply(path).await
        }
    }

    fn controller(bodies: Vec<Value>) -> VotingController<Canned> {
        VotingController::new(Canned::new(bodies), resolve("localhost", ""), SessionStore::in_memory())
    }

    fn voting_flow() -> Vec<Value> {
        vec![
            json!({ "is_eligible": true, "voting_credential": "CRED-1" }),
            json!({ "candidates": [{ "id": 2, "name": "B" }] }),
            json!({ "success": true, "message": "Voto aceite" }),
        ]
    }

    #[tokio::test]
    async fn vote_with_id_selects_first() {
        let controller = controller(voting_flow());

        handle_command(&controller, Command::Register("123456".to_string())).await;
        handle_command(&controller, Command::Candidates).await;
        handle_command(&controller, Command::Vote(Some(2))).await;

        assert_eq!(controller.voter_state(), VoterState::Voted);
        assert_eq!(controller.view().voting_msg.text, "Voto aceite");
    }

    #[tokio::test]
    async fn vote_with_unknown_id_keeps_selection_warning() {
        let controller = controller(voting_flow());
        handle_command(&controller, Command::Register("123456".to_string())).await;
        handle_command(&controller, Command::Candidates).await;

        handle_command(&controller, Command::Vote(Some(9))).await;

        let view = controller.view();
        assert_eq!(view.voting_msg.severity, Severity::Warn);
        assert_eq!(view.voting_msg.text, "Candidato 9 não está na lista carregada.");
        assert_eq!(controller.backend_paths(), vec!["/register", "/candidates"]);
    }

    #[tokio::test]
    async fn disabled_candidate_controls_make_no_calls() {
        let controller = controller(vec![json!({ "candidates": [{ "id": 1, "name": "A" }] })]);

        handle_command(&controller, Command::Candidates).await;
        handle_command(&controller, Command::Select(Some(1))).await;

        assert!(controller.backend_paths().is_empty());
        let view = controller.view();
        assert!(!view.controls.load_candidates);
        assert_eq!(view.voting_msg.severity, Severity::Warn);
        assert_eq!(view.voting_msg.text, NO_CREDENTIAL);
        assert_eq!(view.candidate_options.len(), 1);
        assert!(controller.candidates().is_empty());
    }

    #[tokio::test]
    async fn input_runs_in_order_until_end() {
        let controller = controller(vec![
            json!({ "is_eligible": true, "voting_credential": "CRED-1" }),
            json!({ "candidates": [{ "id": 1, "name": "A" }] }),
            json!({ "success": true }),
            json!({ "results": [{ "id": 1, "name": "A", "votes": 1 }] }),
        ]);
        let script = b"register 123456\ncandidates\nselect 1\nvote\nresults\n";

        run_commands(&controller, &script[..]).await;

        assert_eq!(
            controller.backend_paths(),
            vec!["/register", "/candidates", "/vote", "/results"]
        );
        assert_eq!(controller.voter_state(), VoterState::Voted);
        let view = controller.view();
        assert_eq!(view.results_msg.text, "Resultados carregados: 1 candidatos.");
        assert!(view.results_table.is_some());
    }

    #[tokio::test]
    async fn pending_request_finishes_before_end_of_input() {
        let controller = controller(vec![json!({ "results": [{ "id": 1, "name": "A", "votes": 10 }] })]);

        run_commands(&controller, &b"results"[..]).await;

        assert_eq!(controller.view().results_msg.severity, Severity::Ok);
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let controller = controller(vec![]);

        run_commands(&controller, &b"quit\nresults\n"[..]).await;

        assert!(controller.backend_paths().is_empty());
    }

    impl VotingController<Canned> {
        fn backend_paths(&self) -> Vec<String> {
            self.backend().paths()
        }
    }
}
