use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register(String),
    Candidates,
    Select(Option<i64>),
    Vote(Option<i64>),
    Results,
    Clear,
    Health,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Comandos:
  register <número>   emitir credencial para o número do cartão de cidadão
  candidates          carregar candidatos
  select <id>|none    selecionar (ou limpar) o candidato
  vote [id]           submeter voto no candidato selecionado (ou no id indicado)
  results             obter resultados
  clear               limpar a sessão
  health              verificar o backend
  status              mostrar o ecrã atual
  help                esta ajuda
  quit                sair";

fn parse_candidate(arg: &str) -> Result<i64, ClientError> {
    arg.parse::<i64>()
        .map_err(|_| ClientError::Validation(format!("Identificador de candidato inválido: {}", arg)))
}

pub fn parse_command(line: &str) -> Result<Command, ClientError> {
    let mut parts = line.split_whitespace();
    let name = match parts.next() {
        Some(name) => name.to_ascii_lowercase(),
        None => return Err(ClientError::Validation("Comando vazio. Escreva 'help'.".to_string())),
    };
    let rest: Vec<&str> = parts.collect();

    let command = match (name.as_str(), rest.as_slice()) {
        // The number is validated by the controller so a bad one still gets the usual warning
        ("register", args) => Command::Register(args.join(" ")),
        ("candidates", []) => Command::Candidates,
        ("select", ["none"]) => Command::Select(None),
        ("select", [id]) => Command::Select(Some(parse_candidate(id)?)),
        ("vote", []) => Command::Vote(None),
        ("vote", [id]) => Command::Vote(Some(parse_candidate(id)?)),
        ("results", []) => Command::Results,
        ("clear", []) => Command::Clear,
        ("health", []) => Command::Health,
        ("status", []) => Command::Status,
        ("help", []) => Command::Help,
        ("quit", []) | ("exit", []) => Command::Quit,
        (other, _) => {
            return Err(ClientError::Validation(format!(
                "Comando desconhecido ou argumentos inválidos: {}",
                other
            )));
        }
    };
    Ok(command)
}
