//! Command-line front end for the contact store.
//!
//! # Responsibility
//! - Map subcommands onto `EditSession` and `ClientService` calls.
//! - Report failures on stderr with a non-zero exit code.
//!
//! Usage:
//!     crm --db ./contacts.sqlite3 add --name "Ana Pérez" --email ana@example.com --phone 5550101
//!     crm list --json

use clap::{Args, Parser, Subcommand};
use crm_core::{
    default_log_level, init_logging, Client, ClientDraft, ClientId, ClientService, EditSession,
    OpenOptions,
};
use log::info;
use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

const EMPTY_STORE_LINE: &str = "no clients registered";

#[derive(Parser, Debug)]
#[command(name = "crm", version, about = "Local contact store")]
struct Cli {
    /// Database file (defaults to ./CRM_Database.sqlite3)
    #[arg(long, env = "CRM_DB_PATH", global = true)]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, env = "CRM_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new client
    Add(ClientFields),
    /// Replace fields of an existing client; omitted fields keep their value
    Update {
        id: ClientId,
        #[command(flatten)]
        fields: FieldOverrides,
    },
    /// Delete a client (succeeds when the id does not exist)
    Delete { id: ClientId },
    /// Print one client
    Show {
        id: ClientId,
        #[arg(long)]
        json: bool,
    },
    /// Print every client in id order
    List {
        #[arg(long)]
        json: bool,
    },
    /// Check that the core library links
    Ping,
}

#[derive(Args, Debug)]
struct ClientFields {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: String,
}

#[derive(Args, Debug)]
struct FieldOverrides {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

impl FieldOverrides {
    fn apply(self, current: &Client) -> ClientDraft {
        ClientDraft::new(
            self.name.as_deref().unwrap_or(&current.name),
            self.email.as_deref().unwrap_or(&current.email),
            self.phone.as_deref().unwrap_or(&current.phone),
        )
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = start_logging(&cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(cli: &Cli) -> CliResult<()> {
    let Some(dir) = &cli.log_dir else {
        return Ok(());
    };
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, std::path::absolute(dir)?)?;
    Ok(())
}

async fn run(cli: Cli) -> CliResult<()> {
    if let Command::Ping = cli.command {
        println!("crm_core ping={}", crm_core::ping());
        println!("crm_core version={}", crm_core::core_version());
        return Ok(());
    }

    let options = cli.db.map_or_else(OpenOptions::default, OpenOptions::file);
    let service = ClientService::open(options).await?;
    let mut session = EditSession::new();
    info!("event=cli_command module=cli status=start");

    match cli.command {
        Command::Add(fields) => {
            let draft = ClientDraft::new(fields.name, fields.email, fields.phone);
            let outcome = session.submit(&service, draft).await?;
            println!("created {}", outcome.id());
        }
        Command::Update { id, fields } => {
            let current = session.begin_edit(&service, id).await?;
            let outcome = session.submit(&service, fields.apply(&current)).await?;
            println!("updated {}", outcome.id());
        }
        Command::Delete { id } => {
            session.delete(&service, id).await?;
            println!("deleted {id}");
        }
        Command::Show { id, json } => {
            let client = service.get_by_id(id).await?;
            write_client(&mut io::stdout().lock(), &client, json)?;
        }
        Command::List { json } => {
            let clients: Vec<Client> = service.list_all().await?.collect();
            write_clients(&mut io::stdout().lock(), &clients, json)?;
        }
        Command::Ping => {}
    }
    Ok(())
}

fn write_clients(out: &mut impl Write, clients: &[Client], json: bool) -> CliResult<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(clients)?)?;
    } else if clients.is_empty() {
        writeln!(out, "{EMPTY_STORE_LINE}")?;
    } else {
        for client in clients {
            write_client(out, client, false)?;
        }
    }
    Ok(())
}

fn write_client(out: &mut impl Write, client: &Client, json: bool) -> CliResult<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(client)?)?;
    } else {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            client.id, client.name, client.email, client.phone
        )?;
    }
    Ok(())
}
