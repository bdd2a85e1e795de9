use clap::Parser;
use securevault::cli::{output, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => securevault::cli::commands::init::execute(&cli),
        Commands::Add {
            ref file,
            wipe_original,
        } => securevault::cli::commands::add::execute(&cli, file, wipe_original),
        Commands::List { json } => securevault::cli::commands::list::execute(&cli, json),
        Commands::Extract {
            ref item,
            ref output,
        } => securevault::cli::commands::extract::execute(&cli, item, output.as_deref()),
        Commands::Delete { ref item, force } => {
            securevault::cli::commands::delete::execute(&cli, item, force)
        }
        Commands::Wipe { ref file, force } => {
            securevault::cli::commands::wipe::execute(&cli, file, force)
        }
        Commands::ChangePassword { force } => {
            securevault::cli::commands::change_password::execute(&cli, force)
        }
        Commands::Status => securevault::cli::commands::status::execute(&cli),
        Commands::Audit { last, ref since } => {
            securevault::cli::commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
    };

    if let Err(e) = result {
        output::error(&e.to_string());
        if e.is_fatal() {
            output::warning("Session terminated; no key material was kept.");
        }
        std::process::exit(1);
    }
}
