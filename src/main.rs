use clap::{Parser, Subcommand};

mod cmd;
mod core;
mod tax;
mod utils;

#[derive(Parser, Debug)]
#[command(name = "rentax", version, author, about = "Rental ledger and Polish rental income tax")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the tax breakdown of each payment, or recompute stored tax
    Tax(cmd::tax::TaxCommand),
    /// Record, edit, generate and list payments
    Payments(cmd::payments::PaymentsCommand),
    /// Monthly income and tax totals for a year or part of one
    Report(cmd::report::ReportCommand),
    /// One month's payments grouped by property and tenant
    Monthly(cmd::monthly::MonthlyCommand),
    /// Tenant invitations
    Invitations(cmd::invitations::InvitationsCommand),
    /// Maintenance reminders
    Reminders(cmd::reminders::RemindersCommand),
    /// Check ledger integrity and stored tax
    Validate(cmd::validate::ValidateCommand),
    /// Print the ledger JSON schema or CSV export columns
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Tax(cmd) => cmd.exec(),
        Command::Payments(cmd) => cmd.exec(),
        Command::Report(cmd) => cmd.exec(),
        Command::Monthly(cmd) => cmd.exec(),
        Command::Invitations(cmd) => cmd.exec(),
        Command::Reminders(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
