pub mod invitations;
pub mod monthly;
pub mod payments;
pub mod reminders;
pub mod report;
pub mod schema;
pub mod tax;
pub mod validate;

use crate::core::{read_ledger_json, Ledger};
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Read the ledger JSON from a file (or stdin with "-")
pub fn read_ledger(path: &Path) -> anyhow::Result<Ledger> {
    let ledger = if path.as_os_str() == "-" {
        read_from_stdin()?
    } else {
        let file = File::open(path)?;
        read_ledger_json(BufReader::new(file))?
    };
    for issue in ledger.validate() {
        log::warn!("{}", issue);
    }
    Ok(ledger)
}

fn read_from_stdin() -> anyhow::Result<Ledger> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a ledger file or pipe data to stdin.");
    }

    read_ledger_json(io::Cursor::new(buffer))
}

/// Ledger input plus where to write it back, for commands that change it
#[derive(Args, Debug)]
pub struct LedgerFile {
    /// JSON ledger file ("-" for stdin)
    #[arg(short, long)]
    pub ledger: PathBuf,

    /// Write the updated ledger here instead of back to the input file
    /// (stdout when reading from stdin)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl LedgerFile {
    pub fn load(&self) -> anyhow::Result<Ledger> {
        read_ledger(&self.ledger)
    }

    pub fn save(&self, ledger: &Ledger) -> anyhow::Result<()> {
        let target = self.output.as_deref().unwrap_or(&self.ledger);
        if target.as_os_str() == "-" {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            ledger.write_json(&mut writer)?;
            writeln!(writer)?;
        } else {
            let mut writer = BufWriter::new(File::create(target)?);
            ledger.write_json(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
            log::info!("Ledger written to {}", target.display());
        }
        Ok(())
    }

    /// Status messages go to stderr when the ledger itself is going to stdout
    pub fn report(&self, message: impl std::fmt::Display) {
        let target = self.output.as_deref().unwrap_or(&self.ledger);
        if target.as_os_str() == "-" {
            eprintln!("{}", message);
        } else {
            println!("{}", message);
        }
    }
}

pub fn format_money(amount: rust_decimal::Decimal) -> String {
    format!("{:.2}", amount)
}
