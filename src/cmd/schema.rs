//! Schema command - print the ledger and export formats

use super::payments::PaymentRow;
use crate::core::Ledger;
use clap::Args;
use schemars::schema_for;

/// One column of a CSV export, as described by `#[derive(CsvSchema)]`
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the ledger file
    JsonSchema,
    /// CSV header row of `payments list --csv`
    CsvHeader,
    /// Column descriptions of `payments list --csv`
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(Ledger);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let columns: Vec<&str> = PaymentRow::csv_schema().iter().map(|f| f.name).collect();
                println!("{}", columns.join(","));
            }
            SchemaFormat::CsvFields => {
                println!("Payments CSV Format");
                println!("===================");
                println!();
                for field in PaymentRow::csv_schema() {
                    let req = if field.required { "required" } else { "optional" };
                    println!("{:15} ({:8})  {}", field.name, req, field.description);
                }
                println!();
                println!("Amounts are in PLN with two decimal places; tax rate is a percentage");
            }
        }
        Ok(())
    }
}
