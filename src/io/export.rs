use serde::Serialize;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

use crate::application::{BulkReport, TransactionOutcome};
use crate::domain::{BalanceLine, ClaimableBalance, TransactionSummary, format_stroops};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid formats: csv, json", s)),
        }
    }
}

#[derive(Debug, Serialize)]
struct TrustlineRow<'a> {
    code: &'a str,
    issuer: &'a str,
    balance: String,
    limit: String,
}

#[derive(Debug, Serialize)]
struct ClaimableBalanceRow<'a> {
    id: &'a str,
    asset_code: &'a str,
    asset_issuer: &'a str,
    amount: String,
    sponsor: &'a str,
}

#[derive(Debug, Serialize)]
struct HistoryRow<'a> {
    hash: &'a str,
    created_at: String,
    source_account: &'a str,
    operation_count: u32,
    successful: bool,
    memo: &'a str,
}

#[derive(Debug, Serialize)]
struct BulkRow<'a> {
    target: &'a str,
    status: &'static str,
    hash: &'a str,
    error: &'a str,
}

/// Writes query results and bulk reports as CSV or pretty JSON.
/// Amounts are written as 7-decimal strings, never floats.
pub struct Exporter {
    format: ExportFormat,
}

impl Exporter {
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    /// Write rows in the configured format and return how many were written.
    fn write_rows<W: Write, R: Serialize>(
        &self,
        mut writer: W,
        rows: &[R],
    ) -> Result<usize, ExportError> {
        match self.format {
            ExportFormat::Csv => {
                let mut csv_writer = csv::Writer::from_writer(writer);
                for row in rows {
                    csv_writer.serialize(row)?;
                }
                csv_writer.flush()?;
            }
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, rows)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
        }
        Ok(rows.len())
    }

    pub fn export_trustlines<W: Write>(
        &self,
        lines: &[BalanceLine],
        writer: W,
    ) -> Result<usize, ExportError> {
        let rows: Vec<_> = lines
            .iter()
            .map(|line| TrustlineRow {
                code: line.asset.code(),
                issuer: line.asset.issuer().map(|i| i.as_str()).unwrap_or(""),
                balance: format_stroops(line.balance),
                limit: line.limit.map(format_stroops).unwrap_or_default(),
            })
            .collect();
        self.write_rows(writer, &rows)
    }

    pub fn export_claimable_balances<W: Write>(
        &self,
        records: &[ClaimableBalance],
        writer: W,
    ) -> Result<usize, ExportError> {
        let rows: Vec<_> = records
            .iter()
            .map(|record| ClaimableBalanceRow {
                id: record.id.as_str(),
                asset_code: record.asset.code(),
                asset_issuer: record.asset.issuer().map(|i| i.as_str()).unwrap_or(""),
                amount: format_stroops(record.amount),
                sponsor: record.sponsor.as_ref().map(|s| s.as_str()).unwrap_or(""),
            })
            .collect();
        self.write_rows(writer, &rows)
    }

    pub fn export_history<W: Write>(
        &self,
        transactions: &[TransactionSummary],
        writer: W,
    ) -> Result<usize, ExportError> {
        let rows: Vec<_> = transactions
            .iter()
            .map(|tx| HistoryRow {
                hash: &tx.hash,
                created_at: tx.created_at.to_rfc3339(),
                source_account: &tx.source_account,
                operation_count: tx.operation_count,
                successful: tx.successful,
                memo: tx.memo.as_deref().unwrap_or(""),
            })
            .collect();
        self.write_rows(writer, &rows)
    }

    pub fn export_bulk_report<W: Write>(
        &self,
        report: &BulkReport,
        writer: W,
    ) -> Result<usize, ExportError> {
        let rows: Vec<_> = report
            .outcomes
            .iter()
            .map(|item| match &item.outcome {
                TransactionOutcome::Success { hash } => BulkRow {
                    target: &item.target,
                    status: "success",
                    hash,
                    error: "",
                },
                TransactionOutcome::Failure { message, .. } => BulkRow {
                    target: &item.target,
                    status: "failure",
                    hash: "",
                    error: message,
                },
            })
            .collect();
        self.write_rows(writer, &rows)
    }
}
