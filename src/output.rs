use std::io::{self, Write};

use serde::Serialize;

use crate::app::{AuditReport, CtdResult, DeleteReport, LoadReport};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_load(report: &LoadReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_ctd(result: &CtdResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_audit(report: &AuditReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_delete(report: &DeleteReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
