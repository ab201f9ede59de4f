use std::collections::HashMap;

use crate::error::ClientError;
use crate::models::{AGGREGATE_ROWS, HostReport, StatsRecord, StatusValue};

const PROXY_COLUMN: &str = "pxname";
const SERVICE_COLUMN: &str = "svname";
const STATUS_COLUMN: &str = "status";
const SESSIONS_COLUMN: &str = "scur";

/// Parse a `;csv` stats dump into a report of server rows.
///
/// The first non-blank line must be the `# pxname,svname,...` header. Any
/// later line containing `#` is skipped, as are FRONTEND/BACKEND rows.
pub fn parse_report(body: &str) -> Result<HostReport, ClientError> {
    let mut lines = body
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let header = match lines.next() {
        Some((_, line)) if line.trim_start().starts_with('#') => {
            let names = line.trim_start().trim_start_matches('#').trim();
            split_row(names)
        }
        _ => return Err(ClientError::MissingHeader),
    };
    let columns = Columns::locate(&header)?;

    let mut report = HostReport::new();
    for (idx, line) in lines {
        if line.contains('#') {
            continue;
        }
        let fields = split_row(line);
        let line_no = idx + 1;

        let service = columns.field(&fields, columns.service, line_no)?;
        if AGGREGATE_ROWS.contains(&service) {
            continue;
        }

        report.insert(columns.record(&header, &fields, line_no)?);
    }

    Ok(report)
}

struct Columns {
    proxy: usize,
    service: usize,
    status: usize,
    sessions: usize,
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, ClientError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|column| column == name)
                .ok_or(ClientError::MissingColumn(name))
        };
        Ok(Self {
            proxy: find(PROXY_COLUMN)?,
            service: find(SERVICE_COLUMN)?,
            status: find(STATUS_COLUMN)?,
            sessions: find(SESSIONS_COLUMN)?,
        })
    }

    fn field<'a>(
        &self,
        fields: &'a [String],
        index: usize,
        line: usize,
    ) -> Result<&'a str, ClientError> {
        fields
            .get(index)
            .map(|s| s.as_str())
            .ok_or_else(|| ClientError::MalformedRow {
                line,
                reason: format!("expected at least {} fields, got {}", index + 1, fields.len()),
            })
    }

    fn record(
        &self,
        header: &[String],
        fields: &[String],
        line: usize,
    ) -> Result<StatsRecord, ClientError> {
        let sessions = self.field(fields, self.sessions, line)?;
        let current_connections =
            sessions
                .trim()
                .parse::<u64>()
                .map_err(|_| ClientError::MalformedRow {
                    line,
                    reason: format!("`{SESSIONS_COLUMN}` is not a number: {sessions:?}"),
                })?;

        let typed = [self.proxy, self.service, self.status, self.sessions];
        let raw_fields: HashMap<String, String> = header
            .iter()
            .zip(fields)
            .enumerate()
            .filter(|(i, _)| !typed.contains(i))
            .map(|(_, (name, value))| (name.clone(), value.clone()))
            .collect();

        Ok(StatsRecord {
            proxy_name: self.field(fields, self.proxy, line)?.to_string(),
            service_name: self.field(fields, self.service, line)?.to_string(),
            status: StatusValue::from(self.field(fields, self.status, line)?),
            current_connections,
            raw_fields,
        })
    }
}

/// Split one CSV line. Double quotes group commas and `""` is a literal quote.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
