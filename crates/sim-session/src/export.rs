use sim_types::{Event, MetricsSnapshot, SimError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(raw: &str) -> Result<Self, SimError> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(SimError::InvalidArgument(format!(
                "unsupported export format: {other}"
            ))),
        }
    }
}

pub fn export(format: ExportFormat, events: &[Event], metrics: &MetricsSnapshot) -> Result<String, SimError> {
    match format {
        ExportFormat::Json => export_json(events, metrics),
        ExportFormat::Csv => export_csv(events, metrics),
    }
}

fn export_json(events: &[Event], metrics: &MetricsSnapshot) -> Result<String, SimError> {
    let document = serde_json::json!({ "events": events, "metrics": metrics });
    serde_json::to_string_pretty(&document)
        .map_err(|e| SimError::InvalidArgument(format!("failed to serialize export: {e}")))
}

fn export_csv(events: &[Event], metrics: &MetricsSnapshot) -> Result<String, SimError> {
    let events_section = events_csv(events)?;
    let metrics_section = metrics_csv(metrics)?;
    Ok(format!(
        "=== EVENTS ===\n{events_section}\n=== METRICS ===\n{metrics_section}"
    ))
}

fn events_csv(events: &[Event]) -> Result<String, SimError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);
    writer
        .write_record(["timestamp", "type", "nodeId", "peerId", "payloadSummary"])
        .map_err(csv_err)?;
    for event in events {
        writer
            .write_record([
                event.timestamp.to_string(),
                event.kind.as_str().to_string(),
                event.node_id.clone(),
                event.peer_id.clone().unwrap_or_default(),
                event.payload_summary.clone(),
            ])
            .map_err(csv_err)?;
    }
    bytes_to_string(writer)
}

fn metrics_csv(metrics: &MetricsSnapshot) -> Result<String, SimError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);
    writer
        .write_record([
            "simulatedTime",
            "realTimeMillis",
            "messageCount",
            "rounds",
            "converged",
            "leaderId",
        ])
        .map_err(csv_err)?;
    writer
        .write_record([
            metrics.simulated_time.to_string(),
            metrics.real_time_millis.to_string(),
            metrics.message_count.to_string(),
            metrics.rounds.to_string(),
            metrics.converged.to_string(),
            metrics.leader_id.clone().unwrap_or_default(),
        ])
        .map_err(csv_err)?;
    bytes_to_string(writer)
}

fn bytes_to_string(writer: csv::Writer<Vec<u8>>) -> Result<String, SimError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| SimError::InvalidArgument(format!("failed to finalize csv: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| SimError::InvalidArgument(format!("csv output was not valid utf-8: {e}")))
}

fn csv_err(e: csv::Error) -> SimError {
    SimError::InvalidArgument(format!("csv write failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_types::EventKind;

    fn sample_metrics() -> MetricsSnapshot {
        MetricsSnapshot {
            simulated_time: 12,
            real_time_millis: 340,
            message_count: 7,
            rounds: 3,
            converged: true,
            leader_id: Some("2".to_string()),
        }
    }

    #[test]
    fn parses_case_insensitive_formats() {
        assert_eq!(ExportFormat::parse("CSV").unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::parse("json").unwrap(), ExportFormat::Json);
        assert!(matches!(
            ExportFormat::parse("xml").unwrap_err(),
            SimError::InvalidArgument(_)
        ));
    }

    #[test]
    fn csv_export_has_two_blank_line_separated_sections_with_headers() {
        let events = vec![Event::new(0, EventKind::MessageSent, "1", "Node started").with_peer("2")];
        let csv = export_csv(&events, &sample_metrics()).unwrap();

        let (events_block, metrics_block) = csv
            .split_once("\n\n=== METRICS ===\n")
            .expect("events and metrics sections must be separated by a blank line");

        assert!(events_block.starts_with("=== EVENTS ===\n"));
        let events_lines: Vec<&str> = events_block.trim_start_matches("=== EVENTS ===\n").lines().collect();
        assert_eq!(events_lines[0], "timestamp,type,nodeId,peerId,payloadSummary");
        assert_eq!(events_lines[1], "0,MESSAGE_SENT,1,2,Node started");

        let metrics_lines: Vec<&str> = metrics_block.lines().collect();
        assert_eq!(
            metrics_lines[0],
            "simulatedTime,realTimeMillis,messageCount,rounds,converged,leaderId"
        );
        assert_eq!(metrics_lines[1], "12,340,7,3,true,2");
    }

    #[test]
    fn csv_export_quotes_fields_needing_escaping() {
        let events = vec![Event::new(
            0,
            EventKind::Error,
            "1",
            "contains a comma, a \"quote\", and a\nnewline",
        )];
        let csv = export_csv(&events, &sample_metrics()).unwrap();

        assert!(csv.contains("\"contains a comma, a \"\"quote\"\", and a\nnewline\""));
    }

    #[test]
    fn export_dispatches_to_csv_and_json() {
        let events = vec![Event::new(0, EventKind::MessageSent, "1", "Node started")];
        let metrics = sample_metrics();

        let csv = export(ExportFormat::Csv, &events, &metrics).unwrap();
        assert!(csv.starts_with("=== EVENTS ==="));

        let json = export(ExportFormat::Json, &events, &metrics).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["metrics"]["leaderId"], serde_json::json!("2"));
    }
}
