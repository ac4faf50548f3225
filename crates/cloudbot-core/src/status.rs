//! Fleet status report

use crate::error::Result;
use crate::format::{human_size, relative_time};
use chrono::{DateTime, Utc};
use cloudbot_cloud::{FleetProvider, ImageRecord, ImageType, ServerRecord};
use std::fmt;
use std::sync::Arc;
use tabled::{Table, Tabled, settings::Style};

/// One line of the servers table
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ServerRow {
    #[tabled(rename = "Server ID")]
    pub id: u64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Created")]
    pub created: String,
}

/// One line of the snapshots table
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ImageRow {
    #[tabled(rename = "Image ID")]
    pub id: u64,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "Created")]
    pub created: String,
}

/// Servers and snapshots as rendered for the operator
#[derive(Debug, Clone, Default)]
pub struct FleetReport {
    pub servers: Vec<ServerRow>,
    pub images: Vec<ImageRow>,
}

impl FleetReport {
    /// Build a report with relative times measured against `now`
    pub fn build(servers: &[ServerRecord], images: &[ImageRecord], now: DateTime<Utc>) -> Self {
        Self {
            servers: servers
                .iter()
                .map(|s| ServerRow {
                    id: s.id,
                    name: s.name.clone(),
                    status: s.status.to_string(),
                    created: relative_time(s.created_at, now),
                })
                .collect(),
            images: images
                .iter()
                .map(|i| ImageRow {
                    id: i.id,
                    description: i.description.clone(),
                    size: human_size(i.size_bytes),
                    created: relative_time(i.created_at, now),
                })
                .collect(),
        }
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut servers = Table::new(&self.servers);
        servers.with(Style::blank());
        let mut images = Table::new(&self.images);
        images.with(Style::blank());

        writeln!(f, "```")?;
        writeln!(f, "{}", servers)?;
        writeln!(f)?;
        writeln!(f, "{}", images)?;
        write!(f, "```")
    }
}

/// Read-only fleet inspection
///
/// Takes no lease; it only reads provider state.
pub struct StatusReporter {
    provider: Arc<dyn FleetProvider>,
}

impl StatusReporter {
    pub fn new(provider: Arc<dyn FleetProvider>) -> Self {
        Self { provider }
    }

    /// Fetch servers and snapshots. Any read failure fails the whole report.
    pub async fn report(&self) -> Result<FleetReport> {
        tracing::debug!("Fetching fleet status from {}", self.provider.name());
        let servers = self.provider.list_servers().await?;
        let images = self.provider.list_images(ImageType::Snapshot).await?;
        tracing::debug!("{} servers, {} snapshots", servers.len(), images.len());
        Ok(FleetReport::build(&servers, &images, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudbot_cloud::ServerStatus;

    #[test]
    fn test_display_is_fenced() {
        let now = Utc::now();
        let servers = vec![ServerRecord {
            id: 42,
            name: "nub".to_string(),
            status: ServerStatus::Running,
            created_at: Some((now - chrono::Duration::minutes(5)).fixed_offset()),
        }];
        let images = vec![ImageRecord {
            id: 7,
            description: "nub-02-16".to_string(),
            size_bytes: Some(12_340_000_000),
            created_at: None,
            image_type: ImageType::Snapshot,
        }];
        let text = FleetReport::build(&servers, &images, now).to_string();

        assert!(text.starts_with("```\n"));
        assert!(text.ends_with("```"));

        let lines: Vec<&str> = text.lines().collect();
        let headers: Vec<&str> = lines[1].split_whitespace().collect();
        assert_eq!(headers, vec!["Server", "ID", "Name", "Status", "Created"]);
        let server: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(server, vec!["42", "nub", "running", "5", "minutes", "ago"]);

        let image_header = lines
            .iter()
            .position(|l| l.trim_start().starts_with("Image ID"))
            .unwrap();
        assert_eq!(lines[image_header - 1], "");
        let image: Vec<&str> = lines[image_header + 1].split_whitespace().collect();
        assert_eq!(image, vec!["7", "nub-02-16", "12.34", "GB"]);
    }
}
