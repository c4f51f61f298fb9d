use chrono::NaiveDateTime;
use ordina_types::{ProtocolNumber, StampPosition, DATE_FORMAT, TIME_FORMAT};

use crate::seal::Seal;
use crate::style::StampStyle;
use crate::template::{self, TemplateValues};

/// Everything that varies between two stamps.
///
/// Built once per stamping operation and never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct StampSpec {
    pub protocol: ProtocolNumber,
    pub timestamp: NaiveDateTime,
    pub position: StampPosition,
    pub template: String,
    pub location: Option<String>,
    pub seal: Option<Seal>,
}

impl StampSpec {
    pub fn new(
        protocol: ProtocolNumber,
        timestamp: NaiveDateTime,
        style: &StampStyle,
        seal: Option<Seal>,
    ) -> Self {
        Self {
            protocol,
            timestamp,
            position: style.position,
            template: style.template.clone(),
            location: style.location.clone(),
            seal,
        }
    }

    /// The resolved stamp text, one entry per line.
    pub fn text_lines(&self) -> Vec<String> {
        let values = TemplateValues {
            number: self.protocol.formatted.clone(),
            date: self.timestamp.format(DATE_FORMAT).to_string(),
            time: self.timestamp.format(TIME_FORMAT).to_string(),
            year: self.protocol.year.to_string(),
            location: self.location.clone().unwrap_or_default(),
        };
        template::resolve(&self.template, &values)
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect()
    }
}
