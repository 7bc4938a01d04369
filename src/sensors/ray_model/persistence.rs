//! XML persistence for ray model lookup tables.
//!
//! ```xml
//! <InverseSensorModels>
//!   <SensorModelInterval>1</SensorModelInterval>
//!   <RayModel>0.0012,0.0104,0.0421</RayModel>
//!   ...
//! </InverseSensorModels>
//! ```
//!
//! The integer form scales probabilities by 10000, drops the leading zeros of
//! each row and records where each row starts in `RayModelIndexes`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{INTEGER_SCALE, RESERVED_ROWS, RayModelLookup};
use crate::core::error::{Result, SlamError};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "InverseSensorModels")]
struct InverseSensorModelsXml {
    #[serde(rename = "SensorModelInterval")]
    interval: f32,

    #[serde(
        rename = "RayModelIndexes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    indexes: Option<String>,

    #[serde(rename = "RayModel", default)]
    rows: Vec<String>,
}

impl RayModelLookup {
    /// Serialise the table to XML.
    pub fn to_xml(&self, integer_mode: bool) -> Result<String> {
        let stored: Vec<&[f32]> = (RESERVED_ROWS..self.rows())
            .map(|d| &self.probability[d][..self.row_length(d)])
            .collect();

        let doc = if integer_mode {
            let mut starts = Vec::with_capacity(stored.len());
            let mut rows = Vec::with_capacity(stored.len());
            for row in &stored {
                let scaled: Vec<i64> = row
                    .iter()
                    .map(|p| (p * INTEGER_SCALE).round() as i64)
                    .collect();
                let start = scaled.iter().position(|&v| v != 0).unwrap_or(scaled.len());
                starts.push(start.to_string());
                rows.push(join(&scaled[start..]));
            }
            InverseSensorModelsXml {
                interval: self.interval,
                indexes: Some(starts.join(",")),
                rows,
            }
        } else {
            InverseSensorModelsXml {
                interval: self.interval,
                indexes: None,
                rows: stored.iter().map(|row| join(row)).collect(),
            }
        };

        let mut xml = String::new();
        let mut serializer = quick_xml::se::Serializer::new(&mut xml);
        serializer.indent(' ', 2);
        doc.serialize(serializer)
            .map_err(|e| SlamError::Xml(e.to_string()))?;
        Ok(xml)
    }

    /// Replace the table with one parsed from XML.
    ///
    /// Either form is accepted. On error the current table is unchanged.
    pub fn from_xml(&mut self, xml: &str) -> Result<()> {
        let doc: InverseSensorModelsXml = quick_xml::de::from_str(xml)?;

        let rows = match &doc.indexes {
            Some(indexes) => {
                let starts: Vec<usize> = parse_list(indexes)?;
                if starts.len() != doc.rows.len() {
                    return Err(SlamError::Parse(format!(
                        "RayModelIndexes has {} entries for {} rows",
                        starts.len(),
                        doc.rows.len()
                    )));
                }
                starts
                    .iter()
                    .zip(&doc.rows)
                    .map(|(&start, text)| {
                        let values: Vec<i64> = parse_list(text)?;
                        let mut row = vec![0.0; start];
                        row.extend(values.iter().map(|&v| v as f32 / INTEGER_SCALE));
                        Ok(row)
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => doc
                .rows
                .iter()
                .map(|text| parse_list::<f32>(text))
                .collect::<Result<Vec<_>>>()?,
        };

        let mut loaded = RayModelLookup::new(self.distance_step_mm);
        loaded.load_sensor_model_data(&rows, doc.interval)?;
        *self = loaded;
        Ok(())
    }

    /// Write the table to an XML file.
    pub fn save<P: AsRef<Path>>(&self, path: P, integer_mode: bool) -> Result<()> {
        let xml = self.to_xml(integer_mode)?;
        std::fs::write(path.as_ref(), xml)?;
        log::info!(
            "Saved ray model ({} rows) to {}",
            self.rows(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Load the table from an XML file. On error the current table is unchanged.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        self.from_xml(&xml)?;
        log::info!(
            "Loaded ray model ({} rows) from {}",
            self.rows(),
            path.as_ref().display()
        );
        Ok(())
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_list<T>(text: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| SlamError::Parse(format!("'{}': {}", s, e)))
        })
        .collect()
}
