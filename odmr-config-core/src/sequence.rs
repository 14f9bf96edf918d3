//! Pulse-sequence document schema
//!
//! The generator referenced by `ps_path` writes a sequence document: a set
//! of named blocks, each listing pulses per logical channel, plus the order
//! and repeat counts in which the blocks are played. Times are in
//! microseconds.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::schema::SynchroniserSpec;
use crate::config::value::join_path;
use crate::error::ValidationResult;

/// Keys of a sequence document that are not block names.
pub const RESERVED_KEYS: &[&str] = &["total_duration", "sequencing_order", "sequencing_repeats"];

/// Length of one pass through a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalDuration {
    /// Fixed length in microseconds; the block is padded up to it
    Fixed(f64),
    /// `"ignore"`: the block ends with its last pulse
    Ignore,
}

impl Serialize for TotalDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Fixed(d) => serializer.serialize_f64(*d),
            Self::Ignore => serializer.serialize_str("ignore"),
        }
    }
}

impl TotalDuration {
    /// The fixed length, if any.
    #[must_use]
    pub const fn fixed(self) -> Option<f64> {
        match self {
            Self::Fixed(d) => Some(d),
            Self::Ignore => None,
        }
    }
}

/// A single pulse on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pulse {
    /// Start time in microseconds
    pub start: f64,
    /// Duration in microseconds
    pub duration: f64,
    /// Analog amplitude, for channels that carry one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<f64>,
    /// Carrier frequency in Hz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    /// Carrier phase in radians
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
}

impl Pulse {
    /// Keys a pulse entry may contain.
    pub const FIELDS: &'static [&'static str] =
        &["start", "duration", "amplitude", "frequency", "phase"];

    /// End time in microseconds.
    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A named block: pulses grouped by logical channel, then by pulse name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SequenceBlock {
    /// Channel name to its named pulses
    pub channels: IndexMap<String, IndexMap<String, Pulse>>,
}

impl SequenceBlock {
    /// Number of pulses across all channels.
    #[must_use]
    pub fn pulse_count(&self) -> usize {
        self.channels.values().map(IndexMap::len).sum()
    }

    /// End of the latest pulse, or `0.0` for an empty block.
    #[must_use]
    pub fn last_end(&self) -> f64 {
        self.channels
            .values()
            .flat_map(IndexMap::values)
            .map(Pulse::end)
            .fold(0.0, f64::max)
    }
}

/// A parsed pulse-sequence document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceDocument {
    /// Length of one pass through each block
    pub total_duration: TotalDuration,

    /// Block names in play order; a name may appear more than once
    pub sequencing_order: Vec<String>,

    /// Repeat count for each entry of `sequencing_order`
    pub sequencing_repeats: Vec<u64>,

    /// Every block defined in the document, in document order
    #[serde(flatten)]
    pub blocks: IndexMap<String, SequenceBlock>,
}

impl SequenceDocument {
    /// Every channel name used by any block.
    #[must_use]
    pub fn channels(&self) -> BTreeSet<&str> {
        self.blocks
            .values()
            .flat_map(|b| b.channels.keys())
            .map(String::as_str)
            .collect()
    }

    /// Pairs each ordered block with its repeat count.
    pub fn schedule(&self) -> impl Iterator<Item = (&str, u64)> {
        self.sequencing_order
            .iter()
            .map(String::as_str)
            .zip(self.sequencing_repeats.iter().copied())
    }

    /// Cross-checks the document against a synchroniser's channel mapping.
    ///
    /// Collects every issue. Overlapping pulses and blocks that are never
    /// played are warnings; everything else is an error.
    #[must_use]
    pub fn check_against(&self, synchroniser: &SynchroniserSpec) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.sequencing_order.len() != self.sequencing_repeats.len() {
            result.add_error(
                "sequencing_repeats",
                format!(
                    "has {} entries but sequencing_order has {}",
                    self.sequencing_repeats.len(),
                    self.sequencing_order.len()
                ),
            );
        }

        for (i, name) in self.sequencing_order.iter().enumerate() {
            if !self.blocks.contains_key(name) {
                result.add_error(
                    format!("sequencing_order[{i}]"),
                    format!("block '{name}' is not defined"),
                );
            }
        }

        for (block_name, block) in &self.blocks {
            if !self.sequencing_order.contains(block_name) {
                result.add_warning(block_name.as_str(), "block is defined but never played");
            }
            for (channel, pulses) in &block.channels {
                let channel_path = join_path(block_name, channel);
                if synchroniser.channel(channel).is_none() {
                    result.add_error(
                        channel_path.as_str(),
                        format!("channel '{channel}' is not in synchroniser.channel_mapping"),
                    );
                }
                self.check_pulses(&channel_path, pulses, &mut result);
            }
        }

        result
    }

    fn check_pulses(
        &self,
        channel_path: &str,
        pulses: &IndexMap<String, Pulse>,
        result: &mut ValidationResult,
    ) {
        for (name, pulse) in pulses {
            let path = join_path(channel_path, name);
            if pulse.start < 0.0 {
                result.add_error(
                    join_path(&path, "start"),
                    format!("start {} is negative", pulse.start),
                );
            }
            if pulse.duration < 0.0 {
                result.add_error(
                    join_path(&path, "duration"),
                    format!("duration {} is negative", pulse.duration),
                );
            }
            if let Some(total) = self.total_duration.fixed() {
                if pulse.end() > total {
                    result.add_error(
                        path.as_str(),
                        format!("pulse ends at {} after total_duration {total}", pulse.end()),
                    );
                }
            }
        }

        let mut ordered: Vec<(&str, &Pulse)> =
            pulses.iter().map(|(n, p)| (n.as_str(), p)).collect();
        ordered.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));

        let mut latest: Option<(&str, f64)> = None;
        for (name, pulse) in ordered {
            if let Some((previous, end)) = latest {
                if pulse.start < end {
                    result.add_warning(
                        join_path(channel_path, name),
                        format!("overlaps pulse '{previous}' on the same channel"),
                    );
                }
                if pulse.end() <= end {
                    continue;
                }
            }
            latest = Some((name, pulse.end()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(start: f64, duration: f64) -> Pulse {
        Pulse {
            start,
            duration,
            amplitude: None,
            frequency: None,
            phase: None,
        }
    }

    fn block(entries: &[(&str, &str, Pulse)]) -> SequenceBlock {
        let mut block = SequenceBlock::default();
        for (channel, name, p) in entries {
            block
                .channels
                .entry((*channel).to_string())
                .or_default()
                .insert((*name).to_string(), *p);
        }
        block
    }

    #[test]
    fn test_pulse_end() {
        assert!((pulse(1.5, 2.0).end() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_block_last_end_and_count() {
        let b = block(&[
            ("LASER", "init", pulse(0.0, 3.0)),
            ("MW", "pi", pulse(3.5, 0.1)),
            ("READ", "r", pulse(1.0, 1.0)),
        ]);
        assert_eq!(b.pulse_count(), 3);
        assert!((b.last_end() - 3.6).abs() < 1e-9);
        assert!(SequenceBlock::default().last_end().abs() < f64::EPSILON);
    }

    #[test]
    fn test_schedule_and_channels() {
        let mut blocks = IndexMap::new();
        blocks.insert("a".to_string(), block(&[("MW", "p", pulse(0.0, 1.0))]));
        blocks.insert("b".to_string(), block(&[("LASER", "p", pulse(0.0, 1.0))]));
        let doc = SequenceDocument {
            total_duration: TotalDuration::Ignore,
            sequencing_order: vec!["a".to_string(), "b".to_string()],
            sequencing_repeats: vec![10, 1],
            blocks,
        };
        let schedule: Vec<_> = doc.schedule().collect();
        assert_eq!(schedule, [("a", 10), ("b", 1)]);
        assert_eq!(doc.channels().into_iter().collect::<Vec<_>>(), ["LASER", "MW"]);
    }

    fn synchroniser(channels: &[(&str, u32)]) -> SynchroniserSpec {
        SynchroniserSpec {
            kind: crate::config::schema::SynchroniserKind::PulseBlaster,
            config: crate::config::value::ParamMap::new(),
            channel_mapping: channels
                .iter()
                .map(|(n, i)| ((*n).to_string(), *i))
                .collect(),
            extra: crate::config::value::ParamMap::new(),
        }
    }

    fn document(order: &[&str], repeats: &[u64], blocks: &[(&str, SequenceBlock)]) -> SequenceDocument {
        SequenceDocument {
            total_duration: TotalDuration::Ignore,
            sequencing_order: order.iter().map(|s| (*s).to_string()).collect(),
            sequencing_repeats: repeats.to_vec(),
            blocks: blocks
                .iter()
                .map(|(n, b)| ((*n).to_string(), b.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_check_against_valid_document() {
        let sync = synchroniser(&[("LASER", 2), ("MW", 3)]);
        let doc = document(
            &["init"],
            &[100],
            &[(
                "init",
                block(&[
                    ("LASER", "pump", pulse(0.0, 3.0)),
                    ("MW", "pi", pulse(3.5, 0.1)),
                ]),
            )],
        );
        let result = doc.check_against(&sync);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_check_against_structure_errors() {
        let sync = synchroniser(&[("MW", 3)]);
        let doc = document(
            &["init", "missing"],
            &[1],
            &[("init", block(&[("LASER", "pump", pulse(0.0, 1.0))]))],
        );
        let result = doc.check_against(&sync);
        let paths: Vec<&str> = result.errors.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            ["sequencing_repeats", "sequencing_order[1]", "init.LASER"]
        );
    }

    #[test]
    fn test_check_against_pulse_errors() {
        let sync = synchroniser(&[("MW", 3)]);
        let mut doc = document(
            &["b"],
            &[1],
            &[(
                "b",
                block(&[
                    ("MW", "early", pulse(-1.0, 1.0)),
                    ("MW", "late", pulse(8.0, 5.0)),
                ]),
            )],
        );
        doc.total_duration = TotalDuration::Fixed(10.0);
        let result = doc.check_against(&sync);
        let paths: Vec<&str> = result.errors.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["b.MW.early.start", "b.MW.late"]);
    }

    #[test]
    fn test_check_against_warnings() {
        let sync = synchroniser(&[("MW", 3)]);
        let doc = document(
            &["a"],
            &[1],
            &[
                (
                    "a",
                    block(&[
                        ("MW", "long", pulse(0.0, 10.0)),
                        ("MW", "short", pulse(1.0, 1.0)),
                        ("MW", "inside", pulse(5.0, 1.0)),
                    ]),
                ),
                ("unused", block(&[("MW", "p", pulse(0.0, 1.0))])),
            ],
        );
        let result = doc.check_against(&sync);
        assert!(result.is_valid());
        let paths: Vec<&str> = result.warnings.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["a.MW.short", "a.MW.inside", "unused"]);
    }

    #[test]
    fn test_total_duration_fixed() {
        assert_eq!(TotalDuration::Fixed(10.0).fixed(), Some(10.0));
        assert_eq!(TotalDuration::Ignore.fixed(), None);
    }
}
