//! File-backed store.
//!
//! Layout under the store directory:
//! - `calibration.toml`: one `[channels.N]` table per channel with optional
//!   `factor`, `offset` and `last_raw` keys.
//! - `history.csv`: `timestamp,channel,weight_g,raw`, oldest first, capped.
//!
//! Both files are cached in memory and rewritten atomically on change.
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use feeder_traits::{BoxError, CalibrationStore, Channel, Reading};
use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic;
use crate::error::{Result, StoreError};

const CALIBRATION_FILE: &str = "calibration.toml";
const HISTORY_FILE: &str = "history.csv";

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq)]
struct ChannelRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_raw: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CalibrationFile {
    #[serde(default)]
    channels: BTreeMap<String, ChannelRecord>,
}

impl CalibrationFile {
    fn record(&self, channel: Channel) -> ChannelRecord {
        self.channels
            .get(&channel.id().to_string())
            .copied()
            .unwrap_or_default()
    }

    fn record_mut(&mut self, channel: Channel) -> &mut ChannelRecord {
        self.channels.entry(channel.id().to_string()).or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryRow {
    timestamp: String,
    channel: u8,
    weight_g: f64,
    raw: Option<f64>,
}

impl From<&Reading> for HistoryRow {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp.to_rfc3339(),
            channel: r.channel.id(),
            weight_g: r.weight_g,
            raw: r.raw,
        }
    }
}

impl TryFrom<&HistoryRow> for Reading {
    type Error = StoreError;

    fn try_from(row: &HistoryRow) -> Result<Self> {
        let channel = Channel::from_id(row.channel).ok_or_else(|| StoreError::Decode {
            file: HISTORY_FILE,
            reason: format!("unknown channel {}", row.channel),
        })?;
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| StoreError::Decode {
                file: HISTORY_FILE,
                reason: format!("timestamp {:?}: {e}", row.timestamp),
            })?
            .with_timezone(&Utc);
        Ok(Reading {
            timestamp,
            channel,
            weight_g: row.weight_g,
            raw: row.raw,
        })
    }
}

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    history_capacity: usize,
    calibration: Mutex<CalibrationFile>,
    history: Mutex<VecDeque<Reading>>,
}

impl FileStore {
    /// Open (or create) a store rooted at `dir`. Existing files are parsed
    /// eagerly so corruption surfaces at startup rather than mid-run.
    pub fn open(dir: impl AsRef<Path>, history_capacity: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let history_capacity = history_capacity.max(1);

        let calibration = read_calibration(&dir.join(CALIBRATION_FILE))?;
        let mut history = read_history(&dir.join(HISTORY_FILE))?;
        while history.len() > history_capacity {
            history.pop_front();
        }
        tracing::debug!(
            dir = %dir.display(),
            channels = calibration.channels.len(),
            history = history.len(),
            "file store opened"
        );

        Ok(Self {
            dir,
            history_capacity,
            calibration: Mutex::new(calibration),
            history: Mutex::new(history),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn update_channel<F: FnOnce(&mut ChannelRecord)>(&self, channel: Channel, f: F) -> Result<()> {
        let mut cal = self.calibration.lock().map_err(|_| StoreError::Poisoned)?;
        f(cal.record_mut(channel));
        let text = toml::to_string(&*cal).map_err(|e| StoreError::Encode {
            file: CALIBRATION_FILE,
            reason: e.to_string(),
        })?;
        write_atomic(&self.dir.join(CALIBRATION_FILE), text.as_bytes())?;
        Ok(())
    }

    fn channel_record(&self, channel: Channel) -> Result<ChannelRecord> {
        let cal = self.calibration.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(cal.record(channel))
    }
}

fn read_calibration(path: &Path) -> Result<CalibrationFile> {
    if !path.exists() {
        return Ok(CalibrationFile::default());
    }
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| StoreError::Decode {
        file: CALIBRATION_FILE,
        reason: e.to_string(),
    })
}

fn read_history(path: &Path) -> Result<VecDeque<Reading>> {
    let mut out = VecDeque::new();
    if !path.exists() {
        return Ok(out);
    }
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    for rec in rdr.deserialize::<HistoryRow>() {
        let row = rec?;
        out.push_back(Reading::try_from(&row)?);
    }
    Ok(out)
}

fn encode_history(history: &VecDeque<Reading>) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for r in history {
        wtr.serialize(HistoryRow::from(r))?;
    }
    // An empty history still gets a header so the file stays self-describing.
    if history.is_empty() {
        wtr.write_record(["timestamp", "channel", "weight_g", "raw"])?;
    }
    wtr.into_inner().map_err(|e| StoreError::Encode {
        file: HISTORY_FILE,
        reason: e.to_string(),
    })
}

impl CalibrationStore for FileStore {
    fn load_calibration(&self, channel: Channel) -> std::result::Result<Option<f64>, BoxError> {
        Ok(self.channel_record(channel)?.factor)
    }

    fn save_calibration(&self, channel: Channel, factor: f64) -> std::result::Result<(), BoxError> {
        Ok(self.update_channel(channel, |r| r.factor = Some(factor))?)
    }

    fn load_offset(&self, channel: Channel) -> std::result::Result<Option<f64>, BoxError> {
        Ok(self.channel_record(channel)?.offset)
    }

    fn save_offset(&self, channel: Channel, offset: f64) -> std::result::Result<(), BoxError> {
        Ok(self.update_channel(channel, |r| r.offset = Some(offset))?)
    }

    fn delete_offset(&self, channel: Channel) -> std::result::Result<(), BoxError> {
        Ok(self.update_channel(channel, |r| r.offset = None)?)
    }

    fn load_last_raw(&self, channel: Channel) -> std::result::Result<Option<f64>, BoxError> {
        Ok(self.channel_record(channel)?.last_raw)
    }

    fn save_last_raw(&self, channel: Channel, raw: f64) -> std::result::Result<(), BoxError> {
        Ok(self.update_channel(channel, |r| r.last_raw = Some(raw))?)
    }

    fn append_history(&self, reading: &Reading) -> std::result::Result<(), BoxError> {
        let mut hist = self.history.lock().map_err(|_| StoreError::Poisoned)?;
        hist.push_back(reading.clone());
        while hist.len() > self.history_capacity {
            hist.pop_front();
        }
        let bytes = encode_history(&hist)?;
        write_atomic(&self.dir.join(HISTORY_FILE), &bytes).map_err(StoreError::from)?;
        Ok(())
    }

    fn load_recent_history(&self, limit: usize) -> std::result::Result<Vec<Reading>, BoxError> {
        let hist = self.history.lock().map_err(|_| StoreError::Poisoned)?;
        let skip = hist.len().saturating_sub(limit);
        Ok(hist.iter().skip(skip).cloned().collect())
    }
}
