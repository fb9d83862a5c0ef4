//! The two-channel scale engine and its type-state builder.
//!
//! Each channel's state sits behind its own mutex and the whole pipeline for
//! a sample runs inside that critical section, so samples on one channel are
//! serialized while the two channels proceed in parallel. The global reading
//! history has its own lock, always taken after a channel lock.
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use eyre::WrapErr;
use feeder_traits::clock::{Clock, MonotonicClock};
use feeder_traits::{BoxError, CalibrationStore, Channel, Reading};

use crate::calibration::{CalibrationStrategy, fix_factor};
use crate::config::{Feature, FeatureFlags, Thresholds};
use crate::diagnostics::channel_diagnostics;
use crate::error::{BuildError, EngineError, Result};
use crate::history::History;
use crate::pipeline;
use crate::state::{ChannelSnapshot, ChannelState};
use crate::store_error::map_store_error;
use crate::tare;
use crate::types::{
    CalibratedWeight, Diagnostics, FeatureReport, Frame, TareRequests, WeightSource,
};

/// Readings included in a diagnostics report.
const DIAGNOSTIC_READINGS: usize = 10;

#[inline]
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Map a numeric channel id to `Channel`.
pub fn parse_channel(id: u8) -> std::result::Result<Channel, EngineError> {
    Channel::try_from(id).map_err(EngineError::InvalidChannel)
}

pub struct Engine {
    channels: [Mutex<ChannelState>; 2],
    history: Mutex<History>,
    features: Mutex<FeatureFlags>,
    thresholds: Thresholds,
    store: Arc<dyn CalibrationStore>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("channel1_g", &self.current_weight(Channel::One))
            .field("channel2_g", &self.current_weight(Channel::Two))
            .field("features", &self.features())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start building an Engine.
    pub fn builder() -> EngineBuilder<Missing> {
        EngineBuilder::default()
    }

    fn channel(&self, channel: Channel) -> MutexGuard<'_, ChannelState> {
        lock(&self.channels[channel.index()])
    }

    /// Record a failed store write and keep the first one for the caller.
    fn note_persist(
        channel: Channel,
        what: &'static str,
        res: std::result::Result<(), BoxError>,
        first: &mut Option<EngineError>,
    ) {
        if let Err(e) = res {
            let err = map_store_error(e.as_ref());
            tracing::warn!(%channel, what, error = %err, "persistence failed; continuing in memory");
            first.get_or_insert(err);
        }
    }

    /// Condition one sample and make the result visible.
    ///
    /// Never fails: malformed or missing input keeps the previous weight, and
    /// store failures are reported through `persist_error`.
    pub fn ingest(
        &self,
        channel: Channel,
        raw: Option<f64>,
        reported_g: Option<f64>,
    ) -> CalibratedWeight {
        let mut state = self.channel(channel);
        // read under the channel lock so a toggle lands between samples
        let flags = self.features();
        let now = self.clock.now();

        let fresh_raw = raw.filter(|r| r.is_finite());
        if fresh_raw.is_some() {
            state.last_raw = fresh_raw;
        }

        let (weight_g, source, auto_tare_offset) = match (state.usable_factor(), raw) {
            (None, _) => match reported_g.filter(|g| g.is_finite()) {
                Some(g) => {
                    tracing::debug!(%channel, weight_g = g, "uncalibrated, passing reported grams through");
                    (g, WeightSource::Reported, None)
                }
                None => (state.current_weight, WeightSource::Retained, None),
            },
            (Some(_), None) => (state.current_weight, WeightSource::Retained, None),
            (Some(factor), Some(r)) => {
                let history = &self.history;
                let res = pipeline::condition(
                    channel,
                    &mut state,
                    r,
                    factor,
                    &self.thresholds,
                    flags,
                    now,
                    |n| lock(history).recent_weights(channel, n),
                );
                match res {
                    Ok(c) => (c.weight_g, WeightSource::Conditioned, c.auto_tare_offset),
                    Err(e) => {
                        tracing::warn!(%channel, error = %e, kept = state.current_weight, "malformed sample, keeping previous weight");
                        (state.current_weight, WeightSource::Retained, None)
                    }
                }
            }
        };
        state.current_weight = weight_g;

        let reading = Reading {
            timestamp: self.clock.utc_now(),
            channel,
            weight_g,
            raw: fresh_raw,
        };
        lock(&self.history).push(reading.clone());

        let mut persist_error = None;
        if let Some(r) = fresh_raw {
            Self::note_persist(channel, "last_raw", self.store.save_last_raw(channel, r), &mut persist_error);
        }
        if let Some(offset) = auto_tare_offset {
            Self::note_persist(channel, "offset", self.store.save_offset(channel, offset), &mut persist_error);
        }
        Self::note_persist(channel, "history", self.store.append_history(&reading), &mut persist_error);
        drop(state);

        tracing::debug!(%channel, weight_g, ?source, "sample ingested");
        CalibratedWeight {
            channel,
            weight_g,
            source,
            auto_tare_offset,
            persist_error,
        }
    }

    /// Ingest both channels of one remote-unit report, channel 1 first.
    pub fn ingest_frame(&self, frame: &Frame) -> [CalibratedWeight; 2] {
        Channel::ALL.map(|ch| self.ingest(ch, frame.raw(ch), frame.grams(ch)))
    }

    /// Zero the channel at its latest raw sample.
    pub fn tare(&self, channel: Channel) -> std::result::Result<f64, EngineError> {
        let mut state = self.channel(channel);
        tare::tare(channel, &mut state, self.store.as_ref())
    }

    pub fn reset_offset(&self, channel: Channel) -> std::result::Result<(), EngineError> {
        let mut state = self.channel(channel);
        tare::reset_offset(channel, &mut state, self.store.as_ref())
    }

    /// Derive the factor from a known reference weight on the scale.
    ///
    /// Uses the latest raw sample, or the persisted one after a restart; with
    /// no raw sample at all the current visible weight is the reference.
    pub fn calibrate(
        &self,
        channel: Channel,
        known_weight_g: f64,
    ) -> std::result::Result<f64, EngineError> {
        let mut state = self.channel(channel);
        let raw = match state.last_raw {
            Some(r) => Some(r),
            None => self.store.load_last_raw(channel).unwrap_or_else(|e| {
                tracing::warn!(%channel, error = %map_store_error(e.as_ref()), "could not load persisted raw value");
                None
            }),
        };
        let strategy = CalibrationStrategy::select(raw, state.zero_offset, state.current_weight);
        let factor = strategy.factor(channel, known_weight_g, &self.thresholds)?;
        state.calibration_factor = Some(factor);
        tracing::info!(%channel, factor, known_weight_g, strategy = strategy.name(), "calibrated");
        self.save_factor(channel, factor)?;
        Ok(factor)
    }

    /// Force the factor so the current raw sample reads `target_weight_g`.
    pub fn fix_calibration(
        &self,
        channel: Channel,
        target_weight_g: f64,
    ) -> std::result::Result<f64, EngineError> {
        let mut state = self.channel(channel);
        let raw = state
            .last_raw
            .ok_or(EngineError::NoRecentReading(channel))?;
        let factor = fix_factor(raw, state.zero_offset, target_weight_g)?;
        state.calibration_factor = Some(factor);
        tracing::info!(%channel, factor, target_weight_g, "calibration fixed");
        self.save_factor(channel, factor)?;
        Ok(factor)
    }

    fn save_factor(&self, channel: Channel, factor: f64) -> std::result::Result<(), EngineError> {
        self.store.save_calibration(channel, factor).map_err(|e| {
            let err = map_store_error(e.as_ref());
            tracing::warn!(%channel, error = %err, "failed to persist calibration factor");
            err
        })
    }

    pub fn current_weight(&self, channel: Channel) -> f64 {
        self.channel(channel).current_weight
    }

    /// Newest `limit` readings across both channels, oldest first.
    pub fn recent_history(&self, limit: usize) -> Vec<Reading> {
        lock(&self.history).recent(limit)
    }

    /// Set a feature by name, or flip it when `enabled` is `None`.
    /// Returns the new value.
    pub fn set_feature(
        &self,
        name: &str,
        enabled: Option<bool>,
    ) -> std::result::Result<bool, EngineError> {
        let feature: Feature = name.parse()?;
        let mut flags = lock(&self.features);
        let value = enabled.unwrap_or(!flags.get(feature));
        flags.set(feature, value);
        tracing::info!(%feature, enabled = value, "feature changed");
        Ok(value)
    }

    pub fn features(&self) -> FeatureFlags {
        *lock(&self.features)
    }

    pub fn feature_report(&self) -> FeatureReport {
        FeatureReport {
            flags: self.features(),
            thresholds: self.thresholds.clone(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn calibration_factors(&self) -> [(Channel, Option<f64>); 2] {
        Channel::ALL.map(|ch| (ch, self.channel(ch).calibration_factor))
    }

    /// Copy of one channel's state.
    pub fn channel_state(&self, channel: Channel) -> ChannelSnapshot {
        self.channel(channel).snapshot()
    }

    /// Return the pending remote tare flags and clear them.
    pub fn take_remote_tare_requests(&self) -> TareRequests {
        let take = |ch| std::mem::take(&mut self.channel(ch).remote_tare_pending);
        TareRequests {
            channel1: take(Channel::One),
            channel2: take(Channel::Two),
        }
    }

    pub fn diagnostics(&self, target_weight_g: f64) -> Diagnostics {
        let channels = Channel::ALL
            .into_iter()
            .map(|ch| {
                let persisted = self.store.load_offset(ch).unwrap_or_else(|e| {
                    tracing::warn!(channel = %ch, error = %map_store_error(e.as_ref()), "could not load persisted offset");
                    None
                });
                let state = self.channel(ch);
                channel_diagnostics(ch, &state, persisted, target_weight_g)
            })
            .collect();
        Diagnostics {
            target_weight_g,
            channels,
            recent_readings: self.recent_history(DIAGNOSTIC_READINGS),
            flags: self.features(),
        }
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Engine`. Thresholds are validated and initial state is
/// loaded from the store on `build()`.
pub struct EngineBuilder<St> {
    store: Option<Arc<dyn CalibrationStore>>,
    thresholds: Option<Thresholds>,
    features: Option<FeatureFlags>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _st: PhantomData<St>,
}

impl Default for EngineBuilder<Missing> {
    fn default() -> Self {
        Self {
            store: None,
            thresholds: None,
            features: None,
            clock: None,
            _st: PhantomData,
        }
    }
}

fn validate(th: &Thresholds) -> Result<()> {
    let bad = |msg: &'static str| Err(eyre::Report::new(BuildError::InvalidConfig(msg)));
    if th.raw_window == 0 {
        return bad("raw_window must be >= 1");
    }
    if th.history_capacity == 0 {
        return bad("history_capacity must be >= 1");
    }
    if th.fallback_lookback == 0 {
        return bad("fallback_lookback must be >= 1");
    }
    if !(th.max_weight_g.is_finite() && th.max_weight_g > 0.0) {
        return bad("max_weight_g must be > 0");
    }
    if !(th.zero_threshold_g.is_finite() && th.zero_threshold_g >= 0.0) {
        return bad("zero_threshold_g must be >= 0");
    }
    if !(th.outlier_threshold_raw.is_finite() && th.outlier_threshold_raw > 0.0) {
        return bad("outlier_threshold_raw must be > 0");
    }
    if !(th.stability_threshold_g.is_finite() && th.stability_threshold_g > 0.0) {
        return bad("stability_threshold_g must be > 0");
    }
    if th.stability_count == 0 {
        return bad("stability_count must be >= 1");
    }
    if th.negative_streak_threshold == 0 {
        return bad("negative_streak_threshold must be >= 1");
    }
    if !(th.min_factor.is_finite() && th.min_factor > 0.0 && th.min_factor < th.max_factor) {
        return bad("factor bounds must satisfy 0 < min_factor < max_factor");
    }
    Ok(())
}

fn load<T>(
    res: std::result::Result<T, BoxError>,
    what: &'static str,
    channel: Option<Channel>,
) -> Result<T> {
    res.map_err(|e| map_store_error(e.as_ref()))
        .wrap_err_with(|| match channel {
            Some(ch) => format!("loading {what} for {ch}"),
            None => format!("loading {what}"),
        })
}

impl<St> EngineBuilder<St> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Engine> {
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let thresholds = self.thresholds.unwrap_or_default();
        validate(&thresholds)?;

        let mut states = Vec::with_capacity(2);
        for ch in Channel::ALL {
            let factor = load(store.load_calibration(ch), "calibration factor", Some(ch))?;
            let offset = load(store.load_offset(ch), "zero offset", Some(ch))?;
            tracing::debug!(channel = %ch, ?factor, ?offset, "channel state loaded");
            if factor.is_none_or(|f| f == 0.0) {
                tracing::warn!(channel = %ch, "channel is uncalibrated; reported grams will be passed through");
            }
            states.push(ChannelState::new(thresholds.raw_window, factor, offset));
        }
        let [one, two]: [ChannelState; 2] = states
            .try_into()
            .map_err(|_| eyre::Report::new(BuildError::InvalidConfig("channel count")))?;

        let restored = load(
            store.load_recent_history(thresholds.history_capacity),
            "reading history",
            None,
        )?;
        let history = History::restore(thresholds.history_capacity, restored);
        tracing::info!(readings = history.len(), "engine ready");

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(Engine {
            channels: [Mutex::new(one), Mutex::new(two)],
            history: Mutex::new(history),
            features: Mutex::new(self.features.unwrap_or_default()),
            thresholds,
            store,
            clock,
        })
    }
}

/// Chainable setters that do not affect type-state.
impl<St> EngineBuilder<St> {
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }
    pub fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl EngineBuilder<Missing> {
    pub fn with_store(self, store: impl CalibrationStore + 'static) -> EngineBuilder<Set> {
        self.with_shared_store(Arc::new(store))
    }

    pub fn with_shared_store(self, store: Arc<dyn CalibrationStore>) -> EngineBuilder<Set> {
        EngineBuilder {
            store: Some(store),
            thresholds: self.thresholds,
            features: self.features,
            clock: self.clock,
            _st: PhantomData,
        }
    }
}

impl EngineBuilder<Set> {
    /// Validate, load initial state and build. Only available once a store is set.
    pub fn build(self) -> Result<Engine> {
        self.try_build()
    }
}
