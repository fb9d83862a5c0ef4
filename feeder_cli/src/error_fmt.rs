//! Human-readable error descriptions and structured JSON error formatting.

use feeder_core::error::{BuildError, EngineError};

/// Stable name of the error kind, used as the JSON `reason`.
pub fn error_kind(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => "MissingStore",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::NoRecentReading(_) => "NoRecentReading",
            EngineError::InvalidCalibration(_) => "InvalidCalibration",
            EngineError::NoReference(_) => "NoReference",
            EngineError::Persistence(_) => "Persistence",
            EngineError::UnknownFeature(_) => "UnknownFeature",
            EngineError::InvalidChannel(_) => "InvalidChannel",
        };
    }
    if is_config_error(err) {
        return "InvalidConfig";
    }
    "Error"
}

fn is_config_error(err: &eyre::Report) -> bool {
    err.chain().any(|e| {
        let m = e.to_string();
        m.starts_with("invalid configuration") || m.starts_with("parse config")
    })
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => {
                "What happened: No calibration store was provided to the engine.\nLikely causes: The storage backend failed to open or was not wired into the builder.\nHow to fix: Check the [storage] section and make sure the directory is writable.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the [engine] section.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ee) = err.downcast_ref::<EngineError>() {
        return match ee {
            EngineError::NoRecentReading(ch) => format!(
                "What happened: {ch} has no raw reading yet.\nLikely causes: No sample was ingested in this run.\nHow to fix: Pass --raw with the current raw value, or ingest a sample first."
            ),
            EngineError::InvalidCalibration(msg) => format!(
                "What happened: Calibration was rejected ({msg}).\nLikely causes: The reference weight is zero, the scale reads zero, or the factor is out of bounds.\nHow to fix: Put a known non-zero weight on the scale and pass its exact mass."
            ),
            EngineError::NoReference(ch) => format!(
                "What happened: {ch} has no raw value and reads 0 g, so there is nothing to calibrate against.\nLikely causes: No sample has ever been received on this channel.\nHow to fix: Pass --raw with the raw value for the reference weight."
            ),
            EngineError::Persistence(msg) => format!(
                "What happened: The change was applied but could not be saved ({msg}).\nLikely causes: The storage directory is missing, full or not writable.\nHow to fix: Check [storage].dir and its permissions, then repeat the command."
            ),
            EngineError::UnknownFeature(name) => format!(
                "What happened: Unknown feature `{name}`.\nLikely causes: Typo in the feature name.\nHow to fix: Use one of: {}.",
                feeder_core::Feature::ALL.map(|f| f.name()).join(", ")
            ),
            EngineError::InvalidChannel(id) => format!(
                "What happened: Channel {id} does not exist.\nLikely causes: Wrong --channel value.\nHow to fix: Use --channel 1 or --channel 2."
            ),
        };
    }

    if is_config_error(err) {
        let root = err.root_cause();
        return format!(
            "What happened: Configuration is invalid ({root}).\nLikely causes: A malformed TOML value or an out-of-range threshold.\nHow to fix: Edit the config file and try again."
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("samples csv must have headers") {
        return "Invalid headers in samples CSV. Expected 'channel,raw,grams'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; clap usage errors keep clap's 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match error_kind(err) {
        "NoRecentReading" => 3,
        "InvalidCalibration" => 4,
        "NoReference" => 5,
        "Persistence" => 6,
        "UnknownFeature" => 7,
        "InvalidChannel" => 8,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": error_kind(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeder_traits::Channel;
    use rstest::rstest;

    #[rstest]
    #[case(EngineError::NoRecentReading(Channel::One), 3, "NoRecentReading")]
    #[case(EngineError::InvalidCalibration("zero".into()), 4, "InvalidCalibration")]
    #[case(EngineError::NoReference(Channel::Two), 5, "NoReference")]
    #[case(EngineError::Persistence("disk".into()), 6, "Persistence")]
    #[case(EngineError::UnknownFeature("x".into()), 7, "UnknownFeature")]
    #[case(EngineError::InvalidChannel(3), 8, "InvalidChannel")]
    fn engine_errors_have_stable_codes(
        #[case] e: EngineError,
        #[case] code: i32,
        #[case] kind: &str,
    ) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        assert_eq!(error_kind(&report), kind);
        assert!(humanize(&report).starts_with("What happened:"));
    }

    #[test]
    fn wrapped_build_error_is_still_recognised() {
        use eyre::WrapErr;
        let res: Result<(), _> = Err(BuildError::InvalidConfig("raw_window must be >= 1"));
        let report = res.wrap_err("building engine").unwrap_err();
        assert_eq!(error_kind(&report), "InvalidConfig");
        assert!(humanize(&report).contains("raw_window"));
        assert_eq!(exit_code_for_error(&report), 1);
    }

    #[test]
    fn config_errors_show_the_root_cause() {
        use eyre::WrapErr;
        let res: eyre::Result<()> = Err(eyre::eyre!("engine.raw_window must be >= 1"));
        let report = res.wrap_err("invalid configuration").unwrap_err();
        let text = humanize(&report);
        assert!(text.contains("engine.raw_window"), "{text}");
    }

    #[test]
    fn unknown_feature_lists_valid_names() {
        let report = eyre::Report::new(EngineError::UnknownFeature("bogus".into()));
        assert!(humanize(&report).contains("use_weight_filtering"));
    }

    #[test]
    fn json_error_carries_reason() {
        let report = eyre::Report::new(EngineError::InvalidChannel(9));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "InvalidChannel");
        assert!(v["message"].as_str().unwrap().contains("Channel 9"));
    }

    #[test]
    fn generic_errors_fall_back() {
        let report = eyre::eyre!("boom");
        assert!(humanize(&report).starts_with("Something went wrong."));
        assert!(format_error_json(&report).contains("\"Error\""));
    }
}
