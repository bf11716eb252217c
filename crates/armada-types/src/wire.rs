//! Radio wire envelopes.
//!
//! Every payload crossing the radio link, in either direction, is a
//! compact JSON object with a `t` type discriminator and an `id` vehicle
//! identifier plus type-specific short-key fields.  Decoding turns a raw
//! payload into exactly one [`WireMessage`] variant or an error; an
//! untyped map never travels deeper into the system.
//!
//! | Tag | Direction | Fields |
//! |---|---|---|
//! | `reg` | vehicle → core | – |
//! | `hb` | vehicle → core | `s` status, `n` notification |
//! | `dt1` | vehicle → core | `lt` latitude, `lg` longitude |
//! | `dt2` | vehicle → core | `w` wind dir, `tp` temperature, `h` heading |
//! | `dt3` | vehicle → core | `mx`/`my`/`mz` magnetometer axes |
//! | `cal_data` | vehicle → core | `rm`/`rx`/`sm`/`sx`/`em`/`ex` limits |
//! | `cmd` | core → vehicle | `md` mode + mode-specific set-points |
//! | `cal` | core → vehicle | the six limits, rounded to one decimal |
//! | `cal_test` | core → vehicle | `ch` channel, `v` value |
//! | `dr` | core → vehicle | – |
//! | `req_cal_data` | core → vehicle | – |

use serde_json::{Value, json};

use crate::telemetry::{CalibrationProfile, Telemetry};
use crate::ArmadaError;

/// Closed set of envelopes exchanged over the radio link.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// `reg` – explicit registration on power-up.
    Register { id: String },
    /// `hb` – heartbeat carrying operational status and a transient
    /// notification.
    Heartbeat {
        id: String,
        status: String,
        notification: String,
    },
    /// `dt1` – GPS fix.
    Position {
        id: String,
        latitude: f64,
        longitude: f64,
    },
    /// `dt2` – environment sample.
    Environment {
        id: String,
        wind_dir: f64,
        temperature: f64,
        heading: f64,
    },
    /// `dt3` – magnetometer axes.
    Magnetics {
        id: String,
        mag_x: f64,
        mag_y: f64,
        mag_z: f64,
    },
    /// `cal_data` – calibration limits reported back by the vehicle.
    CalibrationData {
        id: String,
        profile: CalibrationProfile,
    },
    /// `cmd` – operator command.
    Command { id: String, mode: CommandMode },
    /// `cal` – calibration limits pushed to the vehicle.  Limits are
    /// rounded to one decimal place on encode.
    Calibrate {
        id: String,
        profile: CalibrationProfile,
    },
    /// `cal_test` – single-channel calibration probe.
    CalibrationTest {
        id: String,
        channel: CalChannel,
        value: f64,
    },
    /// `dr` – telemetry poll.
    DataRequest { id: String },
    /// `req_cal_data` – calibration poll; the vehicle answers with
    /// `cal_data`.
    CalibrationRequest { id: String },
}

/// Mode-specific body of a `cmd` envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandMode {
    /// `mnl` – direct rudder/sail/throttle set-points.
    Manual {
        rudder: f64,
        sail: f64,
        throttle: f64,
    },
    /// `auto` – steer towards a target coordinate.
    Auto { target_lat: f64, target_lng: f64 },
}

/// Actuation channel addressed by a `cal_test` probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalChannel {
    Rudder,
    Sail,
    Throttle,
}

impl CalChannel {
    /// Wire tag for this channel.
    pub fn tag(&self) -> &'static str {
        match self {
            CalChannel::Rudder => "r",
            CalChannel::Sail => "s",
            CalChannel::Throttle => "th",
        }
    }

    /// Parse a wire tag back into a channel.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "r" => Some(CalChannel::Rudder),
            "s" => Some(CalChannel::Sail),
            "th" => Some(CalChannel::Throttle),
            _ => None,
        }
    }
}

impl WireMessage {
    /// Vehicle identifier every envelope carries.
    pub fn vehicle_id(&self) -> &str {
        match self {
            WireMessage::Register { id }
            | WireMessage::Heartbeat { id, .. }
            | WireMessage::Position { id, .. }
            | WireMessage::Environment { id, .. }
            | WireMessage::Magnetics { id, .. }
            | WireMessage::CalibrationData { id, .. }
            | WireMessage::Command { id, .. }
            | WireMessage::Calibrate { id, .. }
            | WireMessage::CalibrationTest { id, .. }
            | WireMessage::DataRequest { id }
            | WireMessage::CalibrationRequest { id } => id,
        }
    }

    /// Decode a raw radio payload.
    ///
    /// # Errors
    ///
    /// * [`ArmadaError::Decode`] – unparseable JSON, missing `t`/`id`, or a
    ///   missing required field for the tagged type.
    /// * [`ArmadaError::UnknownType`] – a well-formed envelope with an
    ///   unrecognised discriminator.
    pub fn decode(payload: &[u8]) -> Result<Self, ArmadaError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| ArmadaError::Decode(e.to_string()))?;
        let tag = value
            .get("t")
            .and_then(Value::as_str)
            .ok_or_else(|| ArmadaError::Decode("missing 't' discriminator".to_string()))?
            .to_string();
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ArmadaError::Decode(format!("'{tag}' envelope missing 'id'")))?
            .to_string();

        match tag.as_str() {
            "reg" => Ok(WireMessage::Register { id }),
            "hb" => Ok(WireMessage::Heartbeat {
                id,
                status: str_or(&value, "s", "unknown"),
                notification: str_or(&value, "n", ""),
            }),
            "dt1" => Ok(WireMessage::Position {
                id,
                latitude: num(&value, "lt")?,
                longitude: num(&value, "lg")?,
            }),
            "dt2" => Ok(WireMessage::Environment {
                id,
                wind_dir: num(&value, "w")?,
                temperature: num(&value, "tp")?,
                heading: num(&value, "h")?,
            }),
            "dt3" => Ok(WireMessage::Magnetics {
                id,
                mag_x: num(&value, "mx")?,
                mag_y: num(&value, "my")?,
                mag_z: num(&value, "mz")?,
            }),
            "cal_data" => Ok(WireMessage::CalibrationData {
                id,
                profile: profile_from(&value)?,
            }),
            "cmd" => {
                let mode = match str_or(&value, "md", "").as_str() {
                    "mnl" => CommandMode::Manual {
                        rudder: num_or(&value, "r", 0.0),
                        sail: num_or(&value, "s", 0.0),
                        throttle: num_or(&value, "th", 0.0),
                    },
                    "auto" => CommandMode::Auto {
                        target_lat: num_or(&value, "tlat", 0.0),
                        target_lng: num_or(&value, "tlng", 0.0),
                    },
                    other => {
                        return Err(ArmadaError::Decode(format!(
                            "'cmd' envelope with invalid mode '{other}'"
                        )));
                    }
                };
                Ok(WireMessage::Command { id, mode })
            }
            "cal" => Ok(WireMessage::Calibrate {
                id,
                profile: profile_from(&value)?,
            }),
            "cal_test" => {
                let channel_tag = str_or(&value, "ch", "");
                let channel = CalChannel::from_tag(&channel_tag).ok_or_else(|| {
                    ArmadaError::Decode(format!(
                        "'cal_test' envelope with invalid channel '{channel_tag}'"
                    ))
                })?;
                Ok(WireMessage::CalibrationTest {
                    id,
                    channel,
                    value: num(&value, "v")?,
                })
            }
            "dr" => Ok(WireMessage::DataRequest { id }),
            "req_cal_data" => Ok(WireMessage::CalibrationRequest { id }),
            other => Err(ArmadaError::UnknownType {
                tag: other.to_string(),
            }),
        }
    }

    /// Serialise into the compact JSON form sent over the radio.
    pub fn encode(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }

    /// The telemetry fields this message contributes, if any.
    ///
    /// Each subtype maps to a patch carrying only its own fields so that
    /// the registry merge leaves everything else untouched.
    pub fn telemetry_patch(&self) -> Option<Telemetry> {
        match self {
            WireMessage::Position {
                latitude,
                longitude,
                ..
            } => Some(Telemetry {
                latitude: Some(*latitude),
                longitude: Some(*longitude),
                ..Default::default()
            }),
            WireMessage::Environment {
                wind_dir,
                temperature,
                heading,
                ..
            } => Some(Telemetry {
                wind_dir: Some(*wind_dir),
                temperature: Some(*temperature),
                heading: Some(*heading),
                ..Default::default()
            }),
            WireMessage::Magnetics {
                mag_x, mag_y, mag_z, ..
            } => Some(Telemetry {
                mag_x: Some(*mag_x),
                mag_y: Some(*mag_y),
                mag_z: Some(*mag_z),
                ..Default::default()
            }),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            WireMessage::Register { id } => json!({"t": "reg", "id": id}),
            WireMessage::Heartbeat {
                id,
                status,
                notification,
            } => json!({"t": "hb", "id": id, "s": status, "n": notification}),
            WireMessage::Position {
                id,
                latitude,
                longitude,
            } => json!({"t": "dt1", "id": id, "lt": latitude, "lg": longitude}),
            WireMessage::Environment {
                id,
                wind_dir,
                temperature,
                heading,
            } => json!({"t": "dt2", "id": id, "w": wind_dir, "tp": temperature, "h": heading}),
            WireMessage::Magnetics {
                id,
                mag_x,
                mag_y,
                mag_z,
            } => json!({"t": "dt3", "id": id, "mx": mag_x, "my": mag_y, "mz": mag_z}),
            WireMessage::CalibrationData { id, profile } => {
                profile_value("cal_data", id, profile)
            }
            WireMessage::Command { id, mode } => match mode {
                CommandMode::Manual {
                    rudder,
                    sail,
                    throttle,
                } => json!({
                    "t": "cmd", "id": id, "md": "mnl",
                    "r": rudder, "s": sail, "th": throttle
                }),
                CommandMode::Auto {
                    target_lat,
                    target_lng,
                } => json!({
                    "t": "cmd", "id": id, "md": "auto",
                    "tlat": target_lat, "tlng": target_lng
                }),
            },
            WireMessage::Calibrate { id, profile } => {
                profile_value("cal", id, &profile.rounded())
            }
            WireMessage::CalibrationTest { id, channel, value } => {
                json!({"t": "cal_test", "id": id, "ch": channel.tag(), "v": value})
            }
            WireMessage::DataRequest { id } => json!({"t": "dr", "id": id}),
            WireMessage::CalibrationRequest { id } => json!({"t": "req_cal_data", "id": id}),
        }
    }
}

fn profile_value(tag: &str, id: &str, profile: &CalibrationProfile) -> Value {
    json!({
        "t": tag, "id": id,
        "rm": profile.rudder_min, "rx": profile.rudder_max,
        "sm": profile.sail_min, "sx": profile.sail_max,
        "em": profile.throttle_min, "ex": profile.throttle_max
    })
}

fn profile_from(value: &Value) -> Result<CalibrationProfile, ArmadaError> {
    Ok(CalibrationProfile {
        rudder_min: num(value, "rm")?,
        rudder_max: num(value, "rx")?,
        sail_min: num(value, "sm")?,
        sail_max: num(value, "sx")?,
        throttle_min: num(value, "em")?,
        throttle_max: num(value, "ex")?,
    })
}

fn num(value: &Value, key: &str) -> Result<f64, ArmadaError> {
    value
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ArmadaError::Decode(format!("missing numeric field '{key}'")))
}

fn num_or(value: &Value, key: &str, default: f64) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn str_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_heartbeat_with_status() {
        let msg = WireMessage::decode(br#"{"t":"hb","id":"B1","s":"ok","n":"low battery"}"#)
            .expect("heartbeat must decode");
        assert_eq!(
            msg,
            WireMessage::Heartbeat {
                id: "B1".to_string(),
                status: "ok".to_string(),
                notification: "low battery".to_string(),
            }
        );
    }

    #[test]
    fn decode_heartbeat_defaults_status_and_notification() {
        let msg = WireMessage::decode(br#"{"t":"hb","id":"B1"}"#).unwrap();
        match msg {
            WireMessage::Heartbeat {
                status,
                notification,
                ..
            } => {
                assert_eq!(status, "unknown");
                assert_eq!(notification, "");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn decode_position_fix() {
        let msg = WireMessage::decode(br#"{"t":"dt1","id":"B1","lt":37.8,"lg":-122.3}"#).unwrap();
        assert_eq!(
            msg,
            WireMessage::Position {
                id: "B1".to_string(),
                latitude: 37.8,
                longitude: -122.3,
            }
        );
    }

    #[test]
    fn decode_unknown_tag_is_reported_as_unknown_type() {
        let err = WireMessage::decode(br#"{"t":"warp","id":"B1"}"#).unwrap_err();
        assert!(matches!(err, ArmadaError::UnknownType { tag } if tag == "warp"));
    }

    #[test]
    fn decode_missing_id_is_a_decode_error() {
        let err = WireMessage::decode(br#"{"t":"hb"}"#).unwrap_err();
        assert!(matches!(err, ArmadaError::Decode(_)));
    }

    #[test]
    fn decode_garbage_is_a_decode_error() {
        let err = WireMessage::decode(b"not json at all").unwrap_err();
        assert!(matches!(err, ArmadaError::Decode(_)));
    }

    #[test]
    fn decode_position_missing_axis_is_a_decode_error() {
        let err = WireMessage::decode(br#"{"t":"dt1","id":"B1","lt":37.8}"#).unwrap_err();
        assert!(matches!(err, ArmadaError::Decode(_)));
    }

    #[test]
    fn manual_command_encodes_set_points() {
        let msg = WireMessage::Command {
            id: "B2".to_string(),
            mode: CommandMode::Manual {
                rudder: 12.0,
                sail: 45.0,
                throttle: 0.6,
            },
        };
        let value: Value = serde_json::from_slice(&msg.encode()).unwrap();
        assert_eq!(value["t"], "cmd");
        assert_eq!(value["md"], "mnl");
        assert_eq!(value["r"], 12.0);
        assert_eq!(value["s"], 45.0);
        assert_eq!(value["th"], 0.6);
    }

    #[test]
    fn auto_command_encodes_target_coordinates() {
        let msg = WireMessage::Command {
            id: "B2".to_string(),
            mode: CommandMode::Auto {
                target_lat: 10.0,
                target_lng: 20.0,
            },
        };
        let value: Value = serde_json::from_slice(&msg.encode()).unwrap();
        assert_eq!(value["md"], "auto");
        assert_eq!(value["tlat"], 10.0);
        assert_eq!(value["tlng"], 20.0);
    }

    #[test]
    fn calibrate_encodes_limits_rounded_to_one_decimal() {
        let msg = WireMessage::Calibrate {
            id: "B3".to_string(),
            profile: CalibrationProfile {
                rudder_min: -45.04,
                rudder_max: 45.06,
                sail_min: 0.0,
                sail_max: 88.88,
                throttle_min: 0.0,
                throttle_max: 100.0,
            },
        };
        let value: Value = serde_json::from_slice(&msg.encode()).unwrap();
        assert_eq!(value["rm"], -45.0);
        assert_eq!(value["rx"], 45.1);
        assert_eq!(value["sx"], 88.9);
    }

    #[test]
    fn cal_test_round_trips_through_the_channel_tag() {
        let msg = WireMessage::CalibrationTest {
            id: "B4".to_string(),
            channel: CalChannel::Throttle,
            value: 0.75,
        };
        let decoded = WireMessage::decode(&msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn telemetry_patch_carries_only_the_subtype_fields() {
        let msg = WireMessage::decode(br#"{"t":"dt2","id":"B1","w":270.0,"tp":18.5,"h":92.0}"#)
            .unwrap();
        let patch = msg.telemetry_patch().expect("dt2 carries telemetry");
        assert_eq!(patch.wind_dir, Some(270.0));
        assert_eq!(patch.temperature, Some(18.5));
        assert_eq!(patch.heading, Some(92.0));
        assert_eq!(patch.latitude, None);
        assert_eq!(patch.mag_x, None);
    }

    #[test]
    fn heartbeat_carries_no_telemetry_patch() {
        let msg = WireMessage::decode(br#"{"t":"hb","id":"B1","s":"ok"}"#).unwrap();
        assert!(msg.telemetry_patch().is_none());
    }
}
