use serde_json::Value;

use crate::constants::{GRID_COLUMNS, GRID_ROWS, PALETTE_SIZE};
use crate::types::InputState;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Hello {
        name: Option<String>,
    },
    Input {
        input: InputState,
    },
    Paint {
        row: usize,
        col: usize,
        value: u8,
    },
    Run,
    Edit,
    ClearLevel,
    Share,
    LoadLevel {
        code: String,
    },
    SetLevel {
        level: usize,
    },
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "hello" => {
            let name = match object.get("name") {
                None => None,
                Some(value) => Some(value.as_str()?.to_string()),
            };
            Some(ParsedClientMessage::Hello { name })
        }
        "input" => {
            let input = InputState {
                up: parse_optional_bool(object.get("up"))?,
                down: parse_optional_bool(object.get("down"))?,
                left: parse_optional_bool(object.get("left"))?,
                right: parse_optional_bool(object.get("right"))?,
            };
            Some(ParsedClientMessage::Input { input })
        }
        "paint" => {
            let row = parse_index(object.get("row")?, GRID_ROWS)?;
            let col = parse_index(object.get("col")?, GRID_COLUMNS)?;
            let value = object.get("value")?.as_u64()?;
            if value >= PALETTE_SIZE as u64 {
                return None;
            }
            Some(ParsedClientMessage::Paint {
                row,
                col,
                value: value as u8,
            })
        }
        "run" => Some(ParsedClientMessage::Run),
        "edit" => Some(ParsedClientMessage::Edit),
        "clear" => Some(ParsedClientMessage::ClearLevel),
        "share" => Some(ParsedClientMessage::Share),
        "load_level" => {
            let code = object.get("code")?.as_str()?.to_string();
            Some(ParsedClientMessage::LoadLevel { code })
        }
        "set_level" => {
            let level = object.get("level")?.as_u64()?;
            if level > 9 {
                return None;
            }
            Some(ParsedClientMessage::SetLevel {
                level: level as usize,
            })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_optional_bool(value: Option<&Value>) -> Option<bool> {
    match value {
        None => Some(false),
        Some(value) => value.as_bool(),
    }
}

fn parse_index(value: &Value, limit: usize) -> Option<usize> {
    let number = value.as_u64()?;
    let index = usize::try_from(number).ok()?;
    if index >= limit {
        return None;
    }
    Some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hello_message() {
        let parsed = parse_client_message(r#"{"type":"hello","name":"A"}"#)
            .expect("hello message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Hello {
                name: Some("A".to_string())
            }
        );

        let parsed =
            parse_client_message(r#"{"type":"hello"}"#).expect("anonymous hello should parse");
        assert_eq!(parsed, ParsedClientMessage::Hello { name: None });
    }

    #[test]
    fn parse_input_defaults_missing_keys_to_released() {
        let parsed = parse_client_message(r#"{"type":"input","left":true}"#)
            .expect("input message should parse");
        match parsed {
            ParsedClientMessage::Input { input } => {
                assert!(input.left);
                assert!(!input.right);
                assert!(!input.up);
                assert!(!input.down);
            }
            _ => panic!("expected input message"),
        }
    }

    #[test]
    fn parse_input_rejects_non_boolean_keys() {
        let parsed = parse_client_message(r#"{"type":"input","left":"yes"}"#);
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_paint_message() {
        let parsed = parse_client_message(r#"{"type":"paint","row":3,"col":7,"value":2}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Paint {
                row: 3,
                col: 7,
                value: 2
            })
        );
    }

    #[test]
    fn parse_paint_rejects_out_of_range_cells_and_values() {
        assert!(parse_client_message(r#"{"type":"paint","row":21,"col":0,"value":2}"#).is_none());
        assert!(parse_client_message(r#"{"type":"paint","row":0,"col":19,"value":2}"#).is_none());
        assert!(parse_client_message(r#"{"type":"paint","row":0,"col":0,"value":19}"#).is_none());
        assert!(parse_client_message(r#"{"type":"paint","row":-1,"col":0,"value":2}"#).is_none());
    }

    #[test]
    fn parse_bare_commands() {
        assert_eq!(
            parse_client_message(r#"{"type":"run"}"#),
            Some(ParsedClientMessage::Run)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"edit"}"#),
            Some(ParsedClientMessage::Edit)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"clear"}"#),
            Some(ParsedClientMessage::ClearLevel)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"share"}"#),
            Some(ParsedClientMessage::Share)
        );
    }

    #[test]
    fn parse_load_level_requires_a_code() {
        let parsed = parse_client_message(r#"{"type":"load_level","code":"0.0L0.0LM"}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::LoadLevel {
                code: "0.0L0.0LM".to_string()
            })
        );
        assert!(parse_client_message(r#"{"type":"load_level"}"#).is_none());
    }

    #[test]
    fn parse_set_level_bounds_the_difficulty() {
        assert_eq!(
            parse_client_message(r#"{"type":"set_level","level":9}"#),
            Some(ParsedClientMessage::SetLevel { level: 9 })
        );
        assert!(parse_client_message(r#"{"type":"set_level","level":10}"#).is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        assert!(matches!(
            parse_client_message(r#"{"type":"ping","t":12.5}"#),
            Some(ParsedClientMessage::Ping { .. })
        ));
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_client_message(r#"{"type":"reboot"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }
}
