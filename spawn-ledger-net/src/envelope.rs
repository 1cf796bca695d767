//! XML envelopes for the remote protocol.
//!
//! The wire format is deliberately small: one `<request>` element with an
//! `op` attribute and optional `<resource>`/`<credentials>` children, one
//! `<response>` element with a numeric `status` attribute and zero or more
//! `<resource>`/`<match>` children. Decoding is tolerant: unknown elements
//! and attributes are skipped so the server can grow the format without
//! breaking deployed clients.

use std::io::Cursor;

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use spawn_ledger_core::{Galaxy, ResourceStats, StatVector};
use spawn_ledger_registry::ResourceDraft;

use crate::credentials::Credentials;
use crate::error::NetError;
use crate::status::ProtocolStatus;

/// Timestamp format the server uses everywhere: `2021-03-01 10:00:00 UTC`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

impl From<quick_xml::Error> for NetError {
    fn from(e: quick_xml::Error) -> Self {
        NetError::Envelope(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for NetError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        NetError::Envelope(e.to_string())
    }
}

/// A decoded `<response>` envelope.
#[derive(Debug, Default)]
pub struct Envelope {
    pub status: ProtocolStatus,
    /// Full resource records (`find_by_id`, `find_by_name` answers).
    pub resources: Vec<ResourceDraft>,
    /// Lightweight (name, class token) tuples (`find_by_prefix` answers).
    pub matches: Vec<(String, String)>,
}

/// Encode a `<request>` envelope.
pub fn encode_request(
    op: &str,
    resource: Option<&ResourceDraft>,
    auth: Option<&Credentials>,
    extra: &[(&str, String)],
) -> Result<String, NetError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let mut request = BytesStart::new("request");
    request.push_attribute(("op", op));
    for (key, value) in extra {
        request.push_attribute((*key, value.as_str()));
    }
    writer.write_event(Event::Start(request))?;

    if let Some(draft) = resource {
        let mut elem = BytesStart::new("resource");
        elem.push_attribute(("id", draft.remote_id.to_string().as_str()));
        elem.push_attribute(("name", draft.name.as_str()));
        elem.push_attribute(("class", draft.class_token.as_str()));
        elem.push_attribute(("galaxy", draft.galaxy.id().to_string().as_str()));
        elem.push_attribute(("depleted", if draft.depleted { "1" } else { "0" }));
        elem.push_attribute(("stats", draft.stats.format(false).as_str()));
        writer.write_event(Event::Empty(elem))?;
    }

    if let Some(creds) = auth {
        let mut elem = BytesStart::new("credentials");
        elem.push_attribute(("user", creds.user_name.as_str()));
        elem.push_attribute(("password", creds.password.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }

    writer.write_event(Event::End(BytesStart::new("request").to_end()))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| NetError::envelope(e.to_string()))
}

/// Decode a `<response>` envelope.
pub fn decode_response(xml: &str) -> Result<Envelope, NetError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut envelope = Envelope::default();
    let mut saw_response = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"response" => {
                    saw_response = true;
                    for attr in e.attributes() {
                        let attr = attr?;
                        if attr.key.as_ref() == b"status" {
                            let code: i32 = String::from_utf8_lossy(&attr.value)
                                .parse()
                                .map_err(|_| NetError::envelope("non-numeric status"))?;
                            envelope.status = ProtocolStatus::from_code(code);
                        }
                    }
                }
                b"resource" => envelope.resources.push(parse_resource(e)?),
                b"match" => {
                    let mut name = String::new();
                    let mut class = String::new();
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.as_ref() {
                            b"name" => name = String::from_utf8_lossy(&attr.value).to_string(),
                            b"class" => class = String::from_utf8_lossy(&attr.value).to_string(),
                            _ => {}
                        }
                    }
                    envelope.matches.push((name, class));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_response {
        return Err(NetError::envelope("missing <response> element"));
    }
    Ok(envelope)
}

fn parse_resource(e: &BytesStart<'_>) -> Result<ResourceDraft, NetError> {
    let mut draft = ResourceDraft::default();
    for attr in e.attributes() {
        let attr = attr?;
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"id" => {
                draft.remote_id = value
                    .parse()
                    .map_err(|_| NetError::envelope(format!("bad resource id '{value}'")))?;
            }
            b"name" => draft.name = value,
            b"class" => draft.class_token = value,
            b"galaxy" => {
                let id: u32 = value
                    .parse()
                    .map_err(|_| NetError::envelope(format!("bad galaxy id '{value}'")))?;
                draft.galaxy = Galaxy(id);
            }
            b"depleted" => draft.depleted = value == "1",
            b"stats" => {
                let vector = StatVector::parse(&value, false)
                    .map_err(|e| NetError::envelope(format!("bad stats attribute: {e}")))?;
                draft.stats = ResourceStats::from_vector(vector);
            }
            _ => {}
        }
    }
    if draft.name.is_empty() {
        return Err(NetError::envelope("resource element without a name"));
    }
    Ok(draft)
}

/// Decode the status endpoint's body: `<status last_updated="…"/>`.
pub fn decode_server_status(xml: &str) -> Result<DateTime<Utc>, NetError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if e.name().as_ref() == b"status" {
                    for attr in e.attributes() {
                        let attr = attr?;
                        if attr.key.as_ref() == b"last_updated" {
                            let raw = String::from_utf8_lossy(&attr.value).to_string();
                            return parse_timestamp(&raw);
                        }
                    }
                    return Err(NetError::envelope("status element without last_updated"));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Err(NetError::envelope("missing <status> element"))
}

/// Parse the server's timestamp format into UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NetError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| NetError::envelope(format!("bad timestamp '{raw}': {e}")))
}

/// Format a UTC instant in the server's timestamp format.
pub fn format_timestamp(when: DateTime<Utc>) -> String {
    when.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spawn_ledger_core::Stat;

    #[test]
    fn request_envelope_carries_resource_and_auth() {
        let mut draft = ResourceDraft::new("Hansolo", Galaxy(7), "copper_desh");
        draft.stats.set(Stat::Oq, 500).unwrap();
        let creds = Credentials {
            user_name: "chani".into(),
            password: "sietch".into(),
        };
        let xml = encode_request("submit_new", Some(&draft), Some(&creds), &[]).unwrap();
        assert!(xml.starts_with("<request op=\"submit_new\">"));
        assert!(xml.contains("name=\"Hansolo\""));
        assert!(xml.contains("class=\"copper_desh\""));
        assert!(xml.contains("user=\"chani\""));
        assert!(xml.ends_with("</request>"));
    }

    #[test]
    fn response_round_trips_a_resource() {
        let xml = r#"<response status="1">
            <resource id="42" name="Hansolo" class="copper_desh" galaxy="7"
                      depleted="0" stats="0 0 0 0 0 0 0 500 0 0 0"/>
        </response>"#;
        let envelope = decode_response(xml).unwrap();
        assert_eq!(envelope.status, ProtocolStatus::Success);
        assert_eq!(envelope.resources.len(), 1);
        let draft = &envelope.resources[0];
        assert_eq!(draft.remote_id, 42);
        assert_eq!(draft.galaxy, Galaxy(7));
        assert_eq!(draft.stats.get(Stat::Oq), 500);
    }

    #[test]
    fn response_collects_prefix_matches() {
        let xml = r#"<response status="1">
            <match name="Ironn" class="copper_polysteel"/>
            <match name="Irona" class="copper_desh"/>
        </response>"#;
        let envelope = decode_response(xml).unwrap();
        assert_eq!(
            envelope.matches,
            vec![
                ("Ironn".to_string(), "copper_polysteel".to_string()),
                ("Irona".to_string(), "copper_desh".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<response status="2"><quota used="3"/><hint>ignored</hint></response>"#;
        let envelope = decode_response(xml).unwrap();
        assert_eq!(envelope.status, ProtocolStatus::AlreadyExists);
        assert!(envelope.resources.is_empty());
    }

    #[test]
    fn missing_response_element_is_an_error() {
        assert!(decode_response("<other/>").is_err());
    }

    #[test]
    fn server_status_parses_the_documented_format() {
        let xml = r#"<status last_updated="2021-03-01 10:00:00 UTC"/>"#;
        let when = decode_server_status(xml).unwrap();
        let expected = Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(when, expected);
    }

    #[test]
    fn timestamps_round_trip() {
        let when = Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(when)).unwrap(), when);
    }
}
