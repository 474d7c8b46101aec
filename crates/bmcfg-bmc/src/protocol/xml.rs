//! Minimal XML reading for controller responses

use quick_xml::events::Event;
use quick_xml::Reader;

/// Text of the first element whose local name is `local_name`
///
/// Namespace prefixes are ignored. Returns `Ok(None)` when the element is
/// absent and an error when the document is not well formed.
pub fn element_text(xml: &str, local_name: &str) -> std::result::Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                inside = true;
            }
            Event::Empty(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Event::Text(t) if inside => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                return Ok(Some(text.trim().to_string()));
            }
            Event::End(e) if inside && e.local_name().as_ref() == local_name.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
