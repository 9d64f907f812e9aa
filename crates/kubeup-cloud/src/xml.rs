//! Minimal helpers for picking fields out of AWS EC2/IAM query-API XML
//! responses.
//!
//! The EC2 query API's response shapes are shallow and repetitive enough
//! that a full typed deserializer per action isn't worth it; these walk the
//! parsed tree looking for a tag name.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Returns the text content of the first element named `tag`.
pub fn xml_text(body: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut capturing = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                capturing = true;
            }
            Ok(Event::Text(t)) if capturing => {
                return t.unescape().ok().map(|s| s.into_owned());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                capturing = false;
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Returns the text content of every element named `tag`, in document order.
pub fn xml_all_texts(body: &str, tag: &str) -> Vec<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    let mut capturing = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                capturing = true;
            }
            Ok(Event::Text(t)) if capturing => {
                if let Ok(s) = t.unescape() {
                    out.push(s.into_owned());
                }
                capturing = false;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == tag.as_bytes() => {
                capturing = false;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// Pulls `<Errors><Error><Code>...</Code><Message>...</Message>` out of an
/// EC2/IAM error response body.
pub fn xml_error_code(body: &str) -> Option<String> {
    xml_text(body, "Code")
}

pub fn xml_error_message(body: &str) -> Option<String> {
    xml_text(body, "Message")
}

/// Walks repeated sibling blocks under a given item tag (e.g. every
/// `<item>` inside a `<subnetSet>`), returning the raw inner XML of each so
/// callers can run `xml_text` against each fragment for its own fields.
pub fn xml_items(body: &str, item_tag: &str) -> Vec<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == item_tag.as_bytes() && depth == 0 => {
                depth = 1;
                current.clear();
            }
            Ok(Event::Start(e)) if depth > 0 => {
                depth += 1;
                current.push('<');
                current.push_str(std::str::from_utf8(e.name().as_ref()).unwrap_or(""));
                current.push('>');
            }
            Ok(Event::Text(t)) if depth > 0 => {
                if let Ok(s) = t.unescape() {
                    current.push_str(&s);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == item_tag.as_bytes() && depth == 1 => {
                depth = 0;
                out.push(std::mem::take(&mut current));
            }
            Ok(Event::End(e)) if depth > 0 => {
                depth -= 1;
                current.push_str("</");
                current.push_str(std::str::from_utf8(e.name().as_ref()).unwrap_or(""));
                current.push('>');
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_text_field() {
        let body = "<DescribeVpcsResponse><vpcSet><item><vpcId>vpc-123</vpcId></item></vpcSet></DescribeVpcsResponse>";
        assert_eq!(xml_text(body, "vpcId").as_deref(), Some("vpc-123"));
    }

    #[test]
    fn extracts_error_code_and_message() {
        let body = "<Response><Errors><Error><Code>InvalidVpcID.NotFound</Code><Message>no such vpc</Message></Error></Errors></Response>";
        assert_eq!(xml_error_code(body).as_deref(), Some("InvalidVpcID.NotFound"));
        assert_eq!(xml_error_message(body).as_deref(), Some("no such vpc"));
    }

    #[test]
    fn collects_repeated_items() {
        let body = "<r><set><item><id>a</id></item><item><id>b</id></item></set></r>";
        let items = xml_items(body, "item");
        assert_eq!(items.len(), 2);
        assert_eq!(xml_text(&items[0], "id").as_deref(), Some("a"));
        assert_eq!(xml_text(&items[1], "id").as_deref(), Some("b"));
    }
}
