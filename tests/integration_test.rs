//! Integration tests for xmlstream

use std::sync::{Arc, Mutex};
use xmlstream::encoder::{ChunkEncoder, Completion};
use xmlstream::stream::Fragment;
use xmlstream::xform::{IntegerXform, StringXform, XmlEventSource};
use xmlstream::{
    Attributes, BooleanXform, ClosePolicy, EncoderMode, StreamConfig, TransformNode, Value,
    XformRegistry, XmlError, XmlStream,
};

fn write_rows(xml: &mut XmlStream, rows: usize) {
    xml.open_xml(Some(&XmlStream::std_doc_attributes()));
    xml.open_node("worksheet", None);
    xml.open_node("sheetData", None);
    for r in 1..=rows {
        xml.open_node("row", Some(&Attributes::new().with("r", r as i64)));
        for (c, col) in ["A", "B", "C"].iter().enumerate() {
            let cell_ref = format!("{}{}", col, r);
            xml.open_node("c", Some(&Attributes::new().with("r", cell_ref).with("t", "n")));
            xml.leaf_node("v", None, Some(&(r * 10 + c).to_string()));
            xml.close_node();
        }
        xml.close_node();
    }
}

#[test]
fn test_nested_document() {
    let mut xml = XmlStream::new();
    xml.open_node("a", None);
    xml.add_attribute("x", 1).unwrap();
    xml.open_node("b", None);
    xml.write_text("hi");
    xml.close_node();
    xml.close_node();
    assert_eq!(xml.into_xml().unwrap(), r#"<a x="1"><b>hi</b></a>"#);
}

#[test]
fn test_attributes_only_element_self_closes() {
    let mut xml = XmlStream::new();
    xml.open_node("a", Some(&Attributes::new().with("x", 1)));
    assert_eq!(xml.into_xml().unwrap(), r#"<a x="1"/>"#);
}

#[test]
fn test_declaration_and_unclosed_elements() {
    let mut xml = XmlStream::new();
    xml.open_xml(Some(&XmlStream::std_doc_attributes()));
    xml.open_node("worksheet", None);
    xml.open_node("sheetData", None);
    xml.write_text("");
    assert_eq!(
        xml.into_xml().unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet><sheetData></sheetData></worksheet>"
    );
}

#[test]
fn test_text_and_attributes_are_escaped() {
    let mut xml = XmlStream::new();
    xml.open_node("t", Some(&Attributes::new().with("q", "say \"hi\" & 'bye'")));
    xml.write_text("1 < 2 > 0\u{1}\u{7f}\r\n");
    assert_eq!(
        xml.into_xml().unwrap(),
        "<t q=\"say &quot;hi&quot; &amp; &apos;bye&apos;\">1 &lt; 2 &gt; 0\r\n</t>"
    );
}

#[test]
fn test_attribute_after_content_is_rejected() {
    let mut xml = XmlStream::new();
    xml.open_node("a", None);
    xml.write_text("x");
    let err = xml.add_attribute("late", "1").unwrap_err();
    assert!(matches!(err, XmlError::InvalidState(_)));
    assert_eq!(xml.into_xml().unwrap(), "<a>x</a>");
}

#[test]
fn test_output_does_not_depend_on_chunk_size() {
    let mut reference = XmlStream::new();
    write_rows(&mut reference, 20);
    let expected = reference.into_xml().unwrap();

    for chunk_size in [1, 2, 7, 64] {
        let mut xml = XmlStream::detached(chunk_size);
        write_rows(&mut xml, 20);
        assert_eq!(xml.into_xml().unwrap(), expected, "chunk size {}", chunk_size);
    }
}

#[test]
fn test_rollback_across_chunks() {
    let mut xml = XmlStream::detached(2);
    xml.open_node("sheetData", None);
    xml.leaf_node("row", Some(&Attributes::new().with("r", 1)), None);

    let cursor = xml.add_rollback();
    xml.open_node("row", Some(&Attributes::new().with("r", 2)));
    for i in 0..10 {
        xml.leaf_node("c", None, Some(&i.to_string()));
    }
    assert!(xml.cursor() > cursor);
    xml.rollback().unwrap();

    assert_eq!(xml.cursor(), cursor);
    assert_eq!(xml.tos(), Some("sheetData"));
    xml.leaf_node("row", Some(&Attributes::new().with("r", 3)), None);
    assert_eq!(
        xml.into_xml().unwrap(),
        r#"<sheetData><row r="1"/><row r="3"/></sheetData>"#
    );
}

#[test]
fn test_nested_rollback_scopes() {
    let mut xml = XmlStream::detached(3);
    xml.open_node("root", None);

    xml.add_rollback();
    xml.leaf_node("kept", None, None);

    xml.add_rollback();
    xml.leaf_node("dropped", None, Some("x"));
    xml.rollback().unwrap();

    xml.add_rollback();
    xml.leaf_node("also", None, None);
    xml.commit().unwrap();

    xml.commit().unwrap();
    assert_eq!(xml.pending_rollbacks(), 0);
    assert_eq!(xml.into_xml().unwrap(), "<root><kept/><also/></root>");
}

#[test]
fn test_rollback_restores_closed_elements() {
    let mut xml = XmlStream::new();
    xml.open_node("a", None);
    xml.open_node("b", None);
    xml.add_rollback();
    xml.close_node();
    xml.close_node();
    assert_eq!(xml.depth(), 0);
    xml.rollback().unwrap();

    assert_eq!(xml.depth(), 2);
    xml.write_text("back");
    assert_eq!(xml.into_xml().unwrap(), "<a><b>back</b></a>");
}

#[test]
fn test_commit_and_rollback_need_a_mark() {
    let mut xml = XmlStream::new();
    assert!(matches!(xml.commit(), Err(XmlError::InvalidState(_))));
    assert!(matches!(xml.rollback(), Err(XmlError::InvalidState(_))));
}

#[test]
fn test_encoders_produce_the_text_bytes() {
    let mut reference = XmlStream::new();
    write_rows(&mut reference, 50);
    let expected = reference.into_xml().unwrap().into_bytes();

    for mode in [EncoderMode::Detached, EncoderMode::Inline, EncoderMode::Threaded] {
        for chunk_size in [1, 16, 10_000] {
            let config = StreamConfig::new()
                .with_chunk_size(chunk_size)
                .with_encoder(mode)
                .with_capacity(256, 1 << 20);
            let mut xml = XmlStream::with_config(&config).unwrap();
            write_rows(&mut xml, 50);
            let bytes = xml.finish_bytes().wait().unwrap();
            assert_eq!(bytes, expected, "{:?} with chunk size {}", mode, chunk_size);
        }
    }
}

#[test]
fn test_text_finalize_refused_with_encoder() {
    let config = StreamConfig::new().with_encoder(EncoderMode::Threaded);
    let mut xml = XmlStream::with_config(&config).unwrap();
    xml.leaf_node("a", None, None);
    assert!(matches!(xml.into_xml(), Err(XmlError::EncoderAttached)));
}

#[test]
fn test_threaded_capacity_exceeded_surfaces_at_finalize() {
    let config = StreamConfig::new()
        .with_chunk_size(1)
        .with_encoder(EncoderMode::Threaded)
        .with_capacity(16, 64);
    let mut xml = XmlStream::with_config(&config).unwrap();
    for _ in 0..20 {
        xml.leaf_node("item", None, Some("0123456789"));
    }
    let err = xml.finish_bytes().wait().unwrap_err();
    assert!(
        matches!(err, XmlError::CapacityExceeded { limit: 64, .. }),
        "{:?}",
        err
    );
}

#[derive(Clone, Default)]
struct Recorder {
    chunks: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ChunkEncoder for Recorder {
    fn append(&mut self, chunk: Vec<Fragment>) -> xmlstream::Result<()> {
        let chunk = chunk.into_iter().map(|f| f.into_owned()).collect();
        self.chunks.lock().unwrap().push(chunk);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Completion {
        let chunks = self.chunks.lock().unwrap();
        let text: String = chunks.iter().flatten().map(String::as_str).collect();
        Completion::ready(Ok(text.into_bytes()))
    }
}

#[test]
fn test_chunks_are_held_back_while_a_mark_is_pending() {
    let recorder = Recorder::default();
    let mut xml = XmlStream::with_encoder(2, Box::new(recorder.clone()));
    xml.open_node("root", None);
    let flushed = recorder.chunks.lock().unwrap().len();

    xml.add_rollback();
    for _ in 0..5 {
        xml.leaf_node("x", None, None);
    }
    assert_eq!(recorder.chunks.lock().unwrap().len(), flushed);
    xml.rollback().unwrap();

    for _ in 0..5 {
        xml.leaf_node("y", None, None);
    }
    assert!(recorder.chunks.lock().unwrap().len() > flushed);
    assert!(recorder.chunks.lock().unwrap().iter().all(|c| c.len() == 2));

    let bytes = xml.into_bytes().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        format!("<root>{}</root>", "<y/>".repeat(5))
    );
}

#[test]
fn test_pending_completion_resolves() {
    let config = StreamConfig::new()
        .with_chunk_size(4)
        .with_encoder(EncoderMode::Threaded)
        .with_capacity(64, 1 << 16);
    let mut xml = XmlStream::with_config(&config).unwrap();
    xml.leaf_node("done", None, None);

    let mut completion = xml.finish_bytes();
    let bytes = loop {
        match completion.try_wait() {
            Ok(result) => break result.unwrap(),
            Err(pending) => {
                completion = pending;
                std::thread::yield_now();
            }
        }
    };
    assert_eq!(bytes, b"<done/>");
}

fn font_registry(policy: ClosePolicy) -> XformRegistry {
    XformRegistry::new()
        .with(BooleanXform::new("b").with_close_policy(policy))
        .with(BooleanXform::new("i").with_close_policy(policy))
        .with(BooleanXform::new("u").with_attr("val").with_close_policy(policy))
        .with(IntegerXform::new("sz").with_attr("val").with_close_policy(policy))
        .with(StringXform::new("name").with_attr("val").with_close_policy(policy))
}

#[test]
fn test_boolean_render_scenarios() {
    let b = BooleanXform::new("b");

    let mut xml = XmlStream::new();
    b.render(&mut xml, &Value::Bool(true));
    assert_eq!(xml.into_xml().unwrap(), "<b/>");

    let mut xml = XmlStream::new();
    b.render(&mut xml, &Value::Bool(false));
    assert_eq!(xml.cursor(), 0);
    assert_eq!(xml.into_xml().unwrap(), "");
}

#[test]
fn test_registry_round_trip_under_both_close_policies() {
    let mut font = indexmap::IndexMap::new();
    font.insert("b".to_string(), Value::Bool(true));
    font.insert("i".to_string(), Value::Bool(false));
    font.insert("u".to_string(), Value::Bool(true));
    font.insert("sz".to_string(), Value::Int(11));
    font.insert("name".to_string(), Value::from("Calibri & Sons"));

    for policy in [ClosePolicy::DeferToParent, ClosePolicy::ReportClosed] {
        let registry = font_registry(policy);

        let mut xml = XmlStream::new();
        xml.open_node("fonts", Some(&Attributes::new().with("count", 1)));
        registry.render_children(&mut xml, "font", None, &font);
        let text = xml.into_xml().unwrap();
        assert_eq!(
            text,
            r#"<fonts count="1"><font><b/><u val="1"/><sz val="11"/><name val="Calibri &amp; Sons"/></font></fonts>"#
        );

        let mut events = XmlEventSource::new(&text);
        events.next();
        let parsed = registry.parse_children(&mut events).unwrap();
        assert_eq!(parsed.len(), 4, "{:?}", policy);
        assert_eq!(parsed["b"], Value::Bool(true));
        assert_eq!(parsed["u"], Value::Bool(true));
        assert_eq!(parsed["sz"], Value::Int(11));
        assert_eq!(parsed["name"], Value::from("Calibri & Sons"));
        assert!(events.next().is_some());
    }
}

#[test]
fn test_registry_parse_reports_malformed_input() {
    let registry = font_registry(ClosePolicy::DeferToParent);
    let err = registry
        .parse_children(XmlEventSource::new("<font><b></i></font>"))
        .unwrap_err();
    assert!(matches!(err, XmlError::Parse(_)));
}
