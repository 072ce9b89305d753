//! Character escaping for attribute values and text content

use std::borrow::Cow;

/// Returns the entity for one of the five markup-significant bytes.
#[inline]
fn entity(byte: u8) -> Option<&'static str> {
    match byte {
        b'"' => Some("&quot;"),
        b'&' => Some("&amp;"),
        b'\'' => Some("&apos;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        _ => None,
    }
}

/// Control codes that are not allowed in XML 1.0 character data.
///
/// Tab (0x09), line feed (0x0A) and carriage return (0x0D) are kept.
#[inline]
fn is_stripped(byte: u8) -> bool {
    byte == 0x7F || byte <= 0x08 || ((0x0B..=0x1F).contains(&byte) && byte != 0x0D)
}

#[inline]
fn needs_escape(byte: u8) -> bool {
    is_stripped(byte) || entity(byte).is_some()
}

/// Escape text for use inside an attribute value or element content.
///
/// Returns the input borrowed when nothing needs to change. Otherwise stray
/// control codes are dropped and `"`, `&`, `'`, `<`, `>` are replaced by
/// their named entities.
///
/// # Examples
///
/// ```
/// use xmlstream::escape::encode;
///
/// assert_eq!(encode("plain"), "plain");
/// assert_eq!(encode("a < b & c"), "a &lt; b &amp; c");
/// assert_eq!(encode("bell\u{7}"), "bell");
/// ```
pub fn encode(text: &str) -> Cow<'_, str> {
    // Every byte we care about is ASCII, so a byte scan never lands inside
    // a multi-byte character.
    let Some(start) = text.bytes().position(needs_escape) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len() + 16);
    out.push_str(&text[..start]);

    let mut run = start;
    for (i, byte) in text.bytes().enumerate().skip(start) {
        if !needs_escape(byte) {
            continue;
        }
        out.push_str(&text[run..i]);
        if let Some(esc) = entity(byte) {
            out.push_str(esc);
        }
        run = i + 1;
    }
    out.push_str(&text[run..]);

    Cow::Owned(out)
}

/// Replace the five named entities with their characters.
///
/// Any other `&name;` sequence is left as it is. This is not an exact inverse
/// of [`encode`], which drops control codes.
///
/// # Examples
///
/// ```
/// use xmlstream::escape::decode;
///
/// assert_eq!(decode("&lt;b&gt;"), "<b>");
/// assert_eq!(decode("&nbsp;"), "&nbsp;");
/// ```
pub fn decode(text: &str) -> Cow<'_, str> {
    let Some(first) = text.find('&') else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..first]);
    let mut rest = &text[first..];

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let name_len = tail.bytes().take_while(u8::is_ascii_lowercase).count();

        if tail.as_bytes().get(name_len) == Some(&b';') {
            let literal = match &tail[..name_len] {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "apos" => Some('\''),
                "quot" => Some('"'),
                _ => None,
            };
            match literal {
                Some(c) => out.push(c),
                None => out.push_str(&rest[amp..amp + name_len + 2]),
            }
            rest = &tail[name_len + 1..];
        } else {
            out.push('&');
            rest = tail;
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}
