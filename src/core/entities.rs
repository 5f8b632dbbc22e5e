//! Entity decoding for character data and attribute values
//!
//! Only the five predefined entities and numeric character references are
//! expanded. Anything else is left in the text as written.

use memchr::memchr;
use std::borrow::Cow;

/// Decode entity references, borrowing when there are none
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match rest.find(';').and_then(|semi| Some((semi, decode_entity(&rest[1..semi])?))) {
            Some((semi, ch)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Strict decoding: a malformed or non-XML character reference is an error,
/// reported with its byte offset inside `input`
pub fn decode_text_strict(input: &str) -> Result<Cow<'_, str>, (usize, &'static str)> {
    if let Some(bad) = input.chars().position(|c| !is_valid_xml_char(c as u32)) {
        let offset = input.char_indices().nth(bad).map_or(0, |(i, _)| i);
        return Err((offset, "invalid XML character in content"));
    }
    let mut search = 0;
    while let Some(amp) = input[search..].find('&').map(|i| search + i) {
        let semi = input[amp..]
            .find(';')
            .map(|i| amp + i)
            .ok_or((amp, "unterminated entity reference"))?;
        let entity = &input[amp + 1..semi];
        if entity.starts_with('#') && decode_entity(entity).is_none() {
            return Err((amp, "invalid character reference"));
        }
        if !entity.starts_with('#') && decode_entity(entity).is_none() {
            return Err((amp, "undeclared entity"));
        }
        search = semi + 1;
    }
    Ok(decode_text(input))
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = entity.strip_prefix('#')?;
            let codepoint = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            if !is_valid_xml_char(codepoint) {
                return None;
            }
            char::from_u32(codepoint)
        }
    }
}

/// XML 1.0 Char production
/// Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
#[inline]
pub fn is_valid_xml_char(codepoint: u32) -> bool {
    matches!(codepoint,
        0x9 | 0xA | 0xD |
        0x20..=0xD7FF |
        0xE000..=0xFFFD |
        0x10000..=0x10FFFF
    )
}
