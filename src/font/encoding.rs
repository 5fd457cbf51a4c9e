//! Built-in single-byte encodings and the glyph-name table.
//!
//! Four 256-entry byte-to-character tables cover the encodings named by
//! font dictionaries (Standard, MacRoman, WinAnsi) plus PDFDocEncoding
//! for text strings. Unmapped positions hold U+FFFD so decoding never
//! fails. `Differences` arrays override positions through the glyph-name
//! table, with `uniXXXX`/`uXXXX` name forms as a fallback.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Sentinel for codes with no character mapping.
pub const NO_RUNE: char = '\u{FFFD}';

/// One entry of a `Differences` array.
#[derive(Debug, Clone)]
pub enum DiffEntry {
    /// A code position; subsequent names assign consecutively from here.
    Code(u8),
    /// A glyph name to place at the current position.
    Name(String),
}

fn base_table() -> [char; 256] {
    let mut t = [NO_RUNE; 256];
    for (b, slot) in t.iter_mut().enumerate().take(0x7F).skip(0x20) {
        *slot = b as u8 as char;
    }
    t
}

fn latin1_high(t: &mut [char; 256]) {
    for b in 0xA0..=0xFF_usize {
        t[b] = char::from_u32(b as u32).unwrap();
    }
}

/// WinAnsiEncoding: CP1252.
pub static WIN_ANSI: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut t = base_table();
    latin1_high(&mut t);
    let specials: &[(u8, char)] = &[
        (0x80, '\u{20AC}'), // Euro
        (0x82, '\u{201A}'),
        (0x83, '\u{0192}'),
        (0x84, '\u{201E}'),
        (0x85, '\u{2026}'),
        (0x86, '\u{2020}'),
        (0x87, '\u{2021}'),
        (0x88, '\u{02C6}'),
        (0x89, '\u{2030}'),
        (0x8A, '\u{0160}'),
        (0x8B, '\u{2039}'),
        (0x8C, '\u{0152}'),
        (0x8E, '\u{017D}'),
        (0x91, '\u{2018}'),
        (0x92, '\u{2019}'),
        (0x93, '\u{201C}'),
        (0x94, '\u{201D}'),
        (0x95, '\u{2022}'),
        (0x96, '\u{2013}'),
        (0x97, '\u{2014}'),
        (0x98, '\u{02DC}'),
        (0x99, '\u{2122}'),
        (0x9A, '\u{0161}'),
        (0x9B, '\u{203A}'),
        (0x9C, '\u{0153}'),
        (0x9E, '\u{017E}'),
        (0x9F, '\u{0178}'),
    ];
    for &(b, c) in specials {
        t[b as usize] = c;
    }
    t
});

/// MacRomanEncoding.
pub static MAC_ROMAN: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut t = base_table();
    const HIGH: &str = "ÄÅÇÉÑÖÜáàâäãåçéèêëíìîïñóòôöõúùûü\
†°¢£§•¶ß®©™´¨≠ÆØ∞±≤≥¥µ∂∑∏π∫ªºΩæø\
¿¡¬√ƒ≈∆«»…\u{00A0}ÀÃÕŒœ–—“”‘’÷◊ÿŸ⁄€‹›ﬁﬂ\
‡·‚„‰ÂÊÁËÈÍÎÏÌÓÔ\u{FFFD}ÒÚÛÙıˆ˜¯˘˙˚¸˝˛ˇ";
    for (i, c) in HIGH.chars().enumerate() {
        t[0x80 + i] = c;
    }
    t
});

/// StandardEncoding (Adobe). Also the default base for `Differences`.
pub static STANDARD: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut t = base_table();
    t[0x27] = '\u{2019}'; // quoteright
    t[0x60] = '\u{2018}'; // quoteleft
    let specials: &[(u8, char)] = &[
        (0xA1, '¡'),
        (0xA2, '¢'),
        (0xA3, '£'),
        (0xA4, '\u{2044}'),
        (0xA5, '¥'),
        (0xA6, '\u{0192}'),
        (0xA7, '§'),
        (0xA8, '¤'),
        (0xA9, '\''),
        (0xAA, '\u{201C}'),
        (0xAB, '«'),
        (0xAC, '\u{2039}'),
        (0xAD, '\u{203A}'),
        (0xAE, '\u{FB01}'),
        (0xAF, '\u{FB02}'),
        (0xB1, '\u{2013}'),
        (0xB2, '\u{2020}'),
        (0xB3, '\u{2021}'),
        (0xB4, '\u{00B7}'),
        (0xB6, '¶'),
        (0xB7, '\u{2022}'),
        (0xB8, '\u{201A}'),
        (0xB9, '\u{201E}'),
        (0xBA, '\u{201D}'),
        (0xBB, '»'),
        (0xBC, '\u{2026}'),
        (0xBD, '\u{2030}'),
        (0xBF, '¿'),
        (0xC1, '`'),
        (0xC2, '\u{00B4}'),
        (0xC3, '\u{02C6}'),
        (0xC4, '\u{02DC}'),
        (0xC5, '\u{00AF}'),
        (0xC6, '\u{02D8}'),
        (0xC7, '\u{02D9}'),
        (0xC8, '\u{00A8}'),
        (0xCA, '\u{02DA}'),
        (0xCB, '\u{00B8}'),
        (0xCD, '\u{02DD}'),
        (0xCE, '\u{02DB}'),
        (0xCF, '\u{02C7}'),
        (0xD0, '\u{2014}'),
        (0xE1, 'Æ'),
        (0xE3, 'ª'),
        (0xE8, 'Ł'),
        (0xE9, 'Ø'),
        (0xEA, 'Œ'),
        (0xEB, 'º'),
        (0xF1, 'æ'),
        (0xF5, '\u{0131}'),
        (0xF8, 'ł'),
        (0xF9, 'ø'),
        (0xFA, 'œ'),
        (0xFB, 'ß'),
    ];
    for &(b, c) in specials {
        t[b as usize] = c;
    }
    t
});

/// PDFDocEncoding, used for text strings without the UTF-16 BOM.
pub static PDF_DOC: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut t = base_table();
    latin1_high(&mut t);
    // Whitespace controls are part of the encoding.
    t[0x09] = '\t';
    t[0x0A] = '\n';
    t[0x0D] = '\r';
    let specials: &[(u8, char)] = &[
        (0x18, '\u{02D8}'),
        (0x19, '\u{02C7}'),
        (0x1A, '\u{02C6}'),
        (0x1B, '\u{02D9}'),
        (0x1C, '\u{02DD}'),
        (0x1D, '\u{02DB}'),
        (0x1E, '\u{02DA}'),
        (0x1F, '\u{02DC}'),
        (0x80, '\u{2022}'),
        (0x81, '\u{2020}'),
        (0x82, '\u{2021}'),
        (0x83, '\u{2026}'),
        (0x84, '\u{2014}'),
        (0x85, '\u{2013}'),
        (0x86, '\u{0192}'),
        (0x87, '\u{2044}'),
        (0x88, '\u{2039}'),
        (0x89, '\u{203A}'),
        (0x8A, '\u{2212}'),
        (0x8B, '\u{2030}'),
        (0x8C, '\u{201E}'),
        (0x8D, '\u{201C}'),
        (0x8E, '\u{201D}'),
        (0x8F, '\u{2018}'),
        (0x90, '\u{2019}'),
        (0x91, '\u{201A}'),
        (0x92, '\u{2122}'),
        (0x93, '\u{FB01}'),
        (0x94, '\u{FB02}'),
        (0x95, '\u{0141}'),
        (0x96, '\u{0152}'),
        (0x97, '\u{0160}'),
        (0x98, '\u{0178}'),
        (0x99, '\u{017D}'),
        (0x9A, '\u{0131}'),
        (0x9B, '\u{0142}'),
        (0x9C, '\u{0153}'),
        (0x9D, '\u{0161}'),
        (0x9E, '\u{017E}'),
        (0xA0, '\u{20AC}'),
    ];
    for &(b, c) in specials {
        t[b as usize] = c;
    }
    t[0xAD] = NO_RUNE;
    t
});

/// Non-letter glyph names used by `Differences` arrays. Letters and
/// digits are added programmatically when the map is built.
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("period", '.'),
    ("slash", '/'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("asciicircum", '^'),
    ("underscore", '_'),
    ("grave", '`'),
    ("braceleft", '{'),
    ("bar", '|'),
    ("braceright", '}'),
    ("asciitilde", '~'),
    ("quoteleft", '\u{2018}'),
    ("quoteright", '\u{2019}'),
    ("quotedblleft", '\u{201C}'),
    ("quotedblright", '\u{201D}'),
    ("quotesinglbase", '\u{201A}'),
    ("quotedblbase", '\u{201E}'),
    ("endash", '\u{2013}'),
    ("emdash", '\u{2014}'),
    ("bullet", '\u{2022}'),
    ("ellipsis", '\u{2026}'),
    ("dagger", '\u{2020}'),
    ("daggerdbl", '\u{2021}'),
    ("perthousand", '\u{2030}'),
    ("guilsinglleft", '\u{2039}'),
    ("guilsinglright", '\u{203A}'),
    ("guillemotleft", '«'),
    ("guillemotright", '»'),
    ("fraction", '\u{2044}'),
    ("minus", '\u{2212}'),
    ("trademark", '\u{2122}'),
    ("florin", '\u{0192}'),
    ("fi", '\u{FB01}'),
    ("fl", '\u{FB02}'),
    ("Euro", '\u{20AC}'),
    ("cent", '¢'),
    ("sterling", '£'),
    ("currency", '¤'),
    ("yen", '¥'),
    ("brokenbar", '¦'),
    ("section", '§'),
    ("dieresis", '¨'),
    ("copyright", '©'),
    ("ordfeminine", 'ª'),
    ("logicalnot", '¬'),
    ("registered", '®'),
    ("macron", '¯'),
    ("degree", '°'),
    ("plusminus", '±'),
    ("acute", '´'),
    ("mu", 'µ'),
    ("paragraph", '¶'),
    ("periodcentered", '·'),
    ("cedilla", '¸'),
    ("ordmasculine", 'º'),
    ("onequarter", '¼'),
    ("onehalf", '½'),
    ("threequarters", '¾'),
    ("exclamdown", '¡'),
    ("questiondown", '¿'),
    ("multiply", '×'),
    ("divide", '÷'),
    ("breve", '\u{02D8}'),
    ("caron", '\u{02C7}'),
    ("circumflex", '\u{02C6}'),
    ("dotaccent", '\u{02D9}'),
    ("hungarumlaut", '\u{02DD}'),
    ("ogonek", '\u{02DB}'),
    ("ring", '\u{02DA}'),
    ("tilde", '\u{02DC}'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("AE", 'Æ'),
    ("ae", 'æ'),
    ("OE", '\u{0152}'),
    ("oe", '\u{0153}'),
    ("Oslash", 'Ø'),
    ("oslash", 'ø'),
    ("Lslash", '\u{0141}'),
    ("lslash", '\u{0142}'),
    ("Thorn", 'Þ'),
    ("thorn", 'þ'),
    ("Eth", 'Ð'),
    ("eth", 'ð'),
    ("germandbls", 'ß'),
    ("dotlessi", '\u{0131}'),
    ("Scaron", '\u{0160}'),
    ("scaron", '\u{0161}'),
    ("Zcaron", '\u{017D}'),
    ("zcaron", '\u{017E}'),
    ("Ydieresis", '\u{0178}'),
    ("Aacute", 'Á'),
    ("Agrave", 'À'),
    ("Acircumflex", 'Â'),
    ("Adieresis", 'Ä'),
    ("Atilde", 'Ã'),
    ("Aring", 'Å'),
    ("Ccedilla", 'Ç'),
    ("Eacute", 'É'),
    ("Egrave", 'È'),
    ("Ecircumflex", 'Ê'),
    ("Edieresis", 'Ë'),
    ("Iacute", 'Í'),
    ("Igrave", 'Ì'),
    ("Icircumflex", 'Î'),
    ("Idieresis", 'Ï'),
    ("Ntilde", 'Ñ'),
    ("Oacute", 'Ó'),
    ("Ograve", 'Ò'),
    ("Ocircumflex", 'Ô'),
    ("Odieresis", 'Ö'),
    ("Otilde", 'Õ'),
    ("Uacute", 'Ú'),
    ("Ugrave", 'Ù'),
    ("Ucircumflex", 'Û'),
    ("Udieresis", 'Ü'),
    ("Yacute", 'Ý'),
    ("aacute", 'á'),
    ("agrave", 'à'),
    ("acircumflex", 'â'),
    ("adieresis", 'ä'),
    ("atilde", 'ã'),
    ("aring", 'å'),
    ("ccedilla", 'ç'),
    ("eacute", 'é'),
    ("egrave", 'è'),
    ("ecircumflex", 'ê'),
    ("edieresis", 'ë'),
    ("iacute", 'í'),
    ("igrave", 'ì'),
    ("icircumflex", 'î'),
    ("idieresis", 'ï'),
    ("ntilde", 'ñ'),
    ("oacute", 'ó'),
    ("ograve", 'ò'),
    ("ocircumflex", 'ô'),
    ("odieresis", 'ö'),
    ("otilde", 'õ'),
    ("uacute", 'ú'),
    ("ugrave", 'ù'),
    ("ucircumflex", 'û'),
    ("udieresis", 'ü'),
    ("yacute", 'ý'),
    ("ydieresis", 'ÿ'),
];

static GLYPH_TO_CHAR: LazyLock<HashMap<String, char>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(GLYPH_NAMES.len() + 52);
    for &(name, c) in GLYPH_NAMES {
        map.insert(name.to_string(), c);
    }
    // Single letters name themselves.
    for c in ('A'..='Z').chain('a'..='z') {
        map.insert(c.to_string(), c);
    }
    map
});

/// Resolves a glyph name to its character sequence.
///
/// Handles suffix stripping (`a.sc` -> `a`), composite names joined by
/// underscores, the `uniXXXX` (UTF-16 units) and `uXXXXXX` (code point)
/// forms, and finally the glyph-name table.
pub fn name_to_unicode(name: &str) -> Option<String> {
    let name = name.split('.').next().unwrap_or(name);
    if name.is_empty() || name == "notdef" {
        return None;
    }
    let mut out = String::new();
    for part in name.split('_') {
        out.push_str(&decode_component(part)?);
    }
    Some(out)
}

fn decode_component(name: &str) -> Option<String> {
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.len() % 4 == 0 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            let mut units = Vec::with_capacity(hex.len() / 4);
            for chunk in hex.as_bytes().chunks(4) {
                let s = std::str::from_utf8(chunk).ok()?;
                units.push(u16::from_str_radix(s, 16).ok()?);
            }
            return char::decode_utf16(units.into_iter())
                .collect::<std::result::Result<String, _>>()
                .ok();
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            let cp = u32::from_str_radix(hex, 16).ok()?;
            return char::from_u32(cp).map(|c| c.to_string());
        }
    }
    GLYPH_TO_CHAR.get(name).map(|c| c.to_string())
}

/// The table for a named base encoding; unknown names get Standard.
pub fn base_encoding(name: &str) -> &'static [char; 256] {
    match name {
        "WinAnsiEncoding" => &WIN_ANSI,
        "MacRomanEncoding" => &MAC_ROMAN,
        "PDFDocEncoding" => &PDF_DOC,
        _ => &STANDARD,
    }
}

/// Builds a byte table from a base encoding plus Differences overrides.
///
/// Each name consumes the current code position and advances it; names
/// without a preceding code are ignored.
pub fn encoding_with_differences(base: &str, differences: &[DiffEntry]) -> [char; 256] {
    let mut table = *base_encoding(base);
    let mut code: Option<u8> = None;
    for entry in differences {
        match entry {
            DiffEntry::Code(c) => code = Some(*c),
            DiffEntry::Name(name) => {
                if let Some(c) = code {
                    if let Some(s) = name_to_unicode(name) {
                        // Byte tables hold single characters; composite
                        // names keep their first.
                        if let Some(first) = s.chars().next() {
                            table[c as usize] = first;
                        }
                    }
                    code = c.checked_add(1);
                }
            }
        }
    }
    table
}

/// Decodes PDFDocEncoding, or None when any byte is outside the
/// encoding (the caller then passes bytes through unchanged).
pub fn pdf_doc_decode(bytes: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        let c = PDF_DOC[b as usize];
        if c == NO_RUNE {
            return None;
        }
        out.push(c);
    }
    Some(out)
}
