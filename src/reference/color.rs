//! Route colour normalisation and contrasting text colour.

/// Default route background when none (or an invalid one) is given.
pub const DEFAULT_ROUTE_COLOR: &str = "#FFFFFF";

const BLACK: &str = "#000000";
const WHITE: &str = "#FFFFFF";

/// Luminance above which black text is used on a background.
const LUMINANCE_CUTOFF: f64 = 186.0;

/// Normalises a hex colour to `#RRGGBB`.
///
/// Accepts an optional leading `#` and surrounding whitespace; anything that
/// is not exactly six hex digits yields `None`.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let clean = raw.trim();
    let clean = clean.strip_prefix('#').unwrap_or(clean);
    if clean.len() == 6 && clean.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(format!("#{}", clean.to_ascii_uppercase()))
    } else {
        None
    }
}

/// Black or white text, whichever reads better on `background`.
///
/// Uses `0.299 R + 0.587 G + 0.114 B`; an unparseable background gets black.
pub fn contrasting_text_color(background: &str) -> &'static str {
    let Some(hex) = normalize_hex(background) else {
        return BLACK;
    };

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map(f64::from).unwrap_or(0.0)
    };
    let luminance = 0.299 * channel(1..3) + 0.587 * channel(3..5) + 0.114 * channel(5..7);

    if luminance > LUMINANCE_CUTOFF { BLACK } else { WHITE }
}
