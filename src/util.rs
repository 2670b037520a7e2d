//! Small XML helpers shared by the package parser and the XHTML builder.

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve an entity reference (the part between `&` and `;`).
///
/// Covers the XML built-ins, numeric references and the HTML entities that
/// show up in hand-made XHTML without a DTD.
pub(crate) fn resolve_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "apos" => "'",
        "quot" => "\"",
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "nbsp" => "\u{a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "shy" => "\u{ad}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "hellip" => "\u{2026}",
        "middot" => "\u{b7}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        _ => "",
    };
    if !named.is_empty() {
        return Some(named.to_string());
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}
