/// Name offered for "use whatever the system has active".
pub const AUTO_LAYOUT: &str = "Auto (Use System)";

/// Selectable keyboard layouts and their Windows KLIDs.
pub const KEYBOARD_LAYOUTS: &[(&str, &str)] = &[
    ("English (US)", "00000409"),
    ("US International", "00020409"),
    ("English (UK)", "00000809"),
    ("German (DE)", "00000407"),
    ("French (FR)", "0000040C"),
    ("Spanish (ES)", "0000040A"),
    ("Italian (IT)", "00000410"),
    ("Dutch (NL)", "00000413"),
    ("Portuguese (BR - ABNT2)", "00010416"),
    ("Portuguese (PT)", "00000816"),
    ("Danish (DA)", "00000406"),
    ("Swedish (SV)", "0000041D"),
    ("Finnish (FI)", "0000040B"),
    ("Norwegian (NO)", "00000414"),
    ("Swiss German (DE-CH)", "00000807"),
    ("Swiss French (FR-CH)", "0000100C"),
    ("Polish (Programmers)", "00000415"),
    ("Czech (CS)", "00000405"),
    ("Slovak (SK)", "0000041B"),
    ("Hungarian (HU)", "0000040E"),
    ("Turkish (Q)", "0000041F"),
    ("Russian (RU)", "00000419"),
    ("Ukrainian (UK)", "00000422"),
    ("Hebrew (HE)", "0000040D"),
    ("Arabic (AR)", "00000401"),
    ("Japanese (JP)", "00000411"),
    ("Korean (KO)", "00000412"),
];

pub fn is_auto_layout(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name == AUTO_LAYOUT || name.eq_ignore_ascii_case("auto")
}

/// KLID for a named layout. `None` means "use the current system layout",
/// which covers both "auto" and names that are not in the table.
pub fn klid_for(name: &str) -> Option<&'static str> {
    if is_auto_layout(name) {
        return None;
    }
    let name = name.trim();
    KEYBOARD_LAYOUTS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, klid)| *klid)
}

/// All names a user can pick, auto first.
pub fn layout_names() -> impl Iterator<Item = &'static str> {
    std::iter::once(AUTO_LAYOUT).chain(KEYBOARD_LAYOUTS.iter().map(|(n, _)| *n))
}

// German characters outside Latin-1 that German layouts put on a physical key.
const GERMAN_EXTRAS: &[char] = &[
    '€', '„', '“', '”', '‚', '‘', '’', '–', '—', '…', '•', '≠', '±',
];

/// Characters probed when building a keycode cache from a layout:
/// printable Latin-1 plus the German extras above.
pub fn key_cache_candidates() -> impl Iterator<Item = char> {
    (' '..='~')
        .chain('\u{A0}'..='\u{FF}')
        .chain(GERMAN_EXTRAS.iter().copied())
}
