//! Icon-font glyph lookup.
//!
//! Icons are referenced as `mdi:<name>`. Current configurations carry the
//! resolved codepoint next to the name; older ones only have the name, which
//! is looked up in the table below.

/// Prefix marking an icon-font reference.
pub const ICON_PREFIX: &str = "mdi:";

/// Glyph drawn when an icon reference cannot be resolved.
pub const MISSING_ICON: &str = "\u{25CF}";

/// Known icon names and their private-use-area codepoints, sorted by name.
const ICON_CODEPOINTS: &[(&str, u32)] = &[
    ("air-conditioner", 0xF001B),
    ("alarm", 0xF0020),
    ("alarm-bell", 0xF078E),
    ("alarm-light", 0xF078F),
    ("alarm-panel", 0xF15C4),
    ("alarm-panel-outline", 0xF15C5),
    ("alert", 0xF0026),
    ("alert-circle", 0xF0028),
    ("arrow-down", 0xF0045),
    ("arrow-left", 0xF004D),
    ("arrow-right", 0xF0054),
    ("arrow-up", 0xF005D),
    ("bed", 0xF02E3),
    ("bell", 0xF009A),
    ("bell-alert", 0xF0D59),
    ("bell-off", 0xF009B),
    ("bell-outline", 0xF009C),
    ("bell-ring", 0xF009E),
    ("bullhorn", 0xF00E6),
    ("bullhorn-outline", 0xF0B23),
    ("camera", 0xF0100),
    ("camera-iris", 0xF0104),
    ("camera-off", 0xF05DF),
    ("camera-wireless", 0xF0DB6),
    ("car", 0xF010B),
    ("cctv", 0xF07AE),
    ("cctv-off", 0xF185F),
    ("ceiling-light", 0xF0769),
    ("check", 0xF012C),
    ("check-circle", 0xF05E0),
    ("chevron-down", 0xF0140),
    ("chevron-up", 0xF0143),
    ("close", 0xF0156),
    ("close-circle", 0xF0159),
    ("dishwasher", 0xF0AAC),
    ("door", 0xF081A),
    ("door-closed", 0xF081B),
    ("door-closed-lock", 0xF10AF),
    ("door-open", 0xF081C),
    ("electric-switch", 0xF0E9F),
    ("eye", 0xF0208),
    ("eye-check", 0xF0D04),
    ("eye-off", 0xF0209),
    ("fan", 0xF0210),
    ("fan-off", 0xF081D),
    ("fire", 0xF0238),
    ("fire-alert", 0xF15D7),
    ("fire-extinguisher", 0xF0EF2),
    ("flash", 0xF0241),
    ("flash-off", 0xF0243),
    ("flashlight", 0xF0244),
    ("flashlight-off", 0xF0245),
    ("floor-lamp", 0xF08DD),
    ("fridge", 0xF0290),
    ("garage", 0xF06D9),
    ("garage-open", 0xF06DA),
    ("garage-open-variant", 0xF12D4),
    ("garage-variant", 0xF12D3),
    ("gate", 0xF0299),
    ("gate-open", 0xF116A),
    ("home", 0xF02DC),
    ("home-outline", 0xF06A1),
    ("human", 0xF02E6),
    ("human-greeting", 0xF17C4),
    ("information", 0xF02FC),
    ("lamp", 0xF06B5),
    ("light-flood-down", 0xF1987),
    ("light-flood-up", 0xF1988),
    ("light-switch", 0xF097E),
    ("lightbulb", 0xF0335),
    ("lightbulb-off", 0xF0E4F),
    ("lightbulb-off-outline", 0xF0E50),
    ("lightbulb-on", 0xF06E8),
    ("lightbulb-on-outline", 0xF06E9),
    ("lightbulb-outline", 0xF0336),
    ("lightning-bolt", 0xF140B),
    ("lock", 0xF033E),
    ("lock-alert", 0xF08EE),
    ("lock-open", 0xF033F),
    ("lock-open-alert", 0xF139B),
    ("lock-open-variant", 0xF0FC6),
    ("menu", 0xF035C),
    ("microwave", 0xF0C99),
    ("motion", 0xF15B2),
    ("motion-outline", 0xF15B3),
    ("motion-sensor", 0xF0D91),
    ("motion-sensor-off", 0xF1435),
    ("music", 0xF075A),
    ("outdoor-lamp", 0xF1054),
    ("power", 0xF0425),
    ("power-off", 0xF0902),
    ("power-plug", 0xF06A5),
    ("power-socket", 0xF0427),
    ("radar", 0xF0437),
    ("radiator", 0xF0438),
    ("robot-vacuum", 0xF070D),
    ("run", 0xF070E),
    ("security", 0xF0483),
    ("shield", 0xF0498),
    ("shield-alert", 0xF0ECC),
    ("shield-check", 0xF0565),
    ("shield-home", 0xF068A),
    ("shield-key", 0xF0BC4),
    ("shower", 0xF09A0),
    ("smoke-detector", 0xF0392),
    ("smoke-detector-alert", 0xF192E),
    ("smoke-detector-variant", 0xF180B),
    ("snowflake", 0xF0717),
    ("sofa", 0xF04B9),
    ("speaker", 0xF04C3),
    ("spotlight", 0xF04C8),
    ("spotlight-beam", 0xF04C9),
    ("stove", 0xF04DE),
    ("television", 0xF0502),
    ("thermometer", 0xF050F),
    ("toggle-switch", 0xF0521),
    ("video", 0xF0567),
    ("video-off", 0xF0568),
    ("walk", 0xF0583),
    ("washing-machine", 0xF072A),
    ("water-percent", 0xF058E),
    ("weather-cloudy", 0xF0590),
    ("weather-night", 0xF0594),
    ("weather-partly-cloudy", 0xF0595),
    ("weather-rainy", 0xF0597),
    ("weather-snowy", 0xF0598),
    ("weather-sunny", 0xF0599),
    ("webcam", 0xF05A0),
    ("webcam-off", 0xF1737),
    ("window-closed", 0xF05AE),
    ("window-open", 0xF05B1),
    ("window-shutter", 0xF111C),
    ("window-shutter-open", 0xF111E),
];

/// Looks up the codepoint for an icon name, with or without the prefix.
pub fn icon_codepoint(name: &str) -> Option<char> {
    let name = name.strip_prefix(ICON_PREFIX).unwrap_or(name);
    ICON_CODEPOINTS
        .binary_search_by(|(candidate, _)| candidate.cmp(&name))
        .ok()
        .and_then(|idx| char::from_u32(ICON_CODEPOINTS[idx].1))
}

/// Parses a pre-resolved codepoint.
///
/// Accepts the glyph itself (a single character) or its hex value written as
/// `F07AE`, `U+F07AE`, `\\U000F07AE` or `0xF07AE`. A lone hex digit is read
/// as a codepoint, not as the digit itself.
pub fn parse_codepoint(raw: &str) -> Option<char> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    if let (Some(glyph), None) = (chars.next(), chars.next())
        && !glyph.is_ascii_hexdigit()
    {
        return Some(glyph);
    }

    let hex = ["U+", "u+", "\\U", "\\u", "0x", "0X"]
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix))
        .unwrap_or(raw);
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(ICON_CODEPOINTS.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[test]
    fn lookup_with_and_without_prefix() {
        assert_eq!(icon_codepoint("mdi:cctv"), Some('\u{F07AE}'));
        assert_eq!(icon_codepoint("lightbulb-on"), Some('\u{F06E8}'));
        assert_eq!(icon_codepoint("mdi:not-a-real-icon"), None);
    }

    #[test]
    fn codepoint_forms() {
        assert_eq!(parse_codepoint("\u{F07AE}"), Some('\u{F07AE}'));
        assert_eq!(parse_codepoint("F07AE"), Some('\u{F07AE}'));
        assert_eq!(parse_codepoint("U+F07AE"), Some('\u{F07AE}'));
        assert_eq!(parse_codepoint("\\U000F07AE"), Some('\u{F07AE}'));
        assert_eq!(parse_codepoint("0xF07AE"), Some('\u{F07AE}'));
        assert_eq!(parse_codepoint("lightbulb"), None);
        assert_eq!(parse_codepoint(""), None);
    }

    #[test]
    fn single_hex_digit_is_a_codepoint() {
        assert_eq!(parse_codepoint("F"), Some('\u{F}'));
        assert_eq!(parse_codepoint("7"), Some('\u{7}'));
        assert_eq!(parse_codepoint("\u{2605}"), Some('\u{2605}'));
        assert_eq!(parse_codepoint("x"), Some('x'));
    }
}
