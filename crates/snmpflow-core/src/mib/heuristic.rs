// ── Text heuristics for device classification ──
//
// Used when no OID prefix in the database carries a template. Names
// often hold several keywords ("...Switch" models whose vendor code
// contains "router"), so the check order below is the tie-break.

use crate::model::Provider;

const IOT_MARKERS: &[&str] = &["printer", "camera", "iot"];

/// Classify from free text: a template or model name plus up to two
/// extra descriptive strings. Returns the provider and whether any
/// keyword matched.
pub fn classify_by_text(name: &str, extra1: &str, extra2: &str) -> (Provider, bool) {
    let text = format!("{name} {extra1} {extra2}").to_lowercase();

    let provider = if IOT_MARKERS.iter().any(|m| text.contains(m)) {
        Provider::Iot
    } else if text.contains("switch") {
        Provider::Switch
    } else if text.contains("firewall") {
        Provider::Firewall
    } else if text.contains("router") {
        Provider::Router
    } else {
        Provider::Unknown
    };

    (provider, provider.is_known())
}
