// handlers/elevated/mod.rs - Administrative endpoints, admin role required
pub mod documents;
pub mod specs;

pub use documents::put as documents_put;
pub use specs::put as specs_put;

/// Query-string booleans as clients send them: 1, true, True, yes
pub(crate) fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}
