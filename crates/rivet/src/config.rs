//! Bridge configuration

/// Annotation key read from struct field tags by default
pub const DEFAULT_TAG_KEY: &str = "rivet";

/// Largest slice capacity or channel buffer a type constructor allocates
pub const MAX_CONSTRUCT_CAPACITY: i64 = 1 << 24;

/// Per-`State` bridge options
///
/// Installed with [`crate::configure`] before the first proxy is created;
/// descriptors are generated with the configuration in force at that time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Field tag key holding a replacement name, or `-` to hide the field
    pub tag_key: String,
    /// Also register each field and method under a lowercased-initial alias
    pub lowercase_aliases: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            tag_key: DEFAULT_TAG_KEY.to_string(),
            lowercase_aliases: true,
        }
    }
}

impl BridgeConfig {
    /// Names a member is reachable under, literal name first
    pub fn names_for(&self, name: &str) -> Vec<String> {
        let mut names = vec![name.to_string()];
        if self.lowercase_aliases {
            let alias = lower_initial(name);
            if alias != name {
                names.push(alias);
            }
        }
        names
    }
}

/// `Name` -> `name`
pub fn lower_initial(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
