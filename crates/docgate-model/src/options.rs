//! Enumerated request options.
//!
//! Each option is parsed case-insensitively from its query parameter value.
//! `parse` returns `None` for unknown values; the caller decides whether that
//! is an error or a fallback to the default.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => [$canonical:literal $(, $alias:literal)*] ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Parse a query parameter value, ignoring ASCII case.
            #[must_use]
            pub fn parse(value: &str) -> Option<Self> {
                let value = value.trim();
                $(
                    if value.eq_ignore_ascii_case($canonical)
                        $( || value.eq_ignore_ascii_case($alias) )*
                    {
                        return Some(Self::$variant);
                    }
                )+
                None
            }

            /// Returns the canonical name of this value.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $canonical, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

option_enum! {
    /// Response representation format (`rep`).
    RepresentationFormat {
        /// Hypertext application language.
        Hal => ["HAL"],
        /// Simplified HAL.
        Shal => ["SHAL", "PLAIN_JSON", "PJ"],
        /// Standard representation.
        Standard => ["STANDARD", "S"],
    }
}

option_enum! {
    /// HAL representation mode (`hal`).
    HalMode {
        /// Full representation with links and embedded properties.
        Full => ["FULL", "F"],
        /// Compact representation.
        Compact => ["COMPACT", "C"],
    }
}

option_enum! {
    /// Cursor pre-allocation policy (`eager`).
    EagerCursorPolicy {
        /// Pre-allocate cursors for the following pages.
        Linear => ["LINEAR"],
        /// Pre-allocate cursors at random offsets.
        Random => ["RANDOM"],
        /// No pre-allocation.
        None => ["NONE"],
    }
}

option_enum! {
    /// Type of the document id carried in the path (`id_type`).
    DocIdType {
        /// 24 hex character object id.
        Oid => ["OID"],
        /// Object id when the value is a valid one, string otherwise.
        StringOid => ["STRING_OID"],
        /// Plain string.
        String => ["STRING"],
        /// Number.
        Number => ["NUMBER"],
        /// Milliseconds since the epoch.
        Date => ["DATE"],
        /// The `MinKey` value.
        MinKey => ["MINKEY"],
        /// The `MaxKey` value.
        MaxKey => ["MAXKEY"],
        /// `null`.
        Null => ["NULL"],
        /// Boolean.
        Boolean => ["BOOLEAN"],
    }
}

option_enum! {
    /// Write mode (`writeMode` or `wm`).
    WriteMode {
        /// Create only; fails when the document exists.
        Insert => ["INSERT"],
        /// Update only; fails when the document does not exist.
        Update => ["UPDATE"],
        /// Create or update.
        Upsert => ["UPSERT"],
    }
}

option_enum! {
    /// JSON output mode (`jsonMode`).
    JsonMode {
        /// Extended JSON, canonical mode.
        Extended => ["EXTENDED"],
        /// Extended JSON, relaxed mode.
        Relaxed => ["RELAXED"],
        /// Shell mode.
        Shell => ["SHELL"],
        /// Simplified mode.
        Simplified => ["SIMPLIFIED"],
        /// Standard mode.
        Standard => ["STANDARD"],
    }
}

impl Default for RepresentationFormat {
    fn default() -> Self {
        Self::Standard
    }
}

impl Default for HalMode {
    fn default() -> Self {
        Self::Compact
    }
}

impl Default for DocIdType {
    fn default() -> Self {
        Self::StringOid
    }
}

impl WriteMode {
    /// Default write mode for a request method.
    #[must_use]
    pub fn default_for(method: &http::Method) -> Self {
        match *method {
            http::Method::POST => Self::Insert,
            http::Method::PUT | http::Method::PATCH => Self::Update,
            _ => Self::Upsert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_case_insensitively() {
        assert_eq!(RepresentationFormat::parse("hal"), Some(RepresentationFormat::Hal));
        assert_eq!(RepresentationFormat::parse("pj"), Some(RepresentationFormat::Shal));
        assert_eq!(RepresentationFormat::parse("s"), Some(RepresentationFormat::Standard));
        assert_eq!(HalMode::parse("f"), Some(HalMode::Full));
        assert_eq!(DocIdType::parse("string_oid"), Some(DocIdType::StringOid));
        assert_eq!(WriteMode::parse("Upsert"), Some(WriteMode::Upsert));
        assert_eq!(JsonMode::parse("relaxed"), Some(JsonMode::Relaxed));
        assert_eq!(EagerCursorPolicy::parse("none"), Some(EagerCursorPolicy::None));
    }

    #[test]
    fn test_should_reject_unknown_values() {
        assert_eq!(RepresentationFormat::parse("xml"), None);
        assert_eq!(DocIdType::parse("uuid"), None);
        assert_eq!(WriteMode::parse(""), None);
    }

    #[test]
    fn test_should_pick_default_write_mode_by_method() {
        assert_eq!(WriteMode::default_for(&http::Method::POST), WriteMode::Insert);
        assert_eq!(WriteMode::default_for(&http::Method::PUT), WriteMode::Update);
        assert_eq!(WriteMode::default_for(&http::Method::PATCH), WriteMode::Update);
        assert_eq!(WriteMode::default_for(&http::Method::DELETE), WriteMode::Upsert);
    }

    #[test]
    fn test_should_serialize_screaming_case() {
        let json = serde_json::to_string(&DocIdType::StringOid).unwrap();
        assert_eq!(json, "\"STRING_OID\"");
    }
}
