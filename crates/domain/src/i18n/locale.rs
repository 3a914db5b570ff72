use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported UI locales, first path segment of every route.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    En,
    Es,
    Fr,
    It,
    Pt,
    Ru,
    Zh,
    Ja,
    Ar,
    Hi,
    Tr,
    Pl,
    Nl,
    Vi,
    Ko,
    Uk,
    Th,
    Id,
    Cs,
    Fa,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Locale {
    pub const ALL: [Locale; 21] = [
        Locale::De,
        Locale::En,
        Locale::Es,
        Locale::Fr,
        Locale::It,
        Locale::Pt,
        Locale::Ru,
        Locale::Zh,
        Locale::Ja,
        Locale::Ar,
        Locale::Hi,
        Locale::Tr,
        Locale::Pl,
        Locale::Nl,
        Locale::Vi,
        Locale::Ko,
        Locale::Uk,
        Locale::Th,
        Locale::Id,
        Locale::Cs,
        Locale::Fa,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::De => "de",
            Locale::En => "en",
            Locale::Es => "es",
            Locale::Fr => "fr",
            Locale::It => "it",
            Locale::Pt => "pt",
            Locale::Ru => "ru",
            Locale::Zh => "zh",
            Locale::Ja => "ja",
            Locale::Ar => "ar",
            Locale::Hi => "hi",
            Locale::Tr => "tr",
            Locale::Pl => "pl",
            Locale::Nl => "nl",
            Locale::Vi => "vi",
            Locale::Ko => "ko",
            Locale::Uk => "uk",
            Locale::Th => "th",
            Locale::Id => "id",
            Locale::Cs => "cs",
            Locale::Fa => "fa",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|locale| locale.as_str().eq_ignore_ascii_case(code))
    }

    /// Picks the locale for a path segment, falling back to the default.
    pub fn negotiate(segment: Option<&str>) -> Self {
        segment.and_then(Self::from_code).unwrap_or_default()
    }

    pub fn direction(self) -> Direction {
        match self {
            Locale::Ar | Locale::Fa => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }

    pub fn is_rtl(self) -> bool {
        self.direction() == Direction::Rtl
    }

    /// Locale whose message file serves this locale.
    pub fn bundle_locale(self) -> Self {
        match self {
            Locale::Ar
            | Locale::De
            | Locale::En
            | Locale::Es
            | Locale::Fa
            | Locale::Fr
            | Locale::It
            | Locale::Ru
            | Locale::Tr
            | Locale::Uk => self,
            _ => Locale::En,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_segments_fall_back_to_german() {
        assert_eq!(Locale::negotiate(Some("xx")), Locale::De);
        assert_eq!(Locale::negotiate(None), Locale::De);
        assert_eq!(Locale::negotiate(Some("FA")), Locale::Fa);
    }

    #[test]
    fn arabic_and_persian_are_right_to_left() {
        let rtl: Vec<_> = Locale::ALL.into_iter().filter(|l| l.is_rtl()).collect();
        assert_eq!(rtl, vec![Locale::Ar, Locale::Fa]);
    }

    #[test]
    fn locales_without_messages_use_english() {
        assert_eq!(Locale::Pt.bundle_locale(), Locale::En);
        assert_eq!(Locale::Zh.bundle_locale(), Locale::En);
        assert_eq!(Locale::Uk.bundle_locale(), Locale::Uk);
    }

    #[test]
    fn codes_round_trip() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_code(locale.as_str()), Some(locale));
        }
    }
}
